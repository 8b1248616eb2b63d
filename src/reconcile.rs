use crate::models::{
    CatalogOnlyRecord, CatalogProduct, FeedRecord, LooseMatchRecord, MatchKind, MissingRecord,
    StockMismatchRecord,
};
use serde::Serialize;
use std::collections::HashMap;

// Feed buckets keep feed order; `catalog_only` keeps fetch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reconciliation {
    pub missing: Vec<MissingRecord>,
    pub catalog_only: Vec<CatalogOnlyRecord>,
    pub stock_mismatches: Vec<StockMismatchRecord>,
    pub loose_matches: Vec<LooseMatchRecord>,
    pub matched_exact: usize,
    pub matched_loose: usize,
}

struct CatalogIndex<'a> {
    products: &'a [CatalogProduct],
    by_slug: HashMap<String, usize>,
    by_key: HashMap<String, Vec<usize>>,
}

impl<'a> CatalogIndex<'a> {
    fn build(products: &'a [CatalogProduct]) -> Self {
        let mut by_slug = HashMap::with_capacity(products.len());
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, product) in products.iter().enumerate() {
            let slug = product.handle_slug();
            if slug.is_empty() {
                continue;
            }
            by_key.entry(product.comparison_key()).or_default().push(idx);
            by_slug.entry(slug).or_insert(idx);
        }
        Self {
            products,
            by_slug,
            by_key,
        }
    }

    // Ambiguous keys never match.
    fn lookup(&self, record: &FeedRecord) -> (MatchKind, Option<usize>) {
        let slug = record.normalized_slug();
        if slug.is_empty() {
            return (MatchKind::None, None);
        }
        if let Some(idx) = self.by_slug.get(slug) {
            return (MatchKind::Exact, Some(*idx));
        }
        match self.by_key.get(record.comparison_key()).map(Vec::as_slice) {
            Some([only]) => (MatchKind::Loose, Some(*only)),
            _ => (MatchKind::None, None),
        }
    }
}

pub fn reconcile(feed: &[FeedRecord], catalog: &[CatalogProduct], currency: &str) -> Reconciliation {
    let index = CatalogIndex::build(catalog);
    let mut unmatched = vec![true; catalog.len()];
    let mut result = Reconciliation::default();

    for record in feed {
        let (kind, found) = index.lookup(record);
        let Some(idx) = found else {
            result.missing.push(MissingRecord::from_feed(record));
            continue;
        };
        let product = &index.products[idx];
        unmatched[idx] = false;

        match kind {
            MatchKind::Exact => result.matched_exact += 1,
            MatchKind::Loose => {
                result.matched_loose += 1;
                result.loose_matches.push(LooseMatchRecord {
                    awin_product_id: record.product_id.clone(),
                    awin_name: record.name.clone(),
                    awin_slug: record.normalized_slug().to_string(),
                    comparison_key: record.comparison_key().to_string(),
                    handle: product.handle.clone(),
                    product_id: product.id.clone(),
                    title: product.title.clone(),
                });
            }
            MatchKind::None => {}
        }

        let inventory = product.total_inventory();
        if record.in_stock() && inventory <= 0 {
            result.stock_mismatches.push(StockMismatchRecord {
                handle: product.handle.clone(),
                product_id: product.id.clone(),
                title: product.title.clone(),
                awin_product_id: record.product_id.clone(),
                awin_in_stock: true,
                catalog_inventory: inventory,
            });
        }
    }

    result.catalog_only = catalog
        .iter()
        .zip(unmatched)
        .filter(|(_, still_unmatched)| *still_unmatched)
        .map(|(product, _)| CatalogOnlyRecord {
            handle: product.handle.clone(),
            product_id: product.id.clone(),
            title: product.title.clone(),
            price: product.price_in(currency),
            inventory: product.total_inventory(),
        })
        .collect();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimited::Row;
    use crate::models::{CatalogVariant, MoneyAmount};

    fn feed(id: &str, link: &str, in_stock: &str) -> FeedRecord {
        let row: Row = [
            ("aw_product_id", id),
            ("product_name", "Feed Product"),
            ("search_price", "19.99"),
            ("merchant_deep_link", link),
            ("in_stock", in_stock),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        FeedRecord::from_row(&row)
    }

    fn product(id: &str, handle: &str, inventory: Option<i64>) -> CatalogProduct {
        CatalogProduct {
            id: id.into(),
            handle: handle.into(),
            title: handle.into(),
            variants: vec![CatalogVariant {
                id: format!("{id}_v"),
                sku: None,
                prices: vec![MoneyAmount {
                    amount: 10.0,
                    currency_code: "eur".into(),
                }],
                inventory_quantity: inventory,
            }],
        }
    }

    #[test]
    fn exact_match_is_neither_missing_nor_catalog_only() {
        let records = vec![feed("1", "https://shop.example/products/magic-wand-mini", "1")];
        let catalog = vec![product("prod_1", "magic-wand-mini", Some(5))];
        let result = reconcile(&records, &catalog, "eur");
        assert_eq!(result.matched_exact, 1);
        assert!(result.missing.is_empty());
        assert!(result.catalog_only.is_empty());
        assert!(result.loose_matches.is_empty());
    }

    #[test]
    fn unique_comparison_key_is_a_loose_match() {
        let records = vec![feed("1", "https://shop.example/magic-wand-pink", "0")];
        let catalog = vec![product("prod_1", "magic-wand-black", Some(2))];
        let result = reconcile(&records, &catalog, "eur");
        assert_eq!(result.matched_loose, 1);
        assert_eq!(result.loose_matches[0].handle, "magic-wand-black");
        assert_eq!(result.loose_matches[0].comparison_key, "magic-wand");
        assert!(result.catalog_only.is_empty());
    }

    #[test]
    fn ambiguous_comparison_key_is_not_matched() {
        let records = vec![feed("1", "https://shop.example/wand-purple", "1")];
        let catalog = vec![
            product("prod_1", "wand-pink", Some(1)),
            product("prod_2", "wand-black", Some(1)),
        ];
        let result = reconcile(&records, &catalog, "eur");
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.missing[0].handle, "wand-purple");
        assert!(result.loose_matches.is_empty());
        let handles: Vec<_> = result.catalog_only.iter().map(|r| r.handle.as_str()).collect();
        assert_eq!(handles, vec!["wand-pink", "wand-black"]);
    }

    #[test]
    fn in_stock_feed_against_empty_inventory_is_a_mismatch() {
        let records = vec![
            feed("1", "https://shop.example/magic-wand", "1"),
            feed("2", "https://shop.example/bullet", "0"),
        ];
        let catalog = vec![
            product("prod_1", "magic-wand", Some(0)),
            product("prod_2", "bullet", None),
        ];
        let result = reconcile(&records, &catalog, "eur");
        assert_eq!(result.stock_mismatches.len(), 1);
        let mismatch = &result.stock_mismatches[0];
        assert!(mismatch.awin_in_stock);
        assert_eq!(mismatch.handle, "magic-wand");
        assert_eq!(mismatch.awin_product_id, "1");
        assert_eq!(mismatch.catalog_inventory, 0);
    }

    #[test]
    fn missing_record_keeps_unparsable_price_empty() {
        let mut row: Row = Row::new();
        row.insert("product_name".into(), "Odd Thing".into());
        row.insert("search_price".into(), "call us".into());
        let records = vec![FeedRecord::from_row(&row)];
        let result = reconcile(&records, &[], "eur");
        assert_eq!(result.missing[0].price, None);
        assert_eq!(result.missing[0].handle, "odd-thing");
    }

    #[test]
    fn every_catalog_product_is_matched_or_catalog_only() {
        let records = vec![
            feed("1", "https://shop.example/magic-wand", "1"),
            feed("2", "https://shop.example/plug-large", "1"),
            feed("3", "https://shop.example/unknown-thing", "1"),
            feed("4", "https://shop.example/magic-wand", "1"),
        ];
        let catalog = vec![
            product("prod_1", "magic-wand", Some(3)),
            product("prod_2", "plug-small", Some(3)),
            product("prod_3", "cuffs", Some(3)),
            product("prod_4", "blindfold", Some(3)),
        ];
        let result = reconcile(&records, &catalog, "eur");
        let matched = catalog.len() - result.catalog_only.len();
        assert_eq!(matched, 2);
        assert_eq!(result.catalog_only.len(), 2);
        assert_eq!(result.catalog_only[0].price, Some(10.0));
        assert_eq!(result.missing.len(), 1);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let records = vec![
            feed("1", "https://shop.example/magic-wand-pink", "1"),
            feed("2", "https://shop.example/nope", "1"),
        ];
        let catalog = vec![
            product("prod_1", "magic-wand", Some(0)),
            product("prod_2", "other", Some(0)),
        ];
        assert_eq!(
            reconcile(&records, &catalog, "eur"),
            reconcile(&records, &catalog, "eur")
        );
    }
}
