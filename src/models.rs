use crate::delimited::Row;
use crate::slug::{comparison_key, normalize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const IN_STOCK_STATUS_CODE: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedRecord {
    pub product_id: String,
    pub name: String,
    pub raw_price: String,
    pub currency: String,
    pub deep_link: String,
    pub image_url: String,
    pub ean: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub in_stock_flag: String,
    pub stock_status: String,
    normalized_slug: String,
    comparison_key: String,
}

impl FeedRecord {
    pub fn from_row(row: &Row) -> Self {
        let field = |keys: &[&str]| -> String {
            keys.iter()
                .filter_map(|key| row.get(*key))
                .map(|value| value.trim())
                .find(|value| !value.is_empty())
                .unwrap_or_default()
                .to_string()
        };
        let mut record = Self {
            product_id: field(&["aw_product_id", "product_id"]),
            name: field(&["product_name", "name"]),
            raw_price: field(&["search_price", "store_price", "price"]),
            currency: field(&["currency"]),
            deep_link: field(&["merchant_deep_link", "aw_deep_link", "deep_link"]),
            image_url: field(&["merchant_image_url", "aw_image_url", "image_url"]),
            ean: field(&["ean", "product_GTIN", "gtin"]),
            description: field(&["description", "product_short_description"]),
            brand: field(&["brand_name", "brand"]),
            category: field(&["merchant_category", "category_name"]),
            in_stock_flag: field(&["in_stock"]),
            stock_status: field(&["stock_status"]),
            normalized_slug: String::new(),
            comparison_key: String::new(),
        };
        record.normalized_slug = slug_from_link(&record.deep_link)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| normalize(&record.name));
        record.comparison_key = comparison_key(&record.normalized_slug);
        record
    }

    pub fn normalized_slug(&self) -> &str {
        &self.normalized_slug
    }

    pub fn comparison_key(&self) -> &str {
        &self.comparison_key
    }

    pub fn in_stock(&self) -> bool {
        let flag = self.in_stock_flag.trim().to_lowercase();
        if matches!(flag.as_str(), "1" | "true" | "yes") {
            return true;
        }
        let status = self.stock_status.trim();
        match status.parse::<i64>() {
            Ok(code) => code == IN_STOCK_STATUS_CODE,
            Err(_) => status.eq_ignore_ascii_case("in stock"),
        }
    }

    pub fn price(&self) -> Option<f64> {
        parse_price(&self.raw_price)
    }
}

// AWIN click-tracking links carry the merchant URL in a query parameter.
pub fn slug_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    let target = unwrap_tracking_link(link).unwrap_or_else(|| link.to_string());
    let without_fragment = target.split('#').next().unwrap_or_default();
    let path = without_fragment.split('?').next().unwrap_or_default();
    let path = path
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or_default())
        .unwrap_or(path);
    path.split('/')
        .rev()
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(|segment| {
            let segment = segment
                .strip_suffix(".html")
                .or_else(|| segment.strip_suffix(".htm"))
                .unwrap_or(segment);
            normalize(segment)
        })
}

fn unwrap_tracking_link(link: &str) -> Option<String> {
    let (base, query) = link.split_once('?')?;
    if !base.to_lowercase().contains("awin1.com") {
        return None;
    }
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| matches!(*key, "p" | "ued"))
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|decoded| decoded.into_owned())
        .filter(|decoded| !decoded.is_empty())
}

/// Parses `19.99`, `£1,299.00`, `1.299,00` or `12,50`. Anything unusable is
/// `None`, never zero.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    // With both separators present the later one is the decimal point.
    // Alone, a separator is decimal only when it occurs once.
    let decimal = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) if cleaned.matches('.').count() == 1 => Some('.'),
        (None, Some(_)) if cleaned.matches(',').count() == 1 => Some(','),
        _ => None,
    };
    let normalized: String = cleaned
        .chars()
        .filter_map(|ch| match ch {
            '.' | ',' if Some(ch) == decimal => Some('.'),
            '.' | ',' => None,
            other => Some(other),
        })
        .collect();
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyAmount {
    pub amount: f64,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub id: String,
    pub sku: Option<String>,
    pub prices: Vec<MoneyAmount>,
    pub inventory_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub variants: Vec<CatalogVariant>,
}

impl CatalogProduct {
    pub fn handle_slug(&self) -> String {
        normalize(&self.handle)
    }

    pub fn comparison_key(&self) -> String {
        comparison_key(&self.handle_slug())
    }

    // First matching variant wins.
    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.variants
            .iter()
            .flat_map(|variant| variant.prices.iter())
            .find(|price| price.currency_code.eq_ignore_ascii_case(currency))
            .map(|price| price.amount)
    }

    pub fn total_inventory(&self) -> i64 {
        self.variants
            .iter()
            .map(|variant| variant.inventory_quantity.unwrap_or(0))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Loose,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRecord {
    pub handle: String,
    pub title: String,
    pub awin_product_id: String,
    pub price: Option<f64>,
    pub currency: String,
    pub in_stock: bool,
    pub brand: String,
    pub category: String,
    pub ean: String,
    pub image_url: String,
    pub deep_link: String,
    pub description: String,
}

impl MissingRecord {
    pub fn from_feed(record: &FeedRecord) -> Self {
        Self {
            handle: record.normalized_slug().to_string(),
            title: record.name.clone(),
            awin_product_id: record.product_id.clone(),
            price: record.price(),
            currency: record.currency.clone(),
            in_stock: record.in_stock(),
            brand: record.brand.clone(),
            category: record.category.clone(),
            ean: record.ean.clone(),
            image_url: record.image_url.clone(),
            deep_link: record.deep_link.clone(),
            description: record.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogOnlyRecord {
    pub handle: String,
    pub product_id: String,
    pub title: String,
    pub price: Option<f64>,
    pub inventory: i64,
}

// Written by detect, read back by reconcile-stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMismatchRecord {
    pub handle: String,
    pub product_id: String,
    pub title: String,
    pub awin_product_id: String,
    pub awin_in_stock: bool,
    pub catalog_inventory: i64,
}

impl StockMismatchRecord {
    pub fn from_row(row: &Row) -> Result<Self, String> {
        let text = |key: &str| row.get(key).cloned().unwrap_or_default();
        let handle = text("handle");
        if handle.is_empty() && text("product_id").is_empty() {
            return Err("row has neither handle nor product_id".into());
        }
        let awin_in_stock = match text("awin_in_stock").to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" | "" => false,
            other => return Err(format!("unrecognised awin_in_stock value `{other}`")),
        };
        let catalog_inventory = text("catalog_inventory").parse::<i64>().unwrap_or(0);
        Ok(Self {
            handle,
            product_id: text("product_id"),
            title: text("title"),
            awin_product_id: text("awin_product_id"),
            awin_in_stock,
            catalog_inventory,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooseMatchRecord {
    pub awin_product_id: String,
    pub awin_name: String,
    pub awin_slug: String,
    pub comparison_key: String,
    pub handle: String,
    pub product_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Created {
        product_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inventory_error: Option<String>,
    },
    SkippedExists {
        product_id: String,
    },
    SkippedLogged,
    DryRun,
    Invalid {
        reason: String,
    },
    LookupError {
        error: String,
    },
    CreateError {
        error: String,
    },
}

impl ImportOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ImportOutcome::Created { .. } => "created",
            ImportOutcome::SkippedExists { .. } => "skipped_exists",
            ImportOutcome::SkippedLogged => "skipped_logged",
            ImportOutcome::DryRun => "dry_run",
            ImportOutcome::Invalid { .. } => "invalid",
            ImportOutcome::LookupError { .. } => "lookup_error",
            ImportOutcome::CreateError { .. } => "create_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub timestamp: DateTime<Utc>,
    pub handle: String,
    pub awin_product_id: String,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StockOutcome {
    Updated {
        product_id: String,
        inventory_items: usize,
        quantity: i64,
    },
    DryRun {
        product_id: String,
        inventory_items: usize,
        quantity: i64,
    },
    NotFound,
    NoInventoryItems {
        product_id: String,
    },
    LookupError {
        error: String,
    },
    UpdateError {
        error: String,
    },
}

impl StockOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StockOutcome::Updated { .. } => "updated",
            StockOutcome::DryRun { .. } => "dry_run",
            StockOutcome::NotFound => "not_found",
            StockOutcome::NoInventoryItems { .. } => "no_inventory_items",
            StockOutcome::LookupError { .. } => "lookup_error",
            StockOutcome::UpdateError { .. } => "update_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLogEntry {
    pub timestamp: DateTime<Utc>,
    pub handle: String,
    #[serde(flatten)]
    pub outcome: StockOutcome,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StageReport {
    pub name: String,
    pub elapsed_ms: u128,
    pub timestamp: DateTime<Utc>,
}

impl StageReport {
    pub fn new(name: &str, elapsed_ms: u128) -> Self {
        Self {
            name: name.to_string(),
            elapsed_ms,
            timestamp: Utc::now(),
        }
    }
}
