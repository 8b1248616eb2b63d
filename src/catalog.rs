use crate::medusa::{CatalogReader, MedusaError};
use crate::models::CatalogProduct;
use tracing::info;

// A failed page aborts the fetch. A partial catalog skews every bucket.
pub async fn fetch_all(
    reader: &dyn CatalogReader,
    page_size: usize,
) -> Result<Vec<CatalogProduct>, MedusaError> {
    let page_size = page_size.max(1);
    let mut products = Vec::new();
    let mut offset = 0;
    loop {
        let page = reader.list_products(page_size, offset).await?;
        let returned = page.len();
        products.extend(page.into_iter().map(|product| product.into_catalog()));
        offset += returned;
        if returned < page_size {
            break;
        }
    }
    info!(
        target = "sync.catalog",
        products = products.len(),
        page_size,
        "catalog_fetched"
    );
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medusa::fake::FakeCatalog;
    use serde_json::json;

    fn listing(count: usize) -> Vec<serde_json::Value> {
        (0..count)
            .map(|idx| {
                json!({
                    "id": format!("prod_{idx}"),
                    "handle": format!("product-{idx}"),
                    "title": format!("Product {idx}"),
                    "variants": [{"id": format!("v{idx}"), "inventory_quantity": 1}]
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let fake = FakeCatalog::new().with_listing(listing(7));
        let products = fetch_all(&fake, 3).await.unwrap();
        assert_eq!(products.len(), 7);
        assert_eq!(products[0].handle, "product-0");
        assert_eq!(products[6].handle, "product-6");
    }

    #[tokio::test]
    async fn exact_multiple_ends_on_empty_page() {
        let fake = FakeCatalog::new().with_listing(listing(6));
        let products = fetch_all(&fake, 3).await.unwrap();
        assert_eq!(products.len(), 6);
    }

    #[tokio::test]
    async fn failed_page_aborts() {
        let fake = FakeCatalog::new().failing_listing(401);
        let err = fetch_all(&fake, 50).await.unwrap_err();
        assert!(matches!(err, MedusaError::Status { status: 401, .. }));
    }
}
