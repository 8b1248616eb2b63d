pub mod auth;
pub mod client;
pub mod config;
pub mod inventory;
pub mod products;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use thiserror::Error;

pub use client::MedusaClient;
pub use config::MedusaConfig;
pub use products::{ApiProduct, CreateProductRequest};

#[derive(Debug, Error)]
pub enum MedusaError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl MedusaError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MedusaError::Status { status: 404, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub id: String,
    pub handle: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInventory {
    pub product: ProductRef,
    pub inventory_item_ids: Vec<String>,
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn list_products(&self, limit: usize, offset: usize)
    -> Result<Vec<ApiProduct>, MedusaError>;
}

#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<ProductRef>, MedusaError>;

    async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<ProductRef, MedusaError>;

    async fn product_inventory(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductInventory>, MedusaError>;

    /// Absolute quantity; creates the location level when missing.
    async fn set_stocked_quantity(
        &self,
        inventory_item_id: &str,
        location_id: &str,
        quantity: i64,
    ) -> Result<(), MedusaError>;
}
