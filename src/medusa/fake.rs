//! In-memory catalog used by the write-path tests.

use crate::medusa::{
    ApiProduct, CatalogReader, CatalogWriter, CreateProductRequest, MedusaError, ProductInventory,
    ProductRef,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub product: ProductRef,
    pub inventory_item_ids: Vec<String>,
}

#[derive(Default)]
struct State {
    products: Vec<FakeProduct>,
    levels: BTreeMap<(String, String), i64>,
    next_id: usize,
    create_calls: usize,
    set_calls: usize,
    scripted_create_errors: VecDeque<MedusaError>,
    listing: Vec<serde_json::Value>,
    failing_listing: Option<u16>,
}

#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<State>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(self, id: &str, handle: &str, inventory_item_ids: &[&str]) -> Self {
        self.state.lock().unwrap().products.push(FakeProduct {
            product: ProductRef {
                id: id.to_string(),
                handle: handle.to_string(),
                title: handle.to_string(),
            },
            inventory_item_ids: inventory_item_ids.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_listing(self, products: Vec<serde_json::Value>) -> Self {
        self.state.lock().unwrap().listing = products;
        self
    }

    pub fn failing_listing(self, status: u16) -> Self {
        self.state.lock().unwrap().failing_listing = Some(status);
        self
    }

    pub fn script_create_errors(&self, errors: Vec<MedusaError>) {
        self.state.lock().unwrap().scripted_create_errors = errors.into();
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn set_calls(&self) -> usize {
        self.state.lock().unwrap().set_calls
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    pub fn level(&self, inventory_item_id: &str, location_id: &str) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .levels
            .get(&(inventory_item_id.to_string(), location_id.to_string()))
            .copied()
    }

    pub fn set_level(&self, inventory_item_id: &str, location_id: &str, quantity: i64) {
        self.state.lock().unwrap().levels.insert(
            (inventory_item_id.to_string(), location_id.to_string()),
            quantity,
        );
    }
}

#[async_trait]
impl CatalogReader for FakeCatalog {
    async fn list_products(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ApiProduct>, MedusaError> {
        let state = self.state.lock().unwrap();
        if let Some(status) = state.failing_listing {
            return Err(MedusaError::Status {
                status,
                body: "listing unavailable".into(),
            });
        }
        state
            .listing
            .iter()
            .skip(offset)
            .take(limit)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|err| MedusaError::Decode(err.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl CatalogWriter for FakeCatalog {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<ProductRef>, MedusaError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .products
            .iter()
            .find(|p| p.product.handle == handle)
            .map(|p| p.product.clone()))
    }

    async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<ProductRef, MedusaError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if let Some(err) = state.scripted_create_errors.pop_front() {
            return Err(err);
        }
        state.next_id += 1;
        let product = ProductRef {
            id: format!("prod_{}", state.next_id),
            handle: request.handle.clone(),
            title: request.title.clone(),
        };
        let inventory_item_ids = vec![format!("iitem_{}", state.next_id)];
        state.products.push(FakeProduct {
            product: product.clone(),
            inventory_item_ids,
        });
        Ok(product)
    }

    async fn product_inventory(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductInventory>, MedusaError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .products
            .iter()
            .find(|p| p.product.id == product_id)
            .map(|p| ProductInventory {
                product: p.product.clone(),
                inventory_item_ids: p.inventory_item_ids.clone(),
            }))
    }

    async fn set_stocked_quantity(
        &self,
        inventory_item_id: &str,
        location_id: &str,
        quantity: i64,
    ) -> Result<(), MedusaError> {
        let mut state = self.state.lock().unwrap();
        state.set_calls += 1;
        state.levels.insert(
            (inventory_item_id.to_string(), location_id.to_string()),
            quantity,
        );
        Ok(())
    }
}
