use crate::http::build_client;
use crate::medusa::auth::{AdminAuth, resolve_admin_auth};
use crate::medusa::config::{MedusaConfig, PUBLISHABLE_KEY_HEADER};
use crate::medusa::inventory::{LocationLevel, StockedQuantityUpdate};
use crate::medusa::products::{
    ApiProduct, CreateProductRequest, INVENTORY_FIELDS, LIST_FIELDS, ProductListResponse,
    ProductResponse,
};
use crate::medusa::{CatalogReader, CatalogWriter, MedusaError, ProductInventory, ProductRef};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::debug;
use urlencoding::encode;

#[derive(Debug, Clone)]
pub struct MedusaClient {
    config: MedusaConfig,
    admin: Option<AdminAuth>,
    http: Client,
}

impl MedusaClient {
    pub fn reader(config: MedusaConfig) -> Self {
        Self {
            config,
            admin: None,
            http: build_client(),
        }
    }

    // A bad login fails before any record is touched.
    pub async fn writer(config: MedusaConfig) -> Result<Self, MedusaError> {
        let credentials = config
            .write_credentials()
            .map_err(|err| MedusaError::Auth(err.to_string()))?;
        let http = build_client();
        let admin = resolve_admin_auth(&http, &config, &credentials).await?;
        Ok(Self {
            config,
            admin: Some(admin),
            http,
        })
    }

    fn admin_auth(&self) -> Result<&str, MedusaError> {
        self.admin
            .as_ref()
            .map(AdminAuth::header_value)
            .ok_or_else(|| MedusaError::Auth("client has no admin credentials".into()))
    }

    fn admin_get(&self, path: &str) -> Result<RequestBuilder, MedusaError> {
        Ok(self
            .http
            .get(self.config.url(path))
            .header(AUTHORIZATION, self.admin_auth()?))
    }

    fn admin_post(&self, path: &str) -> Result<RequestBuilder, MedusaError> {
        Ok(self
            .http
            .post(self.config.url(path))
            .header(AUTHORIZATION, self.admin_auth()?))
    }
}

async fn send(request: RequestBuilder) -> Result<Response, MedusaError> {
    let response = request
        .send()
        .await
        .map_err(|err| MedusaError::Request(err.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        return Err(MedusaError::RateLimited { retry_after_secs });
    }
    let body = response.text().await.unwrap_or_default();
    Err(MedusaError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, MedusaError> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(|err| MedusaError::Decode(err.to_string()))
}

#[async_trait]
impl CatalogReader for MedusaClient {
    async fn list_products(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ApiProduct>, MedusaError> {
        let key = self
            .config
            .read_key()
            .map_err(|err| MedusaError::Auth(err.to_string()))?;
        let request = self
            .http
            .get(self.config.url("/store/products"))
            .header(PUBLISHABLE_KEY_HEADER, key)
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("fields", LIST_FIELDS.to_string()),
            ]);
        let payload: ProductListResponse = send_json(request).await?;
        debug!(
            target = "sync.medusa",
            offset,
            returned = payload.products.len(),
            "catalog_page"
        );
        Ok(payload.products)
    }
}

#[async_trait]
impl CatalogWriter for MedusaClient {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<ProductRef>, MedusaError> {
        let request = self
            .admin_get("/admin/products")?
            .query(&[("handle", handle), ("fields", "id,handle,title")]);
        let payload: ProductListResponse = send_json(request).await?;
        Ok(payload
            .products
            .iter()
            .find(|product| product.handle.as_deref() == Some(handle))
            .map(ApiProduct::to_ref))
    }

    async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<ProductRef, MedusaError> {
        let payload: ProductResponse =
            send_json(self.admin_post("/admin/products")?.json(request)).await?;
        Ok(payload.product.to_ref())
    }

    async fn product_inventory(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductInventory>, MedusaError> {
        let path = format!("/admin/products/{}", encode(product_id));
        let request = self.admin_get(&path)?.query(&[("fields", INVENTORY_FIELDS)]);
        match send_json::<ProductResponse>(request).await {
            Ok(payload) => Ok(Some(ProductInventory {
                product: payload.product.to_ref(),
                inventory_item_ids: payload.product.inventory_item_ids(),
            })),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn set_stocked_quantity(
        &self,
        inventory_item_id: &str,
        location_id: &str,
        quantity: i64,
    ) -> Result<(), MedusaError> {
        let item = encode(inventory_item_id);
        let update = self
            .admin_post(&format!(
                "/admin/inventory-items/{item}/location-levels/{}",
                encode(location_id)
            ))?
            .json(&StockedQuantityUpdate {
                stocked_quantity: quantity,
            });
        match send(update).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(
                    target = "sync.medusa",
                    inventory_item_id, location_id, "location_level_missing_creating"
                );
                let create = self
                    .admin_post(&format!("/admin/inventory-items/{item}/location-levels"))?
                    .json(&LocationLevel {
                        location_id: location_id.to_string(),
                        stocked_quantity: quantity,
                    });
                send(create).await.map(|_| ())
            }
            Err(err) => Err(err),
        }
    }
}
