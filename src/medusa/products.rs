use crate::medusa::ProductRef;
use crate::models::{CatalogProduct, CatalogVariant, MoneyAmount};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

pub const LIST_FIELDS: &str =
    "id,handle,title,*variants,*variants.prices,+variants.inventory_quantity";

pub const INVENTORY_FIELDS: &str = "id,handle,title,*variants,*variants.inventory_items";

pub const DEFAULT_OPTION: &str = "Default";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
    pub id: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub variants: Option<Vec<ApiVariant>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVariant {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: Option<Vec<ApiPrice>>,
    #[serde(default)]
    pub calculated_price: Option<ApiCalculatedPrice>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub inventory_items: Option<Vec<ApiVariantInventoryItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPrice {
    pub amount: f64,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCalculatedPrice {
    #[serde(default)]
    pub calculated_amount: Option<f64>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVariantInventoryItem {
    pub inventory_item_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductListResponse {
    #[serde(default)]
    pub products: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub product: ApiProduct,
}

impl ApiProduct {
    pub fn to_ref(&self) -> ProductRef {
        ProductRef {
            id: self.id.clone(),
            handle: self.handle.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
        }
    }

    pub fn inventory_item_ids(&self) -> Vec<String> {
        self.variants
            .iter()
            .flatten()
            .flat_map(|variant| variant.inventory_items.iter().flatten())
            .map(|item| item.inventory_item_id.clone())
            .collect()
    }

    pub fn into_catalog(self) -> CatalogProduct {
        let variants = self
            .variants
            .unwrap_or_default()
            .into_iter()
            .map(ApiVariant::into_catalog)
            .collect();
        CatalogProduct {
            id: self.id,
            handle: self.handle.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            variants,
        }
    }
}

impl ApiVariant {
    fn into_catalog(self) -> CatalogVariant {
        let mut prices: Vec<MoneyAmount> = self
            .prices
            .unwrap_or_default()
            .into_iter()
            .map(|price| MoneyAmount {
                amount: price.amount,
                currency_code: price.currency_code,
            })
            .collect();
        if let Some(calculated) = self.calculated_price
            && let (Some(amount), Some(currency_code)) =
                (calculated.calculated_amount, calculated.currency_code)
        {
            prices.push(MoneyAmount {
                amount,
                currency_code,
            });
        }
        CatalogVariant {
            id: self.id,
            sku: self.sku,
            prices,
            inventory_quantity: self.inventory_quantity,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateProductRequest {
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub status: String,
    pub shipping_profile_id: Option<String>,
    pub sales_channels: Option<Vec<SalesChannelRef>>,
    pub options: Vec<ProductOption>,
    pub variants: Vec<CreateVariant>,
    pub images: Option<Vec<ImageRef>>,
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesChannelRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductOption {
    pub title: String,
    pub values: Vec<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateVariant {
    pub title: String,
    pub sku: Option<String>,
    pub ean: Option<String>,
    pub manage_inventory: bool,
    pub options: BTreeMap<String, String>,
    pub prices: Vec<CreatePrice>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatePrice {
    pub amount: i64,
    pub currency_code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageRef {
    pub url: String,
}

pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}
