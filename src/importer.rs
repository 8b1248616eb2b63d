use crate::config::SyncConfig;
use crate::idempotency::ResumeLedger;
use crate::medusa::inventory::IN_STOCK_QUANTITY;
use crate::medusa::products::{
    CreatePrice, CreateProductRequest, CreateVariant, DEFAULT_OPTION, ImageRef, ProductOption,
    SalesChannelRef, to_minor_units,
};
use crate::medusa::{CatalogWriter, MedusaError};
use crate::metrics;
use crate::models::{ImportLogEntry, ImportOutcome, MissingRecord};
use crate::oplog::{LogError, RunLogs};
use crate::stock::apply_level;
use crate::throttle::Throttle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const IMPORT_LOG: &str = "import.jsonl";
pub const IMPORT_FAILURES_LOG: &str = "import_failures.jsonl";
pub const IMPORT_SUMMARY: &str = "import_summary.json";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub throttle: Throttle,
    pub currency: String,
    pub product_status: String,
    pub stock_location_id: Option<String>,
    pub shipping_profile_id: Option<String>,
    pub sales_channel_id: Option<String>,
    pub dry_run: bool,
    pub limit: Option<usize>,
}

impl ImportOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            throttle: config.throttle,
            currency: config.currency.clone(),
            product_status: config.product_status.clone(),
            stock_location_id: config.stock_location_id.clone(),
            shipping_profile_id: config.shipping_profile_id.clone(),
            sales_channel_id: config.sales_channel_id.clone(),
            dry_run: false,
            limit: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordFailure {
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("lookup failed: {0}")]
    Lookup(#[source] MedusaError),
    #[error("create failed: {0}")]
    Create(#[source] MedusaError),
}

impl RecordFailure {
    fn into_outcome(self) -> ImportOutcome {
        match self {
            RecordFailure::Invalid(reason) => ImportOutcome::Invalid { reason },
            RecordFailure::Lookup(err) => ImportOutcome::LookupError {
                error: err.to_string(),
            },
            RecordFailure::Create(err) => ImportOutcome::CreateError {
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub log_path: Option<PathBuf>,
}

impl ImportSummary {
    fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            dry_run,
            total: 0,
            created: 0,
            skipped: 0,
            failed: 0,
            log_path: None,
        }
    }

    fn absorb(mut self, outcome: &ImportOutcome) -> Self {
        self.total += 1;
        match outcome {
            ImportOutcome::Created { .. } => self.created += 1,
            ImportOutcome::SkippedExists { .. }
            | ImportOutcome::SkippedLogged
            | ImportOutcome::DryRun => self.skipped += 1,
            ImportOutcome::Invalid { .. }
            | ImportOutcome::LookupError { .. }
            | ImportOutcome::CreateError { .. } => self.failed += 1,
        }
        self
    }
}

fn is_failure(outcome: &ImportOutcome) -> bool {
    matches!(
        outcome,
        ImportOutcome::Invalid { .. }
            | ImportOutcome::LookupError { .. }
            | ImportOutcome::CreateError { .. }
    )
}

// Every outcome is on disk before the next record starts.
pub async fn import_missing(
    records: &[MissingRecord],
    target: &dyn CatalogWriter,
    options: &ImportOptions,
    ledger: &ResumeLedger,
    logs: &mut RunLogs,
) -> Result<ImportSummary, LogError> {
    let limit = options.limit.unwrap_or(records.len());
    let mut outcomes = Vec::with_capacity(limit.min(records.len()));

    for record in records.iter().take(limit) {
        if ledger.is_settled(&record.handle) {
            info!(target = "sync.import", handle = %record.handle, "already_logged_skip");
            outcomes.push(ImportOutcome::SkippedLogged);
            continue;
        }

        let outcome = match import_one(record, target, options).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                warn!(target = "sync.import", handle = %record.handle, error = %failure, "record_failed");
                failure.into_outcome()
            }
        };
        metrics::outcome("import", outcome.label());
        let entry = ImportLogEntry {
            timestamp: Utc::now(),
            handle: record.handle.clone(),
            awin_product_id: record.awin_product_id.clone(),
            outcome,
        };
        logs.record(&entry, is_failure(&entry.outcome))?;
        outcomes.push(entry.outcome);
    }

    let mut summary = outcomes
        .iter()
        .fold(ImportSummary::new(options.dry_run), ImportSummary::absorb);
    summary.finished_at = Utc::now();
    summary.log_path = Some(logs.outcomes.path().to_path_buf());
    info!(
        target = "sync.import",
        created = summary.created,
        skipped = summary.skipped,
        failed = summary.failed,
        "import_finished"
    );
    Ok(summary)
}

async fn import_one(
    record: &MissingRecord,
    target: &dyn CatalogWriter,
    options: &ImportOptions,
) -> Result<ImportOutcome, RecordFailure> {
    let price = validate(record)?;

    let existing = options
        .throttle
        .call("find_by_handle", || target.find_by_handle(&record.handle))
        .await
        .map_err(RecordFailure::Lookup)?;
    if let Some(product) = existing {
        info!(target = "sync.import", handle = %record.handle, product_id = %product.id, "already_exists");
        return Ok(ImportOutcome::SkippedExists {
            product_id: product.id,
        });
    }

    if options.dry_run {
        info!(target = "sync.import", handle = %record.handle, "dry_run_would_create");
        return Ok(ImportOutcome::DryRun);
    }

    let request = build_product_request(record, price, options);
    let created = options
        .throttle
        .call("create_product", || target.create_product(&request))
        .await
        .map_err(RecordFailure::Create)?;
    info!(target = "sync.import", handle = %record.handle, product_id = %created.id, "product_created");

    let mut inventory_error = None;
    if record.in_stock
        && let Some(location_id) = options.stock_location_id.as_deref()
    {
        if let Err(err) = stock_created_product(target, options, &created.id, location_id).await {
            warn!(target = "sync.import", handle = %record.handle, error = %err, "initial_stock_failed");
            inventory_error = Some(err);
        }
    }

    Ok(ImportOutcome::Created {
        product_id: created.id,
        inventory_error,
    })
}

// The variant's own inventory item is created with the product; stock it in
// place instead of registering a separate item.
async fn stock_created_product(
    target: &dyn CatalogWriter,
    options: &ImportOptions,
    product_id: &str,
    location_id: &str,
) -> Result<(), String> {
    let inventory = options
        .throttle
        .call("product_inventory", || target.product_inventory(product_id))
        .await
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("product {product_id} not found after create"))?;
    if inventory.inventory_item_ids.is_empty() {
        return Err(format!("product {product_id} has no inventory items"));
    }
    apply_level(
        target,
        &options.throttle,
        &inventory.inventory_item_ids,
        location_id,
        IN_STOCK_QUANTITY,
    )
    .await
}

fn validate(record: &MissingRecord) -> Result<f64, RecordFailure> {
    if record.handle.trim().is_empty() {
        return Err(RecordFailure::Invalid("missing handle".into()));
    }
    match record.price {
        None => Err(RecordFailure::Invalid("missing or unparsable price".into())),
        Some(price) if price <= 0.0 => Err(RecordFailure::Invalid(format!(
            "non-positive price {price}"
        ))),
        Some(price) => Ok(price),
    }
}

pub fn build_product_request(
    record: &MissingRecord,
    price: f64,
    options: &ImportOptions,
) -> CreateProductRequest {
    let sku = Some(record.awin_product_id.clone()).filter(|s| !s.is_empty());
    let ean = Some(record.ean.clone()).filter(|s| !s.is_empty());
    let images = Some(record.image_url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| vec![ImageRef { url: url.to_string() }]);

    let mut metadata = BTreeMap::new();
    for (key, value) in [
        ("awin_product_id", &record.awin_product_id),
        ("brand", &record.brand),
        ("merchant_category", &record.category),
        ("awin_deep_link", &record.deep_link),
    ] {
        if !value.is_empty() {
            metadata.insert(key.to_string(), value.clone());
        }
    }

    CreateProductRequest {
        title: if record.title.trim().is_empty() {
            record.handle.clone()
        } else {
            record.title.clone()
        },
        handle: record.handle.clone(),
        description: Some(record.description.clone()).filter(|d| !d.is_empty()),
        status: options.product_status.clone(),
        shipping_profile_id: options.shipping_profile_id.clone(),
        sales_channels: options
            .sales_channel_id
            .clone()
            .map(|id| vec![SalesChannelRef { id }]),
        options: vec![ProductOption {
            title: DEFAULT_OPTION.into(),
            values: vec![DEFAULT_OPTION.into()],
        }],
        variants: vec![CreateVariant {
            title: DEFAULT_OPTION.into(),
            sku,
            ean,
            manage_inventory: true,
            options: BTreeMap::from([(DEFAULT_OPTION.to_string(), DEFAULT_OPTION.to_string())]),
            prices: vec![CreatePrice {
                amount: to_minor_units(price),
                currency_code: options.currency.clone(),
            }],
        }],
        images,
        metadata: Some(metadata).filter(|m| !m.is_empty()),
    }
}
