use crate::medusa::inventory::target_quantity;
use crate::medusa::{CatalogWriter, MedusaError, ProductInventory};
use crate::metrics;
use crate::models::{StockLogEntry, StockMismatchRecord, StockOutcome};
use crate::oplog::{LogError, RunLogs};
use crate::throttle::Throttle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

pub const STOCK_LOG: &str = "stock_reconcile.jsonl";
pub const STOCK_FAILURES_LOG: &str = "stock_failures.jsonl";
pub const STOCK_SUMMARY: &str = "stock_summary.json";

#[derive(Debug, Clone)]
pub struct StockOptions {
    pub throttle: Throttle,
    pub location_id: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub location_id: String,
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub log_path: Option<PathBuf>,
}

impl StockSummary {
    fn absorb(mut self, outcome: &StockOutcome) -> Self {
        self.total += 1;
        match outcome {
            StockOutcome::Updated { .. } => self.updated += 1,
            StockOutcome::DryRun { .. } | StockOutcome::NoInventoryItems { .. } => {
                self.skipped += 1
            }
            StockOutcome::NotFound
            | StockOutcome::LookupError { .. }
            | StockOutcome::UpdateError { .. } => self.failed += 1,
        }
        self
    }
}

fn is_failure(outcome: &StockOutcome) -> bool {
    matches!(
        outcome,
        StockOutcome::NotFound | StockOutcome::LookupError { .. } | StockOutcome::UpdateError { .. }
    )
}

pub async fn reconcile_stock(
    records: &[StockMismatchRecord],
    target: &dyn CatalogWriter,
    options: &StockOptions,
    logs: &mut RunLogs,
) -> Result<StockSummary, LogError> {
    let started_at = Utc::now();
    let mut outcomes = Vec::with_capacity(records.len());

    for record in records {
        let outcome = reconcile_one(record, target, options).await;
        if is_failure(&outcome) {
            warn!(target = "sync.stock", handle = %record.handle, status = outcome.label(), "stock_record_failed");
        }
        metrics::outcome("stock", outcome.label());
        let entry = StockLogEntry {
            timestamp: Utc::now(),
            handle: record.handle.clone(),
            outcome,
        };
        logs.record(&entry, is_failure(&entry.outcome))?;
        outcomes.push(entry.outcome);
    }

    let empty = StockSummary {
        run_id: Uuid::new_v4(),
        started_at,
        finished_at: started_at,
        dry_run: options.dry_run,
        location_id: options.location_id.clone(),
        total: 0,
        updated: 0,
        skipped: 0,
        failed: 0,
        log_path: Some(logs.outcomes.path().to_path_buf()),
    };
    let mut summary = outcomes.iter().fold(empty, StockSummary::absorb);
    summary.finished_at = Utc::now();
    info!(
        target = "sync.stock",
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        "stock_reconcile_finished"
    );
    Ok(summary)
}

async fn reconcile_one(
    record: &StockMismatchRecord,
    target: &dyn CatalogWriter,
    options: &StockOptions,
) -> StockOutcome {
    let inventory = match locate(record, target, &options.throttle).await {
        Ok(Some(inventory)) => inventory,
        Ok(None) => return StockOutcome::NotFound,
        Err(err) => {
            return StockOutcome::LookupError {
                error: err.to_string(),
            };
        }
    };

    let product_id = inventory.product.id;
    if inventory.inventory_item_ids.is_empty() {
        return StockOutcome::NoInventoryItems { product_id };
    }

    let quantity = target_quantity(record.awin_in_stock);
    let inventory_items = inventory.inventory_item_ids.len();
    if options.dry_run {
        info!(target = "sync.stock", handle = %record.handle, quantity, inventory_items, "dry_run_would_update");
        return StockOutcome::DryRun {
            product_id,
            inventory_items,
            quantity,
        };
    }

    if let Err(error) = apply_level(
        target,
        &options.throttle,
        &inventory.inventory_item_ids,
        &options.location_id,
        quantity,
    )
    .await
    {
        return StockOutcome::UpdateError { error };
    }
    info!(target = "sync.stock", handle = %record.handle, product_id = %product_id, quantity, "stock_updated");
    StockOutcome::Updated {
        product_id,
        inventory_items,
        quantity,
    }
}

pub async fn apply_level(
    target: &dyn CatalogWriter,
    throttle: &Throttle,
    item_ids: &[String],
    location_id: &str,
    quantity: i64,
) -> Result<(), String> {
    for item_id in item_ids {
        throttle
            .call("set_stocked_quantity", || {
                target.set_stocked_quantity(item_id, location_id, quantity)
            })
            .await
            .map_err(|err| format!("{item_id}: {err}"))?;
    }
    Ok(())
}

// Report ids go stale after a re-import; the handle still resolves.
async fn locate(
    record: &StockMismatchRecord,
    target: &dyn CatalogWriter,
    throttle: &Throttle,
) -> Result<Option<ProductInventory>, MedusaError> {
    if !record.product_id.is_empty() {
        let found = throttle
            .call("product_inventory", || target.product_inventory(&record.product_id))
            .await?;
        if found.is_some() {
            return Ok(found);
        }
    }
    if record.handle.is_empty() {
        return Ok(None);
    }
    let Some(product) = throttle
        .call("find_by_handle", || target.find_by_handle(&record.handle))
        .await?
    else {
        return Ok(None);
    };
    throttle
        .call("product_inventory", || target.product_inventory(&product.id))
        .await
}
