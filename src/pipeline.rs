use crate::catalog;
use crate::config::{ConfigError, SyncConfig};
use crate::delimited;
use crate::medusa::CatalogReader;
use crate::models::{FeedRecord, StageReport};
use crate::reconcile::reconcile;
use crate::report::{self, BucketCounts, DetectSummary};
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DetectRequest {
    pub feed_path: PathBuf,
    pub out_dir: PathBuf,
    pub delimiter: u8,
}

/// Read-only detection run: feed and catalog in, report files out.
pub struct DetectPipeline<'a> {
    reader: &'a dyn CatalogReader,
    config: SyncConfig,
}

impl<'a> DetectPipeline<'a> {
    pub fn new(reader: &'a dyn CatalogReader, config: SyncConfig) -> Self {
        Self { reader, config }
    }

    pub async fn run(&self, request: &DetectRequest) -> Result<DetectSummary, PipelineError> {
        let mut stages = Vec::new();

        let feed = self
            .capture_stage("read_feed", &mut stages, async {
                if !request.feed_path.is_file() {
                    return Err(PipelineError::config(
                        "read_feed",
                        ConfigError::MissingInput(request.feed_path.display().to_string()),
                    ));
                }
                let table = delimited::read_file(&request.feed_path, request.delimiter)
                    .map_err(|err| PipelineError::io("read_feed", err))?;
                info!(
                    target = "sync.detect",
                    rows = table.len(),
                    columns = table.headers.len(),
                    "feed_parsed"
                );
                Ok(table.rows.iter().map(FeedRecord::from_row).collect::<Vec<_>>())
            })
            .await?;

        let products = self
            .capture_stage("fetch_catalog", &mut stages, async {
                catalog::fetch_all(self.reader, self.config.page_size)
                    .await
                    .map_err(|err| PipelineError::remote_read("fetch_catalog", err))
            })
            .await?;

        let run = self
            .capture_stage("reconcile", &mut stages, async {
                Ok(reconcile(&feed, &products, &self.config.currency))
            })
            .await?;

        let files = self
            .capture_stage("write_reports", &mut stages, async {
                report::write_reports(&request.out_dir, &run, request.delimiter)
                    .map_err(|err| PipelineError::io("write_reports", err))
            })
            .await?;

        let summary = DetectSummary {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            currency: self.config.currency.clone(),
            counts: BucketCounts::from_run(feed.len(), products.len(), &run),
            files,
            stages,
        };
        report::write_summary(&summary.files.summary_json, &summary)
            .map_err(|err| PipelineError::io("write_summary", err))?;
        info!(
            target = "sync.detect",
            run_id = %summary.run_id,
            missing = summary.counts.missing,
            catalog_only = summary.counts.catalog_only,
            stock_mismatches = summary.counts.stock_mismatches,
            loose_matches = summary.counts.loose_matches,
            "detect_finished"
        );
        Ok(summary)
    }

    async fn capture_stage<T, Fut>(
        &self,
        name: &'static str,
        stages: &mut Vec<StageReport>,
        fut: Fut,
    ) -> Result<T, PipelineError>
    where
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let started = Instant::now();
        let value = fut.await?;
        let elapsed_ms = started.elapsed().as_millis();
        crate::metrics::stage_elapsed(name, elapsed_ms);
        stages.push(StageReport::new(name, elapsed_ms));
        Ok(value)
    }
}

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    Config,
    RemoteRead,
    Io,
}

impl PipelineError {
    pub fn config(stage: &'static str, err: impl ToString) -> Self {
        Self::new(stage, err, PipelineErrorKind::Config)
    }

    pub fn remote_read(stage: &'static str, err: impl ToString) -> Self {
        Self::new(stage, err, PipelineErrorKind::RemoteRead)
    }

    pub fn io(stage: &'static str, err: impl ToString) -> Self {
        Self::new(stage, err, PipelineErrorKind::Io)
    }

    fn new(stage: &'static str, err: impl ToString, kind: PipelineErrorKind) -> Self {
        Self {
            stage,
            message: err.to_string(),
            kind,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }
}
