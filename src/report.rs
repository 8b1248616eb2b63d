use crate::delimited::{self, FeedError};
use crate::models::{CatalogOnlyRecord, MissingRecord, StageReport, StockMismatchRecord};
use crate::reconcile::Reconciliation;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const MISSING_CSV: &str = "missing_products.csv";
pub const MISSING_JSON: &str = "missing_products.json";
pub const CATALOG_ONLY_CSV: &str = "catalog_only_products.csv";
pub const STOCK_MISMATCH_CSV: &str = "stock_mismatches.csv";
pub const LOOSE_MATCH_JSON: &str = "loose_matches.json";
pub const SUMMARY_JSON: &str = "summary.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("{path} row {row}: {reason}")]
    InvalidRow {
        path: String,
        row: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPaths {
    pub missing_csv: PathBuf,
    pub missing_json: PathBuf,
    pub catalog_only_csv: PathBuf,
    pub stock_mismatch_csv: PathBuf,
    pub loose_match_json: PathBuf,
    pub summary_json: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            missing_csv: dir.join(MISSING_CSV),
            missing_json: dir.join(MISSING_JSON),
            catalog_only_csv: dir.join(CATALOG_ONLY_CSV),
            stock_mismatch_csv: dir.join(STOCK_MISMATCH_CSV),
            loose_match_json: dir.join(LOOSE_MATCH_JSON),
            summary_json: dir.join(SUMMARY_JSON),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BucketCounts {
    pub feed_records: usize,
    pub catalog_products: usize,
    pub matched_exact: usize,
    pub matched_loose: usize,
    pub missing: usize,
    pub catalog_only: usize,
    pub stock_mismatches: usize,
    pub loose_matches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub currency: String,
    pub counts: BucketCounts,
    pub files: ReportPaths,
    pub stages: Vec<StageReport>,
}

impl BucketCounts {
    pub fn from_run(feed_records: usize, catalog_products: usize, run: &Reconciliation) -> Self {
        Self {
            feed_records,
            catalog_products,
            matched_exact: run.matched_exact,
            matched_loose: run.matched_loose,
            missing: run.missing.len(),
            catalog_only: run.catalog_only.len(),
            stock_mismatches: run.stock_mismatches.len(),
            loose_matches: run.loose_matches.len(),
        }
    }
}

pub fn write_reports(
    dir: &Path,
    run: &Reconciliation,
    delimiter: u8,
) -> Result<ReportPaths, ReportError> {
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
    let paths = ReportPaths::in_dir(dir);
    write_delimited(&paths.missing_csv, &run.missing, delimiter)?;
    write_json(&paths.missing_json, &run.missing)?;
    write_delimited(&paths.catalog_only_csv, &run.catalog_only, delimiter)?;
    write_delimited(&paths.stock_mismatch_csv, &run.stock_mismatches, delimiter)?;
    write_json(&paths.loose_match_json, &run.loose_matches)?;
    Ok(paths)
}

pub fn write_summary(path: &Path, summary: &DetectSummary) -> Result<(), ReportError> {
    write_json(path, summary)
}

// Must follow the struct's field order.
pub trait ReportColumns {
    const COLUMNS: &'static [&'static str];
}

impl ReportColumns for MissingRecord {
    const COLUMNS: &'static [&'static str] = &[
        "handle",
        "title",
        "awin_product_id",
        "price",
        "currency",
        "in_stock",
        "brand",
        "category",
        "ean",
        "image_url",
        "deep_link",
        "description",
    ];
}

impl ReportColumns for CatalogOnlyRecord {
    const COLUMNS: &'static [&'static str] = &["handle", "product_id", "title", "price", "inventory"];
}

impl ReportColumns for StockMismatchRecord {
    const COLUMNS: &'static [&'static str] = &[
        "handle",
        "product_id",
        "title",
        "awin_product_id",
        "awin_in_stock",
        "catalog_inventory",
    ];
}

// Header row first so empty buckets still document their columns.
pub fn write_delimited<T: Serialize + ReportColumns>(
    path: &Path,
    records: &[T],
    delimiter: u8,
) -> Result<(), ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;
    writer.write_record(T::COLUMNS).map_err(csv_error)?;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| io_error(path, source))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| ReportError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, body).map_err(|source| io_error(path, source))
}

pub fn load_missing(path: &Path) -> Result<Vec<MissingRecord>, ReportError> {
    let body = fs::read(path).map_err(|source| io_error(path, source))?;
    serde_json::from_slice(&body).map_err(|source| ReportError::Json {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_stock_mismatches(
    path: &Path,
    delimiter: u8,
) -> Result<Vec<StockMismatchRecord>, ReportError> {
    let table = delimited::read_file(path, delimiter)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            StockMismatchRecord::from_row(row).map_err(|reason| ReportError::InvalidRow {
                path: path.display().to_string(),
                row: idx + 1,
                reason,
            })
        })
        .collect()
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LooseMatchRecord;

    fn missing(handle: &str, price: Option<f64>, description: &str) -> MissingRecord {
        MissingRecord {
            handle: handle.into(),
            title: "Magic | Wand, \"Mini\"".into(),
            awin_product_id: "12345".into(),
            price,
            currency: "EUR".into(),
            in_stock: true,
            brand: "Acme".into(),
            category: "Wands".into(),
            ean: "5012345678900".into(),
            image_url: "https://img.example/1.jpg".into(),
            deep_link: "https://shop.example/magic-wand".into(),
            description: description.into(),
        }
    }

    fn sample_run() -> Reconciliation {
        Reconciliation {
            missing: vec![
                missing("magic-wand", Some(19.99), "two\nlines"),
                missing("odd-thing", None, "plain"),
            ],
            catalog_only: vec![CatalogOnlyRecord {
                handle: "cuffs".into(),
                product_id: "prod_9".into(),
                title: "Cuffs".into(),
                price: Some(5.0),
                inventory: 2,
            }],
            stock_mismatches: vec![StockMismatchRecord {
                handle: "bullet".into(),
                product_id: "prod_3".into(),
                title: "Bullet".into(),
                awin_product_id: "777".into(),
                awin_in_stock: true,
                catalog_inventory: 0,
            }],
            loose_matches: vec![LooseMatchRecord {
                awin_product_id: "1".into(),
                awin_name: "Wand Pink".into(),
                awin_slug: "wand-pink".into(),
                comparison_key: "wand".into(),
                handle: "wand".into(),
                product_id: "prod_1".into(),
                title: "Wand".into(),
            }],
            matched_exact: 0,
            matched_loose: 1,
        }
    }

    // The csv writer keeps the fractional part of whole prices.
    fn price_cell(price: Option<f64>) -> String {
        price.map(|value| format!("{value:?}")).unwrap_or_default()
    }

    fn missing_cells(record: &MissingRecord) -> Vec<String> {
        vec![
            record.handle.clone(),
            record.title.clone(),
            record.awin_product_id.clone(),
            price_cell(record.price),
            record.currency.clone(),
            record.in_stock.to_string(),
            record.brand.clone(),
            record.category.clone(),
            record.ean.clone(),
            record.image_url.clone(),
            record.deep_link.clone(),
            record.description.clone(),
        ]
    }

    fn catalog_only_cells(record: &CatalogOnlyRecord) -> Vec<String> {
        vec![
            record.handle.clone(),
            record.product_id.clone(),
            record.title.clone(),
            price_cell(record.price),
            record.inventory.to_string(),
        ]
    }

    fn assert_rows(table: &delimited::FeedTable, columns: &[&str], expected: &[Vec<String>]) {
        assert_eq!(table.headers, columns);
        assert_eq!(table.rows.len(), expected.len());
        for (row, cells) in table.rows.iter().zip(expected) {
            assert_eq!(row.len(), columns.len());
            for (column, cell) in columns.iter().zip(cells) {
                assert_eq!(&row[*column], cell, "column {column}");
            }
        }
    }

    #[test]
    fn missing_report_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let paths = write_reports(dir.path(), &run, b'|').unwrap();

        let table = delimited::read_file(&paths.missing_csv, b'|').unwrap();
        let expected: Vec<_> = run.missing.iter().map(missing_cells).collect();
        assert_rows(&table, MissingRecord::COLUMNS, &expected);
        assert_eq!(table.rows[0]["title"], "Magic | Wand, \"Mini\"");
        assert_eq!(table.rows[0]["description"], "two\nlines");
        assert_eq!(table.rows[1]["price"], "");

        assert_eq!(load_missing(&paths.missing_json).unwrap(), run.missing);
    }

    #[test]
    fn catalog_only_report_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = sample_run();
        run.catalog_only.push(CatalogOnlyRecord {
            handle: "gag".into(),
            product_id: "prod_10".into(),
            title: "Gag | Deluxe".into(),
            price: None,
            inventory: 0,
        });
        let paths = write_reports(dir.path(), &run, b'|').unwrap();

        let table = delimited::read_file(&paths.catalog_only_csv, b'|').unwrap();
        let expected: Vec<_> = run.catalog_only.iter().map(catalog_only_cells).collect();
        assert_rows(&table, CatalogOnlyRecord::COLUMNS, &expected);
        assert_eq!(table.rows[0]["price"], "5.0");
        assert_eq!(table.rows[1]["price"], "");
    }

    #[test]
    fn stock_mismatch_report_feeds_the_stock_stage() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let paths = write_reports(dir.path(), &run, b'|').unwrap();
        let loaded = load_stock_mismatches(&paths.stock_mismatch_csv, b'|').unwrap();
        assert_eq!(loaded, run.stock_mismatches);
    }

    #[test]
    fn empty_buckets_still_carry_headers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports(dir.path(), &Reconciliation::default(), b'|').unwrap();
        let table = delimited::read_file(&paths.stock_mismatch_csv, b'|').unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers[4], "awin_in_stock");
        assert!(load_stock_mismatches(&paths.stock_mismatch_csv, b'|')
            .unwrap()
            .is_empty());
    }

    #[test]
    fn summary_lists_counts_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let paths = write_reports(dir.path(), &run, b'|').unwrap();
        let summary = DetectSummary {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            currency: "eur".into(),
            counts: BucketCounts::from_run(3, 2, &run),
            files: paths.clone(),
            stages: vec![StageReport::new("reconcile", 3)],
        };
        write_summary(&paths.summary_json, &summary).unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&paths.summary_json).unwrap()).unwrap();
        assert_eq!(raw["counts"]["missing"], 2);
        assert_eq!(raw["counts"]["loose_matches"], 1);
        assert!(raw["files"]["missing_csv"]
            .as_str()
            .unwrap()
            .ends_with(MISSING_CSV));
    }
}
