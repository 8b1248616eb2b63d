use crate::models::{ImportLogEntry, ImportOutcome};
use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default, Clone)]
pub struct ResumeLedger {
    settled: HashSet<String>,
}

impl ResumeLedger {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err),
        };
        let mut ledger = Self::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ImportLogEntry>(&line) {
                Ok(entry) => ledger.observe(&entry),
                Err(err) => {
                    warn!(target = "sync.resume", line = idx + 1, error = %err, "unreadable_log_line")
                }
            }
        }
        Ok(ledger)
    }

    fn observe(&mut self, entry: &ImportLogEntry) {
        if matches!(
            entry.outcome,
            ImportOutcome::Created { .. } | ImportOutcome::SkippedExists { .. }
        ) {
            self.settled.insert(entry.handle.clone());
        }
    }

    pub fn is_settled(&self, handle: &str) -> bool {
        self.settled.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.settled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oplog::OutcomeLog;
    use chrono::Utc;
    use std::io::Write;

    fn entry(handle: &str, outcome: ImportOutcome) -> String {
        serde_json::to_string(&ImportLogEntry {
            timestamp: Utc::now(),
            handle: handle.into(),
            awin_product_id: "1".into(),
            outcome,
        })
        .unwrap()
    }

    #[test]
    fn only_created_and_existing_handles_are_settled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "{}",
            entry(
                "created",
                ImportOutcome::Created {
                    product_id: "prod_1".into(),
                    inventory_error: None
                }
            )
        )
        .unwrap();
        writeln!(
            file,
            "{}",
            entry(
                "exists",
                ImportOutcome::SkippedExists {
                    product_id: "prod_2".into()
                }
            )
        )
        .unwrap();
        writeln!(
            file,
            "{}",
            entry(
                "broken",
                ImportOutcome::CreateError {
                    error: "HTTP 400".into()
                }
            )
        )
        .unwrap();
        write!(file, "{{\"timestamp\":\"2026-").unwrap();
        drop(file);

        let ledger = ResumeLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.is_settled("created"));
        assert!(ledger.is_settled("exists"));
        assert!(!ledger.is_settled("broken"));
    }

    #[test]
    fn entry_appended_after_a_crash_is_still_settled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.jsonl");
        std::fs::write(&path, "{\"timestamp\":\"2026-").unwrap();

        let mut log = OutcomeLog::open(&path).unwrap();
        log.append(&ImportLogEntry {
            timestamp: Utc::now(),
            handle: "wand".into(),
            awin_product_id: "1".into(),
            outcome: ImportOutcome::Created {
                product_id: "prod_1".into(),
                inventory_error: None,
            },
        })
        .unwrap();
        drop(log);

        let ledger = ResumeLedger::load(&path).unwrap();
        assert!(ledger.is_settled("wand"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn missing_log_is_an_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ResumeLedger::load(&dir.path().join("absent.jsonl")).unwrap();
        assert_eq!(ledger.len(), 0);
    }
}
