use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("unable to open log {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to append to {path}: {source}")]
    Append {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only JSON-lines file. Each entry is synced before `append` returns.
pub struct OutcomeLog {
    path: PathBuf,
    file: File,
}

impl OutcomeLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LogError::Open {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let open_error = |source| LogError::Open {
            path: path.display().to_string(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(open_error)?;
        terminate_torn_line(&mut file).map_err(open_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn append<T: Serialize>(&mut self, entry: &T) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let append_error = |source| LogError::Append {
            path: self.path.display().to_string(),
            source,
        };
        self.file.write_all(&line).map_err(append_error)?;
        self.file.flush().map_err(append_error)?;
        self.file.sync_data().map_err(append_error)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// A crash mid-append leaves a partial last line. Close it off so the next
// entry starts on a line of its own.
fn terminate_torn_line(file: &mut File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
        file.sync_data()?;
    }
    Ok(())
}

pub struct RunLogs {
    pub outcomes: OutcomeLog,
    pub failures: OutcomeLog,
}

impl RunLogs {
    pub fn open(dir: &Path, outcomes: &str, failures: &str) -> Result<Self, LogError> {
        Ok(Self {
            outcomes: OutcomeLog::open(&dir.join(outcomes))?,
            failures: OutcomeLog::open(&dir.join(failures))?,
        })
    }

    pub fn record<T: Serialize>(&mut self, entry: &T, failed: bool) -> Result<(), LogError> {
        self.outcomes.append(entry)?;
        if failed {
            self.failures.append(entry)?;
        }
        Ok(())
    }
}
