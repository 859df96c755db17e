//! JSON-lines audit log with daily file rotation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use super::{AuditEntry, TransactionLog};

/// Appends one JSON object per transaction to `audit-YYYY-MM-DD.log` in the
/// configured directory, switching files when the UTC date changes.
#[derive(Debug)]
pub struct JsonFileLog {
    dir: PathBuf,
}

impl JsonFileLog {
    /// Creates the log, ensuring the directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub async fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Path of the file entries are currently appended to.
    #[must_use]
    pub fn current_file(&self) -> PathBuf {
        self.dir
            .join(format!("audit-{}.log", Utc::now().format("%Y-%m-%d")))
    }
}

#[async_trait]
impl TransactionLog for JsonFileLog {
    async fn log_transaction(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.current_file())
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
