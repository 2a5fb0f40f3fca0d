//! Append-only ban log
//!
//! Opened once for the lifetime of the process. One human-readable line per
//! ban transition; never truncated or rotated here.

use crate::models::SuspicionRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub struct BanLog {
    path: PathBuf,
    file: File,
}

impl BanLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open ban log {}", path.display()))?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, record: &SuspicionRecord) -> Result<()> {
        let mut line = record.ban_log_line(Utc::now());
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to write ban log {}", self.path.display()))?;
        self.file.flush().await?;
        Ok(())
    }
}
