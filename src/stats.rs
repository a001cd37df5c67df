//! Append-only operational event log.
//!
//! One JSON line per webhook delivery outcome, under the persist root.
//! Consulted only for bookkeeping -- nothing in the pipeline reads it back.
//! Appends come from every concurrent handler, so writes go through an
//! async mutex over a single append-mode handle; a failed append is logged
//! and dropped rather than failing the request.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Serialize)]
struct StatsRecord<'a> {
    time: DateTime<Utc>,
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<&'a str>,
    outcome: &'a str,
}

#[derive(Clone)]
pub struct StatsLog {
    file: Arc<Mutex<File>>,
}

impl StatsLog {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open stats log: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Append one record.  Best-effort: encoding or I/O failures are logged,
    /// never surfaced to the webhook sender.
    pub async fn record(&self, event: &str, repo: Option<&str>, outcome: &str) {
        let record = StatsRecord {
            time: Utc::now(),
            event,
            repo,
            outcome,
        };
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode stats record");
                return;
            }
        };
        line.push(b'\n');

        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(&line).await {
            warn!(error = %e, "failed to append stats record");
        }
    }
}
