//! Append-only JSONL audit trail of recorded payouts.
//!
//! One JSON object per line. Write failures are logged and never propagate:
//! the game document is the source of truth, this file is for humans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use squares::PayoutEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub game_id: String,
    pub logged_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payout: PayoutEvent,
}

pub struct PayoutLog {
    path: PathBuf,
}

impl PayoutLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, game_id: &str, payout: &PayoutEvent) {
        let record = PayoutRecord {
            game_id: game_id.to_string(),
            logged_at: Utc::now(),
            payout: payout.clone(),
        };
        let line = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!("[PAYOUT] Failed to serialize {}: {}", payout.id, e);
                return;
            }
        };
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut f) => {
                if let Err(e) = writeln!(f, "{}", line) {
                    warn!("[PAYOUT] Failed to write {}: {}", payout.id, e);
                }
            }
            Err(e) => warn!("[PAYOUT] Failed to open {}: {}", self.path.display(), e),
        }
    }
}
