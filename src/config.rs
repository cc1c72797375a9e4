use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const DEFAULT_HEADER: &str = "Sampling Results";

/// Workpaper identification captured alongside a sampling run.
///
/// Every field is optional in the JSON file; missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditMetadata {
    pub client_name: String,
    pub header_label: String,
    pub account_label: String,
    pub prepared_by: String,
    pub prepared_date: String,
    pub reviewed_by: String,
    pub reviewed_date: String,
    /// Period label, e.g. `Audit Q4 2025`.
    pub schedule: String,
}

impl AuditMetadata {
    pub fn header_or_default(&self) -> &str {
        if self.header_label.trim().is_empty() { DEFAULT_HEADER } else { &self.header_label }
    }

    /// Fills blank preparation/review dates with `today`.
    pub fn with_default_dates(mut self, today: NaiveDate) -> Self {
        let iso = today.format("%Y-%m-%d").to_string();
        if self.prepared_date.trim().is_empty() {
            self.prepared_date = iso.clone();
        }
        if self.reviewed_date.trim().is_empty() {
            self.reviewed_date = iso;
        }
        self
    }
}

/// `-` for blank fields in on-screen summaries.
pub fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

pub fn load_metadata(path: &Path) -> Result<AuditMetadata> {
    let text = fs::read_to_string(path).with_context(|| format!("gagal membaca metadata: {}", path.display()))?;
    let meta: AuditMetadata = serde_json::from_str(&text).context("metadata JSON tidak valid")?;
    Ok(meta)
}
