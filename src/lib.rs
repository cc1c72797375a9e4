//! Audit sampling worksheets ("uji detil").
//!
//! Four pasted ledger columns (tanggal, voucher, keterangan, nominal) are
//! reconciled, normalized into records, and sampled by risk tier. The
//! result is a [`SamplingRun`] that the CLI renders and [`export`] writes
//! into a workpaper spreadsheet.

pub mod config;
pub mod demo;
pub mod export;
pub mod journal;
pub mod normalize;
pub mod sampling;
pub mod summary;

use chrono::{Datelike, Local};
use rand::Rng;
use serde::Serialize;
use tracing::info;

pub use config::AuditMetadata;
pub use journal::{Column, ColumnCounts, MismatchAnalysis, RawColumns, Record};
pub use sampling::{Method, SampleSet};
pub use summary::AggregateSummary;

fn column_list(columns: &[Column]) -> String {
    columns.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
}

/// Fatal input problems. Any of these stops the run before sampling.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{field} wajib diisi!")]
    MissingRequiredField { field: &'static str },
    #[error("Semua kolom data harus diisi!")]
    EmptyInput,
    #[error("Kolom berikut kosong: {}\nPastikan semua kolom memiliki data!", column_list(.columns))]
    PartialEmptyColumn { columns: Vec<Column> },
    #[error("Jumlah baris tidak sama di semua kolom!\nPastikan setiap kolom memiliki jumlah baris yang sama.")]
    ColumnCountMismatch { counts: ColumnCounts },
    #[error("Tidak ada data yang valid ditemukan!")]
    EmptyResult,
}

impl PipelineError {
    /// Per-column line counts, present only for a count mismatch.
    pub fn counts(&self) -> Option<&ColumnCounts> {
        match self {
            PipelineError::ColumnCountMismatch { counts } => Some(counts),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<MismatchAnalysis> {
        self.counts().map(ColumnCounts::analysis)
    }
}

/// Everything one sampling run produced, handed to presentation and export.
#[derive(Debug, Clone, Serialize)]
pub struct SamplingRun {
    pub method: Method,
    pub metadata: AuditMetadata,
    pub sample: SampleSet,
    pub summary: AggregateSummary,
}

/// Validates, parses, samples and summarizes one input batch.
pub fn process_data<R: Rng + ?Sized>(
    columns: &RawColumns,
    method: Method,
    metadata: &AuditMetadata,
    rng: &mut R,
) -> Result<SamplingRun, PipelineError> {
    process_data_in_year(columns, method, metadata, Local::now().year(), rng)
}

/// [`process_data`] with an explicit year for dates written without one.
pub fn process_data_in_year<R: Rng + ?Sized>(
    columns: &RawColumns,
    method: Method,
    metadata: &AuditMetadata,
    default_year: i32,
    rng: &mut R,
) -> Result<SamplingRun, PipelineError> {
    if metadata.client_name.trim().is_empty() {
        return Err(PipelineError::MissingRequiredField { field: "Nama Klien" });
    }
    let lines = journal::reconcile_columns(columns)?;
    let records = journal::build_records(&lines, default_year);
    if records.is_empty() {
        return Err(PipelineError::EmptyResult);
    }

    let sample = sampling::select_sample(&records, method, rng);
    let summary = summary::summarize(&records, &sample);
    info!(
        records = summary.total_records,
        sampled = summary.sample_count,
        coverage = %summary.coverage_label(),
        method = method.tag(),
        "sampling selesai"
    );

    Ok(SamplingRun { method, metadata: metadata.clone(), sample, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn meta() -> AuditMetadata {
        AuditMetadata { client_name: "PT Contoh".into(), ..Default::default() }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn client_name_is_checked_before_columns() {
        let err = process_data(&RawColumns::default(), Method::Rendah, &AuditMetadata::default(), &mut rng())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingRequiredField { .. }));
        assert_eq!(err.to_string(), "Nama Klien wajib diisi!");
    }

    #[test]
    fn partial_empty_message_lists_columns() {
        let cols = RawColumns::new("1/1/2024", "", "sewa", "");
        let err = process_data(&cols, Method::Rendah, &meta(), &mut rng()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Kolom berikut kosong: Voucher, Nominal\nPastikan semua kolom memiliki data!"
        );
    }

    #[test]
    fn mismatch_is_distinguishable_by_payload() {
        let cols = RawColumns::new("a\nb", "a", "a\nb", "1\n2");
        let err = process_data(&cols, Method::Rendah, &meta(), &mut rng()).unwrap_err();
        let analysis = err.analysis().unwrap();
        assert_eq!(analysis.min_columns, vec![Column::Voucher]);
        assert_eq!(analysis.max_count, 2);
    }

    #[test]
    fn run_carries_sample_summary_and_metadata() {
        let cols = RawColumns::new(
            "18/12/2024\n19 Des 2024\n2024-12-20",
            "V-1\nV-2\nV-3",
            "Sewa\nListrik\nJasa IT",
            "1.000.000\n250.000,00\nRp 3,000,000.00",
        );
        let run = process_data_in_year(&cols, Method::Moderate, &meta(), 2026, &mut rng()).unwrap();
        let vouchers: Vec<&str> = run.sample.iter().map(|r| r.voucher.as_str()).collect();
        assert_eq!(vouchers, ["V-3", "V-1", "V-2"]);
        assert_eq!(run.summary.total_amount, 4_250_000);
        assert_eq!(run.summary.coverage_label(), "100.00%");
        assert_eq!(run.metadata.client_name, "PT Contoh");
        assert_eq!(run.sample.records()[2].date, "2024-12-19");
    }
}
