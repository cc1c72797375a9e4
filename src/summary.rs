use crate::journal::Record;
use crate::sampling::SampleSet;
use serde::Serialize;

/// Population totals and sample statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_records: usize,
    pub total_amount: u64,
    pub sample_count: usize,
    pub sample_amount: u64,
    pub min_amount: u64,
    pub max_amount: u64,
    /// Mean sample amount, rounded.
    pub avg_amount: u64,
    /// Sample amount as a percentage of the population amount; 0 when the
    /// population total is 0.
    pub coverage_pct: f64,
}

impl AggregateSummary {
    /// Coverage with two decimals, e.g. `25.00%`.
    pub fn coverage_label(&self) -> String {
        format!("{:.2}%", self.coverage_pct)
    }
}

fn total<'a>(records: impl IntoIterator<Item = &'a Record>) -> u64 {
    records.into_iter().fold(0u64, |acc, r| acc.saturating_add(r.amount))
}

pub fn summarize(records: &[Record], sample: &SampleSet) -> AggregateSummary {
    let total_amount = total(records);
    let sample_amount = total(sample);
    let sample_count = sample.len();

    let min_amount = sample.iter().map(|r| r.amount).min().unwrap_or(0);
    let max_amount = sample.iter().map(|r| r.amount).max().unwrap_or(0);
    let avg_amount = if sample_count == 0 {
        0
    } else {
        (sample_amount as f64 / sample_count as f64).round() as u64
    };
    let coverage_pct = if total_amount == 0 {
        0.0
    } else {
        sample_amount as f64 / total_amount as f64 * 100.0
    };

    AggregateSummary {
        total_records: records.len(),
        total_amount,
        sample_count,
        sample_amount,
        min_amount,
        max_amount,
        avg_amount,
        coverage_pct,
    }
}

/// Formats an amount the way Indonesian workpapers show it: `Rp 1.234.567`.
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    out.push_str("Rp ");
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Thousands-grouped count, e.g. `1.250`.
pub fn format_count(n: usize) -> String {
    format_rupiah(n as u64).trim_start_matches("Rp ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{select_sample, Method};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rec(voucher: &str, amount: u64) -> Record {
        Record { date: "2024-12-18".into(), voucher: voucher.into(), description: "uji".into(), amount }
    }

    fn sample_of(records: &[Record]) -> SampleSet {
        select_sample(records, Method::Rendah, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn zero_population_total_means_zero_coverage() {
        let records = vec![rec("A", 0), rec("B", 0)];
        let s = summarize(&records, &sample_of(&records));
        assert_eq!(s.total_amount, 0);
        assert_eq!(s.coverage_label(), "0.00%");
    }

    #[test]
    fn quarter_coverage() {
        // ten sampled rows of 25.000 out of a 1.000.000 population
        let mut records: Vec<Record> = (0..10).map(|i| rec(&format!("T{i}"), 25_000)).collect();
        records.push(rec("NOL", 0));
        let sample = sample_of(&records);
        let mut population = records.clone();
        population.push(rec("REST", 750_000));

        let s = summarize(&population, &sample);
        assert_eq!(s.total_amount, 1_000_000);
        assert_eq!(s.sample_amount, 250_000);
        assert_abs_diff_eq!(s.coverage_pct, 25.0, epsilon = 1e-9);
        assert_eq!(s.coverage_label(), "25.00%");
    }

    #[test]
    fn min_max_avg_over_sample() {
        let records = vec![rec("A", 100), rec("B", 201), rec("C", 300)];
        let s = summarize(&records, &sample_of(&records));
        assert_eq!(s.total_records, 3);
        assert_eq!(s.sample_count, 3);
        assert_eq!(s.min_amount, 100);
        assert_eq!(s.max_amount, 300);
        // 601 / 3 = 200.33
        assert_eq!(s.avg_amount, 200);
        assert_eq!(s.coverage_label(), "100.00%");
    }

    #[test]
    fn empty_sample_is_all_zero() {
        let s = summarize(&[], &SampleSet::default());
        assert_eq!((s.min_amount, s.max_amount, s.avg_amount), (0, 0, 0));
        assert_eq!(s.coverage_label(), "0.00%");
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0), "Rp 0");
        assert_eq!(format_rupiah(999), "Rp 999");
        assert_eq!(format_rupiah(1_000), "Rp 1.000");
        assert_eq!(format_rupiah(12_345_678), "Rp 12.345.678");
        assert_eq!(format_count(1_250), "1.250");
    }
}
