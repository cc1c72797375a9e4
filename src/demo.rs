//! Dummy ledger data for trying the tool without a client file.

use crate::config::AuditMetadata;
use crate::journal::RawColumns;
use crate::summary::format_rupiah;
use chrono::{Duration, NaiveDate};
use rand::Rng;

const DESCRIPTIONS: &[&str] = &[
    "Pembelian barang kantor",
    "Jasa konsultasi",
    "Transportasi",
    "Perjalanan dinas",
    "Biaya telepon",
    "Listrik dan air",
    "Sewa gedung",
    "Gaji karyawan",
    "Biaya perawatan",
    "Pembelian peralatan",
    "Jasa pemasaran",
    "Biaya pelatihan",
    "Langganan software",
    "Biaya legal",
    "Pajak dan retribusi",
    "Biaya administrasi",
    "Pembelian bahan baku",
    "Biaya pengiriman",
    "Jasa IT",
    "Perbaikan fasilitas",
];

/// `count` rows dated within the year before `today`, with Indonesian-style
/// amounts between 500.000 and 10.000.000.
pub fn generate_dummy_columns<R: Rng + ?Sized>(count: usize, today: NaiveDate, rng: &mut R) -> RawColumns {
    let mut tanggal = Vec::with_capacity(count);
    let mut voucher = Vec::with_capacity(count);
    let mut keterangan = Vec::with_capacity(count);
    let mut nominal = Vec::with_capacity(count);

    for i in 0..count {
        let date = today - Duration::days(rng.random_range(0..=365));
        tanggal.push(date.format("%d/%m/%Y").to_string());
        voucher.push(format!("VOU-{:03}", i + 1));
        keterangan.push(DESCRIPTIONS[rng.random_range(0..DESCRIPTIONS.len())].to_string());
        let amount: u64 = rng.random_range(500_000..10_000_000);
        nominal.push(format!("{},00", format_rupiah(amount).trim_start_matches("Rp ")));
    }

    RawColumns {
        tanggal: tanggal.join("\n"),
        voucher: voucher.join("\n"),
        keterangan: keterangan.join("\n"),
        nominal: nominal.join("\n"),
    }
}

pub fn dummy_metadata() -> AuditMetadata {
    AuditMetadata {
        client_name: "PT Contoh Perusahaan".into(),
        header_label: "Biaya Operasional".into(),
        account_label: "Akun 12345".into(),
        prepared_by: "Auditor Dummy".into(),
        reviewed_by: "Reviewer Dummy".into(),
        schedule: "Audit Q4 2025".into(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{build_records, reconcile_columns};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn dummy_rows_parse_cleanly() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let raw = generate_dummy_columns(50, today, &mut StdRng::seed_from_u64(42));
        let records = build_records(&reconcile_columns(&raw).unwrap(), 2026);
        assert_eq!(records.len(), 50);
        assert_eq!(records[0].voucher, "VOU-001");
        assert_eq!(records[49].voucher, "VOU-050");

        let oldest = (today - Duration::days(365)).format("%Y-%m-%d").to_string();
        let newest = today.format("%Y-%m-%d").to_string();
        for r in &records {
            assert!((500_000..10_000_000).contains(&r.amount), "amount {}", r.amount);
            assert!(r.date >= oldest && r.date <= newest, "date {}", r.date);
            assert!(DESCRIPTIONS.contains(&r.description.as_str()));
        }
    }
}
