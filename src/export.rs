//! "Uji Detil" workpaper spreadsheet for a sampling run.
//!
//! Rows follow the sample order (amount descending), one row per sampled
//! record starting at row 13, with the working columns the auditor fills in.

use crate::config::AuditMetadata;
use crate::journal::Record;
use crate::SamplingRun;
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{
    Color, DataValidation, ExcelDateTime, Format, FormatAlign, FormatBorder, FormatUnderline, Formula,
    Workbook, Worksheet,
};
use std::path::Path;

pub const SHEET_NAME: &str = "Uji Detil";
pub const LISTS_SHEET: &str = "Lists";
pub const DEFAULT_FILE_NAME: &str = "Uji_Detil_Sampling.xlsx";

/// 0-based index of the first data row (row 13 in the sheet).
pub const FIRST_DATA_ROW: u32 = 12;

const LEGEND: &[(&str, &str)] = &[
    ("PBC", "Disiapkan Oleh Klien"),
    ("AFR", "Sesuai Dengan Laporan Keuangan Perusahaan"),
    ("V", "Voucher"),
    ("‹", "Penjumlahan Kebawah dan Kesamping Adalah Benar"),
    ("G/L", "Sesuai Dengan Buku Besar Perusahaan"),
    ("N/A", "Tidak Terdapat (Non Aplikable)"),
    ("Sp", "Error Material / Beda Material"),
    ("Im", "Beda Tidak Material"),
    ("Ts", "Tidak Selisih"),
];

/// Workpaper layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    /// Services: tax breakdown, PO/invoice/faktur/payment proof, assertions.
    #[default]
    Jasa,
    /// Public service agency (BLUD): journal D/K and payment proof only.
    Blud,
}

struct HeaderCell {
    at: &'static str,
    to: Option<&'static str>,
    text: &'static str,
    width: Option<f64>,
}

const fn merged(at: &'static str, to: &'static str, text: &'static str, width: Option<f64>) -> HeaderCell {
    HeaderCell { at, to: Some(to), text, width }
}

const fn single(at: &'static str, text: &'static str, width: Option<f64>) -> HeaderCell {
    HeaderCell { at, to: None, text, width }
}

const JASA_HEADERS: &[HeaderCell] = &[
    merged("A11", "A12", "No", Some(9.0)),
    merged("B11", "B12", "Tgl", Some(12.0)),
    merged("C11", "C12", "No. Voucher", Some(18.0)),
    merged("D11", "D12", "Nama Transaksi", Some(25.0)),
    merged("E11", "E12", "Jumlah Menurut GL", Some(18.0)),
    merged("F11", "H11", "Perhitungan Pajak", None),
    single("F12", "DPP", None),
    single("G12", "PPN", None),
    single("H12", "PPh", None),
    merged("I11", "I12", "Nett Amount\nBilled (Nilai Tagihan Bersih)", Some(20.0)),
    merged("J11", "L11", "Purchase Order", None),
    single("J12", "No PO", Some(16.0)),
    single("K12", "Tgl PO", Some(12.0)),
    single("L12", "Nominal PO", Some(16.0)),
    merged("M11", "O11", "Invoice", None),
    single("M12", "No Invoice", Some(16.0)),
    single("N12", "Tgl Invoice", Some(12.0)),
    single("O12", "Nominal Invoice", Some(16.0)),
    merged("P11", "R11", "Faktur", None),
    single("P12", "No Faktur", Some(16.0)),
    single("Q12", "Tgl Faktur", Some(12.0)),
    single("R12", "Nominal Faktur", Some(16.0)),
    merged("S11", "U11", "Bukti Bayar", None),
    single("S12", "No Bukti", Some(16.0)),
    single("T12", "Tgl Bukti", Some(12.0)),
    single("U12", "Nominal Bukti", Some(16.0)),
    merged("V11", "Y11", "Asersi", None),
    single("V12", "Keterjadian", Some(14.0)),
    single("W12", "Keakurasian", Some(14.0)),
    single("X12", "Pisah Batas", Some(14.0)),
    single("Y12", "Klasifikasi", Some(14.0)),
    merged("Z11", "Z12", "Kelengkapan Dokumen", Some(20.0)),
    merged("AA11", "AA12", "Selisih", Some(14.0)),
    merged("AB11", "AB12", "Ket.", Some(14.0)),
    merged("AC11", "AC12", "Otorisasi\nBukti Bayar", Some(16.0)),
    merged("AD11", "AD12", "Deskripsi Temuan", Some(25.0)),
    merged("AE11", "AE12", "File Eksternal", Some(20.0)),
];

const BLUD_HEADERS: &[HeaderCell] = &[
    merged("A11", "A12", "No", Some(8.0)),
    merged("B11", "B12", "Tgl", Some(12.0)),
    merged("C11", "C12", "Nomor Voucher", Some(18.0)),
    merged("D11", "D12", "Nama Transaksi", Some(25.0)),
    merged("E11", "F11", "Jurnal", None),
    single("E12", "D", Some(10.0)),
    single("F12", "K", Some(10.0)),
    merged("G11", "G12", "Jumlah Menurut GL", Some(18.0)),
    merged("H11", "J11", "Bukti Bayar (BB)", None),
    single("H12", "No Bukti", Some(16.0)),
    single("I12", "Tgl Bukti", Some(12.0)),
    single("J12", "Nominal Bukti", Some(16.0)),
    merged("K11", "K12", "Selisih", Some(14.0)),
    merged("L11", "L12", "Ket", Some(14.0)),
    merged("M11", "M12", "Otorisasi dan Pejabat Otorisasi", Some(22.0)),
    merged("N11", "N12", "Deskripsi Temuan", Some(28.0)),
    merged("O11", "O12", "File Eksternal", Some(20.0)),
];

struct Layout {
    title: (&'static str, &'static str),
    banner: (&'static str, &'static str),
    index_label: (&'static str, &'static str),
    index_value: (&'static str, &'static str),
    /// Label column of the preparer block; the value sits one column right.
    preparer_col: &'static str,
    reviewer_col: &'static str,
    headers: &'static [HeaderCell],
    last_col: &'static str,
}

impl Template {
    fn layout(self) -> Layout {
        match self {
            Template::Jasa => Layout {
                title: ("A1", "O5"),
                banner: ("P1", "W5"),
                index_label: ("X1", "Y1"),
                index_value: ("X2", "Y5"),
                preparer_col: "U",
                reviewer_col: "X",
                headers: JASA_HEADERS,
                last_col: "AE",
            },
            Template::Blud => Layout {
                title: ("A1", "E5"),
                banner: ("F1", "J5"),
                index_label: ("K1", "O1"),
                index_value: ("K2", "O5"),
                preparer_col: "K",
                reviewer_col: "N",
                headers: BLUD_HEADERS,
                last_col: "O",
            },
        }
    }
}

/// Column letters to a 0-based index: `A` → 0, `AE` → 30.
fn col(letters: &str) -> u16 {
    letters
        .bytes()
        .fold(0u16, |acc, b| acc * 26 + u16::from(b.saturating_sub(b'A')) + 1)
        .saturating_sub(1)
}

/// `B12` → (11, 1).
fn cell(reference: &str) -> Result<(u32, u16)> {
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .with_context(|| format!("referensi sel tidak valid: {reference}"))?;
    let (letters, digits) = reference.split_at(split);
    let row: u32 = digits.parse().with_context(|| format!("referensi sel tidak valid: {reference}"))?;
    if letters.is_empty() || row == 0 {
        bail!("referensi sel tidak valid: {reference}");
    }
    Ok((row - 1, col(letters)))
}

fn merge(ws: &mut Worksheet, (from, to): (&str, &str), text: &str, format: &Format) -> Result<()> {
    let (r1, c1) = cell(from)?;
    let (r2, c2) = cell(to)?;
    ws.merge_range(r1, c1, r2, c2, text, format)?;
    Ok(())
}

struct Formats {
    title: Format,
    banner: Format,
    boxed: Format,
    bold_boxed: Format,
    label: Format,
    header_merged: Format,
    header_single: Format,
    center: Format,
    left: Format,
    amount: Format,
    date: Format,
    legend_title: Format,
    conclusion: Format,
}

impl Formats {
    fn new() -> Self {
        let boxed = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let header = boxed.clone().set_bold();
        Self {
            title: boxed.clone().set_bold().set_font_size(16),
            banner: boxed.clone().set_bold().set_font_size(14).set_background_color(Color::RGB(0xE6E6E6)),
            bold_boxed: boxed.clone().set_bold(),
            label: Format::new().set_bold(),
            header_merged: header.clone().set_text_wrap(),
            header_single: header.set_background_color(Color::RGB(0xD9D9D9)),
            center: boxed.clone(),
            left: Format::new().set_border(FormatBorder::Thin),
            amount: boxed.clone().set_num_format("#,##0"),
            date: boxed.clone().set_num_format("dd/mm/yyyy"),
            legend_title: Format::new().set_bold().set_underline(FormatUnderline::Single),
            conclusion: Format::new().set_border(FormatBorder::Thin).set_background_color(Color::RGB(0xF5E6D3)),
            boxed,
        }
    }
}

fn write_heading(ws: &mut Worksheet, layout: &Layout, meta: &AuditMetadata, f: &Formats) -> Result<()> {
    merge(ws, layout.title, meta.header_or_default(), &f.title)?;
    merge(ws, layout.banner, "UJI DETIL DOKUMEN (Test Of Detail)", &f.banner)?;
    merge(ws, layout.index_label, "INDEKS :", &f.bold_boxed)?;
    merge(ws, layout.index_value, "XX", &f.boxed)?;

    ws.write_string_with_format(6, 0, "Klien :", &f.label)?;
    ws.write_string(6, 1, meta.client_name.as_str())?;
    ws.write_string_with_format(7, 0, "Periode :", &f.label)?;
    ws.write_string(7, 1, meta.schedule.as_str())?;
    ws.write_string_with_format(8, 0, "Akun :", &f.label)?;
    ws.write_string(8, 1, meta.account_label.as_str())?;

    let blocks = [
        (layout.preparer_col, "Dibuat oleh :", &meta.prepared_by, &meta.prepared_date),
        (layout.reviewer_col, "Direview oleh :", &meta.reviewed_by, &meta.reviewed_date),
    ];
    for (letters, who_label, who, when) in blocks {
        let c = col(letters);
        ws.write_string_with_format(6, c, who_label, &f.label)?;
        ws.write_string(6, c + 1, who.as_str())?;
        ws.write_string_with_format(7, c, "Tanggal :", &f.label)?;
        ws.write_string(7, c + 1, when.as_str())?;
        ws.write_string_with_format(8, c, "Paraf :", &f.label)?;
    }
    Ok(())
}

fn write_headers(ws: &mut Worksheet, layout: &Layout, f: &Formats) -> Result<()> {
    for h in layout.headers {
        let (row, c) = cell(h.at)?;
        match h.to {
            Some(to) => merge(ws, (h.at, to), h.text, &f.header_merged)?,
            None => {
                ws.write_string_with_format(row, c, h.text, &f.header_single)?;
            }
        }
        if let Some(width) = h.width {
            ws.set_column_width(c, width)?;
        }
    }
    Ok(())
}

/// Writes the GL date as a real date when it is a valid ISO date, else as text.
fn write_date(ws: &mut Worksheet, row: u32, c: u16, date: &str, f: &Formats) -> Result<()> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| ExcelDateTime::from_ymd(u16::try_from(d.year()).ok()?, d.month() as u8, d.day() as u8).ok());
    match parsed {
        Some(dt) => ws.write_datetime_with_format(row, c, &dt, &f.date)?,
        None => ws.write_string_with_format(row, c, date, &f.center)?,
    };
    Ok(())
}

fn write_record_identity(ws: &mut Worksheet, row: u32, idx: usize, r: &Record, f: &Formats) -> Result<()> {
    ws.write_number_with_format(row, 0, (idx + 1) as f64, &f.center)?;
    write_date(ws, row, 1, &r.date, f)?;
    ws.write_string_with_format(row, 2, r.voucher.as_str(), &f.center)?;
    ws.write_string_with_format(row, 3, r.description.as_str(), &f.left)?;
    Ok(())
}

fn blanks(ws: &mut Worksheet, row: u32, cols: &[&str], format: &Format) -> Result<()> {
    for letters in cols {
        ws.write_blank(row, col(letters), format)?;
    }
    Ok(())
}

fn zeros(ws: &mut Worksheet, row: u32, cols: &[&str], f: &Formats) -> Result<()> {
    for letters in cols {
        ws.write_number_with_format(row, col(letters), 0.0, &f.amount)?;
    }
    Ok(())
}

fn write_jasa_rows(ws: &mut Worksheet, rows: &[Record], f: &Formats) -> Result<()> {
    for (i, r) in rows.iter().enumerate() {
        let row = FIRST_DATA_ROW + i as u32;
        let n = row + 1;
        write_record_identity(ws, row, i, r, f)?;
        ws.write_number_with_format(row, col("E"), r.amount as f64, &f.amount)?;
        zeros(ws, row, &["F", "G", "H", "L", "O", "R", "U"], f)?;
        ws.write_formula_with_format(row, col("I"), Formula::new(format!("=F{n}+G{n}-H{n}")), &f.amount)?;
        // supporting documents: number, date, amount per group
        blanks(ws, row, &["J", "M", "P", "S"], &f.center)?;
        blanks(ws, row, &["K", "N", "Q", "T"], &f.date)?;
        blanks(ws, row, &["V", "W", "X", "Y", "Z", "AB", "AC", "AE"], &f.center)?;
        ws.write_formula_with_format(row, col("AA"), Formula::new(format!("=I{n}-U{n}")), &f.amount)?;
        blanks(ws, row, &["AD"], &f.left)?;
    }

    let last = FIRST_DATA_ROW + rows.len() as u32 - 1;
    let assertion = DataValidation::new().allow_list_strings(&["V", "X"])?;
    ws.add_data_validation(FIRST_DATA_ROW, col("V"), last, col("Y"), &assertion)?;
    let completeness = DataValidation::new().allow_list_strings(&["Lengkap", "Tidak Lengkap"])?;
    ws.add_data_validation(FIRST_DATA_ROW, col("Z"), last, col("Z"), &completeness)?;
    Ok(())
}

fn write_blud_rows(ws: &mut Worksheet, rows: &[Record], f: &Formats) -> Result<()> {
    for (i, r) in rows.iter().enumerate() {
        let row = FIRST_DATA_ROW + i as u32;
        let n = row + 1;
        write_record_identity(ws, row, i, r, f)?;
        zeros(ws, row, &["E", "F", "J"], f)?;
        ws.write_number_with_format(row, col("G"), r.amount as f64, &f.amount)?;
        blanks(ws, row, &["H", "L", "M"], &f.center)?;
        blanks(ws, row, &["I"], &f.date)?;
        ws.write_formula_with_format(row, col("K"), Formula::new(format!("=G{n}-J{n}")), &f.amount)?;
        blanks(ws, row, &["N", "O"], &f.left)?;
    }

    let last = FIRST_DATA_ROW + rows.len() as u32 - 1;
    let findings = DataValidation::new().allow_list_formula(Formula::new(format!("={LISTS_SHEET}!$A$1:$A$3")));
    ws.add_data_validation(FIRST_DATA_ROW, col("L"), last, col("L"), &findings)?;
    Ok(())
}

fn write_legend(ws: &mut Worksheet, layout: &Layout, data_rows: usize, f: &Formats) -> Result<()> {
    let last = FIRST_DATA_ROW + data_rows as u32 - 1;
    ws.write_string_with_format(last + 3, 0, "Keterangan :", &f.legend_title)?;
    let first_code = last + 4;
    for (i, (code, meaning)) in LEGEND.iter().enumerate() {
        let row = first_code + i as u32;
        ws.write_string(row, 1, *code)?;
        ws.write_string(row, 2, *meaning)?;
    }

    let conclusion = first_code + LEGEND.len() as u32 + 2;
    ws.write_string_with_format(conclusion, 0, "Simpulan :", &f.label)?;
    ws.merge_range(conclusion, 1, conclusion + 2, col(layout.last_col), "", &f.conclusion)?;
    Ok(())
}

/// Builds the workpaper for `run`. An empty sample is refused.
pub fn build_workbook(run: &SamplingRun, template: Template) -> Result<Workbook> {
    let rows = run.sample.records();
    if rows.is_empty() {
        bail!("Tidak ada data sampling untuk diekspor!");
    }
    let layout = template.layout();
    let f = Formats::new();
    let mut wb = Workbook::new();

    let ws = wb.add_worksheet().set_name(SHEET_NAME)?;
    write_heading(ws, &layout, &run.metadata, &f)?;
    write_headers(ws, &layout, &f)?;
    match template {
        Template::Jasa => write_jasa_rows(ws, rows, &f)?,
        Template::Blud => write_blud_rows(ws, rows, &f)?,
    }
    write_legend(ws, &layout, rows.len(), &f)?;

    if template == Template::Blud {
        let lists = wb.add_worksheet().set_name(LISTS_SHEET)?;
        for (i, code) in ["Ts", "Im", "Sp"].into_iter().enumerate() {
            lists.write_string(i as u32, 0, code)?;
        }
        lists.set_column_width(0, 12)?;
        lists.set_hidden(true);
    }
    Ok(wb)
}

pub fn workpaper_to_buffer(run: &SamplingRun, template: Template) -> Result<Vec<u8>> {
    let mut wb = build_workbook(run, template)?;
    Ok(wb.save_to_buffer()?)
}

pub fn write_workpaper(run: &SamplingRun, template: Template, output: &Path) -> Result<()> {
    let mut wb = build_workbook(run, template)?;
    wb.save(output).with_context(|| format!("gagal menyimpan Excel: {}", output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(col("A"), 0);
        assert_eq!(col("Z"), 25);
        assert_eq!(col("AA"), 26);
        assert_eq!(col("AE"), 30);
    }

    #[test]
    fn cell_references() {
        assert_eq!(cell("A1").unwrap(), (0, 0));
        assert_eq!(cell("X2").unwrap(), (1, 23));
        assert_eq!(cell("AD12").unwrap(), (11, 29));
        assert!(cell("12").is_err());
        assert!(cell("B").is_err());
        assert!(cell("B0").is_err());
    }

    #[test]
    fn header_tables_stay_inside_layout() {
        for template in [Template::Jasa, Template::Blud] {
            let layout = template.layout();
            let last = col(layout.last_col);
            for h in layout.headers {
                let (row, c) = cell(h.at).unwrap();
                assert!(row == 10 || row == 11, "{}", h.at);
                assert!(c <= last, "{}", h.at);
            }
        }
    }
}
