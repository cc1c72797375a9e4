use crate::normalize::{parse_amount_checked, parse_date_checked};
use crate::PipelineError;
use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde::Serialize;
use std::{fmt, fs, fs::File, path::Path};
use tracing::{debug, warn};

/// The four parallel input columns, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Tanggal,
    Voucher,
    Keterangan,
    Nominal,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Tanggal, Column::Voucher, Column::Keterangan, Column::Nominal];

    pub fn label(self) -> &'static str {
        match self {
            Column::Tanggal => "Tanggal",
            Column::Voucher => "Voucher",
            Column::Keterangan => "Keterangan",
            Column::Nominal => "Nominal",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw pasted text, one block per column.
#[derive(Debug, Clone, Default)]
pub struct RawColumns {
    pub tanggal: String,
    pub voucher: String,
    pub keterangan: String,
    pub nominal: String,
}

impl RawColumns {
    pub fn new(
        tanggal: impl Into<String>,
        voucher: impl Into<String>,
        keterangan: impl Into<String>,
        nominal: impl Into<String>,
    ) -> Self {
        Self {
            tanggal: tanggal.into(),
            voucher: voucher.into(),
            keterangan: keterangan.into(),
            nominal: nominal.into(),
        }
    }

    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::Tanggal => &self.tanggal,
            Column::Voucher => &self.voucher,
            Column::Keterangan => &self.keterangan,
            Column::Nominal => &self.nominal,
        }
    }
}

/// Non-blank line count per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColumnCounts {
    pub tanggal: usize,
    pub voucher: usize,
    pub keterangan: usize,
    pub nominal: usize,
}

impl ColumnCounts {
    pub fn get(&self, column: Column) -> usize {
        match column {
            Column::Tanggal => self.tanggal,
            Column::Voucher => self.voucher,
            Column::Keterangan => self.keterangan,
            Column::Nominal => self.nominal,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, usize)> + '_ {
        Column::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn max(&self) -> usize {
        self.iter().map(|(_, n)| n).max().unwrap_or(0)
    }

    pub fn min(&self) -> usize {
        self.iter().map(|(_, n)| n).min().unwrap_or(0)
    }

    pub fn all_equal(&self) -> bool {
        self.max() == self.min()
    }

    pub fn empty_columns(&self) -> Vec<Column> {
        self.iter().filter(|(_, n)| *n == 0).map(|(c, _)| c).collect()
    }

    pub fn analysis(&self) -> MismatchAnalysis {
        let (max_count, min_count) = (self.max(), self.min());
        MismatchAnalysis {
            max_count,
            min_count,
            max_columns: self.iter().filter(|(_, n)| *n == max_count).map(|(c, _)| c).collect(),
            min_columns: self.iter().filter(|(_, n)| *n == min_count).map(|(c, _)| c).collect(),
            difference: max_count - min_count,
        }
    }
}

/// Which columns are longest and shortest when counts disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchAnalysis {
    pub max_count: usize,
    pub min_count: usize,
    pub max_columns: Vec<Column>,
    pub min_columns: Vec<Column>,
    pub difference: usize,
}

fn join_labels(columns: &[Column]) -> String {
    columns.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for MismatchAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analisis Perbedaan:")?;
        writeln!(
            f,
            "• Kolom dengan jumlah baris terbanyak ({}): {}",
            self.max_count,
            join_labels(&self.max_columns)
        )?;
        writeln!(
            f,
            "• Kolom dengan jumlah baris paling sedikit ({}): {}",
            self.min_count,
            join_labels(&self.min_columns)
        )?;
        write!(f, "• Selisih jumlah baris: {} baris", self.difference)
    }
}

/// Reconciled columns. Constructed only by [`reconcile_columns`], so all four
/// sequences are non-empty and of equal length.
#[derive(Debug, Clone)]
pub struct ColumnLines {
    tanggal: Vec<String>,
    voucher: Vec<String>,
    keterangan: Vec<String>,
    nominal: Vec<String>,
}

impl ColumnLines {
    pub fn len(&self) -> usize {
        self.tanggal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tanggal.is_empty()
    }
}

fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits each column on line breaks, drops blank lines, and checks that all
/// four columns have the same, non-zero number of lines.
pub fn reconcile_columns(raw: &RawColumns) -> Result<ColumnLines, PipelineError> {
    let lines = ColumnLines {
        tanggal: non_blank_lines(&raw.tanggal),
        voucher: non_blank_lines(&raw.voucher),
        keterangan: non_blank_lines(&raw.keterangan),
        nominal: non_blank_lines(&raw.nominal),
    };
    let counts = ColumnCounts {
        tanggal: lines.tanggal.len(),
        voucher: lines.voucher.len(),
        keterangan: lines.keterangan.len(),
        nominal: lines.nominal.len(),
    };
    debug!(?counts, "column line counts");

    let empty = counts.empty_columns();
    if empty.len() == Column::ALL.len() {
        return Err(PipelineError::EmptyInput);
    }
    if !empty.is_empty() {
        return Err(PipelineError::PartialEmptyColumn { columns: empty });
    }
    if !counts.all_equal() {
        return Err(PipelineError::ColumnCountMismatch { counts });
    }
    Ok(lines)
}

/// One audit-testable transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Record {
    /// `YYYY-MM-DD`, or the trimmed input when unrecognized.
    pub date: String,
    pub voucher: String,
    pub description: String,
    pub amount: u64,
}

/// Zips reconciled lines into records, one per line. Rows whose date or
/// amount cannot be read are kept with the fallback value and logged.
pub fn build_records(lines: &ColumnLines, default_year: i32) -> Vec<Record> {
    let mut out = Vec::with_capacity(lines.len());
    for i in 0..lines.len() {
        let raw_date = lines.tanggal[i].trim();
        let raw_amount = lines.nominal[i].trim();
        let date = match parse_date_checked(raw_date, default_year) {
            Some(d) => d,
            None => {
                warn!(row = i + 1, value = raw_date, "tanggal tidak dikenali, dipakai apa adanya");
                raw_date.to_string()
            }
        };
        let amount = match parse_amount_checked(raw_amount) {
            Some(a) => a,
            None => {
                warn!(row = i + 1, value = raw_amount, "nominal tidak dapat dibaca, dianggap 0");
                0
            }
        };
        out.push(Record {
            date,
            voucher: lines.voucher[i].trim().to_string(),
            description: lines.keterangan[i].trim().to_string(),
            amount,
        });
    }
    out
}

/// Reads one text file per column.
pub fn load_column_files(tanggal: &Path, voucher: &Path, keterangan: &Path, nominal: &Path) -> Result<RawColumns> {
    let read = |p: &Path| fs::read_to_string(p).with_context(|| format!("gagal membaca file: {}", p.display()));
    Ok(RawColumns {
        tanggal: read(tanggal)?,
        voucher: read(voucher)?,
        keterangan: read(keterangan)?,
        nominal: read(nominal)?,
    })
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn xlsx_to_string<T: calamine::DataType>(cell: &T) -> String {
    // Only cells typed as dates are rendered as dates; plain numbers may be amounts.
    if cell.is_datetime() || cell.is_datetime_iso() {
        if let Some(dt) = cell.as_date() {
            return dt.format("%Y-%m-%d").to_string();
        }
    }
    // Numbers are written without separators: "1234.56" would read back as
    // 123456, since a lone '.' groups thousands. Amounts are rounded anyway.
    if let Some(f) = cell.get_float() {
        return format!("{}", f.round() as i64);
    }
    if let Some(i) = cell.get_int() {
        return i.to_string();
    }
    if let Some(s) = cell.get_string() {
        return s.to_string();
    }
    cell.as_string().unwrap_or_default()
}

fn load_excel(path: &Path) -> Result<Table> {
    let mut wb = open_workbook_auto(path).with_context(|| format!("gagal membuka Excel: {}", path.display()))?;
    let name = wb
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Excel tidak memiliki worksheet"))?;
    let range = wb.worksheet_range(&name)?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .ok_or_else(|| anyhow::anyhow!("baris header tidak ditemukan"))?
        .iter()
        .map(|c| xlsx_to_string(c).trim().to_string())
        .collect();
    let rows = rows_iter
        .map(|r| r.iter().map(xlsx_to_string).collect::<Vec<_>>())
        .filter(|r| r.iter().any(|v| !v.trim().is_empty()))
        .collect();
    Ok(Table { headers, rows })
}

fn load_csv(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("gagal membuka CSV: {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().flexible(true).has_headers(true).from_reader(file);
    let headers = rdr.headers()?.iter().map(|s| s.trim().to_string()).collect();
    let mut rows = Vec::new();
    for rec in rdr.records() {
        let row: Vec<String> = rec?.iter().map(str::to_string).collect();
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

fn find_col(headers: &[String], cands: &[&str], taken: &[usize], exact: bool) -> Option<usize> {
    headers.iter().enumerate().find_map(|(i, h)| {
        let l = h.trim().to_lowercase();
        let hit = cands.iter().any(|c| if exact { l == *c } else { l.contains(c) });
        (hit && !taken.contains(&i)).then_some(i)
    })
}

fn header_candidates(column: Column) -> &'static [&'static str] {
    match column {
        Column::Tanggal => &["tanggal", "tgl", "date"],
        Column::Voucher => &["voucher", "bukti"],
        Column::Keterangan => &["keterangan", "uraian", "description"],
        Column::Nominal => &["nominal", "jumlah", "amount"],
    }
}

/// Header index per column. Exact header names are claimed first, then
/// substring matches; a header is never shared by two columns.
fn resolve_columns(headers: &[String], source: &Path) -> Result<[usize; 4]> {
    let mut found: [Option<usize>; 4] = [None; 4];
    for exact in [true, false] {
        for (slot, column) in Column::ALL.into_iter().enumerate() {
            if found[slot].is_some() {
                continue;
            }
            let taken: Vec<usize> = found.iter().flatten().copied().collect();
            found[slot] = find_col(headers, header_candidates(column), &taken, exact);
        }
    }

    let mut out = [0usize; 4];
    for (slot, column) in Column::ALL.into_iter().enumerate() {
        out[slot] = match found[slot] {
            Some(idx) => idx,
            None if find_col(headers, header_candidates(column), &[], false).is_some() => bail!(
                "kolom '{}' memakai header yang sama dengan kolom lain di {}",
                column.label(),
                source.display()
            ),
            None => bail!("kolom '{}' tidak ditemukan di {}", column.label(), source.display()),
        };
    }
    Ok(out)
}

fn column_text(table: &Table, idx: usize) -> String {
    table
        .rows
        .iter()
        .map(|r| r.get(idx).map(|v| v.replace(['\r', '\n'], " ")).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads the four columns from a CSV or Excel sheet with a header row.
///
/// Each column becomes one text block, so blank cells surface as missing
/// lines during reconciliation.
pub fn load_table(path: &Path) -> Result<RawColumns> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" => load_excel(path)?,
        "csv" => load_csv(path)?,
        _ => load_excel(path).or_else(|_| load_csv(path))?,
    };

    let [tanggal, voucher, keterangan, nominal] =
        resolve_columns(&table.headers, path)?.map(|idx| column_text(&table, idx));
    Ok(RawColumns { tanggal, voucher, keterangan, nominal })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(t: &str, v: &str, k: &str, n: &str) -> RawColumns {
        RawColumns::new(t, v, k, n)
    }

    #[test]
    fn equal_counts_reconcile() {
        let raw = cols("1/1/2024\n2/1/2024\n3/1/2024", "A\nB\nC", "x\ny\nz", "1\n2\n3");
        let lines = reconcile_columns(&raw).unwrap();
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let raw = cols("\n1/1/2024\n\n  \n2/1/2024\n", "A\r\nB\r\n", "x\ny", "1\n\n2");
        assert_eq!(reconcile_columns(&raw).unwrap().len(), 2);
    }

    #[test]
    fn all_empty_is_its_own_error() {
        let err = reconcile_columns(&cols("", " \n ", "", "\n")).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
        assert_eq!(err.to_string(), "Semua kolom data harus diisi!");
    }

    #[test]
    fn partial_empty_names_the_columns() {
        let err = reconcile_columns(&cols("a\nb\nc", "", "a\nb\nc", "1\n2\n3")).unwrap_err();
        match &err {
            PipelineError::PartialEmptyColumn { columns } => assert_eq!(columns, &vec![Column::Voucher]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("Kolom berikut kosong: Voucher\n"));
        assert!(err.counts().is_none());
    }

    #[test]
    fn mismatch_carries_counts_and_analysis() {
        let err = reconcile_columns(&cols("a\nb\nc", "a\nb\nc\nd", "a\nb\nc", "1\n2\n3")).unwrap_err();
        let counts = err.counts().copied().expect("counts payload");
        assert_eq!(counts, ColumnCounts { tanggal: 3, voucher: 4, keterangan: 3, nominal: 3 });

        let analysis = err.analysis().expect("analysis");
        assert_eq!(analysis.max_count, 4);
        assert_eq!(analysis.min_count, 3);
        assert_eq!(analysis.max_columns, vec![Column::Voucher]);
        assert_eq!(analysis.min_columns, vec![Column::Tanggal, Column::Keterangan, Column::Nominal]);
        assert_eq!(analysis.difference, 1);
        assert!(analysis.to_string().contains("terbanyak (4): Voucher"));
    }

    #[test]
    fn counts_serialize_with_column_keys() {
        let counts = ColumnCounts { tanggal: 1, voucher: 2, keterangan: 3, nominal: 4 };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["keterangan"], 3);
        assert_eq!(json["nominal"], 4);
    }

    #[test]
    fn builder_keeps_every_row() {
        let raw = cols(
            "18/12/2024\nkemarin\n18 Des 2024",
            " V-1 \nV-2\nV-3",
            " Jasa IT \nSewa\nListrik",
            "Rp 1.500.000\nabc\n2,000.50",
        );
        let records = build_records(&reconcile_columns(&raw).unwrap(), 2026);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            Record {
                date: "2024-12-18".into(),
                voucher: "V-1".into(),
                description: "Jasa IT".into(),
                amount: 1_500_000
            }
        );
        assert_eq!(records[1].date, "kemarin");
        assert_eq!(records[1].amount, 0);
        assert_eq!(records[2].date, "2024-12-18");
        assert_eq!(records[2].amount, 2_001);
    }

    #[test]
    fn csv_table_is_split_into_columns() {
        let dir = std::env::temp_dir().join(format!("audit_worksheet_csv_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ledger.csv");
        fs::write(
            &path,
            "No,Tanggal,No Voucher,Keterangan,Nominal\n1,18/12/2024,V-1,Sewa,\"1.000.000\"\n2,19/12/2024,V-2,,\"2.000\"\n",
        )
        .unwrap();

        let raw = load_table(&path).unwrap();
        assert_eq!(raw.tanggal, "18/12/2024\n19/12/2024");
        assert_eq!(raw.voucher, "V-1\nV-2");
        assert_eq!(raw.nominal, "1.000.000\n2.000");
        // blank description cell shows up as a count mismatch
        let err = reconcile_columns(&raw).unwrap_err();
        assert_eq!(err.counts().map(|c| c.keterangan), Some(1));

        fs::remove_dir_all(&dir).ok();
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("audit_worksheet_{tag}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn xlsx_numbers_keep_their_magnitude() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let dir = scratch_dir("xlsx");
        let path = dir.join("ledger.xlsx");
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        for (c, h) in ["Tanggal", "Voucher", "Keterangan", "Nominal"].into_iter().enumerate() {
            ws.write_string(0, c as u16, h).unwrap();
        }
        let date_fmt = Format::new().set_num_format("dd/mm/yyyy");
        let dec18 = ExcelDateTime::from_ymd(2024, 12, 18).unwrap();
        ws.write_datetime_with_format(1, 0, &dec18, &date_fmt).unwrap();
        ws.write_string(1, 1, "V-1").unwrap();
        ws.write_string(1, 2, "Sewa").unwrap();
        ws.write_number(1, 3, 1234.56).unwrap();
        ws.write_string(2, 0, "19/12/2024").unwrap();
        ws.write_number(2, 1, 2002.0).unwrap();
        ws.write_string(2, 2, "Listrik").unwrap();
        ws.write_number(2, 3, 1_500_000.0).unwrap();
        wb.save(&path).unwrap();

        let raw = load_table(&path).unwrap();
        assert_eq!(raw.nominal, "1235\n1500000");
        assert_eq!(raw.voucher, "V-1\n2002");

        let records = build_records(&reconcile_columns(&raw).unwrap(), 2026);
        assert_eq!(records[0].date, "2024-12-18");
        assert_eq!(records[0].amount, 1_235);
        assert_eq!(records[1].date, "2024-12-19");
        assert_eq!(records[1].amount, 1_500_000);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn exact_headers_win_and_columns_are_never_shared() {
        let headers: Vec<String> =
            ["No", "Tgl Bukti", "No Bukti", "Uraian", "Jumlah"].into_iter().map(String::from).collect();
        let idx = resolve_columns(&headers, Path::new("x.csv")).unwrap();
        assert_eq!(idx, [1, 2, 3, 4]);

        // an exact "Voucher" header is preferred over an earlier partial match
        let headers: Vec<String> = ["Bukti Bank", "Tanggal", "Voucher", "Keterangan", "Nominal"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(resolve_columns(&headers, Path::new("x.csv")).unwrap(), [1, 2, 3, 4]);

        let headers: Vec<String> = ["Tgl Bukti", "Uraian", "Jumlah"].into_iter().map(String::from).collect();
        let err = resolve_columns(&headers, Path::new("x.csv")).unwrap_err();
        assert!(err.to_string().starts_with("kolom 'Voucher' memakai header yang sama"), "{err}");
    }

    #[test]
    fn csv_with_bukti_headers_maps_each_column_once() {
        let dir = scratch_dir("bukti");
        let path = dir.join("ledger.csv");
        fs::write(&path, "Tgl Bukti,No Bukti,Uraian,Jumlah\n18/12/2024,BKK-7,Sewa,1.000.000\n").unwrap();

        let raw = load_table(&path).unwrap();
        assert_eq!(raw.tanggal, "18/12/2024");
        assert_eq!(raw.voucher, "BKK-7");

        fs::remove_dir_all(&dir).ok();
    }
}
