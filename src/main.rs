use anyhow::{bail, Context, Result};
use audit_worksheet::config::{self, or_dash, AuditMetadata};
use audit_worksheet::export::{self, Template};
use audit_worksheet::journal::{self, RawColumns};
use audit_worksheet::summary::{format_count, format_rupiah};
use audit_worksheet::{demo, process_data, Method, PipelineError, SamplingRun};
use chrono::Local;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TemplateArg {
    Jasa,
    Blud,
}

impl From<TemplateArg> for Template {
    fn from(t: TemplateArg) -> Self {
        match t {
            TemplateArg::Jasa => Template::Jasa,
            TemplateArg::Blud => Template::Blud,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "audit-worksheet",
    version,
    about = "Generator kertas kerja uji detil (audit sampling)",
    long_about = "\
Membuat kertas kerja uji detil dari empat kolom data transaksi:\n\
- Tanggal, Voucher, Keterangan, Nominal (satu baris per transaksi);\n\
- Metode: rendah (Top 10), moderate (Top 10 + 10 acak), tinggi (Top 15 + 15 acak);\n\
- Hasil ditampilkan di layar dan diekspor ke Excel (template jasa atau blud)."
)]
struct Args {
    /// File teks kolom Tanggal (satu baris per transaksi)
    #[arg(long, value_name = "FILE", requires_all = ["voucher", "keterangan", "nominal"])]
    tanggal: Option<PathBuf>,

    /// File teks kolom Voucher
    #[arg(long, value_name = "FILE", requires = "tanggal")]
    voucher: Option<PathBuf>,

    /// File teks kolom Keterangan
    #[arg(long, value_name = "FILE", requires = "tanggal")]
    keterangan: Option<PathBuf>,

    /// File teks kolom Nominal
    #[arg(long, value_name = "FILE", requires = "tanggal")]
    nominal: Option<PathBuf>,

    /// Satu file CSV/Excel berisi kolom Tanggal, Voucher, Keterangan, Nominal (dengan header)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["tanggal", "demo"])]
    table: Option<PathBuf>,

    /// Pakai N baris data dummy (beserta info audit contoh)
    #[arg(long, value_name = "N", conflicts_with = "tanggal")]
    demo: Option<usize>,

    /// Metode sampling: rendah, moderate, tinggi (lainnya diperlakukan sebagai rendah)
    #[arg(long, default_value = "moderate")]
    method: String,

    /// File JSON info audit (client_name, header_label, account_label, prepared_by, ...)
    #[arg(long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    /// Nama klien (wajib, dari sini atau dari --metadata)
    #[arg(long)]
    client: Option<String>,

    /// Judul kertas kerja (default: Sampling Results)
    #[arg(long)]
    header: Option<String>,

    /// Nama akun
    #[arg(long)]
    account: Option<String>,

    /// Dibuat oleh
    #[arg(long)]
    prepared_by: Option<String>,

    /// Tanggal dibuat (default: hari ini)
    #[arg(long, value_name = "YYYY-MM-DD")]
    prepared_date: Option<String>,

    /// Direview oleh
    #[arg(long)]
    reviewed_by: Option<String>,

    /// Tanggal direview (default: hari ini)
    #[arg(long, value_name = "YYYY-MM-DD")]
    reviewed_date: Option<String>,

    /// Periode / schedule, mis. "Audit Q4 2025"
    #[arg(long)]
    schedule: Option<String>,

    /// Template Excel
    #[arg(long, value_enum, default_value_t = TemplateArg::Jasa)]
    template: TemplateArg,

    /// File Excel keluaran
    #[arg(long, value_name = "FILE", default_value = export::DEFAULT_FILE_NAME)]
    output: PathBuf,

    /// Jangan tulis file Excel
    #[arg(long, default_value_t = false)]
    no_export: bool,

    /// Cetak hasil sebagai JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Seed untuk sampel acak (agar hasil dapat diulang)
    #[arg(long)]
    seed: Option<u64>,

    /// Log rinci ke stderr
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,audit_worksheet=debug" } else { "warn" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt().with_env_filter(env).with_writer(std::io::stderr).init();
}

fn resolve_metadata(args: &Args, base: AuditMetadata) -> Result<AuditMetadata> {
    let mut meta = match &args.metadata {
        Some(p) => config::load_metadata(p)?,
        None => base,
    };
    let overrides = [
        (&args.client, &mut meta.client_name),
        (&args.header, &mut meta.header_label),
        (&args.account, &mut meta.account_label),
        (&args.prepared_by, &mut meta.prepared_by),
        (&args.prepared_date, &mut meta.prepared_date),
        (&args.reviewed_by, &mut meta.reviewed_by),
        (&args.reviewed_date, &mut meta.reviewed_date),
        (&args.schedule, &mut meta.schedule),
    ];
    for (arg, field) in overrides {
        if let Some(v) = arg {
            *field = v.clone();
        }
    }
    Ok(meta.with_default_dates(Local::now().date_naive()))
}

/// Per-column counts for a mismatch; other failures carry only their message.
fn print_diagnostics(err: &PipelineError) {
    if let (Some(counts), Some(analysis)) = (err.counts(), err.analysis()) {
        for (column, n) in counts.iter() {
            let mark = if n == analysis.max_count { " " } else { "!" };
            eprintln!("{mark} {:<11} {n} baris", column.label());
        }
        eprintln!();
        eprintln!("{analysis}");
        eprintln!();
    }
}

fn print_run(run: &SamplingRun) {
    println!("{:>4}  {:<10}  {:<16}  {:<32}  {:>18}", "No", "Tanggal", "Voucher", "Keterangan", "Nominal");
    for (i, r) in run.sample.iter().enumerate() {
        println!(
            "{:>4}  {:<10}  {:<16}  {:<32}  {:>18}",
            i + 1,
            r.date,
            r.voucher,
            r.description,
            format_rupiah(r.amount)
        );
    }

    let s = &run.summary;
    let m = &run.metadata;
    println!();
    println!("Total Data       : {}", format_count(s.total_records));
    println!("Total Nominal    : {}", format_rupiah(s.total_amount));
    println!("Metode Sampling  : {}", run.method.label());
    println!("Jumlah Sampel    : {}", format_count(s.sample_count));
    println!("Nominal Terkecil : {}", format_rupiah(s.min_amount));
    println!("Nominal Terbesar : {}", format_rupiah(s.max_amount));
    println!("Rata-rata        : {}", format_rupiah(s.avg_amount));
    println!("Cakupan          : {}", s.coverage_label());
    println!();
    println!("Klien            : {}", or_dash(&m.client_name));
    println!("Header           : {}", or_dash(&m.header_label));
    println!("Akun             : {}", or_dash(&m.account_label));
    println!("Dibuat oleh      : {}", or_dash(&m.prepared_by));
    println!("Direview oleh    : {}", or_dash(&m.reviewed_by));
    println!("Schedule         : {}", or_dash(&m.schedule));
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut rng: StdRng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let (columns, base_meta): (RawColumns, AuditMetadata) = match (&args.table, &args.tanggal, args.demo) {
        (Some(table), _, _) => (
            journal::load_table(table).with_context(|| format!("gagal membaca tabel: {}", table.display()))?,
            AuditMetadata::default(),
        ),
        (None, Some(tanggal), _) => {
            let (Some(voucher), Some(keterangan), Some(nominal)) = (&args.voucher, &args.keterangan, &args.nominal)
            else {
                bail!("--tanggal, --voucher, --keterangan dan --nominal harus diberikan bersama");
            };
            (journal::load_column_files(tanggal, voucher, keterangan, nominal)?, AuditMetadata::default())
        }
        (None, None, Some(n)) => (
            demo::generate_dummy_columns(n, Local::now().date_naive(), &mut rng),
            demo::dummy_metadata(),
        ),
        (None, None, None) => bail!("berikan data lewat --table, --tanggal/--voucher/--keterangan/--nominal, atau --demo"),
    };
    let metadata = resolve_metadata(&args, base_meta)?;
    let method = Method::from_tag(&args.method);

    let run = match process_data(&columns, method, &metadata, &mut rng) {
        Ok(run) => run,
        Err(err) => {
            print_diagnostics(&err);
            return Err(err.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run);
    }

    if !args.no_export {
        export::write_workpaper(&run, args.template.into(), &args.output)
            .with_context(|| format!("gagal mengekspor: {}", args.output.display()))?;
        println!("{}", args.output.display());
    }
    Ok(())
}
