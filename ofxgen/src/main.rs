use clap::Parser;
use ofxgenlib::{
    classify::{ClassificationReport, ErrorPolicy},
    config::ConverterConfig,
    convert::{convert, convert_file, resolve_account_id},
    error::Result,
};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ofxgen", version, about = "Конвертация истории брокерского счёта в OFX")]
struct Cli {
    /// Входной CSV (по умолчанию stdin)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Выходной файл (по умолчанию stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// TOML с настройками
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Номер счёта, если его нет в имени файла
    #[arg(long = "account-id")]
    account_id: Option<String>,

    /// Версия OFX в заголовке (102, 103, 220, ...)
    #[arg(long = "ofx-version")]
    ofx_version: Option<u16>,

    /// Пропускать строки с ошибками разбора вместо остановки
    #[arg(long = "skip-bad-rows")]
    skip_bad_rows: bool,
}

fn main() -> Result<()> {
    // stdout может быть занят документом, поэтому лог — в stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => ConverterConfig::load(path)?,
        None => ConverterConfig::default(),
    };
    if cli.input.is_some() {
        cfg.input = cli.input;
    }
    if cli.output.is_some() {
        cfg.output = cli.output;
    }
    if cli.account_id.is_some() {
        cfg.account_id = cli.account_id;
    }
    if let Some(v) = cli.ofx_version {
        cfg.ofx_version = v;
    }
    if cli.skip_bad_rows {
        cfg.error_policy = ErrorPolicy::Skip;
    }

    let account_id = resolve_account_id(&cfg, cfg.input.as_deref())?;

    let report = match (&cfg.input, &cfg.output) {
        (Some(input), Some(output)) => convert_file(input, output, &account_id, &cfg)?,
        (input, output) => {
            let reader: Box<dyn io::Read> = match input {
                Some(path) => Box::new(std::fs::File::open(path)?),
                None => Box::new(io::stdin()),
            };
            let mut buf = Vec::new();
            let report = convert(BufReader::new(reader), &mut buf, &account_id, &cfg)?;

            let mut writer: Box<dyn Write> = match output {
                Some(path) => Box::new(std::fs::File::create(path)?),
                None => Box::new(io::stdout()),
            };
            writer.write_all(&buf)?;
            writer.flush()?;
            report
        }
    };

    summarize(&report);
    Ok(())
}

fn summarize(report: &ClassificationReport) {
    if !report.nonnegative_buys.is_empty() {
        info!(lines = ?report.nonnegative_buys, "buys with non-negative amount were left out");
    }
    if !report.is_clean() {
        warn!(
            unhandled = report.unhandled.len(),
            failed = report.failures.len(),
            "some rows were not converted"
        );
    }
}
