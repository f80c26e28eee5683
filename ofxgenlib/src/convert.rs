//! Полный прогон: строки → проверка → реестр бумаг → сделки → документ → OFX.

use crate::{
    assemble::assemble,
    classify::{classify, Classification, ClassificationReport},
    config::ConverterConfig,
    error::{OfxGenError, Result},
    formats::{csv::BrokerageCsv, ofx::Ofx},
    model::{Document, RawRow},
    schema,
    securities::SecurityRegistry,
    traits::{ReadFormat, WriteFormat},
};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: Document,
    pub report: ClassificationReport,
}

pub fn build_document(
    rows: &[RawRow],
    account_id: &str,
    cfg: &ConverterConfig,
    now: DateTime<Utc>,
) -> Result<Conversion> {
    let columns = schema::check(rows, &cfg.layout).map_err(|violation| {
        error!(%violation, "input file rejected");
        OfxGenError::from(violation)
    })?;

    let data = schema::data_rows(rows, &cfg.layout, &columns);
    let registry = SecurityRegistry::from_rows(&data);
    let Classification {
        transactions,
        period,
        report,
    } = classify(&data, &registry, cfg.error_policy)?;

    info!(
        rows = data.len(),
        securities = registry.len(),
        transactions = transactions.len(),
        unhandled = report.unhandled.len(),
        failed = report.failures.len(),
        "statement classified"
    );

    let document = assemble(&registry, transactions, period, account_id, cfg, now);
    Ok(Conversion { document, report })
}

/// Документ целиком собирается в памяти и пишется в `output` одной операцией.
pub fn convert<R: BufRead, W: Write>(
    input: R,
    output: W,
    account_id: &str,
    cfg: &ConverterConfig,
) -> Result<ClassificationReport> {
    let rows = BrokerageCsv::read(input)?;
    let Conversion { document, report } = build_document(&rows, account_id, cfg, Utc::now())?;
    Ofx::new(cfg.ofx_version).write(output, &document)?;
    Ok(report)
}

/// Выходной файл создаётся только после успешной сборки документа.
pub fn convert_file(
    input: &Path,
    output: &Path,
    account_id: &str,
    cfg: &ConverterConfig,
) -> Result<ClassificationReport> {
    let rows = BrokerageCsv::read(BufReader::new(File::open(input)?))?;
    let Conversion { document, report } = build_document(&rows, account_id, cfg, Utc::now())?;
    let text = Ofx::new(cfg.ofx_version).render(&document)?;
    fs::write(output, text)?;
    info!(output = %output.display(), "statement written");
    Ok(report)
}

/// "History_for_Account_9554419996.csv" → "9554419996".
pub fn account_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    account_file_re()
        .captures(name)
        .map(|c| c["acct"].to_string())
        .filter(|s| !s.is_empty())
}

fn account_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.*_(?P<acct>[^_]*)\.csv$").expect("account file regex"))
}

/// Явно заданный номер счёта важнее номера из имени файла.
pub fn resolve_account_id(cfg: &ConverterConfig, input: Option<&Path>) -> Result<String> {
    cfg.account_id
        .clone()
        .or_else(|| input.and_then(account_id_from_path))
        .ok_or_else(|| {
            OfxGenError::Config(
                "account id is not set and cannot be taken from the input file name".into(),
            )
        })
}
