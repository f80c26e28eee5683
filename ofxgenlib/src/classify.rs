//! Разбор строк выгрузки в сделки.
//!
//! Каждая строка сначала даёт время сделки (оно расширяет период выписки даже
//! для строк, которые потом будут отброшены), затем классифицируется по
//! префиксу действия. Ошибки разбора возвращаются как значения по строке, а
//! [`ErrorPolicy`] решает, прерывать ли весь прогон.

use crate::{
    error::{OfxGenError, Result, RowError},
    model::{RawRow, StatementPeriod, SubAccount, Transaction, TransactionKind},
    schema::{Column, StatementRow},
    securities::SecurityRegistry,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

pub const TRADE_TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";
pub const DATE_FORMAT: &str = "%m/%d/%Y";

const BUY_PREFIX: &str = "You bought";
const TRANSFER_IN_PREFIX: &str = "Transfer in from brokerage a/c";

/// Что делать со строкой, которую не удалось разобрать.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Первая же ошибка останавливает прогон.
    #[default]
    Abort,
    /// Строка попадает в отчёт и пропускается.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub line: usize,
    pub error: RowError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledRow {
    pub line: usize,
    pub action: String,
    pub cells: RawRow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub failures: Vec<RowFailure>,
    pub unhandled: Vec<UnhandledRow>,
    /// Строки "You bought" с неотрицательной суммой: в выписку не попадают.
    // TODO: выяснить, сторно ли это, и решить — выводить предупреждение или BUYOTHER
    pub nonnegative_buys: Vec<usize>,
    pub transfers_in: usize,
}

impl ClassificationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unhandled.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub transactions: Vec<Transaction>,
    /// None, если ни в одной строке не было времени сделки.
    pub period: Option<StatementPeriod>,
    pub report: ClassificationReport,
}

pub fn classify_action(action: &str) -> TransactionKind {
    if starts_with_ignore_case(action, BUY_PREFIX) {
        TransactionKind::Buy
    } else if starts_with_ignore_case(action, TRANSFER_IN_PREFIX) {
        TransactionKind::TransferIn
    } else {
        TransactionKind::Unhandled
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

pub fn classify(
    rows: &[StatementRow<'_>],
    registry: &SecurityRegistry,
    policy: ErrorPolicy,
) -> Result<Classification> {
    let mut state = Classifier {
        registry,
        period: None,
        report: ClassificationReport::default(),
        fitids: FitIdGenerator::default(),
    };
    let mut transactions = Vec::new();

    for row in rows {
        match state.row(row) {
            Ok(Some(tx)) => transactions.push(tx),
            Ok(None) => {}
            Err(error) => match policy {
                ErrorPolicy::Abort => {
                    return Err(OfxGenError::Row {
                        line: row.line(),
                        source: error,
                    })
                }
                ErrorPolicy::Skip => {
                    warn!(line = row.line(), %error, "row skipped");
                    state.report.failures.push(RowFailure {
                        line: row.line(),
                        error,
                    });
                }
            },
        }
    }

    Ok(Classification {
        transactions,
        period: state.period,
        report: state.report,
    })
}

struct Classifier<'r> {
    registry: &'r SecurityRegistry,
    period: Option<StatementPeriod>,
    report: ClassificationReport,
    fitids: FitIdGenerator,
}

impl Classifier<'_> {
    fn row(&mut self, row: &StatementRow<'_>) -> std::result::Result<Option<Transaction>, RowError> {
        let trade_time = parse_trade_time(row.text(Column::RunDate))?;
        match self.period.as_mut() {
            Some(period) => period.include(trade_time),
            None => self.period = Some(StatementPeriod::at(trade_time)),
        }

        let fields = Fields::parse(row)?;
        let action = row.text(Column::Action);

        match classify_action(action) {
            TransactionKind::Buy => {
                let amount = fields.amount.ok_or(RowError::Missing(Column::Amount.header()))?;
                if amount >= Decimal::ZERO {
                    debug!(line = row.line(), %amount, "buy with non-negative amount ignored");
                    self.report.nonnegative_buys.push(row.line());
                    return Ok(None);
                }

                let symbol = fields.symbol.unwrap_or_default();
                let security = self
                    .registry
                    .get(symbol)
                    .cloned()
                    .ok_or_else(|| RowError::UnknownSecurity(symbol.to_string()))?;

                Ok(Some(Transaction {
                    kind: TransactionKind::Buy,
                    fitid: self.fitids.for_row(row.cells()),
                    trade_time,
                    settlement_date: fields.settlement_date,
                    security: Some(security),
                    quantity: fields.quantity,
                    unit_price: fields.price,
                    commission: fields.commission,
                    fee: fields.fees,
                    total: Some(amount.abs()),
                    sub_account: SubAccount::from_label(fields.security_type),
                }))
            }
            TransactionKind::TransferIn => {
                self.report.transfers_in += 1;
                Ok(None)
            }
            TransactionKind::Unhandled => {
                warn!(line = row.line(), action, row = ?row.cells(), "action not handled");
                self.report.unhandled.push(UnhandledRow {
                    line: row.line(),
                    action: action.to_string(),
                    cells: row.cells().to_vec(),
                });
                Ok(None)
            }
        }
    }
}

/// Необязательные поля строки; пустая ячейка — None, не ноль.
struct Fields<'a> {
    symbol: Option<&'a str>,
    security_type: Option<&'a str>,
    quantity: Option<Decimal>,
    price: Option<Decimal>,
    commission: Option<Decimal>,
    fees: Option<Decimal>,
    amount: Option<Decimal>,
    settlement_date: Option<NaiveDate>,
}

impl<'a> Fields<'a> {
    fn parse(row: &StatementRow<'a>) -> std::result::Result<Self, RowError> {
        Ok(Self {
            symbol: row.optional(Column::Symbol),
            security_type: row.optional(Column::SecurityType),
            quantity: decimal(row, Column::Quantity)?,
            price: decimal(row, Column::Price)?,
            commission: decimal(row, Column::Commission)?,
            fees: decimal(row, Column::Fees)?,
            amount: decimal(row, Column::Amount)?,
            settlement_date: row
                .optional(Column::SettlementDate)
                .map(parse_date)
                .transpose()?,
        })
    }
}

fn decimal(row: &StatementRow<'_>, column: Column) -> std::result::Result<Option<Decimal>, RowError> {
    row.optional(column)
        .map(|s| {
            s.parse::<Decimal>().map_err(|_| RowError::Number {
                column: column.header(),
                value: s.to_string(),
            })
        })
        .transpose()
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, RowError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| RowError::SettlementDate {
        value: s.to_string(),
        reason: e.to_string(),
    })
}

/// "01/02/2024 09:30:00 AM ET" и просто "01/02/2024"; время считается UTC.
pub fn parse_trade_time(raw: &str) -> std::result::Result<DateTime<Utc>, RowError> {
    let raw = raw.trim();
    let value = strip_zone(raw);
    let bad = |reason: String| RowError::TradeTime {
        value: raw.to_string(),
        reason,
    };

    let naive = match NaiveDateTime::parse_from_str(value, TRADE_TIME_FORMAT) {
        Ok(t) => t,
        Err(e) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| bad(e.to_string()))?,
    };
    Ok(naive.and_utc())
}

fn strip_zone(s: &str) -> &str {
    match s.rsplit_once(' ') {
        Some((head, zone)) if is_zone_abbreviation(zone) => head.trim_end(),
        _ => s,
    }
}

fn is_zone_abbreviation(token: &str) -> bool {
    (2..=5).contains(&token.len())
        && token.bytes().all(|b| b.is_ascii_uppercase())
        && token != "AM"
        && token != "PM"
}

/// FITID из содержимого строки: повторный импорт той же выгрузки даёт те же id,
/// одинаковые строки различаются номером повтора.
#[derive(Default)]
struct FitIdGenerator {
    seen: HashMap<String, u32>,
}

impl FitIdGenerator {
    fn for_row(&mut self, cells: &[String]) -> String {
        let key = cells
            .iter()
            .map(|c| c.trim())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        let n = self.seen.entry(key.clone()).or_insert(0);
        *n += 1;
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{key}\u{1e}{n}").as_bytes()).to_string()
    }
}
