//! Доменные модели — строки выписки брокера, бумаги, сделки и итоговый OFX-документ.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Строка CSV как есть: ячейки по порядку.
pub type RawRow = Vec<String>;

/// Внутренний идентификатор бумаги (OFX UNIQUEID).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecurityId(pub u64);

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Security {
    pub ticker: String,
    pub description: String,
    pub id: SecurityId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    Buy,
    TransferIn,
    Unhandled,
}

/// OFX SUBACCTSEC / SUBACCTFUND.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubAccount {
    Cash,
    Margin,
    Short,
    Other,
}

impl SubAccount {
    /// Колонка "Security Type" у Fidelity: "Cash", "Margin", "Short".
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("CASH") => SubAccount::Cash,
            Some("MARGIN") => SubAccount::Margin,
            Some("SHORT") => SubAccount::Short,
            _ => SubAccount::Other,
        }
    }

    pub fn as_ofx(self) -> &'static str {
        match self {
            SubAccount::Cash => "CASH",
            SubAccount::Margin => "MARGIN",
            SubAccount::Short => "SHORT",
            SubAccount::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub fitid: String,
    pub trade_time: DateTime<Utc>,
    pub settlement_date: Option<NaiveDate>,
    pub security: Option<Security>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub fee: Option<Decimal>,
    /// Всегда модуль суммы, знак из выгрузки не сохраняется.
    pub total: Option<Decimal>,
    pub sub_account: SubAccount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatementPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StatementPeriod {
    pub fn at(t: DateTime<Utc>) -> Self {
        Self { start: t, end: t }
    }

    pub fn include(&mut self, t: DateTime<Utc>) {
        if t < self.start {
            self.start = t;
        }
        if t > self.end {
            self.end = t;
        }
    }
}

/* ----------------------------- документ OFX ----------------------------- */

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_ofx(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub code: u32,
    pub severity: Severity,
}

impl Status {
    pub fn success() -> Self {
        Self { code: 0, severity: Severity::Info }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Institution {
    pub org: String,
    pub fid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signon {
    pub status: Status,
    pub server_time: DateTime<Utc>,
    pub language: String,
    pub institution: Institution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvestmentAccount {
    pub broker_id: String,
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentStatement {
    pub trn_uid: String,
    pub status: Status,
    pub as_of: DateTime<Utc>,
    pub currency: String,
    pub account: InvestmentAccount,
    pub period: StatementPeriod,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub signon: Signon,
    pub securities: Vec<Security>,
    pub statement: InvestmentStatement,
}
