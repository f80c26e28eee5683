//! Реестр бумаг: каждый тикер получает свой UNIQUEID в порядке первого появления.

use crate::{
    model::{Security, SecurityId},
    schema::{Column, StatementRow},
};
use std::collections::HashMap;

pub const FIRST_SECURITY_ID: u64 = 100_000_000;

/// Описание, которым выгрузка помечает строки без бумаги (движение денег).
pub const NO_DESCRIPTION: &str = "No Description";

#[derive(Debug, Clone, Default)]
pub struct SecurityRegistry {
    securities: Vec<Security>,
    by_ticker: HashMap<String, usize>,
}

impl SecurityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: &[StatementRow<'_>]) -> Self {
        let mut registry = Self::new();
        for row in rows {
            let description = row.text(Column::SecurityDescription);
            if description != NO_DESCRIPTION {
                registry.register(row.text(Column::Symbol), description);
            }
        }
        registry
    }

    /// Повторный тикер возвращает уже выданную запись и номер не тратит.
    pub fn register(&mut self, ticker: &str, description: &str) -> &Security {
        let ticker = ticker.trim();
        let idx = match self.by_ticker.get(ticker) {
            Some(&idx) => idx,
            None => {
                let id = SecurityId(FIRST_SECURITY_ID + self.securities.len() as u64);
                self.securities.push(Security {
                    ticker: ticker.to_string(),
                    description: description.trim().to_string(),
                    id,
                });
                self.by_ticker.insert(ticker.to_string(), self.securities.len() - 1);
                self.securities.len() - 1
            }
        };
        &self.securities[idx]
    }

    pub fn get(&self, ticker: &str) -> Option<&Security> {
        self.by_ticker.get(ticker.trim()).map(|&idx| &self.securities[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Security> {
        self.securities.iter()
    }

    pub fn len(&self) -> usize {
        self.securities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.securities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawRow;
    use crate::schema::ColumnLayout;

    fn columns() -> ColumnLayout {
        let header: RawRow = Column::ALL.iter().map(|c| c.header().to_string()).collect();
        ColumnLayout::from_header(&header).expect("header")
    }

    fn row(symbol: &str, description: &str) -> RawRow {
        let mut cells = vec![String::new(); Column::ALL.len()];
        cells[2] = symbol.into();
        cells[3] = description.into();
        cells
    }

    #[test]
    fn ids_follow_first_appearance() {
        let columns = columns();
        let raw = vec![
            row(" VTI ", "VANGUARD TOTAL STOCK MKT"),
            row("SPAXX", NO_DESCRIPTION),
            row("AAPL", "APPLE INC"),
            row("VTI", "VANGUARD TOTAL STOCK MKT"),
            row("MSFT", "MICROSOFT CORP"),
        ];
        let rows: Vec<_> = raw
            .iter()
            .enumerate()
            .map(|(i, r)| StatementRow::new(i + 1, r, &columns))
            .collect();

        let reg = SecurityRegistry::from_rows(&rows);
        let got: Vec<_> = reg.iter().map(|s| (s.ticker.as_str(), s.id.0)).collect();
        assert_eq!(
            got,
            vec![("VTI", 100_000_000), ("AAPL", 100_000_001), ("MSFT", 100_000_002)]
        );
        assert!(reg.get("SPAXX").is_none());
        assert_eq!(reg.get("AAPL").map(|s| s.description.as_str()), Some("APPLE INC"));
    }

    #[test]
    fn repeated_ticker_keeps_first_record() {
        let mut reg = SecurityRegistry::new();
        let first = reg.register("AAPL", "Apple Inc.").id;
        let again = reg.register("AAPL", "APPLE INC COM").clone();
        assert_eq!(first, again.id);
        assert_eq!(again.description, "Apple Inc.");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.register("GOOG", "Alphabet").id, SecurityId(100_000_001));
    }
}
