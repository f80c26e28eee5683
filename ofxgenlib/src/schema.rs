//! Проверка раскладки выгрузки и доступ к ячейкам по имени колонки.

use crate::model::RawRow;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    RunDate,
    Action,
    Symbol,
    SecurityDescription,
    SecurityType,
    Quantity,
    Price,
    Commission,
    Fees,
    AccruedInterest,
    Amount,
    SettlementDate,
}

impl Column {
    pub const COUNT: usize = 12;

    pub const ALL: [Column; Column::COUNT] = [
        Column::RunDate,
        Column::Action,
        Column::Symbol,
        Column::SecurityDescription,
        Column::SecurityType,
        Column::Quantity,
        Column::Price,
        Column::Commission,
        Column::Fees,
        Column::AccruedInterest,
        Column::Amount,
        Column::SettlementDate,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::RunDate => "Run Date",
            Column::Action => "Action",
            Column::Symbol => "Symbol",
            Column::SecurityDescription => "Security Description",
            Column::SecurityType => "Security Type",
            Column::Quantity => "Quantity",
            Column::Price => "Price ($)",
            Column::Commission => "Commission ($)",
            Column::Fees => "Fees ($)",
            Column::AccruedInterest => "Accrued Interest ($)",
            Column::Amount => "Amount ($)",
            Column::SettlementDate => "Settlement Date",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Где во входном файле стоят служебные строки (индексы с нуля).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputLayout {
    pub marker_row: usize,
    pub marker: String,
    pub header_row: usize,
}

impl Default for InputLayout {
    fn default() -> Self {
        Self {
            marker_row: 3,
            marker: "Brokerage".into(),
            header_row: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("row {row} does not contain {expected:?}, got {received:?}")]
    Marker {
        row: usize,
        expected: String,
        received: RawRow,
    },

    #[error("header length mismatch: expected {expected} columns, got {received}")]
    HeaderLength { expected: usize, received: usize },

    #[error("header column not found: {0}")]
    MissingColumn(&'static str),
}

/// Индексы колонок, найденные в строке заголовка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    index: [usize; Column::COUNT],
}

impl ColumnLayout {
    pub fn from_header(header: &[String]) -> Result<Self, SchemaViolation> {
        if header.len() != Column::COUNT {
            return Err(SchemaViolation::HeaderLength {
                expected: Column::COUNT,
                received: header.len(),
            });
        }

        let mut index = [0; Column::COUNT];
        for column in Column::ALL {
            index[column.slot()] = header
                .iter()
                .position(|cell| cell.trim() == column.header())
                .ok_or(SchemaViolation::MissingColumn(column.header()))?;
        }
        Ok(Self { index })
    }

    pub fn index(&self, column: Column) -> usize {
        self.index[column.slot()]
    }
}

/// Все проверки по порядку; первая нарушенная возвращается как ошибка.
pub fn check(rows: &[RawRow], layout: &InputLayout) -> Result<ColumnLayout, SchemaViolation> {
    let empty = RawRow::new();

    let marker = rows.get(layout.marker_row).unwrap_or(&empty);
    if !(marker.len() == 1 && marker[0].trim() == layout.marker) {
        return Err(SchemaViolation::Marker {
            row: layout.marker_row,
            expected: layout.marker.clone(),
            received: marker.clone(),
        });
    }

    ColumnLayout::from_header(rows.get(layout.header_row).unwrap_or(&empty))
}

/// Та же проверка в виде флага: нарушение пишется в лог, дальше решает вызывающий.
pub fn validate(rows: &[RawRow], layout: &InputLayout) -> bool {
    match check(rows, layout) {
        Ok(_) => true,
        Err(violation) => {
            error!(%violation, "input file rejected");
            false
        }
    }
}

/// Строка данных, ячейки которой адресуются по имени колонки.
#[derive(Debug, Clone, Copy)]
pub struct StatementRow<'a> {
    line: usize,
    cells: &'a [String],
    columns: &'a ColumnLayout,
}

impl<'a> StatementRow<'a> {
    pub fn new(line: usize, cells: &'a [String], columns: &'a ColumnLayout) -> Self {
        Self { line, cells, columns }
    }

    /// Номер записи в файле (с единицы); пустые строки тоже считаются.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn cells(&self) -> &'a [String] {
        self.cells
    }

    /// Обрезанное значение ячейки; отсутствующая ячейка — пустая строка.
    pub fn text(&self, column: Column) -> &'a str {
        self.cells
            .get(self.columns.index(column))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn optional(&self, column: Column) -> Option<&'a str> {
        Some(self.text(column)).filter(|s| !s.is_empty())
    }
}

/// Строки после заголовка; строки меньше чем из двух ячеек — разделители и дисклеймер.
pub fn data_rows<'a>(
    rows: &'a [RawRow],
    layout: &InputLayout,
    columns: &'a ColumnLayout,
) -> Vec<StatementRow<'a>> {
    rows.iter()
        .enumerate()
        .skip(layout.header_row + 1)
        .filter(|(_, row)| row.len() > 1)
        .map(|(i, row)| StatementRow::new(i + 1, row, columns))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RawRow {
        Column::ALL.iter().map(|c| c.header().to_string()).collect()
    }

    fn file(marker: &str, header: RawRow) -> Vec<RawRow> {
        vec![
            vec![],
            vec![],
            vec![],
            vec![marker.to_string()],
            vec![],
            header,
        ]
    }

    #[test]
    fn accepts_expected_layout() {
        let rows = file("Brokerage", header());
        let columns = check(&rows, &InputLayout::default()).expect("valid");
        assert_eq!(columns.index(Column::RunDate), 0);
        assert_eq!(columns.index(Column::SettlementDate), 11);
        assert!(validate(&rows, &InputLayout::default()));
    }

    #[test]
    fn rejects_wrong_marker() {
        let rows = file("Retirement", header());
        let err = check(&rows, &InputLayout::default()).unwrap_err();
        assert!(matches!(err, SchemaViolation::Marker { row: 3, .. }));
        assert!(err.to_string().contains("Retirement"));
        assert!(!validate(&rows, &InputLayout::default()));
    }

    #[test]
    fn rejects_short_header() {
        let mut h = header();
        h.pop();
        let err = check(&file("Brokerage", h), &InputLayout::default()).unwrap_err();
        assert_eq!(err, SchemaViolation::HeaderLength { expected: 12, received: 11 });
    }

    #[test]
    fn rejects_renamed_column() {
        let mut h = header();
        h[6] = "Price".into();
        let err = check(&file("Brokerage", h), &InputLayout::default()).unwrap_err();
        assert_eq!(err, SchemaViolation::MissingColumn("Price ($)"));
    }

    #[test]
    fn padded_marker_and_header_cells_are_accepted() {
        let h: RawRow = header().into_iter().map(|c| format!(" {c} ")).collect();
        let rows = file(" Brokerage ", h);
        let columns = check(&rows, &InputLayout::default()).expect("valid");
        assert_eq!(columns.index(Column::Amount), 10);

        let mut rows = file("Brokerage", header());
        rows[3].push(String::new());
        assert!(matches!(
            check(&rows, &InputLayout::default()),
            Err(SchemaViolation::Marker { .. })
        ));
    }

    #[test]
    fn missing_rows_fail_instead_of_panicking() {
        let rows = vec![vec!["Brokerage".to_string()]];
        assert!(!validate(&rows, &InputLayout::default()));
    }

    #[test]
    fn reordered_columns_are_read_by_name() {
        let mut h = header();
        h.swap(0, 1);
        let rows = file("Brokerage", h);
        let columns = check(&rows, &InputLayout::default()).expect("valid");
        assert_eq!(columns.index(Column::Action), 0);
        assert_eq!(columns.index(Column::RunDate), 1);

        let cells: RawRow = vec!["You bought".into(), "01/02/2024".into()];
        let row = StatementRow::new(7, &cells, &columns);
        assert_eq!(row.text(Column::RunDate), "01/02/2024");
        assert_eq!(row.optional(Column::Symbol), None);
    }

    #[test]
    fn data_rows_skip_separators() {
        let mut rows = file("Brokerage", header());
        rows.push(vec!["a".into(), "b".into()]);
        rows.push(vec![]);
        rows.push(vec!["disclaimer".into()]);
        rows.push(vec!["c".into(), "d".into()]);
        let layout = InputLayout::default();
        let columns = check(&rows, &layout).expect("valid");
        let data = data_rows(&rows, &layout, &columns);
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].line(), 7);
        assert_eq!(data[1].line(), 10);
    }
}
