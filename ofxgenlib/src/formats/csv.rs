//! Выгрузка истории счёта Fidelity ("History_for_Account_*.csv").
//!
//! Файл читается без заголовка и с переменным числом колонок: в начале идут
//! служебные строки, таблица начинается позже, в конце — текст дисклеймера.

use crate::{error::Result, model::RawRow};
use csv::{ReaderBuilder, StringRecord};
use std::io::BufRead;

pub struct BrokerageCsv;

impl crate::traits::ReadFormat for BrokerageCsv {
    fn read<R: BufRead>(mut r: R) -> Result<Vec<RawRow>> {
        let mut text = String::new();
        r.read_to_string(&mut text)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut rows: Vec<RawRow> = Vec::new();
        let mut record = StringRecord::new();
        let mut end = 0;

        while rdr.read_record(&mut record)? {
            // csv пропускает пустые строки, а маркер и заголовок ищутся по номеру записи
            let blank = blank_lines(text.as_bytes(), end);
            rows.extend(std::iter::repeat_with(RawRow::new).take(blank));
            rows.push(record.iter().map(str::to_string).collect());
            end = rdr.position().byte() as usize;
        }
        Ok(rows)
    }
}

/// Пустые строки между концом предыдущей записи (`end`) и началом следующей.
/// Переводы строк внутри ячеек в кавычках сюда не попадают.
fn blank_lines(bytes: &[u8], end: usize) -> usize {
    let mut i = end.min(bytes.len());
    let terminated = i == 0 || matches!(bytes[i - 1], b'\n' | b'\r');
    if i > 0 && bytes[i - 1] == b'\r' && bytes.get(i) == Some(&b'\n') {
        i += 1;
    }

    let mut breaks = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\r' => {
                breaks += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => breaks += 1,
            _ => break,
        }
        i += 1;
    }

    // перевод строки, закрывающий предыдущую запись, пустой строкой не считается
    if terminated {
        breaks
    } else {
        breaks.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ReadFormat;
    use std::io::Cursor;

    #[test]
    fn blank_lines_keep_their_positions() {
        let input = "\n\nBrokerage\n\nRun Date,Action\n01/02/2024,You bought\n";
        let rows = BrokerageCsv::read(Cursor::new(input)).expect("read csv");
        assert_eq!(rows.len(), 6);
        assert!(rows[0].is_empty());
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["Brokerage".to_string()]);
        assert!(rows[3].is_empty());
        assert_eq!(rows[4], vec!["Run Date".to_string(), "Action".to_string()]);
    }

    #[test]
    fn bom_is_stripped() {
        let input = "\u{feff}Brokerage\nA,B\n";
        let rows = BrokerageCsv::read(Cursor::new(input)).expect("read csv");
        assert_eq!(rows[0], vec!["Brokerage".to_string()]);
    }

    #[test]
    fn multiline_cell_is_one_row() {
        let input = "\"a\nb\",1\n\nx,y\n";
        let rows = BrokerageCsv::read(Cursor::new(input)).expect("read csv");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["a\nb".to_string(), "1".to_string()]);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn crlf_blank_lines_counted_once() {
        let input = "\r\n\r\n\"Individual\r\nTOD\",\r\nBrokerage\r\n\r\nA,B\r\n";
        let rows = BrokerageCsv::read(Cursor::new(input)).expect("read csv");
        assert_eq!(rows.len(), 6);
        assert!(rows[0].is_empty());
        assert!(rows[1].is_empty());
        assert_eq!(rows[2][0], "Individual\r\nTOD");
        assert_eq!(rows[3], vec!["Brokerage".to_string()]);
        assert!(rows[4].is_empty());
        assert_eq!(rows[5], vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn quoted_cells_with_commas() {
        let input = "\"Transfer in from brokerage a/c X, Y\",1\n";
        let rows = BrokerageCsv::read(Cursor::new(input)).expect("read csv");
        assert_eq!(rows[0][0], "Transfer in from brokerage a/c X, Y");
        assert_eq!(rows[0][1], "1");
    }
}
