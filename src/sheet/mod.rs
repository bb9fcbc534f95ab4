//! Tabular sheets exchanged with spreadsheet tools.
//!
//! A sheet is a plain grid of cells. It is read from tab- or comma-separated
//! text (what spreadsheet applications export) and written as tab-separated
//! text, which they open directly.

pub mod export;
pub mod import;

pub use export::{export_file_name, sheet_from_members, EXPORT_HEADERS};
pub use import::{members_from_sheet, HEADER_MARKER};

use std::fmt;

use crate::error::{Error, Result};

/// Leading bytes of a zip archive, which is what an `.xlsx` workbook is
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// A cell classified the way a spreadsheet would. Numbers keep the text they
/// were read from, so a name such as `007` survives a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number { value: f64, raw: String },
    Text(String),
}

impl Cell {
    /// Classify a raw field the way a spreadsheet would
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Number {
                value,
                raw: trimmed.to_string(),
            },
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// The cell as written, without numeric reformatting
    pub fn text(&self) -> &str {
        match self {
            Cell::Empty => "",
            Cell::Number { raw, .. } => raw,
            Cell::Text(s) => s,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number {
            value: value as f64,
            raw: value.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Parse delimited text. The delimiter is a tab if any line contains one,
    /// otherwise a comma. Double-quoted fields may contain
    /// delimiters, newlines and `""` escapes. A leading BOM is ignored.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = detect_delimiter(text);

        let rows = split_records(text, delimiter)
            .into_iter()
            .map(|fields| fields.iter().map(|f| Cell::parse(f)).collect())
            .collect();

        Self { rows }
    }

    /// Render as tab-separated text, one line per row
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let line = row
                .iter()
                .map(|cell| quote_field(&cell.to_string(), '\t'))
                .collect::<Vec<_>>()
                .join("\t");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Decode an uploaded sheet file as UTF-8 text.
///
/// Excel workbooks are recognized and rejected with a hint to save the sheet
/// as CSV or TSV instead.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(ZIP_MAGIC) {
        return Err(Error::invalid(
            "Excel workbooks (.xlsx) are not supported; save the sheet as CSV or TSV and import that",
        ));
    }
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        Error::invalid("Sheet is not UTF-8 text; save it as CSV (UTF-8) or TSV")
    })
}

fn detect_delimiter(text: &str) -> char {
    // Title rows above the header are often a single cell
    if text.lines().any(|line| line.contains('\t')) {
        '\t'
    } else {
        ','
    }
}

fn split_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

fn quote_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(""), Cell::Empty);
        assert_eq!(Cell::parse("  "), Cell::Empty);
        assert!(matches!(Cell::parse("3"), Cell::Number { value, .. } if value == 3.0));
        assert!(matches!(Cell::parse("-10"), Cell::Number { value, .. } if value == -10.0));
        assert_eq!(Cell::parse(" Kim "), Cell::Text("Kim".to_string()));
        assert_eq!(Cell::parse("NaN"), Cell::Text("NaN".to_string()));
    }

    #[test]
    fn test_cell_display_keeps_source_text() {
        assert_eq!(Cell::from(3).to_string(), "3");
        assert_eq!(Cell::from(-3).to_string(), "-3");
        assert_eq!(Cell::parse(" 007 ").to_string(), "007");
        assert_eq!(Cell::parse("1e3").to_string(), "1e3");
        assert_eq!(Cell::Empty.to_string(), "");
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("참석자,출석\n".as_bytes()).unwrap(), "참석자,출석\n");

        let workbook = b"PK\x03\x04\x14\x00\x06\x00";
        match decode_text(workbook) {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("CSV or TSV"), "{}", msg),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        assert!(matches!(decode_text(&[0xff, 0xfe, 0x00]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_tsv() {
        let sheet = Sheet::parse("참석자\t출석\nKim\t3\n");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1], vec![Cell::from("Kim"), Cell::from(3)]);
    }

    #[test]
    fn test_parse_csv_with_quotes_and_crlf() {
        let sheet = Sheet::parse("\u{feff}name,note\r\n\"Kim, Jr.\",\"said \"\"hi\"\"\"\r\n");
        assert_eq!(sheet.rows[0][0], Cell::from("name"));
        assert_eq!(sheet.rows[1][0], Cell::from("Kim, Jr."));
        assert_eq!(sheet.rows[1][1], Cell::from("said \"hi\""));
    }

    #[test]
    fn test_parse_keeps_blank_lines_as_rows() {
        let sheet = Sheet::parse("a,b\n\nc,d");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1], vec![Cell::Empty]);
        assert_eq!(sheet.rows[2], vec![Cell::from("c"), Cell::from("d")]);
    }

    #[test]
    fn test_to_tsv_quotes_when_needed() {
        let sheet = Sheet::new(vec![vec![Cell::from("a\tb"), Cell::from(5), Cell::Empty]]);
        assert_eq!(sheet.to_tsv(), "\"a\tb\"\t5\t\n");
    }

    #[test]
    fn test_tsv_output_parses_back() {
        let sheet = Sheet::new(vec![
            vec![Cell::from("참석자"), Cell::from("합계")],
            vec![Cell::from("Kim"), Cell::from(-3)],
        ]);
        assert_eq!(Sheet::parse(&sheet.to_tsv()), sheet);
    }
}
