use super::{Cell, Sheet};
use crate::error::{Error, Result};
use crate::model::MemberFields;
use crate::scoring::{self, ScoreField};

/// First-column label that marks the header row ("attendee")
pub const HEADER_MARKER: &str = "참석자";

/// Map a sheet to member records.
///
/// Rows after the first row whose first cell is [`HEADER_MARKER`] are data
/// rows when their first cell is non-empty. Columns are fixed: name, then the
/// eight counters in [`ScoreField::ALL`] order. Penalty columns are stored as
/// absolute values because sheets usually show them negated.
pub fn members_from_sheet(sheet: &Sheet) -> Result<Vec<MemberFields>> {
    let header_index = sheet
        .rows
        .iter()
        .position(|row| matches!(row.first(), Some(Cell::Text(t)) if t == HEADER_MARKER))
        .ok_or_else(|| {
            Error::invalid(format!(
                "Header row not found. Make sure a row starts with '{}'",
                HEADER_MARKER
            ))
        })?;

    sheet.rows[header_index + 1..]
        .iter()
        .enumerate()
        .filter(|(_, row)| row.first().is_some_and(|cell| !cell.is_empty()))
        .map(|(offset, row)| {
            let line = header_index + offset + 2;
            row_to_fields(row, line)
        })
        .collect()
}

fn row_to_fields(row: &[Cell], line: usize) -> Result<MemberFields> {
    let name = row.first().map(|cell| cell.text().to_string()).unwrap_or_default();
    let mut fields = MemberFields::named(name);

    for (column, field) in ScoreField::ALL.into_iter().enumerate() {
        let cell = row.get(column + 1).unwrap_or(&Cell::Empty);
        let value = cell_to_int(cell).ok_or_else(|| {
            Error::invalid(format!(
                "Row {}: {} must be a whole number, got '{}'",
                line,
                field.key(),
                cell
            ))
        })?;
        let value = if field.is_subtractive() {
            value.saturating_abs()
        } else {
            value
        };
        fields.set(field, value);
    }

    Ok(fields)
}

fn cell_to_int(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Empty => Some(0),
        Cell::Number { value, .. } => scoring::whole_number(*value),
        Cell::Text(_) => None,
    }
}
