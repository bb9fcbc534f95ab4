use chrono::NaiveDate;

use super::{Cell, Sheet, HEADER_MARKER};
use crate::model::Member;
use crate::scoring::ScoreField;

/// Header row of exported sheets, matching the labels shown in the UI
pub const EXPORT_HEADERS: [&str; 11] = [
    HEADER_MARKER,
    "출석(+3)",
    "경기승리수당 (+3)",
    "라운드 최종 승리수당(+5)",
    "MOM(+2)",
    "만근(+5)",
    "추가항목",
    "지각(-3)",
    "무단결석(-10)",
    "합계",
    "순위",
];

/// Default file name for an export made on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("축구팀_포인트_{}.tsv", date.format("%Y-%m-%d"))
}

/// Build a sheet with one row per member, in the order given.
///
/// Penalty columns are shown as negative contributions and the last column
/// is the 1-based position in `members`.
pub fn sheet_from_members(members: &[Member]) -> Sheet {
    let mut rows = Vec::with_capacity(members.len() + 1);
    rows.push(EXPORT_HEADERS.iter().map(|h| Cell::from(*h)).collect());

    for (index, member) in members.iter().enumerate() {
        let mut row = Vec::with_capacity(EXPORT_HEADERS.len());
        row.push(Cell::from(member.name.as_str()));
        for field in ScoreField::ALL {
            let value = member.points(field);
            let shown = if field.is_subtractive() {
                value.saturating_neg()
            } else {
                value
            };
            row.push(Cell::from(shown));
        }
        row.push(Cell::from(member.total));
        row.push(Cell::from(index as i64 + 1));
        rows.push(row);
    }

    Sheet::new(rows)
}
