/// One of the eight point counters every member carries.
///
/// The first six add to the total, `Late` and `Absence` subtract from it.
/// Stored values are non-negative magnitudes either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreField {
    Attendance,
    GameWin,
    RoundWin,
    Mom,
    FullAttendance,
    Extra,
    Late,
    Absence,
}

impl ScoreField {
    /// All fields in column order (the order used by sheets and tables).
    pub const ALL: [ScoreField; 8] = [
        ScoreField::Attendance,
        ScoreField::GameWin,
        ScoreField::RoundWin,
        ScoreField::Mom,
        ScoreField::FullAttendance,
        ScoreField::Extra,
        ScoreField::Late,
        ScoreField::Absence,
    ];

    /// The category key matching this field (also its JSON name)
    pub fn key(self) -> &'static str {
        match self {
            ScoreField::Attendance => "attendance",
            ScoreField::GameWin => "gameWin",
            ScoreField::RoundWin => "roundWin",
            ScoreField::Mom => "mom",
            ScoreField::FullAttendance => "fullAttendance",
            ScoreField::Extra => "extra",
            ScoreField::Late => "late",
            ScoreField::Absence => "absence",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Whether the field counts against the total
    pub fn is_subtractive(self) -> bool {
        matches!(self, ScoreField::Late | ScoreField::Absence)
    }

    /// Short column label for terminal tables
    pub fn short_label(self) -> &'static str {
        match self {
            ScoreField::Attendance => "ATT",
            ScoreField::GameWin => "GW",
            ScoreField::RoundWin => "RW",
            ScoreField::Mom => "MOM",
            ScoreField::FullAttendance => "FULL",
            ScoreField::Extra => "EXT",
            ScoreField::Late => "LATE",
            ScoreField::Absence => "ABS",
        }
    }
}

/// A category key as addressed by an adjustment request.
///
/// Keys are matched by string against the member's fields. Anything that is
/// not one of the eight well-known fields or the `total` pseudo-field lands in
/// `Custom` and is tracked in the member's custom counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKey {
    Field(ScoreField),
    Total,
    Custom(String),
}

impl CategoryKey {
    pub const TOTAL: &'static str = "total";

    pub fn parse(key: &str) -> Self {
        if key == Self::TOTAL {
            return CategoryKey::Total;
        }
        match ScoreField::from_key(key) {
            Some(field) => CategoryKey::Field(field),
            None => CategoryKey::Custom(key.to_string()),
        }
    }
}
