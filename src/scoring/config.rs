use super::field::ScoreField;

/// A built-in scoring rule inserted when the category store starts out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub field: ScoreField,
    pub label: &'static str,
    /// Used for both increment and decrement
    pub step: i64,
    pub is_negative: bool,
}

/// The eight rules a fresh installation starts with, in display order.
pub const DEFAULT_RULES: [CategoryRule; 8] = [
    CategoryRule {
        field: ScoreField::Attendance,
        label: "출석(+3)",
        step: 3,
        is_negative: false,
    },
    CategoryRule {
        field: ScoreField::GameWin,
        label: "경기승리수당 (+3)",
        step: 3,
        is_negative: false,
    },
    CategoryRule {
        field: ScoreField::RoundWin,
        label: "라운드 최종 승리수당(+5)",
        step: 5,
        is_negative: false,
    },
    CategoryRule {
        field: ScoreField::Mom,
        label: "MOM(+2)",
        step: 2,
        is_negative: false,
    },
    CategoryRule {
        field: ScoreField::FullAttendance,
        label: "만근(+5)",
        step: 5,
        is_negative: false,
    },
    CategoryRule {
        field: ScoreField::Extra,
        label: "추가항목",
        step: 1,
        is_negative: false,
    },
    CategoryRule {
        field: ScoreField::Late,
        label: "지각(-3)",
        step: 3,
        is_negative: true,
    },
    CategoryRule {
        field: ScoreField::Absence,
        label: "무단결석(-10)",
        step: 10,
        is_negative: true,
    },
];

impl CategoryRule {
    pub fn key(&self) -> &'static str {
        self.field.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_cover_every_field_once() {
        let fields: Vec<_> = DEFAULT_RULES.iter().map(|r| r.field).collect();
        assert_eq!(fields, ScoreField::ALL.to_vec());
    }

    #[test]
    fn test_only_penalties_flagged_negative() {
        for rule in DEFAULT_RULES {
            assert_eq!(rule.is_negative, rule.field.is_subtractive(), "{}", rule.key());
            assert!(rule.step > 0);
        }
    }

    #[test]
    fn test_default_steps() {
        let steps: Vec<_> = DEFAULT_RULES.iter().map(|r| (r.key(), r.step)).collect();
        assert_eq!(
            steps,
            vec![
                ("attendance", 3),
                ("gameWin", 3),
                ("roundWin", 5),
                ("mom", 2),
                ("fullAttendance", 5),
                ("extra", 1),
                ("late", 3),
                ("absence", 10),
            ]
        );
    }
}
