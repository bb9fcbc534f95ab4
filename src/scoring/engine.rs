use super::field::{CategoryKey, ScoreField};
use crate::error::{Error, Result};
use crate::model::Member;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContribution {
    pub field: ScoreField,
    pub count: i64,        // Stored magnitude
    pub contribution: i64, // Signed effect on the total
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub contributions: Vec<FieldContribution>,
    pub total: i64,
}

/// Net score of a member:
/// `attendance + gameWin + roundWin + mom + fullAttendance + extra - late - absence`.
///
/// Custom counters never contribute.
pub fn calculate_total(member: &Member) -> i64 {
    ScoreField::ALL.into_iter().fold(0i64, |total, field| {
        let value = member.points(field);
        if field.is_subtractive() {
            total.saturating_sub(value)
        } else {
            total.saturating_add(value)
        }
    })
}

/// Per-field view of how the total is made up
pub fn breakdown(member: &Member) -> ScoreBreakdown {
    let contributions = ScoreField::ALL
        .into_iter()
        .map(|field| {
            let count = member.points(field);
            let contribution = if field.is_subtractive() {
                count.saturating_neg()
            } else {
                count
            };
            FieldContribution {
                field,
                count,
                contribution,
            }
        })
        .collect();

    ScoreBreakdown {
        contributions,
        total: calculate_total(member),
    }
}

/// Set `total` from the counters. Every write path goes through here.
pub fn recompute(mut member: Member) -> Member {
    member.total = calculate_total(&member);
    member
}

/// Integral value of `n`, so `3.0` counts as `3`. Fractions and values out
/// of `i64` range have none.
pub fn whole_number(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Reject a missing adjustment amount
pub fn validate_delta(delta: i64) -> Result<()> {
    if delta == 0 {
        return Err(Error::invalid("Value is required"));
    }
    Ok(())
}

/// Add `delta` to one category and recompute the total.
///
/// Stored counters are floored at zero, so penalties are recorded as positive
/// magnitudes and only turn negative inside the total formula. A decrement
/// below zero is therefore not reversible by the matching increment.
///
/// Unknown keys become custom counters starting at zero. Adjusting `total`
/// itself has no lasting effect because the recompute overwrites it.
pub fn adjust_category(member: Member, key: &CategoryKey, delta: i64) -> Result<Member> {
    validate_delta(delta)?;
    let mut member = member;

    match key {
        CategoryKey::Field(field) => {
            let slot = member.points_mut(*field);
            *slot = slot.saturating_add(delta).max(0);
        }
        CategoryKey::Custom(name) => {
            let slot = member.custom_points.entry(name.clone()).or_insert(0);
            *slot = slot.saturating_add(delta).max(0);
        }
        CategoryKey::Total => {
            member.total = member.total.saturating_add(delta);
        }
    }

    Ok(recompute(member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_member() -> Member {
        let mut member = Member::new("m1".to_string(), "Kim".to_string(), Utc::now());
        member.attendance = 9;
        member.game_win = 3;
        member.round_win = 5;
        member.mom = 2;
        member.full_attendance = 5;
        member.extra = 1;
        member.late = 3;
        member.absence = 10;
        member
    }

    #[test]
    fn test_total_formula() {
        let member = sample_member();
        assert_eq!(calculate_total(&member), 9 + 3 + 5 + 2 + 5 + 1 - 3 - 10);
    }

    #[test]
    fn test_recompute_overwrites_stale_total() {
        let mut member = sample_member();
        member.total = 1000;
        let member = recompute(member);
        assert_eq!(member.total, 12);
    }

    #[test]
    fn test_total_can_go_negative() {
        let mut member = Member::new("m".to_string(), "A".to_string(), Utc::now());
        member.absence = 10;
        assert_eq!(recompute(member).total, -10);
    }

    #[test]
    fn test_custom_points_do_not_count() {
        let mut member = sample_member();
        member.custom_points.insert("cleanSheet".to_string(), 50);
        assert_eq!(calculate_total(&member), 12);
    }

    #[test]
    fn test_adjust_adds_and_recomputes() {
        let member = sample_member();
        let key = CategoryKey::parse("attendance");
        let member = adjust_category(member, &key, 3).unwrap();
        assert_eq!(member.attendance, 12);
        assert_eq!(member.total, 15);
    }

    #[test]
    fn test_adjust_penalty_lowers_total() {
        let member = sample_member();
        let member = adjust_category(member, &CategoryKey::parse("late"), 3).unwrap();
        assert_eq!(member.late, 6);
        assert_eq!(member.total, 9);
    }

    #[test]
    fn test_adjust_floors_at_zero() {
        let member = sample_member();
        let member = adjust_category(member, &CategoryKey::parse("mom"), -5).unwrap();
        assert_eq!(member.mom, 0);
        assert_eq!(member.total, 10);
    }

    #[test]
    fn test_round_trip_invertible_when_count_high_enough() {
        let member = sample_member(); // late = 3
        let key = CategoryKey::parse("late");
        let member = adjust_category(member, &key, 3).unwrap();
        let member = adjust_category(member, &key, -3).unwrap();
        assert_eq!(member.late, 3);
    }

    #[test]
    fn test_round_trip_not_invertible_below_step() {
        let mut member = sample_member();
        member.late = 1;
        let key = CategoryKey::parse("late");
        // Decrement first: 1 - 3 floors at 0, so +3 lands on 3, not 1
        let member = adjust_category(member, &key, -3).unwrap();
        assert_eq!(member.late, 0);
        let member = adjust_category(member, &key, 3).unwrap();
        assert_eq!(member.late, 3);
    }

    #[test]
    fn test_whole_number() {
        assert_eq!(whole_number(3.0), Some(3));
        assert_eq!(whole_number(-10.0), Some(-10));
        assert_eq!(whole_number(2.5), None);
        assert_eq!(whole_number(f64::NAN), None);
        assert_eq!(whole_number(1e300), None);
    }

    #[test]
    fn test_zero_delta_rejected() {
        let result = adjust_category(sample_member(), &CategoryKey::parse("mom"), 0);
        match result {
            Err(Error::InvalidInput(msg)) => assert_eq!(msg, "Value is required"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_category_starts_at_zero() {
        let member = sample_member();
        let key = CategoryKey::parse("cleanSheet");
        let member = adjust_category(member, &key, 2).unwrap();
        assert_eq!(member.custom_points["cleanSheet"], 2);
        assert_eq!(member.total, 12);

        let member = adjust_category(member, &key, -7).unwrap();
        assert_eq!(member.custom_points["cleanSheet"], 0);
    }

    #[test]
    fn test_adjusting_total_is_overwritten() {
        let member = sample_member();
        let member = adjust_category(member, &CategoryKey::Total, 100).unwrap();
        assert_eq!(member.total, 12);
    }

    #[test]
    fn test_adjust_saturates_instead_of_overflowing() {
        let mut member = sample_member();
        member.extra = i64::MAX;
        let member = adjust_category(member, &CategoryKey::parse("extra"), 1).unwrap();
        assert_eq!(member.extra, i64::MAX);
    }

    #[test]
    fn test_breakdown_signs() {
        let result = breakdown(&sample_member());
        assert_eq!(result.total, 12);
        let late = result
            .contributions
            .iter()
            .find(|c| c.field == ScoreField::Late)
            .unwrap();
        assert_eq!(late.count, 3);
        assert_eq!(late.contribution, -3);
        let sum: i64 = result.contributions.iter().map(|c| c.contribution).sum();
        assert_eq!(sum, result.total);
    }
}
