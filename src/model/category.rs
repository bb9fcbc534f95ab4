use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_step() -> i64 {
    1
}

/// A named scoring rule.
///
/// `increment`/`decrement` are the step sizes a client applies on "+"/"-".
/// `is_negative` is informational: the sign of a category's contribution is
/// fixed by the total formula, not by this flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub key: String,
    pub label: String,
    #[serde(default = "default_step")]
    pub increment: i64,
    #[serde(default = "default_step")]
    pub decrement: i64,
    #[serde(default)]
    pub is_negative: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial category update. `key` is immutable and therefore absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decrement: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_negative: Option<bool>,
}

impl Category {
    /// Apply a patch after validating it. Nothing changes on error.
    pub fn apply_patch(&mut self, patch: &CategoryPatch) -> Result<()> {
        for (name, step) in [("increment", patch.increment), ("decrement", patch.decrement)] {
            if let Some(value) = step {
                if value <= 0 {
                    return Err(Error::invalid(format!("{} must be a positive integer", name)));
                }
            }
        }

        if let Some(ref label) = patch.label {
            self.label = label.clone();
        }
        if let Some(increment) = patch.increment {
            self.increment = increment;
        }
        if let Some(decrement) = patch.decrement {
            self.decrement = decrement;
        }
        if let Some(is_negative) = patch.is_negative {
            self.is_negative = is_negative;
        }
        Ok(())
    }
}

/// Direction of a one-step adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Up,
    Down,
}

/// Signed delta for one step of category `key`: `+increment` going up,
/// `-decrement` going down. Keys without a category step by 1.
pub fn step_delta(categories: &[Category], key: &str, step: Step) -> i64 {
    let category = categories.iter().find(|c| c.key == key);
    match step {
        Step::Up => category.map_or(1, |c| c.increment),
        Step::Down => -category.map_or(1, |c| c.decrement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_category() -> Category {
        let now = Utc::now();
        Category {
            id: "c1".to_string(),
            key: "late".to_string(),
            label: "Late".to_string(),
            increment: 3,
            decrement: 3,
            is_negative: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_patch_updates_only_given_fields() {
        let mut category = sample_category();
        category
            .apply_patch(&CategoryPatch {
                increment: Some(5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(category.increment, 5);
        assert_eq!(category.decrement, 3);
        assert_eq!(category.label, "Late");
        assert!(category.is_negative);
    }

    #[test]
    fn test_patch_rejects_non_positive_steps() {
        let mut category = sample_category();
        let result = category.apply_patch(&CategoryPatch {
            label: Some("changed".to_string()),
            decrement: Some(0),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(category.label, "Late");
    }

    #[test]
    fn test_patch_ignores_key_and_id_in_body() {
        let patch: CategoryPatch =
            serde_json::from_str(r#"{"_id":"other","key":"renamed","label":"지각"}"#).unwrap();
        let mut category = sample_category();
        category.apply_patch(&patch).unwrap();
        assert_eq!(category.key, "late");
        assert_eq!(category.id, "c1");
        assert_eq!(category.label, "지각");
    }

    #[test]
    fn test_step_delta_uses_category_steps() {
        let mut late = sample_category();
        late.decrement = 2;
        let categories = vec![late];

        assert_eq!(step_delta(&categories, "late", Step::Up), 3);
        assert_eq!(step_delta(&categories, "late", Step::Down), -2);
        assert_eq!(step_delta(&categories, "assists", Step::Up), 1);
        assert_eq!(step_delta(&categories, "assists", Step::Down), -1);
        assert_eq!(step_delta(&[], "mom", Step::Down), -1);
    }

    #[test]
    fn test_steps_default_to_one() {
        let category: Category = serde_json::from_str(
            r#"{"_id":"c","key":"extra","label":"Extra","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(category.increment, 1);
        assert_eq!(category.decrement, 1);
        assert!(!category.is_negative);
    }
}
