use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::scoring::{self, ScoreField};

/// A tracked team member.
///
/// `total` is derived from the eight counters and is only ever written by
/// `scoring::recompute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attendance: i64,
    #[serde(default)]
    pub game_win: i64,
    #[serde(default)]
    pub round_win: i64,
    #[serde(default)]
    pub mom: i64,
    #[serde(default)]
    pub full_attendance: i64,
    #[serde(default)]
    pub extra: i64,
    #[serde(default)]
    pub late: i64,
    #[serde(default)]
    pub absence: i64,
    /// Counters for category keys that have no dedicated field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_points: BTreeMap<String, i64>,
    #[serde(default)]
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Create a member with every counter at zero
    pub fn new(id: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            attendance: 0,
            game_win: 0,
            round_win: 0,
            mom: 0,
            full_attendance: 0,
            extra: 0,
            late: 0,
            absence: 0,
            custom_points: BTreeMap::new(),
            total: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn points(&self, field: ScoreField) -> i64 {
        match field {
            ScoreField::Attendance => self.attendance,
            ScoreField::GameWin => self.game_win,
            ScoreField::RoundWin => self.round_win,
            ScoreField::Mom => self.mom,
            ScoreField::FullAttendance => self.full_attendance,
            ScoreField::Extra => self.extra,
            ScoreField::Late => self.late,
            ScoreField::Absence => self.absence,
        }
    }

    pub fn points_mut(&mut self, field: ScoreField) -> &mut i64 {
        match field {
            ScoreField::Attendance => &mut self.attendance,
            ScoreField::GameWin => &mut self.game_win,
            ScoreField::RoundWin => &mut self.round_win,
            ScoreField::Mom => &mut self.mom,
            ScoreField::FullAttendance => &mut self.full_attendance,
            ScoreField::Extra => &mut self.extra,
            ScoreField::Late => &mut self.late,
            ScoreField::Absence => &mut self.absence,
        }
    }

    /// True when any counter (including custom ones) or the total is non-zero
    pub fn has_points(&self) -> bool {
        self.total != 0
            || ScoreField::ALL.iter().any(|f| self.points(*f) != 0)
            || self.custom_points.values().any(|v| *v != 0)
    }

    /// Zero every counter. The caller is responsible for recomputing.
    pub fn clear_points(&mut self) {
        for field in ScoreField::ALL {
            *self.points_mut(field) = 0;
        }
        for value in self.custom_points.values_mut() {
            *value = 0;
        }
    }

    /// Case-insensitive substring match on the name
    pub fn matches_search(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(&term.to_lowercase())
    }

    /// Apply a partial field set. Fields left as `None` are untouched.
    ///
    /// A supplied name is trimmed and must not end up empty.
    pub fn apply_fields(&mut self, fields: &MemberFields) -> Result<()> {
        if let Some(ref name) = fields.name {
            self.name = normalize_name(name)?;
        }
        for field in ScoreField::ALL {
            if let Some(value) = fields.get(field) {
                *self.points_mut(field) = value;
            }
        }
        Ok(())
    }
}

/// Client-supplied member fields, used for create, update and bulk payloads.
///
/// Counters accept integral floats (`3.0`) as well as integers. `_id` is only
/// honored by bulk replace. Other unknown keys (`total`, timestamps echoed
/// back by a UI) are ignored, which is what keeps `total` from being set
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFields {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub attendance: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub game_win: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub round_win: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub mom: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub full_attendance: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub extra: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub late: Option<i64>,
    #[serde(
        default,
        deserialize_with = "whole_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub absence: Option<i64>,
}

/// Deserialize an optional counter, accepting `3` and `3.0` but not `2.5`
fn whole_number_opt<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    number
        .as_i64()
        .or_else(|| number.as_f64().and_then(scoring::whole_number))
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected a whole number, got {}", number)))
}

impl MemberFields {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn get(&self, field: ScoreField) -> Option<i64> {
        match field {
            ScoreField::Attendance => self.attendance,
            ScoreField::GameWin => self.game_win,
            ScoreField::RoundWin => self.round_win,
            ScoreField::Mom => self.mom,
            ScoreField::FullAttendance => self.full_attendance,
            ScoreField::Extra => self.extra,
            ScoreField::Late => self.late,
            ScoreField::Absence => self.absence,
        }
    }

    pub fn set(&mut self, field: ScoreField, value: i64) {
        let slot = match field {
            ScoreField::Attendance => &mut self.attendance,
            ScoreField::GameWin => &mut self.game_win,
            ScoreField::RoundWin => &mut self.round_win,
            ScoreField::Mom => &mut self.mom,
            ScoreField::FullAttendance => &mut self.full_attendance,
            ScoreField::Extra => &mut self.extra,
            ScoreField::Late => &mut self.late,
            ScoreField::Absence => &mut self.absence,
        };
        *slot = Some(value);
    }

    pub fn with(mut self, field: ScoreField, value: i64) -> Self {
        self.set(field, value);
        self
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("Name is required"));
    }
    Ok(trimmed.to_string())
}
