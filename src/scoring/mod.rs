pub mod config;
pub mod engine;
pub mod field;

pub use config::{CategoryRule, DEFAULT_RULES};
pub use engine::{
    adjust_category, breakdown, calculate_total, recompute, validate_delta, whole_number,
    FieldContribution, ScoreBreakdown,
};
pub use field::{CategoryKey, ScoreField};
