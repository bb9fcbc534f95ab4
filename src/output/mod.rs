pub mod formatter;

pub use formatter::{
    format_categories, format_field_counts, format_member_detail, format_standings, format_total,
    should_use_colors,
};
