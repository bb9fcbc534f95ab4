use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::model::{Category, Member};
use crate::scoring::{breakdown, ScoreField};

/// Format a total with an explicit sign ("+12", "-7", "0")
pub fn format_total(total: i64) -> String {
    if total > 0 {
        format!("+{}", total)
    } else {
        total.to_string()
    }
}

/// Non-zero counters in column order, e.g. "ATT 3 MOM 1 LATE 2"
pub fn format_field_counts(member: &Member) -> String {
    ScoreField::ALL
        .into_iter()
        .filter(|field| member.points(*field) != 0)
        .map(|field| format!("{} {}", field.short_label(), member.points(field)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format members as a standings table: Rank, Total, Name, Counts, Id
/// No headers. Members are shown in the order given (the server sorts them).
pub fn format_standings(members: &[Member], use_colors: bool) -> String {
    format_standings_with_width(members, use_colors, get_terminal_width())
}

fn format_standings_with_width(
    members: &[Member],
    use_colors: bool,
    term_width: Option<usize>,
) -> String {
    if members.is_empty() {
        return "No members yet.".to_string();
    }

    // Rank column: 3 chars ("99."), total column: 6 chars ("+1234")
    let rank_width = 3;
    let total_width = 6;
    let separator = "  ";

    members
        .iter()
        .enumerate()
        .map(|(idx, member)| {
            let rank_str = format!("{:>2}.", idx + 1);
            let total_str = format!("{:>width$}", format_total(member.total), width = total_width);
            let counts = format_field_counts(member);

            let fixed_width = rank_width + 1 + total_width + separator.len() * 3 + member.id.len();
            let (name, counts) = match term_width {
                Some(width) if width > fixed_width + counts.len() + 10 => (
                    truncate_name(&member.name, width - fixed_width - counts.len()),
                    counts,
                ),
                // Narrow terminal: drop the counts before squeezing the name
                Some(width) if width > fixed_width + 10 => {
                    (truncate_name(&member.name, width - fixed_width), String::new())
                }
                Some(_) => (truncate_name(&member.name, 20), String::new()),
                None => (member.name.clone(), counts),
            };

            if use_colors {
                let total_colored = if member.total < 0 {
                    total_str.red().bold().to_string()
                } else {
                    total_str.green().bold().to_string()
                };
                format!(
                    "{} {}{}{}{}{}{}{}",
                    rank_str.dimmed(),
                    total_colored,
                    separator,
                    name.bold(),
                    separator,
                    counts.cyan(),
                    separator,
                    member.id.dimmed()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    rank_str, total_str, separator, name, separator, counts, separator, member.id
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a single member with a per-category breakdown (for verbose mode)
pub fn format_member_detail(member: &Member, use_colors: bool) -> String {
    let score = breakdown(member);
    let mut lines = Vec::new();

    if use_colors {
        lines.push(format!("{}  {}", member.name.bold(), member.id.dimmed()));
    } else {
        lines.push(format!("{}  {}", member.name, member.id));
    }

    for item in &score.contributions {
        let line = format!(
            "  {:<16}{:>5}  ({})",
            item.field.key(),
            item.count,
            format_total(item.contribution)
        );
        if use_colors && item.contribution < 0 {
            lines.push(line.red().to_string());
        } else {
            lines.push(line);
        }
    }

    for (key, value) in &member.custom_points {
        lines.push(format!("  {:<16}{:>5}  (not scored)", key, value));
    }

    let total_line = format!("  {:<16}{:>5}", "total", format_total(score.total));
    if use_colors {
        lines.push(total_line.bold().to_string());
    } else {
        lines.push(total_line);
    }

    lines.join("\n")
}

/// Format categories as one line per category: key, label, steps
pub fn format_categories(categories: &[Category], use_colors: bool) -> String {
    if categories.is_empty() {
        return "No categories configured.".to_string();
    }

    categories
        .iter()
        .map(|category| {
            let steps = format!("+{}/-{}", category.increment, category.decrement);
            let marker = if category.is_negative { "  penalty" } else { "" };
            if use_colors {
                format!(
                    "{:<16}{:>8}  {}{}",
                    category.key.cyan(),
                    steps,
                    category.label,
                    marker.red()
                )
            } else {
                format!("{:<16}{:>8}  {}{}", category.key, steps, category.label, marker)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}
