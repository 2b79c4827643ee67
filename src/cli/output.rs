//! Operator-facing text for the `check`, `ledger` and `strategies` commands.
//!
//! Everything here writes to stdout except failures, which go to stderr
//! so `agora ledger balance > report.txt` still surfaces them. Rendering
//! is split from printing so the formats are testable.

use std::fmt::Display;
use std::io::{self, Write};

use rust_decimal::Decimal;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Width of the rule under a section title.
const RULE_WIDTH: usize = 56;

/// Column the value starts at in a `key_value` line.
const LABEL_WIDTH: usize = 14;

/// Outcome glyph at the start of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Ok,
    Warn,
    Fail,
}

impl Mark {
    const fn glyph(self) -> char {
        match self {
            Self::Ok => '✓',
            Self::Warn => '⚠',
            Self::Fail => '✗',
        }
    }
}

fn status_line(mark: Mark, message: &str) -> String {
    format!("{} {message}", mark.glyph())
}

fn heading(title: &str) -> String {
    format!("\n{title}\n{}", "─".repeat(RULE_WIDTH))
}

fn pair(label: &str, value: impl Display) -> String {
    format!("{label:<LABEL_WIDTH$} {value}")
}

/// A ledger amount with an explicit sign, so income and spend read apart
/// in a column. Zero is unsigned.
#[must_use]
pub fn signed(amount: Decimal) -> String {
    let amount = amount.normalize();
    if amount > Decimal::ZERO {
        format!("+{amount}")
    } else {
        amount.to_string()
    }
}

/// Print a section title and rule.
pub fn section(title: &str) {
    println!("{}", heading(title));
}

/// Print an aligned `label value` line.
pub fn key_value(label: &str, value: impl Display) {
    println!("{}", pair(label, value));
}

pub fn ok(message: &str) {
    println!("{}", status_line(Mark::Ok, message));
}

pub fn warn(message: &str) {
    println!("{}", status_line(Mark::Warn, message));
}

pub fn error(message: &str) {
    eprintln!("{}", status_line(Mark::Fail, message));
}

pub fn note(message: &str) {
    println!("{message}");
}

/// Start a `label... ` line that `progress_done` completes, for a source
/// fetch that may take a while.
pub fn progress(label: &str) {
    print!("{label}... ");
    let _ = io::stdout().flush();
}

pub fn progress_done(success: bool) {
    println!("{}", if success { "ok" } else { "failed" });
}

fn render_table<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::psql());
    table
        .to_string()
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print rows as an indented table.
pub fn table<T: Tabled>(rows: impl IntoIterator<Item = T>) {
    println!("{}", render_table(rows));
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[derive(Tabled)]
    struct Row {
        strategy: &'static str,
        amount: String,
    }

    #[test]
    fn values_line_up_after_the_label() {
        assert_eq!(pair("Balance", dec!(30)), "Balance        30");
        assert_eq!(pair("Net P&L", "+2.5"), "Net P&L        +2.5");
    }

    #[test]
    fn amounts_carry_their_sign() {
        assert_eq!(signed(dec!(2.50)), "+2.5");
        assert_eq!(signed(dec!(-0.25)), "-0.25");
        assert_eq!(signed(Decimal::ZERO), "0");
    }

    #[test]
    fn status_lines_lead_with_their_mark() {
        assert_eq!(status_line(Mark::Ok, "done"), "✓ done");
        assert!(status_line(Mark::Fail, "boom").starts_with('✗'));
    }

    #[test]
    fn tables_are_indented_under_their_section() {
        let rendered = render_table([Row {
            strategy: "trade",
            amount: signed(dec!(4)),
        }]);
        assert!(rendered.lines().all(|line| line.starts_with("  ")));
        assert!(rendered.contains("trade"));
        assert!(rendered.contains("+4"));
        assert!(heading("Treasury").ends_with(&"─".repeat(RULE_WIDTH)));
    }
}
