//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use std::io::Write;

use colored::{ColoredString, Colorize};

use crate::domain::NodeReport;
use crate::infrastructure::{InfraError, InfraResult};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Write a block of text to stdout, surfacing broken pipes as errors.
pub fn block(text: &str) -> InfraResult<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| InfraError::io("write to stdout", e))
}

/// Variance with sign coloring: green above baseline, red below.
pub fn variance(value: f64, precision: usize) -> ColoredString {
    let text = format!("{:+.p$}%", value, p = precision);
    if value > 0.0 {
        text.green()
    } else if value < 0.0 {
        text.red()
    } else {
        text.normal()
    }
}

/// One report line, indented by depth.
pub fn report_row(row: &NodeReport, precision: usize) -> String {
    let name = format!("{}{}", "  ".repeat(row.depth), row.label);
    format!(
        "{:<28} {:>14.p$} {:>14.p$} {:>10}",
        name,
        row.value,
        row.original_value,
        variance(row.variance, precision),
        p = precision
    )
}

/// Report column headings matching `report_row`.
pub fn report_heading() -> String {
    format!(
        "{:<28} {:>14} {:>14} {:>10}",
        "Label", "Value", "Baseline", "Variance"
    )
}
