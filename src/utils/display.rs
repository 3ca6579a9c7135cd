// utils/display.rs

//! # Display Utility Module
//!
//! This module provides utility functions for rendering messages with various styles
//! including Unicode-styled message boxes, color-coded output and the change set table.
//! It leverages the `colored` crate for styling, `unicode_width` for the message box
//! and `tabled` for the change set table.
//!
//! ## Example Usage
//! ```rust
//! use crate::utils::display::print_unicode_box;
//!
//! print_unicode_box("🚀 Deploying stack: [web-prod]");
//! print_error!("Stack web-prod creation FAILED! (ROLLBACK_COMPLETE)");
//! print_success!("Stack web-prod created.");
//! print_info!("Creating stack ...");
//! ```

use tabled::{settings::Style, Table, Tabled};
use unicode_width::UnicodeWidthStr;

use crate::core::changeset::ChangeSetDescriptor;

/// Utility function to print a Unicode-styled message box
/// that correctly handles the width of emojis and other wide characters
pub fn print_unicode_box(message: &str) {
    let border_color = "\x1b[93m"; // Yellow
    let reset_color = "\x1b[0m";
    let lines: Vec<&str> = message.split('\n').collect();

    // Calculate width using unicode_width to properly account for emojis
    let max_length = lines
        .iter()
        .map(|line| UnicodeWidthStr::width(*line))
        .max()
        .unwrap_or(0);

    let top_border = format!(
        "{}┌{}┐{}",
        border_color,
        "─".repeat(max_length + 2),
        reset_color
    );
    let bottom_border = format!(
        "{}└{}┘{}",
        border_color,
        "─".repeat(max_length + 2),
        reset_color
    );

    println!("{}", top_border);
    for line in lines {
        // Calculate proper padding based on the visual width
        let padding = max_length - UnicodeWidthStr::width(line);
        let padded_line = format!("│ {}{} │", line, " ".repeat(padding));
        println!("{}{}{}", border_color, padded_line, reset_color);
    }
    println!("{}", bottom_border);
}

#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        println!("{}", format!($($arg)*).blue())
    }};
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        println!("{}", format!($($arg)*).yellow())
    }};
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{}", format!($($arg)*).red())
    }};
}

#[macro_export]
macro_rules! print_success {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        println!("{}", format!($($arg)*).green())
    }};
}

// ============================
// Change Set Table
// ============================

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Logical ID")]
    logical_id: String,
    #[tabled(rename = "Physical ID")]
    physical_id: String,
    #[tabled(rename = "Resource type")]
    resource_type: String,
    #[tabled(rename = "Replacement")]
    replacement: String,
}

/// Renders the resource changes as an aligned table, one row per change.
pub fn render_change_set_table(descriptor: &ChangeSetDescriptor) -> String {
    let rows: Vec<ChangeRow> = descriptor
        .changes
        .iter()
        .map(|change| ChangeRow {
            action: change.action.to_string(),
            logical_id: change.logical_id.clone(),
            physical_id: change.physical_id.clone(),
            resource_type: change.resource_type.clone(),
            replacement: change.replacement.to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Prints the change set summary followed by its table.
pub fn print_change_set(descriptor: &ChangeSetDescriptor) {
    let created = descriptor
        .creation_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "Change set {} for stack {} ({}, {} changes, created {})",
        descriptor.change_set_name,
        descriptor.stack_name,
        descriptor.execution_status,
        descriptor.changes.len(),
        created
    );
    if let Some(reason) = descriptor.status_reason.as_deref().filter(|r| !r.is_empty()) {
        println!("Reason: {}", reason);
    }
    println!();
    println!("{}", render_change_set_table(descriptor));
}
