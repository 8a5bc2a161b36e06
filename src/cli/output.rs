use console::style;
use std::fmt::Display;

/// Centralized output formatting utilities for consistent CLI presentation
pub struct Output;

impl Output {
    /// Print a success message with checkmark
    pub fn success<T: Display>(message: T) {
        println!("{} {}", style("✓").green(), message);
    }

    /// Print an error message with X mark (stderr, so rebase plan editors
    /// and scripted callers keep stdout clean)
    pub fn error<T: Display>(message: T) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    /// Print a warning message
    pub fn warning<T: Display>(message: T) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    /// Print an info message
    pub fn info<T: Display>(message: T) {
        println!("{} {}", style("ℹ").cyan(), message);
    }

    /// Print a sub-item with arrow prefix
    pub fn sub_item<T: Display>(message: T) {
        println!("  {} {}", style("→").dim(), message);
    }

    /// Print a section header
    pub fn section<T: Display>(title: T) {
        println!("\n{}", style(title).bold().underlined());
    }

    /// Print a tip/suggestion
    pub fn tip<T: Display>(message: T) {
        println!("{} {}", style("TIP:").cyan(), style(message).dim());
    }
}
