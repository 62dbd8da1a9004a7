//! Terminal output for shared-storages
//!
//! Documents (templates, JSON summaries, listings) go to stdout. Diagnostics go
//! to stderr: colored labels in human mode, one JSON object per line in JSON
//! mode.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::json;
use shared_storages::review::{Finding, Severity};

/// Kind of diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Error,
    Warning,
    Hint,
    Success,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Error => "ERROR:",
            Status::Warning => "WARNING:",
            Status::Hint => "HINT:",
            Status::Success => "OK:",
            Status::Info => "INFO:",
        }
    }

    fn paint(self) -> ColoredString {
        match self {
            Status::Error => self.label().red().bold(),
            Status::Warning => self.label().yellow().bold(),
            Status::Hint => self.label().cyan().bold(),
            Status::Success => "✓".green().bold(),
            Status::Info => self.label().blue(),
        }
    }

    /// Emitted as a JSON line in JSON mode; the rest stay silent there
    fn json_type(self) -> Option<&'static str> {
        match self {
            Status::Error => Some("error"),
            Status::Warning => Some("warning"),
            _ => None,
        }
    }
}

fn paint_severity(severity: Severity) -> ColoredString {
    let label = format!("[{}]", severity);
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.bright_red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.green(),
        Severity::Info => label.cyan(),
    }
}

/// Writes command output in the selected mode
pub struct OutputFormatter {
    use_color: bool,
    json_mode: bool,
    verbosity: u8,
}

impl OutputFormatter {
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        let use_color = use_color && std::env::var_os("NO_COLOR").is_none();
        colored::control::set_override(use_color);

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Underlined heading; human mode only
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }
        let rule = "-".repeat(title.chars().count());
        if self.use_color {
            println!("\n{}\n{}", title.cyan().bold(), rule.cyan());
        } else {
            println!("\n{}\n{}", title, rule);
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if self.json_mode {
            return;
        }
        let key = if self.use_color {
            key.bright_black().to_string()
        } else {
            key.to_string()
        };
        println!("  {:<20} {}", key, value);
    }

    pub fn line(&self, text: &str) {
        if !self.json_mode {
            println!("{}", text);
        }
    }

    /// Pretty JSON document on stdout, in either mode
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Review findings on stderr
    pub fn findings(&self, findings: &[Finding]) {
        for finding in findings {
            if self.json_mode {
                eprintln!("{}", json!({ "type": "finding", "finding": finding }));
            } else if self.use_color {
                eprintln!(
                    "{} {} {}: {}",
                    paint_severity(finding.severity),
                    finding.rule_id,
                    finding.logical_id,
                    finding.message
                );
            } else {
                eprintln!(
                    "[{}] {} {}: {}",
                    finding.severity, finding.rule_id, finding.logical_id, finding.message
                );
            }
        }
    }

    pub fn error(&self, message: &str) {
        self.status(Status::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.status(Status::Warning, message);
    }

    pub fn hint(&self, message: &str) {
        self.status(Status::Hint, message);
    }

    pub fn success(&self, message: &str) {
        self.status(Status::Success, message);
    }

    /// Shown with `-v` and above
    pub fn info(&self, message: &str) {
        if self.verbosity >= 1 {
            self.status(Status::Info, message);
        }
    }

    fn status(&self, status: Status, message: &str) {
        if self.json_mode {
            if let Some(kind) = status.json_type() {
                eprintln!("{}", json!({ "type": kind, "message": message }));
            }
        } else if self.use_color {
            eprintln!("{} {}", status.paint(), message);
        } else {
            eprintln!("{} {}", status.label(), message);
        }
    }
}
