//! Operator-facing progress reporting

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Severity of a reported message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Progress information
    Info,
    /// A step was skipped and replaced with manual instructions
    Advisory,
    /// The run is about to abort
    Fatal,
}

pub trait Reporter: Send + Sync {
    fn report(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.report(Severity::Info, message);
    }

    fn advisory(&self, message: &str) {
        self.report(Severity::Advisory, message);
    }

    fn fatal(&self, message: &str) {
        self.report(Severity::Fatal, message);
    }
}

/// Colored console output
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => {
                tracing::info!("{}", message);
                println!("{} {}", "▶".blue(), message);
            }
            Severity::Advisory => {
                tracing::warn!("{}", message);
                println!("{} {}", "⚠".yellow(), message.yellow());
            }
            Severity::Fatal => {
                tracing::error!("{}", message);
                eprintln!("{} {}", "✗".red().bold(), message.red().bold());
            }
        }
    }
}
