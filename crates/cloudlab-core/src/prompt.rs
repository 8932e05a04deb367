//! Operator input

use crate::error::Result;
use std::io::{BufRead, Write};

/// Source of operator input.
///
/// Flows never read stdin directly so tests can supply canned answers.
pub trait Prompt: Send + Sync {
    /// Show `message` and return one line of input without the trailing newline
    fn prompt(&self, message: &str) -> Result<String>;

    /// Block until the operator acknowledges `message`
    fn pause(&self, message: &str) -> Result<()> {
        self.prompt(message).map(|_| ())
    }
}

/// Reads answers from the terminal
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn prompt(&self, message: &str) -> Result<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Answers every prompt with an empty line, selecting defaults (`--yes`)
pub struct AcceptDefaults;

impl Prompt for AcceptDefaults {
    fn prompt(&self, message: &str) -> Result<String> {
        tracing::debug!("Auto-accepting prompt: {}", message.trim());
        Ok(String::new())
    }
}
