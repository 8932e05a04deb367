//! Test doubles for flows built on this crate
//!
//! Enabled with the `test-utils` feature.

use crate::error::{LabError, Result};
use crate::prompt::Prompt;
use crate::report::{Reporter, Severity};
use crate::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub detached: bool,
}

impl RecordedCall {
    /// Program and arguments joined with spaces
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when every token appears in the command line as a whole word
    pub fn matches(&self, tokens: &[&str]) -> bool {
        tokens
            .iter()
            .all(|t| self.program == *t || self.args.iter().any(|a| a == t))
    }
}

struct Rule {
    tokens: Vec<String>,
    output: CommandOutput,
}

/// Records every command and answers from scripted rules.
///
/// The first rule whose tokens all appear in the invocation wins; unmatched
/// commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
    missing: Mutex<HashSet<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, tokens: &[&str], output: CommandOutput) -> Self {
        self.rules.lock().unwrap().push(Rule {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            output,
        });
        self
    }

    pub fn respond_ok(self, tokens: &[&str], stdout: &str) -> Self {
        self.respond(tokens, CommandOutput::ok(stdout))
    }

    pub fn fail_on(self, tokens: &[&str], stderr: &str) -> Self {
        self.respond(tokens, CommandOutput::failed(1, stderr))
    }

    /// Make [`CommandRunner::locate`] report `program` as not installed
    pub fn without_program(self, program: &str) -> Self {
        self.missing.lock().unwrap().insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Index of every recorded call matching `tokens`
    pub fn positions(&self, tokens: &[&str]) -> Vec<usize> {
        self.calls()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.matches(tokens))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, tokens: &[&str]) -> usize {
        self.positions(tokens).len()
    }

    fn record(&self, program: &str, args: &[String], detached: bool) -> RecordedCall {
        let call = RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            detached,
        };
        self.calls.lock().unwrap().push(call.clone());
        call
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let call = self.record(program, args, false);
        if self.missing.lock().unwrap().contains(program) {
            return Err(LabError::ToolNotFound(program.to_string()));
        }
        let rules = self.rules.lock().unwrap();
        let tokens_match = |rule: &&Rule| {
            let tokens: Vec<&str> = rule.tokens.iter().map(String::as_str).collect();
            call.matches(&tokens)
        };
        Ok(rules
            .iter()
            .find(tokens_match)
            .map(|r| r.output.clone())
            .unwrap_or_else(|| CommandOutput::ok("")))
    }

    async fn spawn_detached(
        &self,
        program: &str,
        args: &[String],
        _log_path: &Path,
    ) -> Result<u32> {
        self.record(program, args, true);
        if self.missing.lock().unwrap().contains(program) {
            return Err(LabError::ToolNotFound(program.to_string()));
        }
        Ok(4242)
    }

    async fn locate(&self, program: &str) -> Result<Option<PathBuf>> {
        if self.missing.lock().unwrap().contains(program) {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(format!("/usr/bin/{}", program))))
        }
    }
}

/// Stores every reported message
#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, severity: Severity, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

/// Answers prompts from a fixed script; an exhausted script answers "".
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Messages shown so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn prompt(&self, message: &str) -> Result<String> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }
}
