pub mod config;
pub mod geo;
pub mod vault;

use cloudlab::LabContext;
use cloudlab_config::LabConfig;
use cloudlab_core::{
    AcceptDefaults, ConsoleReporter, ErrorCategory, LabError, ProcessRunner, Prompt, Reporter,
    StdinPrompt,
};
use colored::Colorize;
use std::sync::Arc;

/// Context backed by real processes and the terminal
pub fn context(config: LabConfig, yes: bool) -> LabContext {
    let prompt: Arc<dyn Prompt> = if yes {
        Arc::new(AcceptDefaults)
    } else {
        Arc::new(StdinPrompt)
    };
    LabContext::new(
        config,
        Arc::new(ConsoleReporter),
        prompt,
        Arc::new(ProcessRunner::new()),
    )
}

fn hint(category: ErrorCategory) -> Option<&'static str> {
    match category {
        ErrorCategory::ConfigurationMissing => {
            Some("Set a project with `gcloud config set project <id>` or CLOUDSDK_CORE_PROJECT")
        }
        ErrorCategory::ConnectivityFailure => {
            Some("Check the server log and that nothing else uses the Vault port")
        }
        ErrorCategory::AuthExhausted => Some("Use the root token printed when the dev server started"),
        ErrorCategory::ResourceCreationFailure | ErrorCategory::Internal => None,
    }
}

pub fn report_fatal(err: &anyhow::Error) {
    ConsoleReporter.fatal(&err.to_string());
    if let Some(hint) = err
        .downcast_ref::<LabError>()
        .and_then(|e| hint(e.category()))
    {
        eprintln!("  {} {}", "hint:".yellow(), hint);
    }
}
