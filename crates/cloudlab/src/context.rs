//! Explicit per-run context passed to every step

use cloudlab_config::LabConfig;
use cloudlab_core::{CommandRunner, Prompt, Reporter};
use cloudlab_gcp::Gcloud;
use std::sync::Arc;

/// Configuration plus the pluggable side-effect providers of one run
#[derive(Clone)]
pub struct LabContext {
    pub config: LabConfig,
    pub reporter: Arc<dyn Reporter>,
    pub prompt: Arc<dyn Prompt>,
    pub runner: Arc<dyn CommandRunner>,
}

impl LabContext {
    pub fn new(
        config: LabConfig,
        reporter: Arc<dyn Reporter>,
        prompt: Arc<dyn Prompt>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            reporter,
            prompt,
            runner,
        }
    }

    /// gcloud wrapper sharing this context's runner
    pub fn gcloud(&self) -> Gcloud {
        Gcloud::new(self.runner.clone())
    }
}
