//! cloudlab core
//!
//! Provider-neutral building blocks shared by the Vault bootstrap flow and the
//! geo-routing lab flow.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   lab CLI                        │
//! │            (lab vault / lab geo)                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                cloudlab-core                     │
//! │  ┌──────────────┐ ┌──────────────┐ ┌─────────┐  │
//! │  │    ensure    │ │  wait_ready  │ │ Runner  │  │
//! │  └──────────────┘ └──────────────┘ └─────────┘  │
//! │  ┌──────────────┐ ┌──────────────┐              │
//! │  │    Prompt    │ │   Reporter   │              │
//! │  └──────────────┘ └──────────────┘              │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ cloudlab-vault│ │  cloudlab-gcp │
//! │  (HTTP API)   │ │ (gcloud CLI)  │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod ensure;
pub mod error;
pub mod prompt;
pub mod report;
pub mod resource;
pub mod runner;
pub mod waiter;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use ensure::{EnsureOutcome, EnsureTarget, ensure};
pub use error::{ErrorCategory, LabError, Result};
pub use prompt::{AcceptDefaults, Prompt, StdinPrompt};
pub use report::{ConsoleReporter, Reporter, Severity};
pub use resource::ResourceKind;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, args};
pub use waiter::{HealthProbe, ProbeStatus, WaitConfig, wait_ready};
