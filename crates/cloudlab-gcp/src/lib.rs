//! Google Cloud plumbing for cloudlab
//!
//! Wraps the `gcloud` CLI for the geo-routing lab and the Vault artifact
//! upload.
//!
//! # Requirements
//!
//! - `gcloud` CLI installed and authenticated
//! - An active project (`gcloud config set project <id>`) or
//!   `CLOUDSDK_CORE_PROJECT`

pub mod gcloud;
pub mod project;
pub mod routing;
pub mod startup_scripts;

pub use gcloud::{Gcloud, InstanceRequest};
pub use project::{detect_bucket, detect_project, select_bucket};
pub use routing::routing_policy_data;
