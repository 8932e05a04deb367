//! HashiCorp Vault bootstrap for cloudlab
//!
//! Starts (or reuses) a local dev server and populates it with a KV secret,
//! a userpass identity and a transit key.
//!
//! # Requirements
//!
//! - `vault` binary on PATH, or an `install_command` that can provide it
//! - Port of `vault.address` free on loopback when no server is running
//!
//! # Example
//!
//! ```ignore
//! use cloudlab_vault::{HttpVault, KvMount, VaultResource, VaultTarget, secrets};
//! use cloudlab_core::ensure;
//!
//! let api = HttpVault::new(&config.vault)?;
//! api.set_token("root");
//!
//! // Make sure the transit engine is mounted
//! ensure(&VaultTarget::new(&api, VaultResource::transit_engine("transit"))).await?;
//!
//! // Write and read back a secret
//! let kv = KvMount::new("secret", 2);
//! secrets::round_trip(&api, &kv, "lab/demo", "message", "hello").await?;
//! ```

pub mod api;
pub mod client;
pub mod resources;
pub mod secrets;
pub mod server;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use api::{
    HealthStatus, Identity, KvMount, MountInfo, MountRequest, SecretFields, VaultApi,
};
pub use client::HttpVault;
pub use resources::{VaultResource, VaultTarget};
pub use secrets::{get_field, put_secret, round_trip};
pub use server::{ServerStart, VaultHealthProbe, ensure_binary, start_dev_server};
pub use token::{TokenState, acquire_token};
