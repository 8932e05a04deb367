//! cloudlab
//!
//! Two lab automation flows on top of `cloudlab-core`:
//!
//! - [`vault_flow`]: bootstrap a Vault dev server with a KV secret, a
//!   userpass identity and a transit key, then upload the secret to a bucket
//! - [`geo_flow`]: provision (and tear down) a multi-region GCP geo-routing
//!   DNS lab

pub mod context;
pub mod geo_flow;
pub mod vault_flow;

pub use context::LabContext;
pub use geo_flow::GeoSummary;
pub use vault_flow::VaultSummary;
