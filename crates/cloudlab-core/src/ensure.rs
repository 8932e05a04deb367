//! Check-then-act resource creation
//!
//! `ensure` lists what already exists and only creates the resource when it is
//! absent. The list and the create are separate calls against the remote
//! service, so a concurrent actor can still create the same resource in
//! between; the create error is surfaced in that case.

use crate::error::{LabError, Result};
use crate::resource::ResourceKind;
use async_trait::async_trait;

/// A resource that can be looked up by listing and created on demand
#[async_trait]
pub trait EnsureTarget: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Identifier as it appears in the listing
    fn identifier(&self) -> &str;

    /// Identifiers of the existing resources of this kind.
    ///
    /// An empty listing must be `Ok(vec![])`. Errors (service unreachable,
    /// permission denied) are propagated by [`ensure`] unchanged.
    async fn list_existing(&self) -> Result<Vec<String>>;

    async fn create(&self) -> Result<()>;
}

/// What [`ensure`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyPresent,
}

impl std::fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnsureOutcome::Created => write!(f, "created"),
            EnsureOutcome::AlreadyPresent => write!(f, "already present"),
        }
    }
}

/// Mount listings report `secret/`, requests use `secret`.
fn normalize(identifier: &str) -> &str {
    identifier.trim_end_matches('/')
}

pub async fn ensure(target: &dyn EnsureTarget) -> Result<EnsureOutcome> {
    let kind = target.kind();
    let id = normalize(target.identifier());

    let existing = target.list_existing().await?;
    if existing.iter().any(|e| normalize(e) == id) {
        tracing::debug!("{} '{}' already present", kind, id);
        return Ok(EnsureOutcome::AlreadyPresent);
    }

    tracing::info!("Creating {} '{}'", kind, id);
    match target.create().await {
        Ok(()) => Ok(EnsureOutcome::Created),
        Err(e @ LabError::ResourceCreationFailure { .. }) => Err(e),
        Err(e) if e.is_connectivity() => Err(e),
        Err(e) => Err(LabError::ResourceCreationFailure {
            kind,
            id: id.to_string(),
            reason: e.to_string(),
        }),
    }
}
