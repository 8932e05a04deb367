//! Vault objects managed with check-then-act

use crate::api::{Identity, MountInfo, MountRequest, VaultApi};
use async_trait::async_trait;
use cloudlab_core::{EnsureTarget, LabError, ResourceKind, Result};

/// A Vault object the bootstrap flow makes sure exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultResource {
    SecretEngine { path: String, request: MountRequest },
    AuthMethod { path: String, method_type: String },
    Identity { auth_path: String, identity: Identity },
    TransitKey { mount: String, name: String },
}

impl VaultResource {
    pub fn kv_engine(path: &str, version: u8) -> Self {
        VaultResource::SecretEngine {
            path: path.trim_matches('/').to_string(),
            request: MountRequest::kv(version),
        }
    }

    pub fn transit_engine(path: &str) -> Self {
        VaultResource::SecretEngine {
            path: path.trim_matches('/').to_string(),
            request: MountRequest::transit(),
        }
    }

    /// Userpass identity; Vault stores usernames lowercased
    pub fn identity(auth_path: &str, identity: Identity) -> Self {
        VaultResource::Identity {
            auth_path: auth_path.to_string(),
            identity: Identity {
                username: identity.username.to_lowercase(),
                ..identity
            },
        }
    }

    /// Auth method mounted at a path named after its type
    pub fn auth_method(method_type: &str) -> Self {
        VaultResource::AuthMethod {
            path: method_type.to_string(),
            method_type: method_type.to_string(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            VaultResource::SecretEngine { .. } => ResourceKind::SecretEngine,
            VaultResource::AuthMethod { .. } => ResourceKind::AuthMethod,
            VaultResource::Identity { .. } => ResourceKind::Identity,
            VaultResource::TransitKey { .. } => ResourceKind::EncryptionKey,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            VaultResource::SecretEngine { path, .. } => path,
            VaultResource::AuthMethod { path, .. } => path,
            VaultResource::Identity { identity, .. } => &identity.username,
            VaultResource::TransitKey { name, .. } => name,
        }
    }
}

/// Mount paths, failing when `path` is taken by a different type
fn mount_paths(mounts: Vec<MountInfo>, path: &str, expected_type: &str) -> Result<Vec<String>> {
    if let Some(taken) = mounts
        .iter()
        .find(|m| m.path.trim_end_matches('/') == path && m.mount_type != expected_type)
    {
        return Err(LabError::Api(format!(
            "{} is mounted as {}, expected {}",
            taken.path, taken.mount_type, expected_type
        )));
    }
    Ok(mounts.into_iter().map(|m| m.path).collect())
}

/// Binds a [`VaultResource`] to the API it lives in
pub struct VaultTarget<'a> {
    api: &'a dyn VaultApi,
    resource: VaultResource,
}

impl<'a> VaultTarget<'a> {
    pub fn new(api: &'a dyn VaultApi, resource: VaultResource) -> Self {
        Self { api, resource }
    }
}

#[async_trait]
impl EnsureTarget for VaultTarget<'_> {
    fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    fn identifier(&self) -> &str {
        self.resource.identifier()
    }

    async fn list_existing(&self) -> Result<Vec<String>> {
        match &self.resource {
            VaultResource::SecretEngine { path, request } => mount_paths(
                self.api.list_mounts().await?,
                path,
                &request.engine_type,
            ),
            VaultResource::AuthMethod { path, method_type } => {
                mount_paths(self.api.list_auth_methods().await?, path, method_type)
            }
            VaultResource::Identity { auth_path, .. } => self.api.list_users(auth_path).await,
            VaultResource::TransitKey { mount, .. } => self.api.list_transit_keys(mount).await,
        }
    }

    async fn create(&self) -> Result<()> {
        match &self.resource {
            VaultResource::SecretEngine { path, request } => {
                self.api.enable_mount(path, request).await
            }
            VaultResource::AuthMethod { path, method_type } => {
                self.api.enable_auth(path, method_type).await
            }
            VaultResource::Identity {
                auth_path,
                identity,
            } => self.api.create_user(auth_path, identity).await,
            VaultResource::TransitKey { mount, name } => {
                self.api.create_transit_key(mount, name).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryVault;
    use cloudlab_core::{EnsureOutcome, LabError, ensure};

    fn vault() -> InMemoryVault {
        let vault = InMemoryVault::new();
        vault.set_token(InMemoryVault::ROOT_TOKEN);
        vault
    }

    #[tokio::test]
    async fn test_default_kv_mount_is_reused() {
        let vault = vault();
        let target = VaultTarget::new(&vault, VaultResource::kv_engine("secret", 2));
        assert_eq!(ensure(&target).await.unwrap(), EnsureOutcome::AlreadyPresent);
        assert_eq!(vault.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_each_kind_is_created_once() {
        let vault = vault();
        let identity = Identity {
            username: "demo-user".to_string(),
            password: "pw".to_string(),
            policies: vec!["default".to_string()],
        };
        let resources = vec![
            VaultResource::transit_engine("transit"),
            VaultResource::auth_method("userpass"),
            VaultResource::Identity {
                auth_path: "userpass".to_string(),
                identity,
            },
            VaultResource::TransitKey {
                mount: "transit".to_string(),
                name: "lab-key".to_string(),
            },
        ];

        for resource in &resources {
            let target = VaultTarget::new(&vault, resource.clone());
            assert_eq!(ensure(&target).await.unwrap(), EnsureOutcome::Created);
        }
        for resource in &resources {
            let target = VaultTarget::new(&vault, resource.clone());
            assert_eq!(ensure(&target).await.unwrap(), EnsureOutcome::AlreadyPresent);
        }
        assert_eq!(vault.create_calls(), resources.len() as u32);
    }

    #[tokio::test]
    async fn test_user_on_missing_auth_mount_fails() {
        let vault = vault();
        let target = VaultTarget::new(
            &vault,
            VaultResource::Identity {
                auth_path: "userpass".to_string(),
                identity: Identity {
                    username: "u".to_string(),
                    password: "p".to_string(),
                    policies: vec![],
                },
            },
        );
        let err = ensure(&target).await.unwrap_err();
        assert!(matches!(
            err,
            LabError::ResourceCreationFailure {
                kind: ResourceKind::Identity,
                ..
            }
        ));
    }

    /// A username with capitals is found again after Vault lowercases it
    #[tokio::test]
    async fn test_mixed_case_username_is_created_once() {
        let vault = vault();
        ensure(&VaultTarget::new(&vault, VaultResource::auth_method("userpass")))
            .await
            .unwrap();
        let resource = VaultResource::identity(
            "userpass",
            Identity {
                username: "Demo-User".to_string(),
                password: "pw".to_string(),
                policies: vec!["default".to_string()],
            },
        );

        let first = ensure(&VaultTarget::new(&vault, resource.clone())).await.unwrap();
        let second = ensure(&VaultTarget::new(&vault, resource)).await.unwrap();

        assert_eq!(first, EnsureOutcome::Created);
        assert_eq!(second, EnsureOutcome::AlreadyPresent);
        assert_eq!(vault.create_calls(), 2);
        assert!(vault.user("userpass", "demo-user").is_some());
    }

    /// A path mounted with another engine type is an error, not "already present"
    #[tokio::test]
    async fn test_mount_of_wrong_type_is_rejected() {
        let vault = vault();
        let target = VaultTarget::new(&vault, VaultResource::transit_engine("secret"));

        let err = ensure(&target).await.unwrap_err();

        assert!(matches!(err, LabError::Api(ref m) if m.contains("mounted as kv")));
        assert_eq!(vault.create_calls(), 0);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(VaultResource::kv_engine("/secret/", 2).identifier(), "secret");
        assert_eq!(
            VaultResource::auth_method("userpass").kind(),
            ResourceKind::AuthMethod
        );
    }
}
