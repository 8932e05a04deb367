//! Vault API abstraction
//!
//! Flows talk to Vault only through [`VaultApi`]; [`crate::HttpVault`] is the
//! real implementation.

use async_trait::async_trait;
use cloudlab_core::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Field -> value map stored at one secret path
pub type SecretFields = BTreeMap<String, String>;

#[async_trait]
pub trait VaultApi: Send + Sync {
    /// `GET /v1/sys/health`. Connection errors are `ConnectivityFailure`.
    async fn health(&self) -> Result<HealthStatus>;

    /// Whether `token` is accepted by the server
    async fn lookup_self(&self, token: &str) -> Result<bool>;

    /// Token sent with every subsequent call
    fn set_token(&self, token: &str);

    async fn list_mounts(&self) -> Result<Vec<MountInfo>>;

    async fn enable_mount(&self, path: &str, request: &MountRequest) -> Result<()>;

    async fn list_auth_methods(&self) -> Result<Vec<MountInfo>>;

    async fn enable_auth(&self, path: &str, method_type: &str) -> Result<()>;

    /// Users under a userpass mount; empty when none exist
    async fn list_users(&self, auth_path: &str) -> Result<Vec<String>>;

    async fn create_user(&self, auth_path: &str, identity: &Identity) -> Result<()>;

    /// Key names under a transit mount; empty when none exist
    async fn list_transit_keys(&self, mount: &str) -> Result<Vec<String>>;

    async fn create_transit_key(&self, mount: &str, name: &str) -> Result<()>;

    /// Replace all fields stored at `path`
    async fn write_secret(&self, kv: &KvMount, path: &str, fields: &SecretFields) -> Result<()>;

    async fn read_secret(&self, kv: &KvMount, path: &str) -> Result<SecretFields>;
}

/// Parsed `sys/health` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    /// HTTP status code: 200 active, 429 standby, 501 uninitialized, 503 sealed
    pub status_code: u16,
    pub initialized: bool,
    pub sealed: bool,
}

impl HealthStatus {
    pub fn active() -> Self {
        Self {
            status_code: 200,
            initialized: true,
            sealed: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status_code == 200 && self.initialized && !self.sealed
    }
}

/// Entry of `sys/mounts` or `sys/auth`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Path as listed, with trailing slash ("secret/")
    pub path: String,
    pub mount_type: String,
}

/// Body for enabling a secret engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountRequest {
    #[serde(rename = "type")]
    pub engine_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl MountRequest {
    pub fn kv(version: u8) -> Self {
        Self {
            engine_type: "kv".to_string(),
            options: [("version".to_string(), version.to_string())]
                .into_iter()
                .collect(),
        }
    }

    pub fn transit() -> Self {
        Self {
            engine_type: "transit".to_string(),
            options: BTreeMap::new(),
        }
    }
}

/// Username/password identity with its policies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub password: String,
    pub policies: Vec<String>,
}

impl From<&cloudlab_config::DemoIdentity> for Identity {
    fn from(demo: &cloudlab_config::DemoIdentity) -> Self {
        Self {
            username: demo.username.clone(),
            password: demo.password.clone(),
            policies: demo.policies.clone(),
        }
    }
}

/// Key/value engine mount and its API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvMount {
    pub path: String,
    pub version: u8,
}

impl KvMount {
    pub fn new(path: impl Into<String>, version: u8) -> Self {
        Self {
            path: path.into().trim_matches('/').to_string(),
            version,
        }
    }

    /// API path for reading and writing `secret_path`
    pub fn data_path(&self, secret_path: &str) -> String {
        let secret_path = secret_path.trim_matches('/');
        match self.version {
            1 => format!("{}/{}", self.path, secret_path),
            _ => format!("{}/data/{}", self.path, secret_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_data_path() {
        assert_eq!(
            KvMount::new("secret/", 2).data_path("/lab/demo"),
            "secret/data/lab/demo"
        );
        assert_eq!(KvMount::new("kv", 1).data_path("lab/demo"), "kv/lab/demo");
    }

    #[test]
    fn test_health_readiness() {
        assert!(HealthStatus::active().is_ready());
        let sealed = HealthStatus {
            status_code: 503,
            initialized: true,
            sealed: true,
        };
        assert!(!sealed.is_ready());
    }

    #[test]
    fn test_kv_mount_request_body() {
        let body = serde_json::to_value(MountRequest::kv(2)).unwrap();
        assert_eq!(body, serde_json::json!({"type": "kv", "options": {"version": "2"}}));
        let body = serde_json::to_value(MountRequest::transit()).unwrap();
        assert_eq!(body, serde_json::json!({"type": "transit"}));
    }
}
