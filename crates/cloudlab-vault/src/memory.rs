//! In-memory Vault for tests
//!
//! Behaves like a freshly started dev server: `secret/` (KV v2), `sys/`,
//! `cubbyhole/` and `identity/` are mounted, `token/` auth is enabled, and
//! only [`InMemoryVault::ROOT_TOKEN`] is accepted until more are added.
//! Userpass usernames are stored lowercased, as Vault does.

use crate::api::{
    HealthStatus, Identity, KvMount, MountInfo, MountRequest, SecretFields, VaultApi,
};
use async_trait::async_trait;
use cloudlab_core::{LabError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Default)]
struct State {
    mounts: BTreeMap<String, String>,
    auth: BTreeMap<String, String>,
    users: BTreeMap<String, BTreeMap<String, Identity>>,
    transit_keys: BTreeMap<String, BTreeSet<String>>,
    secrets: BTreeMap<String, SecretFields>,
    tokens: BTreeSet<String>,
    current_token: Option<String>,
}

pub struct InMemoryVault {
    state: Mutex<State>,
    reachable: AtomicBool,
    mangle_reads: AtomicBool,
    refused_probes: AtomicU32,
    not_ready_probes: AtomicU32,
    health_calls: AtomicU32,
    lookup_calls: AtomicU32,
    create_calls: AtomicU32,
    write_calls: AtomicU32,
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVault {
    pub const ROOT_TOKEN: &'static str = "root";

    pub fn new() -> Self {
        let mut state = State::default();
        for (path, kind) in [
            ("secret/", "kv"),
            ("sys/", "system"),
            ("cubbyhole/", "cubbyhole"),
            ("identity/", "identity"),
        ] {
            state.mounts.insert(path.to_string(), kind.to_string());
        }
        state.auth.insert("token/".to_string(), "token".to_string());
        state.tokens.insert(Self::ROOT_TOKEN.to_string());

        Self {
            state: Mutex::new(state),
            reachable: AtomicBool::new(true),
            mangle_reads: AtomicBool::new(false),
            refused_probes: AtomicU32::new(0),
            not_ready_probes: AtomicU32::new(0),
            health_calls: AtomicU32::new(0),
            lookup_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
            write_calls: AtomicU32::new(0),
        }
    }

    /// A server that refuses connections until [`InMemoryVault::come_up`]
    pub fn unreachable() -> Self {
        let vault = Self::new();
        vault.reachable.store(false, Ordering::SeqCst);
        vault
    }

    /// Health probes are refused this many times, as if the process were
    /// still starting; other calls are unaffected
    pub fn refuse_probes(self, probes: u32) -> Self {
        self.refused_probes.store(probes, Ordering::SeqCst);
        self
    }

    /// Health probes answer 503 this many times before the server is ready
    pub fn ready_after(self, probes: u32) -> Self {
        self.not_ready_probes.store(probes, Ordering::SeqCst);
        self
    }

    /// Secret reads return altered values, like a store that lost the write
    pub fn mangle_reads(self) -> Self {
        self.mangle_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_token(self, token: &str) -> Self {
        self.lock().tokens.insert(token.to_string());
        self
    }

    pub fn come_up(&self) {
        self.reachable.store(true, Ordering::SeqCst);
    }

    pub fn health_calls(&self) -> u32 {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> u32 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Successful enable/create calls of any kind
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn has_mount(&self, path: &str) -> bool {
        self.lock().mounts.contains_key(&mount_key(path))
    }

    pub fn has_auth(&self, path: &str) -> bool {
        self.lock().auth.contains_key(&mount_key(path))
    }

    pub fn user(&self, auth_path: &str, username: &str) -> Option<Identity> {
        self.lock()
            .users
            .get(&mount_key(auth_path))
            .and_then(|u| u.get(&username.to_lowercase()).cloned())
    }

    pub fn has_transit_key(&self, mount: &str, name: &str) -> bool {
        self.lock()
            .transit_keys
            .get(&mount_key(mount))
            .is_some_and(|k| k.contains(name))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LabError::ConnectivityFailure(
                "connection refused".to_string(),
            ))
        }
    }

    /// Reachable and called with an accepted token
    fn authorized(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.check_reachable()?;
        let state = self.lock();
        let accepted = state
            .current_token
            .as_ref()
            .is_some_and(|t| state.tokens.contains(t));
        if accepted {
            Ok(state)
        } else {
            Err(LabError::Api("HTTP 403: permission denied".to_string()))
        }
    }

    fn created(&self) {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn mount_key(path: &str) -> String {
    format!("{}/", path.trim_matches('/'))
}

fn secret_key(kv: &KvMount, path: &str) -> String {
    format!("{}/{}", kv.path, path.trim_matches('/'))
}

#[async_trait]
impl VaultApi for InMemoryVault {
    async fn health(&self) -> Result<HealthStatus> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let refused = self.refused_probes.load(Ordering::SeqCst);
        if refused > 0 {
            self.refused_probes.store(refused - 1, Ordering::SeqCst);
            return Err(LabError::ConnectivityFailure(
                "connection refused".to_string(),
            ));
        }

        let remaining = self.not_ready_probes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.not_ready_probes.store(remaining - 1, Ordering::SeqCst);
            return Ok(HealthStatus {
                status_code: 503,
                initialized: true,
                sealed: true,
            });
        }
        Ok(HealthStatus::active())
    }

    async fn lookup_self(&self, token: &str) -> Result<bool> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.lock().tokens.contains(token))
    }

    fn set_token(&self, token: &str) {
        self.lock().current_token = Some(token.to_string());
    }

    async fn list_mounts(&self) -> Result<Vec<MountInfo>> {
        let state = self.authorized()?;
        Ok(state
            .mounts
            .iter()
            .map(|(path, kind)| MountInfo {
                path: path.clone(),
                mount_type: kind.clone(),
            })
            .collect())
    }

    async fn enable_mount(&self, path: &str, request: &MountRequest) -> Result<()> {
        let mut state = self.authorized()?;
        let key = mount_key(path);
        if state.mounts.contains_key(&key) {
            return Err(LabError::Api(format!(
                "HTTP 400: path is already in use at {}",
                key
            )));
        }
        state.mounts.insert(key, request.engine_type.clone());
        drop(state);
        self.created();
        Ok(())
    }

    async fn list_auth_methods(&self) -> Result<Vec<MountInfo>> {
        let state = self.authorized()?;
        Ok(state
            .auth
            .iter()
            .map(|(path, kind)| MountInfo {
                path: path.clone(),
                mount_type: kind.clone(),
            })
            .collect())
    }

    async fn enable_auth(&self, path: &str, method_type: &str) -> Result<()> {
        let mut state = self.authorized()?;
        let key = mount_key(path);
        if state.auth.contains_key(&key) {
            return Err(LabError::Api(format!(
                "HTTP 400: path is already in use at {}",
                key
            )));
        }
        state.auth.insert(key, method_type.to_string());
        drop(state);
        self.created();
        Ok(())
    }

    async fn list_users(&self, auth_path: &str) -> Result<Vec<String>> {
        let state = self.authorized()?;
        Ok(state
            .users
            .get(&mount_key(auth_path))
            .map(|u| u.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_user(&self, auth_path: &str, identity: &Identity) -> Result<()> {
        let mut state = self.authorized()?;
        let key = mount_key(auth_path);
        if !state.auth.contains_key(&key) {
            return Err(LabError::Api(format!(
                "HTTP 404: no handler for route \"auth/{}users\"",
                key
            )));
        }
        state
            .users
            .entry(key)
            .or_default()
            .insert(identity.username.to_lowercase(), identity.clone());
        drop(state);
        self.created();
        Ok(())
    }

    async fn list_transit_keys(&self, mount: &str) -> Result<Vec<String>> {
        let state = self.authorized()?;
        Ok(state
            .transit_keys
            .get(&mount_key(mount))
            .map(|k| k.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_transit_key(&self, mount: &str, name: &str) -> Result<()> {
        let mut state = self.authorized()?;
        let key = mount_key(mount);
        if state.mounts.get(&key).map(String::as_str) != Some("transit") {
            return Err(LabError::Api(format!(
                "HTTP 404: no handler for route \"{}keys/{}\"",
                key, name
            )));
        }
        state
            .transit_keys
            .entry(key)
            .or_default()
            .insert(name.to_string());
        drop(state);
        self.created();
        Ok(())
    }

    async fn write_secret(&self, kv: &KvMount, path: &str, fields: &SecretFields) -> Result<()> {
        let mut state = self.authorized()?;
        if !state.mounts.contains_key(&mount_key(&kv.path)) {
            return Err(LabError::Api(format!(
                "HTTP 404: no handler for route \"{}\"",
                kv.data_path(path)
            )));
        }
        state.secrets.insert(secret_key(kv, path), fields.clone());
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_secret(&self, kv: &KvMount, path: &str) -> Result<SecretFields> {
        let state = self.authorized()?;
        let mut fields = state
            .secrets
            .get(&secret_key(kv, path))
            .cloned()
            .ok_or_else(|| LabError::Api(format!("HTTP 404: {}", kv.data_path(path))))?;
        if self.mangle_reads.load(Ordering::SeqCst) {
            for value in fields.values_mut() {
                value.push('~');
            }
        }
        Ok(fields)
    }
}
