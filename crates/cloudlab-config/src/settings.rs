//! Lab settings with demo defaults

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

const REDACTED: &str = "********";

/// Complete configuration for both flows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Cloud project id; detected from gcloud when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub vault: VaultSettings,
    pub geo: GeoSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Base URL of the dev server
    pub address: String,
    pub health_path: String,
    /// Name of the vault binary on PATH
    pub binary: String,
    /// Command run when the binary is missing
    pub install_command: Vec<String>,
    /// Where the detached dev server writes its output
    pub log_path: String,
    /// Root token for a newly started dev server; generated when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_token: Option<String>,
    /// Token offered as the default when the server was already running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub token_attempts: u32,
    pub secret_mount: String,
    pub kv_version: u8,
    pub secret_path: String,
    pub secret_field: String,
    pub secret_value: String,
    /// Local file receiving the value read back from Vault
    pub artifact_path: String,
    pub auth_method: String,
    pub demo_user: DemoIdentity,
    pub transit_mount: String,
    pub transit_key: String,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            health_path: "/v1/sys/health".to_string(),
            binary: "vault".to_string(),
            install_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                concat!(
                    "curl -fsSL https://apt.releases.hashicorp.com/gpg | sudo gpg --dearmor --yes -o /usr/share/keyrings/hashicorp.gpg",
                    " && echo \"deb [signed-by=/usr/share/keyrings/hashicorp.gpg] https://apt.releases.hashicorp.com $(lsb_release -cs) main\"",
                    " | sudo tee /etc/apt/sources.list.d/hashicorp.list",
                    " && sudo apt-get update -y && sudo apt-get install -y vault"
                )
                .to_string(),
            ],
            log_path: "vault-lab/vault-dev.log".to_string(),
            root_token: None,
            token: None,
            poll_attempts: 30,
            poll_interval_ms: 1000,
            token_attempts: 3,
            secret_mount: "secret".to_string(),
            kv_version: 2,
            secret_path: "lab/demo".to_string(),
            secret_field: "message".to_string(),
            secret_value: "hello-from-vault-lab".to_string(),
            artifact_path: "vault-lab/secret.txt".to_string(),
            auth_method: "userpass".to_string(),
            demo_user: DemoIdentity::default(),
            transit_mount: "transit".to_string(),
            transit_key: "lab-key".to_string(),
        }
    }
}

impl VaultSettings {
    pub fn health_url(&self) -> String {
        format!(
            "{}/{}",
            self.address.trim_end_matches('/'),
            self.health_path.trim_start_matches('/')
        )
    }

    /// `host:port` for `-dev-listen-address`, derived from [`Self::address`]
    pub fn listen_address(&self) -> String {
        let without_scheme = self
            .address
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.address);
        without_scheme
            .split('/')
            .next()
            .unwrap_or(without_scheme)
            .to_string()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Demo userpass identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoIdentity {
    pub username: String,
    pub password: String,
    pub policies: Vec<String>,
}

impl Default for DemoIdentity {
    fn default() -> Self {
        Self {
            username: "demo-user".to_string(),
            password: "demo-password".to_string(),
            policies: vec!["default".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSettings {
    /// Provider APIs enabled before anything is created
    pub apis: Vec<String>,
    pub network: String,
    pub machine_type: String,
    pub image_family: String,
    pub image_project: String,
    pub firewall_rules: Vec<FirewallRuleSpec>,
    pub client_tag: String,
    pub server_tag: String,
    pub clients: Vec<InstanceSpec>,
    pub servers: Vec<InstanceSpec>,
    pub dns: DnsSettings,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            apis: vec![
                "compute.googleapis.com".to_string(),
                "dns.googleapis.com".to_string(),
            ],
            network: "default".to_string(),
            machine_type: "e2-micro".to_string(),
            image_family: "debian-12".to_string(),
            image_project: "debian-cloud".to_string(),
            firewall_rules: vec![
                FirewallRuleSpec {
                    name: "geo-lab-allow-ssh".to_string(),
                    allow: vec!["tcp:22".to_string()],
                    source_ranges: vec!["35.235.240.0/20".to_string()],
                    target_tags: vec!["geo-client".to_string(), "geo-server".to_string()],
                },
                FirewallRuleSpec {
                    name: "geo-lab-allow-http".to_string(),
                    allow: vec!["tcp:80".to_string()],
                    source_ranges: vec!["10.0.0.0/8".to_string()],
                    target_tags: vec!["geo-server".to_string()],
                },
            ],
            client_tag: "geo-client".to_string(),
            server_tag: "geo-server".to_string(),
            clients: vec![
                InstanceSpec::new("geo-client-us", "us-central1-a"),
                InstanceSpec::new("geo-client-eu", "europe-west1-b"),
                InstanceSpec::new("geo-client-asia", "asia-south1-a"),
            ],
            servers: vec![
                InstanceSpec::new("geo-server-us", "us-east1-b"),
                InstanceSpec::new("geo-server-eu", "europe-west2-a"),
            ],
            dns: DnsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRuleSpec {
    pub name: String,
    pub allow: Vec<String>,
    pub source_ranges: Vec<String>,
    pub target_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    pub zone: String,
}

impl InstanceSpec {
    pub fn new(name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
        }
    }

    /// Region of the zone ("us-east1-b" -> "us-east1")
    pub fn region(&self) -> &str {
        match self.zone.rsplit_once('-') {
            Some((region, suffix)) if suffix.len() == 1 => region,
            _ => &self.zone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsSettings {
    pub zone_name: String,
    /// Domain without the trailing dot
    pub domain: String,
    pub record_name: String,
    pub ttl: u32,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            zone_name: "geo-lab-zone".to_string(),
            domain: "geolab.internal".to_string(),
            record_name: "geo".to_string(),
            ttl: 5,
        }
    }
}

impl DnsSettings {
    /// Fully qualified DNS name of the zone, with trailing dot
    pub fn dns_name(&self) -> String {
        format!("{}.", self.domain.trim_end_matches('.'))
    }

    /// Fully qualified record name, with trailing dot
    pub fn record_fqdn(&self) -> String {
        format!("{}.{}", self.record_name, self.dns_name())
    }
}

impl LabConfig {
    /// Apply `VAULT_ADDR`, `VAULT_TOKEN` and `CLOUDSDK_CORE_PROJECT`
    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = non_empty_env("VAULT_ADDR") {
            tracing::debug!("VAULT_ADDR overrides vault.address");
            self.vault.address = addr;
        }
        if let Some(token) = non_empty_env("VAULT_TOKEN") {
            self.vault.token = Some(token);
        }
        if let Some(project) = non_empty_env("CLOUDSDK_CORE_PROJECT") {
            self.project = Some(project);
        }
    }

    /// Copy safe to print: tokens and the demo password are masked
    pub fn redacted(&self) -> LabConfig {
        let mut config = self.clone();
        let vault = &mut config.vault;
        for secret in [&mut vault.token, &mut vault.root_token] {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        }
        vault.demo_user.password = REDACTED.to_string();
        config
    }

    pub fn validate(&self) -> Result<()> {
        let vault = &self.vault;
        if vault.secret_path.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("vault.secret_path is empty".into()));
        }
        if vault.secret_field.is_empty() {
            return Err(ConfigError::Invalid("vault.secret_field is empty".into()));
        }
        if vault.poll_attempts == 0 {
            return Err(ConfigError::Invalid("vault.poll_attempts must be > 0".into()));
        }
        if vault.token_attempts == 0 {
            return Err(ConfigError::Invalid("vault.token_attempts must be > 0".into()));
        }
        if !matches!(vault.kv_version, 1 | 2) {
            return Err(ConfigError::Invalid(format!(
                "vault.kv_version must be 1 or 2, got {}",
                vault.kv_version
            )));
        }

        let geo = &self.geo;
        if geo.servers.is_empty() {
            return Err(ConfigError::Invalid(
                "geo.servers must contain at least one instance".into(),
            ));
        }
        let mut seen = HashSet::new();
        for instance in geo.clients.iter().chain(geo.servers.iter()) {
            if !seen.insert(instance.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate instance name '{}'",
                    instance.name
                )));
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
