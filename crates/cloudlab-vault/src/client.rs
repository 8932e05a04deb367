//! Vault HTTP API client
//!
//! Talks to the server's `/v1` API with the `X-Vault-Token` header.

use crate::api::{
    HealthStatus, Identity, KvMount, MountInfo, MountRequest, SecretFields, VaultApi,
};
use async_trait::async_trait;
use cloudlab_config::VaultSettings;
use cloudlab_core::{LabError, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

const TOKEN_HEADER: &str = "X-Vault-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpVault {
    client: reqwest::Client,
    address: String,
    health_url: String,
    token: RwLock<Option<String>>,
}

impl HttpVault {
    pub fn new(settings: &VaultSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LabError::Api(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            address: settings.address.trim_end_matches('/').to_string(),
            health_url: settings.health_url(),
            token: RwLock::new(None),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.current_token() {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        };
        request.send().await.map_err(http_error)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        tracing::debug!("GET {}", path);
        let response = self.send(self.client.get(self.url(path))).await?;
        let response = check_status(response).await?;
        response.json().await.map_err(http_error)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<()> {
        tracing::debug!("POST {}", path);
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        check_status(response).await?;
        Ok(())
    }

    /// LIST via `?list=true`; Vault answers 404 when there is nothing to list
    async fn list_keys(&self, path: &str) -> Result<Vec<String>> {
        tracing::debug!("LIST {}", path);
        let request = self
            .client
            .get(self.url(path))
            .query(&[("list", "true")]);
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = check_status(response).await?;
        let body: Envelope<KeyList> = response.json().await.map_err(http_error)?;
        Ok(body.data.keys)
    }

    async fn list_mount_table(&self, path: &str) -> Result<Vec<MountInfo>> {
        let body = self.get_json(path).await?;
        Ok(parse_mount_table(&body))
    }
}

fn http_error(err: reqwest::Error) -> LabError {
    if err.is_connect() || err.is_timeout() {
        LabError::ConnectivityFailure(err.to_string())
    } else {
        LabError::Api(format!("HTTP request failed: {}", err))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let errors = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.errors.join("; "))
        .unwrap_or(text);
    Err(LabError::Api(format!("HTTP {}: {}", status.as_u16(), errors.trim())))
}

/// Newer servers wrap the table in `data`, older ones return it top-level
fn parse_mount_table(body: &Value) -> Vec<MountInfo> {
    let table = body
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| body.as_object());

    let mut mounts: Vec<MountInfo> = table
        .into_iter()
        .flatten()
        .filter_map(|(path, entry)| {
            let mount_type = entry.get("type")?.as_str()?;
            Some(MountInfo {
                path: path.clone(),
                mount_type: mount_type.to_string(),
            })
        })
        .collect();
    mounts.sort_by(|a, b| a.path.cmp(&b.path));
    mounts
}

fn stringify_fields(raw: BTreeMap<String, Value>) -> SecretFields {
    raw.into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect()
}

#[async_trait]
impl VaultApi for HttpVault {
    async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(http_error)?;
        let status_code = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        Ok(HealthStatus {
            status_code,
            initialized: body
                .get("initialized")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            sealed: body.get("sealed").and_then(Value::as_bool).unwrap_or(true),
        })
    }

    async fn lookup_self(&self, token: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.url("auth/token/lookup-self"))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(http_error)?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Ok(false),
            _ => check_status(response).await.map(|_| false),
        }
    }

    fn set_token(&self, token: &str) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
    }

    async fn list_mounts(&self) -> Result<Vec<MountInfo>> {
        self.list_mount_table("sys/mounts").await
    }

    async fn enable_mount(&self, path: &str, request: &MountRequest) -> Result<()> {
        let body = serde_json::to_value(request)?;
        self.post_json(&format!("sys/mounts/{}", path.trim_matches('/')), &body)
            .await
    }

    async fn list_auth_methods(&self) -> Result<Vec<MountInfo>> {
        self.list_mount_table("sys/auth").await
    }

    async fn enable_auth(&self, path: &str, method_type: &str) -> Result<()> {
        self.post_json(
            &format!("sys/auth/{}", path.trim_matches('/')),
            &json!({ "type": method_type }),
        )
        .await
    }

    async fn list_users(&self, auth_path: &str) -> Result<Vec<String>> {
        self.list_keys(&format!("auth/{}/users", auth_path.trim_matches('/')))
            .await
    }

    async fn create_user(&self, auth_path: &str, identity: &Identity) -> Result<()> {
        self.post_json(
            &format!(
                "auth/{}/users/{}",
                auth_path.trim_matches('/'),
                identity.username
            ),
            &json!({
                "password": identity.password,
                "token_policies": identity.policies,
            }),
        )
        .await
    }

    async fn list_transit_keys(&self, mount: &str) -> Result<Vec<String>> {
        self.list_keys(&format!("{}/keys", mount.trim_matches('/')))
            .await
    }

    async fn create_transit_key(&self, mount: &str, name: &str) -> Result<()> {
        self.post_json(
            &format!("{}/keys/{}", mount.trim_matches('/'), name),
            &json!({}),
        )
        .await
    }

    async fn write_secret(&self, kv: &KvMount, path: &str, fields: &SecretFields) -> Result<()> {
        let body = match kv.version {
            1 => serde_json::to_value(fields)?,
            _ => json!({ "data": fields }),
        };
        self.post_json(&kv.data_path(path), &body).await
    }

    async fn read_secret(&self, kv: &KvMount, path: &str) -> Result<SecretFields> {
        let body = self.get_json(&kv.data_path(path)).await?;
        let data = match kv.version {
            1 => body.get("data"),
            _ => body.get("data").and_then(|d| d.get("data")),
        };
        let raw: BTreeMap<String, Value> = match data {
            Some(d) if !d.is_null() => serde_json::from_value(d.clone())?,
            _ => {
                return Err(LabError::Api(format!(
                    "no data at {}/{}",
                    kv.path,
                    path.trim_matches('/')
                )));
            }
        };
        Ok(stringify_fields(raw))
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct KeyList {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mount_table_wrapped() {
        let body = json!({
            "secret/": {"type": "kv"},
            "data": {
                "secret/": {"type": "kv", "options": {"version": "2"}},
                "sys/": {"type": "system"}
            }
        });
        let mounts = parse_mount_table(&body);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].path, "secret/");
        assert_eq!(mounts[0].mount_type, "kv");
        assert_eq!(mounts[1].path, "sys/");
    }

    #[test]
    fn test_parse_mount_table_top_level_skips_metadata() {
        let body = json!({
            "request_id": "abc",
            "token/": {"type": "token"}
        });
        let mounts = parse_mount_table(&body);
        assert_eq!(
            mounts,
            vec![MountInfo {
                path: "token/".to_string(),
                mount_type: "token".to_string()
            }]
        );
    }

    #[test]
    fn test_stringify_fields() {
        let raw: BTreeMap<String, Value> =
            serde_json::from_value(json!({"a": "x", "n": 3, "b": true})).unwrap();
        let fields = stringify_fields(raw);
        assert_eq!(fields["a"], "x");
        assert_eq!(fields["n"], "3");
        assert_eq!(fields["b"], "true");
    }

    #[test]
    fn test_url_building() {
        let settings = VaultSettings {
            address: "http://127.0.0.1:8200/".to_string(),
            ..Default::default()
        };
        let vault = HttpVault::new(&settings).unwrap();
        assert_eq!(vault.url("/sys/mounts"), "http://127.0.0.1:8200/v1/sys/mounts");
        assert_eq!(vault.address(), "http://127.0.0.1:8200");
    }
}
