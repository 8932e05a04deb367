//! Secret write and read-back

use crate::api::{KvMount, SecretFields, VaultApi};
use cloudlab_core::{LabError, Result};

/// Replace all fields stored at `path`.
///
/// Always writes, even when the stored value is already identical.
pub async fn put_secret(
    api: &dyn VaultApi,
    kv: &KvMount,
    path: &str,
    fields: &SecretFields,
) -> Result<()> {
    tracing::debug!("Writing {} field(s) to {}", fields.len(), kv.data_path(path));
    api.write_secret(kv, path, fields).await
}

/// Value of one field at `path`
pub async fn get_field(api: &dyn VaultApi, kv: &KvMount, path: &str, field: &str) -> Result<String> {
    let fields = api.read_secret(kv, path).await?;
    fields.get(field).cloned().ok_or_else(|| {
        LabError::Api(format!(
            "field '{}' missing at {}/{}",
            field,
            kv.path,
            path.trim_matches('/')
        ))
    })
}

/// Write `field = value`, read it back and require the exact same bytes
pub async fn round_trip(
    api: &dyn VaultApi,
    kv: &KvMount,
    path: &str,
    field: &str,
    value: &str,
) -> Result<String> {
    let fields: SecretFields = [(field.to_string(), value.to_string())].into_iter().collect();
    put_secret(api, kv, path, &fields).await?;

    let read = get_field(api, kv, path, field).await?;
    if read != value {
        return Err(LabError::Api(format!(
            "field '{}' at {}/{} does not match the written value",
            field,
            kv.path,
            path.trim_matches('/')
        )));
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryVault;

    fn vault() -> InMemoryVault {
        let vault = InMemoryVault::new();
        vault.set_token(InMemoryVault::ROOT_TOKEN);
        vault
    }

    #[tokio::test]
    async fn test_round_trip_is_byte_identical() {
        let vault = vault();
        let kv = KvMount::new("secret", 2);
        for value in ["hello", "", "ünïcødé ✓", "line\nbreak", "  padded  "] {
            let read = round_trip(&vault, &kv, "lab/demo", "message", value)
                .await
                .unwrap();
            assert_eq!(read, value);
        }
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let vault = vault();
        let kv = KvMount::new("secret", 2);
        let first: SecretFields = [
            ("message".to_string(), "one".to_string()),
            ("extra".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();
        put_secret(&vault, &kv, "lab/demo", &first).await.unwrap();
        round_trip(&vault, &kv, "lab/demo", "message", "two")
            .await
            .unwrap();

        assert_eq!(get_field(&vault, &kv, "lab/demo", "message").await.unwrap(), "two");
        assert!(get_field(&vault, &kv, "lab/demo", "extra").await.is_err());
        assert_eq!(vault.write_calls(), 2);
    }

    /// A mismatch names the field and path but never the values
    #[tokio::test]
    async fn test_mismatch_error_hides_values() {
        let vault = vault().mangle_reads();
        let kv = KvMount::new("secret", 2);

        let err = round_trip(&vault, &kv, "lab/demo", "message", "s3cr3t-value")
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("'message'"));
        assert!(message.contains("secret/lab/demo"));
        assert!(!message.contains("s3cr3t"));
    }

    #[tokio::test]
    async fn test_missing_mount_fails() {
        let vault = vault();
        let kv = KvMount::new("nope", 2);
        assert!(round_trip(&vault, &kv, "a", "b", "c").await.is_err());
    }
}
