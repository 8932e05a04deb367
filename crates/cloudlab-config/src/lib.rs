pub mod error;
pub mod settings;

pub use error::*;
pub use settings::*;

use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "CLOUDLAB_CONFIG";
const CANDIDATES: [&str; 2] = ["cloudlab.yaml", ".cloudlab.yaml"];

/// Global config directory (~/.config/cloudlab)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("cloudlab"))
}

/// Find the configuration file.
///
/// Search order:
/// 1. `CLOUDLAB_CONFIG` environment variable (direct path)
/// 2. Current directory: cloudlab.yaml, .cloudlab.yaml
/// 3. ~/.config/cloudlab/cloudlab.yaml
///
/// Returns `None` when no file exists; the built-in defaults apply then.
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!("{} points to a missing file: {}", CONFIG_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("cloudlab.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Parse a config file; missing keys take their defaults
pub fn load_from_file(path: &Path) -> Result<LabConfig> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(LabConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Discover, parse, apply environment overrides and validate.
///
/// Also returns the file that was used, if any.
pub fn load() -> Result<(LabConfig, Option<PathBuf>)> {
    let path = find_config_file()?;
    let mut config = match &path {
        Some(p) => {
            tracing::debug!("Loading config from {}", p.display());
            load_from_file(p)?
        }
        None => LabConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_config_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("cloudlab.yaml"), "# test").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_ENV, find_config_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().unwrap().ends_with("cloudlab.yaml"));
    }

    #[test]
    #[serial]
    fn test_visible_file_wins_over_hidden() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join(".cloudlab.yaml"), "# hidden").unwrap();
        fs::write(temp_dir.path().join("cloudlab.yaml"), "# visible").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_ENV, find_config_file);

        std::env::set_current_dir(original_dir).unwrap();
        let path = result.unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "cloudlab.yaml");
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "vault:\n  transit_key: custom-key\n").unwrap();

        let (config, used) = temp_env::with_vars(
            [
                (CONFIG_ENV, Some(config_path.to_str().unwrap())),
                ("VAULT_ADDR", None),
                ("VAULT_TOKEN", None),
                ("CLOUDSDK_CORE_PROJECT", None),
            ],
            || load().unwrap(),
        );

        assert_eq!(used, Some(config_path));
        assert_eq!(config.vault.transit_key, "custom-key");
    }

    #[test]
    #[serial]
    fn test_invalid_file_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("broken.yaml");
        fs::write(&config_path, "vault: [unclosed").unwrap();

        let err = load_from_file(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    #[serial]
    fn test_validation_runs_on_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("cloudlab.yaml");
        fs::write(&config_path, "vault:\n  token_attempts: 0\n").unwrap();

        let result = temp_env::with_var(CONFIG_ENV, Some(config_path.to_str().unwrap()), load);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
