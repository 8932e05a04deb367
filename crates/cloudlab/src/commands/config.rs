use cloudlab_config::LabConfig;
use std::path::Path;

/// Print the resolved configuration as YAML, credentials masked
pub fn handle(config: &LabConfig, source: Option<&Path>) -> anyhow::Result<()> {
    match source {
        Some(path) => println!("# source: {}", path.display()),
        None => println!("# source: built-in defaults"),
    }
    print!("{}", serde_yaml::to_string(&config.redacted())?);
    Ok(())
}
