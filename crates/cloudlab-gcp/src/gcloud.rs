//! gcloud CLI wrapper
//!
//! Every provisioning step is a single `gcloud` invocation. Creation calls
//! are not guarded by existence checks; a duplicate name fails the call.

use cloudlab_config::{DnsSettings, FirewallRuleSpec, InstanceSpec};
use cloudlab_core::{CommandRunner, Result};
use std::path::Path;
use std::sync::Arc;

const GCLOUD: &str = "gcloud";

/// Arguments for `compute instances create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub name: String,
    pub zone: String,
    pub machine_type: String,
    pub image_family: String,
    pub image_project: String,
    pub tags: Vec<String>,
    /// Boot-time payload attached as `startup-script` metadata
    pub startup_script: Option<String>,
}

impl InstanceRequest {
    pub fn new(spec: &InstanceSpec, machine_type: &str) -> Self {
        Self {
            name: spec.name.clone(),
            zone: spec.zone.clone(),
            machine_type: machine_type.to_string(),
            image_family: String::new(),
            image_project: String::new(),
            tags: Vec::new(),
            startup_script: None,
        }
    }

    pub fn image(mut self, family: &str, project: &str) -> Self {
        self.image_family = family.to_string();
        self.image_project = project.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn startup_script(mut self, script: impl Into<String>) -> Self {
        self.startup_script = Some(script.into());
        self
    }
}

/// gcloud CLI wrapper
#[derive(Clone)]
pub struct Gcloud {
    runner: Arc<dyn CommandRunner>,
    project: Option<String>,
}

impl Gcloud {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            project: None,
        }
    }

    /// Pin every project-scoped call to `project`
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Run gcloud with `--project` appended when one is pinned; returns stdout
    async fn run_command(&self, mut args: Vec<String>) -> Result<String> {
        if let Some(project) = &self.project {
            args.push(format!("--project={}", project));
        }
        self.runner.run_checked(GCLOUD, &args).await
    }

    /// Active project from the CLI's own configuration (may be empty or "(unset)")
    pub async fn config_project(&self) -> Result<String> {
        let output = self
            .runner
            .run_checked(
                GCLOUD,
                &cloudlab_core::args(["config", "get-value", "project"]),
            )
            .await?;
        Ok(output.trim().to_string())
    }

    /// Bucket URIs visible to the project, as listed (`gs://name/`)
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .run_command(cloudlab_core::args(["storage", "ls"]))
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("gs://"))
            .map(String::from)
            .collect())
    }

    pub async fn upload(&self, local: &Path, destination: &str) -> Result<()> {
        self.run_command(vec![
            "storage".to_string(),
            "cp".to_string(),
            local.display().to_string(),
            destination.to_string(),
        ])
        .await?;
        Ok(())
    }

    pub async fn enable_services(&self, apis: &[String]) -> Result<()> {
        let mut args = cloudlab_core::args(["services", "enable"]);
        args.extend(apis.iter().cloned());
        self.run_command(args).await?;
        Ok(())
    }

    pub async fn create_firewall_rule(&self, rule: &FirewallRuleSpec, network: &str) -> Result<()> {
        let mut args = vec![
            "compute".to_string(),
            "firewall-rules".to_string(),
            "create".to_string(),
            rule.name.clone(),
            format!("--network={}", network),
            format!("--allow={}", rule.allow.join(",")),
        ];
        if !rule.source_ranges.is_empty() {
            args.push(format!("--source-ranges={}", rule.source_ranges.join(",")));
        }
        if !rule.target_tags.is_empty() {
            args.push(format!("--target-tags={}", rule.target_tags.join(",")));
        }
        self.run_command(args).await?;
        Ok(())
    }

    pub async fn delete_firewall_rule(&self, name: &str) -> Result<()> {
        self.run_command(cloudlab_core::args([
            "compute",
            "firewall-rules",
            "delete",
            name,
            "--quiet",
        ]))
        .await?;
        Ok(())
    }

    pub async fn create_instance(&self, request: &InstanceRequest) -> Result<()> {
        let mut args = vec![
            "compute".to_string(),
            "instances".to_string(),
            "create".to_string(),
            request.name.clone(),
            format!("--zone={}", request.zone),
            format!("--machine-type={}", request.machine_type),
        ];
        if !request.image_family.is_empty() {
            args.push(format!("--image-family={}", request.image_family));
            args.push(format!("--image-project={}", request.image_project));
        }
        if !request.tags.is_empty() {
            args.push(format!("--tags={}", request.tags.join(",")));
        }
        if let Some(script) = &request.startup_script {
            args.push(metadata_arg("startup-script", script));
        }
        self.run_command(args).await?;
        Ok(())
    }

    pub async fn delete_instance(&self, name: &str, zone: &str) -> Result<()> {
        self.run_command(vec![
            "compute".to_string(),
            "instances".to_string(),
            "delete".to_string(),
            name.to_string(),
            format!("--zone={}", zone),
            "--quiet".to_string(),
        ])
        .await?;
        Ok(())
    }

    /// Primary internal IP of an instance
    pub async fn instance_internal_ip(&self, name: &str, zone: &str) -> Result<String> {
        let output = self
            .run_command(vec![
                "compute".to_string(),
                "instances".to_string(),
                "describe".to_string(),
                name.to_string(),
                format!("--zone={}", zone),
                "--format=value(networkInterfaces[0].networkIP)".to_string(),
            ])
            .await?;
        let ip = output.trim();
        if ip.is_empty() {
            return Err(cloudlab_core::LabError::Api(format!(
                "instance {} has no internal IP",
                name
            )));
        }
        Ok(ip.to_string())
    }

    pub async fn create_private_zone(&self, dns: &DnsSettings, network: &str) -> Result<()> {
        self.run_command(vec![
            "dns".to_string(),
            "managed-zones".to_string(),
            "create".to_string(),
            dns.zone_name.clone(),
            format!("--dns-name={}", dns.dns_name()),
            "--description=Geo routing lab".to_string(),
            "--visibility=private".to_string(),
            format!("--networks={}", network),
        ])
        .await?;
        Ok(())
    }

    pub async fn delete_zone(&self, zone_name: &str) -> Result<()> {
        self.run_command(cloudlab_core::args([
            "dns",
            "managed-zones",
            "delete",
            zone_name,
            "--quiet",
        ]))
        .await?;
        Ok(())
    }

    /// A record whose answer depends on the querying client's region
    pub async fn create_geo_record(
        &self,
        dns: &DnsSettings,
        routing_policy_data: &str,
    ) -> Result<()> {
        self.run_command(vec![
            "dns".to_string(),
            "record-sets".to_string(),
            "create".to_string(),
            dns.record_fqdn(),
            format!("--zone={}", dns.zone_name),
            "--type=A".to_string(),
            format!("--ttl={}", dns.ttl),
            "--routing-policy-type=GEO".to_string(),
            format!("--routing-policy-data={}", routing_policy_data),
        ])
        .await?;
        Ok(())
    }

    pub async fn delete_record(&self, dns: &DnsSettings, record_type: &str) -> Result<()> {
        self.run_command(vec![
            "dns".to_string(),
            "record-sets".to_string(),
            "delete".to_string(),
            dns.record_fqdn(),
            format!("--zone={}", dns.zone_name),
            format!("--type={}", record_type),
        ])
        .await?;
        Ok(())
    }
}

/// `--metadata=key=value`, switching the list delimiter when the value
/// contains commas (see `gcloud topic escaping`)
fn metadata_arg(key: &str, value: &str) -> String {
    if value.contains(',') {
        format!("--metadata=^|@|^{}={}", key, value)
    } else {
        format!("--metadata={}={}", key, value)
    }
}
