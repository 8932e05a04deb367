//! Vault bootstrap flow
//!
//! project/bucket detection → dev server → token → KV engine → secret
//! round-trip → artifact upload → userpass identity → transit key.
//! Every step is fatal except the upload, which degrades to printed
//! instructions when no bucket is available.

use crate::context::LabContext;
use cloudlab_core::{EnsureOutcome, Reporter, ResourceKind, Result, ensure};
use cloudlab_gcp::{detect_bucket, detect_project};
use cloudlab_vault::{
    Identity, KvMount, ServerStart, VaultApi, VaultResource, VaultTarget, acquire_token,
    round_trip, start_dev_server,
};
use std::path::{Path, PathBuf};

/// One ensured Vault object and what happened to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredResource {
    pub kind: ResourceKind,
    pub id: String,
    pub outcome: EnsureOutcome,
}

/// What a successful run did
#[derive(Debug, Clone)]
pub struct VaultSummary {
    pub project: String,
    pub server: ServerStart,
    /// Value read back from Vault
    pub secret_value: String,
    /// Local file holding the value
    pub artifact: PathBuf,
    /// Object URI the artifact was uploaded to; `None` in degraded mode
    pub uploaded_to: Option<String>,
    pub resources: Vec<EnsuredResource>,
}

impl VaultSummary {
    pub fn created(&self) -> usize {
        self.resources
            .iter()
            .filter(|r| r.outcome == EnsureOutcome::Created)
            .count()
    }
}

async fn ensure_resource(
    api: &dyn VaultApi,
    reporter: &dyn Reporter,
    resource: VaultResource,
    ensured: &mut Vec<EnsuredResource>,
) -> Result<()> {
    let kind = resource.kind();
    let id = resource.identifier().to_string();
    let outcome = ensure(&VaultTarget::new(api, resource)).await?;
    reporter.info(&format!("{} '{}': {}", kind, id, outcome));
    ensured.push(EnsuredResource { kind, id, outcome });
    Ok(())
}

async fn write_artifact(path: &Path, value: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, value).await?;
    Ok(())
}

/// `gs://bucket/` + artifact file name
fn upload_destination(bucket: &str, artifact: &Path) -> String {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "secret.txt".to_string());
    format!("{}/{}", bucket.trim_end_matches('/'), name)
}

pub async fn run(ctx: &LabContext, api: &dyn VaultApi) -> Result<VaultSummary> {
    let settings = &ctx.config.vault;
    let reporter = ctx.reporter.as_ref();

    let project = detect_project(&ctx.gcloud(), ctx.config.project.as_deref()).await?;
    let gcloud = ctx.gcloud().with_project(&project);
    reporter.info(&format!("Project: {}", project));

    let bucket = detect_bucket(&gcloud, &project).await;
    match &bucket {
        Some(bucket) => reporter.info(&format!("Upload target: {}", bucket)),
        None => reporter.advisory(&format!(
            "No storage bucket found in project {}; the secret will only be saved locally",
            project
        )),
    }

    let server = start_dev_server(api, ctx.runner.as_ref(), settings, reporter).await?;

    let default_token = server
        .root_token()
        .map(str::to_string)
        .or_else(|| settings.token.clone())
        .or_else(|| settings.root_token.clone());
    acquire_token(
        api,
        ctx.prompt.as_ref(),
        reporter,
        default_token.as_deref(),
        settings.token_attempts,
    )
    .await?;

    let mut resources = Vec::new();
    ensure_resource(
        api,
        reporter,
        VaultResource::kv_engine(&settings.secret_mount, settings.kv_version),
        &mut resources,
    )
    .await?;

    // Overwritten on every run
    let kv = KvMount::new(&settings.secret_mount, settings.kv_version);
    let secret_value = round_trip(
        api,
        &kv,
        &settings.secret_path,
        &settings.secret_field,
        &settings.secret_value,
    )
    .await?;
    reporter.info(&format!(
        "Secret {}/{} written and read back",
        kv.path,
        settings.secret_path.trim_matches('/')
    ));

    let artifact = PathBuf::from(&settings.artifact_path);
    write_artifact(&artifact, &secret_value).await?;
    reporter.info(&format!("Saved secret to {}", artifact.display()));

    let uploaded_to = match bucket {
        Some(bucket) => {
            let destination = upload_destination(&bucket, &artifact);
            gcloud.upload(&artifact, &destination).await?;
            reporter.info(&format!("Uploaded to {}", destination));
            Some(destination)
        }
        None => {
            reporter.advisory(&format!(
                "Upload skipped. Create a bucket and run: gcloud storage cp {} gs://<bucket>/",
                artifact.display()
            ));
            None
        }
    };

    ensure_resource(
        api,
        reporter,
        VaultResource::auth_method(&settings.auth_method),
        &mut resources,
    )
    .await?;
    ensure_resource(
        api,
        reporter,
        VaultResource::identity(&settings.auth_method, Identity::from(&settings.demo_user)),
        &mut resources,
    )
    .await?;

    ensure_resource(
        api,
        reporter,
        VaultResource::transit_engine(&settings.transit_mount),
        &mut resources,
    )
    .await?;
    ensure_resource(
        api,
        reporter,
        VaultResource::TransitKey {
            mount: settings.transit_mount.clone(),
            name: settings.transit_key.clone(),
        },
        &mut resources,
    )
    .await?;

    Ok(VaultSummary {
        project,
        server,
        secret_value,
        artifact,
        uploaded_to,
        resources,
    })
}
