//! Project and bucket auto-detection

use crate::gcloud::Gcloud;
use cloudlab_core::{LabError, Result};

const UNSET: &str = "(unset)";

/// Active project: `override_project` when given, otherwise the CLI's
/// configured project.
pub async fn detect_project(gcloud: &Gcloud, override_project: Option<&str>) -> Result<String> {
    if let Some(project) = override_project.map(str::trim).filter(|p| !p.is_empty()) {
        tracing::debug!("Using configured project {}", project);
        return Ok(project.to_string());
    }

    let project = gcloud.config_project().await?;
    if project.is_empty() || project == UNSET {
        return Err(LabError::ConfigurationMissing(
            "no active project; run `gcloud config set project <id>` or set CLOUDSDK_CORE_PROJECT"
                .to_string(),
        ));
    }
    Ok(project)
}

/// Prefer a bucket whose name contains the project id, else the first listed
pub fn select_bucket(project: &str, buckets: &[String]) -> Option<String> {
    buckets
        .iter()
        .find(|b| bucket_name(b).contains(project))
        .or_else(|| buckets.first())
        .cloned()
}

fn bucket_name(uri: &str) -> &str {
    uri.trim_start_matches("gs://").trim_end_matches('/')
}

/// Upload target for the project, or `None` when nothing usable is listed.
///
/// A failed listing is treated like an empty one; the caller degrades to
/// manual instructions either way.
pub async fn detect_bucket(gcloud: &Gcloud, project: &str) -> Option<String> {
    match gcloud.list_buckets().await {
        Ok(buckets) => select_bucket(project, &buckets),
        Err(e) => {
            tracing::warn!("Bucket listing failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudlab_core::testing::RecordingRunner;
    use std::sync::Arc;

    fn buckets(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_name_match_preferred_over_first_listed() {
        let listed = buckets(&["gs://other-bucket/", "gs://demo-proj-assets/"]);
        assert_eq!(
            select_bucket("demo-proj", &listed),
            Some("gs://demo-proj-assets/".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_first_bucket() {
        let listed = buckets(&["gs://first/", "gs://second/"]);
        assert_eq!(select_bucket("demo-proj", &listed), Some("gs://first/".to_string()));
        assert_eq!(select_bucket("demo-proj", &[]), None);
    }

    #[tokio::test]
    async fn test_unset_project_is_configuration_missing() {
        let runner = Arc::new(RecordingRunner::new().respond_ok(&["get-value", "project"], "(unset)\n"));
        let err = detect_project(&Gcloud::new(runner), None).await.unwrap_err();
        assert!(matches!(err, LabError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_empty_project_is_configuration_missing() {
        let runner = Arc::new(RecordingRunner::new());
        let err = detect_project(&Gcloud::new(runner), None).await.unwrap_err();
        assert!(matches!(err, LabError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_override_skips_cli() {
        let runner = Arc::new(RecordingRunner::new());
        let project = detect_project(&Gcloud::new(runner.clone()), Some("lab-proj"))
            .await
            .unwrap();
        assert_eq!(project, "lab-proj");
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_listing_degrades_to_none() {
        let runner = Arc::new(
            RecordingRunner::new().fail_on(&["storage", "ls"], "AccessDeniedException: 403"),
        );
        let gcloud = Gcloud::new(runner).with_project("demo-proj");
        assert_eq!(detect_bucket(&gcloud, "demo-proj").await, None);
    }

    #[tokio::test]
    async fn test_detect_bucket_from_listing() {
        let runner = Arc::new(RecordingRunner::new().respond_ok(
            &["storage", "ls"],
            "gs://other-bucket/\ngs://demo-proj-assets/\n",
        ));
        let gcloud = Gcloud::new(runner).with_project("demo-proj");
        assert_eq!(
            detect_bucket(&gcloud, "demo-proj").await,
            Some("gs://demo-proj-assets/".to_string())
        );
    }
}
