//! Planned actions and their outcomes

use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single planned create or delete against an external resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (e.g. "delete-instance-geo-server-us")
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Kind of the target resource
    pub kind: ResourceKind,

    /// Resource identifier
    pub resource_id: String,

    /// Human readable description
    pub description: String,

    /// Extra arguments needed to execute the action (zone, DNS zone, ...)
    pub details: BTreeMap<String, String>,
}

impl Action {
    pub fn new(action_type: ActionType, kind: ResourceKind, resource_id: impl Into<String>) -> Self {
        let resource_id = resource_id.into();
        let slug = kind.to_string().replace(' ', "-").to_lowercase();
        Self {
            id: format!("{}-{}-{}", action_type, slug, resource_id),
            description: format!("{} {} {}", action_type, kind, resource_id),
            action_type,
            kind,
            resource_id,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Delete,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Delete => write!(f, "delete"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of actions attempted, successful or not
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

/// Ordered list of actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn actions_by_kind(&self, kind: ResourceKind) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.kind == kind).collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub delete: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to create, {} to delete", self.create, self.delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_ids() {
        let action = Action::new(ActionType::Delete, ResourceKind::DnsZone, "geo-lab-zone");
        assert_eq!(action.id, "delete-dns-zone-geo-lab-zone");
        assert_eq!(action.description, "delete DNS zone geo-lab-zone");
    }

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            Action::new(ActionType::Create, ResourceKind::Instance, "a"),
            Action::new(ActionType::Create, ResourceKind::Instance, "b"),
            Action::new(ActionType::Delete, ResourceKind::DnsRecord, "geo"),
        ]);
        assert_eq!(plan.summary().to_string(), "2 to create, 1 to delete");
        assert_eq!(plan.actions_by_kind(ResourceKind::Instance).len(), 2);
    }

    #[test]
    fn test_apply_result_counts() {
        let mut result = ApplyResult::new();
        result.add_success("a".into(), "ok".into());
        result.add_failure("b".into(), "boom".into());
        assert_eq!(result.attempted(), 2);
        assert!(!result.is_success());
    }
}
