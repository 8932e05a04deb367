//! Geo-routing DNS lab flow
//!
//! Provisioning is strictly ordered:
//!
//! ```text
//! APIs → firewall rules → instances → server IPs → private zone → geo record
//! ```
//!
//! Creation calls are not guarded; re-running without cleanup fails on the
//! first duplicate. Cleanup deletes everything provisioning creates, in
//! reverse order, and keeps going when a deletion fails.

use crate::context::LabContext;
use cloudlab_config::{GeoSettings, InstanceSpec};
use cloudlab_core::{
    Action, ActionType, ApplyResult, LabError, Plan, Reporter, ResourceKind, Result,
};
use cloudlab_gcp::{Gcloud, InstanceRequest, routing_policy_data, startup_scripts};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

const ZONE: &str = "zone";
const ROLE: &str = "role";
const DNS_ZONE: &str = "dns_zone";
const RECORD_TYPE: &str = "A";

/// What a successful provisioning run created
#[derive(Debug, Clone)]
pub struct GeoSummary {
    pub project: String,
    /// Server region → internal addresses
    pub server_addresses: BTreeMap<String, Vec<String>>,
    pub routing_policy: String,
    pub record_fqdn: String,
}

fn instance_action(action_type: ActionType, spec: &InstanceSpec, role: &str) -> Action {
    Action::new(action_type, ResourceKind::Instance, &spec.name)
        .with_detail(ZONE, &spec.zone)
        .with_detail(ROLE, role)
}

/// Everything `provision` creates, in creation order
pub fn provisioning_plan(geo: &GeoSettings) -> Plan {
    let mut actions = Vec::new();
    for api in &geo.apis {
        actions.push(Action::new(ActionType::Create, ResourceKind::ServiceApi, api));
    }
    for rule in &geo.firewall_rules {
        actions.push(Action::new(
            ActionType::Create,
            ResourceKind::FirewallRule,
            &rule.name,
        ));
    }
    for client in &geo.clients {
        actions.push(instance_action(ActionType::Create, client, "client"));
    }
    for server in &geo.servers {
        actions.push(instance_action(ActionType::Create, server, "server"));
    }
    actions.push(Action::new(
        ActionType::Create,
        ResourceKind::DnsZone,
        &geo.dns.zone_name,
    ));
    actions.push(
        Action::new(
            ActionType::Create,
            ResourceKind::DnsRecord,
            geo.dns.record_fqdn(),
        )
        .with_detail(DNS_ZONE, &geo.dns.zone_name),
    );
    Plan::new(actions)
}

/// Deletions undoing `provisioning_plan`, in reverse order.
///
/// Enabled APIs are left enabled.
pub fn cleanup_plan(geo: &GeoSettings) -> Plan {
    let actions = provisioning_plan(geo)
        .actions
        .into_iter()
        .rev()
        .filter(|a| a.kind != ResourceKind::ServiceApi)
        .map(|a| {
            let mut delete = Action::new(ActionType::Delete, a.kind, &a.resource_id);
            delete.details = a.details;
            delete
        })
        .collect();
    Plan::new(actions)
}

/// Run one creation call, naming the resource when the CLI rejects it
async fn create_step<F>(reporter: &dyn Reporter, kind: ResourceKind, id: &str, call: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    reporter.info(&format!("Creating {} {}", kind, id));
    call.await.map_err(|e| match e {
        LabError::CommandFailed { stderr, .. } => LabError::ResourceCreationFailure {
            kind,
            id: id.to_string(),
            reason: stderr,
        },
        other => other,
    })
}

fn instance_request(geo: &GeoSettings, spec: &InstanceSpec, tag: &str) -> InstanceRequest {
    InstanceRequest::new(spec, &geo.machine_type)
        .image(&geo.image_family, &geo.image_project)
        .tag(tag)
}

pub async fn provision(ctx: &LabContext, gcloud: &Gcloud) -> Result<GeoSummary> {
    let geo = &ctx.config.geo;
    let reporter = ctx.reporter.as_ref();
    let project = gcloud.project().unwrap_or_default().to_string();

    for api in &geo.apis {
        create_step(
            reporter,
            ResourceKind::ServiceApi,
            api,
            gcloud.enable_services(std::slice::from_ref(api)),
        )
        .await?;
    }

    for rule in &geo.firewall_rules {
        create_step(
            reporter,
            ResourceKind::FirewallRule,
            &rule.name,
            gcloud.create_firewall_rule(rule, &geo.network),
        )
        .await?;
    }

    for client in &geo.clients {
        let request = instance_request(geo, client, &geo.client_tag);
        create_step(
            reporter,
            ResourceKind::Instance,
            &client.name,
            gcloud.create_instance(&request),
        )
        .await?;
    }

    for server in &geo.servers {
        let request = instance_request(geo, server, &geo.server_tag)
            .startup_script(startup_scripts::web_responder(server.region()));
        create_step(
            reporter,
            ResourceKind::Instance,
            &server.name,
            gcloud.create_instance(&request),
        )
        .await?;
    }

    let mut server_addresses: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for server in &geo.servers {
        let ip = gcloud
            .instance_internal_ip(&server.name, &server.zone)
            .await?;
        reporter.info(&format!("{} ({}): {}", server.name, server.region(), ip));
        server_addresses
            .entry(server.region().to_string())
            .or_default()
            .push(ip);
    }

    create_step(
        reporter,
        ResourceKind::DnsZone,
        &geo.dns.zone_name,
        gcloud.create_private_zone(&geo.dns, &geo.network),
    )
    .await?;

    let routing_policy = routing_policy_data(&server_addresses);
    let record_fqdn = geo.dns.record_fqdn();
    create_step(
        reporter,
        ResourceKind::DnsRecord,
        &record_fqdn,
        gcloud.create_geo_record(&geo.dns, &routing_policy),
    )
    .await?;

    Ok(GeoSummary {
        project,
        server_addresses,
        routing_policy,
        record_fqdn,
    })
}

async fn delete(gcloud: &Gcloud, geo: &GeoSettings, action: &Action) -> Result<()> {
    match action.kind {
        ResourceKind::DnsRecord => gcloud.delete_record(&geo.dns, RECORD_TYPE).await,
        ResourceKind::DnsZone => gcloud.delete_zone(&action.resource_id).await,
        ResourceKind::Instance => {
            let zone = action.detail(ZONE).ok_or_else(|| {
                LabError::Api(format!("no zone recorded for {}", action.resource_id))
            })?;
            gcloud.delete_instance(&action.resource_id, zone).await
        }
        ResourceKind::FirewallRule => gcloud.delete_firewall_rule(&action.resource_id).await,
        other => Err(LabError::Api(format!("cannot delete a {}", other))),
    }
}

/// Attempt every deletion of `cleanup_plan`; failures are collected, not returned
pub async fn cleanup(ctx: &LabContext, gcloud: &Gcloud) -> ApplyResult {
    let geo = &ctx.config.geo;
    let reporter = ctx.reporter.as_ref();
    let started = Instant::now();
    let mut result = ApplyResult::new();

    for action in cleanup_plan(geo).actions {
        reporter.info(&format!("Deleting {} {}", action.kind, action.resource_id));
        match delete(gcloud, geo, &action).await {
            Ok(()) => result.add_success(action.id, action.description),
            Err(e) => {
                reporter.advisory(&format!(
                    "Failed to delete {} {}: {}",
                    action.kind, action.resource_id, e
                ));
                result.add_failure(action.id, e.to_string());
            }
        }
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}

/// Manual verification steps printed after provisioning
pub fn test_instructions(geo: &GeoSettings, summary: &GeoSummary) -> String {
    let mut lines = vec![
        format!("Geo record {} routes:", summary.record_fqdn),
    ];
    for (region, ips) in &summary.server_addresses {
        lines.push(format!("  {} -> {}", region, ips.join(", ")));
    }
    lines.push(String::new());
    lines.push("Startup scripts take a minute or two. Then, from each client:".to_string());
    for client in &geo.clients {
        lines.push(format!(
            "  gcloud compute ssh {} --zone={} --tunnel-through-iap -- curl -s http://{}",
            client.name,
            client.zone,
            summary.record_fqdn.trim_end_matches('.')
        ));
    }
    lines.push(String::new());
    lines.push(
        "Each client should be answered by the server in the nearest region.".to_string(),
    );
    lines.push("Tear everything down with: lab geo cleanup".to_string());
    lines.join("\n")
}
