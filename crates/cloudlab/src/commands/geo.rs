use super::context;
use cloudlab::geo_flow::{cleanup, cleanup_plan, provision, provisioning_plan, test_instructions};
use cloudlab_config::LabConfig;
use cloudlab_core::Plan;
use cloudlab_gcp::detect_project;
use colored::Colorize;

fn print_plan(plan: &Plan) {
    println!("{} ({})", "Plan".bold(), plan.summary());
    for action in &plan.actions {
        let details: Vec<String> = action
            .details
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if details.is_empty() {
            println!("  {} {}", "•".dimmed(), action.description);
        } else {
            println!(
                "  {} {} {}",
                "•".dimmed(),
                action.description,
                format!("({})", details.join(", ")).dimmed()
            );
        }
    }
    println!();
}

pub async fn handle(config: LabConfig, cleanup_mode: bool, yes: bool, dry_run: bool) -> anyhow::Result<()> {
    let ctx = context(config, yes);
    let plan = if cleanup_mode {
        cleanup_plan(&ctx.config.geo)
    } else {
        provisioning_plan(&ctx.config.geo)
    };
    print_plan(&plan);
    if dry_run {
        println!("{}", "Dry run: nothing was changed".yellow());
        return Ok(());
    }

    let project = detect_project(&ctx.gcloud(), ctx.config.project.as_deref()).await?;
    let gcloud = ctx.gcloud().with_project(&project);

    if !cleanup_mode {
        let summary = provision(&ctx, &gcloud).await?;
        println!();
        println!("{}", "✓ Geo-routing lab provisioned".green().bold());
        println!("{}", test_instructions(&ctx.config.geo, &summary));
        return Ok(());
    }

    ctx.prompt.pause(&format!(
        "Delete {} resources in project {}? Press Enter to continue (Ctrl-C to abort) ",
        plan.actions.len(),
        project
    ))?;
    let result = cleanup(&ctx, &gcloud).await;

    println!();
    if result.is_success() {
        println!(
            "{} ({} deleted in {}ms)",
            "✓ Cleanup complete".green().bold(),
            result.succeeded.len(),
            result.duration_ms
        );
    } else {
        println!(
            "{} {} deleted, {} failed",
            "⚠ Cleanup finished with errors:".yellow().bold(),
            result.succeeded.len(),
            result.failed.len()
        );
        for failure in &result.failed {
            println!(
                "  {} {}: {}",
                "✗".red(),
                failure.action_id,
                failure.error.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(())
}
