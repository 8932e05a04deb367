use super::context;
use cloudlab::vault_flow;
use cloudlab_config::LabConfig;
use cloudlab_vault::{HttpVault, ServerStart};
use colored::Colorize;

pub async fn handle(config: LabConfig, yes: bool) -> anyhow::Result<()> {
    let ctx = context(config, yes);
    let api = HttpVault::new(&ctx.config.vault)?;

    let summary = vault_flow::run(&ctx, &api).await?;

    println!();
    println!("{}", "✓ Vault lab ready".green().bold());
    println!("  {} {}", "address:".bold(), api.address().cyan());
    if let ServerStart::Started { pid, root_token } = &summary.server {
        println!("  {} {}", "pid:".bold(), pid);
        println!("  {} {}", "root token:".bold(), root_token.cyan());
        println!("  {} {}", "log:".bold(), ctx.config.vault.log_path);
    }
    println!("  {} {}", "project:".bold(), summary.project);
    println!("  {} {}", "artifact:".bold(), summary.artifact.display());
    match &summary.uploaded_to {
        Some(uri) => println!("  {} {}", "uploaded:".bold(), uri.cyan()),
        None => println!("  {} {}", "uploaded:".bold(), "no (see above)".yellow()),
    }
    for resource in &summary.resources {
        println!(
            "  {} {} '{}' ({})",
            "•".dimmed(),
            resource.kind,
            resource.id,
            resource.outcome
        );
    }
    Ok(())
}
