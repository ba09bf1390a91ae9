//! One-shot CLI commands.

use anyhow::Result;
use colored::Colorize;
use comfy_table::Table;
use std::path::Path;

use poolsync_core::modules::config as core_config;
use poolsync_types::AppConfig;

pub fn check_config(path: &Path, json: bool) -> Result<()> {
    let config = core_config::load_config_from(path)?;

    if json {
        println!("{}", redacted_json(&config)?);
        return Ok(());
    }

    println!("{} {}", "✓ Configuration valid:".green().bold(), path.display());
    println!("{}", config_table(&config));
    Ok(())
}

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    core_config::save_config(path, &AppConfig::default())?;
    println!("{} Wrote default configuration to {}", "✓".green(), path.display());
    Ok(())
}

const PASSWORD_MASK: &str = "********";

fn redacted_json(config: &AppConfig) -> Result<String> {
    let mut shown = config.clone();
    if !shown.gateway.password.is_empty() {
        shown.gateway.password = PASSWORD_MASK.to_string();
    }
    Ok(serde_json::to_string_pretty(&shown)?)
}

fn config_table(config: &AppConfig) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);

    let password = if config.gateway.password.is_empty() { "(empty)" } else { PASSWORD_MASK };
    let block_url = config.report.block_base_url.as_deref().unwrap_or("(log only)");

    table.add_row(vec!["server.listen".to_string(), config.server.socket_addr()]);
    table.add_row(vec!["gateway.base_url".to_string(), config.gateway.base_url.clone()]);
    table.add_row(vec!["gateway.username".to_string(), config.gateway.username.clone()]);
    table.add_row(vec!["gateway.password".to_string(), password.to_string()]);
    table.add_row(vec!["gateway.partition".to_string(), config.gateway.partition.clone()]);
    table.add_row(vec![
        "gateway.request_timeout_ms".to_string(),
        config.gateway.request_timeout_ms.to_string(),
    ]);
    table.add_row(vec!["registry.base_url".to_string(), config.registry.base_url.clone()]);
    table.add_row(vec!["registry.namespace".to_string(), config.registry.namespace.clone()]);
    table.add_row(vec!["registry.page_size".to_string(), config.registry.page_size.to_string()]);
    table.add_row(vec![
        "watcher.poll_interval_secs".to_string(),
        config.watcher.poll_interval_secs.to_string(),
    ]);
    table.add_row(vec![
        "watcher.resolve_members".to_string(),
        config.watcher.resolve_members.to_string(),
    ]);
    table.add_row(vec!["report.block_base_url".to_string(), block_url.to_string()]);
    table
}
