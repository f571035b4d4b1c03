//! Command handlers.

use crate::launcher::Launcher;
use crate::render;
use anyhow::Context;
use devstack_core::mode;
use devstack_core::{format_warnings, ComposeEngine, DeploymentMode, DockerCompose, ModeDetector};
use devstack_upgrade::{UpgradeOptions, Upgrader};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

pub async fn upgrade(
    launcher: &Launcher,
    dir: &Path,
    options: UpgradeOptions,
) -> anyhow::Result<ExitCode> {
    let engine: Arc<dyn ComposeEngine> = Arc::new(DockerCompose::default());
    let (tx, rx) = mpsc::channel(32);
    let printer = tokio::spawn(render::print_events(rx));

    let upgrader =
        Upgrader::new(engine, launcher.resolver(), launcher.analyzer()).with_events(tx);
    let result = upgrader.run(dir, &options).await;

    // Dropping the upgrader closes the channel so the printer drains and exits.
    drop(upgrader);
    let _ = printer.await;

    let outcome = result.with_context(|| format!("Upgrade of {} failed", dir.display()))?;
    print!("{}", render::outcome(&outcome));
    Ok(ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1)))
}

pub async fn check(launcher: &Launcher, from: &str, to: &str, json: bool) -> anyhow::Result<ExitCode> {
    let check = launcher.analyzer().check(from, to).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else if check.breaking {
        println!("{} -> {}: breaking", check.from_version, check.to_version);
        print!("{}", format_warnings(&check));
    } else {
        println!("{} -> {}: no breaking changes", check.from_version, check.to_version);
        for warning in &check.warnings {
            println!("  ! {}", warning);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn mode_show(dir: &Path) -> anyhow::Result<ExitCode> {
    let detector = ModeDetector::new(Arc::new(DockerCompose::default()));
    let (mode, source) = detector.detect_with_source(dir).await;
    println!("{} (from {})", mode, source);
    Ok(ExitCode::SUCCESS)
}

pub fn mode_set(dir: &Path, value: &str) -> anyhow::Result<ExitCode> {
    let mode: DeploymentMode = value.parse()?;
    mode::save(dir, mode)?;
    info!("Mode set to {}", mode);
    Ok(ExitCode::SUCCESS)
}

pub async fn templates_list(launcher: &Launcher, version: &str) -> anyhow::Result<ExitCode> {
    let templates = launcher.distributor().list_templates(version).await?;
    for entry in templates {
        let frameworks = if entry.frameworks.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.frameworks.join(", "))
        };
        println!(
            "{:<20} {:>10}  {}{}",
            entry.name,
            render::size(entry.size),
            entry.description,
            frameworks
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn templates_download(
    launcher: &Launcher,
    name: &str,
    version: &str,
    dir: &Path,
) -> anyhow::Result<ExitCode> {
    let installed = launcher.distributor().download(name, version, dir).await?;
    println!(
        "Installed {} {} into {}{}",
        installed.name,
        installed.version,
        installed.target_dir.display(),
        if installed.from_cache { " (cached)" } else { "" }
    );
    Ok(ExitCode::SUCCESS)
}

pub fn cache_list(launcher: &Launcher) -> anyhow::Result<ExitCode> {
    let stats = launcher.cache().stats()?;
    println!("Cache root: {}", launcher.settings.cache_root.display());
    for ns in &stats.namespaces {
        let modified = ns
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:>5} entries {:>10}  {}",
            ns.namespace,
            ns.entry_count,
            render::size(ns.total_size_bytes),
            modified
        );
    }

    let manifests = launcher.fetcher().list_cached_versions()?;
    if !manifests.is_empty() {
        println!("Compatibility manifests: {}", manifests.join(", "));
    }
    let templates = launcher.distributor().list_cached_versions()?;
    if !templates.is_empty() {
        println!("Template manifests: {}", templates.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn cache_size(launcher: &Launcher) -> anyhow::Result<ExitCode> {
    let total = launcher.cache().size_bytes(None)?;
    println!("{}", render::size(total));
    Ok(ExitCode::SUCCESS)
}

pub fn cache_clear(launcher: &Launcher) -> anyhow::Result<ExitCode> {
    let removed = launcher.fetcher().clear_cache()? + launcher.distributor().clear_cache()?;
    println!("Removed {} cached entries", removed);
    Ok(ExitCode::SUCCESS)
}

pub fn cache_evict(launcher: &Launcher, template: &str, version: Option<&str>) -> anyhow::Result<ExitCode> {
    let removed = launcher.distributor().evict_template(template, version)?;
    println!("Removed {} cached archive(s) of {}", removed, template);
    Ok(ExitCode::SUCCESS)
}
