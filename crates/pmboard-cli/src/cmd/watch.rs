use crate::cmd::load_config;
use crate::output::display_path;
use pmboard_core::config::Config;
use pmboard_core::watch::MtimeWatcher;
use pmboard_core::{dashboard, docs};
use std::path::Path;
use std::time::Duration;

pub fn run(root: &Path, interval: f64) -> anyhow::Result<()> {
    if !interval.is_finite() || interval <= 0.0 {
        anyhow::bail!("--interval must be a positive number of seconds, got {interval}");
    }
    let config = load_config(root)?;
    let roots = vec![
        root.join(&config.layout.docs_dir),
        root.join(&config.layout.projects_dir),
    ];
    let mut watcher = MtimeWatcher::new(roots)?;
    let interval = Duration::from_secs_f64(interval);

    let watched: Vec<String> = watcher
        .roots()
        .iter()
        .map(|p| display_path(root, p))
        .collect();
    println!(
        "Watching {} for changes (Ctrl+C to stop)...",
        watched.join(", ")
    );

    loop {
        std::thread::sleep(interval);
        match watcher.poll() {
            Ok(true) => render_once(root, &config),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "failed to scan markdown sources"),
        }
    }
}

fn render_once(root: &Path, config: &Config) {
    tracing::info!("markdown changed, rendering");
    match docs::render_tree(root, &config.layout) {
        Ok(pages) => tracing::info!(pages = pages.len(), "docs rendered"),
        Err(e) => tracing::error!(error = %e, "docs render failed"),
    }
    match dashboard::render_dashboards(root, &config.layout, false) {
        Ok(report) => tracing::info!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            "dashboards rendered"
        ),
        Err(e) => tracing::error!(error = %e, "dashboard render failed"),
    }
}
