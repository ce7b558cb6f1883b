use crate::cmd::load_config;
use crate::output::{display_path, print_json, print_paths};
use anyhow::Context;
use clap::Args;
use pmboard_core::config::LayoutConfig;
use pmboard_core::dashboard::{self, RenderReport};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RenderArgs {
    /// Project plan source markdown
    #[arg(long)]
    pub projectplan: Option<PathBuf>,
    /// Issue log (JSONL) used for open-bug counts
    #[arg(long)]
    pub issues: Option<PathBuf>,
    /// PM dashboard HTML page
    #[arg(long)]
    pub pm: Option<PathBuf>,
    /// UI directory containing project_<slug>.html
    #[arg(long)]
    pub ui: Option<PathBuf>,
    /// Print actions without writing files
    #[arg(long)]
    pub dry_run: bool,
}

impl RenderArgs {
    fn apply(self, layout: &mut LayoutConfig) -> bool {
        if let Some(p) = self.projectplan {
            layout.projectplan = p;
        }
        if let Some(p) = self.issues {
            layout.issues_log = p;
        }
        if let Some(p) = self.pm {
            layout.pm_page = p;
        }
        if let Some(p) = self.ui {
            layout.ui_dir = p;
        }
        self.dry_run
    }
}

pub fn run(root: &Path, args: RenderArgs, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(root)?;
    let dry_run = args.apply(&mut config.layout);

    let report = dashboard::render_dashboards(root, &config.layout, dry_run)
        .context("failed to render dashboards")?;

    if json {
        return print_json(&report);
    }
    print_report(root, &report);
    Ok(())
}

pub fn print_report(root: &Path, report: &RenderReport) {
    for path in &report.skipped {
        println!("[skip] missing {}", display_path(root, path));
    }
    if report.dry_run {
        for path in &report.updated {
            println!("[dry-run] update {}", display_path(root, path));
        }
        return;
    }
    if report.updated.is_empty() {
        println!("No updates needed.");
    } else {
        print_paths(root, "Updated:", &report.updated);
    }
}
