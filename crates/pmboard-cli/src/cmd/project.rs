use crate::cmd::load_config;
use crate::output::{print_json, print_paths};
use anyhow::Context;
use clap::Subcommand;
use pmboard_core::scaffold::{self, InitOptions};
use std::path::Path;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Create the markdown skeleton for a new project and register it
    Init {
        /// Project slug (snake_case)
        #[arg(long)]
        project: String,
        /// Display title (defaults to the slug in title case)
        #[arg(long)]
        title: Option<String>,
        /// Project owner name
        #[arg(long, default_value = "unassigned")]
        owner: String,
        /// Short purpose statement
        #[arg(long, default_value = "TBD")]
        purpose: String,
        /// Current goal statement
        #[arg(long)]
        goal: Option<String>,
        /// Phase 01 name
        #[arg(long, default_value = "Foundation")]
        phase_name: String,
        /// Stage name for phase 01
        #[arg(long, default_value = "foundation")]
        stage_name: String,
        /// Issue ID prefix to register (e.g. BMG)
        #[arg(long)]
        prefix: Option<String>,
        /// Skip updating the project plan
        #[arg(long)]
        no_projectplan: bool,
        /// Skip the PM page row and the project detail page
        #[arg(long)]
        no_ui: bool,
        /// Print actions without writing files
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::Init {
            project,
            title,
            owner,
            purpose,
            goal,
            phase_name,
            stage_name,
            prefix,
            no_projectplan,
            no_ui,
            dry_run,
        } => {
            let opts = InitOptions {
                slug: project,
                title,
                owner,
                purpose,
                goal,
                phase_name,
                stage_name,
                prefix,
                update_plan: !no_projectplan,
                update_ui: !no_ui,
                dry_run,
            };
            init(root, &opts, json)
        }
    }
}

fn init(root: &Path, opts: &InitOptions, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(root)?;
    let today = chrono::Local::now().date_naive();
    let report = scaffold::init_project(root, &mut config, opts, today)
        .with_context(|| format!("failed to initialize project '{}'", opts.slug))?;

    if json {
        return print_json(&report);
    }
    if report.dry_run {
        for path in report.created.iter().chain(&report.updated) {
            println!("[dry-run] write {}", crate::output::display_path(root, path));
        }
        return Ok(());
    }
    print_paths(root, "Project initialized:", &report.created);
    print_paths(root, "Updated:", &report.updated);
    println!("Next steps:");
    if opts.update_ui {
        println!(
            "  - Review the PM page and the new project_{}.html detail page.",
            report.slug
        );
    }
    println!("  - Run `pmboard docs` to refresh the rendered doc pages.");
    println!("  - Run `pmboard issues list` to regenerate exports if prefixes changed.");
    Ok(())
}
