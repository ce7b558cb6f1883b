mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, issues::IssuesSubcommand, project::ProjectSubcommand,
    render::RenderArgs,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pmboard",
    about = "Markdown-driven PM dashboards: patch HTML pages, export issues, render doc trees",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .pmboard/ or .git/)
    #[arg(long, global = true, env = "PMBOARD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch the PM dashboard and project detail pages from the project docs
    Render(RenderArgs),

    /// Validate and export the issue log
    Issues {
        #[command(subcommand)]
        subcommand: IssuesSubcommand,
    },

    /// Render support and project markdown into standalone HTML pages
    Docs {
        /// Support docs root
        #[arg(long)]
        support: Option<PathBuf>,
        /// Projects root
        #[arg(long)]
        projects: Option<PathBuf>,
        /// Output HTML root
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Watch markdown sources and re-render docs and dashboards on change
    Watch {
        /// Polling interval in seconds
        #[arg(long, default_value = "1.0")]
        interval: f64,
    },

    /// Scaffold projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Show or validate .pmboard/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Watch { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Render(args) => cmd::render::run(&root, args, cli.json),
        Commands::Issues { subcommand } => cmd::issues::run(&root, subcommand, cli.json),
        Commands::Docs {
            support,
            projects,
            out,
        } => cmd::docs::run(&root, support, projects, out, cli.json),
        Commands::Watch { interval } => cmd::watch::run(&root, interval),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
