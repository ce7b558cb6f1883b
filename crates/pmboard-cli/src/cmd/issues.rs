use crate::cmd::load_config;
use crate::output::{display_path, print_json};
use anyhow::Context;
use clap::{Subcommand, ValueEnum};
use pmboard_core::issue::{self, ExportFormat};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum IssuesSubcommand {
    /// Validate, sort and export the issue log as JSON or HTML
    List {
        /// Path to the JSONL store
        #[arg(long)]
        data: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Output file path (default: configured export path for the format)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Json,
    Html,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => ExportFormat::Json,
            Format::Html => ExportFormat::Html,
        }
    }
}

pub fn run(root: &Path, subcmd: IssuesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        IssuesSubcommand::List {
            data,
            format,
            output,
        } => list(root, data, format, output, json),
    }
}

fn list(
    root: &Path,
    data: Option<PathBuf>,
    format: Format,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let data = data.unwrap_or_else(|| config.layout.issues_log.clone());
    let summary = issue::export(root, &config, &data, format.into(), output.as_deref())
        .with_context(|| format!("failed to export {}", data.display()))?;

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Exported {} issues to {}",
            summary.issues,
            display_path(root, &summary.output)
        );
    }
    Ok(())
}
