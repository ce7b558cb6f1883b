use crate::cmd::load_config;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use pmboard_core::config::WarnLevel;
use pmboard_core::paths::to_posix;
use std::collections::BTreeSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration (file values over defaults)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    if json {
        return print_json(&config);
    }

    let l = &config.layout;
    let layout = [
        ("projectplan", &l.projectplan),
        ("projects_dir", &l.projects_dir),
        ("docs_dir", &l.docs_dir),
        ("ui_dir", &l.ui_dir),
        ("pm_page", &l.pm_page),
        ("issues_log", &l.issues_log),
        ("issues_json", &l.issues_json),
        ("issues_html", &l.issues_html),
        ("docs_out", &l.docs_out),
    ];
    print_table(
        &["SETTING", "PATH"],
        layout
            .iter()
            .map(|(k, v)| vec![k.to_string(), to_posix(v)])
            .collect(),
    );
    println!();

    let issues = &config.issues;
    let projects: BTreeSet<&String> = issues.prefixes.keys().chain(issues.owners.keys()).collect();
    print_table(
        &["PROJECT", "PREFIX", "OWNER"],
        projects
            .into_iter()
            .map(|p| {
                vec![
                    p.clone(),
                    issues.prefixes.get(p).cloned().unwrap_or_else(|| "-".into()),
                    issues.owners.get(p).cloned().unwrap_or_else(|| "-".into()),
                ]
            })
            .collect(),
    );
    println!();
    match issues.resolve_default_owner() {
        Some(owner) => println!("Default owner: {owner}"),
        None => println!("Default owner: (none)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
