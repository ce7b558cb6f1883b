use crate::cmd::load_config;
use crate::output::{print_json, print_paths};
use anyhow::Context;
use pmboard_core::docs;
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    support: Option<PathBuf>,
    projects: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(root)?;
    if let Some(p) = support {
        config.layout.docs_dir = p;
    }
    if let Some(p) = projects {
        config.layout.projects_dir = p;
    }
    if let Some(p) = out {
        config.layout.docs_out = p;
    }

    let pages = docs::render_tree(root, &config.layout).context("failed to render docs")?;

    if json {
        return print_json(&pages);
    }
    if pages.is_empty() {
        println!("No markdown found.");
        return Ok(());
    }
    let outputs: Vec<&PathBuf> = pages.iter().map(|p| &p.output).collect();
    print_paths(root, &format!("Rendered {} pages:", pages.len()), &outputs);
    Ok(())
}
