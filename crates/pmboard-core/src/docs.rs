//! Standalone HTML pages for every markdown document under the docs and projects trees.

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::io::{atomic_write, markdown_files};
use crate::markdown::{escape_html, extract_title, render};
use crate::paths::{self, relative_path, to_posix};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A rendered document: markdown source and the HTML page written for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocPage {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Absolute locations of the pages every doc links to.
#[derive(Debug, Clone)]
pub struct NavTargets {
    pub stylesheet: PathBuf,
    pub pm_page: PathBuf,
    pub issues_page: PathBuf,
    pub process_guide: PathBuf,
}

impl NavTargets {
    pub fn from_layout(root: &Path, layout: &LayoutConfig) -> Self {
        let ui = root.join(&layout.ui_dir);
        Self {
            stylesheet: ui.join(paths::STYLESHEET),
            pm_page: root.join(&layout.pm_page),
            issues_page: root.join(&layout.issues_html),
            process_guide: ui.join(paths::PROCESS_GUIDE),
        }
    }
}

fn href(from_dir: &Path, target: &Path) -> String {
    escape_html(&to_posix(&relative_path(from_dir, target)))
}

/// Full HTML page for one markdown document. Links are relative to `out_path`'s directory.
pub fn render_page(
    root: &Path,
    md_path: &Path,
    out_path: &Path,
    nav: &NavTargets,
) -> Result<String> {
    let markdown = std::fs::read_to_string(md_path)?;
    let stem = md_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = escape_html(&extract_title(&markdown, &stem));
    let body = render(&markdown);
    let source = escape_html(&to_posix(md_path.strip_prefix(root).unwrap_or(md_path)));

    let out_dir = out_path.parent().unwrap_or(Path::new("."));
    let css = href(out_dir, &nav.stylesheet);
    let pm = href(out_dir, &nav.pm_page);
    let bugs = href(out_dir, &nav.issues_page);
    let process = href(out_dir, &nav.process_guide);
    let raw = href(out_dir, md_path);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <link rel="stylesheet" href="{css}" />
</head>
<body>
  <div class="container">
    <nav class="top-nav">
      <a class="nav-link nav-project" href="{pm}">Project Mgmt</a>
      <a class="nav-link nav-bug" href="{bugs}">Bug Mgmt</a>
      <a class="nav-link nav-process" href="{process}">Process Mgmt</a>
    </nav>
    <header class="hero">
      <div>
        <h1 class="h4">{title}</h1>
        <p class="muted small">{source}</p>
      </div>
      <div class="badges">
        <a class="btn" href="{raw}">Open Raw</a>
      </div>
    </header>
    <section class="card">
      <div class="md">
        {body}
      </div>
    </section>
  </div>
</body>
</html>
"#
    ))
}

fn render_tree_into(
    root: &Path,
    source_root: &Path,
    out_root: &Path,
    nav: &NavTargets,
    pages: &mut Vec<DocPage>,
) -> Result<()> {
    for md_path in markdown_files(source_root)? {
        let Ok(rel) = md_path.strip_prefix(source_root) else {
            continue;
        };
        let output = out_root.join(rel).with_extension("html");
        let html = render_page(root, &md_path, &output, nav)?;
        atomic_write(&output, html.as_bytes())?;
        tracing::debug!(source = %md_path.display(), output = %output.display(), "rendered doc");
        pages.push(DocPage {
            source: md_path,
            output,
        });
    }
    Ok(())
}

/// Render `docs_dir/**/*.md` to `docs_out/` and `projects_dir/**/*.md` to `docs_out/projects/`.
pub fn render_tree(root: &Path, layout: &LayoutConfig) -> Result<Vec<DocPage>> {
    let nav = NavTargets::from_layout(root, layout);
    let out_root = root.join(&layout.docs_out);
    let mut pages = Vec::new();
    render_tree_into(root, &root.join(&layout.docs_dir), &out_root, &nav, &mut pages)?;
    render_tree_into(
        root,
        &root.join(&layout.projects_dir),
        &out_root.join("projects"),
        &nav,
        &mut pages,
    )?;
    tracing::info!(count = pages.len(), "rendered docs");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn renders_both_trees_with_relative_links() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "AI_first/docs/process.md", "# Process <Guide>\n\n- step `one`\n");
        write(
            root,
            "AI_first/projects/bugmgmt/phases/phase01/phase_definition.md",
            "no heading\n",
        );

        let pages = render_tree(root, &LayoutConfig::default()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].output, root.join("AI_first/ui/docs/process.html"));
        assert_eq!(
            pages[1].output,
            root.join("AI_first/ui/docs/projects/bugmgmt/phases/phase01/phase_definition.html")
        );

        let top = std::fs::read_to_string(&pages[0].output).unwrap();
        assert!(top.contains("<title>Process &lt;Guide&gt;</title>"));
        assert!(top.contains(r#"href="../style/bugmgmt.css""#));
        assert!(top.contains(r#"href="../PM.html""#));
        assert!(top.contains(r#"href="../bugmgmt_issues.html""#));
        assert!(top.contains(r#"href="../../docs/process.md""#));
        assert!(top.contains("<p class=\"muted small\">AI_first/docs/process.md</p>"));
        assert!(top.contains(
            "        <h1>Process &lt;Guide&gt;</h1>\n<ul>\n<li>step <code>one</code></li>"
        ));

        let nested = std::fs::read_to_string(&pages[1].output).unwrap();
        assert!(nested.contains("<title>phase_definition</title>"));
        assert!(nested.contains(r#"href="../../../../../PM.html""#));
    }

    #[test]
    fn missing_trees_render_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(render_tree(dir.path(), &LayoutConfig::default())
            .unwrap()
            .is_empty());
    }
}
