//! In-place patching of the PM dashboard and per-project detail pages.
//!
//! Generated content lives between pairs of marker comments; everything outside the markers is
//! hand-authored and preserved byte for byte. Scalar values (counts, summary cards, summary list
//! items) are patched by narrow label-keyed substitutions that silently skip absent labels.

use crate::config::LayoutConfig;
use crate::error::{PmError, Result};
use crate::fields::{extract_list_block, list_item};
use crate::io::{atomic_write, read_optional};
use crate::issue;
use crate::markdown::{escape_html, render_inline};
use crate::paths;
use crate::project::{build_projects, ProjectInfo, TBD};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const PROJECT_ROWS_START: &str = "<!-- PROJECT_ROWS_START -->";
pub const PROJECT_ROWS_END: &str = "<!-- PROJECT_ROWS_END -->";
pub const PHASE_ROWS_START: &str = "<!-- PHASE_ROWS_START -->";
pub const PHASE_ROWS_END: &str = "<!-- PHASE_ROWS_END -->";
pub const PHASE_TEMPLATES_START: &str = "<!-- PHASE_TEMPLATES_START -->";
pub const PHASE_TEMPLATES_END: &str = "<!-- PHASE_TEMPLATES_END -->";

const ROW_INDENT: &str = "            ";
const TEMPLATE_INDENT: &str = "    ";
const MISSING_BODY: &str =
    r#"<ul class="muted small"><li><strong>Missing:</strong> file not found.</li></ul>"#;
const NO_STAGE_ACTION_BODY: &str =
    r#"<ul class="muted small"><li><strong>Stage Action:</strong> TBD.</li></ul>"#;

static BOLD_RE: OnceLock<Regex> = OnceLock::new();
static LAST_UPDATED_RE: OnceLock<Regex> = OnceLock::new();

fn bold_re() -> &'static Regex {
    BOLD_RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap())
}

fn last_updated_re() -> &'static Regex {
    LAST_UPDATED_RE
        .get_or_init(|| Regex::new(r#"(<span id="pm-last-updated">)([^<]*)(</span>)"#).unwrap())
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Replace everything strictly between `start` and `end` with `body`.
///
/// The body is trimmed of surrounding newlines and placed on its own lines. Returns `None` when
/// either marker is missing or `start` follows `end`.
pub fn replace_between_markers(text: &str, start: &str, end: &str, body: &str) -> Option<String> {
    let start_pos = text.find(start)?;
    let end_pos = text.find(end)?;
    if start_pos > end_pos {
        return None;
    }
    let before = &text[..start_pos + start.len()];
    let after = &text[end_pos..];
    Some(format!("{before}\n{}\n{after}", body.trim_matches('\n')))
}

fn patch_region(path: &Path, text: &str, start: &str, end: &str, body: &str) -> Result<String> {
    replace_between_markers(text, start, end, body).ok_or_else(|| PmError::MissingMarkers {
        path: path.to_path_buf(),
        start: start.to_string(),
        end: end.to_string(),
    })
}

/// Substitute the first match of `pattern`, keeping capture groups 1 and 3 around `value`.
fn replace_labelled(text: &str, pattern: &str, value: &str) -> String {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(error = %e, "skipping substitution with invalid pattern");
            return text.to_string();
        }
    };
    re.replacen(text, 1, |caps: &Captures| {
        format!("{}{}{}", &caps[1], value, &caps[3])
    })
    .into_owned()
}

/// `data-count="key">N</div>` → `N = value`.
pub fn replace_count(text: &str, key: &str, value: usize) -> String {
    let pattern = format!(r#"(data-count="{}">)(\d+)(</div>)"#, regex::escape(key));
    replace_labelled(text, &pattern, &value.to_string())
}

/// Value of the summary card whose caption is `label`.
pub fn replace_summary_value(text: &str, label: &str, value: &str) -> String {
    let pattern = format!(
        r#"(?s)(<div class="summary-card">\s*<div class="muted small">{}</div>\s*<div class="h6">)([^<]*)(</div>\s*</div>)"#,
        regex::escape(label)
    );
    replace_labelled(text, &pattern, value)
}

/// `<li><strong>Label:</strong> value</li>`. Empty values leave the document untouched.
pub fn replace_summary_item(text: &str, label: &str, value: &str) -> String {
    if value.is_empty() {
        return text.to_string();
    }
    let pattern = format!(
        r"(<li>\s*<strong>{}:</strong>)([^<]*)(</li>)",
        regex::escape(label)
    );
    replace_labelled(text, &pattern, &format!(" {}", escape_html(value)))
}

/// `<span id="pm-last-updated">date</span>`.
pub fn replace_last_updated(text: &str, date: &str) -> String {
    last_updated_re()
        .replacen(text, 1, |caps: &Captures| {
            format!("{}{}{}", &caps[1], date, &caps[3])
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Inline spans for dashboard rows and templates: code, links, and `**bold**`.
pub fn render_inline_rich(text: &str) -> String {
    bold_re()
        .replace_all(&render_inline(text), "<strong>$1</strong>")
        .into_owned()
}

/// First list block of a document as a single-line `<ul class="muted small">`.
pub fn render_list_summary(markdown: &str) -> String {
    let items: String = extract_list_block(markdown)
        .into_iter()
        .filter_map(list_item)
        .map(|content| format!("<li>{}</li>", render_inline_rich(content)))
        .collect();
    format!(r#"<ul class="muted small">{items}</ul>"#)
}

fn phase_label(project: &ProjectInfo) -> String {
    project
        .active_phase_info()
        .or(project.phases.last())
        .map(|p| p.label())
        .unwrap_or_else(|| TBD.to_string())
}

pub fn render_pm_rows(projects: &[ProjectInfo]) -> String {
    let i = ROW_INDENT;
    projects
        .iter()
        .map(|project| {
            let slug = &project.slug;
            let (status_label, status_class) = project.status.badge();
            let health_label = if project.status.is_complete() {
                "Complete"
            } else {
                "On Track"
            };
            let description = if project.purpose.is_empty() {
                "Project overview."
            } else {
                project.purpose.as_str()
            };
            let [first, second] = project.next_actions();
            [
                format!(
                    r#"{i}<tr data-link="project_{slug}.html" tabindex="0" role="button" aria-label="Open {slug} project details">"#
                ),
                format!("{i}  <td>"),
                format!(r#"{i}    <a class="fw" href="project_{slug}.html">{slug}</a>"#),
                format!(
                    r#"{i}    <div class="muted small">{}</div>"#,
                    render_inline_rich(description)
                ),
                format!("{i}  </td>"),
                format!("{i}  <td>{}</td>", escape_html(&phase_label(project))),
                format!(
                    r#"{i}  <td><span class="badge {status_class}">{status_label}</span></td>"#
                ),
                format!(r#"{i}  <td><span class="badge status-closed">{health_label}</span></td>"#),
                format!("{i}  <td>{}</td>", escape_html(&project.owner)),
                format!("{i}  <td>{}</td>", project.last_updated()),
                format!(r#"{i}  <td class="muted small">"#),
                format!("{i}    <div>{}</div>", render_inline_rich(&first)),
                format!("{i}    <div>{}</div>", render_inline_rich(&second)),
                format!("{i}  </td>"),
                format!("{i}</tr>"),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_phase_rows(project: &ProjectInfo) -> String {
    let i = ROW_INDENT;
    project
        .phases
        .iter()
        .map(|phase| {
            let n = &phase.number;
            let label = escape_html(&phase.label());
            let (status_label, status_class) = phase.status.badge();
            [
                format!(r#"{i}<tr data-phase="{label}""#),
                format!(r#"{i}    data-phase-def-id="phase{n}-def""#),
                format!(r#"{i}    data-action-plan-id="phase{n}-plan""#),
                format!(r#"{i}    data-stage-action-id="phase{n}-action""#),
                format!(
                    r#"{i}    tabindex="0" role="button" aria-label="View Phase {n} details">"#
                ),
                format!("{i}  <td>{label}</td>"),
                format!(
                    r#"{i}  <td><span class="badge {status_class}">{status_label}</span></td>"#
                ),
                format!(
                    "{i}  <td>{}</td>",
                    escape_html(phase.completed.as_deref().unwrap_or(TBD))
                ),
                format!("{i}</tr>"),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_summary_body(path: &Path) -> Result<String> {
    Ok(match read_optional(path)? {
        Some(text) => render_list_summary(&text),
        None => MISSING_BODY.to_string(),
    })
}

/// `<template id="..">` with every body line indented two spaces past `indent`.
pub fn wrap_template(id: &str, body: &str, indent: &str) -> String {
    let lines: Vec<String> = body.lines().map(|line| format!("{indent}  {line}")).collect();
    format!(
        "{indent}<template id=\"{id}\">\n{}\n{indent}</template>",
        lines.join("\n")
    )
}

/// Definition, action plan and first stage action of every phase, as `<template>` elements.
pub fn render_phase_templates(project: &ProjectInfo) -> Result<String> {
    let mut templates = Vec::with_capacity(project.phases.len() * 3);
    for phase in &project.phases {
        let n = &phase.number;
        let stage_action = match phase.stage_actions.first() {
            Some(path) => read_summary_body(path)?,
            None => NO_STAGE_ACTION_BODY.to_string(),
        };
        templates.push(wrap_template(
            &format!("phase{n}-def"),
            &read_summary_body(&phase.phase_def_path)?,
            TEMPLATE_INDENT,
        ));
        templates.push(wrap_template(
            &format!("phase{n}-plan"),
            &read_summary_body(&phase.action_plan_path)?,
            TEMPLATE_INDENT,
        ));
        templates.push(wrap_template(
            &format!("phase{n}-action"),
            &stage_action,
            TEMPLATE_INDENT,
        ));
    }
    Ok(templates.join("\n"))
}

// ---------------------------------------------------------------------------
// Page patches
// ---------------------------------------------------------------------------

/// Projects whose active phase exists and is not complete.
pub fn active_phase_count(projects: &[ProjectInfo]) -> usize {
    projects.iter().filter(|p| p.has_open_active_phase()).count()
}

pub fn patch_pm_page(
    path: &Path,
    text: &str,
    projects: &[ProjectInfo],
    open_bugs: &BTreeMap<String, usize>,
) -> Result<String> {
    let updated = patch_region(
        path,
        text,
        PROJECT_ROWS_START,
        PROJECT_ROWS_END,
        &render_pm_rows(projects),
    )?;
    let updated = replace_count(&updated, "projects", projects.len());
    let updated = replace_count(&updated, "active-phases", active_phase_count(projects));
    Ok(replace_count(&updated, "open-bugs", open_bugs.values().sum()))
}

pub fn patch_detail_page(
    path: &Path,
    text: &str,
    project: &ProjectInfo,
    open_bugs: &BTreeMap<String, usize>,
) -> Result<String> {
    let updated = patch_region(
        path,
        text,
        PHASE_ROWS_START,
        PHASE_ROWS_END,
        &render_phase_rows(project),
    )?;
    let updated = patch_region(
        path,
        &updated,
        PHASE_TEMPLATES_START,
        PHASE_TEMPLATES_END,
        &render_phase_templates(project)?,
    )?;

    let (status_label, _) = project.status.badge();
    let active_label = match &project.active_phase {
        Some(number) if !project.status.is_complete() => format!("Phase {number}"),
        _ => "Complete".to_string(),
    };
    let bugs = open_bugs.get(&project.slug).copied().unwrap_or(0);

    let updated = replace_summary_value(&updated, "Phases", &project.phases.len().to_string());
    let updated = replace_summary_value(&updated, "Open Bugs", &bugs.to_string());
    let updated = replace_summary_value(&updated, "Active Phase", &active_label);
    let updated = replace_summary_value(&updated, "Status", status_label);
    let updated = replace_summary_item(&updated, "Purpose", &project.purpose);
    let updated = replace_summary_item(&updated, "Current Goal", &project.current_goal);
    let updated = replace_summary_item(&updated, "Status", status_label);
    Ok(replace_summary_item(&updated, "Owner", &project.owner))
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct RenderReport {
    pub projects: usize,
    pub updated: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub dry_run: bool,
}

struct PendingWrite {
    path: PathBuf,
    original: String,
    content: String,
}

/// Rebuild the PM page and every existing detail page from the markdown sources.
///
/// Every document is patched in memory before anything is written, so a structural error in
/// any page leaves all pages untouched. Detail pages that do not exist are skipped.
pub fn render_dashboards(
    root: &Path,
    layout: &LayoutConfig,
    dry_run: bool,
) -> Result<RenderReport> {
    let projects = build_projects(root, layout)?;
    let open_bugs = issue::count_open_by_project(&root.join(&layout.issues_log))?;
    let mut report = RenderReport {
        projects: projects.len(),
        dry_run,
        ..RenderReport::default()
    };

    let mut pending = Vec::with_capacity(projects.len() + 1);
    let pm_path = root.join(&layout.pm_page);
    let pm_text = std::fs::read_to_string(&pm_path)?;
    pending.push(PendingWrite {
        content: patch_pm_page(&pm_path, &pm_text, &projects, &open_bugs)?,
        original: pm_text,
        path: pm_path,
    });

    let ui_dir = root.join(&layout.ui_dir);
    for project in &projects {
        let detail = paths::detail_page(&ui_dir, &project.slug);
        let Some(text) = read_optional(&detail)? else {
            tracing::info!(path = %detail.display(), "skipping missing detail page");
            report.skipped.push(detail);
            continue;
        };
        pending.push(PendingWrite {
            content: patch_detail_page(&detail, &text, project, &open_bugs)?,
            original: text,
            path: detail,
        });
    }

    for write in pending {
        if write.content == write.original {
            report.unchanged.push(write.path);
            continue;
        }
        if !dry_run {
            atomic_write(&write.path, write.content.as_bytes())?;
            tracing::debug!(path = %write.path.display(), "patched");
        }
        report.updated.push(write.path);
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
