//! `project init`: markdown skeleton for a new project plus its registrations.
//!
//! Every check runs before the first write. A conflict (existing directory, project already in
//! the plan or PM page, mismatching prefix/owner mapping) leaves the repository untouched.

use crate::config::Config;
use crate::dashboard::{
    render_list_summary, replace_count, replace_last_updated, wrap_template, PROJECT_ROWS_END,
    PROJECT_ROWS_START,
};
use crate::error::{PmError, Result};
use crate::io::atomic_write;
use crate::issue;
use crate::markdown::escape_html;
use crate::paths::{self, to_posix};
use crate::plan::EM_DASH;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const PLAN_REFERENCES_HEADING: &str = "## Project-wide references and actions";

static NON_SLUG_RE: OnceLock<Regex> = OnceLock::new();
static PM_ROW_RE: OnceLock<Regex> = OnceLock::new();

fn non_slug_re() -> &'static Regex {
    NON_SLUG_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

fn pm_row_re() -> &'static Regex {
    PM_ROW_RE.get_or_init(|| Regex::new(r#"<tr\s+[^>]*data-link="project_"#).unwrap())
}

/// Lowercase, collapse every run of other characters to `_`, trim underscores.
pub fn slugify(value: &str) -> String {
    non_slug_re()
        .replace_all(&value.trim().to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// `project_management` → `Project Management`.
pub fn project_title(slug: &str) -> String {
    slug.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Options / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub slug: String,
    pub title: Option<String>,
    pub owner: String,
    pub purpose: String,
    pub goal: Option<String>,
    pub phase_name: String,
    pub stage_name: String,
    pub prefix: Option<String>,
    pub update_plan: bool,
    pub update_ui: bool,
    pub dry_run: bool,
}

impl InitOptions {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: None,
            owner: "unassigned".to_string(),
            purpose: "TBD".to_string(),
            goal: None,
            phase_name: "Foundation".to_string(),
            stage_name: "foundation".to_string(),
            prefix: None,
            update_plan: true,
            update_ui: true,
            dry_run: false,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct InitReport {
    pub slug: String,
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub prefix_added: bool,
    pub owner_added: bool,
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Values shared by every generated document.
struct Skeleton<'a> {
    slug: &'a str,
    title: String,
    owner: &'a str,
    purpose: &'a str,
    goal: String,
    phase_name: &'a str,
    stage_name: &'a str,
    stage_slug: String,
    projects: String,
    docs: String,
}

impl Skeleton<'_> {
    fn project_rel(&self) -> String {
        format!("{}/{}", self.projects, self.slug)
    }

    fn stage_file(&self) -> String {
        format!("{}_phase01_stage_{}_action.md", self.slug, self.stage_slug)
    }

    fn stage_rel(&self) -> String {
        format!("{}/phases/phase01/actions/{}", self.project_rel(), self.stage_file())
    }

    fn summary_rel(&self) -> String {
        format!("{}/project_summary_{}.md", self.project_rel(), self.slug)
    }

    fn summary_doc(&self) -> String {
        let Skeleton {
            slug,
            purpose,
            owner,
            goal,
            ..
        } = self;
        format!(
            "# Project Summary ({slug})

- **Project:** {slug}
- **Purpose:** {purpose}
- **Current Goal:** {goal}
- **Environment:** Local docs and static assets; offline.
- **Constraints:** Keep PII-free; deterministic outputs; local assets only.
- **Consumers:** Project stakeholders.
- **Status:** Planning
- **Owner:** {owner}
"
        )
    }

    fn phase_definition_doc(&self) -> String {
        let (title, phase, stage) = (&self.title, self.phase_name, self.stage_name);
        format!(
            "# Phase 01 {EM_DASH} {phase}

- **Objective:** Establish the baseline plan and workflow for {title}.
- **Scope:** In: project docs, phase/stage definitions; Out: implementation or integrations.
- **Definition of completion:** Phase action plan and at least one stage action exist with persona notes and DoD references.
- **Stages:**
  - {stage} stage -> `{stage_rel}`
- **Dependencies:** None.
- **Risks/assumptions:** Keep scope focused; remain PII-free.
- **Links:** `{docs}/projectplan.md`, `{summary_rel}`
",
            stage_rel = self.stage_rel(),
            docs = self.docs,
            summary_rel = self.summary_rel(),
        )
    }

    fn action_plan_doc(&self) -> String {
        let (phase, stage) = (self.phase_name, self.stage_name);
        format!(
            "# Phase 01 Action Plan {EM_DASH} {phase}

- **Phase:** see `{project}/phases/phase01/phase_definition.md`.
- **Stage list:**
  - {stage} stage -> `{stage_rel}`
- **Objective:** Establish the baseline project workflow, scope, and documentation.
- **Scope/files:** In: stage action doc(s); Out: implementation or external tooling.
- **Dependencies:** None.
- **Risks/assumptions:** Keep the initial stage actionable and small.
- **Persona actions:** Default Project Creator/Owner → Project/Process Manager → Developer → QA Lead; add optional personas as needed.
- **Validation:** Stage action file exists and references review checklists.
- **Rollback:** Revert phase documents if scope changes.
- **Ready checklist:** Templates available.
- **Done checklist:** Stage action populated with persona notes.
",
            project = self.project_rel(),
            stage_rel = self.stage_rel(),
        )
    }

    fn stage_action_doc(&self) -> String {
        let (title, phase, stage) = (&self.title, self.phase_name, self.stage_name);
        format!(
            "# Stage Action ({file})

- **Phase/Stage:** Phase 01 {EM_DASH} {phase} ({stage}).
- **Objective:** Define scope, workflow, and expectations for {title}.
- **Scope:** In: planning docs and acceptance criteria; Out: implementation.
- **Acceptance:** Persona notes recorded; scope documented; DoD referenced.
- **Dependencies/data:** `{docs}/process.md`, `{docs}/projectplan.md`, `{summary_rel}`
- **Outputs:** Updated phase/stage docs and any related process updates.
- **Definition of Done:** Persona notes filled, DoD checklist referenced, validation steps recorded.

## Personas (record outputs; use `{docs}/templates/review_checklists.md`)
- Project/Process Manager:
- Developer:
- QA Lead:
- Optional personas (Product Manager, Repository Steward, Docs Expert, UI/Accessibility, Bug Triage, Automation/Tooling, Architect, Security, Ops/Observability, Performance/Cost, DBA):

## Plan
- Confirm project scope and constraints.
- Define initial workflow and phase expectations.
- Record acceptance and validation steps.

## Execution notes
- Pending.

## Validation
- Pending.

## Documentation updates
- Pending.

## Issues & lessons
- Pending.
",
            file = self.stage_file(),
            docs = self.docs,
            summary_rel = self.summary_rel(),
        )
    }

    fn plan_block(&self) -> String {
        let (slug, phase, project) = (self.slug, self.phase_name, self.project_rel());
        format!(
            "- **{slug} (planning)**
  - Summary: `{summary_rel}`
  - Phases root: `{project}/phases/`
  - Issues log: use Bug Management entries with `project: \"{slug}\"`
  - Phases overview:
    - Phase 01 {EM_DASH} {phase} (planning): see `{project}/phases/phase01/`.
  - Phase directory map:
    - `{project}/phases/phase01/phase_definition.md` {EM_DASH} definition of Phase 01.
    - `{project}/phases/phase01/action_plan_phase01.md` {EM_DASH} action plan for Phase 01 (links to stage actions under `{project}/phases/phase01/actions/`).
",
            summary_rel = self.summary_rel(),
        )
    }

    fn pm_row(&self, date: &str) -> String {
        let i = "            ";
        let slug = self.slug;
        let purpose = escape_html(if self.purpose.is_empty() {
            "Project overview."
        } else {
            self.purpose
        });
        let owner = escape_html(self.owner);
        let phase = escape_html(self.phase_name);
        [
            format!(
                r#"{i}<tr data-link="project_{slug}.html" tabindex="0" role="button" aria-label="Open {slug} project details">"#
            ),
            format!("{i}  <td>"),
            format!(r#"{i}    <a class="fw" href="project_{slug}.html">{slug}</a>"#),
            format!(r#"{i}    <div class="muted small">{purpose}</div>"#),
            format!("{i}  </td>"),
            format!("{i}  <td>Phase 01 {EM_DASH} {phase}</td>"),
            format!(r#"{i}  <td><span class="badge status-open">Planning</span></td>"#),
            format!(r#"{i}  <td><span class="badge status-closed">On Track</span></td>"#),
            format!("{i}  <td>{owner}</td>"),
            format!("{i}  <td>{date}</td>"),
            format!(r#"{i}  <td class="muted small">"#),
            format!("{i}    <div>Define scope and success criteria.</div>"),
            format!("{i}    <div>Populate the Phase 01 stage action.</div>"),
            format!("{i}  </td>"),
            format!("{i}</tr>"),
        ]
        .join("\n")
    }

    fn detail_page(&self, date: &str) -> String {
        let slug = self.slug;
        let purpose = escape_html(self.purpose);
        let owner = escape_html(self.owner);
        let goal = escape_html(&self.goal);
        let phase = escape_html(self.phase_name);
        let templates = [
            ("phase01-def", self.phase_definition_doc()),
            ("phase01-plan", self.action_plan_doc()),
            ("phase01-action", self.stage_action_doc()),
        ]
        .iter()
        .map(|(id, doc)| wrap_template(id, &render_list_summary(doc), "    "))
        .collect::<Vec<_>>()
        .join("\n");

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Project Detail {EM_DASH} {slug}</title>
  <link rel="stylesheet" href="{css}" />
</head>
<body>
  <div class="container">
    <nav class="top-nav">
      <a class="nav-link nav-home" href="index.html">Home</a>
      <a class="nav-link nav-process" href="{process}">Process Management</a>
      <a class="nav-link nav-project" href="PM.html">Project Management</a>
      <a class="nav-link nav-bug" href="bugmgmt_issues.html">Bug Management</a>
    </nav>
    <header class="hero">
      <div>
        <h1 class="h4">{slug}</h1>
        <p class="muted small">{purpose}</p>
      </div>
    </header>

    <div class="summary">
      <div class="summary-card"><div class="muted small">Phases</div><div class="h6">1</div></div>
      <div class="summary-card"><div class="muted small">Active Phase</div><div class="h6">Phase 01</div></div>
      <div class="summary-card"><div class="muted small">Status</div><div class="h6">Planning</div></div>
    </div>

    <section class="card">
      <details class="block">
        <summary class="h4">Project Summary</summary>
        <ul class="muted small">
          <li><strong>Project:</strong> {slug}</li>
          <li><strong>Purpose:</strong> {purpose}</li>
          <li><strong>Current Goal:</strong> {goal}</li>
          <li><strong>Environment:</strong> Local docs and static assets; offline.</li>
          <li><strong>Constraints:</strong> Keep PII-free; deterministic outputs; local assets only.</li>
          <li><strong>Consumers:</strong> Project stakeholders.</li>
          <li><strong>Status:</strong> Planning</li>
          <li><strong>Owner:</strong> {owner}</li>
        </ul>
      </details>
    </section>

    <section class="card">
      <h2 class="h4">Phase History</h2>
      <div class="table-wrap">
        <table class="issues">
          <thead>
            <tr>
              <th>Phase</th>
              <th>Status</th>
              <th>Last Updated</th>
            </tr>
          </thead>
          <tbody>
            {rows_start}
            <tr data-phase="Phase 01 {EM_DASH} {phase}"
                data-phase-def-id="phase01-def"
                data-action-plan-id="phase01-plan"
                data-stage-action-id="phase01-action"
                tabindex="0" role="button" aria-label="View Phase 01 details">
              <td>Phase 01 {EM_DASH} {phase}</td>
              <td><span class="badge status-open">Planning</span></td>
              <td>{date}</td>
            </tr>
            {rows_end}
          </tbody>
        </table>
      </div>
      <p class="filter-hint">Update this table as phases progress or close.</p>
    </section>

    <section class="card">
      <h2 class="h4">Phase Details</h2>
      <p class="muted small" id="phaseDetailTitle">Select a phase to review the summary.</p>
      <div class="phase-detail" id="phaseDetail">
        <div class="muted small">No phase selected.</div>
      </div>
    </section>

    {templates_start}
{templates}
    {templates_end}

  </div>
{script}</body>
</html>
"#,
            css = paths::STYLESHEET,
            process = paths::PROCESS_GUIDE,
            rows_start = crate::dashboard::PHASE_ROWS_START,
            rows_end = crate::dashboard::PHASE_ROWS_END,
            templates_start = crate::dashboard::PHASE_TEMPLATES_START,
            templates_end = crate::dashboard::PHASE_TEMPLATES_END,
            script = DETAIL_SCRIPT,
        )
    }
}

const DETAIL_SCRIPT: &str = r#"  <script>
    const detail = document.getElementById("phaseDetail");
    const detailTitle = document.getElementById("phaseDetailTitle");
    const getTemplate = (id) => {
      if (!id) return '<div class="muted small">No summary available.</div>';
      const node = document.getElementById(id);
      return node ? node.innerHTML.trim() : '<div class="muted small">No summary available.</div>';
    };
    const renderDetails = (row) => {
      if (!row) return;
      const phase = row.dataset.phase || "Phase Details";
      const phaseDef = getTemplate(row.dataset.phaseDefId);
      const actionPlan = getTemplate(row.dataset.actionPlanId);
      const stageAction = getTemplate(row.dataset.stageActionId);
      if (detailTitle) detailTitle.textContent = phase;
      detail.innerHTML = `
        <div class="details-grid">
          <div class="detail-item">
            <div class="detail-title">Phase Definition</div>
            ${phaseDef}
          </div>
          <div class="detail-item">
            <div class="detail-title">Action Plan</div>
            ${actionPlan}
          </div>
          <div class="detail-item">
            <div class="detail-title">Stage Action</div>
            ${stageAction}
          </div>
        </div>
      `;
    };
    document.querySelectorAll("tr[data-phase]").forEach((row) => {
      row.addEventListener("click", (evt) => {
        if (evt.target.closest("a")) return;
        renderDetails(row);
      });
      row.addEventListener("keydown", (evt) => {
        if (evt.target.closest("a")) return;
        if (evt.key !== "Enter" && evt.key !== " ") return;
        renderDetails(row);
      });
    });
  </script>
"#;

// ---------------------------------------------------------------------------
// Registrations
// ---------------------------------------------------------------------------

/// Insert `block` before the references heading, or append it after a blank line.
pub fn insert_plan_block(
    plan_path: &Path,
    content: &str,
    block: &str,
    project_rel: &str,
) -> Result<String> {
    let reference = format!("{project_rel}/");
    if content.contains(&reference) {
        return Err(PmError::AlreadyRegistered {
            file: plan_path.to_path_buf(),
            what: reference,
        });
    }
    Ok(match content.split_once(PLAN_REFERENCES_HEADING) {
        Some((before, after)) => {
            let sep = if before.ends_with('\n') { "" } else { "\n" };
            format!("{before}{sep}{block}\n{PLAN_REFERENCES_HEADING}{after}")
        }
        None => format!("{}\n\n{block}", content.trim_end()),
    })
}

/// Append `row` inside the project-row markers and refresh counts and the last-updated stamp.
///
/// `active-phases` is set to the row count; the next dashboard render recomputes it exactly.
pub fn append_pm_row(
    pm_path: &Path,
    text: &str,
    slug: &str,
    row: &str,
    open_bugs: usize,
    date: &str,
) -> Result<String> {
    let page = format!("project_{slug}.html");
    if text.contains(&page) {
        return Err(PmError::AlreadyRegistered {
            file: pm_path.to_path_buf(),
            what: page,
        });
    }
    let markers = || PmError::MissingMarkers {
        path: pm_path.to_path_buf(),
        start: PROJECT_ROWS_START.to_string(),
        end: PROJECT_ROWS_END.to_string(),
    };
    let start = text.find(PROJECT_ROWS_START).ok_or_else(markers)?;
    let end = text.find(PROJECT_ROWS_END).ok_or_else(markers)?;
    if start > end {
        return Err(markers());
    }
    let head = &text[..start + PROJECT_ROWS_START.len()];
    let rows = &text[start + PROJECT_ROWS_START.len()..end];
    let rows = if rows.trim().is_empty() {
        format!("\n{row}\n")
    } else {
        format!("{}\n{row}\n", rows.trim_end())
    };
    let row_count = pm_row_re().find_iter(&rows).count();

    let updated = format!("{head}{rows}{}", &text[end..]);
    let updated = replace_count(&updated, "projects", row_count);
    let updated = replace_count(&updated, "active-phases", row_count);
    let updated = replace_count(&updated, "open-bugs", open_bugs);
    Ok(replace_last_updated(&updated, date))
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

/// Scaffold a project. `config` gains the prefix/owner mappings and is saved when they change.
pub fn init_project(
    root: &Path,
    config: &mut Config,
    opts: &InitOptions,
    today: NaiveDate,
) -> Result<InitReport> {
    let slug = opts.slug.trim();
    paths::validate_slug(slug)?;
    let prefix = opts.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty());
    if let Some(prefix) = prefix {
        paths::validate_prefix(prefix)?;
    }

    let layout = config.layout.clone();
    let projects_dir = root.join(&layout.projects_dir);
    let project_root = paths::project_dir(&projects_dir, slug);
    if project_root.exists() {
        return Err(PmError::ProjectExists(project_root));
    }

    let phase_name = opts.phase_name.trim();
    let stage_name = opts.stage_name.trim();
    let stage_slug = match slugify(stage_name) {
        s if s.is_empty() => "stage".to_string(),
        s => s,
    };
    let skeleton = Skeleton {
        slug,
        title: opts
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| project_title(slug)),
        owner: opts.owner.trim(),
        purpose: opts.purpose.trim(),
        goal: opts
            .goal
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Complete Phase 01 {phase_name}.")),
        phase_name,
        stage_name,
        stage_slug,
        projects: to_posix(&layout.projects_dir),
        docs: to_posix(&layout.docs_dir),
    };
    let date = today.format("%Y-%m-%d").to_string();

    let phase_dir = paths::phase_dir(&projects_dir, slug, "01");
    let mut writes: Vec<(PathBuf, String)> = vec![
        (
            paths::project_summary(&projects_dir, slug),
            skeleton.summary_doc(),
        ),
        (
            paths::phase_definition(&phase_dir),
            skeleton.phase_definition_doc(),
        ),
        (
            paths::action_plan(&phase_dir, "01"),
            skeleton.action_plan_doc(),
        ),
        (
            paths::actions_dir(&phase_dir).join(skeleton.stage_file()),
            skeleton.stage_action_doc(),
        ),
    ];
    let mut report = InitReport {
        slug: slug.to_string(),
        created: writes.iter().map(|(p, _)| p.clone()).collect(),
        dry_run: opts.dry_run,
        ..InitReport::default()
    };

    if opts.update_plan {
        let plan_path = root.join(&layout.projectplan);
        let content = std::fs::read_to_string(&plan_path)?;
        let updated = insert_plan_block(
            &plan_path,
            &content,
            &skeleton.plan_block(),
            &skeleton.project_rel(),
        )?;
        report.updated.push(plan_path.clone());
        writes.push((plan_path, updated));
    }

    let mut next_config = config.clone();
    if let Some(prefix) = prefix {
        report.prefix_added = next_config.issues.set_prefix(slug, prefix)?;
    }
    let owner = skeleton.owner;
    if !owner.is_empty() && !owner.eq_ignore_ascii_case("unassigned") {
        report.owner_added = next_config.issues.set_owner(slug, owner)?;
    }

    if opts.update_ui {
        let ui_dir = root.join(&layout.ui_dir);
        let detail = paths::detail_page(&ui_dir, slug);
        if detail.exists() {
            return Err(PmError::ProjectExists(detail));
        }
        report.created.push(detail.clone());
        writes.push((detail, skeleton.detail_page(&date)));

        let pm_path = root.join(&layout.pm_page);
        let text = std::fs::read_to_string(&pm_path)?;
        let open_bugs = issue::count_open_by_project(&root.join(&layout.issues_log))?
            .values()
            .sum();
        let row = skeleton.pm_row(&date);
        let updated = append_pm_row(&pm_path, &text, slug, &row, open_bugs, &date)?;
        report.updated.push(pm_path.clone());
        writes.push((pm_path, updated));
    }

    let config_changed = report.prefix_added || report.owner_added;
    if config_changed {
        report.updated.push(paths::config_path(root));
    }
    if opts.dry_run {
        return Ok(report);
    }

    for (path, content) in &writes {
        atomic_write(path, content.as_bytes())?;
    }
    if config_changed {
        next_config.save(root)?;
        *config = next_config;
    }
    tracing::info!(slug, files = writes.len(), "project initialized");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::project::build_projects;
    use crate::status::Status;
    use tempfile::TempDir;

    const PM_PAGE: &str = r#"<div data-count="projects">1</div>
<div data-count="active-phases">1</div>
<div data-count="open-bugs">0</div>
<span id="pm-last-updated">2020-01-01</span>
<!-- PROJECT_ROWS_START -->
            <tr data-link="project_bugmgmt.html" tabindex="0">
            </tr>
<!-- PROJECT_ROWS_END -->
"#;

    const PLAN: &str = "# Plan\n\n## Projects\n- **bugmgmt (active)**\n  - Summary: `AI_first/projects/bugmgmt/project_summary_bugmgmt.md`\n\n## Project-wide references and actions\n- none\n";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("AI_first/docs")).unwrap();
        std::fs::create_dir_all(root.join("AI_first/ui")).unwrap();
        std::fs::write(root.join("AI_first/docs/projectplan.md"), PLAN).unwrap();
        std::fs::write(root.join("AI_first/ui/PM.html"), PM_PAGE).unwrap();
        dir
    }

    #[test]
    fn slugify_and_title() {
        assert_eq!(slugify("  Data Import -- v2 "), "data_import_v2");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(project_title("project_management"), "Project Management");
        assert_eq!(project_title("api_v2"), "Api V2");
    }

    #[test]
    fn plan_block_goes_before_references() {
        let project = "AI_first/projects/x";
        let out =
            insert_plan_block(Path::new("p.md"), PLAN, "- **x (planning)**\n", project).unwrap();
        assert!(out.contains(
            "project_summary_bugmgmt.md`\n\n- **x (planning)**\n\n## Project-wide"
        ));

        let appended =
            insert_plan_block(Path::new("p.md"), "## Projects\n\n\n", "- **x**\n", project)
                .unwrap();
        assert_eq!(appended, "## Projects\n\n- **x**\n");
    }

    #[test]
    fn plan_block_rejects_duplicates() {
        let err = insert_plan_block(
            Path::new("p.md"),
            "see `AI_first/projects/x/`",
            "",
            "AI_first/projects/x",
        )
        .unwrap_err();
        assert!(matches!(err, PmError::AlreadyRegistered { .. }));
    }

    #[test]
    fn pm_row_appended_and_counts_refreshed() {
        let row = "            <tr data-link=\"project_data.html\">\n            </tr>";
        let out =
            append_pm_row(Path::new("PM.html"), PM_PAGE, "data", row, 4, "2024-06-01").unwrap();
        assert!(out.contains(r#"data-count="projects">2</div>"#));
        assert!(out.contains(r#"data-count="active-phases">2</div>"#));
        assert!(out.contains(r#"data-count="open-bugs">4</div>"#));
        assert!(out.contains(r#"<span id="pm-last-updated">2024-06-01</span>"#));
        assert!(out.contains(&format!("            </tr>\n{row}\n<!-- PROJECT_ROWS_END -->")));

        let err = append_pm_row(Path::new("PM.html"), &out, "data", "", 0, "x").unwrap_err();
        assert!(matches!(err, PmError::AlreadyRegistered { .. }));
    }

    #[test]
    fn init_creates_docs_and_registers_everywhere() {
        let dir = repo();
        let root = dir.path();
        let mut config = Config::default();
        let mut opts = InitOptions::new("data_import");
        opts.prefix = Some("DIM".into());
        opts.owner = "Grace".into();
        opts.purpose = "Import data.".into();

        let report = init_project(root, &mut config, &opts, date()).unwrap();
        assert!(report.prefix_added && report.owner_added);
        assert_eq!(report.created.len(), 5);
        let stage = root.join(
            "AI_first/projects/data_import/phases/phase01/actions/data_import_phase01_stage_foundation_action.md",
        );
        assert!(stage.exists());

        let saved = Config::load_or_default(root).unwrap();
        assert_eq!(saved.issues.prefix_for("data_import"), Some("DIM"));
        assert_eq!(saved.issues.owner_for("data_import"), Some("Grace"));
        assert_eq!(config.issues.prefix_for("data_import"), Some("DIM"));

        let projects = build_projects(root, &LayoutConfig::default()).unwrap();
        let scaffolded = projects.iter().find(|p| p.slug == "data_import").unwrap();
        assert_eq!(scaffolded.status, Status::Planning);
        assert_eq!(scaffolded.owner, "Grace");
        assert_eq!(scaffolded.phases[0].status, Status::Planning);
        assert_eq!(scaffolded.phases[0].stage_actions, vec![stage]);

        let detail =
            std::fs::read_to_string(root.join("AI_first/ui/project_data_import.html")).unwrap();
        assert!(detail.contains("<template id=\"phase01-action\">"));
        assert!(detail.contains("<li><strong>Owner:</strong> Grace</li>"));
    }

    #[test]
    fn scaffolded_pages_accept_dashboard_render() {
        let dir = repo();
        let root = dir.path();
        std::fs::write(root.join("AI_first/ui/PM.html"), PM_PAGE.replace(
            "            <tr data-link=\"project_bugmgmt.html\" tabindex=\"0\">\n            </tr>\n",
            "",
        ))
        .unwrap();
        std::fs::write(root.join("AI_first/docs/projectplan.md"), "## Projects\n").unwrap();
        let mut config = Config::default();
        init_project(root, &mut config, &InitOptions::new("alpha"), date()).unwrap();

        let report = crate::dashboard::render_dashboards(root, &config.layout, false).unwrap();
        assert_eq!(report.projects, 1);
        assert!(report.skipped.is_empty());
        let pm = std::fs::read_to_string(root.join("AI_first/ui/PM.html")).unwrap();
        assert!(pm.contains(r#"data-count="projects">1</div>"#));
    }

    #[test]
    fn conflicts_write_nothing() {
        let dir = repo();
        let root = dir.path();
        let mut config = Config::default();
        let mut opts = InitOptions::new("data");
        opts.prefix = Some("XYZ".into());
        config.issues.prefixes.insert("data".into(), "DAT".into());

        let err = init_project(root, &mut config, &opts, date()).unwrap_err();
        assert!(matches!(err, PmError::MappingConflict { .. }));
        assert!(!root.join("AI_first/projects/data").exists());
        assert_eq!(
            std::fs::read_to_string(root.join("AI_first/docs/projectplan.md")).unwrap(),
            PLAN
        );
    }

    #[test]
    fn rejects_bad_slug_prefix_and_existing_dir() {
        let dir = repo();
        let root = dir.path();
        let mut config = Config::default();
        assert!(matches!(
            init_project(root, &mut config, &InitOptions::new("Bad-Slug"), date()),
            Err(PmError::InvalidSlug(_))
        ));
        let mut opts = InitOptions::new("ok");
        opts.prefix = Some("lower".into());
        assert!(matches!(
            init_project(root, &mut config, &opts, date()),
            Err(PmError::InvalidPrefix(_))
        ));
        std::fs::create_dir_all(root.join("AI_first/projects/ok")).unwrap();
        assert!(matches!(
            init_project(root, &mut config, &InitOptions::new("ok"), date()),
            Err(PmError::ProjectExists(_))
        ));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = repo();
        let root = dir.path();
        let mut config = Config::default();
        let mut opts = InitOptions::new("beta");
        opts.dry_run = true;
        opts.prefix = Some("BET".into());
        let report = init_project(root, &mut config, &opts, date()).unwrap();
        assert!(report.dry_run);
        assert!(report.prefix_added);
        assert!(!root.join("AI_first/projects/beta").exists());
        assert!(!paths::config_path(root).exists());
        assert_eq!(config.issues.prefix_for("beta"), None);
    }
}
