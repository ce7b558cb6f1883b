use crate::config::LayoutConfig;
use crate::error::{PmError, Result};
use crate::fields;
use crate::io::read_optional;
use crate::paths;
use crate::plan::{self, PlannedProject};
use crate::status::Status;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const UNASSIGNED: &str = "unassigned";
pub const TBD: &str = "TBD";

static GOAL_PHASE_RE: OnceLock<Regex> = OnceLock::new();
static GOAL_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
static ISO_DATE_RE: OnceLock<Regex> = OnceLock::new();

fn goal_phase_re() -> &'static Regex {
    GOAL_PHASE_RE.get_or_init(|| Regex::new(r"Phase\s+(\d{1,2})").unwrap())
}

fn goal_prefix_re() -> &'static Regex {
    GOAL_PREFIX_RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^Phase\s+\d{{1,2}}\s*(?:{}|-)?\s*", plan::EM_DASH)).unwrap()
    })
}

fn iso_date_re() -> &'static Regex {
    ISO_DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

// ---------------------------------------------------------------------------
// Resolved records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PhaseInfo {
    pub number: String,
    pub name: String,
    pub status: Status,
    pub completed: Option<String>,
    pub phase_def_path: PathBuf,
    pub action_plan_path: PathBuf,
    pub stage_actions: Vec<PathBuf>,
}

impl PhaseInfo {
    /// `Phase NN — Name`
    pub fn label(&self) -> String {
        format!("Phase {} {} {}", self.number, plan::EM_DASH, self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub slug: String,
    pub status: Status,
    pub summary_path: PathBuf,
    pub purpose: String,
    pub current_goal: String,
    pub owner: String,
    pub phases: Vec<PhaseInfo>,
    pub active_phase: Option<String>,
}

impl ProjectInfo {
    pub fn active_phase_info(&self) -> Option<&PhaseInfo> {
        let active = self.active_phase.as_deref()?;
        self.phases.iter().find(|p| p.number == active)
    }

    /// True when the active phase exists and is not yet complete.
    pub fn has_open_active_phase(&self) -> bool {
        self.active_phase_info()
            .is_some_and(|p| !p.status.is_complete())
    }

    /// Latest `Completed:` date across phases, or `TBD`.
    pub fn last_updated(&self) -> String {
        latest_completed_date(&self.phases).unwrap_or_else(|| TBD.to_string())
    }

    pub fn next_actions(&self) -> [String; 2] {
        derive_next_actions(&self.current_goal, &self.status)
    }
}

// ---------------------------------------------------------------------------
// Source documents
// ---------------------------------------------------------------------------

/// Fields read from a project summary document. Later duplicates win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectSummary {
    pub purpose: String,
    pub current_goal: String,
    pub status: Option<Status>,
    pub owner: String,
}

impl ProjectSummary {
    pub fn parse(text: &str) -> Self {
        let mut summary = Self::default();
        for (label, value) in fields::fields(text) {
            match label.as_str() {
                "purpose" => summary.purpose = value.to_string(),
                "current goal" => summary.current_goal = value.to_string(),
                "status" => summary.status = Status::normalize(value),
                "owner" => summary.owner = value.to_string(),
                _ => {}
            }
        }
        summary
    }

    /// A missing summary document yields empty fields.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(read_optional(path)?
            .map(|text| Self::parse(&text))
            .unwrap_or_default())
    }
}

/// `Status:` and `Completed:` for a phase: the definition first, then the action plan.
///
/// The action plan is only consulted when the definition has no status; its `Completed:`
/// fills in only when the definition had none.
pub fn phase_status_completed(
    phase_def: &Path,
    action_plan: &Path,
) -> Result<(Option<Status>, Option<String>)> {
    let mut status = None;
    let mut completed = None;
    if let Some(text) = read_optional(phase_def)? {
        status = fields::extract_field(&text, "Status").and_then(|s| Status::normalize(&s));
        completed = fields::extract_field(&text, "Completed");
    }
    if status.is_none() {
        if let Some(text) = read_optional(action_plan)? {
            status = fields::extract_field(&text, "Status").and_then(|s| Status::normalize(&s));
            if completed.is_none() {
                completed = fields::extract_field(&text, "Completed");
            }
        }
    }
    Ok((status, completed))
}

/// Stage-action documents referenced from an action plan as backticked
/// `<projects_dir>/.../actions/*_action.md` paths, in document order.
pub fn referenced_stage_actions(action_plan: &str, projects_dir: &Path) -> Vec<PathBuf> {
    let prefix = regex::escape(&paths::to_posix(projects_dir));
    let Ok(re) = Regex::new(&format!(r"`({prefix}/[^`]+/actions/[^`]+_action\.md)`")) else {
        return Vec::new();
    };
    re.captures_iter(action_plan)
        .map(|caps| PathBuf::from(&caps[1]))
        .collect()
}

/// Stage actions for a phase: explicit references in the action plan, else every `*.md`
/// directly inside the phase's `actions/` directory, sorted.
pub fn discover_stage_actions(
    root: &Path,
    projects_dir: &Path,
    phase_dir: &Path,
    action_plan: &Path,
) -> Result<Vec<PathBuf>> {
    if let Some(text) = read_optional(action_plan)? {
        let referenced: Vec<PathBuf> = referenced_stage_actions(&text, projects_dir)
            .into_iter()
            .map(|rel| root.join(rel))
            .collect();
        if !referenced.is_empty() {
            return Ok(referenced);
        }
    }
    let actions = paths::actions_dir(phase_dir);
    if !actions.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(&actions)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

// ---------------------------------------------------------------------------
// Derivation rules
// ---------------------------------------------------------------------------

/// Phase in focus: the one named in `Current Goal` if it exists, else the first phase not
/// complete, else the last phase. `phases` pairs each number with its status so far.
pub fn determine_active_phase(
    current_goal: &str,
    phases: &[(String, Option<Status>)],
) -> Option<String> {
    if let Some(caps) = goal_phase_re().captures(current_goal) {
        let candidate = plan::zero_pad(&caps[1]);
        if phases.iter().any(|(number, _)| *number == candidate) {
            return Some(candidate);
        }
    }
    phases
        .iter()
        .find(|(_, status)| !status.as_ref().is_some_and(Status::is_complete))
        .or(phases.last())
        .map(|(number, _)| number.clone())
}

/// Status for a phase that neither the plan nor its documents named.
pub fn fallback_phase_status(is_active: bool, project_status: &Status) -> Status {
    if is_active && !project_status.is_complete() {
        Status::Active
    } else if project_status.is_complete() {
        Status::Complete
    } else {
        Status::Planning
    }
}

/// Maximum ISO-8601 `Completed:` date across phases.
pub fn latest_completed_date(phases: &[PhaseInfo]) -> Option<String> {
    phases
        .iter()
        .filter_map(|p| p.completed.as_deref())
        .filter(|d| iso_date_re().is_match(d))
        .max()
        .map(str::to_string)
}

fn default_actions(status: &Status) -> [&'static str; 2] {
    match status {
        Status::Complete => [
            "Maintain workflow, exports, and UI.",
            "Log new issues as they arise.",
        ],
        Status::Planning => [
            "Define scope and success criteria.",
            "Populate the active stage action.",
        ],
        _ => [
            "Execute active phase action plan.",
            "Update stage action with decisions/validation.",
        ],
    }
}

/// Capitalise the first letter and terminate with a period. Blank input is `None`.
fn as_sentence(text: &str) -> Option<String> {
    let text = text.trim();
    let mut chars = text.chars();
    let first = chars.next()?;
    let mut out = if first.is_lowercase() {
        first.to_uppercase().chain(chars).collect::<String>()
    } else {
        text.to_string()
    };
    if !out.ends_with('.') {
        out.push('.');
    }
    Some(out)
}

/// Exactly two next-action lines: clauses of `Current Goal` (without the `Phase NN —`
/// prefix, split on `;`), then status defaults, de-duplicated ignoring case and final period.
pub fn derive_next_actions(current_goal: &str, status: &Status) -> [String; 2] {
    let defaults = default_actions(status);
    let goal = goal_prefix_re().replace(current_goal.trim(), "");
    let clauses = goal
        .split(';')
        .map(|part| part.trim().trim_end_matches('.'))
        .filter(|part| !part.is_empty())
        .filter(|part| !matches!(part.to_lowercase().as_str(), "complete" | "completed"))
        .map(str::to_string);

    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(2);
    for item in clauses.chain(defaults.iter().map(|d| d.to_string())) {
        let Some(sentence) = as_sentence(&item) else {
            continue;
        };
        if !seen.insert(sentence.to_lowercase().trim_end_matches('.').to_string()) {
            continue;
        }
        result.push(sentence);
        if result.len() == 2 {
            break;
        }
    }

    let mut lines = result
        .into_iter()
        .chain(defaults.iter().map(|d| d.to_string()));
    [
        lines.next().unwrap_or_default(),
        lines.next().unwrap_or_default(),
    ]
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Parse the project plan and resolve every project against its documents.
pub fn build_projects(root: &Path, layout: &LayoutConfig) -> Result<Vec<ProjectInfo>> {
    let plan_path = root.join(&layout.projectplan);
    plan::load(&plan_path)?
        .into_iter()
        .map(|planned| build_project(root, layout, &plan_path, planned))
        .collect()
}

/// A phase whose status may still be waiting on the fallback rule.
struct PhaseDraft {
    number: String,
    name: String,
    status: Option<Status>,
    completed: Option<String>,
    phase_def_path: PathBuf,
    action_plan_path: PathBuf,
    stage_actions: Vec<PathBuf>,
}

pub fn build_project(
    root: &Path,
    layout: &LayoutConfig,
    plan_path: &Path,
    planned: PlannedProject,
) -> Result<ProjectInfo> {
    let PlannedProject {
        slug,
        status,
        summary_path,
        phases: planned_phases,
    } = planned;

    let Some(summary_rel) = summary_path else {
        return Err(PmError::MissingSummaryPath {
            slug,
            plan: plan_path.to_path_buf(),
        });
    };
    let summary_path = root.join(summary_rel);
    let summary = ProjectSummary::load(&summary_path)?;
    let project_status = status
        .or_else(|| summary.status.clone())
        .unwrap_or(Status::Active);

    let projects_dir = root.join(&layout.projects_dir);
    let mut drafts = Vec::with_capacity(planned_phases.len());
    for phase in planned_phases {
        let phase_dir = paths::phase_dir(&projects_dir, &slug, &phase.number);
        let phase_def_path = paths::phase_definition(&phase_dir);
        let action_plan_path = paths::action_plan(&phase_dir, &phase.number);
        let (doc_status, completed) = phase_status_completed(&phase_def_path, &action_plan_path)?;
        let stage_actions =
            discover_stage_actions(root, &layout.projects_dir, &phase_dir, &action_plan_path)?;
        drafts.push(PhaseDraft {
            number: phase.number,
            name: phase.name,
            status: phase.status.or(doc_status),
            completed,
            phase_def_path,
            action_plan_path,
            stage_actions,
        });
    }

    let known: Vec<(String, Option<Status>)> = drafts
        .iter()
        .map(|d| (d.number.clone(), d.status.clone()))
        .collect();
    let active_phase = determine_active_phase(&summary.current_goal, &known);
    let phases = drafts
        .into_iter()
        .map(|draft| {
            let status = draft.status.unwrap_or_else(|| {
                let is_active = active_phase.as_deref() == Some(draft.number.as_str());
                fallback_phase_status(is_active, &project_status)
            });
            PhaseInfo {
                number: draft.number,
                name: draft.name,
                status,
                completed: draft.completed,
                phase_def_path: draft.phase_def_path,
                action_plan_path: draft.action_plan_path,
                stage_actions: draft.stage_actions,
            }
        })
        .collect();

    let owner = if summary.owner.is_empty() {
        UNASSIGNED.to_string()
    } else {
        summary.owner
    };

    tracing::debug!(
        slug = %slug,
        status = %project_status,
        active = ?active_phase,
        "resolved project"
    );

    Ok(ProjectInfo {
        slug,
        status: project_status,
        summary_path,
        purpose: summary.purpose,
        current_goal: summary.current_goal,
        owner,
        phases,
        active_phase,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
