//! Parser for the global project plan (`## Projects` section).
//!
//! ```markdown
//! ## Projects
//! - **bugmgmt (active)**
//!   - Summary: `AI_first/projects/bugmgmt/project_summary_bugmgmt.md`
//!   - Phases overview:
//!     - Phase 01 — Intake (complete): see `AI_first/projects/bugmgmt/phases/phase01/`.
//! ```

use crate::error::Result;
use crate::status::Status;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const EM_DASH: char = '\u{2014}';
pub const PROJECTS_HEADING: &str = "## Projects";

static PROJECT_RE: OnceLock<Regex> = OnceLock::new();
static SUMMARY_RE: OnceLock<Regex> = OnceLock::new();
static PHASE_RE: OnceLock<Regex> = OnceLock::new();

fn project_re() -> &'static Regex {
    PROJECT_RE.get_or_init(|| {
        Regex::new(r"^- \*\*(?P<slug>[a-z0-9_]+)(?: \((?P<status>[^)]+)\))?\*\*").unwrap()
    })
}

fn summary_re() -> &'static Regex {
    SUMMARY_RE.get_or_init(|| Regex::new(r"Summary:\s+`(?P<path>[^`]+)`").unwrap())
}

fn phase_re() -> &'static Regex {
    PHASE_RE.get_or_init(|| {
        Regex::new(&format!(
            r"^\s+- Phase\s+(?P<num>\d+)\s+{EM_DASH}\s+(?P<name>[^()]+?)(?:\s+\((?P<status>[^)]+)\))?:\s+see\s+`(?P<path>[^`]+)`"
        ))
        .unwrap()
    })
}

/// A project bullet as written in the plan, before any derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedProject {
    pub slug: String,
    pub status: Option<Status>,
    pub summary_path: Option<String>,
    pub phases: Vec<PlannedPhase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPhase {
    /// Zero-padded to at least two digits.
    pub number: String,
    pub name: String,
    pub status: Option<Status>,
    pub path: String,
}

pub fn load(path: &Path) -> Result<Vec<PlannedProject>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse(&text))
}

/// Parse the `## Projects` section. Parsing stops at the next `## ` heading.
pub fn parse(text: &str) -> Vec<PlannedProject> {
    let mut in_projects = false;
    let mut projects = Vec::new();
    let mut current: Option<PlannedProject> = None;

    for line in text.lines() {
        if line.starts_with(PROJECTS_HEADING) {
            in_projects = true;
            continue;
        }
        if !in_projects {
            continue;
        }
        if line.starts_with("## ") {
            break;
        }

        if let Some(caps) = project_re().captures(line.trim()) {
            projects.extend(current.take());
            current = Some(PlannedProject {
                slug: caps["slug"].to_string(),
                status: caps.name("status").and_then(|m| Status::normalize(m.as_str())),
                summary_path: None,
                phases: Vec::new(),
            });
            continue;
        }
        let Some(project) = current.as_mut() else {
            continue;
        };
        if let Some(caps) = summary_re().captures(line) {
            project.summary_path = Some(caps["path"].to_string());
            continue;
        }
        if let Some(caps) = phase_re().captures(line) {
            project.phases.push(PlannedPhase {
                number: zero_pad(&caps["num"]),
                name: caps["name"].trim().to_string(),
                status: caps.name("status").and_then(|m| Status::normalize(m.as_str())),
                path: caps["path"].to_string(),
            });
        }
    }
    projects.extend(current);
    projects
}

/// Left-pad a phase number with zeros to two digits.
pub fn zero_pad(number: &str) -> String {
    format!("{number:0>2}")
}
