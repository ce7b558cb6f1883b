use crate::config::{Config, IssueConfig};
use crate::error::{PmError, Result};
use crate::io::atomic_write;
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const STATUS_ORDER: [&str; 3] = ["open", "in_progress", "closed"];
pub const SEVERITY_ORDER: [&str; 4] = ["critical", "major", "minor", "nit"];

/// Owner values that mean "nobody yet" and get replaced at export time.
pub const OWNER_PLACEHOLDERS: [&str; 4] = ["", "unassigned", "<assign>", "tbd"];

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| {
        Regex::new(r"^(?P<prefix>[A-Z0-9]+)-(?P<year>\d{4})-(?P<month>\d{2})-(?P<seq>\d{3})$")
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// One row of the issue log. Every key of the source object is kept, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issue(Map<String, Value>);

impl Issue {
    /// Field as trimmed text: missing/null is empty, non-strings use their JSON form.
    pub fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string().trim().to_string(),
        }
    }

    pub fn id(&self) -> String {
        self.text("id")
    }

    pub fn project(&self) -> String {
        self.text("project")
    }

    pub fn status(&self) -> String {
        self.text("status")
    }

    pub fn severity(&self) -> String {
        self.text("severity")
    }

    pub fn owner(&self) -> String {
        self.text("owner")
    }

    pub fn set_owner(&mut self, owner: &str) {
        self.0
            .insert("owner".to_string(), Value::String(owner.to_string()));
    }
}

pub fn status_rank(status: &str) -> usize {
    rank(&STATUS_ORDER, status)
}

pub fn severity_rank(severity: &str) -> usize {
    rank(&SEVERITY_ORDER, severity)
}

fn rank(order: &[&str], value: &str) -> usize {
    let value = value.to_lowercase();
    order
        .iter()
        .position(|o| *o == value)
        .unwrap_or(order.len())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read the JSONL log. A missing file is an empty log.
pub fn load(path: &Path) -> Result<Vec<Issue>> {
    match crate::io::read_optional(path)? {
        Some(text) => Ok(parse_log(&text)),
        None => Ok(Vec::new()),
    }
}

/// Parse JSONL text, skipping blank lines, malformed JSON and non-object rows.
pub fn parse_log(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => issues.push(Issue(map)),
            Ok(_) => tracing::warn!(line = idx + 1, "skipping non-object issue row"),
            Err(e) => tracing::warn!(line = idx + 1, error = %e, "skipping malformed issue row"),
        }
    }
    issues
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check every issue's ID shape and prefix against its project's configured prefix.
///
/// All violations are collected into one `IssueValidation` error.
pub fn validate(issues: &[Issue], config: &IssueConfig) -> Result<()> {
    let mut errors = Vec::new();
    for (idx, issue) in issues.iter().enumerate() {
        let n = idx + 1;
        let project = issue.project();
        let id = issue.id();
        if project.is_empty() || id.is_empty() {
            errors.push(format!(
                "#{n} missing project or id (project='{project}', id='{id}')"
            ));
            continue;
        }
        let Some(caps) = id_re().captures(&id) else {
            errors.push(format!("#{n} id '{id}' does not match <PREFIX>-YYYY-MM-NNN"));
            continue;
        };
        let actual = &caps["prefix"];
        match config.prefix_for(&project) {
            None => errors.push(format!(
                "#{n} project '{project}' has no configured prefix (add it under issues.prefixes)"
            )),
            Some(expected) if expected != actual => errors.push(format!(
                "#{n} id '{id}' prefix '{actual}' does not match project '{project}' prefix '{expected}'"
            )),
            Some(_) => {}
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PmError::IssueValidation(errors))
    }
}

// ---------------------------------------------------------------------------
// Owner defaults / ordering
// ---------------------------------------------------------------------------

/// Replace placeholder owners with the project's owner, else `fallback`.
/// Issues without a project are left alone.
pub fn apply_owner_defaults(issues: &mut [Issue], config: &IssueConfig, fallback: Option<&str>) {
    for issue in issues.iter_mut() {
        let project = issue.project();
        if project.is_empty() {
            continue;
        }
        let owner = issue.owner().to_lowercase();
        if !OWNER_PLACEHOLDERS.contains(&owner.as_str()) {
            continue;
        }
        let default = config
            .owner_for(&project)
            .or(fallback)
            .filter(|o| !o.trim().is_empty());
        if let Some(default) = default {
            issue.set_owner(default);
        }
    }
}

/// Stable sort by status rank, project (case-insensitive), severity rank, then raw ID.
pub fn sort(issues: &mut [Issue]) {
    issues.sort_by_cached_key(|issue| {
        (
            status_rank(&issue.status()),
            issue.project().to_lowercase(),
            severity_rank(&issue.severity()),
            issue.id(),
        )
    });
}

/// Open-issue counts per project, read tolerantly from the log.
pub fn count_open_by_project(path: &Path) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for issue in load(path)? {
        if issue.status().to_lowercase() != "open" {
            continue;
        }
        let project = issue.project();
        if project.is_empty() {
            continue;
        }
        *counts.entry(project).or_insert(0) += 1;
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// Compact JSON formatter that escapes every non-ASCII character as `\uXXXX`.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Compact, ASCII-only JSON array of the issues in their current order.
pub fn to_json(issues: &[Issue]) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
    issues.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Issue list page. `json_path` is what the page fetches; the same data is inlined as fallback.
pub fn to_html(issues: &[Issue], json_path: &str, source: &str) -> Result<String> {
    let data = to_json(issues)?;
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Bug Mgmt Issues</title>
  <link rel="stylesheet" href="style/bugmgmt.css" />
</head>
<body>
  <div class="container">
    <nav class="top-nav">
      <a class="nav-link nav-project" href="PM.html">Project Mgmt</a>
      <a class="nav-link nav-bug" href="bugmgmt_issues.html">Bug Mgmt</a>
      <a class="nav-link nav-process" href="process_guide.html">Process Mgmt</a>
    </nav>
    <header class="hero">
      <div>
        <h1 class="h4">Bug Mgmt Issues</h1>
        <p class="muted small">Local, PII-free issues · Deterministic sort (status → project → severity → ID)</p>
      </div>
      <div class="badges">
        <span class="chip" id="totalCount"></span>
      </div>
    </header>

    <div class="card">
      <div class="filter-grid">
        <label>Project<select id="project"></select></label>
        <label>Status<select id="status"></select></label>
        <label>Severity<select id="severity"></select></label>
        <label>Phase<select id="phase"></select></label>
        <label>Stage<select id="stage"></select></label>
        <label>Search<input id="search" placeholder="Search text..." /></label>
        <button id="resetFilters" class="btn">Reset filters</button>
      </div>
      <div class="filter-hint">Source: {source} · Regenerate exports only when you want the UI refreshed.</div>
      <div class="summary" id="summaryRow"></div>
    </div>

    <div class="card details">
      <div class="details-header">
        <div>
          <h2 class="h4" id="detailTitle">Issue Details</h2>
          <p class="muted small" id="detailMeta">Select a bug to view details.</p>
        </div>
        <div class="badges" id="detailBadges"></div>
      </div>
      <div class="details-grid" id="detailBody">
        <div class="muted small">No issue selected.</div>
      </div>
    </div>

    <div class="card">
      <div class="table-wrap">
        <table class="issues">
          <thead>
            <tr>
              <th>ID</th><th>Status</th><th>Severity</th><th>Project</th><th>Phase</th><th>Stage</th><th>Area</th><th>Details</th>
            </tr>
          </thead>
          <tbody id="issues-body"></tbody>
        </table>
      </div>
    </div>
  </div>
  <script>
    window.BUGMGMT_CONFIG = {{ jsonPath: "{json_path}" }};
    window.BUGMGMT_FALLBACK = {data};
  </script>
  <script src="assets/bugmgmt.js"></script>
</body>
</html>
"#,
        source = crate::markdown::escape_html(source),
    ))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Html,
}

#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub format: ExportFormat,
    pub output: PathBuf,
    pub issues: usize,
}

/// Load, validate, fill owners, sort, and write one export. Nothing is written when
/// validation fails. `output` defaults to the configured export path for `format`.
pub fn export(
    root: &Path,
    config: &Config,
    data: &Path,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<ExportSummary> {
    let data = root.join(data);
    let mut issues = load(&data)?;
    validate(&issues, &config.issues)?;
    let fallback = config.issues.resolve_default_owner();
    apply_owner_defaults(&mut issues, &config.issues, fallback.as_deref());
    sort(&mut issues);

    let layout = &config.layout;
    let (content, output) = match format {
        ExportFormat::Json => (
            to_json(&issues)?,
            root.join(output.unwrap_or(&layout.issues_json)),
        ),
        ExportFormat::Html => {
            let output = root.join(output.unwrap_or(&layout.issues_html));
            let json_rel = paths::relative_path(
                output.parent().unwrap_or(root),
                &root.join(&layout.issues_json),
            );
            let source = paths::to_posix(data.strip_prefix(root).unwrap_or(&data));
            (to_html(&issues, &paths::to_posix(&json_rel), &source)?, output)
        }
    };
    atomic_write(&output, content.as_bytes())?;
    tracing::info!(count = issues.len(), output = %output.display(), "exported issues");

    Ok(ExportSummary {
        format,
        output,
        issues: issues.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
