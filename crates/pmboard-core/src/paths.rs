use crate::error::{PmError, Result};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PMBOARD_DIR: &str = ".pmboard";
pub const CONFIG_FILE: &str = ".pmboard/config.yaml";

pub const DEFAULT_PROJECTPLAN: &str = "AI_first/docs/projectplan.md";
pub const DEFAULT_PROJECTS_DIR: &str = "AI_first/projects";
pub const DEFAULT_DOCS_DIR: &str = "AI_first/docs";
pub const DEFAULT_UI_DIR: &str = "AI_first/ui";
pub const DEFAULT_PM_PAGE: &str = "AI_first/ui/PM.html";
pub const DEFAULT_ISSUES_LOG: &str = "AI_first/bugmgmt/issues/issues.jsonl";
pub const DEFAULT_ISSUES_JSON: &str = "AI_first/bugmgmt/exports/json/bugmgmt_issues.json";
pub const DEFAULT_ISSUES_HTML: &str = "AI_first/ui/bugmgmt_issues.html";
pub const DEFAULT_DOCS_OUT: &str = "AI_first/ui/docs";

pub const STYLESHEET: &str = "style/bugmgmt.css";
pub const PROCESS_GUIDE: &str = "process_guide.html";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn project_dir(projects_dir: &Path, slug: &str) -> PathBuf {
    projects_dir.join(slug)
}

pub fn project_summary(projects_dir: &Path, slug: &str) -> PathBuf {
    project_dir(projects_dir, slug).join(format!("project_summary_{slug}.md"))
}

pub fn phase_dir(projects_dir: &Path, slug: &str, number: &str) -> PathBuf {
    project_dir(projects_dir, slug)
        .join("phases")
        .join(format!("phase{number}"))
}

pub fn phase_definition(phase_dir: &Path) -> PathBuf {
    phase_dir.join("phase_definition.md")
}

pub fn action_plan(phase_dir: &Path, number: &str) -> PathBuf {
    phase_dir.join(format!("action_plan_phase{number}.md"))
}

pub fn actions_dir(phase_dir: &Path) -> PathBuf {
    phase_dir.join("actions")
}

pub fn detail_page(ui_dir: &Path, slug: &str) -> PathBuf {
    ui_dir.join(format!("project_{slug}.html"))
}

/// Path of `target` as seen from directory `from_dir`, walking up with `..` as needed.
/// When no relative form exists (relative `target` against an absolute `from_dir`), `target`
/// is returned unchanged.
pub fn relative_path(from_dir: &Path, target: &Path) -> PathBuf {
    match pathdiff::diff_paths(target, from_dir) {
        Some(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
        Some(rel) => rel,
        None => target.to_path_buf(),
    }
}

/// Render a path with forward slashes regardless of platform, for use in HTML.
/// Absolute paths keep a single leading `/`.
pub fn to_posix(path: &Path) -> String {
    let mut out = String::new();
    for c in path.components() {
        match c {
            Component::RootDir => out.push('/'),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Slug / prefix validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();
static PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap())
}

fn prefix_re() -> &'static Regex {
    PREFIX_RE.get_or_init(|| Regex::new(r"^[A-Z0-9]+$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if !slug_re().is_match(slug) {
        return Err(PmError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

pub fn is_valid_prefix(prefix: &str) -> bool {
    prefix_re().is_match(prefix)
}

pub fn validate_prefix(prefix: &str) -> Result<()> {
    if !is_valid_prefix(prefix) {
        return Err(PmError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        for slug in ["bugmgmt", "project_management", "a1", "x"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in ["", "1abc", "with-dash", "Upper", "_lead"] {
            assert!(
                matches!(validate_slug(slug), Err(PmError::InvalidSlug(_))),
                "expected invalid: {slug}"
            );
        }
    }

    #[test]
    fn prefixes() {
        assert!(is_valid_prefix("BMG"));
        assert!(is_valid_prefix("P2"));
        assert!(!is_valid_prefix("bmg"));
        assert!(!is_valid_prefix("B-M"));
    }

    #[test]
    fn phase_layout() {
        let dir = phase_dir(Path::new("AI_first/projects"), "bugmgmt", "02");
        assert_eq!(dir, Path::new("AI_first/projects/bugmgmt/phases/phase02"));
        assert_eq!(
            action_plan(&dir, "02"),
            Path::new("AI_first/projects/bugmgmt/phases/phase02/action_plan_phase02.md")
        );
    }

    #[test]
    fn relative_sibling_dirs() {
        let rel = relative_path(
            Path::new("/repo/AI_first/ui"),
            Path::new("/repo/AI_first/bugmgmt/exports/json/bugmgmt_issues.json"),
        );
        assert_eq!(to_posix(&rel), "../bugmgmt/exports/json/bugmgmt_issues.json");
    }

    #[test]
    fn relative_same_dir() {
        let rel = relative_path(Path::new("/repo/ui"), Path::new("/repo/ui/PM.html"));
        assert_eq!(to_posix(&rel), "PM.html");
        let rel = relative_path(Path::new("/repo/ui"), Path::new("/repo/ui"));
        assert_eq!(to_posix(&rel), ".");
    }

    #[test]
    fn relative_without_common_base_keeps_target() {
        let rel = relative_path(Path::new("/repo/ui"), Path::new("AI_first/x.json"));
        assert_eq!(rel, Path::new("AI_first/x.json"));
    }

    #[test]
    fn posix_absolute_has_single_leading_slash() {
        assert_eq!(to_posix(Path::new("/repo/AI_first/projects")), "/repo/AI_first/projects");
        assert_eq!(to_posix(Path::new("AI_first/projects/")), "AI_first/projects");
        assert_eq!(to_posix(Path::new("/")), "/");
    }
}
