use crate::error::{PmError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Environment override for the repository-wide default issue owner.
pub const REPO_OWNER_ENV: &str = "BUGMGMT_REPO_OWNER";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

/// Where sources and generated pages live, relative to the repository root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_projectplan")]
    pub projectplan: PathBuf,
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    #[serde(default = "default_ui_dir")]
    pub ui_dir: PathBuf,
    #[serde(default = "default_pm_page")]
    pub pm_page: PathBuf,
    #[serde(default = "default_issues_log")]
    pub issues_log: PathBuf,
    #[serde(default = "default_issues_json")]
    pub issues_json: PathBuf,
    #[serde(default = "default_issues_html")]
    pub issues_html: PathBuf,
    #[serde(default = "default_docs_out")]
    pub docs_out: PathBuf,
}

fn default_projectplan() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PROJECTPLAN)
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PROJECTS_DIR)
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DOCS_DIR)
}

fn default_ui_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_UI_DIR)
}

fn default_pm_page() -> PathBuf {
    PathBuf::from(paths::DEFAULT_PM_PAGE)
}

fn default_issues_log() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ISSUES_LOG)
}

fn default_issues_json() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ISSUES_JSON)
}

fn default_issues_html() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ISSUES_HTML)
}

fn default_docs_out() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DOCS_OUT)
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            projectplan: default_projectplan(),
            projects_dir: default_projects_dir(),
            docs_dir: default_docs_dir(),
            ui_dir: default_ui_dir(),
            pm_page: default_pm_page(),
            issues_log: default_issues_log(),
            issues_json: default_issues_json(),
            issues_html: default_issues_html(),
            docs_out: default_docs_out(),
        }
    }
}

// ---------------------------------------------------------------------------
// IssueConfig
// ---------------------------------------------------------------------------

/// Per-project ID prefixes and owners used by issue validation and owner defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueConfig {
    #[serde(default = "default_prefixes")]
    pub prefixes: BTreeMap<String, String>,
    #[serde(default)]
    pub owners: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_owner: Option<String>,
}

fn default_prefixes() -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("bugmgmt".to_string(), "BMG".to_string());
    m.insert("project_management".to_string(), "PMG".to_string());
    m
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
            owners: BTreeMap::new(),
            default_owner: None,
        }
    }
}

impl IssueConfig {
    /// Prefix configured for `project`, matched case-insensitively on the project key.
    pub fn prefix_for(&self, project: &str) -> Option<&str> {
        lookup_lower(&self.prefixes, project)
    }

    pub fn owner_for(&self, project: &str) -> Option<&str> {
        lookup_lower(&self.owners, project)
    }

    /// Owner used when neither the issue nor the per-project table names one.
    ///
    /// Order: `default_owner` in config, `BUGMGMT_REPO_OWNER`, `git config user.name`.
    pub fn resolve_default_owner(&self) -> Option<String> {
        if let Some(owner) = self.default_owner.as_deref().map(str::trim) {
            if !owner.is_empty() {
                return Some(owner.to_string());
            }
        }
        if let Ok(owner) = std::env::var(REPO_OWNER_ENV) {
            let owner = owner.trim();
            if !owner.is_empty() {
                return Some(owner.to_string());
            }
        }
        git_user_name()
    }

    /// Record `prefix` for `project`. Returns `false` when already present with the same value.
    pub fn set_prefix(&mut self, project: &str, prefix: &str) -> Result<bool> {
        paths::validate_prefix(prefix)?;
        insert_mapping(&mut self.prefixes, "prefixes", project, prefix)
    }

    /// Record `owner` for `project`. Returns `false` when already present with the same value.
    pub fn set_owner(&mut self, project: &str, owner: &str) -> Result<bool> {
        insert_mapping(&mut self.owners, "owners", project, owner)
    }
}

fn lookup_lower<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    let key = key.trim().to_lowercase();
    map.get(&key)
        .or_else(|| {
            map.iter()
                .find(|(k, _)| k.to_lowercase() == key)
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

fn insert_mapping(
    map: &mut BTreeMap<String, String>,
    table: &str,
    key: &str,
    value: &str,
) -> Result<bool> {
    match map.get(key) {
        Some(existing) if existing == value => Ok(false),
        Some(existing) => Err(PmError::MappingConflict {
            table: table.to_string(),
            key: key.to_string(),
            existing: existing.clone(),
        }),
        None => {
            map.insert(key.to_string(), value.to_string());
            Ok(true)
        }
    }
}

fn git_user_name() -> Option<String> {
    let git = which::which("git").ok()?;
    let output = std::process::Command::new(git)
        .args(["config", "user.name"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub issues: IssueConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            layout: LayoutConfig::default(),
            issues: IssueConfig::default(),
        }
    }
}

impl Config {
    /// Load `.pmboard/config.yaml`, or the built-in defaults when the file is absent.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (project, prefix) in &self.issues.prefixes {
            if !paths::is_valid_prefix(prefix) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "prefix '{prefix}' for project '{project}' must be uppercase letters/numbers"
                    ),
                });
            }
        }

        let mut by_prefix: HashMap<&str, Vec<&str>> = HashMap::new();
        for (project, prefix) in &self.issues.prefixes {
            by_prefix.entry(prefix).or_default().push(project);
        }
        let mut shared: Vec<_> = by_prefix.into_iter().filter(|(_, p)| p.len() > 1).collect();
        shared.sort();
        for (prefix, projects) in shared {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "prefix '{prefix}' is shared by projects {}",
                    projects.join(", ")
                ),
            });
        }

        for project in self.issues.owners.keys() {
            if self.issues.prefix_for(project).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("owner configured for '{project}' which has no prefix"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
