use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PmError {
    #[error("issue ID validation failed:\n{}", .0.join("\n"))]
    IssueValidation(Vec<String>),

    #[error("missing summary path for project {slug} in {}", plan.display())]
    MissingSummaryPath { slug: String, plan: PathBuf },

    #[error("{}: missing marker block: {start} ... {end}", path.display())]
    MissingMarkers {
        path: PathBuf,
        start: String,
        end: String,
    },

    #[error(
        "invalid project slug '{0}': must be lowercase snake_case (letters, numbers, underscores) and start with a letter"
    )]
    InvalidSlug(String),

    #[error("invalid prefix '{0}': must be uppercase letters/numbers only (example: BMG)")]
    InvalidPrefix(String),

    #[error("{} already exists; choose a new project slug or remove it", .0.display())]
    ProjectExists(PathBuf),

    #[error("{} already references {what}", file.display())]
    AlreadyRegistered { file: PathBuf, what: String },

    #[error("{table} already maps '{key}' to '{existing}'; use a different key or update manually")]
    MappingConflict {
        table: String,
        key: String,
        existing: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PmError>;
