use serde::{Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Normalized project/phase status.
///
/// Unrecognised values are kept as `Other` so they render literally instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Complete,
    Planning,
    Active,
    Other(String),
}

impl Status {
    /// Case-insensitive substring match: complete/closed, planning/draft, active/in progress.
    /// Anything else is lowercased with spaces turned into underscores. Blank input is `None`.
    pub fn normalize(value: &str) -> Option<Status> {
        let text = value.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        let status = if text.contains("complete") || text.contains("closed") {
            Status::Complete
        } else if text.contains("planning") || text.contains("draft") {
            Status::Planning
        } else if text.contains("active")
            || text.contains("in progress")
            || text.contains("in_progress")
        {
            Status::Active
        } else {
            Status::Other(text.replace(' ', "_"))
        };
        Some(status)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Complete => "complete",
            Status::Planning => "planning",
            Status::Active => "active",
            Status::Other(s) => s,
        }
    }

    pub fn is_complete(&self) -> bool {
        *self == Status::Complete
    }

    /// Badge label and CSS class. Unknown states share the active badge.
    pub fn badge(&self) -> (&'static str, &'static str) {
        match self {
            Status::Complete => ("Complete", "status-closed"),
            Status::Planning => ("Planning", "status-open"),
            _ => ("Active", "status-in_progress"),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
