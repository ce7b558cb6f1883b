pub mod config;
pub mod dashboard;
pub mod docs;
pub mod error;
pub mod fields;
pub mod io;
pub mod issue;
pub mod markdown;
pub mod paths;
pub mod plan;
pub mod project;
pub mod scaffold;
pub mod status;
pub mod watch;

pub use error::{PmError, Result};
