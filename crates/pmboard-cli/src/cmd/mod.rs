pub mod config;
pub mod docs;
pub mod issues;
pub mod project;
pub mod render;
pub mod watch;

use anyhow::Context;
use pmboard_core::config::Config;
use std::path::Path;

/// `.pmboard/config.yaml` under `root`, or defaults when absent.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(root).context("failed to load .pmboard/config.yaml")
}
