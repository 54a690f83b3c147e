//! Target selection configuration.
//!
//! Maps executable names to the window-title fragment that confirms the
//! right process, plus a disambiguation index for the case where several
//! instances of the target are running at once.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// One attachable target: an executable name and a window-title fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    pub process_name: String,
    pub window_title: String,
}

/// The target table, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub targets: Vec<TargetEntry>,
    /// 0-based pick when more than one process matches the table.
    #[serde(default)]
    pub process_index: usize,
    /// Restart attach polling after the target exits.
    #[serde(default = "default_reattach")]
    pub reattach: bool,
}

fn default_reattach() -> bool {
    true
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            process_index: 0,
            reattach: true,
        }
    }
}

impl TargetConfig {
    /// Whether a process name/window title pair matches the table.
    ///
    /// Names compare case-insensitively; the title match is a
    /// case-insensitive substring check.
    pub fn matches(&self, name: &str, window_title: &str) -> bool {
        let title = window_title.to_lowercase();
        self.targets.iter().any(|entry| {
            entry.process_name.eq_ignore_ascii_case(name)
                && title.contains(&entry.window_title.to_lowercase())
        })
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TargetConfig> {
    let content = fs::read_to_string(&path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &TargetConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Load the config file, creating it with defaults when missing.
pub fn create_or_load_config<P: AsRef<Path>>(path: P) -> Result<TargetConfig> {
    if path.as_ref().exists() {
        return load_config(path);
    }
    let config = TargetConfig::default();
    save_config(path, &config)?;
    Ok(config)
}
