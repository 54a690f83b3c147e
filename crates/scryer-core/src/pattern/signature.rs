use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Names the pattern library publishes and the remote tree binds against.
pub mod names {
    pub const STATE_HUB: &str = "stateHub";
    pub const CHANGE_COUNTER: &str = "changeCounter";
    pub const VIEW_SCALE: &str = "viewScale";
    pub const INDEX_TABLE: &str = "indexTable";
}

/// A wildcard byte signature locating one static structure.
///
/// `offset` is added to the match position to reach the embedded 4-byte
/// relative value; `addend` is added after that value is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPattern {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub addend: i64,
}

impl StaticPattern {
    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }
}

/// The pattern library, loaded once at startup. Immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSet {
    pub patterns: Vec<StaticPattern>,
}

impl PatternSet {
    pub fn entry(&self, name: &str) -> Option<&StaticPattern> {
        self.patterns
            .iter()
            .find(|pattern| pattern.name.eq_ignore_ascii_case(name))
    }
}

pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<PatternSet> {
    let content = fs::read_to_string(&path)?;
    let set = serde_json::from_str(&content)?;
    Ok(set)
}

pub fn save_patterns<P: AsRef<Path>>(path: P, set: &PatternSet) -> Result<()> {
    let content = serde_json::to_string_pretty(set)?;
    fs::write(path, content)?;
    Ok(())
}

/// Load the pattern file, creating it with the builtin set when missing.
pub fn create_or_load_patterns<P: AsRef<Path>>(path: P) -> Result<PatternSet> {
    if path.as_ref().exists() {
        return load_patterns(path);
    }
    let set = builtin_patterns();
    save_patterns(path, &set)?;
    Ok(set)
}

/// Compiled-in pattern set used when no pattern file is present.
pub fn builtin_patterns() -> PatternSet {
    PatternSet {
        patterns: vec![
            StaticPattern {
                name: names::STATE_HUB.to_string(),
                pattern: "48 8B 05 ?? ?? ?? ?? 48 85 C0 74".to_string(),
                offset: 3,
                addend: 4,
            },
            StaticPattern {
                name: names::CHANGE_COUNTER.to_string(),
                pattern: "FF 05 ?? ?? ?? ?? 48 8B 4C 24".to_string(),
                offset: 2,
                addend: 4,
            },
            StaticPattern {
                name: names::VIEW_SCALE.to_string(),
                pattern: "F3 0F 10 05 ?? ?? ?? ?? 0F 28 C8".to_string(),
                offset: 4,
                addend: 4,
            },
            StaticPattern {
                name: names::INDEX_TABLE.to_string(),
                pattern: "4C 8D 0D ?? ?? ?? ?? 49 8B 14 C1".to_string(),
                offset: 3,
                addend: 4,
            },
        ],
    }
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16)
            .map_err(|e| Error::InvalidPattern(format!("Invalid token '{}': {}", token, e)))?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidPattern("Pattern is empty".to_string()));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
