//! Schema templates: named, ordered lists of level types
//!
//! A template constrains the depth and type sequence of a domain tree:
//! level 0 nodes hang directly under the domain root, level 1 nodes under
//! level 0 nodes, and so on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a level list was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LevelsError {
    #[error("levels must be a list of strings")]
    NotAList,

    #[error("level {0} is empty")]
    Empty(usize),

    #[error("level '{0}' appears more than once")]
    Duplicate(String),
}

/// Named ordered level-type list a domain tree is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTemplate {
    name: String,
    levels: Vec<String>,
}

impl SchemaTemplate {
    /// Create a template after checking the level list.
    pub fn new(name: impl Into<String>, levels: Vec<String>) -> Result<Self, LevelsError> {
        check_levels(&levels)?;
        Ok(Self {
            name: name.into(),
            levels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Index of a level type, `None` if the type is not part of the template.
    pub fn level_of(&self, kind: &str) -> Option<usize> {
        self.levels.iter().position(|level| level == kind)
    }

    /// Level type expected at `index`.
    pub fn level_at(&self, index: usize) -> Option<&str> {
        self.levels.get(index).map(String::as_str)
    }
}

/// Level names must be non-blank and unique, compared case-insensitively.
pub fn check_levels(levels: &[String]) -> Result<(), LevelsError> {
    let mut seen = HashSet::new();
    for (i, level) in levels.iter().enumerate() {
        if level.trim().is_empty() {
            return Err(LevelsError::Empty(i));
        }
        if !seen.insert(level.to_lowercase()) {
            return Err(LevelsError::Duplicate(level.clone()));
        }
    }
    Ok(())
}
