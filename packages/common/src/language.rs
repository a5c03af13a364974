use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How one accepted language is stored and run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Display name (e.g., "C++", "Ruby").
    pub name: String,
    /// Runtime tag handed to the harness (e.g., "cpp", "java").
    pub runtime: String,
    /// Source extension including the dot (e.g., ".cpp").
    pub extension: String,
    /// Fixed base filename some runtimes require (e.g., "Main" for Java).
    #[serde(default)]
    pub entry_point: Option<String>,
}

/// Language tag -> configuration, loaded once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTable(HashMap<String, LanguageConfig>);

impl LanguageTable {
    pub fn get(&self, tag: &str) -> Option<&LanguageConfig> {
        self.0.get(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, LanguageConfig)> for LanguageTable {
    fn from_iter<T: IntoIterator<Item = (String, LanguageConfig)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
