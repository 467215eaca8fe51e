// Externalized configuration for the normalizer and the query interpreter

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing sections and fields fall
    /// back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Normalizer settings: how many metadata lines precede the header, which
/// column names a country, and which aggregate pseudo-countries to drop.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_header_skip_rows")]
    pub header_skip_rows: usize,
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
    #[serde(default = "default_excluded_group_names")]
    pub excluded_group_names: BTreeSet<String>,
}

fn default_header_skip_rows() -> usize { 4 }
fn default_identifier_column() -> String { "Country Name".to_string() }

fn default_excluded_group_names() -> BTreeSet<String> {
    ["World", "High income", "Low income", "Middle income", "OECD", "Euro area"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_skip_rows: default_header_skip_rows(),
            identifier_column: default_identifier_column(),
            excluded_group_names: default_excluded_group_names(),
        }
    }
}

/// Interpreter settings. Ignored words are capitalized words that are never
/// treated as country candidates (sentence-initial verbs and the like).
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_ignored_words")]
    pub ignored_words: BTreeSet<String>,
}

fn default_ignored_words() -> BTreeSet<String> {
    [
        "Show", "Me", "Display", "Plot", "Draw", "Give", "Get", "Compare", "Find", "List",
        "What", "Which", "How", "The", "Data", "Population", "Populations", "For", "From",
        "To", "And", "Or", "Between", "In", "Of", "Chart", "Graph", "Map", "Bar", "Line",
        "Pie", "Trend", "Please", "Years", "Year",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            ignored_words: default_ignored_words(),
        }
    }
}
