//! Knowledge Notes client
//!
//! Client-side data access for a knowledge notes API:
//! - `gateway`: typed wrappers, one per HTTP endpoint, behind the `NotesApi` trait
//! - `notes`: note models and the `NotesStore` that caches notes, selection and
//!   filters and reconciles every API response into its state

pub mod gateway;
pub mod notes;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Default location of the YAML config file
pub const DEFAULT_CONFIG_PATH: &str = "notes.yaml";

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub api: ApiYamlConfig,
}

/// Notes API section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiYamlConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ApiYamlConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api".into(),
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL every API path is appended to
    pub api_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let api = ApiYamlConfig::default();
        Self {
            api_url: api.url,
            timeout_secs: api.timeout_secs,
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries `notes.yaml` in CWD. A missing or
    /// unparsable file falls back to defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            api_url: std::env::var("NOTES_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(yaml.api.url),
            timeout_secs: std::env::var("NOTES_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.api.timeout_secs),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
