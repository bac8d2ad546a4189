//! YAML configuration with defaults for every field.
//!
//! A run works without any configuration file; the file only overrides the
//! values below. Command-line flags are applied on top in `main`.
//!
//! ```yaml
//! http:
//!   timeout_secs: 20
//! output:
//!   js_global: GOV_DATA
//! sources:
//!   enabled: [kstartup, bizinfo, gosims]
//!   smes24_missing_detail: list_page
//! ```

use crate::models::Source;
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub sources: SourcesConfig,
}

/// Identity and timeout used for every request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "ko-KR,ko;q=0.9,en;q=0.8".to_string(),
        }
    }
}

/// File names of the two feed encodings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_file: String,
    pub js_file: String,
    /// Global variable the browser encoding assigns to.
    pub js_global: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            json_file: "notices.json".to_string(),
            js_file: "notices.js".to_string(),
            js_global: "GOV_DATA".to_string(),
        }
    }
}

/// Where an SMES24 row links to when the popup table has no entry for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDetailLink {
    /// Build the bizinfo view URL from the row's notice id.
    #[default]
    Bizinfo,
    /// Link the SMES24 list page itself.
    ListPage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Sources to run; the aggregator keeps the fixed order of [`Source::ALL`].
    pub enabled: Vec<Source>,
    pub smes24_missing_detail: MissingDetailLink,
    /// Business year queried on the subsidy portal; defaults to the current year.
    pub gosims_year: Option<i32>,
    /// Application status filter on the subsidy portal (`1` = accepting).
    pub gosims_status: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            enabled: Source::ALL.to_vec(),
            smes24_missing_detail: MissingDetailLink::default(),
            gosims_year: None,
            gosims_status: "1".to_string(),
        }
    }
}

impl SourcesConfig {
    /// Enabled sources in run order, without duplicates.
    pub fn run_order(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.enabled.contains(s))
            .collect()
    }
}

impl Config {
    /// Parse a configuration document.
    pub fn from_yaml(text: &str) -> Result<Self, Box<dyn Error>> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load the configuration file at `path`, or defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No configuration file given; using defaults");
            return Ok(Config::default());
        };
        let text = tokio::fs::read_to_string(Path::new(path))
            .await
            .map_err(|e| format!("cannot read config {path}: {e}"))?;
        let config = Config::from_yaml(&text)?;
        info!(path, "Loaded configuration");
        Ok(config)
    }
}
