use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use serde::Deserialize;

use crate::error::GeneError;

pub const CONFIG_FILE_NAME: &str = "ncbi-gene-batch.json";
pub const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_GENE_PAGE_BASE_URL: &str = "https://www.ncbi.nlm.nih.gov/gene";
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub eutils_base_url: Option<String>,
    #[serde(default)]
    pub gene_page_base_url: Option<String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
    #[serde(default)]
    pub summary_marker: Option<SummaryMarkerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryMarkerEntry {
    pub marker: String,
    #[serde(default = "default_open")]
    pub open: String,
    #[serde(default = "default_close")]
    pub close: String,
}

impl Default for SummaryMarkerEntry {
    fn default() -> Self {
        Self {
            marker: "<dt>Summary</dt>".to_string(),
            open: default_open(),
            close: default_close(),
        }
    }
}

fn default_open() -> String {
    "<dd>".to_string()
}

fn default_close() -> String {
    "</dd>".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub eutils_base_url: String,
    pub gene_page_base_url: String,
    pub delay: Duration,
    /// `None` disables the per-request timeout.
    pub timeout: Option<Duration>,
    pub max_retries: usize,
    pub api_key: Option<String>,
    pub tool: Option<String>,
    pub email: Option<String>,
    pub dictionary_path: Option<PathBuf>,
    pub summary_marker: SummaryMarkerEntry,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub dictionary_path: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; otherwise the project-local file, then the
    /// per-user config file, then built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GeneError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| GeneError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| GeneError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        let mut resolved = Self::resolve_config(config);
        if let Ok(api_key) = std::env::var("NCBI_API_KEY") {
            if !api_key.trim().is_empty() {
                resolved.api_key = Some(api_key.trim().to_string());
            }
        }
        Ok(resolved)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("ncbi-gene-batch").join("config.json"))
            .filter(|path| path.is_file())
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        ResolvedConfig {
            eutils_base_url: trim_base(
                config
                    .eutils_base_url
                    .unwrap_or_else(|| DEFAULT_EUTILS_BASE_URL.to_string()),
            ),
            gene_page_base_url: trim_base(
                config
                    .gene_page_base_url
                    .unwrap_or_else(|| DEFAULT_GENE_PAGE_BASE_URL.to_string()),
            ),
            delay: Duration::from_millis(config.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
            timeout: timeout_from_secs(timeout_secs),
            max_retries: config.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            api_key: non_blank(config.api_key),
            tool: non_blank(config.tool),
            email: non_blank(config.email),
            dictionary_path: config.dictionary_path,
            summary_marker: config.summary_marker.unwrap_or_default(),
        }
    }
}

impl ResolvedConfig {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(delay_ms) = overrides.delay_ms {
            self.delay = Duration::from_millis(delay_ms);
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout = timeout_from_secs(timeout_secs);
        }
        if overrides.dictionary_path.is_some() {
            self.dictionary_path = overrides.dictionary_path;
        }
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
