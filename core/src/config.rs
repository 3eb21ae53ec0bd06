use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

use chrono::NaiveDate;

pub const DEFAULT_MESSAGE_WAIT_MS: u64 = 600;
pub const DEFAULT_AUTOCOMPLETE_WAIT_MS: u64 = 300;
pub const DEFAULT_MIN_CHARS: usize = 3;
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_SORTED_BY: &str = "createdAt";
pub const BASE_URL_ENV: &str = "RXTRIAGE_BASE_URL";

#[derive(Debug, Default, Deserialize)]
pub struct TriageConfig {
    pub api: Option<ApiConfig>,
    pub search: Option<SearchConfig>,
    pub queue: Option<QueueConfig>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config at {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Backend connection settings.
///
/// ```toml
/// [api]
/// base_url = "https://clinic.example/api"
/// token = "${RXTRIAGE_TOKEN}"
/// timeout_secs = 30
/// max_retries = 2
/// ```
#[derive(Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

// Manual Debug impl to prevent leaking the bearer token in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "token",
                &if self.token.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Debounce and gating for typeahead search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchConfig {
    /// Debounce window for free-text message search. Default: 600.
    pub message_wait_ms: Option<u64>,
    /// Debounce window for lookup autocomplete. Default: 300.
    pub autocomplete_wait_ms: Option<u64>,
    /// Minimum query length (characters, trimmed) before a fetch. Default: 3.
    pub min_chars: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Defaults applied to both filter families at startup.
#[derive(Debug, Default, Deserialize)]
pub struct QueueConfig {
    pub page_limit: Option<u32>,
    pub sorted_by: Option<String>,
    /// Lower date bound used by the "all time" shortcut.
    pub earliest_from_date: Option<NaiveDate>,
    #[serde(default)]
    pub doctor_ids: Vec<u64>,
    pub practice_id: Option<u64>,
}

/// Fallback lower date bound when none is configured.
#[must_use]
pub fn default_earliest_from_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl TriageConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.expand_env();
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    fn expand_env(&mut self) {
        if let Some(api) = self.api.as_mut() {
            api.base_url = api.base_url.as_deref().map(expand_env_vars);
            api.token = api
                .token
                .as_deref()
                .map(expand_env_vars)
                .filter(|token| !token.is_empty());
        }
    }

    /// Backend base URL: `RXTRIAGE_BASE_URL` wins over `[api].base_url`.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api.as_ref().and_then(|api| api.base_url.clone()))
            .filter(|url| !url.trim().is_empty())
    }

    #[must_use]
    pub fn api_timeout_secs(&self) -> u64 {
        self.api
            .as_ref()
            .and_then(|api| api.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS)
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.api
            .as_ref()
            .and_then(|api| api.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn message_wait_ms(&self) -> u64 {
        self.search
            .as_ref()
            .and_then(|search| search.message_wait_ms)
            .unwrap_or(DEFAULT_MESSAGE_WAIT_MS)
    }

    #[must_use]
    pub fn autocomplete_wait_ms(&self) -> u64 {
        self.search
            .as_ref()
            .and_then(|search| search.autocomplete_wait_ms)
            .unwrap_or(DEFAULT_AUTOCOMPLETE_WAIT_MS)
    }

    #[must_use]
    pub fn min_chars(&self) -> usize {
        self.search
            .as_ref()
            .and_then(|search| search.min_chars)
            .unwrap_or(DEFAULT_MIN_CHARS)
    }

    #[must_use]
    pub fn search_timeout_secs(&self) -> u64 {
        self.search
            .as_ref()
            .and_then(|search| search.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SEARCH_TIMEOUT_SECS)
    }

    #[must_use]
    pub fn page_limit(&self) -> u32 {
        self.queue
            .as_ref()
            .and_then(|queue| queue.page_limit)
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    #[must_use]
    pub fn sorted_by(&self) -> String {
        self.queue
            .as_ref()
            .and_then(|queue| queue.sorted_by.clone())
            .unwrap_or_else(|| DEFAULT_SORTED_BY.to_string())
    }

    #[must_use]
    pub fn earliest_from_date(&self) -> NaiveDate {
        self.queue
            .as_ref()
            .and_then(|queue| queue.earliest_from_date)
            .unwrap_or_else(default_earliest_from_date)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rxtriage").join("config.toml"))
}
