//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use contentforge_ai::OpenAiCompatibleConfig;

use crate::jobs::{BackoffStrategy, RetryPolicy};
use crate::workflow::PipelineConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Which generation backend agents talk to.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Deterministic local backend, no network.
    Template,
    OpenAi(OpenAiCompatibleConfig),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_json: bool,
    pub use_persistent_stores: bool,
    pub redis_url: String,
    /// TTL applied by the persistent job store.
    pub job_retention: Option<Duration>,
    pub retry: RetryPolicy,
    pub revision_progress_floor: u8,
    pub backend: BackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_json: true,
            use_persistent_stores: false,
            redis_url: "redis://localhost:6379".to_string(),
            job_retention: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            retry: RetryPolicy::default(),
            revision_progress_floor: 50,
            backend: BackendConfig::Template,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source. Unset or blank
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = parse_or(&var, "BIND_ADDR", defaults.bind_addr)?;
        let log_json = match var("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("json") => true,
            Some("text") => false,
            Some(other) => return Err(invalid("LOG_FORMAT", format!("expected json or text, got {other}"))),
        };
        let use_persistent_stores = parse_or(&var, "USE_PERSISTENT_STORES", false)?;
        let redis_url = var("REDIS_URL").unwrap_or(defaults.redis_url);
        let job_retention = match parse_or(&var, "JOB_RETENTION_SECS", 7 * 24 * 60 * 60_u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let retry = {
            let base = defaults.retry;
            let strategy = match var("STAGE_RETRY_STRATEGY") {
                Some(raw) => BackoffStrategy::from_str(&raw)
                    .map_err(|reason| invalid("STAGE_RETRY_STRATEGY", reason))?,
                None => base.strategy,
            };
            RetryPolicy {
                max_retries: parse_or(&var, "STAGE_MAX_RETRIES", base.max_retries)?,
                base_delay: Duration::from_millis(parse_or(
                    &var,
                    "STAGE_RETRY_BASE_MS",
                    base.base_delay.as_millis() as u64,
                )?),
                max_delay: Duration::from_millis(parse_or(
                    &var,
                    "STAGE_RETRY_MAX_MS",
                    base.max_delay.as_millis() as u64,
                )?),
                strategy,
                ..base
            }
        };

        let revision_progress_floor: u8 =
            parse_or(&var, "REVISION_PROGRESS_FLOOR", defaults.revision_progress_floor)?;
        if revision_progress_floor > 99 {
            return Err(invalid("REVISION_PROGRESS_FLOOR", "must be between 0 and 99".to_string()));
        }

        let backend = match var("GENERATION_BACKEND").as_deref().map(str::trim) {
            None | Some("template") => BackendConfig::Template,
            Some("openai") => {
                let openai = OpenAiCompatibleConfig::default();
                // local OpenAI-compatible servers usually run without a key
                BackendConfig::OpenAi(OpenAiCompatibleConfig {
                    base_url: var("OPENAI_BASE_URL").unwrap_or(openai.base_url),
                    api_key: var("OPENAI_API_KEY"),
                    model: var("OPENAI_MODEL").unwrap_or(openai.model),
                    timeout: Duration::from_secs(parse_or(
                        &var,
                        "GENERATION_TIMEOUT_SECS",
                        openai.timeout.as_secs(),
                    )?),
                })
            }
            Some(other) => {
                return Err(invalid(
                    "GENERATION_BACKEND",
                    format!("expected template or openai, got {other}"),
                ));
            }
        };

        Ok(Self {
            bind_addr,
            log_json,
            use_persistent_stores,
            redis_url,
            job_retention,
            retry,
            revision_progress_floor,
            backend,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            retry: self.retry.clone(),
            revision_progress_floor: self.revision_progress_floor,
        }
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { name, reason }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(name, e.to_string())),
        None => Ok(default),
    }
}
