//! Startup configuration.
//!
//! Settings come from `QT_`-prefixed environment variables or a YAML document.
//! Everything is validated once at startup; an invalid cache configuration is a
//! [`Error::Configuration`] and the process is expected not to start.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

pub const ENV_PREFIX: &str = "QT_";

pub const DEFAULT_TTL_SECONDS: i64 = 3600;
pub const DEFAULT_SINGLE_CAPACITY: i64 = 2048;
pub const DEFAULT_BATCH_CAPACITY: i64 = 256;

/// Which cache implementation sits in front of the backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Caching disabled; every facade call is a no-op.
    #[default]
    None,
    /// In-process dual-tier LRU+TTL cache.
    Memory,
}

impl CacheBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackendKind::None => "none",
            CacheBackendKind::Memory => "memory",
        }
    }
}

impl FromStr for CacheBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(CacheBackendKind::None),
            "memory" => Ok(CacheBackendKind::Memory),
            other => Err(Error::configuration_with_context(
                "unknown cache backend",
                ErrorContext::new()
                    .with_field_path("cache.backend")
                    .with_details(format!("{:?} (expected none|memory)", other))
                    .with_source("cache_config"),
            )),
        }
    }
}

/// Cache settings. Numeric fields are signed so that negative input can be
/// reported as a configuration error instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub ttl_seconds: i64,
    pub single_capacity: i64,
    pub batch_capacity: i64,
    /// Optional key namespace, see [`KeyBuilder::with_salt`](crate::cache::KeyBuilder::with_salt).
    pub key_salt: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::None,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            single_capacity: DEFAULT_SINGLE_CAPACITY,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            key_salt: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory cache with default TTL and capacities.
    pub fn memory() -> Self {
        Self::default().with_backend(CacheBackendKind::Memory)
    }

    pub fn with_backend(mut self, backend: CacheBackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_capacities(mut self, single: i64, batch: i64) -> Self {
        self.single_capacity = single;
        self.batch_capacity = batch;
        self
    }

    pub fn with_key_salt(mut self, salt: impl Into<String>) -> Self {
        self.key_salt = Some(salt.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend == CacheBackendKind::Memory
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_seconds < 0 {
            return Err(invalid("cache.ttl_seconds", "TTL must not be negative", self.ttl_seconds));
        }
        for (field, value) in [
            ("cache.single_capacity", self.single_capacity),
            ("cache.batch_capacity", self.batch_capacity),
        ] {
            if value < 0 {
                return Err(invalid(field, "capacity must not be negative", value));
            }
            if value == 0 && self.is_enabled() {
                return Err(invalid(
                    field,
                    "capacity must be positive when the memory backend is enabled",
                    value,
                ));
            }
        }
        if self.ttl_seconds == 0 && self.is_enabled() {
            tracing::warn!("cache TTL is 0; every lookup will miss");
        }
        Ok(())
    }

    /// TTL as a duration. Call after [`Self::validate`]; negative values clamp to zero.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.ttl_seconds).unwrap_or(0))
    }

    pub fn single_capacity(&self) -> usize {
        usize::try_from(self.single_capacity).unwrap_or(0)
    }

    pub fn batch_capacity(&self) -> usize {
        usize::try_from(self.batch_capacity).unwrap_or(0)
    }
}

/// Request-handling limits and defaults used by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Model used when a request does not name one.
    pub model_default: String,
    pub batch_size_limit: usize,
    /// Maximum length of a single text, in characters.
    pub text_length_limit: usize,
    /// Retry failed single-text analyses on the fallback model instead of failing.
    pub graceful_degradation: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_default: "vader".to_string(),
            batch_size_limit: 32,
            text_length_limit: 2500,
            graceful_degradation: true,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model_default.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "default model must not be empty",
                ErrorContext::new()
                    .with_field_path("service.model_default")
                    .with_source("service_config"),
            ));
        }
        if self.batch_size_limit == 0 {
            return Err(invalid("service.batch_size_limit", "limit must be positive", 0));
        }
        if self.text_length_limit == 0 {
            return Err(invalid("service.text_length_limit", "limit must be positive", 0));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `sentiment_cache=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deployment environment; `prod` switches logging to JSON.
    pub env: String,
    pub cache: CacheConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            cache: CacheConfig::default(),
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.service.validate()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut settings: Settings = serde_yaml::from_str(yaml)?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Canonicalises free-form values and applies the `prod` logging switch.
    fn normalize(&mut self) {
        self.env = self.env.trim().to_lowercase();
        self.service.model_default = self.service.model_default.trim().to_lowercase();
        self.logging.level = self.logging.level.trim().to_lowercase();
        if self.env == "prod" {
            self.logging.format = LogFormat::Json;
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Reads `QT_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`] but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let mut settings = Settings::default();

        if let Some(env) = var("ENV") {
            settings.env = env;
        }
        if let Some(backend) = var("CACHE_BACKEND") {
            settings.cache.backend = backend.parse()?;
        }
        if let Some(v) = var("CACHE_TTL_SECONDS") {
            settings.cache.ttl_seconds = parse_var("CACHE_TTL_SECONDS", &v)?;
        }
        if let Some(v) = var("CACHE_SINGLE_CAPACITY") {
            settings.cache.single_capacity = parse_var("CACHE_SINGLE_CAPACITY", &v)?;
        }
        if let Some(v) = var("CACHE_BATCH_CAPACITY") {
            settings.cache.batch_capacity = parse_var("CACHE_BATCH_CAPACITY", &v)?;
        }
        if let Some(salt) = var("CACHE_KEY_SALT") {
            settings.cache.key_salt = Some(salt);
        }
        if let Some(model) = var("MODEL_DEFAULT") {
            settings.service.model_default = model;
        }
        if let Some(v) = var("BATCH_SIZE_LIMIT") {
            settings.service.batch_size_limit = parse_var("BATCH_SIZE_LIMIT", &v)?;
        }
        if let Some(v) = var("TEXT_LENGTH_LIMIT") {
            settings.service.text_length_limit = parse_var("TEXT_LENGTH_LIMIT", &v)?;
        }
        if let Some(v) = var("GRACEFUL_DEGRADATION") {
            settings.service.graceful_degradation = parse_flag("GRACEFUL_DEGRADATION", &v)?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            settings.logging.level = level;
        }

        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_var<T: FromStr>(suffix: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        Error::configuration_with_context(
            "could not parse environment variable",
            ErrorContext::new()
                .with_field_path(format!("{}{}", ENV_PREFIX, suffix))
                .with_details(format!("{:?}", raw))
                .with_source("env"),
        )
    })
}

fn parse_flag(suffix: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => parse_var(suffix, raw),
    }
}

fn invalid(field: &str, message: &str, value: impl std::fmt::Display) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_field_path(field)
            .with_details(value.to_string())
            .with_source("settings"),
    )
}
