//! Configuration for commit-gen.
//!
//! A [`Config`] is built once at startup and passed to the components that
//! need it. Values come from built-in defaults, then the optional YAML file
//! at `$HOME/.config/commit-gen/config.yaml`, then `COMMIT_GEN_*`
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::backend::ModelRef;
use crate::generator::prompts::CommitStyle;
use crate::git::DEFAULT_MAX_DIFF_SIZE;

/// Prefix shared by all environment overrides.
const ENV_PREFIX: &str = "COMMIT_GEN_";

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<value>\d+)\s*(?P<unit>ms|s|m|h|d)\s*$").unwrap());

/// How prompts reach OpenCode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// One `opencode run` subprocess per generation.
    #[default]
    Run,
    /// Sessions on a running `opencode serve` instance.
    Server,
}

impl FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(BackendMode::Run),
            "server" => Ok(BackendMode::Server),
            other => anyhow::bail!("Unknown backend mode '{other}'. Expected run or server"),
        }
    }
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendMode::Run => write!(f, "run"),
            BackendMode::Server => write!(f, "server"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// OpenCode backend settings.
    pub opencode: OpenCodeConfig,
    /// Message generation settings.
    pub generation: GenerationConfig,
    /// Session cache settings.
    pub cache: CacheConfig,
    /// Git settings.
    pub git: GitConfig,
}

/// OpenCode backend settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenCodeConfig {
    /// Backend mode.
    pub mode: BackendMode,
    /// Server host for server mode.
    pub host: String,
    /// Server port for server mode.
    pub port: u16,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for OpenCodeConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            host: "localhost".to_string(),
            port: 4096,
            timeout: 120,
        }
    }
}

/// Message generation settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Commit message style.
    pub style: CommitStyle,
    /// Model selection; empty fields leave the choice to OpenCode.
    pub model: ModelConfig,
}

/// Model selection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier.
    pub provider: String,
    /// Model identifier.
    pub model_id: String,
}

/// Session cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether server-mode sessions are reused.
    pub enabled: bool,
    /// Session lifetime, e.g. `24h`, `30m`, `90s`.
    pub ttl: String,
    /// Cache directory; defaults to `$HOME/.cache/commit-gen`.
    pub location: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: "24h".to_string(),
            location: None,
        }
    }
}

/// Git settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Diff byte budget before summarizing; zero or negative means default.
    pub max_diff_size: i64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            max_diff_size: DEFAULT_MAX_DIFF_SIZE as i64,
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file; a missing file yields defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Writes the configuration as YAML, creating parent directories.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Writes a default config file at `path` unless one already exists.
    ///
    /// Returns `false` when the file was already there.
    pub fn init_file<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(false);
        }

        Self::default().save_to_path(path)?;
        Ok(true)
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

        Ok(home_dir
            .join(".config")
            .join("commit-gen")
            .join("config.yaml"))
    }

    /// Applies `COMMIT_GEN_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(mode) = var("OPENCODE_MODE") {
            self.opencode.mode = mode.parse()?;
        }
        if let Some(host) = var("OPENCODE_HOST") {
            self.opencode.host = host;
        }
        if let Some(port) = var("OPENCODE_PORT") {
            self.opencode.port = parse_env("OPENCODE_PORT", &port)?;
        }
        if let Some(timeout) = var("OPENCODE_TIMEOUT") {
            self.opencode.timeout = parse_env("OPENCODE_TIMEOUT", &timeout)?;
        }
        if let Some(style) = var("GENERATION_STYLE") {
            self.generation.style = style.parse()?;
        }
        if let Some(provider) = var("MODEL_PROVIDER") {
            self.generation.model.provider = provider;
        }
        if let Some(model_id) = var("MODEL_ID") {
            self.generation.model.model_id = model_id;
        }
        if let Some(enabled) = var("CACHE_ENABLED") {
            self.cache.enabled = parse_env("CACHE_ENABLED", &enabled)?;
        }
        if let Some(ttl) = var("CACHE_TTL") {
            self.cache.ttl = ttl;
        }
        if let Some(location) = var("CACHE_LOCATION") {
            self.cache.location = Some(PathBuf::from(location));
        }
        if let Some(size) = var("MAX_DIFF_SIZE") {
            self.git.max_diff_size = parse_env("MAX_DIFF_SIZE", &size)?;
        }

        Ok(())
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.opencode.timeout)
    }

    /// Returns the diff budget in bytes; zero selects the governor default.
    pub fn max_diff_bytes(&self) -> usize {
        usize::try_from(self.git.max_diff_size).unwrap_or(0)
    }

    /// Returns the parsed session TTL.
    pub fn cache_ttl(&self) -> Result<Duration> {
        parse_duration(&self.cache.ttl)
            .with_context(|| format!("Invalid cache TTL: {}", self.cache.ttl))
    }

    /// Returns the session cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(location) = &self.cache.location {
            return Ok(location.clone());
        }

        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home_dir.join(".cache").join("commit-gen"))
    }

    /// Returns the configured model, if both provider and model are set.
    pub fn model(&self) -> Option<ModelRef> {
        let model = &self.generation.model;
        if model.provider.is_empty() || model.model_id.is_empty() {
            return None;
        }

        Some(ModelRef {
            provider_id: model.provider.clone(),
            model_id: model.model_id.clone(),
        })
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {ENV_PREFIX}{name}: {value}"))
}

/// Parses durations such as `500ms`, `90s`, `30m`, `24h` or `7d`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let captures = DURATION_PATTERN
        .captures(input)
        .ok_or_else(|| anyhow::anyhow!("Expected a number followed by ms, s, m, h or d"))?;

    let value: u64 = captures["value"]
        .parse()
        .context("Duration value out of range")?;
    let multiplier_ms: u64 = match &captures["unit"] {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        _ => 86_400_000,
    };

    let millis = value
        .checked_mul(multiplier_ms)
        .context("Duration value out of range")?;
    Ok(Duration::from_millis(millis))
}
