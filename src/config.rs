//! Configuration for fieldstudy.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FIELDSTUDY_HOME, FIELDSTUDY_*_KEY)
//! 2. Config file (.fieldstudy/config.yaml)
//! 3. Defaults (~/.fieldstudy)
//!
//! Config file discovery:
//! - Searches current directory and parents for .fieldstudy/config.yaml
//! - The home path in the config file is relative to the .fieldstudy directory
//!
//! API keys are read from the environment (`FIELDSTUDY_ASSEMBLYAI_KEY`,
//! `FIELDSTUDY_GROQ_KEY`, `FIELDSTUDY_TAVILY_KEY`), with the config file as
//! a fallback for setups that accept keys on disk.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub providers: Option<ProvidersConfig>,
    #[serde(default)]
    pub ingest: Option<IngestConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to the .fieldstudy directory)
    pub home: Option<String>,
}

/// Hosted backend (identity + database + object storage) identifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub projects_collection_id: String,
    pub interviews_collection_id: String,
    pub bucket_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub assemblyai: Option<ProviderConfig>,
    #[serde(default)]
    pub groq: Option<GroqConfig>,
    #[serde(default)]
    pub tavily: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroqConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    /// Seconds between transcription status polls
    pub poll_interval_seconds: Option<u64>,
    /// Ceiling on the whole poll loop, in seconds
    pub poll_timeout_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths and applied defaults
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to fieldstudy home (caches, notes, session)
    pub home: PathBuf,
    /// Hosted backend identifiers (absent for local-only use)
    pub backend: Option<BackendConfig>,
    /// Provider endpoints/keys from the config file
    pub providers: ProvidersConfig,
    /// Ingestion poll settings
    pub ingest: IngestSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            poll_timeout: Duration::from_secs(600),
        }
    }
}

impl ResolvedConfig {
    /// Backend identifiers, or a setup hint when the config file lacks them.
    pub fn backend(&self) -> Result<&BackendConfig> {
        self.backend.as_ref().context(
            "No backend configured. Add a `backend:` section (endpoint, project_id, \
             database_id, collection ids, bucket_id) to .fieldstudy/config.yaml",
        )
    }

    /// Directory holding per-project analysis caches
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Directory holding per-project notes
    pub fn notes_dir(&self) -> PathBuf {
        self.home.join("notes")
    }

    /// Path to the persisted session token
    pub fn session_path(&self) -> PathBuf {
        self.home.join("session.json")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".fieldstudy").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".fieldstudy");

    let config_file = find_config_file();

    let (home, backend, providers, ingest) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        let home = if let Ok(env_home) = std::env::var("FIELDSTUDY_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            // home is relative to the .fieldstudy/ directory
            let fieldstudy_dir = config_path.parent().unwrap_or(Path::new("."));
            resolve_path(fieldstudy_dir, home_path)
        } else {
            default_home.clone()
        };

        let ingest = IngestSettings {
            poll_interval: Duration::from_secs(
                config
                    .ingest
                    .as_ref()
                    .and_then(|i| i.poll_interval_seconds)
                    .unwrap_or(3),
            ),
            poll_timeout: Duration::from_secs(
                config
                    .ingest
                    .as_ref()
                    .and_then(|i| i.poll_timeout_seconds)
                    .unwrap_or(600),
            ),
        };

        (
            home,
            config.backend,
            config.providers.unwrap_or_default(),
            ingest,
        )
    } else {
        let home = std::env::var("FIELDSTUDY_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_home.clone());

        (
            home,
            None,
            ProvidersConfig::default(),
            IngestSettings::default(),
        )
    };

    Ok(ResolvedConfig {
        home,
        backend,
        providers,
        ingest,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Resolve an API key: environment first, config file fallback.
fn resolve_key(env_var: &str, from_config: Option<&str>, provider: &str) -> Result<String> {
    if let Ok(key) = std::env::var(env_var) {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }

    from_config.map(str::to_string).with_context(|| {
        format!(
            "No {} API key. Set {} or providers.{}.api_key",
            provider, env_var, provider
        )
    })
}

/// Transcription provider API key
pub fn assemblyai_key() -> Result<String> {
    let cfg = config()?;
    resolve_key(
        "FIELDSTUDY_ASSEMBLYAI_KEY",
        cfg.providers
            .assemblyai
            .as_ref()
            .and_then(|p| p.api_key.as_deref()),
        "assemblyai",
    )
}

/// LLM provider API key
pub fn groq_key() -> Result<String> {
    let cfg = config()?;
    resolve_key(
        "FIELDSTUDY_GROQ_KEY",
        cfg.providers
            .groq
            .as_ref()
            .and_then(|p| p.api_key.as_deref()),
        "groq",
    )
}

/// Search provider API key
pub fn tavily_key() -> Result<String> {
    let cfg = config()?;
    resolve_key(
        "FIELDSTUDY_TAVILY_KEY",
        cfg.providers
            .tavily
            .as_ref()
            .and_then(|p| p.api_key.as_deref()),
        "tavily",
    )
}
