//! Configuration for snapwatch.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SNAPWATCH_HOME, SNAPWATCH_SNAPSHOT, SNAPWATCH_BIND)
//! 2. Config file (.snapwatch/config.yaml)
//! 3. Defaults (~/.snapwatch)
//!
//! Config file discovery:
//! - Searches current directory and parents for .snapwatch/config.yaml
//! - `paths.home` is relative to the .snapwatch/ directory, every other
//!   path is relative to the config file's project root

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use tracing::warn;

use crate::core::resolver::default_local_offset;
use crate::core::{file_storage, ReporterSettings, Storage, Thresholds};
use crate::domain::{Canon, Identity};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<Arc<ResolvedConfig>, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".snapwatch";
const CONFIG_FILE: &str = "config.yaml";

pub const ENV_HOME: &str = "SNAPWATCH_HOME";
pub const ENV_SNAPSHOT: &str = "SNAPWATCH_SNAPSHOT";
pub const ENV_BIND: &str = "SNAPWATCH_BIND";

const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub thresholds: Option<ThresholdsConfig>,
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .snapwatch/)
    pub home: Option<String>,
    /// Snapshot JSON written by the capture job
    pub snapshot: Option<String>,
    /// Append-only audit log
    pub audit_file: Option<String>,
    /// Persisted status state
    pub state_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    pub expected_interval_seconds: Option<i64>,
    pub staleness_limit_seconds: Option<i64>,
    pub state_change_cooldown_seconds: Option<i64>,
    /// Offset of `generated_at_local`, e.g. "+07:00"
    pub local_utc_offset: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub tag: Option<String>,
    pub scope: Option<String>,
    pub time: Option<String>,
    pub rules: Option<Vec<String>>,
    pub version: Option<String>,
    pub pack_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Snapshot file
    pub snapshot: PathBuf,
    /// Audit log file
    pub audit_file: PathBuf,
    /// Persisted state file
    pub state_file: PathBuf,
    /// Server listen address
    pub bind: String,
    pub thresholds: Thresholds,
    pub local_offset: FixedOffset,
    pub identity: Identity,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Settings handed to the reporter
    pub fn reporter_settings(&self) -> ReporterSettings {
        ReporterSettings {
            thresholds: self.thresholds,
            local_offset: self.local_offset,
            identity: self.identity.clone(),
        }
    }

    /// File-backed storage at the configured paths
    pub fn storage(&self) -> Storage {
        file_storage(&self.snapshot, &self.audit_file, &self.state_file)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
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

/// Thresholds must be positive; anything else falls back to the default
fn positive_or_default(name: &str, value: Option<i64>, default: i64) -> i64 {
    match value {
        Some(v) if v > 0 => v,
        Some(v) => {
            warn!(threshold = name, value = v, default, "Ignoring non-positive threshold");
            default
        }
        None => default,
    }
}

fn parse_offset(value: &str) -> Result<FixedOffset> {
    value
        .parse::<FixedOffset>()
        .map_err(|e| anyhow::anyhow!("Invalid local_utc_offset '{}': {}", value, e))
}

/// Build configuration from an optional config file, an environment lookup
/// and the default home directory
fn build_config<F>(
    config_file: Option<PathBuf>,
    env: F,
    default_home: PathBuf,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // .snapwatch/ and the project root around it
    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let base_dir = config_dir.parent().unwrap_or(Path::new("."));

    let paths = parsed.as_ref().map(|c| c.paths.clone()).unwrap_or_default();

    let home = if let Some(env_home) = env(ENV_HOME) {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = paths.home {
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let snapshot = if let Some(env_snapshot) = env(ENV_SNAPSHOT) {
        PathBuf::from(env_snapshot)
    } else if let Some(ref snapshot_path) = paths.snapshot {
        resolve_path(base_dir, snapshot_path)
    } else {
        home.join("latest.json")
    };

    let audit_file = paths
        .audit_file
        .as_deref()
        .map(|p| resolve_path(base_dir, p))
        .unwrap_or_else(|| home.join("audit").join("snapwatch_audit.jsonl"));

    let state_file = paths
        .state_file
        .as_deref()
        .map(|p| resolve_path(base_dir, p))
        .unwrap_or_else(|| home.join("state").join("status_state.json"));

    let bind = env(ENV_BIND)
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|c| c.server.as_ref())
                .and_then(|s| s.bind.clone())
        })
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    // Thresholds
    let defaults = Thresholds::default();
    let file_thresholds = parsed.as_ref().and_then(|c| c.thresholds.as_ref());
    let thresholds = Thresholds {
        expected_interval_seconds: positive_or_default(
            "expected_interval_seconds",
            file_thresholds.and_then(|t| t.expected_interval_seconds),
            defaults.expected_interval_seconds,
        ),
        staleness_limit_seconds: positive_or_default(
            "staleness_limit_seconds",
            file_thresholds.and_then(|t| t.staleness_limit_seconds),
            defaults.staleness_limit_seconds,
        ),
        state_change_cooldown_seconds: positive_or_default(
            "state_change_cooldown_seconds",
            file_thresholds.and_then(|t| t.state_change_cooldown_seconds),
            defaults.state_change_cooldown_seconds,
        ),
    };

    let local_offset = match file_thresholds.and_then(|t| t.local_utc_offset.as_deref()) {
        Some(value) => parse_offset(value)?,
        None => default_local_offset(),
    };

    // Identity
    let default_identity = Identity::default();
    let identity = match parsed.as_ref().and_then(|c| c.identity.clone()) {
        Some(id) => Identity {
            canon: Canon {
                tag: id.tag.unwrap_or(default_identity.canon.tag),
                scope: id.scope.unwrap_or(default_identity.canon.scope),
                time: id.time.unwrap_or(default_identity.canon.time),
                rules: id.rules.unwrap_or(default_identity.canon.rules),
            },
            version: id.version.unwrap_or(default_identity.version),
            pack_id: id.pack_id.unwrap_or(default_identity.pack_id),
        },
        None => default_identity,
    };

    Ok(ResolvedConfig {
        home,
        snapshot,
        audit_file,
        state_file,
        bind,
        thresholds,
        local_offset,
        identity,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    build_config(find_config_file(), |key| std::env::var(key).ok(), default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<Arc<ResolvedConfig>> {
    let result = CONFIG.get_or_init(|| load_config().map(Arc::new).map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config.clone()),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration, bypassing the cache
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
