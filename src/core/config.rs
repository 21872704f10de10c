//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.tripdeck/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use clap::ValueEnum;

use crate::transit::{StopRef, StopType};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TripdeckConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub stop: StopConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub timetable: TimetableConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub provider: Option<SourceKind>,
    pub time_zone: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StopConfig {
    pub id: Option<String>,
    pub stop_type: Option<StopType>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HttpConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TimetableConfig {
    pub path: Option<String>,
}

/// Which collaborator serves stops and trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    Timetable,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(SourceKind::Http),
            "timetable" => Ok(SourceKind::Timetable),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_TIME_ZONE: &str = "Europe/Rome";
pub const DEFAULT_LOG_LEVEL: &str = "debug";
pub const DEFAULT_TIMETABLE_FILE: &str = "timetable.json";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider: SourceKind,
    pub stop: StopRef,
    pub time_zone: Tz,
    pub log_level: log::LevelFilter,
    pub http_base_url: Option<String>,
    pub timetable_path: PathBuf,
}

/// Values from CLI flags (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub provider: Option<SourceKind>,
    pub stop_id: Option<String>,
    pub stop_type: Option<StopType>,
    pub time_zone: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidTimeZone(String),
    InvalidProvider(String),
    MissingStop,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::InvalidTimeZone(name) => write!(f, "unknown time zone: {name}"),
            ConfigError::InvalidProvider(msg) => write!(f, "{msg}"),
            ConfigError::MissingStop => write!(
                f,
                "no stop configured (set [stop] id in the config file or pass --stop)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.tripdeck/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tripdeck"))
}

/// Returns the path to `~/.tripdeck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.tripdeck/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `TripdeckConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<TripdeckConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(TripdeckConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<TripdeckConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(TripdeckConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: TripdeckConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# tripdeck configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# provider = "http"                  # "http" or "timetable"
# time_zone = "Europe/Rome"          # IANA name; all reference times use it
# log_level = "debug"                # written to tripdeck.log

# [stop]
# id = "100"
# stop_type = "bus"                  # "bus", "tram", "metro" or "rail"

# [http]
# base_url = "http://localhost:8080/api/v1"   # Or set TRIPDECK_BASE_URL

# [timetable]
# path = "timetable.json"            # Relative to ~/.tripdeck/
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Reads an env var through `lookup` (injectable for tests).
type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &TripdeckConfig, cli: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
    resolve_with_env(config, cli, &process_env)
}

fn resolve_with_env(
    config: &TripdeckConfig,
    cli: &CliOverrides,
    env: EnvLookup<'_>,
) -> Result<ResolvedConfig, ConfigError> {
    // Provider: CLI → env → config → default
    let provider = match cli.provider {
        Some(p) => p,
        None => match env("TRIPDECK_PROVIDER") {
            Some(raw) => raw.parse().map_err(ConfigError::InvalidProvider)?,
            None => config.general.provider.unwrap_or_default(),
        },
    };

    // Time zone: CLI → env → config → default
    let zone_name = cli
        .time_zone
        .clone()
        .or_else(|| env("TRIPDECK_TIME_ZONE"))
        .or_else(|| config.general.time_zone.clone())
        .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string());
    let time_zone: Tz = zone_name
        .parse()
        .map_err(|_| ConfigError::InvalidTimeZone(zone_name.clone()))?;

    // Stop: CLI → config; there is no sensible default stop
    let stop_id = cli
        .stop_id
        .clone()
        .or_else(|| config.stop.id.clone())
        .ok_or(ConfigError::MissingStop)?;
    let stop_type = cli
        .stop_type
        .or(config.stop.stop_type)
        .unwrap_or_default();

    // Base URL: env → config (provider falls back to its own default)
    let http_base_url = env("TRIPDECK_BASE_URL").or_else(|| config.http.base_url.clone());

    // Timetable path: env → config → default, relative paths under ~/.tripdeck/
    let timetable_path = env("TRIPDECK_TIMETABLE")
        .or_else(|| config.timetable.path.clone())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TIMETABLE_FILE));
    let timetable_path = if timetable_path.is_relative() {
        config_dir()
            .map(|d| d.join(&timetable_path))
            .unwrap_or(timetable_path)
    } else {
        timetable_path
    };

    let log_level = config
        .general
        .log_level
        .as_deref()
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .parse()
        .unwrap_or(log::LevelFilter::Debug);

    Ok(ResolvedConfig {
        provider,
        stop: StopRef::new(stop_id, stop_type),
        time_zone,
        log_level,
        http_base_url,
        timetable_path,
    })
}
