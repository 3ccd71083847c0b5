// Configuration loading and parsing (config/draftboard.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Position;
use crate::projections::ScoringSystem;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    /// Source name -> weight and CSV path. BTreeMap so iteration order is
    /// stable run to run.
    pub sources: BTreeMap<String, SourceConfig>,
    pub cache: CacheSection,
    pub output: OutputSection,
    pub aliases_path: String,
}

impl Config {
    /// Parsed scoring system. Always succeeds after `validate()`.
    pub fn scoring_system(&self) -> ScoringSystem {
        self.league.scoring.parse().unwrap_or_default()
    }

    /// Source name -> consensus weight.
    pub fn source_weights(&self) -> HashMap<String, f64> {
        self.sources
            .iter()
            .map(|(name, source)| (name.clone(), source.weight))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// draftboard.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draftboard.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftboardFile {
    league: LeagueConfig,
    sources: BTreeMap<String, SourceConfig>,
    cache: CacheSection,
    output: OutputSection,
    aliases: AliasSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub num_teams: u32,
    /// Scoring system name: STANDARD, HALF_PPR, or PPR.
    pub scoring: String,
    /// Starting slots per position name, plus BENCH.
    pub roster: HashMap<String, u32>,
    /// Tier sizes per position name, best tier first.
    #[serde(default)]
    pub tier_sizes: HashMap<String, Vec<usize>>,
}

impl LeagueConfig {
    /// Roster slots keyed by parsed position. BENCH has no Position and is
    /// dropped here; validation guarantees the remaining keys parse.
    pub fn roster_slots(&self) -> HashMap<Position, u32> {
        self.roster
            .iter()
            .filter_map(|(name, &count)| Position::from_str_pos(name).map(|p| (p, count)))
            .collect()
    }

    /// Tier size sequences keyed by parsed position.
    pub fn tier_sizes_by_position(&self) -> HashMap<Position, Vec<usize>> {
        self.tier_sizes
            .iter()
            .filter_map(|(name, sizes)| {
                Position::from_str_pos(name).map(|p| (p, sizes.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub weight: f64,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    pub dir: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    pub dir: String,
    pub max_players: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct AliasSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draftboard.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draftboard.toml");
    let text = read_file(&path)?;
    let file: DraftboardFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        league: file.league,
        sources: file.sources,
        cache: file.cache,
        output: file.output,
        aliases_path: file.aliases.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // League validations
    if !(4..=32).contains(&config.league.num_teams) {
        return Err(ConfigError::ValidationError {
            field: "league.num_teams".into(),
            message: format!("must be between 4 and 32, got {}", config.league.num_teams),
        });
    }

    if config.league.scoring.parse::<ScoringSystem>().is_err() {
        return Err(ConfigError::ValidationError {
            field: "league.scoring".into(),
            message: format!(
                "must be STANDARD, HALF_PPR, or PPR, got '{}'",
                config.league.scoring
            ),
        });
    }

    for (name, &count) in &config.league.roster {
        if name != "BENCH" && Position::from_str_pos(name).is_none() {
            return Err(ConfigError::ValidationError {
                field: format!("league.roster.{name}"),
                message: "unknown position".into(),
            });
        }
        if count > 10 {
            return Err(ConfigError::ValidationError {
                field: format!("league.roster.{name}"),
                message: format!("must be at most 10, got {count}"),
            });
        }
    }

    for (name, sizes) in &config.league.tier_sizes {
        if Position::from_str_pos(name).is_none() {
            return Err(ConfigError::ValidationError {
                field: format!("league.tier_sizes.{name}"),
                message: "unknown position".into(),
            });
        }
        if sizes.iter().any(|&s| s == 0) {
            return Err(ConfigError::ValidationError {
                field: format!("league.tier_sizes.{name}"),
                message: "tier sizes must all be > 0".into(),
            });
        }
    }

    // Source validations
    if config.sources.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "sources".into(),
            message: "at least one ranking source is required".into(),
        });
    }
    for (name, source) in &config.sources {
        if source.weight <= 0.0 || !source.weight.is_finite() {
            return Err(ConfigError::ValidationError {
                field: format!("sources.{name}.weight"),
                message: format!("must be > 0, got {}", source.weight),
            });
        }
        if source.path.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("sources.{name}.path"),
                message: "must not be empty".into(),
            });
        }
    }

    // Cache and output validations
    if config.cache.ttl_hours <= 0 {
        return Err(ConfigError::ValidationError {
            field: "cache.ttl_hours".into(),
            message: format!("must be > 0, got {}", config.cache.ttl_hours),
        });
    }
    if config.output.max_players == 0 {
        return Err(ConfigError::ValidationError {
            field: "output.max_players".into(),
            message: "must be > 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
