// Known player-name aliases: canonical display name -> alternate spellings.
//
// The table ships with built-in defaults and may be extended by a JSON file
// persisted between runs. A missing or unreadable file degrades to defaults
// only; it never fails a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("failed to write alias file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to serialize alias table: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Alias lookup table. BTreeMap keeps iteration and persistence ordering
/// stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    /// An empty table with no known aliases.
    pub fn empty() -> Self {
        AliasTable {
            entries: BTreeMap::new(),
        }
    }

    /// Built-in default aliases: common initial/nickname variants, suffix
    /// variants, and team-defense naming schemes.
    pub fn with_defaults() -> Self {
        let mut entries = BTreeMap::new();
        let defaults: &[(&str, &[&str])] = &[
            // Name variations
            ("CeeDee Lamb", &["C.D. Lamb", "Cedarian Lamb", "CD Lamb"]),
            ("D.K. Metcalf", &["DK Metcalf", "D.K Metcalf", "DeKaylin Metcalf"]),
            ("A.J. Brown", &["AJ Brown", "Arthur Brown"]),
            ("T.J. Hockenson", &["TJ Hockenson", "T.J Hockenson"]),
            ("D.J. Moore", &["DJ Moore", "Denniston Moore"]),
            ("K.J. Osborn", &["KJ Osborn", "Kendrick Osborn"]),
            // Suffix variations
            ("Patrick Mahomes", &["Patrick Mahomes II"]),
            ("Odell Beckham Jr.", &["Odell Beckham", "OBJ"]),
            ("Marvin Jones Jr.", &["Marvin Jones"]),
            ("Michael Pittman Jr.", &["Michael Pittman"]),
            ("Gardner Minshew", &["Gardner Minshew II"]),
            // Team defenses
            (
                "49ers D/ST",
                &["San Francisco D/ST", "SF D/ST", "49ers DST", "San Francisco Defense"],
            ),
            (
                "Bears D/ST",
                &["Chicago D/ST", "CHI D/ST", "Bears DST", "Chicago Defense"],
            ),
            (
                "Bills D/ST",
                &["Buffalo D/ST", "BUF D/ST", "Bills DST", "Buffalo Defense"],
            ),
            // Common nicknames
            ("Kenneth Walker III", &["Kenneth Walker", "K. Walker III"]),
            ("Brian Robinson Jr.", &["Brian Robinson", "B. Robinson Jr."]),
        ];
        for (canonical, aliases) in defaults {
            entries.insert(
                (*canonical).to_string(),
                aliases.iter().map(|a| (*a).to_string()).collect(),
            );
        }
        AliasTable { entries }
    }

    /// Load the default table merged with a persisted JSON overlay.
    /// Unreadable or malformed files are logged and ignored.
    pub fn load(path: &Path) -> Self {
        let mut table = Self::with_defaults();
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, Vec<String>>>(&text) {
                Ok(loaded) => {
                    for (canonical, aliases) in loaded {
                        for alias in aliases {
                            table.add_alias(&canonical, &alias);
                        }
                    }
                }
                Err(e) => {
                    warn!("could not parse alias file {}: {e}", path.display());
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("could not read alias file {}: {e}", path.display());
            }
        }
        table
    }

    /// Look up the canonical name for a spelling: either the key itself or
    /// any recorded variant.
    pub fn canonical_for(&self, name: &str) -> Option<&str> {
        for (canonical, aliases) in &self.entries {
            if canonical == name || aliases.iter().any(|a| a == name) {
                return Some(canonical);
            }
        }
        None
    }

    /// Record a new alias for a canonical name. Duplicates are ignored.
    pub fn add_alias(&mut self, canonical: &str, alias: &str) {
        let aliases = self.entries.entry(canonical.to_string()).or_default();
        if alias != canonical && !aliases.iter().any(|a| a == alias) {
            aliases.push(alias.to_string());
        }
    }

    /// Write the full table (defaults plus runtime additions) back to disk.
    /// Callers invoke this deliberately; failures are theirs to log.
    pub fn persist(&self, path: &Path) -> Result<(), AliasError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json).map_err(|e| AliasError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
