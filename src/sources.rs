// Ranking source ingestion.
//
// Reads per-source ranking CSVs named in config: one row per player with
// name, position, team, bye, rank, and optional tier/points/notes columns.
// Malformed rows are skipped with a warning; a failing source file is
// dropped from the run rather than aborting it.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::cache::FileCache;
use crate::config::SourceConfig;
use crate::models::{NflTeam, Player, Position, Ranking};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// One ranking CSV row. Lowercase headers are canonical; the capitalized
/// variants some export tools emit are accepted as aliases. Extra columns
/// are absorbed and ignored.
#[derive(Debug, Deserialize)]
struct RawRankingRow {
    #[serde(alias = "Name", alias = "Player")]
    name: String,
    #[serde(alias = "Position", alias = "Pos")]
    position: String,
    #[serde(default, alias = "Team")]
    team: String,
    #[serde(default, alias = "Bye")]
    bye: Option<u8>,
    #[serde(alias = "Rank")]
    rank: u32,
    #[serde(default, alias = "Tier")]
    tier: Option<u32>,
    #[serde(default, alias = "Points", alias = "points")]
    projected_points: Option<f64>,
    #[serde(default, alias = "Notes")]
    notes: Option<String>,
    /// Absorb any extra columns a source includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Reader-based loader (private, enables testing without temp files)
// ---------------------------------------------------------------------------

fn load_rankings_from_reader<R: Read>(
    rdr: R,
    source: &str,
) -> Result<Vec<Ranking>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rankings = Vec::new();
    for result in reader.deserialize::<RawRankingRow>() {
        match result {
            Ok(raw) => {
                let name = raw.name.trim().to_string();
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!(
                        "{source}: skipping '{name}': unknown position '{}'",
                        raw.position
                    );
                    continue;
                };
                let team_field = raw.team.trim();
                let team = if team_field.is_empty() {
                    NflTeam::FA
                } else {
                    match NflTeam::from_abbr(team_field) {
                        Some(team) => team,
                        None => {
                            warn!("{source}: skipping '{name}': unknown team '{team_field}'");
                            continue;
                        }
                    }
                };
                let mut player = Player::new(name, position, team);
                // Bye weeks outside the season range are treated as unknown.
                player.bye_week = raw.bye.filter(|b| (1..=18).contains(b));

                let mut ranking = Ranking::new(player, raw.rank, source);
                ranking.tier = raw.tier;
                ranking.projected_points = raw.projected_points.filter(|p| p.is_finite());
                ranking.notes = raw.notes.filter(|n| !n.trim().is_empty());
                rankings.push(ranking);
            }
            Err(e) => {
                warn!("{source}: skipping malformed row: {e}");
            }
        }
    }
    Ok(rankings)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load one source's rankings from a CSV file.
pub fn load_source_rankings(path: &Path, source: &str) -> Result<Vec<Ranking>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_rankings_from_reader(file, source).map_err(|e| SourceError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load every configured source. A source that fails to load or yields no
/// rows is dropped with a warning; the aggregator copes with whatever
/// remains, including nothing.
pub fn load_all_sources(
    sources: &BTreeMap<String, SourceConfig>,
) -> HashMap<String, Vec<Ranking>> {
    let mut loaded = HashMap::new();
    for (name, source_config) in sources {
        match load_source_rankings(Path::new(&source_config.path), name) {
            Ok(rankings) if rankings.is_empty() => {
                warn!("{name}: no usable rankings in {}", source_config.path);
            }
            Ok(rankings) => {
                info!("{name}: loaded {} rankings", rankings.len());
                loaded.insert(name.clone(), rankings);
            }
            Err(e) => {
                warn!("{name}: {e}, dropping source");
            }
        }
    }
    loaded
}

/// Like `load_all_sources`, but each successful load is mirrored into the
/// cache, and a source whose CSV has gone missing or unreadable falls back to
/// its last cached copy if one is still fresh.
pub fn load_all_sources_cached(
    sources: &BTreeMap<String, SourceConfig>,
    cache: &FileCache,
) -> HashMap<String, Vec<Ranking>> {
    let mut loaded = HashMap::new();
    for (name, source_config) in sources {
        match load_source_rankings(Path::new(&source_config.path), name) {
            Ok(rankings) if !rankings.is_empty() => {
                match serde_json::to_vec(&rankings) {
                    Ok(bytes) => {
                        let _ = cache.set(name, &bytes, None);
                    }
                    Err(e) => warn!("{name}: could not serialize rankings for cache: {e}"),
                }
                info!("{name}: loaded {} rankings", rankings.len());
                loaded.insert(name.clone(), rankings);
            }
            outcome => {
                if let Err(e) = &outcome {
                    warn!("{name}: {e}");
                } else {
                    warn!("{name}: no usable rankings in {}", source_config.path);
                }
                match cache.get(name).and_then(|bytes| {
                    serde_json::from_slice::<Vec<Ranking>>(&bytes).ok()
                }) {
                    Some(cached) if !cached.is_empty() => {
                        warn!("{name}: using {} cached rankings", cached.len());
                        loaded.insert(name.clone(), cached);
                    }
                    _ => {
                        warn!("{name}: dropping source");
                    }
                }
            }
        }
    }
    loaded
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_CSV: &str = "\
name,position,team,bye,rank,tier,points,notes
Justin Jefferson,WR,MIN,13,1,1,340.5,elite
Bijan Robinson,RB,ATL,5,2,,,
Josh Allen,QB,BUF,,3,1,,";

    #[test]
    fn loads_well_formed_rows() {
        let rankings = load_rankings_from_reader(GOOD_CSV.as_bytes(), "test").unwrap();
        assert_eq!(rankings.len(), 3);

        let jj = &rankings[0];
        assert_eq!(jj.player.name, "Justin Jefferson");
        assert_eq!(jj.player.position, Position::WR);
        assert_eq!(jj.player.team, NflTeam::MIN);
        assert_eq!(jj.player.bye_week, Some(13));
        assert_eq!(jj.rank, 1);
        assert_eq!(jj.tier, Some(1));
        assert_eq!(jj.projected_points, Some(340.5));
        assert_eq!(jj.notes.as_deref(), Some("elite"));
        assert_eq!(jj.source, "test");

        // Optional columns absent
        assert_eq!(rankings[1].tier, None);
        assert_eq!(rankings[1].projected_points, None);
        assert_eq!(rankings[2].player.bye_week, None);
    }

    #[test]
    fn skips_unknown_position_and_team() {
        let csv = "\
name,position,team,bye,rank
Good Player,RB,SF,9,1
Bad Position,XX,SF,9,2
Bad Team,RB,ZZZ,9,3";
        let rankings = load_rankings_from_reader(csv.as_bytes(), "test").unwrap();
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].player.name, "Good Player");
    }

    #[test]
    fn empty_team_becomes_free_agent() {
        let csv = "\
name,position,team,bye,rank
Free Agent Guy,WR,,7,40";
        let rankings = load_rankings_from_reader(csv.as_bytes(), "test").unwrap();
        assert_eq!(rankings[0].player.team, NflTeam::FA);
    }

    #[test]
    fn out_of_season_bye_becomes_none() {
        let csv = "\
name,position,team,bye,rank
Weird Bye,TE,DAL,25,10";
        let rankings = load_rankings_from_reader(csv.as_bytes(), "test").unwrap();
        assert_eq!(rankings[0].player.bye_week, None);
    }

    #[test]
    fn alternate_team_abbreviations_accepted() {
        let csv = "\
name,position,team,bye,rank
Jaguars Guy,RB,JAC,9,20
Commanders Guy,WR,WSH,14,21";
        let rankings = load_rankings_from_reader(csv.as_bytes(), "test").unwrap();
        assert_eq!(rankings[0].player.team, NflTeam::JAX);
        assert_eq!(rankings[1].player.team, NflTeam::WAS);
    }

    #[test]
    fn capitalized_headers_accepted() {
        let csv = "\
Name,Position,Team,Bye,Rank
CeeDee Lamb,WR,DAL,7,4";
        let rankings = load_rankings_from_reader(csv.as_bytes(), "test").unwrap();
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].rank, 4);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let csv = "\
name,position,team,bye,rank
Good Player,RB,SF,9,1
No Rank At All,WR,DAL,7,not-a-number";
        let rankings = load_rankings_from_reader(csv.as_bytes(), "test").unwrap();
        assert_eq!(rankings.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_source_rankings(Path::new("/nonexistent/rankings.csv"), "test");
        assert!(matches!(err, Err(SourceError::Io { .. })));
    }

    // -- Multi-source loading --

    fn temp_sources_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("draftboard_sources_{tag}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn source_entry(path: &Path) -> SourceConfig {
        SourceConfig {
            weight: 1.0,
            path: path.display().to_string(),
        }
    }

    #[test]
    fn load_all_drops_missing_sources() {
        let dir = temp_sources_dir("load_all");
        let good = dir.join("good.csv");
        std::fs::write(&good, GOOD_CSV).unwrap();

        let sources = BTreeMap::from([
            ("good".to_string(), source_entry(&good)),
            ("gone".to_string(), source_entry(&dir.join("gone.csv"))),
        ]);
        let loaded = load_all_sources(&sources);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["good"].len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cached_loader_survives_a_vanished_file() {
        let dir = temp_sources_dir("cached");
        let csv_path = dir.join("espn.csv");
        std::fs::write(&csv_path, GOOD_CSV).unwrap();
        let cache = FileCache::new(&dir.join("cache"), "rankings", 24).unwrap();

        let sources = BTreeMap::from([("espn".to_string(), source_entry(&csv_path))]);

        // First load reads the CSV and mirrors it into the cache.
        let first = load_all_sources_cached(&sources, &cache);
        assert_eq!(first["espn"].len(), 3);

        // File disappears; the cached copy keeps the source alive.
        std::fs::remove_file(&csv_path).unwrap();
        let second = load_all_sources_cached(&sources, &cache);
        assert_eq!(second["espn"].len(), 3);
        assert_eq!(second["espn"][0].player.name, "Justin Jefferson");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
