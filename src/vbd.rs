// Value-based drafting: converts projected points into value over a
// replacement-level baseline, per position, under one of three baseline
// policies.
//
// All baselines are computed from the players that actually carry
// projections; FLEX is a virtual roster slot and never gets a baseline of
// its own.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::models::{ConsensusRanking, Position};

// ---------------------------------------------------------------------------
// Baseline policy
// ---------------------------------------------------------------------------

/// Baseline methodology for value computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VbdBaseline {
    /// Value over the last starter at the position.
    Vols,
    /// Value over the best player expected to clear the draft (waiver wire).
    #[default]
    Vorp,
    /// Value over the man-games replacement level (byes and injuries).
    Beer,
}

impl VbdBaseline {
    pub fn as_str(&self) -> &'static str {
        match self {
            VbdBaseline::Vols => "vols",
            VbdBaseline::Vorp => "vorp",
            VbdBaseline::Beer => "beer",
        }
    }

    /// Expected drafted players per team at a position (VORP).
    fn draft_multiplier(position: Position) -> f64 {
        match position {
            Position::QB => 1.5,
            Position::RB => 3.5,
            Position::WR => 4.0,
            Position::TE => 1.5,
            Position::K => 1.0,
            Position::DST => 1.0,
            _ => 2.0,
        }
    }

    /// Man-games replacement factor per starter slot (BEER).
    fn man_games_multiplier(position: Position) -> f64 {
        match position {
            Position::QB => 1.2,
            Position::RB => 2.5,
            Position::WR => 2.0,
            Position::TE => 1.5,
            Position::K => 1.1,
            Position::DST => 1.1,
            _ => 1.5,
        }
    }
}

impl FromStr for VbdBaseline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vols" => Ok(VbdBaseline::Vols),
            "vorp" => Ok(VbdBaseline::Vorp),
            "beer" => Ok(VbdBaseline::Beer),
            other => Err(format!(
                "unknown baseline '{other}' (expected vols, vorp, or beer)"
            )),
        }
    }
}

impl fmt::Display for VbdBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-player value computation outcome.
#[derive(Debug, Clone)]
pub struct VorpResult {
    pub player_name: String,
    pub position: Position,
    pub projected_points: f64,
    pub baseline_points: f64,
    /// Value over the baseline, floored at zero.
    pub vorp_score: f64,
    pub baseline_type: VbdBaseline,
    /// Name of the player defining the baseline; None when the position pool
    /// was empty.
    pub baseline_player: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes replacement baselines and player values from league shape:
/// team count and starting roster slots per position.
pub struct VbdEngine {
    num_teams: u32,
    roster: HashMap<Position, u32>,
}

impl VbdEngine {
    pub fn new(num_teams: u32, roster: HashMap<Position, u32>) -> Self {
        VbdEngine { num_teams, roster }
    }

    fn starters_needed(&self, position: Position) -> usize {
        (self.roster.get(&position).copied().unwrap_or(0) * self.num_teams) as usize
    }

    /// Value over replacement for every player carrying a projection, sorted
    /// descending by score. An input with no projections at all yields an
    /// empty result.
    pub fn calculate_vorp(
        &self,
        board: &[ConsensusRanking],
        baseline_type: VbdBaseline,
    ) -> Vec<VorpResult> {
        let projected: Vec<&ConsensusRanking> = board
            .iter()
            .filter(|c| c.projected_points.is_some())
            .collect();
        if projected.is_empty() {
            warn!("no players carry projections, skipping value computation");
            return Vec::new();
        }

        let baselines = self.baselines(&projected, baseline_type);

        let mut results: Vec<VorpResult> = Vec::with_capacity(projected.len());
        for entry in &projected {
            let position = entry.player.position;
            let Some((baseline_points, baseline_player)) = baselines.get(&position) else {
                continue;
            };
            let points = entry.projected_points.unwrap_or(0.0);
            results.push(VorpResult {
                player_name: entry.player.name.clone(),
                position,
                projected_points: points,
                baseline_points: *baseline_points,
                vorp_score: (points - baseline_points).max(0.0),
                baseline_type,
                baseline_player: baseline_player.clone(),
            });
        }

        results.sort_by(|a, b| {
            b.vorp_score
                .partial_cmp(&a.vorp_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    /// Per-position (baseline points, baseline player) under the policy.
    fn baselines(
        &self,
        projected: &[&ConsensusRanking],
        baseline_type: VbdBaseline,
    ) -> HashMap<Position, (f64, Option<String>)> {
        let mut by_position: HashMap<Position, Vec<&ConsensusRanking>> = HashMap::new();
        for entry in projected {
            by_position.entry(entry.player.position).or_default().push(entry);
        }
        for pool in by_position.values_mut() {
            pool.sort_by(|a, b| {
                b.projected_points
                    .partial_cmp(&a.projected_points)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let mut baselines = HashMap::new();
        for (&position, pool) in &by_position {
            if position == Position::FLEX {
                continue;
            }
            let idx = self.baseline_index(position, pool.len(), baseline_type);
            baselines.insert(position, pick_baseline(pool, idx));
        }
        baselines
    }

    /// Index of the baseline player in a descending-sorted pool. None means
    /// "last available" (the pool is shallower than the policy wants).
    fn baseline_index(
        &self,
        position: Position,
        pool_len: usize,
        baseline_type: VbdBaseline,
    ) -> Option<usize> {
        let starters = self.starters_needed(position);
        match baseline_type {
            VbdBaseline::Vols => {
                if starters > 0 && pool_len >= starters {
                    Some(starters - 1)
                } else {
                    None
                }
            }
            VbdBaseline::Vorp => {
                let drafted =
                    (self.num_teams as f64 * VbdBaseline::draft_multiplier(position)) as usize;
                if pool_len > drafted {
                    Some(drafted)
                } else {
                    None
                }
            }
            VbdBaseline::Beer => {
                let needed =
                    (starters as f64 * VbdBaseline::man_games_multiplier(position)) as usize;
                if needed > 0 && pool_len >= needed {
                    Some(needed - 1)
                } else {
                    None
                }
            }
        }
    }

    /// Drop-off scarcity per position: how much of the top value is gone by
    /// twice the starter depth. 0.0 for thin pools or a worthless top player.
    pub fn positional_scarcity(&self, results: &[VorpResult]) -> HashMap<Position, f64> {
        let mut by_position: HashMap<Position, Vec<&VorpResult>> = HashMap::new();
        for result in results {
            by_position.entry(result.position).or_default().push(result);
        }

        let mut scarcity = HashMap::new();
        for (&position, group) in &by_position {
            if group.len() < 2 {
                scarcity.insert(position, 0.0);
                continue;
            }
            let top = group[0].vorp_score;
            let check_idx = (self.starters_needed(position) * 2).min(group.len() - 1);
            let value = if check_idx > 0 && top > 0.0 {
                (top - group[check_idx].vorp_score) / top
            } else {
                0.0
            };
            scarcity.insert(position, value);
        }
        scarcity
    }

    /// Annotate the board with value scores and stable-sort it descending by
    /// value. Players the value pass excluded (no projection) keep a None
    /// value and sink below any scored player.
    pub fn create_draft_board(
        &self,
        board: &mut [ConsensusRanking],
        baseline_type: VbdBaseline,
    ) {
        let results = self.calculate_vorp(board, baseline_type);
        let lookup: HashMap<(String, Position), f64> = results
            .into_iter()
            .map(|r| ((r.player_name, r.position), r.vorp_score))
            .collect();

        for entry in board.iter_mut() {
            entry.value = lookup
                .get(&(entry.player.name.clone(), entry.player.position))
                .copied();
        }

        board.sort_by(|a, b| {
            b.value
                .unwrap_or(0.0)
                .partial_cmp(&a.value.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        info!("draft board ordered by {} value", baseline_type);
    }
}

/// Resolve a baseline pick from a descending-sorted pool: the indexed player,
/// the last player when the index is absent or out of range, or the empty
/// sentinel (0.0, None).
fn pick_baseline(
    pool: &[&ConsensusRanking],
    idx: Option<usize>,
) -> (f64, Option<String>) {
    let Some(last) = pool.last() else {
        return (0.0, None);
    };
    let chosen = idx.and_then(|i| pool.get(i)).unwrap_or(last);
    (
        chosen.projected_points.unwrap_or(0.0),
        Some(chosen.player.name.clone()),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
