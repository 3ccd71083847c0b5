// Consensus aggregation: folds per-source ranking lists into one weighted
// consensus board, then annotates position ranks and tiers.
//
// Source order is normalized (sorted by source name) before any matching or
// accumulation runs, so output is deterministic regardless of map iteration
// order upstream.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::matcher::{merge_player_lists, PlayerMatcher};
use crate::models::{
    ConsensusRanking, NflTeam, Player, Position, Ranking, MAX_RANK, MIN_RANK,
};
use crate::normalizer::normalize_name;

/// Tier sizes used for a position with no configured sequence.
const DEFAULT_TIER_SIZES: &[usize] = &[12, 12, 12, 12];

/// Number of tiers counted as "quality" depth for scarcity.
const QUALITY_TIER_CUTOFF: u32 = 3;

type PlayerKey = (String, Position, NflTeam);

fn player_key(player: &Player) -> PlayerKey {
    (normalize_name(&player.name), player.position, player.team)
}

/// Builds and holds the consensus board. Construct with the matcher (which
/// carries the alias table), then feed `aggregate` the per-source rankings;
/// the query methods read the board produced by the last call.
pub struct RankingAggregator {
    matcher: PlayerMatcher,
    source_weights: HashMap<String, f64>,
    tier_sizes: HashMap<Position, Vec<usize>>,
    board: Vec<ConsensusRanking>,
}

impl RankingAggregator {
    pub fn new(matcher: PlayerMatcher) -> Self {
        RankingAggregator {
            matcher,
            source_weights: HashMap::new(),
            tier_sizes: HashMap::new(),
            board: Vec::new(),
        }
    }

    pub fn with_source_weights(mut self, weights: HashMap<String, f64>) -> Self {
        self.source_weights = weights;
        self
    }

    pub fn with_tier_sizes(mut self, tier_sizes: HashMap<Position, Vec<usize>>) -> Self {
        self.tier_sizes = tier_sizes;
        self
    }

    pub fn board(&self) -> &[ConsensusRanking] {
        &self.board
    }

    // -----------------------------------------------------------------------
    // Aggregation
    // -----------------------------------------------------------------------

    /// Fold per-source rankings into a consensus board, sorted ascending by
    /// consensus rank, with position ranks and tiers assigned.
    ///
    /// Sources whose rankings are all invalid are dropped; if nothing valid
    /// remains anywhere the result is an empty board, not an error.
    pub fn aggregate(
        &mut self,
        rankings_by_source: &HashMap<String, Vec<Ranking>>,
    ) -> Vec<ConsensusRanking> {
        let validated = validate_sources(rankings_by_source);
        if validated.is_empty() {
            warn!("no valid rankings from any source");
            self.board = Vec::new();
            return Vec::new();
        }

        // Sorted source order keeps matching and accumulation deterministic.
        let mut source_names: Vec<&String> = validated.keys().collect();
        source_names.sort();

        let player_lists: Vec<Vec<Player>> = source_names
            .iter()
            .map(|name| validated[*name].iter().map(|r| r.player.clone()).collect())
            .collect();
        let pool = merge_player_lists(&player_lists);
        let key_to_index: HashMap<PlayerKey, usize> = pool
            .iter()
            .enumerate()
            .map(|(i, p)| (player_key(p), i))
            .collect();

        struct Accum {
            weighted_sum: f64,
            weight_total: f64,
            raw_ranks: Vec<u32>,
            sources: HashMap<String, u32>,
            projected_points: Option<f64>,
            notes: Option<String>,
        }
        let mut accums: HashMap<usize, Accum> = HashMap::new();

        for name in &source_names {
            let weight = self.source_weights.get(name.as_str()).copied().unwrap_or(1.0);
            // One ranking per (source, player): a duplicate row within a
            // source overwrites the earlier one instead of counting twice.
            let mut per_source: HashMap<usize, &Ranking> = HashMap::new();
            for ranking in &validated[*name] {
                let Some(idx) = self.resolve(&ranking.player, &pool, &key_to_index) else {
                    debug!(
                        "could not resolve '{}' from source {}",
                        ranking.player.name, name
                    );
                    continue;
                };
                per_source.insert(idx, ranking);
            }
            for (idx, ranking) in per_source {
                let entry = accums.entry(idx).or_insert_with(|| Accum {
                    weighted_sum: 0.0,
                    weight_total: 0.0,
                    raw_ranks: Vec::new(),
                    sources: HashMap::new(),
                    projected_points: None,
                    notes: None,
                });
                entry.weighted_sum += ranking.rank as f64 * weight;
                entry.weight_total += weight;
                entry.raw_ranks.push(ranking.rank);
                entry.sources.insert((*name).clone(), ranking.rank);
                if entry.projected_points.is_none() {
                    entry.projected_points = ranking.projected_points;
                }
                if entry.notes.is_none() {
                    entry.notes = ranking.notes.clone();
                }
            }
        }

        let mut board: Vec<ConsensusRanking> = Vec::with_capacity(accums.len());
        for (idx, accum) in accums {
            let min_rank = accum.raw_ranks.iter().copied().min().unwrap_or(MIN_RANK);
            let max_rank = accum.raw_ranks.iter().copied().max().unwrap_or(MIN_RANK);
            // Rounding in the weighted quotient can land a hair outside the
            // contributing ranks; clamp to keep the bound exact.
            let consensus_rank = (accum.weighted_sum / accum.weight_total)
                .clamp(min_rank as f64, max_rank as f64);
            board.push(ConsensusRanking {
                player: pool[idx].clone(),
                consensus_rank,
                sources: accum.sources,
                tier: 1,
                std_deviation: sample_std_dev(&accum.raw_ranks),
                min_rank,
                max_rank,
                position_rank: None,
                projected_points: accum.projected_points,
                notes: accum.notes,
                value: None,
            });
        }

        // Pre-sort by pool index order was lost through the HashMap; restore
        // a stable total order before the consensus sort so ties resolve the
        // same way run to run.
        board.sort_by_key(|c| key_to_index[&player_key(&c.player)]);
        board.sort_by(|a, b| {
            a.consensus_rank
                .partial_cmp(&b.consensus_rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        assign_position_ranks(&mut board);
        assign_tiers(&mut board, &self.tier_sizes);

        info!(
            "aggregated {} players from {} sources",
            board.len(),
            source_names.len()
        );
        self.board = board.clone();
        board
    }

    /// Map a source-reported player onto the canonical pool through the
    /// matcher's alias/exact/fuzzy chain. Alias precedence matters here: a
    /// known variant spelling has its own pool entry (the merge key is the
    /// normalized name), and the alias table is what folds it onto the
    /// canonical one. Variant entries that end up with no sources attached
    /// never reach the board.
    fn resolve(
        &mut self,
        player: &Player,
        pool: &[Player],
        key_to_index: &HashMap<PlayerKey, usize>,
    ) -> Option<usize> {
        let matched = self.matcher.find_match(
            &player.name,
            Some(player.team),
            Some(player.position),
            Some(pool),
        )?;
        key_to_index.get(&player_key(&matched)).copied()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Top `count` players from the board, optionally restricted to one
    /// position.
    pub fn top_players(&self, count: usize, position: Option<Position>) -> Vec<&ConsensusRanking> {
        self.board
            .iter()
            .filter(|c| position.map_or(true, |p| c.player.position == p))
            .take(count)
            .collect()
    }

    /// Player names grouped by position and tier, in consensus order.
    pub fn tier_analysis(&self) -> HashMap<Position, BTreeMap<u32, Vec<String>>> {
        let mut analysis: HashMap<Position, BTreeMap<u32, Vec<String>>> = HashMap::new();
        for entry in &self.board {
            analysis
                .entry(entry.player.position)
                .or_default()
                .entry(entry.tier)
                .or_default()
                .push(entry.player.name.clone());
        }
        analysis
    }

    /// Demand over quality supply per position: (starters required league-wide)
    /// divided by the number of players in the top tiers. FLEX is a virtual
    /// slot and is skipped; a position with no quality players at all scores
    /// infinite scarcity.
    pub fn position_scarcity(
        &self,
        roster: &HashMap<Position, u32>,
        num_teams: u32,
    ) -> HashMap<Position, f64> {
        let mut scarcity = HashMap::new();
        for (&position, &required) in roster {
            if position == Position::FLEX {
                continue;
            }
            let demand = (required * num_teams) as f64;
            let quality = self
                .board
                .iter()
                .filter(|c| c.player.position == position && c.tier <= QUALITY_TIER_CUTOFF)
                .count();
            let value = if quality == 0 {
                f64::INFINITY
            } else {
                demand / quality as f64
            };
            scarcity.insert(position, value);
        }
        scarcity
    }
}

// ---------------------------------------------------------------------------
// Validation and annotation passes
// ---------------------------------------------------------------------------

/// Drop rankings whose ordinal is out of range, then drop sources left empty.
fn validate_sources(
    rankings_by_source: &HashMap<String, Vec<Ranking>>,
) -> HashMap<String, Vec<Ranking>> {
    let mut validated = HashMap::new();
    for (source, rankings) in rankings_by_source {
        let kept: Vec<Ranking> = rankings
            .iter()
            .filter(|r| (MIN_RANK..=MAX_RANK).contains(&r.rank))
            .cloned()
            .collect();
        let dropped = rankings.len() - kept.len();
        if dropped > 0 {
            warn!("{source}: dropped {dropped} rankings with out-of-range ranks");
        }
        if kept.is_empty() {
            warn!("{source}: no valid rankings, dropping source");
            continue;
        }
        validated.insert(source.clone(), kept);
    }
    validated
}

/// 1-based rank within each position group, in board (consensus) order.
fn assign_position_ranks(board: &mut [ConsensusRanking]) {
    let mut counters: HashMap<Position, u32> = HashMap::new();
    for entry in board {
        let counter = counters.entry(entry.player.position).or_insert(0);
        *counter += 1;
        entry.position_rank = Some(*counter);
    }
}

/// Walk each position group in consensus order, filling tiers of the
/// configured sizes. When the size sequence runs out, every remaining player
/// lands in a single overflow tier numbered one past the last configured tier.
fn assign_tiers(board: &mut [ConsensusRanking], tier_sizes: &HashMap<Position, Vec<usize>>) {
    let mut progress: HashMap<Position, (usize, usize)> = HashMap::new(); // (tier idx, filled)
    for entry in board {
        let position = entry.player.position;
        let sizes: &[usize] = tier_sizes
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(DEFAULT_TIER_SIZES);
        let (tier_idx, filled) = progress.entry(position).or_insert((0, 0));
        if *tier_idx < sizes.len() && *filled >= sizes[*tier_idx] {
            *tier_idx += 1;
            *filled = 0;
        }
        // Past the last configured tier, tier_idx stays pinned at sizes.len().
        entry.tier = (*tier_idx as u32) + 1;
        *filled += 1;
    }
}

/// Sample standard deviation (n - 1 denominator); 0.0 below two samples.
fn sample_std_dev(ranks: &[u32]) -> f64 {
    if ranks.len() < 2 {
        return 0.0;
    }
    let n = ranks.len() as f64;
    let mean = ranks.iter().map(|&r| r as f64).sum::<f64>() / n;
    let variance = ranks
        .iter()
        .map(|&r| {
            let d = r as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / (n - 1.0);
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
