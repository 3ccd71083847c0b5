// Rank-based point projections.
//
// Baseline points come from a static table of last season's per-position
// scoring by finishing rank (half-PPR terms). Ranks past the table tail are
// extrapolated downward; scoring-system multipliers shift the pass-catching
// positions for standard and full-PPR leagues.

use std::fmt;
use std::str::FromStr;

use crate::models::{ConsensusRanking, Position};

/// Points assigned for a position with no reference table.
const DEFAULT_POINTS: f64 = 100.0;
/// Floor for extrapolated projections.
const EXTRAPOLATION_FLOOR: f64 = 20.0;
/// Points lost per rank past the table tail.
const EXTRAPOLATION_STEP: f64 = 5.0;

// ---------------------------------------------------------------------------
// Scoring system
// ---------------------------------------------------------------------------

/// League scoring system. Half-PPR is the reference the points tables are
/// expressed in, so it carries no adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringSystem {
    Standard,
    #[default]
    HalfPpr,
    Ppr,
}

impl ScoringSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringSystem::Standard => "STANDARD",
            ScoringSystem::HalfPpr => "HALF_PPR",
            ScoringSystem::Ppr => "PPR",
        }
    }

    /// Per-position point multiplier relative to the half-PPR baseline.
    fn multiplier(&self, position: Position) -> f64 {
        match self {
            ScoringSystem::Standard => match position {
                Position::RB => 0.95,
                Position::WR => 0.90,
                Position::TE => 0.85,
                _ => 1.0,
            },
            ScoringSystem::Ppr => match position {
                Position::RB => 1.05,
                Position::WR => 1.15,
                Position::TE => 1.20,
                _ => 1.0,
            },
            ScoringSystem::HalfPpr => 1.0,
        }
    }
}

impl FromStr for ScoringSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STANDARD" => Ok(ScoringSystem::Standard),
            "HALF_PPR" | "HALF-PPR" => Ok(ScoringSystem::HalfPpr),
            "PPR" => Ok(ScoringSystem::Ppr),
            other => Err(format!(
                "unknown scoring system '{other}' (expected STANDARD, HALF_PPR, or PPR)"
            )),
        }
    }
}

impl fmt::Display for ScoringSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Reference points tables (half-PPR, 2024 season, index = position rank - 1)
// ---------------------------------------------------------------------------

const QB_POINTS: &[f64] = &[
    380.0, 365.0, 350.0, 340.0, 330.0, 320.0, 310.0, 300.0, 290.0, 280.0, 270.0, 260.0, 250.0,
    240.0, 230.0, 220.0, 210.0, 200.0, 190.0, 180.0,
];

const RB_POINTS: &[f64] = &[
    350.0, 320.0, 300.0, 280.0, 265.0, 250.0, 240.0, 230.0, 220.0, 210.0, 200.0, 190.0, 180.0,
    170.0, 165.0, 160.0, 155.0, 150.0, 145.0, 140.0, 135.0, 130.0, 125.0, 120.0, 115.0, 110.0,
    105.0, 100.0, 95.0, 90.0, 85.0, 80.0, 75.0, 70.0, 65.0, 60.0,
];

const WR_POINTS: &[f64] = &[
    340.0, 320.0, 300.0, 285.0, 270.0, 260.0, 250.0, 240.0, 230.0, 220.0, 210.0, 200.0, 195.0,
    190.0, 185.0, 180.0, 175.0, 170.0, 165.0, 160.0, 155.0, 150.0, 145.0, 140.0, 135.0, 130.0,
    125.0, 120.0, 115.0, 110.0, 105.0, 100.0, 95.0, 90.0, 85.0, 80.0,
];

const TE_POINTS: &[f64] = &[
    280.0, 240.0, 210.0, 190.0, 170.0, 155.0, 145.0, 135.0, 125.0, 115.0, 105.0, 95.0, 85.0, 75.0,
    70.0, 65.0, 60.0, 55.0, 50.0, 45.0,
];

const K_POINTS: &[f64] = &[
    150.0, 145.0, 142.0, 140.0, 138.0, 136.0, 134.0, 132.0, 130.0, 128.0, 126.0, 124.0, 122.0,
    120.0, 118.0, 116.0, 114.0, 112.0, 110.0, 108.0,
];

const DST_POINTS: &[f64] = &[
    160.0, 150.0, 145.0, 140.0, 135.0, 130.0, 125.0, 120.0, 115.0, 110.0, 105.0, 100.0, 95.0,
    90.0, 85.0, 80.0, 75.0, 70.0, 65.0, 60.0,
];

fn points_table(position: Position) -> Option<&'static [f64]> {
    match position {
        Position::QB => Some(QB_POINTS),
        Position::RB => Some(RB_POINTS),
        Position::WR => Some(WR_POINTS),
        Position::TE => Some(TE_POINTS),
        Position::K => Some(K_POINTS),
        Position::DST => Some(DST_POINTS),
        Position::FLEX => None,
    }
}

/// Baseline points for a 1-based position rank: table lookup, a linear
/// falloff past the table tail (floored), or the flat default when the
/// position has no table at all.
fn base_points(position: Position, position_rank: usize) -> f64 {
    let Some(table) = points_table(position) else {
        return DEFAULT_POINTS;
    };
    if position_rank == 0 {
        return DEFAULT_POINTS;
    }
    if let Some(&points) = table.get(position_rank - 1) {
        return points;
    }
    let last_points = table[table.len() - 1];
    let past = (position_rank - table.len()) as f64;
    (last_points - past * EXTRAPOLATION_STEP).max(EXTRAPOLATION_FLOOR)
}

// ---------------------------------------------------------------------------
// Assigner
// ---------------------------------------------------------------------------

/// Annotates a consensus board with projected points, by position rank under
/// the configured scoring system.
pub struct ProjectionAssigner {
    scoring: ScoringSystem,
}

impl ProjectionAssigner {
    pub fn new(scoring: ScoringSystem) -> Self {
        ProjectionAssigner { scoring }
    }

    pub fn scoring(&self) -> ScoringSystem {
        self.scoring
    }

    /// Set `projected_points` on every entry. Players are ranked within their
    /// position by consensus rank; existing projections are overwritten.
    pub fn assign(&self, board: &mut [ConsensusRanking]) {
        // Indices per position, ordered by consensus rank.
        let mut order: Vec<usize> = (0..board.len()).collect();
        order.sort_by(|&a, &b| {
            board[a]
                .consensus_rank
                .partial_cmp(&board[b].consensus_rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut counters: std::collections::HashMap<Position, usize> =
            std::collections::HashMap::new();
        for idx in order {
            let position = board[idx].player.position;
            let counter = counters.entry(position).or_insert(0);
            *counter += 1;
            let points = base_points(position, *counter) * self.scoring.multiplier(position);
            board[idx].projected_points = Some(points);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NflTeam, Player};
    use std::collections::HashMap;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn consensus(name: &str, pos: Position, rank: f64) -> ConsensusRanking {
        ConsensusRanking {
            player: Player::new(name, pos, NflTeam::FA),
            consensus_rank: rank,
            sources: HashMap::new(),
            tier: 1,
            std_deviation: 0.0,
            min_rank: rank as u32,
            max_rank: rank as u32,
            position_rank: None,
            projected_points: None,
            notes: None,
            value: None,
        }
    }

    // -- Scoring system parsing --

    #[test]
    fn scoring_system_from_str() {
        assert_eq!("STANDARD".parse(), Ok(ScoringSystem::Standard));
        assert_eq!("half_ppr".parse(), Ok(ScoringSystem::HalfPpr));
        assert_eq!("ppr".parse(), Ok(ScoringSystem::Ppr));
        assert!("superflex".parse::<ScoringSystem>().is_err());
    }

    // -- Table lookup --

    #[test]
    fn table_lookup_exact_ranks() {
        assert!(approx_eq(base_points(Position::QB, 1), 380.0));
        assert!(approx_eq(base_points(Position::QB, 20), 180.0));
        assert!(approx_eq(base_points(Position::RB, 36), 60.0));
        assert!(approx_eq(base_points(Position::TE, 3), 210.0));
        assert!(approx_eq(base_points(Position::DST, 1), 160.0));
    }

    #[test]
    fn extrapolation_past_table_tail() {
        // QB table ends at rank 20 with 180: rank 25 is 180 - 5*5 = 155.
        assert!(approx_eq(base_points(Position::QB, 25), 155.0));
        // Deep enough to hit the floor.
        assert!(approx_eq(base_points(Position::QB, 200), 20.0));
    }

    #[test]
    fn no_table_falls_back_to_default() {
        assert!(approx_eq(base_points(Position::FLEX, 1), 100.0));
    }

    // -- Multipliers --

    #[test]
    fn half_ppr_is_the_identity() {
        for &pos in Position::PLAYER_POSITIONS {
            assert!(approx_eq(ScoringSystem::HalfPpr.multiplier(pos), 1.0));
        }
    }

    #[test]
    fn standard_discounts_pass_catchers() {
        assert!(approx_eq(ScoringSystem::Standard.multiplier(Position::WR), 0.90));
        assert!(approx_eq(ScoringSystem::Standard.multiplier(Position::TE), 0.85));
        assert!(approx_eq(ScoringSystem::Standard.multiplier(Position::QB), 1.0));
    }

    #[test]
    fn ppr_boosts_pass_catchers() {
        assert!(approx_eq(ScoringSystem::Ppr.multiplier(Position::WR), 1.15));
        assert!(approx_eq(ScoringSystem::Ppr.multiplier(Position::TE), 1.20));
        assert!(approx_eq(ScoringSystem::Ppr.multiplier(Position::K), 1.0));
    }

    // -- Assignment --

    #[test]
    fn assigns_by_position_rank_not_overall_rank() {
        let mut board = vec![
            consensus("QB One", Position::QB, 5.0),
            consensus("WR One", Position::WR, 1.0),
            consensus("QB Two", Position::QB, 9.0),
        ];
        ProjectionAssigner::new(ScoringSystem::HalfPpr).assign(&mut board);

        // QB One is overall #2 but QB #1.
        assert!(approx_eq(board[0].projected_points.unwrap(), 380.0));
        assert!(approx_eq(board[1].projected_points.unwrap(), 340.0));
        assert!(approx_eq(board[2].projected_points.unwrap(), 365.0));
    }

    #[test]
    fn ppr_multiplier_applies_to_assignment() {
        let mut board = vec![consensus("WR One", Position::WR, 1.0)];
        ProjectionAssigner::new(ScoringSystem::Ppr).assign(&mut board);
        assert!(approx_eq(board[0].projected_points.unwrap(), 340.0 * 1.15));
    }

    #[test]
    fn projections_decrease_down_a_position() {
        let mut board: Vec<ConsensusRanking> = (1..=50)
            .map(|i| consensus(&format!("RB {i}"), Position::RB, i as f64))
            .collect();
        ProjectionAssigner::new(ScoringSystem::HalfPpr).assign(&mut board);

        let points: Vec<f64> = board
            .iter()
            .map(|c| c.projected_points.unwrap())
            .collect();
        assert!(points.windows(2).all(|w| w[0] >= w[1]));
        assert!(points.iter().all(|&p| p >= 20.0));
    }
}
