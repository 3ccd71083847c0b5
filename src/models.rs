// Core data model: players, per-source rankings, and consensus records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lowest ordinal rank a source may report.
pub const MIN_RANK: u32 = 1;
/// Highest ordinal rank a source may report.
pub const MAX_RANK: u32 = 500;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Fantasy football positions. FLEX is a virtual slot (RB/WR/TE) used only
/// for roster configuration; no player record carries it as their position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DST,
    FLEX,
}

impl Position {
    /// Parse a position string. Case-insensitive; accepts the common
    /// defense spellings "D/ST" and "DEF".
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            "K" => Some(Position::K),
            "DST" | "D/ST" | "DEF" => Some(Position::DST),
            "FLEX" => Some(Position::FLEX),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DST => "DST",
            Position::FLEX => "FLEX",
        }
    }

    /// Concrete positions a player record may carry (everything but FLEX).
    pub const PLAYER_POSITIONS: &'static [Position] = &[
        Position::QB,
        Position::RB,
        Position::WR,
        Position::TE,
        Position::K,
        Position::DST,
    ];

    /// Whether players at this position may fill a FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(self, Position::RB | Position::WR | Position::TE)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// NFL team
// ---------------------------------------------------------------------------

/// NFL team abbreviations, plus a free-agent sentinel for unsigned players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NflTeam {
    ARI, ATL, BAL, BUF, CAR, CHI, CIN, CLE, DAL, DEN, DET, GB, HOU, IND,
    JAX, KC, LAC, LAR, LV, MIA, MIN, NE, NO, NYG, NYJ, PHI, PIT, SEA, SF,
    TB, TEN, WAS,
    /// Free agent (unsigned/retired players).
    FA,
}

impl NflTeam {
    /// Parse a team abbreviation. Case-insensitive; accepts the alternate
    /// spellings some sources use (JAC for Jacksonville, WSH for Washington).
    pub fn from_abbr(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ARI" => Some(NflTeam::ARI),
            "ATL" => Some(NflTeam::ATL),
            "BAL" => Some(NflTeam::BAL),
            "BUF" => Some(NflTeam::BUF),
            "CAR" => Some(NflTeam::CAR),
            "CHI" => Some(NflTeam::CHI),
            "CIN" => Some(NflTeam::CIN),
            "CLE" => Some(NflTeam::CLE),
            "DAL" => Some(NflTeam::DAL),
            "DEN" => Some(NflTeam::DEN),
            "DET" => Some(NflTeam::DET),
            "GB" => Some(NflTeam::GB),
            "HOU" => Some(NflTeam::HOU),
            "IND" => Some(NflTeam::IND),
            "JAX" | "JAC" => Some(NflTeam::JAX),
            "KC" => Some(NflTeam::KC),
            "LAC" => Some(NflTeam::LAC),
            "LAR" => Some(NflTeam::LAR),
            "LV" => Some(NflTeam::LV),
            "MIA" => Some(NflTeam::MIA),
            "MIN" => Some(NflTeam::MIN),
            "NE" => Some(NflTeam::NE),
            "NO" => Some(NflTeam::NO),
            "NYG" => Some(NflTeam::NYG),
            "NYJ" => Some(NflTeam::NYJ),
            "PHI" => Some(NflTeam::PHI),
            "PIT" => Some(NflTeam::PIT),
            "SEA" => Some(NflTeam::SEA),
            "SF" => Some(NflTeam::SF),
            "TB" => Some(NflTeam::TB),
            "TEN" => Some(NflTeam::TEN),
            "WAS" | "WSH" => Some(NflTeam::WAS),
            "FA" => Some(NflTeam::FA),
            _ => None,
        }
    }

    /// Return the canonical abbreviation.
    pub fn abbr(&self) -> &'static str {
        match self {
            NflTeam::ARI => "ARI",
            NflTeam::ATL => "ATL",
            NflTeam::BAL => "BAL",
            NflTeam::BUF => "BUF",
            NflTeam::CAR => "CAR",
            NflTeam::CHI => "CHI",
            NflTeam::CIN => "CIN",
            NflTeam::CLE => "CLE",
            NflTeam::DAL => "DAL",
            NflTeam::DEN => "DEN",
            NflTeam::DET => "DET",
            NflTeam::GB => "GB",
            NflTeam::HOU => "HOU",
            NflTeam::IND => "IND",
            NflTeam::JAX => "JAX",
            NflTeam::KC => "KC",
            NflTeam::LAC => "LAC",
            NflTeam::LAR => "LAR",
            NflTeam::LV => "LV",
            NflTeam::MIA => "MIA",
            NflTeam::MIN => "MIN",
            NflTeam::NE => "NE",
            NflTeam::NO => "NO",
            NflTeam::NYG => "NYG",
            NflTeam::NYJ => "NYJ",
            NflTeam::PHI => "PHI",
            NflTeam::PIT => "PIT",
            NflTeam::SEA => "SEA",
            NflTeam::SF => "SF",
            NflTeam::TB => "TB",
            NflTeam::TEN => "TEN",
            NflTeam::WAS => "WAS",
            NflTeam::FA => "FA",
        }
    }
}

impl fmt::Display for NflTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbr())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One NFL player as reported by a source. Identity for deduplication is
/// (normalized name, position, team), not raw name equality; the `aliases`
/// list accumulates alternate spellings discovered during merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub position: Position,
    pub team: NflTeam,
    /// Bye week (1-18), absent for free agents and unknown schedules.
    pub bye_week: Option<u8>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Player {
    pub fn new(name: impl Into<String>, position: Position, team: NflTeam) -> Self {
        Player {
            name: name.into(),
            position,
            team,
            bye_week: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_bye(mut self, bye_week: u8) -> Self {
        self.bye_week = Some(bye_week);
        self
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} - {})", self.name, self.position, self.team)
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// One source's opinion of one player. Immutable once produced by a source
/// adapter; the aggregator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    pub player: Player,
    /// Ordinal rank, 1-based. Valid range is [MIN_RANK, MAX_RANK]; the
    /// aggregator filters out-of-range entries.
    pub rank: u32,
    pub source: String,
    pub tier: Option<u32>,
    pub projected_points: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Ranking {
    pub fn new(player: Player, rank: u32, source: impl Into<String>) -> Self {
        Ranking {
            player,
            rank,
            source: source.into(),
            tier: None,
            projected_points: None,
            timestamp: Utc::now(),
            notes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Consensus ranking
// ---------------------------------------------------------------------------

/// The aggregate record for one canonical player. Created by the aggregator,
/// then annotated in place by the tier assigner, projection assigner, and the
/// VBD engine, in that order. This is the terminal artifact handed to
/// exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRanking {
    pub player: Player,
    /// Weighted-average rank across contributing sources. Always lies within
    /// [min_rank, max_rank].
    pub consensus_rank: f64,
    /// source name -> that source's ordinal rank. Never empty.
    pub sources: HashMap<String, u32>,
    /// Positive tier number, smaller is better. Assigned per position.
    pub tier: u32,
    /// Sample standard deviation of the raw per-source ranks; 0.0 when
    /// fewer than two sources report the player.
    pub std_deviation: f64,
    pub min_rank: u32,
    pub max_rank: u32,
    /// 1-based rank within the player's position group.
    pub position_rank: Option<u32>,
    pub projected_points: Option<f64>,
    /// Free-text notes from the first source that supplied any.
    pub notes: Option<String>,
    /// Value over replacement, floored at zero. Absent until the VBD engine
    /// runs, and absent for players it excluded (no projection).
    pub value: Option<f64>,
}

impl ConsensusRanking {
    /// Spread between the best and worst source rank.
    pub fn rank_spread(&self) -> u32 {
        self.max_rank.saturating_sub(self.min_rank)
    }

    /// Whether the sources broadly agree on this player.
    pub fn is_consensus(&self) -> bool {
        self.rank_spread() <= 10
    }

    /// Unweighted average of the per-source ranks.
    pub fn average_rank(&self) -> f64 {
        if self.sources.is_empty() {
            return self.consensus_rank;
        }
        self.sources.values().map(|&r| r as f64).sum::<f64>() / self.sources.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parse_standard() {
        assert_eq!(Position::from_str_pos("QB"), Some(Position::QB));
        assert_eq!(Position::from_str_pos("rb"), Some(Position::RB));
        assert_eq!(Position::from_str_pos(" WR "), Some(Position::WR));
        assert_eq!(Position::from_str_pos("FLEX"), Some(Position::FLEX));
    }

    #[test]
    fn position_parse_defense_variants() {
        assert_eq!(Position::from_str_pos("DST"), Some(Position::DST));
        assert_eq!(Position::from_str_pos("D/ST"), Some(Position::DST));
        assert_eq!(Position::from_str_pos("def"), Some(Position::DST));
    }

    #[test]
    fn position_parse_invalid() {
        assert_eq!(Position::from_str_pos("XX"), None);
        assert_eq!(Position::from_str_pos(""), None);
    }

    #[test]
    fn position_display_roundtrip() {
        for &pos in Position::PLAYER_POSITIONS {
            assert_eq!(Position::from_str_pos(pos.display_str()), Some(pos));
        }
    }

    #[test]
    fn flex_eligibility() {
        assert!(Position::RB.is_flex_eligible());
        assert!(Position::WR.is_flex_eligible());
        assert!(Position::TE.is_flex_eligible());
        assert!(!Position::QB.is_flex_eligible());
        assert!(!Position::K.is_flex_eligible());
        assert!(!Position::DST.is_flex_eligible());
    }

    #[test]
    fn team_parse_aliases() {
        assert_eq!(NflTeam::from_abbr("JAC"), Some(NflTeam::JAX));
        assert_eq!(NflTeam::from_abbr("JAX"), Some(NflTeam::JAX));
        assert_eq!(NflTeam::from_abbr("WSH"), Some(NflTeam::WAS));
        assert_eq!(NflTeam::from_abbr("fa"), Some(NflTeam::FA));
        assert_eq!(NflTeam::from_abbr("XYZ"), None);
    }

    #[test]
    fn player_display() {
        let p = Player::new("CeeDee Lamb", Position::WR, NflTeam::DAL);
        assert_eq!(format!("{}", p), "CeeDee Lamb (WR - DAL)");
    }

    #[test]
    fn consensus_rank_spread_and_agreement() {
        let mut sources = HashMap::new();
        sources.insert("a".to_string(), 5u32);
        sources.insert("b".to_string(), 12u32);
        let c = ConsensusRanking {
            player: Player::new("Test", Position::RB, NflTeam::SF),
            consensus_rank: 8.5,
            sources,
            tier: 1,
            std_deviation: 4.95,
            min_rank: 5,
            max_rank: 12,
            position_rank: None,
            projected_points: None,
            notes: None,
            value: None,
        };
        assert_eq!(c.rank_spread(), 7);
        assert!(c.is_consensus());
        assert!((c.average_rank() - 8.5).abs() < 1e-9);
    }
}
