// Entity resolution: mapping a (name, team, position) query from one source
// onto a canonical player from the merged pool.
//
// Match precedence is strict: alias table first, then normalized exact
// equality, then fuzzy similarity. Fuzzy scoring takes the best of three
// measures (raw character order, token-order-insensitive, token-set) on a
// 0-100 scale, with a +5 bonus each for matching team and position.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::alias::AliasTable;
use crate::models::{NflTeam, Player, Position};
use crate::normalizer::normalize_name;

/// Minimum adjusted similarity score (bonuses included) for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 85.0;
/// Score bonus for an exact team or position match.
const FIELD_BONUS: f64 = 5.0;

type MatchKey = (String, Option<NflTeam>, Option<Position>);

// ---------------------------------------------------------------------------
// Similarity scoring
// ---------------------------------------------------------------------------

/// Raw character-order similarity, 0-100.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Similarity after sorting whitespace tokens, so word order is irrelevant.
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let mut ta: Vec<&str> = a.split_whitespace().collect();
    let mut tb: Vec<&str> = b.split_whitespace().collect();
    ta.sort_unstable();
    tb.sort_unstable();
    ratio(&ta.join(" "), &tb.join(" "))
}

/// Token-set similarity: scores the shared tokens against each side's
/// remainder, which tolerates extra or missing tokens on either side.
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let sa: BTreeSet<&str> = a.split_whitespace().collect();
    let sb: BTreeSet<&str> = b.split_whitespace().collect();

    let common: Vec<&str> = sa.intersection(&sb).copied().collect();
    let only_a: Vec<&str> = sa.difference(&sb).copied().collect();
    let only_b: Vec<&str> = sb.difference(&sa).copied().collect();

    let joined = |head: &[&str], tail: &[&str]| -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(head.len() + tail.len());
        parts.extend_from_slice(head);
        parts.extend_from_slice(tail);
        parts.join(" ")
    };

    let base = joined(&common, &[]);
    let with_a = joined(&common, &only_a);
    let with_b = joined(&common, &only_b);

    ratio(&base, &with_a)
        .max(ratio(&base, &with_b))
        .max(ratio(&with_a, &with_b))
}

/// Best of the three similarity measures.
fn similarity(a: &str, b: &str) -> f64 {
    ratio(a, b)
        .max(token_sort_ratio(a, b))
        .max(token_set_ratio(a, b))
}

fn fields_match(candidate: &Player, team: Option<NflTeam>, position: Option<Position>) -> bool {
    if let Some(t) = team {
        if candidate.team != t {
            return false;
        }
    }
    if let Some(p) = position {
        if candidate.position != p {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Resolves source-reported names against a canonical player pool. Holds the
/// alias table (injected, not global) and a per-query success cache.
pub struct PlayerMatcher {
    aliases: AliasTable,
    cache: HashMap<MatchKey, Player>,
}

impl PlayerMatcher {
    pub fn new(aliases: AliasTable) -> Self {
        PlayerMatcher {
            aliases,
            cache: HashMap::new(),
        }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    /// Find the canonical player for a query, or None.
    ///
    /// The cache is consulted only when no candidate list is supplied, since
    /// an explicit list can differ call to call; successful matches are always
    /// recorded. Without a candidate pool only the alias path can run, and an
    /// alias hit still needs a pool to produce a player, so a poolless query
    /// resolves from cache or not at all.
    pub fn find_match(
        &mut self,
        name: &str,
        team: Option<NflTeam>,
        position: Option<Position>,
        candidates: Option<&[Player]>,
    ) -> Option<Player> {
        let cache_key: MatchKey = (name.to_string(), team, position);
        if candidates.is_none() {
            if let Some(hit) = self.cache.get(&cache_key) {
                return Some(hit.clone());
            }
        }

        // 1. Alias exact match
        if let Some(canonical) = self.aliases.canonical_for(name) {
            let canonical = canonical.to_string();
            let canonical_norm = normalize_name(&canonical);
            if let Some(pool) = candidates {
                for candidate in pool {
                    if (candidate.name == canonical
                        || normalize_name(&candidate.name) == canonical_norm)
                        && fields_match(candidate, team, position)
                    {
                        self.cache.insert(cache_key, candidate.clone());
                        return Some(candidate.clone());
                    }
                }
            }
        }

        // Exact and fuzzy matching both require a pool.
        let pool = candidates?;

        // 2. Normalized exact match
        let query_norm = normalize_name(name);
        for candidate in pool {
            if normalize_name(&candidate.name) == query_norm
                && fields_match(candidate, team, position)
            {
                self.cache.insert(cache_key, candidate.clone());
                return Some(candidate.clone());
            }
        }

        // 3. Fuzzy match
        if let Some(found) = self.fuzzy_match(name, pool, team, position) {
            self.cache.insert(cache_key, found.clone());
            return Some(found);
        }

        None
    }

    /// Score every candidate and accept the first maximal score at or above
    /// the threshold. Team/position filters restrict the pool; if they would
    /// empty it, scoring falls back to the unfiltered pool (bonuses then
    /// cannot apply, so the bare threshold must be met).
    fn fuzzy_match(
        &self,
        name: &str,
        candidates: &[Player],
        team: Option<NflTeam>,
        position: Option<Position>,
    ) -> Option<Player> {
        let filtered: Vec<&Player> = candidates
            .iter()
            .filter(|c| fields_match(c, team, position))
            .collect();
        let pool: Vec<&Player> = if filtered.is_empty() {
            candidates.iter().collect()
        } else {
            filtered
        };

        let query_norm = normalize_name(name);
        let mut best: Option<&Player> = None;
        let mut best_score = 0.0;

        for candidate in pool {
            let mut score = similarity(&query_norm, &normalize_name(&candidate.name));
            if team.is_some_and(|t| candidate.team == t) {
                score += FIELD_BONUS;
            }
            if position.is_some_and(|p| candidate.position == p) {
                score += FIELD_BONUS;
            }
            // First maximal score wins: strict > keeps earlier candidates on ties.
            if score > best_score && score >= FUZZY_THRESHOLD {
                best_score = score;
                best = Some(candidate);
            }
        }

        if let Some(found) = best {
            debug!(
                "fuzzy matched '{}' to '{}' (score {:.1})",
                name, found.name, best_score
            );
        }
        best.cloned()
    }
}

// ---------------------------------------------------------------------------
// Merger
// ---------------------------------------------------------------------------

/// Merge player lists from multiple sources into one canonical list.
///
/// Dedup key is (normalized name, position, team). The first occurrence of a
/// key is canonical and keeps its first-seen output position; later
/// occurrences contribute their raw spelling to the canonical record's alias
/// list when it differs.
pub fn merge_player_lists(lists: &[Vec<Player>]) -> Vec<Player> {
    let mut seen: HashMap<(String, Position, NflTeam), usize> = HashMap::new();
    let mut merged: Vec<Player> = Vec::new();

    for list in lists {
        for player in list {
            let key = (normalize_name(&player.name), player.position, player.team);
            match seen.get(&key) {
                None => {
                    seen.insert(key, merged.len());
                    merged.push(player.clone());
                }
                Some(&idx) => {
                    let canonical = &mut merged[idx];
                    if player.name != canonical.name
                        && !canonical.aliases.contains(&player.name)
                    {
                        canonical.aliases.push(player.name.clone());
                    }
                }
            }
        }
    }

    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, pos: Position, team: NflTeam) -> Player {
        Player::new(name, pos, team)
    }

    fn bare_matcher() -> PlayerMatcher {
        PlayerMatcher::new(AliasTable::empty())
    }

    // -- Similarity scoring --

    #[test]
    fn ratio_identical_is_100() {
        assert!((ratio("A.J. Brown", "A.J. Brown") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_on_punctuation_variants() {
        // "AJ Brown" vs "A.J. Brown": 2 edits over 10 chars = 80.
        let score = ratio("AJ Brown", "A.J. Brown");
        assert!((score - 80.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn token_sort_ignores_word_order() {
        let score = token_sort_ratio("Brown A.J.", "A.J. Brown");
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn token_set_tolerates_extra_tokens() {
        let score = token_set_ratio("Kenneth Walker", "Kenneth Walker Seattle");
        assert!(score >= 99.0, "got {score}");
    }

    #[test]
    fn similarity_takes_the_maximum() {
        let a = "Brown A.J.";
        let b = "A.J. Brown";
        assert!(similarity(a, b) >= token_sort_ratio(a, b));
    }

    // -- Alias precedence --

    #[test]
    fn alias_match_resolves_before_fuzzy() {
        let mut matcher = PlayerMatcher::new(AliasTable::with_defaults());
        let pool = vec![
            player("A.J. Brown", Position::WR, NflTeam::PHI),
            player("Arthur Smith", Position::TE, NflTeam::ATL),
        ];
        let found = matcher.find_match("AJ Brown", None, None, Some(&pool));
        assert_eq!(found.map(|p| p.name), Some("A.J. Brown".to_string()));
    }

    #[test]
    fn alias_match_respects_field_filters() {
        let mut matcher = PlayerMatcher::new(AliasTable::with_defaults());
        let pool = vec![player("A.J. Brown", Position::WR, NflTeam::PHI)];
        // Alias resolves but the position filter rejects the only candidate,
        // and the fuzzy fallback scores a bonus-less 80 < 85.
        let found = matcher.find_match("AJ Brown", None, Some(Position::QB), Some(&pool));
        assert!(found.is_none());
    }

    // -- Exact normalized match --

    #[test]
    fn normalized_exact_match() {
        let mut matcher = bare_matcher();
        let pool = vec![player("D'Andre Swift", Position::RB, NflTeam::CHI)];
        let found = matcher.find_match("DAndre Swift", None, None, Some(&pool));
        assert_eq!(found.map(|p| p.name), Some("D'Andre Swift".to_string()));
    }

    #[test]
    fn no_candidates_returns_none() {
        let mut matcher = PlayerMatcher::new(AliasTable::with_defaults());
        assert!(matcher.find_match("AJ Brown", None, None, None).is_none());
    }

    // -- Fuzzy matching (spec scenario: "AJ Brown" vs "A.J. Brown") --

    #[test]
    fn fuzzy_match_with_bonuses_succeeds() {
        let mut matcher = bare_matcher();
        let pool = vec![player("A.J. Brown", Position::WR, NflTeam::PHI)];
        // Base similarity 80 + 5 (team) + 5 (position) = 90 >= 85.
        let found = matcher.find_match(
            "AJ Brown",
            Some(NflTeam::PHI),
            Some(Position::WR),
            Some(&pool),
        );
        assert_eq!(found.map(|p| p.name), Some("A.J. Brown".to_string()));
    }

    #[test]
    fn fuzzy_match_without_bonuses_fails_below_threshold() {
        let mut matcher = bare_matcher();
        // Candidate is on a different team: the team filter empties the pool,
        // fuzzy falls back to the unfiltered pool, and 80 < 85 without the
        // team bonus.
        let pool = vec![player("A.J. Brown", Position::WR, NflTeam::TEN)];
        let found = matcher.find_match("AJ Brown", Some(NflTeam::PHI), None, Some(&pool));
        assert!(found.is_none());
    }

    #[test]
    fn fuzzy_filter_fallback_can_still_match() {
        let mut matcher = bare_matcher();
        // Position filter empties the pool (asked for WR, only RB present),
        // but the unfiltered pool contains an exact-enough name and the team
        // bonus still applies: 100 + 5 = 105 >= 85.
        let pool = vec![player("Bijan Robinson", Position::RB, NflTeam::ATL)];
        let found = matcher.find_match(
            "Bijan Robinson",
            Some(NflTeam::ATL),
            Some(Position::WR),
            Some(&pool),
        );
        assert_eq!(found.map(|p| p.name), Some("Bijan Robinson".to_string()));
    }

    #[test]
    fn fuzzy_prefers_highest_score() {
        let mut matcher = bare_matcher();
        let pool = vec![
            player("Michael Thomas", Position::WR, NflTeam::NO),
            player("Mike Thomas", Position::WR, NflTeam::CIN),
        ];
        // Misspelled query keeps the exact path from firing; fuzzy must pick
        // the closer of the two names.
        let found = matcher.find_match("Micheal Thomas", None, Some(Position::WR), Some(&pool));
        assert_eq!(found.map(|p| p.team), Some(NflTeam::NO));
    }

    #[test]
    fn fuzzy_tie_keeps_first_candidate() {
        let mut matcher = bare_matcher();
        // Two identically-named candidates at different teams, no filters:
        // identical fuzzy scores (90 each for the one-letter typo), first
        // candidate wins.
        let pool = vec![
            player("Josh Allen", Position::QB, NflTeam::BUF),
            player("Josh Allen", Position::QB, NflTeam::JAX),
        ];
        let found = matcher.find_match("Josh Alen", None, None, Some(&pool));
        assert_eq!(found.map(|p| p.team), Some(NflTeam::BUF));
    }

    // -- Cache behavior --

    #[test]
    fn cache_serves_poolless_queries_after_a_match() {
        let mut matcher = bare_matcher();
        let pool = vec![player("Justin Jefferson", Position::WR, NflTeam::MIN)];
        let first = matcher.find_match("Justin Jefferson", None, None, Some(&pool));
        assert!(first.is_some());

        // Same query without a pool now resolves from cache.
        let cached = matcher.find_match("Justin Jefferson", None, None, None);
        assert_eq!(cached.map(|p| p.name), Some("Justin Jefferson".to_string()));
    }

    #[test]
    fn cache_is_bypassed_when_candidates_supplied() {
        let mut matcher = bare_matcher();
        let pool_a = vec![player("Justin Jefferson", Position::WR, NflTeam::MIN)];
        matcher.find_match("Justin Jefferson", None, None, Some(&pool_a));

        // A different explicit pool must be searched, not short-circuited.
        let pool_b = vec![player("Justin Fields", Position::QB, NflTeam::NYJ)];
        let found = matcher.find_match("Justin Jefferson", None, None, Some(&pool_b));
        assert!(found.is_none());
    }

    // -- Merger --

    #[test]
    fn merge_keeps_first_seen_order() {
        let a = vec![
            player("CeeDee Lamb", Position::WR, NflTeam::DAL),
            player("Tyreek Hill", Position::WR, NflTeam::MIA),
        ];
        let b = vec![player("Bijan Robinson", Position::RB, NflTeam::ATL)];
        let merged = merge_player_lists(&[a, b]);
        let names: Vec<&str> = merged.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["CeeDee Lamb", "Tyreek Hill", "Bijan Robinson"]);
    }

    #[test]
    fn merge_dedups_spelling_variants_into_aliases() {
        // "CeeDee Lamb Jr." normalizes to "CeeDee Lamb", so the two records
        // share a dedup key; the raw suffix spelling lands in the aliases.
        let a = vec![player("CeeDee Lamb", Position::WR, NflTeam::DAL)];
        let b = vec![player("CeeDee Lamb Jr.", Position::WR, NflTeam::DAL)];
        let merged = merge_player_lists(&[a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "CeeDee Lamb");
        assert_eq!(merged[0].aliases, vec!["CeeDee Lamb Jr.".to_string()]);
    }

    #[test]
    fn merge_keeps_unrelated_spellings_apart() {
        // "C.D. Lamb" does not normalize to "CeeDee Lamb": the dedup key is
        // the normalized name, so these stay separate entries. Folding them
        // together is the alias table's job, not the merger's.
        let a = vec![player("CeeDee Lamb", Position::WR, NflTeam::DAL)];
        let b = vec![player("C.D. Lamb", Position::WR, NflTeam::DAL)];
        let merged = merge_player_lists(&[a, b]);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|p| p.aliases.is_empty()));
    }

    #[test]
    fn merge_distinguishes_same_name_different_team() {
        let a = vec![player("Josh Allen", Position::QB, NflTeam::BUF)];
        let b = vec![player("Josh Allen", Position::QB, NflTeam::JAX)];
        let merged = merge_player_lists(&[a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_with_itself_is_idempotent() {
        let list = vec![
            player("CeeDee Lamb", Position::WR, NflTeam::DAL),
            player("Tyreek Hill", Position::WR, NflTeam::MIA),
            player("CeeDee Lamb", Position::WR, NflTeam::DAL),
        ];
        let once = merge_player_lists(&[list.clone()]);
        let twice = merge_player_lists(&[list.clone(), list]);
        assert_eq!(once.len(), twice.len());
        // No spurious aliases: duplicate entries share the exact spelling.
        assert!(twice.iter().all(|p| p.aliases.is_empty()));
    }
}
