//! Approximate name matching.
//!
//! Ranks a small candidate set (a personal game library, say) against a
//! free-text name. Scoring is deterministic and tiered:
//!
//! | Condition (case-insensitive, trimmed) | Score |
//! |---------------------------------------|-------|
//! | name equals query | 100 |
//! | name contains query | 80 |
//! | otherwise | 50 + distinct shared whitespace tokens |
//!
//! Ties keep the caller's input order.

use serde::Serialize;

use crate::models::OwnedGame;

pub const EXACT_SCORE: u32 = 100;
pub const SUBSTRING_SCORE: u32 = 80;
pub const OVERLAP_BASE_SCORE: u32 = 50;

/// Runner-ups reported after the best match.
pub const RUNNER_UP_LIMIT: usize = 4;

/// Anything with a display name that can be matched.
pub trait Candidate {
    fn name(&self) -> &str;
}

impl Candidate for OwnedGame {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Candidate for String {
    fn name(&self) -> &str {
        self
    }
}

impl Candidate for &str {
    fn name(&self) -> &str {
        self
    }
}

/// A candidate together with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scored<'a, T> {
    pub candidate: &'a T,
    pub score: u32,
}

/// Best match plus the next-best candidates, highest score first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult<'a, T> {
    pub best: Scored<'a, T>,
    pub runner_ups: Vec<Scored<'a, T>>,
}

/// Score one candidate name against a query.
pub fn score(query: &str, name: &str) -> u32 {
    let q = query.trim().to_lowercase();
    let n = name.trim().to_lowercase();
    if q == n {
        return EXACT_SCORE;
    }
    if n.contains(q.as_str()) {
        return SUBSTRING_SCORE;
    }
    OVERLAP_BASE_SCORE + shared_tokens(&q, &n)
}

/// Count distinct whitespace tokens of `q` that also occur in `n`.
fn shared_tokens(q: &str, n: &str) -> u32 {
    let mut shared = 0;
    for (i, token) in q.split_whitespace().enumerate() {
        let repeated = q.split_whitespace().take(i).any(|earlier| earlier == token);
        if !repeated && n.split_whitespace().any(|t| t == token) {
            shared += 1;
        }
    }
    shared
}

/// Rank `candidates` against `query`. Returns `None` for an empty set.
pub fn rank<'a, T: Candidate>(query: &str, candidates: &'a [T]) -> Option<MatchResult<'a, T>> {
    let mut scored: Vec<Scored<'a, T>> = candidates
        .iter()
        .map(|candidate| Scored {
            candidate,
            score: score(query, candidate.name()),
        })
        .collect();
    // sort_by is stable, so equal scores keep input order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    let mut ranked = scored.into_iter();
    let best = ranked.next()?;
    Some(MatchResult {
        best,
        runner_ups: ranked.take(RUNNER_UP_LIMIT).collect(),
    })
}
