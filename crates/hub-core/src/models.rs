//! Data records exchanged between source adapters and the dispatcher.
//!
//! These are the normalized shapes every adapter produces regardless of
//! the upstream API it talks to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound used when a caller asks for "all" items of a listing.
pub const FULL_LISTING_LIMIT: usize = 10_000;

/// How much of a listing the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Honour the requested limit.
    Limited,
    /// Everything the backend will return.
    Full,
}

/// One game in the owner's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedGame {
    pub app_id: u32,
    pub name: String,
    /// Lifetime playtime in minutes.
    pub minutes_lifetime: u64,
    /// Playtime over the last two weeks, in minutes.
    pub minutes_recent: u64,
}

impl OwnedGame {
    /// Lifetime playtime in hours, rounded to two decimals.
    pub fn hours(&self) -> f64 {
        minutes_to_hours(self.minutes_lifetime)
    }
}

/// The owned count and the full game list, taken from one upstream read so
/// the two always agree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibrarySnapshot {
    pub owned_count: usize,
    pub games: Vec<OwnedGame>,
}

/// Convert minutes to hours rounded to two decimal places.
pub fn minutes_to_hours(minutes: u64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

/// A song from the liked-music playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikedSong {
    pub title: String,
    pub artist: String,
    pub url: Option<String>,
    /// Video id on YouTube, when the upstream reports one.
    #[serde(default)]
    pub youtube_id: Option<String>,
}

/// A repository on the code host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub url: String,
    pub stars: u64,
}

/// A commit on the code host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl CommitInfo {
    /// First line of the commit message.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_hours_rounds_to_two_places() {
        assert_eq!(minutes_to_hours(125), 2.08);
        assert_eq!(minutes_to_hours(60), 1.0);
        assert_eq!(minutes_to_hours(0), 0.0);
    }

    #[test]
    fn test_commit_headline_is_first_line() {
        let commit = CommitInfo {
            sha: "abc".to_string(),
            message: "Fix parser\n\nLonger body".to_string(),
            author: None,
            date: None,
            url: None,
        };
        assert_eq!(commit.headline(), "Fix parser");
    }
}
