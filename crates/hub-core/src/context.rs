//! Aggregated source context and its briefing text.
//!
//! A [`SourceContext`] is the keyed result of fanning out to every
//! configured [`ContextSource`](crate::source::ContextSource). Keys are
//! only present for sources that answered with data. The briefing is the
//! flattened one-line form handed to the language model:
//!
//! ```text
//! Steam: owned_count=3 top_games=Dota 2, Portal 2 | YT Music liked: Song A | GitHub me/app recent commits: Fix parser
//! ```
//!
//! Segments are always rendered in [`SourceKey`] declaration order,
//! independent of the order in which sources finished.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::LikedSong;

/// Longest commit headline kept in a briefing.
pub const BRIEFING_HEADLINE_CHARS: usize = 80;

/// Prefix of the system prompt built from a briefing.
pub const CONTEXT_PROMPT_PREFIX: &str = "Context: ";

/// Identifies one context source. `Ord` follows declaration order, which is
/// also the briefing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKey {
    Steam,
    Ytmusic,
    Github,
}

impl SourceKey {
    pub const ALL: [SourceKey; 3] = [SourceKey::Steam, SourceKey::Ytmusic, SourceKey::Github];

    /// Config and JSON name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::Steam => "steam",
            SourceKey::Ytmusic => "ytmusic",
            SourceKey::Github => "github",
        }
    }

    /// Human label used in the briefing.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKey::Steam => "Steam",
            SourceKey::Ytmusic => "YT Music",
            SourceKey::Github => "GitHub",
        }
    }

    pub fn parse(name: &str) -> Option<SourceKey> {
        SourceKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameBrief {
    pub name: String,
    pub appid: u32,
    /// Lifetime playtime in minutes.
    pub min: u64,
}

/// Library summary: total count plus the most-played games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub owned_count: usize,
    pub top_games: Vec<GameBrief>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikedSummary {
    pub liked_songs: Vec<LikedSong>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitBrief {
    pub sha: String,
    pub msg: String,
}

/// Recent activity on one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// `owner/repo`.
    pub repo: String,
    pub recent_commits: Vec<CommitBrief>,
}

/// One source's contribution to the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSummary {
    Library(LibrarySummary),
    LikedSongs(LikedSummary),
    Commits(CommitSummary),
}

impl SourceSummary {
    /// True when the summary carries no data worth reporting.
    pub fn is_empty(&self) -> bool {
        match self {
            SourceSummary::Library(s) => s.owned_count == 0 && s.top_games.is_empty(),
            SourceSummary::LikedSongs(s) => s.liked_songs.is_empty(),
            SourceSummary::Commits(s) => s.recent_commits.is_empty(),
        }
    }

    /// The short fields of this summary, without the label.
    fn fields(&self) -> String {
        match self {
            SourceSummary::Library(s) => format!(
                "owned_count={} top_games={}",
                s.owned_count,
                s.top_games
                    .iter()
                    .map(|g| g.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            SourceSummary::LikedSongs(s) => s
                .liked_songs
                .iter()
                .map(|song| song.title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            SourceSummary::Commits(s) => s
                .recent_commits
                .iter()
                .map(|c| truncate_chars(c.msg.lines().next().unwrap_or(""), BRIEFING_HEADLINE_CHARS))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    /// Render the labeled briefing segment for `key`.
    pub fn segment(&self, key: SourceKey) -> String {
        match (key, self) {
            (SourceKey::Github, SourceSummary::Commits(s)) => {
                format!("{} {} recent commits: {}", key.label(), s.repo, self.fields())
            }
            (SourceKey::Ytmusic, _) => format!("{} liked: {}", key.label(), self.fields()),
            _ => format!("{}: {}", key.label(), self.fields()),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Keyed summaries gathered for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceContext {
    entries: BTreeMap<SourceKey, SourceSummary>,
}

impl SourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a summary. Empty summaries are dropped so a key is only ever
    /// present with data behind it.
    pub fn insert(&mut self, key: SourceKey, summary: SourceSummary) -> bool {
        if summary.is_empty() {
            return false;
        }
        self.entries.insert(key, summary);
        true
    }

    pub fn get(&self, key: SourceKey) -> Option<&SourceSummary> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Present keys in briefing order.
    pub fn keys(&self) -> impl Iterator<Item = SourceKey> + '_ {
        self.entries.keys().copied()
    }

    /// Flattened briefing. Empty when no source contributed.
    pub fn briefing(&self) -> String {
        self.entries
            .iter()
            .map(|(key, summary)| summary.segment(*key))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// System prompt carrying the briefing, or `None` when there is nothing
    /// to say.
    pub fn system_prompt(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("{}{}", CONTEXT_PROMPT_PREFIX, self.briefing()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> SourceSummary {
        SourceSummary::Library(LibrarySummary {
            owned_count: 3,
            top_games: vec![
                GameBrief {
                    name: "Dota 2".into(),
                    appid: 570,
                    min: 900,
                },
                GameBrief {
                    name: "Portal 2".into(),
                    appid: 620,
                    min: 125,
                },
            ],
        })
    }

    fn songs() -> SourceSummary {
        SourceSummary::LikedSongs(LikedSummary {
            liked_songs: vec![
                LikedSong {
                    title: "Song A".into(),
                    artist: "Artist".into(),
                    url: None,
                    youtube_id: None,
                },
                LikedSong {
                    title: "Song B".into(),
                    artist: "Artist".into(),
                    url: None,
                    youtube_id: None,
                },
            ],
        })
    }

    fn commits(msgs: &[&str]) -> SourceSummary {
        SourceSummary::Commits(CommitSummary {
            repo: "me/app".into(),
            recent_commits: msgs
                .iter()
                .enumerate()
                .map(|(i, m)| CommitBrief {
                    sha: format!("sha{}", i),
                    msg: m.to_string(),
                })
                .collect(),
        })
    }

    #[test]
    fn test_briefing_follows_declared_order() {
        let mut ctx = SourceContext::new();
        ctx.insert(SourceKey::Github, commits(&["Fix parser\n\nbody", "Add tests"]));
        ctx.insert(SourceKey::Steam, library());
        ctx.insert(SourceKey::Ytmusic, songs());

        assert_eq!(
            ctx.briefing(),
            "Steam: owned_count=3 top_games=Dota 2, Portal 2 | \
             YT Music liked: Song A, Song B | \
             GitHub me/app recent commits: Fix parser; Add tests"
        );
        assert_eq!(
            ctx.keys().collect::<Vec<_>>(),
            vec![SourceKey::Steam, SourceKey::Ytmusic, SourceKey::Github]
        );
    }

    #[test]
    fn test_briefing_skips_absent_sources() {
        let mut ctx = SourceContext::new();
        ctx.insert(SourceKey::Github, commits(&["One"]));
        ctx.insert(SourceKey::Steam, library());
        let briefing = ctx.briefing();
        assert_eq!(briefing.split(" | ").count(), 2);
        assert!(!briefing.contains("YT Music"));
    }

    #[test]
    fn test_empty_context_has_no_prompt() {
        let ctx = SourceContext::new();
        assert_eq!(ctx.briefing(), "");
        assert!(ctx.system_prompt().is_none());
    }

    #[test]
    fn test_system_prompt_is_prefixed() {
        let mut ctx = SourceContext::new();
        ctx.insert(SourceKey::Ytmusic, songs());
        assert_eq!(
            ctx.system_prompt().unwrap(),
            "Context: YT Music liked: Song A, Song B"
        );
    }

    #[test]
    fn test_empty_summary_is_not_inserted() {
        let mut ctx = SourceContext::new();
        let inserted = ctx.insert(
            SourceKey::Ytmusic,
            SourceSummary::LikedSongs(LikedSummary {
                liked_songs: vec![],
            }),
        );
        assert!(!inserted);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_commit_headlines_truncated() {
        let long = "é".repeat(100);
        let mut ctx = SourceContext::new();
        ctx.insert(SourceKey::Github, commits(&[&long]));
        let briefing = ctx.briefing();
        let headline = briefing.rsplit(": ").next().unwrap();
        assert_eq!(headline.chars().count(), BRIEFING_HEADLINE_CHARS);
    }

    #[test]
    fn test_context_serializes_keyed() {
        let mut ctx = SourceContext::new();
        ctx.insert(SourceKey::Steam, library());
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["steam"]["owned_count"], 3);
        assert_eq!(json["steam"]["top_games"][0]["appid"], 570);
        assert!(json.get("ytmusic").is_none());
    }

    #[test]
    fn test_source_key_parse() {
        assert_eq!(SourceKey::parse(" GitHub "), Some(SourceKey::Github));
        assert_eq!(SourceKey::parse("spotify"), None);
    }
}
