//! Rule-based intent classification.
//!
//! Queries are routed without a language model. Each rule is a plain
//! pattern check over the normalized query; [`RULES`] is evaluated top to
//! bottom and the first rule that matches decides the [`Intent`]. Several
//! rules overlap textually (a query can mention both "steam" and "liked
//! song"), so the table order is the precedence contract.
//!
//! # Rule Order
//!
//! | # | Rule | Intent |
//! |---|------|--------|
//! | 1 | `list_notes` | "list" + "note" |
//! | 2 | `read_note` | `(open\|read\|fetch) <name>.txt` |
//! | 3 | `playtime` | `how many/much hours/time ... for/in/on <game>` |
//! | 4 | `liked_songs` | "liked" + ("song" or a music-service keyword) |
//! | 5 | `owned_games` | "steam" + ("games" or "list") |
//! | 6 | `app_details` | "user details" + "appid" + 3–7 digit ids |
//! | 7 | `owned_count` | "how many" + "game", or "games do i own" |
//! | 8 | `repo_list` | `github repos\|repositories [for] <handle or URL>` |
//!
//! Matching runs on a lower-cased, whitespace-collapsed copy of the query.
//! Free-text captures (note names, game names, usernames) are taken from the
//! whitespace-collapsed original so their case survives.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{Scope, FULL_LISTING_LIMIT};

/// Default number of liked songs when the query gives no "top N".
pub const DEFAULT_SONG_LIMIT: usize = 5;
/// Default number of owned games when the query gives no "top N".
pub const DEFAULT_GAME_LIMIT: usize = 25;

const MUSIC_KEYWORDS: &[&str] = &["youtube music", "yt music", "ytm"];

static READ_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:open|read|fetch)\s+([\w.-]+\.txt)").expect("read-note pattern is valid")
});

static PLAYTIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)how (?:many|much) (?:hours|time).*(?:for|in|on)\s+(.+)$")
        .expect("playtime pattern is valid")
});

static LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:first|top)\s+(\d+)").expect("limit pattern is valid"));

static APP_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3,7}\b").expect("app id pattern is valid"));

static REPO_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)github\s+(?:repos|repositories)\s+(?:for\s+)?(?:https?://(?:www\.)?github\.com/([\w-]+)|@?([\w-]+))",
    )
    .expect("repo-list pattern is valid")
});

/// The classified purpose of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    ListNotes,
    ReadNote { name: String },
    PlaytimeLookup { entity: String },
    ListLikedSongs { limit: usize, scope: Scope },
    ListOwnedGames { limit: usize, scope: Scope },
    AppUserDetails { app_ids: Vec<u32> },
    OwnedGameCount,
    RepoList { username: String },
    /// No rule matched; the query goes to the language model.
    None,
}

impl Intent {
    /// Whether a direct handler exists for this intent.
    pub fn is_direct(&self) -> bool {
        !matches!(self, Intent::None)
    }
}

/// A query prepared for rule matching.
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    original: String,
    folded: String,
}

impl NormalizedQuery {
    pub fn new(raw: &str) -> Self {
        let original = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let folded = original.to_lowercase();
        Self { original, folded }
    }

    /// Whitespace-collapsed query with its original case.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Lower-cased, whitespace-collapsed query.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    fn contains(&self, needle: &str) -> bool {
        self.folded.contains(needle)
    }

    fn has_word(&self, word: &str) -> bool {
        self.folded
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| w == word)
    }

    fn scope(&self) -> Scope {
        if self.has_word("all") || self.has_word("everything") {
            Scope::Full
        } else {
            Scope::Limited
        }
    }

    /// Limit from a "first N" / "top N" phrase, clamped to
    /// `1..=FULL_LISTING_LIMIT`. Unparseable numbers yield `default`.
    fn limit(&self, default: usize) -> usize {
        LIMIT
            .captures(&self.folded)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .map(|n| n.clamp(1, FULL_LISTING_LIMIT))
            .unwrap_or(default)
    }
}

/// One entry of the precedence table.
pub struct Rule {
    /// Stable rule name, used in logs.
    pub name: &'static str,
    matcher: fn(&NormalizedQuery) -> Option<Intent>,
}

impl Rule {
    /// Apply this rule alone.
    pub fn apply(&self, query: &NormalizedQuery) -> Option<Intent> {
        (self.matcher)(query)
    }
}

/// Classification rules in precedence order.
pub static RULES: &[Rule] = &[
    Rule { name: "list_notes", matcher: list_notes },
    Rule { name: "read_note", matcher: read_note },
    Rule { name: "playtime", matcher: playtime },
    Rule { name: "liked_songs", matcher: liked_songs },
    Rule { name: "owned_games", matcher: owned_games },
    Rule { name: "app_details", matcher: app_details },
    Rule { name: "owned_count", matcher: owned_count },
    Rule { name: "repo_list", matcher: repo_list },
];

/// Classify a raw query. Never fails; unmatched queries yield [`Intent::None`].
pub fn classify(query: &str) -> Intent {
    classify_with_rule(query)
        .map(|(_, intent)| intent)
        .unwrap_or(Intent::None)
}

/// Classify a raw query and report which rule matched.
pub fn classify_with_rule(query: &str) -> Option<(&'static str, Intent)> {
    let query = NormalizedQuery::new(query);
    let matched = RULES
        .iter()
        .find_map(|rule| rule.apply(&query).map(|intent| (rule.name, intent)));
    match &matched {
        Some((rule, _)) => tracing::trace!(rule, "intent rule matched"),
        None => tracing::trace!("no intent rule matched"),
    }
    matched
}

fn list_notes(q: &NormalizedQuery) -> Option<Intent> {
    (q.contains("list") && q.contains("note")).then_some(Intent::ListNotes)
}

fn read_note(q: &NormalizedQuery) -> Option<Intent> {
    let caps = READ_NOTE.captures(q.original())?;
    Some(Intent::ReadNote {
        name: caps.get(1)?.as_str().to_string(),
    })
}

fn playtime(q: &NormalizedQuery) -> Option<Intent> {
    let caps = PLAYTIME.captures(q.original())?;
    let entity = trim_entity(caps.get(1)?.as_str());
    if entity.is_empty() {
        return None;
    }
    Some(Intent::PlaytimeLookup {
        entity: entity.to_string(),
    })
}

fn liked_songs(q: &NormalizedQuery) -> Option<Intent> {
    let music = q.contains("song") || MUSIC_KEYWORDS.iter().any(|k| q.contains(k));
    (q.contains("liked") && music).then(|| Intent::ListLikedSongs {
        limit: q.limit(DEFAULT_SONG_LIMIT),
        scope: q.scope(),
    })
}

fn owned_games(q: &NormalizedQuery) -> Option<Intent> {
    (q.contains("steam") && (q.contains("games") || q.contains("list"))).then(|| {
        Intent::ListOwnedGames {
            limit: q.limit(DEFAULT_GAME_LIMIT),
            scope: q.scope(),
        }
    })
}

fn app_details(q: &NormalizedQuery) -> Option<Intent> {
    if !(q.contains("user details") && q.contains("appid")) {
        return None;
    }
    let mut app_ids: Vec<u32> = Vec::new();
    for m in APP_ID.find_iter(q.folded()) {
        if let Ok(id) = m.as_str().parse::<u32>() {
            if !app_ids.contains(&id) {
                app_ids.push(id);
            }
        }
    }
    // Without any id the rule does not apply and later rules get a chance.
    (!app_ids.is_empty()).then_some(Intent::AppUserDetails { app_ids })
}

fn owned_count(q: &NormalizedQuery) -> Option<Intent> {
    ((q.contains("how many") && q.contains("game")) || q.contains("games do i own"))
        .then_some(Intent::OwnedGameCount)
}

fn repo_list(q: &NormalizedQuery) -> Option<Intent> {
    let caps = REPO_LIST.captures(q.original())?;
    let username = match (caps.get(1), caps.get(2)) {
        (Some(from_url), _) => from_url.as_str(),
        (None, Some(handle)) => {
            // "for" with nothing after it, or a URL scheme with no user path.
            let scheme = q.original()[handle.end()..].starts_with(':');
            if scheme || handle.as_str().eq_ignore_ascii_case("for") {
                return None;
            }
            handle.as_str()
        }
        (None, None) => return None,
    };
    Some(Intent::RepoList {
        username: username.to_string(),
    })
}

/// Strip surrounding whitespace and sentence punctuation from a captured name.
fn trim_entity(raw: &str) -> &str {
    raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '?' | '!' | '.' | ',' | ';' | ':' | '"' | '\'')
    })
}
