//! Query dispatch.
//!
//! [`Assistant::answer`] walks one query through a fixed sequence:
//!
//! ```text
//! Received ─▶ Classified ─┬─▶ DirectAnswered                       (intent matched)
//!                         └─▶ Aggregating ─▶ Delegated ─▶ Responded (no intent)
//! ```
//!
//! A matched intent is answered by its handler straight from the source
//! adapters. Anything else is handed to the language model together with
//! the aggregated briefing. When the model cannot be reached the caller
//! still gets a success-shaped [`Answer`]: the query echoed back plus a
//! warning and the underlying error.
//!
//! The only errors [`Assistant::answer`] returns are an empty query and a
//! direct handler whose specific resource could not be produced (a missing
//! note, an unconfigured integration).

use std::sync::Arc;
use std::time::Duration;

use hub_core::context::{SourceContext, SourceKey};
use hub_core::intent::{self, Intent};
use hub_core::matcher::{self, MatchResult};
use hub_core::models::{minutes_to_hours, OwnedGame, Scope, FULL_LISTING_LIMIT};
use hub_core::source::{
    CodeHost, ContextSource, GameLibrary, LanguageModel, LikedSongs, NotesSource, SourceError,
    Unconfigured,
};
use hub_core::summary::{CommitSummarySource, LibrarySummarySource, MusicSummarySource};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::github::GithubHost;
use crate::llm::ChatModel;
use crate::notes::FsNotes;
use crate::steam::SteamLibrary;
use crate::ytmusic::YtMusicLikes;

pub const FALLBACK_WARNING: &str = "Language model not reachable; returning fallback response.";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("{handler}: {source}")]
    Source {
        handler: &'static str,
        #[source]
        source: SourceError,
    },
}

fn failed(handler: &'static str) -> impl FnOnce(SourceError) -> DispatchError {
    move |source| DispatchError::Source { handler, source }
}

/// Dispatcher states, logged as a query moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Classified,
    DirectAnswered,
    Aggregating,
    Delegated,
    Responded,
}

/// The response to one query. `answer` is text for most intents and a list
/// for listing intents.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SourceContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Answer {
    fn direct(answer: Value) -> Self {
        Self {
            answer,
            details: None,
            context: None,
            warning: None,
            error: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

/// The detail adapters a dispatcher talks to.
pub struct Adapters {
    pub notes: Arc<dyn NotesSource>,
    pub library: Arc<dyn GameLibrary>,
    pub songs: Arc<dyn LikedSongs>,
    pub host: Arc<dyn CodeHost>,
    pub model: Arc<dyn LanguageModel>,
}

impl Adapters {
    /// Every adapter unconfigured. Callers replace the fields they have.
    pub fn unconfigured() -> Self {
        Self {
            notes: Arc::new(Unconfigured("notes")),
            library: Arc::new(Unconfigured("steam")),
            songs: Arc::new(Unconfigured("ytmusic")),
            host: Arc::new(Unconfigured("github")),
            model: Arc::new(Unconfigured("language model")),
        }
    }
}

pub struct Assistant {
    adapters: Adapters,
    aggregator: Aggregator,
}

impl Assistant {
    pub fn new(adapters: Adapters, aggregator: Aggregator) -> Self {
        Self {
            adapters,
            aggregator,
        }
    }

    /// Build every adapter from configuration. Integrations without
    /// credentials are wired as unconfigured and left out of the context.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut adapters = Adapters::unconfigured();
        adapters.notes = Arc::new(FsNotes::from_config(&config.notes)?);

        let steam_ready = match SteamLibrary::from_config(&config.steam)? {
            Some(steam) => {
                adapters.library = Arc::new(steam);
                true
            }
            None => false,
        };
        // Bad music headers disable the integration instead of failing startup.
        let songs_ready = match YtMusicLikes::from_config(&config.ytmusic) {
            Ok(Some(likes)) => {
                adapters.songs = Arc::new(likes);
                true
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "YT Music headers unusable; integration disabled");
                false
            }
        };
        adapters.host = Arc::new(GithubHost::from_config(&config.github)?);
        adapters.model = Arc::new(ChatModel::from_config(&config.llm)?);

        let mut aggregator = Aggregator::new(Duration::from_secs(config.aggregator.timeout_secs));
        for key in config.aggregator.source_keys() {
            let source: Option<Arc<dyn ContextSource>> = match key {
                SourceKey::Steam if steam_ready => Some(Arc::new(
                    LibrarySummarySource::new(adapters.library.clone()),
                )),
                SourceKey::Ytmusic if songs_ready => Some(Arc::new(
                    MusicSummarySource::new(adapters.songs.clone()),
                )),
                SourceKey::Github => config.github.summary_repo().map(|(owner, repo)| {
                    Arc::new(CommitSummarySource::new(adapters.host.clone(), owner, repo))
                        as Arc<dyn ContextSource>
                }),
                _ => None,
            };
            match source {
                Some(source) => aggregator.register(source),
                None => tracing::debug!(source = %key, "context source not configured; skipped"),
            }
        }

        Ok(Self::new(adapters, aggregator))
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Answer one query.
    pub async fn answer(&self, query: &str) -> Result<Answer, DispatchError> {
        let span = tracing::info_span!("answer", request_id = %Uuid::new_v4());
        self.answer_inner(query).instrument(span).await
    }

    async fn answer_inner(&self, query: &str) -> Result<Answer, DispatchError> {
        let query = query.trim();
        tracing::debug!(stage = ?Stage::Received, chars = query.chars().count());
        if query.is_empty() {
            return Err(DispatchError::EmptyQuery);
        }

        let classified = intent::classify_with_rule(query);
        let intent = match classified {
            Some((rule, intent)) => {
                tracing::debug!(stage = ?Stage::Classified, rule, intent = ?intent);
                intent
            }
            None => {
                tracing::debug!(stage = ?Stage::Classified, "no rule matched");
                Intent::None
            }
        };

        if let Some(answer) = self.handle(intent).await? {
            tracing::debug!(stage = ?Stage::DirectAnswered);
            return Ok(answer);
        }

        tracing::debug!(stage = ?Stage::Aggregating, sources = self.aggregator.len());
        let context = self.aggregator.gather(query).await;

        tracing::debug!(stage = ?Stage::Delegated, context_sources = context.len());
        let prompt = context.system_prompt();
        match self.adapters.model.complete(prompt.as_deref(), query).await {
            Ok(reply) => Ok(Answer {
                context: Some(context),
                ..Answer::direct(Value::String(reply))
            }),
            Err(err) => {
                tracing::warn!(stage = ?Stage::Responded, kind = err.kind(), error = %err, "language model failed; answering with fallback");
                Ok(Answer {
                    answer: Value::String(format!("You asked: '{}'.", query)),
                    details: None,
                    context: Some(context),
                    warning: Some(FALLBACK_WARNING.to_string()),
                    error: Some(err.to_string()),
                })
            }
        }
    }

    /// Run the direct handler for `intent`. `None` means the intent has no
    /// handler and the query goes to the language model.
    async fn handle(&self, intent: Intent) -> Result<Option<Answer>, DispatchError> {
        let a = &self.adapters;
        let answer = match intent {
            Intent::ListNotes => {
                let names = a.notes.list_notes().await.map_err(failed("list_notes"))?;
                Ok(Answer::direct(json!(names)))
            }
            Intent::ReadNote { name } => {
                let text = a
                    .notes
                    .read_note(&name)
                    .await
                    .map_err(failed("read_note"))?;
                Ok(Answer::direct(Value::String(text)))
            }
            Intent::PlaytimeLookup { entity } => self.playtime(&entity).await,
            Intent::ListLikedSongs { limit, scope } => {
                let songs = a
                    .songs
                    .list_liked(limit, scope)
                    .await
                    .map_err(failed("liked_songs"))?;
                Ok(Answer::direct(json!(songs)))
            }
            Intent::ListOwnedGames { limit, scope } => {
                let limit = match scope {
                    Scope::Limited => limit,
                    Scope::Full => FULL_LISTING_LIMIT,
                };
                let games = a
                    .library
                    .list_owned(Some(limit))
                    .await
                    .map_err(failed("owned_games"))?;
                Ok(Answer::direct(Value::Array(games.iter().map(game_json).collect())))
            }
            Intent::AppUserDetails { app_ids } => {
                let games = a
                    .library
                    .list_owned(None)
                    .await
                    .map_err(failed("app_details"))?;
                Ok(Answer::direct(app_details(&games, &app_ids)))
            }
            Intent::OwnedGameCount => {
                let count = a
                    .library
                    .owned_count()
                    .await
                    .map_err(failed("owned_count"))?;
                Ok(Answer::direct(Value::String(format!(
                    "You own {} games on Steam.",
                    count
                ))))
            }
            Intent::RepoList { username } => {
                let repos = a
                    .host
                    .list_repos(&username)
                    .await
                    .map_err(failed("repo_list"))?;
                Ok(Answer::direct(json!(repos)))
            }
            Intent::None => return Ok(None),
        };
        answer.map(Some)
    }

    async fn playtime(&self, entity: &str) -> Result<Answer, DispatchError> {
        let games = self
            .adapters
            .library
            .list_owned(None)
            .await
            .map_err(failed("playtime"))?;

        let Some(result) = matcher::rank(entity, &games) else {
            return Ok(Answer::direct(Value::String(format!(
                "I couldn't find a game matching '{}' in your library.",
                entity
            ))));
        };

        let best = result.best.candidate;
        Ok(Answer {
            details: Some(playtime_details(&result)),
            ..Answer::direct(Value::String(format!(
                "You played {} for {} hours ({} minutes).",
                best.name,
                minutes_to_hours(best.minutes_lifetime),
                best.minutes_lifetime
            )))
        })
    }
}

fn playtime_details(result: &MatchResult<'_, OwnedGame>) -> Value {
    let best = result.best.candidate;
    json!({
        "best_match": {
            "name": best.name,
            "minutes": best.minutes_lifetime,
            "hours": best.hours(),
        },
        "score": result.best.score,
        "others": result
            .runner_ups
            .iter()
            .map(|r| json!({
                "name": r.candidate.name,
                "minutes": r.candidate.minutes_lifetime,
                "hours": r.candidate.hours(),
                "score": r.score,
            }))
            .collect::<Vec<_>>(),
    })
}

/// JSON shape of one owned game in listings.
pub fn game_json(game: &OwnedGame) -> Value {
    json!({
        "appid": game.app_id,
        "name": game.name,
        "minutes": game.minutes_lifetime,
        "hours": game.hours(),
        "minutes_recent": game.minutes_recent,
    })
}

/// Per-id playtime for the owned games among `app_ids`, plus the ids the
/// account does not own.
fn app_details(games: &[OwnedGame], app_ids: &[u32]) -> Value {
    let mut found = Vec::new();
    let mut not_owned = Vec::new();
    for id in app_ids {
        match games.iter().find(|g| g.app_id == *id) {
            Some(game) => found.push(game_json(game)),
            None => not_owned.push(*id),
        }
    }
    json!({ "games": found, "not_owned": not_owned })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(app_id: u32, name: &str, minutes: u64) -> OwnedGame {
        OwnedGame {
            app_id,
            name: name.to_string(),
            minutes_lifetime: minutes,
            minutes_recent: 0,
        }
    }

    #[test]
    fn test_app_details_splits_owned_and_missing() {
        let games = vec![game(570, "Dota 2", 900), game(620, "Portal 2", 125)];
        let value = app_details(&games, &[620, 999]);
        assert_eq!(value["games"][0]["name"], "Portal 2");
        assert_eq!(value["games"][0]["hours"], 2.08);
        assert_eq!(value["not_owned"], json!([999]));
    }

    #[test]
    fn test_answer_skips_empty_fields() {
        let json = serde_json::to_value(Answer::direct(json!(["a.txt"]))).unwrap();
        assert_eq!(json, json!({"answer": ["a.txt"]}));
    }

    #[tokio::test]
    async fn test_empty_query_is_client_error() {
        let assistant = Assistant::new(
            Adapters::unconfigured(),
            Aggregator::new(Duration::from_secs(1)),
        );
        assert!(matches!(
            assistant.answer("   ").await,
            Err(DispatchError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_direct_handler_errors() {
        let assistant = Assistant::new(
            Adapters::unconfigured(),
            Aggregator::new(Duration::from_secs(1)),
        );
        let err = assistant.answer("how many games do I have").await.unwrap_err();
        match err {
            DispatchError::Source { handler, source } => {
                assert_eq!(handler, "owned_count");
                assert_eq!(source.kind(), "unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
