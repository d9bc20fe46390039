//! Source adapter contracts.
//!
//! Each external backend (notes folder, game library, liked music, code
//! host, language model) is reached through one of the traits below. The
//! dispatcher only ever sees these traits, so tests can swap in the
//! [`memory`] implementations and production wires up the HTTP adapters.
//!
//! All operations are async (via `async-trait`) and must be `Send + Sync`
//! so they can run on spawned tasks.
//!
//! | Trait | Detail operations | Summary |
//! |-------|-------------------|---------|
//! | [`NotesSource`] | list, read | - |
//! | [`GameLibrary`] | list owned, owned count | [`crate::summary::LibrarySummarySource`] |
//! | [`LikedSongs`] | list liked | [`crate::summary::MusicSummarySource`] |
//! | [`CodeHost`] | list repos, recent commits | [`crate::summary::CommitSummarySource`] |
//! | [`LanguageModel`] | complete | - |

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{SourceKey, SourceSummary};
use crate::models::{CommitInfo, LibrarySnapshot, LikedSong, OwnedGame, RepoInfo, Scope};

/// Failure reported by a source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The caller asked for a specific resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Credentials are missing or the integration is disabled.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Timeout, network error, or an upstream error status.
    #[error("request failed: {0}")]
    Transient(String),
    /// The upstream answered with something we could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The backend could not be reached at all.
    #[error("unreachable: {0}")]
    Unreachable(String),
}

impl SourceError {
    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::NotFound(_) => "not_found",
            SourceError::Unavailable(_) => "unavailable",
            SourceError::Transient(_) => "transient",
            SourceError::Malformed(_) => "malformed",
            SourceError::Unreachable(_) => "unreachable",
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Local text notes.
#[async_trait]
pub trait NotesSource: Send + Sync {
    /// File names of all notes, sorted.
    async fn list_notes(&self) -> SourceResult<Vec<String>>;

    /// Full text of one note. Fails with [`SourceError::NotFound`] when absent.
    async fn read_note(&self, name: &str) -> SourceResult<String>;
}

/// The owner's game library.
#[async_trait]
pub trait GameLibrary: Send + Sync {
    /// Owned games in the account's enumeration order. `None` returns all.
    async fn list_owned(&self, limit: Option<usize>) -> SourceResult<Vec<OwnedGame>>;

    /// Number of owned games as reported upstream.
    async fn owned_count(&self) -> SourceResult<usize>;

    /// Count and full list together. Backends that return both in one
    /// response should override this to avoid a second request.
    async fn snapshot(&self) -> SourceResult<LibrarySnapshot> {
        let owned_count = self.owned_count().await?;
        let games = self.list_owned(None).await?;
        Ok(LibrarySnapshot { owned_count, games })
    }
}

/// The owner's liked-music playlist.
#[async_trait]
pub trait LikedSongs: Send + Sync {
    /// Liked songs, newest first. [`Scope::Full`] ignores `limit`.
    async fn list_liked(&self, limit: usize, scope: Scope) -> SourceResult<Vec<LikedSong>>;
}

/// A code-hosting service.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Public repositories of `username`, most recently updated first.
    async fn list_repos(&self, username: &str) -> SourceResult<Vec<RepoInfo>>;

    /// One page of commits for `owner/repo`. `per_page` is clamped to 1..=100.
    async fn recent_commits(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> SourceResult<Vec<CommitInfo>>;
}

/// A chat-completion language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Answer `user_text`, optionally primed with an extra system prompt.
    async fn complete(&self, system_prompt: Option<&str>, user_text: &str) -> SourceResult<String>;
}

/// A source that can contribute a short summary to the aggregated context.
///
/// `Ok(None)` means the source had nothing to say (empty data); errors mean
/// it failed. Either way the aggregator omits it from the context.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// The key this source's summary is stored under.
    fn key(&self) -> SourceKey;

    /// Fetch a lightweight summary.
    async fn summary(&self) -> SourceResult<Option<SourceSummary>>;
}

/// An integration whose credentials are missing. Every call fails with
/// [`SourceError::Unavailable`].
pub struct Unconfigured(pub &'static str);

impl Unconfigured {
    fn error<T>(&self) -> SourceResult<T> {
        Err(SourceError::Unavailable(format!("{} is not configured", self.0)))
    }
}

#[async_trait]
impl NotesSource for Unconfigured {
    async fn list_notes(&self) -> SourceResult<Vec<String>> {
        self.error()
    }

    async fn read_note(&self, _name: &str) -> SourceResult<String> {
        self.error()
    }
}

#[async_trait]
impl GameLibrary for Unconfigured {
    async fn list_owned(&self, _limit: Option<usize>) -> SourceResult<Vec<OwnedGame>> {
        self.error()
    }

    async fn owned_count(&self) -> SourceResult<usize> {
        self.error()
    }
}

#[async_trait]
impl LikedSongs for Unconfigured {
    async fn list_liked(&self, _limit: usize, _scope: Scope) -> SourceResult<Vec<LikedSong>> {
        self.error()
    }
}

#[async_trait]
impl CodeHost for Unconfigured {
    async fn list_repos(&self, _username: &str) -> SourceResult<Vec<RepoInfo>> {
        self.error()
    }

    async fn recent_commits(
        &self,
        _owner: &str,
        _repo: &str,
        _page: u32,
        _per_page: u32,
    ) -> SourceResult<Vec<CommitInfo>> {
        self.error()
    }
}

#[async_trait]
impl LanguageModel for Unconfigured {
    async fn complete(&self, _system_prompt: Option<&str>, _user_text: &str) -> SourceResult<String> {
        self.error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_reports_unavailable() {
        let library = Unconfigured("steam");
        let err = library.owned_count().await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
        assert!(err.to_string().contains("steam is not configured"));
    }
}
