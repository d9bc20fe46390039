//! [`ContextSource`] implementations over the source traits.
//!
//! Each wraps one detail adapter and reduces its data to the bounded
//! summary shape stored in a [`SourceContext`](crate::context::SourceContext).

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{
    CommitBrief, CommitSummary, GameBrief, LibrarySummary, LikedSummary, SourceKey, SourceSummary,
};
use crate::models::{OwnedGame, Scope};
use crate::source::{CodeHost, ContextSource, GameLibrary, LikedSongs, SourceResult};

pub const DEFAULT_TOP_GAMES: usize = 25;
pub const DEFAULT_SUMMARY_SONGS: usize = 10;
pub const DEFAULT_SUMMARY_COMMITS: u32 = 10;

/// Owned count plus the most-played games.
pub struct LibrarySummarySource {
    library: Arc<dyn GameLibrary>,
    top_n: usize,
}

impl LibrarySummarySource {
    pub fn new(library: Arc<dyn GameLibrary>) -> Self {
        Self {
            library,
            top_n: DEFAULT_TOP_GAMES,
        }
    }
}

/// Order by lifetime playtime, longest first. Ties keep library order.
pub fn summarize_library(owned_count: usize, mut games: Vec<OwnedGame>, top_n: usize) -> LibrarySummary {
    games.sort_by(|a, b| b.minutes_lifetime.cmp(&a.minutes_lifetime));
    LibrarySummary {
        owned_count,
        top_games: games
            .into_iter()
            .take(top_n)
            .map(|g| GameBrief {
                name: g.name,
                appid: g.app_id,
                min: g.minutes_lifetime,
            })
            .collect(),
    }
}

#[async_trait]
impl ContextSource for LibrarySummarySource {
    fn key(&self) -> SourceKey {
        SourceKey::Steam
    }

    async fn summary(&self) -> SourceResult<Option<SourceSummary>> {
        let snapshot = self.library.snapshot().await?;
        if snapshot.games.is_empty() {
            return Ok(None);
        }
        Ok(Some(SourceSummary::Library(summarize_library(
            snapshot.owned_count,
            snapshot.games,
            self.top_n,
        ))))
    }
}

/// The newest liked songs.
pub struct MusicSummarySource {
    songs: Arc<dyn LikedSongs>,
    limit: usize,
}

impl MusicSummarySource {
    pub fn new(songs: Arc<dyn LikedSongs>) -> Self {
        Self {
            songs,
            limit: DEFAULT_SUMMARY_SONGS,
        }
    }
}

#[async_trait]
impl ContextSource for MusicSummarySource {
    fn key(&self) -> SourceKey {
        SourceKey::Ytmusic
    }

    async fn summary(&self) -> SourceResult<Option<SourceSummary>> {
        let liked_songs = self.songs.list_liked(self.limit, Scope::Limited).await?;
        if liked_songs.is_empty() {
            return Ok(None);
        }
        Ok(Some(SourceSummary::LikedSongs(LikedSummary { liked_songs })))
    }
}

/// Recent commits on one configured repository.
pub struct CommitSummarySource {
    host: Arc<dyn CodeHost>,
    owner: String,
    repo: String,
    limit: u32,
}

impl CommitSummarySource {
    pub fn new(host: Arc<dyn CodeHost>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            host,
            owner: owner.into(),
            repo: repo.into(),
            limit: DEFAULT_SUMMARY_COMMITS,
        }
    }
}

#[async_trait]
impl ContextSource for CommitSummarySource {
    fn key(&self) -> SourceKey {
        SourceKey::Github
    }

    async fn summary(&self) -> SourceResult<Option<SourceSummary>> {
        let commits = self
            .host
            .recent_commits(&self.owner, &self.repo, 1, self.limit)
            .await?;
        if commits.is_empty() {
            return Ok(None);
        }
        Ok(Some(SourceSummary::Commits(CommitSummary {
            repo: format!("{}/{}", self.owner, self.repo),
            recent_commits: commits
                .into_iter()
                .map(|c| CommitBrief {
                    sha: c.sha,
                    msg: c.message,
                })
                .collect(),
        })))
    }
}
