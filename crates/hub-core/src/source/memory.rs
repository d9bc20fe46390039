//! In-memory source adapters for testing.
//!
//! Every adapter here answers from data handed to its constructor, so the
//! dispatcher and aggregator can be exercised without network access.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{CommitInfo, LikedSong, OwnedGame, RepoInfo, Scope};

use super::{CodeHost, GameLibrary, LanguageModel, LikedSongs, NotesSource, SourceError, SourceResult};

/// Notes held as `(name, content)` pairs.
pub struct MemoryNotes {
    notes: Vec<(String, String)>,
}

impl MemoryNotes {
    pub fn new(notes: Vec<(String, String)>) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl NotesSource for MemoryNotes {
    async fn list_notes(&self) -> SourceResult<Vec<String>> {
        let mut names: Vec<String> = self.notes.iter().map(|(name, _)| name.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn read_note(&self, name: &str) -> SourceResult<String> {
        self.notes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }
}

/// A fixed game library.
pub struct MemoryLibrary {
    games: Vec<OwnedGame>,
}

impl MemoryLibrary {
    pub fn new(games: Vec<OwnedGame>) -> Self {
        Self { games }
    }
}

#[async_trait]
impl GameLibrary for MemoryLibrary {
    async fn list_owned(&self, limit: Option<usize>) -> SourceResult<Vec<OwnedGame>> {
        let take = limit.unwrap_or(self.games.len());
        Ok(self.games.iter().take(take).cloned().collect())
    }

    async fn owned_count(&self) -> SourceResult<usize> {
        Ok(self.games.len())
    }
}

/// A fixed liked-songs playlist.
pub struct MemorySongs {
    songs: Vec<LikedSong>,
}

impl MemorySongs {
    pub fn new(songs: Vec<LikedSong>) -> Self {
        Self { songs }
    }
}

#[async_trait]
impl LikedSongs for MemorySongs {
    async fn list_liked(&self, limit: usize, scope: Scope) -> SourceResult<Vec<LikedSong>> {
        let take = match scope {
            Scope::Limited => limit,
            Scope::Full => self.songs.len(),
        };
        Ok(self.songs.iter().take(take).cloned().collect())
    }
}

/// A code host with repositories keyed by owner and commits keyed by `owner/repo`.
pub struct MemoryCodeHost {
    repos: Vec<(String, RepoInfo)>,
    commits: Vec<(String, CommitInfo)>,
}

impl MemoryCodeHost {
    pub fn new(repos: Vec<(String, RepoInfo)>, commits: Vec<(String, CommitInfo)>) -> Self {
        Self { repos, commits }
    }
}

#[async_trait]
impl CodeHost for MemoryCodeHost {
    async fn list_repos(&self, username: &str) -> SourceResult<Vec<RepoInfo>> {
        let repos: Vec<RepoInfo> = self
            .repos
            .iter()
            .filter(|(owner, _)| owner.eq_ignore_ascii_case(username))
            .map(|(_, repo)| repo.clone())
            .collect();
        if repos.is_empty() {
            return Err(SourceError::NotFound(format!("user {}", username)));
        }
        Ok(repos)
    }

    async fn recent_commits(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> SourceResult<Vec<CommitInfo>> {
        let full_name = format!("{}/{}", owner, repo);
        let per_page = per_page.clamp(1, 100) as usize;
        let skip = (page.max(1) as usize - 1) * per_page;
        Ok(self
            .commits
            .iter()
            .filter(|(name, _)| *name == full_name)
            .map(|(_, commit)| commit.clone())
            .skip(skip)
            .take(per_page)
            .collect())
    }
}

/// A language model that replays a fixed reply and records every prompt.
pub struct ScriptedModel {
    reply: SourceResult<String>,
    calls: Mutex<Vec<(Option<String>, String)>>,
}

impl ScriptedModel {
    /// A model that always answers `reply`.
    pub fn answering(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A model that always fails with `error`.
    pub fn failing(error: SourceError) -> Self {
        Self {
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(system_prompt, user_text)` pair received so far.
    pub fn calls(&self) -> Vec<(Option<String>, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, system_prompt: Option<&str>, user_text: &str) -> SourceResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system_prompt.map(str::to_string), user_text.to_string()));
        }
        self.reply.clone()
    }
}
