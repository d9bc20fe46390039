//! Liked music via the YouTube Data API.
//!
//! The liked-music playlist has the fixed id `LM`. Requests carry the
//! browser auth headers exported for the account (a JSON object of header
//! name to value), either inline or from a file. Pages hold at most 50
//! items, so larger requests follow `nextPageToken` until the limit is met
//! or the playlist ends.

use async_trait::async_trait;
use hub_core::models::{LikedSong, Scope, FULL_LISTING_LIMIT};
use hub_core::source::{LikedSongs, SourceError, SourceResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::YtMusicConfig;
use crate::http::{build_client, check_status, join_url, read_json, send_error};

const SERVICE: &str = "ytmusic";
const LIKED_PLAYLIST: &str = "LM";
const PAGE_SIZE: usize = 50;
const TOPIC_SUFFIX: &str = " - Topic";

pub struct YtMusicLikes {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    video_owner_channel_title: Option<String>,
    resource_id: Option<ResourceId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

impl From<PlaylistItem> for LikedSong {
    fn from(item: PlaylistItem) -> Self {
        let snippet = item.snippet;
        let artist = snippet
            .video_owner_channel_title
            .map(|channel| {
                channel
                    .strip_suffix(TOPIC_SUFFIX)
                    .map(str::to_string)
                    .unwrap_or(channel)
            })
            .unwrap_or_default();
        let youtube_id = snippet.resource_id.and_then(|r| r.video_id);
        let url = youtube_id
            .as_ref()
            .map(|id| format!("https://music.youtube.com/watch?v={}", id));
        LikedSong {
            title: snippet.title,
            artist,
            url,
            youtube_id,
        }
    }
}

/// Read the auth header object from the inline JSON or the headers file.
pub fn load_headers(config: &YtMusicConfig) -> SourceResult<Option<HeaderMap>> {
    let raw = match (&config.headers_json, &config.headers_file) {
        (Some(json), _) if !json.trim().is_empty() => json.clone(),
        (_, Some(path)) if path.exists() => std::fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?,
        _ => return Ok(None),
    };

    let values: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|e| SourceError::Unavailable(format!("invalid YT Music headers: {}", e)))?;

    let mut headers = HeaderMap::new();
    for (name, value) in values {
        let Some(value) = value.as_str() else {
            continue;
        };
        let name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map_err(|e| SourceError::Unavailable(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SourceError::Unavailable(format!("invalid header value: {}", e)))?;
        headers.insert(name, value);
    }
    if headers.is_empty() {
        return Ok(None);
    }
    Ok(Some(headers))
}

impl YtMusicLikes {
    /// Returns `None` when no auth headers are configured.
    pub fn from_config(config: &YtMusicConfig) -> SourceResult<Option<Self>> {
        let Some(headers) = load_headers(config)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            headers,
        }))
    }

    async fn page(&self, size: usize, token: Option<&str>) -> SourceResult<PlaylistPage> {
        let size = size.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("playlistId", LIKED_PLAYLIST),
            ("maxResults", size.as_str()),
        ];
        if let Some(token) = token {
            query.push(("pageToken", token));
        }
        let response = self
            .client
            .get(join_url(&self.base_url, "playlistItems"))
            .headers(self.headers.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl LikedSongs for YtMusicLikes {
    async fn list_liked(&self, limit: usize, scope: Scope) -> SourceResult<Vec<LikedSong>> {
        let target = match scope {
            Scope::Limited => limit.min(FULL_LISTING_LIMIT),
            Scope::Full => FULL_LISTING_LIMIT,
        };
        let mut songs = Vec::new();
        let mut token: Option<String> = None;

        while songs.len() < target {
            let size = (target - songs.len()).min(PAGE_SIZE);
            let page = self.page(size, token.as_deref()).await?;
            songs.extend(page.items.into_iter().map(LikedSong::from));
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        songs.truncate(target);
        Ok(songs)
    }
}
