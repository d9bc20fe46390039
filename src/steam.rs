//! Steam Web API game library.
//!
//! Reads `IPlayerService/GetOwnedGames` with app info and free games
//! included. The account's enumeration order is preserved; sorting by
//! playtime is left to the summary layer.

use async_trait::async_trait;
use hub_core::models::{LibrarySnapshot, OwnedGame};
use hub_core::source::{GameLibrary, SourceError, SourceResult};
use reqwest::Client;
use serde::Deserialize;

use crate::config::SteamConfig;
use crate::http::{build_client, check_status, join_url, read_json, send_error};

const SERVICE: &str = "steam";

pub struct SteamLibrary {
    client: Client,
    base_url: String,
    api_key: String,
    steam_id: String,
}

#[derive(Deserialize)]
struct OwnedGamesEnvelope {
    #[serde(default)]
    response: OwnedGamesResponse,
}

#[derive(Deserialize, Default)]
struct OwnedGamesResponse {
    game_count: Option<usize>,
    #[serde(default)]
    games: Vec<SteamGame>,
}

#[derive(Deserialize)]
struct SteamGame {
    appid: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    playtime_forever: u64,
    #[serde(default)]
    playtime_2weeks: u64,
}

impl From<SteamGame> for OwnedGame {
    fn from(game: SteamGame) -> Self {
        OwnedGame {
            app_id: game.appid,
            name: game.name.unwrap_or_else(|| format!("App {}", game.appid)),
            minutes_lifetime: game.playtime_forever,
            minutes_recent: game.playtime_2weeks,
        }
    }
}

impl SteamLibrary {
    /// Returns `None` when the API key or Steam id is missing.
    pub fn from_config(config: &SteamConfig) -> SourceResult<Option<Self>> {
        if !config.is_configured() {
            return Ok(None);
        }
        let (Some(api_key), Some(steam_id)) = (config.api_key.clone(), config.steam_id.clone())
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            api_key,
            steam_id,
        }))
    }

    async fn fetch(&self) -> SourceResult<OwnedGamesResponse> {
        let url = join_url(&self.base_url, "IPlayerService/GetOwnedGames/v0001/");
        let response = self
            .client
            .get(url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("steamid", self.steam_id.as_str()),
                ("format", "json"),
                ("include_appinfo", "1"),
                ("include_played_free_games", "1"),
            ])
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let envelope: OwnedGamesEnvelope = read_json(SERVICE, response).await?;
        Ok(envelope.response)
    }
}

#[async_trait]
impl GameLibrary for SteamLibrary {
    async fn list_owned(&self, limit: Option<usize>) -> SourceResult<Vec<OwnedGame>> {
        let response = self.fetch().await?;
        let take = limit.unwrap_or(usize::MAX);
        Ok(response
            .games
            .into_iter()
            .take(take)
            .map(OwnedGame::from)
            .collect())
    }

    async fn owned_count(&self) -> SourceResult<usize> {
        game_count(&self.fetch().await?)
    }

    async fn snapshot(&self) -> SourceResult<LibrarySnapshot> {
        let response = self.fetch().await?;
        Ok(LibrarySnapshot {
            owned_count: game_count(&response)?,
            games: response.games.into_iter().map(OwnedGame::from).collect(),
        })
    }
}

// A private profile answers with an empty `response` object.
fn game_count(response: &OwnedGamesResponse) -> SourceResult<usize> {
    response.game_count.ok_or_else(|| {
        SourceError::Unavailable("steam did not report a game count (profile private?)".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::context::SourceSummary;
    use hub_core::source::ContextSource;
    use hub_core::summary::LibrarySummarySource;
    use mockito::Matcher;
    use std::sync::Arc;

    fn library(server: &mockito::Server) -> SteamLibrary {
        let config = SteamConfig {
            api_key: Some("k".into()),
            steam_id: Some("42".into()),
            base_url: server.url(),
            timeout_secs: 5,
        };
        SteamLibrary::from_config(&config).unwrap().unwrap()
    }

    const BODY: &str = r#"{"response":{"game_count":3,"games":[
        {"appid":570,"name":"Dota 2","playtime_forever":900,"playtime_2weeks":30},
        {"appid":620,"name":"Portal 2","playtime_forever":125},
        {"appid":730,"playtime_forever":5}
    ]}}"#;

    #[test]
    fn test_missing_credentials_is_unconfigured() {
        assert!(SteamLibrary::from_config(&SteamConfig::default())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_owned_preserves_order_and_limit() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "k".into()),
                Matcher::UrlEncoded("steamid".into(), "42".into()),
                Matcher::UrlEncoded("include_appinfo".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let games = library(&server).list_owned(Some(2)).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].name, "Dota 2");
        assert_eq!(games[0].minutes_recent, 30);
        assert_eq!(games[1].minutes_lifetime, 125);
    }

    #[tokio::test]
    async fn test_unnamed_game_gets_placeholder() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let games = library(&server).list_owned(None).await.unwrap();
        assert_eq!(games[2].name, "App 730");
    }

    #[tokio::test]
    async fn test_owned_count() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        assert_eq!(library(&server).owned_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_summary_reads_owned_games_once() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .expect(1)
            .create_async()
            .await;

        let source = LibrarySummarySource::new(Arc::new(library(&server)));
        match source.summary().await.unwrap() {
            Some(SourceSummary::Library(summary)) => {
                assert_eq!(summary.owned_count, 3);
                assert_eq!(summary.top_games[0].name, "Dota 2");
            }
            other => panic!("unexpected summary: {:?}", other),
        }
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_private_profile_count_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"response":{}}"#)
            .create_async()
            .await;

        let err = library(&server).owned_count().await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/IPlayerService/GetOwnedGames/v0001/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = library(&server).list_owned(None).await.unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }
}
