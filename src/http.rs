//! Shared HTTP plumbing for the web API adapters.
//!
//! Every adapter builds its own [`reqwest::Client`] with the configured
//! timeout and funnels responses through [`check_status`] and
//! [`read_json`], so upstream failures land in the same
//! [`SourceError`] variants regardless of the backend.

use std::time::Duration;

use hub_core::source::{SourceError, SourceResult};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

pub const USER_AGENT: &str = concat!("personal-hub/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout_secs: u64) -> SourceResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {}", e)))
}

/// Classify a transport-level failure.
pub fn send_error(service: &str, err: reqwest::Error) -> SourceError {
    if err.is_connect() {
        SourceError::Unreachable(format!("{}: {}", service, err))
    } else if err.is_timeout() {
        SourceError::Transient(format!("{} timed out: {}", service, err))
    } else {
        SourceError::Transient(format!("{}: {}", service, err))
    }
}

/// Pass successful responses through; map error statuses.
///
/// - 404 → [`SourceError::NotFound`]
/// - 401 / 403 → [`SourceError::Unavailable`] (bad or missing credentials)
/// - anything else non-2xx → [`SourceError::Transient`]
pub async fn check_status(service: &str, response: Response) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = format!("{} returned {}: {}", service, status, truncate(&body, 200));
    Err(match status {
        StatusCode::NOT_FOUND => SourceError::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unavailable(detail),
        _ => SourceError::Transient(detail),
    })
}

pub async fn read_json<T: DeserializeOwned>(service: &str, response: Response) -> SourceResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Malformed(format!("{}: {}", service, e)))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://x/", "/v1/a"), "http://x/v1/a");
        assert_eq!(join_url("http://x", "v1/a"), "http://x/v1/a");
    }

    #[tokio::test]
    async fn test_check_status_maps_codes() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;
        let _denied = server
            .mock("GET", "/denied")
            .with_status(403)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/broken")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = build_client(5).unwrap();
        let get = |path: &str| client.get(format!("{}{}", server.url(), path)).send();

        let err = check_status("test", get("/missing").await.unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        let err = check_status("test", get("/denied").await.unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unavailable");
        let err = check_status("test", get("/broken").await.unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transient");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = build_client(5).unwrap();
        let err = client
            .get(format!("http://127.0.0.1:{}/", port))
            .send()
            .await
            .unwrap_err();
        assert_eq!(send_error("test", err).kind(), "unreachable");
    }
}
