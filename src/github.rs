//! GitHub REST API code host.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hub_core::models::{CommitInfo, RepoInfo};
use hub_core::source::{CodeHost, SourceResult};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::config::GithubConfig;
use crate::http::{build_client, check_status, join_url, read_json, send_error};

const SERVICE: &str = "github";
const ACCEPT: &str = "application/vnd.github+json";
const MAX_PER_PAGE: u32 = 100;

/// Always constructible: anonymous access works for public data, a token
/// only raises the rate limit.
pub struct GithubHost {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct RepoPayload {
    name: String,
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Deserialize)]
struct CommitPayload {
    sha: String,
    commit: CommitDetail,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl GithubHost {
    pub fn from_config(config: &GithubConfig) -> SourceResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(join_url(&self.base_url, path))
            .header("Accept", ACCEPT);
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl CodeHost for GithubHost {
    async fn list_repos(&self, username: &str) -> SourceResult<Vec<RepoInfo>> {
        let response = self
            .get(&format!("users/{}/repos", username))
            .query(&[("per_page", "100"), ("page", "1"), ("sort", "updated")])
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let repos: Vec<RepoPayload> = read_json(SERVICE, response).await?;
        Ok(repos
            .into_iter()
            .map(|r| RepoInfo {
                name: r.name,
                url: r.html_url,
                stars: r.stargazers_count,
            })
            .collect())
    }

    async fn recent_commits(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> SourceResult<Vec<CommitInfo>> {
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let response = self
            .get(&format!("repos/{}/{}/commits", owner, repo))
            .query(&[("per_page", per_page), ("page", page.max(1))])
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let commits: Vec<CommitPayload> = read_json(SERVICE, response).await?;
        Ok(commits
            .into_iter()
            .map(|c| {
                let (author, date) = match c.commit.author {
                    Some(a) => (a.name, a.date),
                    None => (None, None),
                };
                CommitInfo {
                    sha: c.sha,
                    message: c.commit.message,
                    author,
                    date,
                    url: c.html_url,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn host(server: &mockito::Server, token: Option<&str>) -> GithubHost {
        GithubHost::from_config(&GithubConfig {
            token: token.map(str::to_string),
            base_url: server.url(),
            timeout_secs: 5,
            ..GithubConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_repos_sends_headers() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/users/octocat/repos")
            .match_query(Matcher::UrlEncoded("sort".into(), "updated".into()))
            .match_header("authorization", "token t0k")
            .match_header("accept", ACCEPT)
            .with_status(200)
            .with_body(
                r#"[{"name":"hello","html_url":"https://github.com/octocat/hello","stargazers_count":7}]"#,
            )
            .create_async()
            .await;

        let repos = host(&server, Some("t0k")).list_repos("octocat").await.unwrap();
        assert_eq!(
            repos,
            vec![RepoInfo {
                name: "hello".into(),
                url: "https://github.com/octocat/hello".into(),
                stars: 7,
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/users/ghost/repos")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let err = host(&server, None).list_repos("ghost").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_recent_commits_clamps_per_page() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/me/app/commits")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[{"sha":"abc","html_url":"https://github.com/me/app/commit/abc",
                     "commit":{"message":"Fix parser\n\nbody","author":{"name":"Me","date":"2024-05-01T10:00:00Z"}}}]"#,
            )
            .create_async()
            .await;

        let commits = host(&server, None)
            .recent_commits("me", "app", 2, 500)
            .await
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].headline(), "Fix parser");
        assert_eq!(commits[0].author.as_deref(), Some("Me"));
        assert!(commits[0].date.is_some());
    }
}
