//! MCP tool server.
//!
//! Exposes the assistant's source lookups as MCP tools over the Streamable
//! HTTP transport, mounted at `/mcp` by [`crate::server::router`]. Tools go
//! straight to the adapters; there is no classification or language model
//! on this path.
//!
//! | Tool | Arguments | Result |
//! |------|-----------|--------|
//! | `list_local_files` | none | note file names |
//! | `fetch_local_file` | `name` | note text |
//! | `github_repos` | `user` | repositories, most recently updated first |
//! | `github_commits_paginated` | `user`, `repo`, `page` = 1, `per_page` = 100 | one page of commits |
//! | `ytm_liked_songs_free` | `limit` = 50 | newest liked songs |
//! | `ytm_liked_songs_all` | none | every liked song |
//! | `steam_games` | `limit` = 50 | owned games in account order |
//!
//! An adapter failure (unconfigured integration, upstream error) is a tool
//! result with `is_error` set, not a protocol error. Unknown tools and bad
//! arguments are protocol errors.

use std::borrow::Cow;
use std::sync::Arc;

use hub_core::models::{Scope, FULL_LISTING_LIMIT};
use hub_core::source::SourceError;
use rmcp::model::*;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::dispatch::{game_json, Assistant};

const DEFAULT_TOOL_LIMIT: usize = 50;
const MAX_COMMITS_PER_PAGE: u32 = 100;

/// Static description of one tool.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    schema: fn() -> Value,
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_local_files",
        description: "List the text notes in the notes directory.",
        schema: no_arguments,
    },
    ToolSpec {
        name: "fetch_local_file",
        description: "Read one text note by file name.",
        schema: note_name_argument,
    },
    ToolSpec {
        name: "github_repos",
        description: "List a GitHub user's public repositories.",
        schema: user_argument,
    },
    ToolSpec {
        name: "github_commits_paginated",
        description: "Fetch one page of a repository's commit history. Walk pages to read the full history.",
        schema: commit_page_arguments,
    },
    ToolSpec {
        name: "ytm_liked_songs_free",
        description: "List the newest liked songs on YouTube Music.",
        schema: limit_argument,
    },
    ToolSpec {
        name: "ytm_liked_songs_all",
        description: "List every liked song on YouTube Music.",
        schema: no_arguments,
    },
    ToolSpec {
        name: "steam_games",
        description: "List owned Steam games with playtime.",
        schema: limit_argument,
    },
];

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn note_name_argument() -> Value {
    json!({
        "type": "object",
        "properties": { "name": { "type": "string", "description": "Note file name, e.g. todo.txt" } },
        "required": ["name"]
    })
}

fn user_argument() -> Value {
    json!({
        "type": "object",
        "properties": { "user": { "type": "string" } },
        "required": ["user"]
    })
}

fn commit_page_arguments() -> Value {
    json!({
        "type": "object",
        "properties": {
            "user": { "type": "string" },
            "repo": { "type": "string" },
            "page": { "type": "integer", "minimum": 1, "default": 1 },
            "per_page": { "type": "integer", "minimum": 1, "maximum": 100, "default": 100 }
        },
        "required": ["user", "repo"]
    })
}

fn limit_argument() -> Value {
    json!({
        "type": "object",
        "properties": { "limit": { "type": "integer", "minimum": 1, "default": DEFAULT_TOOL_LIMIT } }
    })
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no tool registered with name: {0}")]
    Unknown(String),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Deserialize)]
struct NoteArgs {
    name: String,
}

#[derive(Deserialize)]
struct UserArgs {
    user: String,
}

#[derive(Deserialize)]
struct CommitArgs {
    user: String,
    repo: String,
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default = "max_commits_per_page")]
    per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn max_commits_per_page() -> u32 {
    MAX_COMMITS_PER_PAGE
}

#[derive(Deserialize)]
struct LimitArgs {
    #[serde(default)]
    limit: Option<usize>,
}

impl LimitArgs {
    fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_TOOL_LIMIT)
            .clamp(1, FULL_LISTING_LIMIT)
    }
}

fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Bridges the assistant's adapters to the MCP protocol. Every session gets
/// a clone sharing the same assistant.
#[derive(Clone)]
pub struct McpBridge {
    assistant: Arc<Assistant>,
}

impl McpBridge {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self { assistant }
    }

    fn to_mcp_tool(spec: &ToolSpec) -> Tool {
        let input_schema = match (spec.schema)() {
            Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Borrowed(spec.name),
            title: None,
            description: Some(Cow::Borrowed(spec.description)),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    /// Run one tool by name. `args` is the tool's JSON argument object.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let a = self.assistant.adapters();
        tracing::debug!(tool = name, "mcp tool call");
        let result = match name {
            "list_local_files" => json!(a.notes.list_notes().await?),
            "fetch_local_file" => {
                let args: NoteArgs = parse(name, args)?;
                Value::String(a.notes.read_note(&args.name).await?)
            }
            "github_repos" => {
                let args: UserArgs = parse(name, args)?;
                json!(a.host.list_repos(&args.user).await?)
            }
            "github_commits_paginated" => {
                let args: CommitArgs = parse(name, args)?;
                let per_page = args.per_page.clamp(1, MAX_COMMITS_PER_PAGE);
                json!(
                    a.host
                        .recent_commits(&args.user, &args.repo, args.page.max(1), per_page)
                        .await?
                )
            }
            "ytm_liked_songs_free" => {
                let args: LimitArgs = parse(name, args)?;
                json!(a.songs.list_liked(args.limit(), Scope::Limited).await?)
            }
            "ytm_liked_songs_all" => {
                json!(a.songs.list_liked(FULL_LISTING_LIMIT, Scope::Full).await?)
            }
            "steam_games" => {
                let args: LimitArgs = parse(name, args)?;
                let games = a.library.list_owned(Some(args.limit())).await?;
                Value::Array(games.iter().map(game_json).collect())
            }
            other => return Err(ToolError::Unknown(other.to_string())),
        };
        Ok(result)
    }
}

/// The Streamable HTTP service for [`McpBridge`], ready to nest in a router.
pub fn service(assistant: Arc<Assistant>) -> StreamableHttpService<McpBridge, LocalSessionManager> {
    let bridge = McpBridge::new(assistant);
    StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    )
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "personal-hub".to_string(),
                title: Some("Personal Hub".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Personal Hub: local notes, GitHub repositories and commit history, \
                 YouTube Music likes, and the Steam library. Page through \
                 github_commits_paginated to read a full history."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = TOOLS.iter().map(Self::to_mcp_tool).collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        TOOLS
            .iter()
            .find(|spec| spec.name == name)
            .map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(Value::Object)
            .unwrap_or(Value::Object(serde_json::Map::new()));

        match self.call(&request.name, args).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(ToolError::Source(e)) => {
                tracing::warn!(tool = %request.name, kind = e.kind(), error = %e, "mcp tool failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
            Err(e @ ToolError::Unknown(_)) => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                e.to_string(),
                None,
            )),
            Err(e @ ToolError::InvalidArguments { .. }) => Err(McpError::new(
                ErrorCode::INVALID_PARAMS,
                e.to_string(),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::dispatch::Adapters;
    use hub_core::models::{CommitInfo, OwnedGame};
    use hub_core::source::memory::{MemoryCodeHost, MemoryLibrary, MemoryNotes};
    use std::time::Duration;

    fn commit(n: usize) -> (String, CommitInfo) {
        (
            "me/app".to_string(),
            CommitInfo {
                sha: format!("sha{}", n),
                message: format!("Commit {}", n),
                author: None,
                date: None,
                url: None,
            },
        )
    }

    fn bridge() -> McpBridge {
        let mut adapters = Adapters::unconfigured();
        adapters.notes = Arc::new(MemoryNotes::new(vec![(
            "todo.txt".to_string(),
            "buy milk".to_string(),
        )]));
        adapters.host = Arc::new(MemoryCodeHost::new(vec![], (1..=5).map(commit).collect()));
        adapters.library = Arc::new(MemoryLibrary::new(vec![OwnedGame {
            app_id: 620,
            name: "Portal 2".to_string(),
            minutes_lifetime: 125,
            minutes_recent: 0,
        }]));
        McpBridge::new(Arc::new(Assistant::new(
            adapters,
            Aggregator::new(Duration::from_secs(1)),
        )))
    }

    #[test]
    fn test_every_tool_has_object_schema() {
        let bridge = bridge();
        assert_eq!(TOOLS.len(), 7);
        for spec in TOOLS {
            let tool = bridge.get_tool(spec.name).unwrap();
            assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
        }
        assert!(bridge.get_tool("read_emails").is_none());
    }

    #[test]
    fn test_server_info_enables_tools() {
        let info = bridge().get_info();
        assert_eq!(info.server_info.name, "personal-hub");
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let text = bridge()
            .call("fetch_local_file", json!({ "name": "todo.txt" }))
            .await
            .unwrap();
        assert_eq!(text, json!("buy milk"));
    }

    #[tokio::test]
    async fn test_commits_walk_pages() {
        let bridge = bridge();
        let page = |n: u32| json!({ "user": "me", "repo": "app", "page": n, "per_page": 2 });

        let second = bridge.call("github_commits_paginated", page(2)).await.unwrap();
        let shas: Vec<&str> = second
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["sha"].as_str().unwrap())
            .collect();
        assert_eq!(shas, vec!["sha3", "sha4"]);

        let last = bridge.call("github_commits_paginated", page(3)).await.unwrap();
        assert_eq!(last.as_array().unwrap().len(), 1);

        let past_end = bridge.call("github_commits_paginated", page(4)).await.unwrap();
        assert_eq!(past_end, json!([]));
    }

    #[tokio::test]
    async fn test_commits_default_to_first_full_page() {
        let all = bridge()
            .call("github_commits_paginated", json!({ "user": "me", "repo": "app" }))
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_steam_games_use_listing_shape() {
        let games = bridge().call("steam_games", json!({})).await.unwrap();
        assert_eq!(games[0]["name"], "Portal 2");
        assert_eq!(games[0]["hours"], 2.08);
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid() {
        let err = bridge()
            .call("github_repos", json!({ "username": "octocat" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_unconfigured_source() {
        let bridge = bridge();
        assert!(matches!(
            bridge.call("read_emails", json!({})).await,
            Err(ToolError::Unknown(_))
        ));
        match bridge.call("ytm_liked_songs_all", json!({})).await {
            Err(ToolError::Source(e)) => assert_eq!(e.kind(), "unavailable"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
