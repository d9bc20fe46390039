//! # Personal Hub
//!
//! A local-first personal assistant gateway. Queries are routed by a
//! rule-based intent classifier to direct handlers (notes, game library,
//! liked music, code host). Anything the rules do not cover goes to a local
//! language model, primed with a briefing gathered concurrently from every
//! configured source.
//!
//! ## Architecture
//!
//! ```text
//!                ┌────────────┐  intent   ┌─────────────────┐
//!  query ──────▶ │ Classifier │ ────────▶ │ Direct handlers │──▶ answer
//!                └─────┬──────┘           └─────────────────┘
//!                      │ none
//!                      ▼
//!               ┌────────────┐  briefing  ┌──────────┐
//!               │ Aggregator │ ─────────▶ │   LLM    │──▶ answer (or fallback)
//!               │ (parallel) │            └──────────┘
//!               └────────────┘
//! ```
//!
//! The pure pieces (classifier, matcher, context model, adapter traits)
//! live in the `hub-core` crate; this crate adds I/O.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment fallbacks |
//! | [`dispatch`] | Query state machine and direct handlers |
//! | [`aggregate`] | Concurrent, timeout-bounded context gathering |
//! | [`notes`] | Local text notes |
//! | [`steam`] | Steam Web API game library |
//! | [`ytmusic`] | Liked music via the YouTube Data API |
//! | [`github`] | GitHub REST API |
//! | [`llm`] | OpenAI-compatible chat completions |
//! | [`http`] | Shared HTTP client and error mapping |
//! | [`server`] | axum HTTP API |
//! | [`mcp`] | MCP tool server mounted at `/mcp` |
//! | [`sources`] | Integration status table |

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod github;
pub mod http;
pub mod llm;
pub mod mcp;
pub mod notes;
pub mod server;
pub mod sources;
pub mod steam;
pub mod ytmusic;
