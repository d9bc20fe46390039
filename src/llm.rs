//! OpenAI-compatible chat completions client (LM Studio by default).
//!
//! Each call sends the persona prompt, then the optional context prompt,
//! then the user's text. There are no retries: a failed call is reported
//! straight back so the dispatcher can answer with its fallback.

use async_trait::async_trait;
use hub_core::source::{LanguageModel, SourceResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::http::{build_client, check_status, join_url, read_json, send_error};

const SERVICE: &str = "language model";

pub const EMPTY_REPLY: &str = "(No content returned from the language model)";

pub struct ChatModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    persona: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatModel {
    pub fn from_config(config: &LlmConfig) -> SourceResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            persona: config.system_prompt.clone(),
        })
    }

    fn messages<'a>(&'a self, system_prompt: Option<&'a str>, user_text: &'a str) -> Vec<Message<'a>> {
        let mut messages = vec![Message {
            role: "system",
            content: &self.persona,
        }];
        if let Some(context) = system_prompt.filter(|p| !p.is_empty()) {
            messages.push(Message {
                role: "system",
                content: context,
            });
        }
        messages.push(Message {
            role: "user",
            content: user_text,
        });
        messages
    }
}

#[async_trait]
impl LanguageModel for ChatModel {
    async fn complete(&self, system_prompt: Option<&str>, user_text: &str) -> SourceResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: self.messages(system_prompt, user_text),
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let reply: ChatResponse = read_json(SERVICE, response).await?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty());
        match content {
            Some(text) => Ok(text),
            None => {
                tracing::debug!("language model returned no content");
                Ok(EMPTY_REPLY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::source::SourceError;
    use mockito::Matcher;
    use serde_json::json;

    fn model(base_url: String) -> ChatModel {
        ChatModel::from_config(&LlmConfig {
            base_url,
            timeout_secs: 5,
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_context_prompt_sits_between_persona_and_user() {
        let chat = model("http://localhost:1".into());
        let messages = chat.messages(Some("Context: Steam: owned_count=1"), "hi");
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "system", "user"]);
        assert_eq!(messages[1].content, "Context: Steam: owned_count=1");

        let messages = chat.messages(None, "hi");
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_complete_posts_chat_request() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer lm-studio")
            .match_body(Matcher::PartialJson(json!({
                "model": "local-model",
                "temperature": 0.2,
                "messages": [
                    {"role": "system", "content": "You are a helpful personal assistant."},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#)
            .create_async()
            .await;

        let reply = model(server.url()).complete(None, "hello").await.unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn test_empty_content_gets_placeholder() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":""}}]}"#)
            .create_async()
            .await;

        let reply = model(server.url()).complete(None, "hello").await.unwrap();
        assert_eq!(reply, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = model(format!("http://127.0.0.1:{}", port))
            .complete(None, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unreachable(_)));
    }
}
