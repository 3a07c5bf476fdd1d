use async_trait::async_trait;
use crate::error::{RagError, Result};
use crate::providers::traits::CompletionProvider;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "llama3-8b-8192";

#[derive(Clone)]
pub struct GroqProvider {
    api_key: Option<String>,
    client: Client,
    url: String,
    model: String,
    temperature: f32,
}

impl GroqProvider {
    pub fn new(api_key: Option<String>, url: String, model: String, temperature: f32) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client: Client::new(),
            url,
            model,
            temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            RagError::Generation("GROQ_API_KEY is not set".to_string())
        })?;

        debug!("Sending {} prompt characters to {}", prompt.chars().count(), self.model);
        let response = self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt
                    }
                ],
                "temperature": self.temperature
            }))
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "API request failed: Status {}, Body: {}",
                status, error_text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| RagError::MalformedResponse(format!("Chat response is not JSON: {}", e)))?;

        if let Some(error) = response_json.get("error") {
            return Err(RagError::Generation(format!("API returned error: {}", error)));
        }

        response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                let debug_json = serde_json::to_string_pretty(&response_json).unwrap_or_default();
                RagError::MalformedResponse(format!("Invalid response format. Response JSON: {}", debug_json))
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::{http::StatusCode, routing::post, Json, Router};

    async fn echo_completion(Json(body): Json<Value>) -> Json<Value> {
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        Json(json!({
            "choices": [
                { "message": { "role": "assistant", "content": format!("{}|{}", body["model"].as_str().unwrap_or_default(), prompt) } }
            ]
        }))
    }

    fn provider(url: String, key: Option<&str>) -> GroqProvider {
        GroqProvider::new(key.map(str::to_string), url, "llama3-8b-8192".to_string(), 0.7)
    }

    #[tokio::test]
    async fn test_complete_returns_message_content() {
        let router = Router::new().route("/chat", post(echo_completion));
        let url = format!("{}/chat", spawn_server(router).await);

        let answer = provider(url, Some("key")).complete("What is RAG?").await.unwrap();
        assert_eq!(answer, "llama3-8b-8192|What is RAG?");
    }

    #[tokio::test]
    async fn test_error_status_is_generation_error() {
        let router = Router::new().route(
            "/chat",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = format!("{}/chat", spawn_server(router).await);

        let err = provider(url, Some("key")).complete("hi").await.unwrap_err();
        match err {
            RagError::Generation(message) => assert!(message.contains("slow down")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let router = Router::new().route("/chat", post(|| async { Json(json!({ "choices": [] })) }));
        let url = format!("{}/chat", spawn_server(router).await);

        let err = provider(url, Some("key")).complete("hi").await.unwrap_err();
        assert!(matches!(err, RagError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let err = provider("http://127.0.0.1:9/unused".to_string(), None)
            .complete("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }
}
