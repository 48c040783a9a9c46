//! The analysis agent: a configuration bundle around one multimodal
//! `generateContent` call against the Google Gemini API.

use crate::error::{Error, Result};
use crate::imaging::ImageArtifact;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use std::time::Duration;

/// Model the agent is bound to.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration of the web search tool the model may call while reasoning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchToolConfig {
    pub verify_certificates: bool,
    pub max_results: u32,
    pub timeout: Duration,
}

impl Default for SearchToolConfig {
    fn default() -> Self {
        SearchToolConfig {
            verify_certificates: false,
            max_results: 3,
            timeout: Duration::from_secs(10),
        }
    }
}

/// An immutable configuration bundle for one session: model, credential,
/// search tool, and output formatting. Built once; rebuilding with the same
/// credential yields an equal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    model_name: String,
    api_key: String,
    search_tool: SearchToolConfig,
    markdown: bool,
    base_url: String,
}

impl Agent {
    /// Builds the agent for a session. An empty credential yields `None`;
    /// there is no partially configured state.
    pub fn build(credential: &str) -> Option<Self> {
        if credential.trim().is_empty() {
            return None;
        }
        Some(Agent {
            model_name: DEFAULT_MODEL.to_string(),
            api_key: credential.to_string(),
            search_tool: SearchToolConfig::default(),
            markdown: true,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn search_tool(&self) -> &SearchToolConfig {
        &self.search_tool
    }

    /// Points the agent at a different endpoint. Used by integration tests
    /// to run against a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sends the prompt and the persisted image to the model and returns its
    /// markdown response untouched. One attempt per call; failures are
    /// classified, never retried. No client-side timeout is applied -- the
    /// caller blocks until the provider answers or the connection drops.
    pub async fn analyze(&self, prompt: &str, artifact: &ImageArtifact) -> Result<String> {
        let image_data = artifact.read()?;
        let encoded_image = STANDARD.encode(image_data);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model_name
        );
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": "image/png",
                            "data": encoded_image
                        }
                    }
                ]
            }],
            "tools": [{ "google_search": {} }]
        });

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.search_tool.verify_certificates)
            .build()
            .map_err(|e| Error::classify(e.to_string()))?;

        let response = client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::classify(e.to_string()))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read response body".to_string());

        if !status.is_success() {
            return Err(Error::classify(format!(
                "API request failed with status: {}. Body: {}",
                status, body_text
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| Error::classify(format!("Failed to parse API response: {}", e)))?;

        extract_content(&parsed).ok_or_else(|| {
            Error::classify(format!(
                "Could not extract text from API response. Full response: {}",
                body_text
            ))
        })
    }
}

/// Concatenates the text parts of the first candidate, if any.
fn extract_content(response: &serde_json::Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut full_text = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            full_text.push_str(text);
        }
    }

    if full_text.is_empty() {
        None
    } else {
        Some(full_text)
    }
}
