//! AI highlight summaries for notes.
//!
//! The service never fails from the caller's point of view: any backend error
//! is logged and replaced with [`FALLBACK_HIGHLIGHTS`].

use crate::error::SummaryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const FALLBACK_HIGHLIGHTS: [&str; 3] = [
    "Comprehensive coverage of topic",
    "Exam-focused insights",
    "Clear structural flow",
];

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// What the backend is asked to summarize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPrompt {
    pub title: String,
    pub description: String,
    pub subject: String,
}

impl SummaryPrompt {
    pub fn text(&self) -> String {
        format!(
            "Provide a concise 3-point summary or key learning outcomes for a set of study notes titled \"{}\" on the subject \"{}\". \nDescription: {}. \nFormat as a professional academic highlight.",
            self.title, self.subject, self.description
        )
    }
}

#[async_trait]
pub trait HighlightGenerator: Send + Sync {
    async fn generate(&self, prompt: &SummaryPrompt) -> Result<Vec<String>, SummaryError>;
}

#[derive(Clone)]
pub struct SummaryService {
    backend: Arc<dyn HighlightGenerator>,
}

impl SummaryService {
    pub fn new(backend: Arc<dyn HighlightGenerator>) -> Self {
        Self { backend }
    }

    pub async fn request_summary(&self, title: &str, description: &str, subject: &str) -> Vec<String> {
        let prompt = SummaryPrompt {
            title: title.to_string(),
            description: description.to_string(),
            subject: subject.to_string(),
        };

        match self.backend.generate(&prompt).await {
            Ok(highlights) => highlights,
            Err(e) => {
                tracing::error!("summary request failed, using fallback: {}", e);
                fallback()
            }
        }
    }
}

pub fn fallback() -> Vec<String> {
    FALLBACK_HIGHLIGHTS.iter().map(|s| s.to_string()).collect()
}

/// Calls the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Highlights {
    highlights: Vec<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("Gemini API key is missing. Summaries will use the fallback highlights.");
        }
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(prompt: &SummaryPrompt) -> serde_json::Value {
        json!({
            "contents": [{ "parts": [{ "text": prompt.text() }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "highlights": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "3 key takeaways from the notes"
                        }
                    },
                    "required": ["highlights"]
                }
            }
        })
    }
}

fn extract_highlights(response: GenerateContentResponse) -> Result<Vec<String>, SummaryError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| SummaryError::Malformed("response has no text part".into()))?;

    let parsed: Highlights =
        serde_json::from_str(&text).map_err(|e| SummaryError::Malformed(e.to_string()))?;
    Ok(parsed.highlights)
}

#[async_trait]
impl HighlightGenerator for GeminiClient {
    async fn generate(&self, prompt: &SummaryPrompt) -> Result<Vec<String>, SummaryError> {
        let api_key = self.api_key.as_deref().ok_or(SummaryError::MissingApiKey)?;

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryError::HttpStatus(status, body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Malformed(e.to_string()))?;
        extract_highlights(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Uri};
    use axum::{Json, Router};

    struct Failing;

    #[async_trait]
    impl HighlightGenerator for Failing {
        async fn generate(&self, _prompt: &SummaryPrompt) -> Result<Vec<String>, SummaryError> {
            Err(SummaryError::Malformed("forced failure".into()))
        }
    }

    struct Canned(Vec<String>);

    #[async_trait]
    impl HighlightGenerator for Canned {
        async fn generate(&self, _prompt: &SummaryPrompt) -> Result<Vec<String>, SummaryError> {
            Ok(self.0.clone())
        }
    }

    async fn stub_gemini(reply: serde_json::Value) -> String {
        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap| {
            let reply = reply.clone();
            async move {
                assert_eq!(uri.path(), "/v1beta/models/test-model:generateContent");
                assert_eq!(headers["x-goog-api-key"], "test-key");
                Json(reply)
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn failure_returns_fixed_fallback() {
        let service = SummaryService::new(Arc::new(Failing));
        let highlights = service.request_summary("DSA", "Trees", "CS").await;
        assert_eq!(highlights, FALLBACK_HIGHLIGHTS.to_vec());
    }

    #[tokio::test]
    async fn success_passes_highlights_through() {
        let expected = vec!["One".to_string(), "Two".to_string(), "Three".to_string()];
        let service = SummaryService::new(Arc::new(Canned(expected.clone())));
        assert_eq!(service.request_summary("a", "b", "c").await, expected);
    }

    #[tokio::test]
    async fn missing_key_falls_back() {
        let client = GeminiClient::new(None, DEFAULT_MODEL, "http://127.0.0.1:9");
        let prompt = SummaryPrompt {
            title: "t".into(),
            description: "d".into(),
            subject: "s".into(),
        };
        assert!(matches!(
            client.generate(&prompt).await,
            Err(SummaryError::MissingApiKey)
        ));

        let service = SummaryService::new(Arc::new(client));
        assert_eq!(service.request_summary("t", "d", "s").await, fallback());
    }

    #[tokio::test]
    async fn gemini_client_reads_highlights() {
        let inner = json!({ "highlights": ["Linked lists", "Trees", "Sorting"] }).to_string();
        let base = stub_gemini(json!({
            "candidates": [{ "content": { "parts": [{ "text": inner }] } }]
        }))
        .await;

        let client = GeminiClient::new(Some("test-key".into()), "test-model", base);
        let service = SummaryService::new(Arc::new(client));
        let highlights = service
            .request_summary("Data Structures", "Lists and trees", "Computer Science")
            .await;

        assert_eq!(highlights, vec!["Linked lists", "Trees", "Sorting"]);
    }

    #[tokio::test]
    async fn gemini_malformed_reply_falls_back() {
        let base = stub_gemini(json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }]
        }))
        .await;

        let client = GeminiClient::new(Some("test-key".into()), "test-model", base);
        let service = SummaryService::new(Arc::new(client));
        assert_eq!(service.request_summary("a", "b", "c").await, fallback());
    }

    #[test]
    fn prompt_mentions_title_and_subject() {
        let prompt = SummaryPrompt {
            title: "Signals".into(),
            description: "Fourier".into(),
            subject: "ECE".into(),
        };
        let text = prompt.text();
        assert!(text.contains("\"Signals\""));
        assert!(text.contains("\"ECE\""));
        assert!(text.contains("Fourier"));
    }
}
