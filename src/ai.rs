//! Optional copy-writing assistant backed by a hosted generative text model.
//!
//! Every operation degrades to a fallback value instead of failing: callers
//! only ever pre-fill form fields or chat bubbles with the result.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::models::Lang;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("reply is not a JSON string array: {0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Ask the service for a JSON array of strings instead of free text.
    pub string_array: bool,
}

impl GenerationRequest {
    pub fn text(prompt: String) -> Self {
        GenerationRequest {
            prompt,
            string_array: false,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, AiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Google Generative Language REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        GeminiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let generation_config = request.string_array.then(|| {
            json!({
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } }
            })
        });
        let body = GenerateContentBody {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            generation_config,
        };

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = resp.json().await?;
        Ok(reply
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Product,
    Article,
}

impl ContentKind {
    fn as_str(self) -> &'static str {
        match self {
            ContentKind::Product => "product",
            ContentKind::Article => "article",
        }
    }
}

fn strip_code_fences(raw: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"```(?:json)?").expect("valid fence pattern"));
    fence.replace_all(raw, "").trim().to_string()
}

#[derive(Clone, Default)]
pub struct ContentAssistant {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ContentAssistant {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        ContentAssistant {
            generator: Some(generator),
        }
    }

    /// Assistant with no backing service; every call returns its fallback.
    pub fn disabled() -> Self {
        ContentAssistant::default()
    }

    pub fn from_config(config: &AiConfig) -> Self {
        match &config.api_key {
            Some(key) => ContentAssistant::new(Arc::new(GeminiClient::new(
                key.clone(),
                config.model.clone(),
                config.base_url.clone(),
            ))),
            None => {
                warn!("No AI API key configured, content assistant disabled");
                ContentAssistant::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    async fn ask(&self, request: GenerationRequest) -> Result<String, AiError> {
        match &self.generator {
            Some(generator) => generator.generate(request).await,
            None => Ok(String::new()),
        }
    }

    pub async fn optimize_for_seo(&self, kind: ContentKind, content: &str, lang: Lang) -> String {
        let prompt = format!(
            "You are an SEO expert for a charcoal company called \"Fahm Al-Assema\" (Capital Charcoal).\n\
             Optimize the following {} content for search engines in {}.\n\
             Make it professional, engaging, and include relevant keywords.\n\
             Content: {}",
            kind.as_str(),
            lang.display_name(),
            content
        );
        match self.ask(GenerationRequest::text(prompt)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!("Empty SEO reply, keeping original content");
                content.to_string()
            }
            Err(e) => {
                warn!("SEO optimization failed: {}", e);
                content.to_string()
            }
        }
    }

    pub async fn draft_article(&self, title: &str, lang: Lang) -> Option<String> {
        let prompt = format!(
            "Write a professional blog post for a charcoal company's website about: \"{}\".\n\
             The language should be {}.\n\
             Include an introduction, 3 main points, and a call to action.",
            title,
            lang.display_name()
        );
        match self.ask(GenerationRequest::text(prompt)).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!("Article draft failed: {}", e);
                None
            }
        }
    }

    pub async fn expert_advice(&self, query: &str, lang: Lang) -> String {
        let prompt = format!(
            "You are a technical expert at \"Capital Charcoal Factory\" in Egypt.\n\
             Answer the user query concisely (max 80 words).\n\
             Language: {}.\n\
             Query: {}",
            lang.display_name(),
            query
        );
        match self.ask(GenerationRequest::text(prompt)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => match lang {
                Lang::Ar => "عذراً، لا يمكنني الرد حالياً.".to_string(),
                Lang::En => "Sorry, I can't reply right now.".to_string(),
            },
            Err(e) => {
                warn!("Expert chat failed: {}", e);
                match lang {
                    Lang::Ar => "عذراً، الخبير مشغول حالياً.".to_string(),
                    Lang::En => "Sorry, the expert is busy right now.".to_string(),
                }
            }
        }
    }

    pub async fn slogans(&self, category: &str) -> Vec<String> {
        let request = GenerationRequest {
            prompt: format!(
                "Generate 3 marketing slogans for {category} charcoal. Return as JSON array of strings."
            ),
            string_array: true,
        };
        let raw = match self.ask(request).await {
            Ok(raw) if !raw.trim().is_empty() => raw,
            Ok(_) => return Vec::new(),
            Err(e) => {
                warn!("Slogan generation failed: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&strip_code_fences(&raw)) {
            Ok(slogans) => slogans,
            Err(e) => {
                warn!("{}", AiError::Shape(e));
                Vec::new()
            }
        }
    }
}
