use std::time::Duration;

use reqwest::Client;

use super::PlanSource;
use super::error::PlannerError;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, PlanRequest,
    RawPlan, build_prompt, parse_plan_text,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Plan request client against the Gemini `generateContent` endpoint.
///
/// Advisory only: this client never touches the browser. The API key is
/// resolved once at startup and held immutably here.
pub struct GeminiPlanner {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiPlanner {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, API_BASE.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            model,
            client,
            base_url,
        }
    }
}

impl PlanSource for GeminiPlanner {
    async fn request_plan(&self, req: &PlanRequest) -> Result<RawPlan, PlannerError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(req),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 512,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(PlannerError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PlannerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| PlannerError::Unparseable(format!("malformed envelope: {e}")))?;
        let text: String = envelope
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        parse_plan_text(&text).map_err(PlannerError::Unparseable)
    }
}
