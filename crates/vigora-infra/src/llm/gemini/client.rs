//! GeminiProvider -- concrete [`LlmProvider`] implementation for the Google
//! Generative Language API.
//!
//! Sends requests to `models/{model}:generateContent` (buffered) and
//! `models/{model}:streamGenerateContent?alt=sse` (streamed) with the API key
//! in the `x-goog-api-key` header.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;

use vigora_core::llm::provider::LlmProvider;
use vigora_observe::genai_attrs;
use vigora_types::llm::{
    ChatRole, CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};

use super::streaming::map_gemini_stream;
use super::types::{
    GeminiContent, GeminiGenerationConfig, GeminiRequest, GeminiResponse, map_finish_reason,
};

/// Gemini LLM provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing the request header. It never appears in Debug output,
/// Display output, or tracing logs.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key wrapped in SecretString
    /// * `model` - Model identifier (e.g., "gemini-1.5-flash")
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }

    /// Convert a generic [`CompletionRequest`] into a [`GeminiRequest`].
    ///
    /// Gemini names the assistant role `model` and carries the system
    /// instruction as a role-less content entry.
    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                GeminiContent::text_part(Some(role), &m.content)
            })
            .collect();

        let generation_config =
            if request.temperature.is_some() || request.max_output_tokens.is_some() {
                Some(GeminiGenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                })
            } else {
                None
            };

        GeminiRequest {
            contents,
            system_instruction: request
                .system
                .as_deref()
                .map(|text| GeminiContent::text_part(None, text)),
            generation_config,
        }
    }
}

// GeminiProvider intentionally does NOT derive Debug: the SecretString field
// keeps the key out of accidental prints, and omitting Debug entirely keeps
// the rest of the request state out too.

fn status_to_error(status: reqwest::StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        400 => LlmError::InvalidRequest(body),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited,
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_gemini_request(request);
        let url = self.url(&request.model, "generateContent");

        let span = tracing::info_span!(
            "chat",
            { genai_attrs::GEN_AI_OPERATION_NAME } = genai_attrs::OP_CHAT,
            { genai_attrs::GEN_AI_PROVIDER_NAME } = genai_attrs::PROVIDER_GEMINI,
            { genai_attrs::GEN_AI_REQUEST_MODEL } = %request.model,
        );

        async {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", self.api_key.expose_secret())
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::Provider {
                    message: format!("HTTP request failed: {e}"),
                })?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                return Err(status_to_error(status, error_body));
            }

            let gemini_resp: GeminiResponse = response.json().await.map_err(|e| {
                LlmError::Deserialization(format!("failed to parse response: {e}"))
            })?;

            let candidate = gemini_resp
                .candidates
                .first()
                .ok_or_else(|| LlmError::Deserialization("response had no candidates".to_string()))?;

            let usage = gemini_resp.usage_metadata.as_ref().map(|meta| Usage {
                input_tokens: meta.prompt_token_count,
                output_tokens: meta.candidates_token_count,
            });

            let stop_reason = candidate
                .finish_reason
                .as_deref()
                .map(map_finish_reason)
                .unwrap_or(StopReason::Stop);

            if let Some(usage) = &usage {
                tracing::info!(
                    { genai_attrs::GEN_AI_USAGE_INPUT_TOKENS } = usage.input_tokens,
                    { genai_attrs::GEN_AI_USAGE_OUTPUT_TOKENS } = usage.output_tokens,
                    { genai_attrs::GEN_AI_RESPONSE_FINISH_REASONS } = %stop_reason,
                    "completion finished"
                );
            }

            Ok(CompletionResponse {
                content: candidate.text(),
                stop_reason,
                usage,
            })
        }
        .instrument(span)
        .await
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let body = self.to_gemini_request(&request);
        let url = self.url(&request.model, "streamGenerateContent?alt=sse");
        let client = self.client.clone();
        let api_key = self.api_key.clone();

        Box::pin(async_stream::try_stream! {
            let response = client
                .post(&url)
                .header("x-goog-api-key", api_key.expose_secret())
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::Provider {
                    message: format!("HTTP request failed: {e}"),
                })?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                Err(status_to_error(status, error_body))?;
            } else {
                let mut events = map_gemini_stream(response.bytes_stream());
                while let Some(event) = events.next().await {
                    yield event?;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigora_types::llm::LlmMessage;

    fn make_provider() -> GeminiProvider {
        GeminiProvider::new(
            SecretString::from("test-key-not-real"),
            "gemini-1.5-flash".to_string(),
        )
    }

    fn make_request() -> CompletionRequest {
        CompletionRequest {
            model: "gemini-1.5-flash".to_string(),
            messages: vec![
                LlmMessage {
                    role: ChatRole::User,
                    content: "Oi".to_string(),
                },
                LlmMessage {
                    role: ChatRole::Assistant,
                    content: "Olá!".to_string(),
                },
            ],
            system: Some("Be helpful.".to_string()),
            max_output_tokens: Some(1024),
            temperature: None,
        }
    }

    #[test]
    fn test_provider_name_and_model() {
        let provider = make_provider();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_to_gemini_request_maps_roles() {
        let provider = make_provider();
        let gemini_req = provider.to_gemini_request(&make_request());

        assert_eq!(gemini_req.contents.len(), 2);
        assert_eq!(gemini_req.contents[0].role.as_deref(), Some("user"));
        assert_eq!(gemini_req.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            gemini_req.system_instruction.as_ref().unwrap().text(),
            "Be helpful."
        );
        assert_eq!(
            gemini_req.generation_config.as_ref().unwrap().max_output_tokens,
            Some(1024)
        );
    }

    #[test]
    fn test_to_gemini_request_without_tuning_has_no_config() {
        let provider = make_provider();
        let mut request = make_request();
        request.max_output_tokens = None;
        request.temperature = None;

        let gemini_req = provider.to_gemini_request(&request);
        assert!(gemini_req.generation_config.is_none());
    }

    #[test]
    fn test_url_layout_and_base_override() {
        let provider = make_provider().with_base_url("http://localhost:8080".to_string());
        assert_eq!(
            provider.url("gemini-1.5-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            provider.url("gemini-1.5-flash", "streamGenerateContent?alt=sse"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_status_to_error_mapping() {
        assert!(matches!(
            status_to_error(reqwest::StatusCode::BAD_REQUEST, String::new()),
            LlmError::InvalidRequest(_)
        ));
        assert!(matches!(
            status_to_error(reqwest::StatusCode::UNAUTHORIZED, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_to_error(reqwest::StatusCode::FORBIDDEN, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_to_error(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited
        ));
        assert!(matches!(
            status_to_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            LlmError::Provider { .. }
        ));
    }
}
