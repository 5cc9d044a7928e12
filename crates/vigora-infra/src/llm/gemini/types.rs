//! Gemini Generative Language API types.
//!
//! These are Gemini-specific request/response structures used for HTTP
//! communication with the `generateContent` / `streamGenerateContent`
//! endpoints. They are NOT the generic LLM types from vigora-types -- those
//! are provider-agnostic.

use serde::{Deserialize, Serialize};

use vigora_types::llm::StopReason;

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// One conversation entry. Gemini's roles are `user` and `model`;
/// the system instruction entry carries no role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub fn text_part(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }

    /// All text parts concatenated.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Response body of `generateContent`, also the shape of every SSE chunk
/// emitted by `streamGenerateContent?alt=sse`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

impl GeminiCandidate {
    /// Text of this candidate, empty when the chunk carried none.
    pub fn text(&self) -> String {
        self.content.as_ref().map(GeminiContent::text).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

/// Map Gemini's finish reason strings to the generic [`StopReason`].
pub fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "STOP" => StopReason::Stop,
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => StopReason::ContentFilter,
        _ => StopReason::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![
                GeminiContent::text_part(Some("user"), "Oi"),
                GeminiContent::text_part(Some("model"), "Olá!"),
            ],
            system_instruction: Some(GeminiContent::text_part(None, "Be helpful.")),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(1024),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Oi");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be helpful.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_request_skips_absent_config() {
        let request = GeminiRequest {
            contents: vec![GeminiContent::text_part(Some("user"), "Oi")],
            system_instruction: None,
            generation_config: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Bora "}, {"text": "treinar!"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].text(), "Bora treinar!");
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
        let usage = response.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, 12);
        assert_eq!(usage.candidates_token_count, 5);
    }

    #[test]
    fn test_streaming_chunk_without_finish_reason() {
        let json = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Bo"}]}}]}"#;
        let chunk: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.candidates[0].text(), "Bo");
        assert!(chunk.candidates[0].finish_reason.is_none());
        assert!(chunk.usage_metadata.is_none());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason("STOP"), StopReason::Stop);
        assert_eq!(map_finish_reason("MAX_TOKENS"), StopReason::MaxTokens);
        assert_eq!(map_finish_reason("SAFETY"), StopReason::ContentFilter);
        assert_eq!(map_finish_reason("RECITATION"), StopReason::ContentFilter);
        assert_eq!(map_finish_reason("FINISH_REASON_UNSPECIFIED"), StopReason::Other);
    }
}
