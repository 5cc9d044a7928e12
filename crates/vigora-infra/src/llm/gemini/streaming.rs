//! SSE stream adapter for `streamGenerateContent?alt=sse`.
//!
//! Gemini streams a sequence of `data:` events, each a full
//! `GenerateContentResponse` chunk carrying a slice of candidate text. The
//! final chunk carries `finishReason` and `usageMetadata`; the SSE body then
//! simply ends -- there is no terminal marker. This adapter maps that onto
//! the provider-agnostic [`StreamEvent`] contract, where [`StreamEvent::Done`]
//! is only emitted after a finish reason was seen; a body that ends without
//! one yields a stream error instead (truncated response).

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

use vigora_types::llm::{LlmError, StreamEvent, Usage};

use super::types::{GeminiResponse, map_finish_reason};

/// Map an SSE byte stream from the Gemini API to a stream of [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `TextDelta` -- for each non-empty slice of candidate text
/// 2. `MessageDelta` -- when the chunk carrying `finishReason` arrives
/// 3. `Usage` -- from the last `usageMetadata` seen
/// 4. `Done` -- after the SSE body ends, iff a finish reason was seen
pub fn map_gemini_stream<S, B, E>(
    byte_stream: S,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut events = std::pin::pin!(byte_stream.eventsource());
        let mut saw_finish = false;
        let mut usage: Option<Usage> = None;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            if event.data.trim().is_empty() {
                continue;
            }

            let chunk: GeminiResponse = serde_json::from_str(&event.data)
                .map_err(|e| LlmError::Deserialization(format!("stream chunk: {e}")))?;

            if let Some(meta) = &chunk.usage_metadata {
                usage = Some(Usage {
                    input_tokens: meta.prompt_token_count,
                    output_tokens: meta.candidates_token_count,
                });
            }

            if let Some(candidate) = chunk.candidates.first() {
                let text = candidate.text();
                if !text.is_empty() {
                    yield StreamEvent::TextDelta { text };
                }
                if let Some(reason) = candidate.finish_reason.as_deref() {
                    saw_finish = true;
                    yield StreamEvent::MessageDelta {
                        stop_reason: map_finish_reason(reason),
                    };
                }
            }
        }

        if !saw_finish {
            Err(LlmError::Stream(
                "stream ended without finish reason".to_string(),
            ))?;
        }

        if let Some(usage) = usage {
            yield StreamEvent::Usage(usage);
        }
        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use vigora_types::llm::StopReason;

    fn sse(chunks: Vec<&str>) -> Vec<Result<String, Infallible>> {
        chunks
            .into_iter()
            .map(|data| Ok(format!("data: {data}\n\n")))
            .collect()
    }

    async fn collect(
        frames: Vec<Result<String, Infallible>>,
    ) -> Vec<Result<StreamEvent, LlmError>> {
        map_gemini_stream(futures_util::stream::iter(frames))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_maps_deltas_finish_usage_done() {
        let events = collect(sse(vec![
            r#"{"candidates": [{"content": {"parts": [{"text": "Bora "}]}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"text": "treinar!"}]}, "finishReason": "STOP"}], "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 4}}"#,
        ]))
        .await;

        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], StreamEvent::TextDelta { text } if text == "Bora "));
        assert!(matches!(&events[1], StreamEvent::TextDelta { text } if text == "treinar!"));
        assert!(matches!(
            events[2],
            StreamEvent::MessageDelta {
                stop_reason: StopReason::Stop
            }
        ));
        assert!(matches!(&events[3], StreamEvent::Usage(u) if u.output_tokens == 4));
        assert!(matches!(events[4], StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error_not_done() {
        let events = collect(sse(vec![
            r#"{"candidates": [{"content": {"parts": [{"text": "Bo"}]}}]}"#,
            // body ends with no finishReason chunk
        ]))
        .await;

        assert!(matches!(
            &events[0],
            Ok(StreamEvent::TextDelta { text }) if text == "Bo"
        ));
        assert!(matches!(events[1], Err(LlmError::Stream(_))));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_a_deserialization_error() {
        let events = collect(sse(vec!["{not json"])).await;
        assert!(matches!(events[0], Err(LlmError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_empty_text_chunks_emit_no_delta() {
        let events = collect(sse(vec![
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#,
        ]))
        .await;

        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();
        assert!(matches!(
            events[0],
            StreamEvent::MessageDelta {
                stop_reason: StopReason::MaxTokens
            }
        ));
        assert!(matches!(events[1], StreamEvent::Done));
    }
}
