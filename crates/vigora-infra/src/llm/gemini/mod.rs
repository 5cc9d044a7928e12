//! Gemini LLM provider (Google Generative Language API).

mod client;
mod streaming;
mod types;

pub use client::GeminiProvider;
