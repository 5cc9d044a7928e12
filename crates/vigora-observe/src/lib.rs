//! Observability for Vigora: tracing subscriber setup and GenAI span
//! attribute constants.

pub mod genai_attrs;
pub mod tracing_setup;
