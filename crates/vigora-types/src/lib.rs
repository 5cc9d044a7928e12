//! Shared domain types for Vigora.
//!
//! This crate contains the core domain types used across the Vigora backend:
//! User, AuthSession, Chat, ChatMessage, Activity, the provider-agnostic LLM
//! types, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod activity;
pub mod auth;
pub mod chat;
pub mod error;
pub mod llm;
pub mod user;
