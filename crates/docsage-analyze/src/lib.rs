//! Document analysis over external LLM APIs (Gemini/OpenAI).
//!
//! `AnalysisClient` owns the request shape, truncation policy and credential
//! check; a `GenerationBackend` only moves one request over the wire.
//! The concrete backend is picked from `ClientConfig::provider`.

pub mod backend;
pub mod client;
pub mod config;
pub mod providers;
pub mod types;

pub use backend::{create_backend, GenerationBackend};
pub use client::{AnalysisClient, SYSTEM_INSTRUCTION, TRUNCATION_NOTICE};
pub use config::ClientConfig;
pub use types::*;
