//! Everything that talks to the hosted model: the HTTP client, the prompt
//! templates, SQL and insight generation, and a parser-backed check on what
//! the generated SQL would do.

pub mod client;
pub mod error;
pub mod generator;
pub mod guard;
pub mod models;
pub mod prompt;

pub use client::{Completion, GeminiClient};
pub use error::GenerationError;
pub use generator::{InsightGenerator, SqlGenerator, INSIGHT_FALLBACK};
pub use guard::{classify, Verdict};
pub use models::ModelInfo;
