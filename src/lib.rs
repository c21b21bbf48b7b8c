//! Catalog-driven marketing copy generation.
//!
//! A [`catalog::TemplateCatalog`] holds the segments, personas and content types of one
//! variant; a [`generator::PromptGenerator`] turns a [`request::GenerationRequest`] into a
//! single completion call against the configured model.

pub mod catalog;
pub mod config;
pub mod generator;
pub mod llm_client;
pub mod output;
pub mod prompt_builder;
pub mod request;

pub use catalog::{CatalogError, TemplateCatalog, Variant, NO_PERSONA};
pub use generator::{ConsoleFeedback, Feedback, GenerationOutcome, PromptGenerator};
pub use llm_client::{CompletionClient, GenerationError, LlmClient, LlmConfig};
pub use request::GenerationRequest;
