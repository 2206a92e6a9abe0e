//! quizzer: document-grounded quiz generation and grading
//!
//! Documents are chunked and embedded into a Qdrant collection. Quizzes are
//! generated from a document's full text by a language model, stored with
//! short ids, and taken through a session state machine that grades each
//! answer and records one result per completed attempt.

pub mod backend;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod documents;
pub mod embed;
pub mod error;
pub mod extract;
pub mod llm;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod results;
pub mod retriever;
pub mod session;
pub mod sheet;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
