//! Natural-language-to-SQL translation.
//!
//! Builds a schema-grounded prompt, sends one chat-completion request to the
//! DeepSeek API, and parses the completion into a SQL statement and an
//! explanation.
//!
//! Translation is a one-shot operation: nothing is cached, and an
//! unparseable completion is a valid terminal outcome (empty SQL, raw
//! completion as explanation) rather than an error.

mod client;
mod parser;
mod prompt;

pub use client::{Translator, DEEPSEEK_API_KEY_VAR};
pub use parser::parse_completion;
pub use prompt::{build_system_prompt, build_user_prompt};

use thiserror::Error;

/// Errors that can occur while requesting a translation.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// No API key was configured or found in the environment.
    #[error(
        "no DeepSeek API key: set `deepseek.api_key` in the config file or the DEEPSEEK_API_KEY environment variable"
    )]
    MissingApiKey,

    /// The completion API answered with a non-success status.
    #[error("completion API returned HTTP {status}: {body}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The response body, truncated.
        body: String,
    },

    /// The completion request could not be sent or the connection failed.
    #[error("completion request failed: {detail}")]
    Network {
        /// The underlying failure.
        detail: String,
    },

    /// The response body did not carry a completion.
    #[error("malformed completion response: {detail}")]
    Shape {
        /// What was missing or wrong.
        detail: String,
    },
}

/// A natural-language query translated into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// The generated SQL statement; empty when no statement was recognised.
    pub sql: String,
    /// The model's explanation, or the raw completion when unlabelled.
    pub explanation: String,
}

impl Translation {
    /// Wraps a translation failure as the empty-SQL terminal outcome, so
    /// callers can present the failure text to an end user.
    #[must_use]
    pub fn failure(error: &TranslateError) -> Self {
        Self {
            sql: String::new(),
            explanation: format!("translation failed: {error}"),
        }
    }
}
