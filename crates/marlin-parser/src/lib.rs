//! marlin parser library
//!
//! Turns raw content files into [`Document`]s. The parsing strategy is chosen
//! by MIME type:
//!
//! | MIME type | Strategy |
//! |-----------|----------|
//! | `text/plain` | heading blocks, values kept as written |
//! | `text/markdown` | heading blocks, values rendered to HTML |
//! | `application/json` | parsed directly; the top level must be an object |

pub mod blocks;
pub mod markdown;

use marlin_core::mime;
pub use markdown::MarkdownRenderer;
use serde_json::Value;
use thiserror::Error;

/// Ordered property map produced from one content file.
pub type Document = serde_json::Map<String, Value>;

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Malformed JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parsed, but its top level is not an object.
    #[error("JSON top level is {0}, expected an object")]
    NotAnObject(&'static str),

    /// No parsing strategy for this MIME type.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Dispatches raw content to the parser for its MIME type.
#[derive(Debug, Default, Clone)]
pub struct ParserRegistry {
    markdown: MarkdownRenderer,
}

impl ParserRegistry {
    /// Create a registry with the default markdown options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `content_type` has a parsing strategy.
    pub fn supports(&self, content_type: &str) -> bool {
        matches!(content_type, mime::PLAIN_TEXT | mime::MARKDOWN | mime::JSON)
    }

    /// Parse raw content of the given MIME type.
    pub fn parse(&self, content_type: &str, raw: &str) -> Result<Document> {
        match content_type {
            mime::PLAIN_TEXT => Ok(blocks::parse_blocks(raw, blocks::identity)),
            mime::MARKDOWN => Ok(blocks::parse_blocks(raw, |block| {
                self.markdown.to_html(block)
            })),
            mime::JSON => parse_json(raw),
            other => Err(ParserError::UnsupportedType(other.to_string())),
        }
    }
}

fn parse_json(raw: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(ParserError::NotAnObject("an array")),
        Value::String(_) => Err(ParserError::NotAnObject("a string")),
        Value::Number(_) => Err(ParserError::NotAnObject("a number")),
        Value::Bool(_) => Err(ParserError::NotAnObject("a boolean")),
        Value::Null => Err(ParserError::NotAnObject("null")),
    }
}
