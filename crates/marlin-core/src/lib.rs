//! marlin core library
//!
//! Core types, MIME classification, and configuration shared by the parser,
//! generator, and CLI crates.

pub mod config;
pub mod content;
pub mod error;
pub mod mime;

pub use config::{Config, LanguageFallback};
pub use content::FileRef;
pub use error::{CoreError, Result};
pub use mime::{FileRole, MimeTable};
