//! Render engine registry.
//!
//! Engines are keyed by the MIME type of the template segment they compile.
//! Registration derives MIME types from file extensions through the
//! [`MimeTable`], so `html` and `htm` both land on `text/html`. Registering
//! another engine for a MIME type replaces the earlier one.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use marlin_core::MimeTable;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Partial name to raw partial source.
pub type Partials = BTreeMap<String, String>;

/// Errors raised by a render engine for one template segment.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A `{{` without its closing delimiter.
    #[error("unclosed tag at byte {0}")]
    UnclosedTag(usize),

    /// A tag with no name.
    #[error("empty tag at byte {0}")]
    EmptyTag(usize),

    /// A section opened but never closed.
    #[error("unclosed section: {0}")]
    UnclosedSection(String),

    /// A section closed that was not the innermost open one.
    #[error("unexpected section close: {0}")]
    UnexpectedClose(String),

    /// Partials nested past the recursion limit.
    #[error("partial recursion too deep at {0}")]
    PartialDepth(String),

    /// Failure reported by an external engine.
    #[error("{0}")]
    Custom(String),
}

/// A template compiler for one or more MIME types.
///
/// Engines are shared across concurrently rendered pages, so any state they
/// keep (such as registered partials) needs interior mutability.
pub trait RenderEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Render `template` against `view`.
    ///
    /// `partials` holds every partial with the same MIME type as the
    /// template.
    fn render(
        &self,
        template: &str,
        view: &Value,
        partials: &Partials,
    ) -> Result<String, EngineError>;

    /// Whether [`RenderEngine::register_partial`] does anything.
    fn supports_partials(&self) -> bool {
        false
    }

    /// Pre-register a partial before any page renders.
    fn register_partial(&self, _name: &str, _content: &str) -> Result<(), EngineError> {
        Ok(())
    }
}

/// One engine bound to a MIME type.
#[derive(Clone)]
pub struct Registration {
    pub engine: Arc<dyn RenderEngine>,
    pub output_extension: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("engine", &self.engine.name())
            .field("output_extension", &self.output_extension)
            .finish()
    }
}

/// MIME type to engine table.
///
/// Built before a build starts and only read while pages render.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    mime: MimeTable,
    engines: HashMap<String, Registration>,
}

impl EngineRegistry {
    /// Create an empty registry resolving extensions through `mime`.
    pub fn new(mime: MimeTable) -> Self {
        Self {
            mime,
            engines: HashMap::new(),
        }
    }

    /// Register `engine` for every extension in `extensions`.
    ///
    /// Extensions without a MIME type are skipped with a warning. Returns
    /// the number of MIME types bound.
    pub fn register<I, S>(
        &mut self,
        engine: Arc<dyn RenderEngine>,
        extensions: I,
        output_extension: &str,
    ) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bound = 0;
        for ext in extensions {
            let ext = ext.as_ref();
            let Some(mime) = self.mime.for_extension(ext) else {
                warn!(ext, engine = engine.name(), "no MIME type for extension, skipping");
                continue;
            };
            let mime = mime.to_string();

            let registration = Registration {
                engine: Arc::clone(&engine),
                output_extension: output_extension.to_string(),
            };
            if let Some(previous) = self.engines.insert(mime.clone(), registration) {
                debug!(
                    %mime,
                    previous = previous.engine.name(),
                    engine = engine.name(),
                    "engine replaced"
                );
            } else {
                debug!(%mime, engine = engine.name(), output = output_extension, "engine registered");
            }
            bound += 1;
        }
        bound
    }

    /// Engine registered for a MIME type.
    pub fn get(&self, mime: &str) -> Option<&Registration> {
        self.engines.get(mime)
    }

    pub fn contains(&self, mime: &str) -> bool {
        self.engines.contains_key(mime)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
