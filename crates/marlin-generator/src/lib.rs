//! marlin generator library
//!
//! Compiles a content tree into a static site.
//!
//! # Modules
//!
//! - [`route`] - Content tree scanning into route nodes
//! - [`fileset`] - Flat loader for templates, partials and commons
//! - [`engine`] - Render engine trait and MIME-keyed registry
//! - [`stache`] - Built-in mustache-style engine
//! - [`page`] - Per-route, per-language page rendering
//! - [`assets`] - Timestamp-based asset synchronization
//! - [`report`] - Build diagnostics and counters
//! - [`build`] - Build orchestration
//! - [`check`] - Dry-run validation

pub mod assets;
pub mod build;
pub mod check;
mod dirs;
pub mod engine;
pub mod fileset;
pub mod page;
pub mod report;
pub mod route;
pub mod stache;

pub use assets::{AssetError, SyncOutcome};
pub use build::{BuildError, Builder, Site};
pub use check::{CheckReport, MissingTemplate};
pub use engine::{EngineError, EngineRegistry, Partials, Registration, RenderEngine};
pub use fileset::FileSet;
pub use page::{Artifacts, PageRenderer};
pub use report::{BuildReport, Diagnostic, DiagnosticKind};
pub use route::{RouteNode, RouteTreeBuilder};
pub use stache::Stache;
