//! marlin CLI Library
//!
//! Command implementations and setup shared by the `marlin` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! # async fn run() -> color_eyre::eyre::Result<()> {
//! marlin::cmd::build::run(Path::new("marlin.toml"), Path::new("site"), None).await?;
//! # Ok(())
//! # }
//! ```

use std::{path::Path, sync::Arc};

pub mod cmd;

pub use marlin_core::Config;
pub use marlin_generator::{BuildReport, Builder, EngineRegistry, Stache};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Engine registry with the built-in engine bound to markup and stylesheet
/// templates.
pub fn default_engines(config: &Config) -> EngineRegistry {
    let mut engines = EngineRegistry::new(config.mime_table());
    let stache = Arc::new(Stache::new());
    engines.register(stache.clone(), ["html", "htm", "mustache"], "html");
    engines.register(stache, ["css"], "css");
    engines
}

/// Load configuration with environment overrides. A missing file means
/// defaults.
pub fn load_config(path: &Path) -> marlin_core::Result<Config> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "loading configuration");
    } else {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
    }
    Config::load_with_env(path)
}

/// Resolve the output directory: the explicit one, or `build.output_dir`
/// under the source root.
pub fn output_dir(config: &Config, source: &Path, output: Option<&Path>) -> std::path::PathBuf {
    output.map_or_else(|| source.join(&config.build.output_dir), Path::to_path_buf)
}
