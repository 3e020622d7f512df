//! Site configuration management.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    mime::MimeTable,
};

/// Main configuration structure for marlin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Source layout and output settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Extra `extension = "mime/type"` pairs on top of the built-in table.
    #[serde(default)]
    pub mime: BTreeMap<String, String>,
}

/// How a page picks content when no file matches the requested language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageFallback {
    /// Use the first content file in (name-sorted) traversal order.
    #[default]
    #[serde(rename = "first")]
    FirstAvailable,
    /// Use the default-language file, or nothing.
    #[serde(rename = "default")]
    DefaultLanguage,
}

/// Site-wide language configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Default language code, implied by untagged file names.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages to render. The default language is always rendered.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Fallback policy for pages missing the requested language.
    #[serde(default)]
    pub fallback: LanguageFallback,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Content tree directory, relative to the source root.
    #[serde(default = "default_home_dir")]
    pub home_dir: String,

    /// Templates directory, relative to the source root.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Partials directory, relative to the source root.
    #[serde(default = "default_partials_dir")]
    pub partials_dir: String,

    /// Shared data directory, relative to the source root.
    #[serde(default = "default_commons_dir")]
    pub commons_dir: String,

    /// Output directory for the generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

// Default value functions
fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec![default_language()]
}

fn default_home_dir() -> String {
    "home".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_partials_dir() -> String {
    "partials".to_string()
}

fn default_commons_dir() -> String {
    "commons".to_string()
}

fn default_output_dir() -> String {
    "build".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            languages: default_languages(),
            fallback: LanguageFallback::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            templates_dir: default_templates_dir(),
            partials_dir: default_partials_dir(),
            commons_dir: default_commons_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Load configuration layered with `MARLIN__*` environment variables.
    ///
    /// The file is optional; without it the defaults plus environment apply.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("MARLIN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("site.languages")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_language(&self.site.default_language)
            .map_err(|msg| CoreError::config(format!("site.default_language {msg}")))?;

        for lang in &self.site.languages {
            validate_language(lang)
                .map_err(|msg| CoreError::config(format!("site.languages entry {lang:?} {msg}")))?;
        }

        if self.mime.keys().any(|ext| ext.trim_start_matches('.').is_empty()) {
            return Err(CoreError::config("mime extensions cannot be empty"));
        }

        if !self.site.languages.contains(&self.site.default_language) {
            tracing::debug!(
                default = %self.site.default_language,
                "default language not listed in site.languages, rendering it anyway"
            );
        }

        Ok(())
    }

    /// Languages to render, default language first, without duplicates.
    pub fn render_languages(&self) -> Vec<String> {
        let mut languages = vec![self.site.default_language.clone()];
        for lang in &self.site.languages {
            if !languages.contains(lang) {
                languages.push(lang.clone());
            }
        }
        languages
    }

    /// Output root for a language: the destination itself for the default
    /// language, `<dest>/<lang>` otherwise.
    pub fn output_root(&self, dest: &Path, lang: &str) -> PathBuf {
        if lang == self.site.default_language {
            dest.to_path_buf()
        } else {
            dest.join(lang)
        }
    }

    /// The built-in MIME table with the configured overrides applied.
    pub fn mime_table(&self) -> MimeTable {
        self.mime
            .iter()
            .fold(MimeTable::new(), |table, (ext, mime)| table.with(ext, mime.clone()))
    }
}

fn validate_language(lang: &str) -> std::result::Result<(), &'static str> {
    if lang.is_empty() {
        return Err("cannot be empty");
    }
    if lang.contains(['.', '/', '\\']) {
        return Err("cannot contain '.' or path separators");
    }
    Ok(())
}
