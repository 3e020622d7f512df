//! Check command - validate configuration and sources

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use marlin_generator::{Builder, CheckReport};

use crate::{default_engines, load_config, output_dir};

/// Run the check command.
///
/// Loads the configuration and inspects every source file without writing
/// output. Missing templates always fail; warnings fail only in strict mode.
pub async fn run(config_path: &Path, source: &Path, strict: bool) -> Result<CheckReport> {
    tracing::info!(?config_path, ?source, strict, "Checking configuration and sources");

    println!("Checking configuration...");
    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✓ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ✗ Configuration invalid: {e}");
            return Err(e).wrap_err("Failed to load configuration");
        }
    };
    println!("  Languages: {}", config.render_languages().join(", "));

    println!("\nChecking sources...");
    let output = output_dir(&config, source, None);
    let engines = default_engines(&config);
    let builder = Builder::new(config, engines, source, output);
    let check = builder.check().await.wrap_err("Check failed")?;

    println!("  Routes:        {}", check.routes);
    println!("  Content files: {}", check.content_files);

    let warnings = &check.report.diagnostics;
    println!();
    println!("Summary:");
    println!("  Errors:   {}", check.missing_templates.len());
    println!("  Warnings: {}", warnings.len());

    if !check.missing_templates.is_empty() {
        println!();
        println!("Errors:");
        for missing in &check.missing_templates {
            println!(
                "  ✗ no template named {:?} for {}",
                missing.name,
                missing.path.display()
            );
        }
    }

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for diagnostic in warnings {
            println!("  ⚠ {diagnostic}");
        }
    }

    if !check.is_ok() {
        bail!(
            "Validation failed with {} error(s)",
            check.missing_templates.len()
        );
    }

    if strict && check.report.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(check)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["home", "templates", "partials", "commons"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_check_passes_clean_site() {
        let dir = site(&[
            ("home/home.md", "Title:\nHome\n"),
            ("templates/home.html", "{{Title}}"),
        ]);

        let check = run(&dir.path().join("marlin.toml"), dir.path(), true)
            .await
            .unwrap();

        assert_eq!(check.routes, 1);
        assert_eq!(check.content_files, 1);
        assert!(!dir.path().join("build").exists());
    }

    #[tokio::test]
    async fn test_check_fails_on_missing_template() {
        let dir = site(&[("home/home.md", "Title:\nHome\n")]);

        let result = run(&dir.path().join("marlin.toml"), dir.path(), false).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_check_strict_fails_on_warnings() {
        let dir = site(&[
            ("home/home.json", "{ not json"),
            ("templates/home.html", "{{title}}"),
        ]);
        let config = dir.path().join("marlin.toml");

        assert!(run(&config, dir.path(), false).await.is_ok());
        assert!(run(&config, dir.path(), true).await.is_err());
    }

    #[tokio::test]
    async fn test_check_rejects_invalid_config() {
        let dir = site(&[]);
        let config = dir.path().join("marlin.toml");
        fs::write(&config, "[site]\ndefault_language = \"\"\n").unwrap();

        assert!(run(&config, dir.path(), false).await.is_err());
    }
}
