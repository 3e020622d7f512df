//! Build command - compiles the site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use marlin_generator::{BuildReport, Builder};

use crate::{default_engines, load_config, output_dir};

/// Run the build command.
///
/// Compiles the site under `source` into `output`, or into the configured
/// output directory under the source root.
pub async fn run(config_path: &Path, source: &Path, output: Option<&Path>) -> Result<BuildReport> {
    let start = Instant::now();
    tracing::info!(?config_path, ?source, ?output, "Starting build");

    let config = load_config(config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let output = output_dir(&config, source, output);
    let engines = default_engines(&config);
    let builder = Builder::new(config, engines, source, &output);

    let report = builder.build().await.wrap_err("Build failed")?;
    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Pages:       {}", report.pages);
    println!("  Stylesheets: {}", report.stylesheets);
    println!("  Other:       {}", report.other_artifacts);
    println!(
        "  Assets:      {} copied, {} up to date",
        report.assets_copied, report.assets_up_to_date
    );
    println!();
    println!("  Duration:    {:.2}s", duration.as_secs_f64());
    println!("  Output:      {}", output.display());
    println!();

    if report.has_warnings() {
        println!("  Warnings:");
        for diagnostic in &report.diagnostics {
            println!("  ⚠ {diagnostic}");
        }
        println!();
    }

    tracing::info!(
        pages = report.pages,
        warnings = report.diagnostics.len(),
        ?duration,
        "Build completed successfully"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scaffold(root: &Path) {
        for dir in ["home", "templates", "partials", "commons"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[tokio::test]
    async fn test_build_into_configured_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        scaffold(root);
        write(root, "home/home.txt", "Title:\nHi\n");
        write(root, "templates/home.html", "<h1>{{Title}}</h1>");
        write(
            root,
            "marlin.toml",
            "[build]\noutput_dir = \"public\"\n\n[site]\nlanguages = [\"en\", \"se\"]\n",
        );

        let report = run(&root.join("marlin.toml"), root, None).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(
            fs::read_to_string(root.join("public/home/index.html")).unwrap(),
            "<h1>Hi</h1>"
        );
        assert!(root.join("public/se/home/index.html").exists());
    }

    #[tokio::test]
    async fn test_build_output_override() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let root = dir.path();
        scaffold(root);
        write(root, "home/home.txt", "Title:\nHi\n");
        write(root, "templates/home.html", "{{Title}}");

        run(&root.join("missing.toml"), root, Some(out.path()))
            .await
            .unwrap();

        assert!(out.path().join("home/index.html").exists());
        assert!(!root.join("build").exists());
    }

    #[tokio::test]
    async fn test_build_fails_without_source_tree() {
        let dir = tempfile::tempdir().unwrap();

        let result = run(&dir.path().join("marlin.toml"), dir.path(), None).await;

        assert!(result.is_err());
    }
}
