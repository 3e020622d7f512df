//! marlin CLI
//!
//! Static site compiler for multi-language content trees.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for marlin.
#[derive(Parser)]
#[command(
    name = "marlin",
    version,
    about = "A static site compiler for multi-language content trees"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "marlin.toml", global = true)]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Compile the site into the output directory
    Build {
        /// Site source root (contains home, templates, partials, commons)
        #[arg(short, long, default_value = ".")]
        source: PathBuf,
        /// Output directory (defaults to build.output_dir under the source root)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate sources without writing anything
    Check {
        /// Site source root
        #[arg(short, long, default_value = ".")]
        source: PathBuf,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    marlin::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { source, output } => {
            marlin::cmd::build::run(&cli.config, &source, output.as_deref()).await?;
        }
        Commands::Check { source, strict } => {
            marlin::cmd::check::run(&cli.config, &source, strict).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["marlin", "build", "--output", "dist"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, PathBuf::from("marlin.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build { source, output } => {
                assert_eq!(source, PathBuf::from("."));
                assert_eq!(output, Some(PathBuf::from("dist")));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_defaults() {
        let args = ["marlin", "build"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Build { output, .. } => assert!(output.is_none()),
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let args = ["marlin", "check", "--source", "site", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { source, strict } => {
                assert_eq!(source, PathBuf::from("site"));
                assert!(strict);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let args = ["marlin", "-vvv", "build"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = ["marlin", "build", "-vv", "--config", "site.toml"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["marlin"]).is_err());
    }
}
