//! # flourish CLI
//!
//! Command-line interface for the flourish static site generator.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flourish")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing _site.toml, generate.toml and the sources
    #[arg(long, default_value = "source", env = "FLOURISH_SOURCE")]
    source: PathBuf,

    /// Directory to write generated files to
    #[arg(long, default_value = "output", env = "FLOURISH_OUTPUT")]
    output: PathBuf,

    /// Enable verbose logging, including every file written
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the site, or only the given paths
    Generate {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,

        /// Include sources published in the future, overriding _site.toml
        #[arg(long, conflicts_with = "exclude_future")]
        include_future: bool,

        /// Exclude sources published in the future, overriding _site.toml
        #[arg(long)]
        exclude_future: bool,

        /// Paths to generate; a trailing ? also generates everything
        /// beneath the path (eg. /2016/?)
        paths: Vec<String>,
    },

    /// List every path the routes generate
    Paths {
        /// Only list the paths of this route
        name: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the template and context that would render a path
    Recipe {
        /// Path to look up (eg. /2016/06/)
        path: String,
    },

    /// Collapse paths into a short list of cache invalidations
    Invalidations {
        /// Maximum number of invalidation paths
        #[arg(long, default_value_t = 15)]
        max: usize,

        /// Paths to invalidate (defaults to every generated path)
        paths: Vec<String>,
    },
}

#[derive(Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Render the built-in HTML templates
    Html,
    /// Write each page's template name and context as JSON
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate {
            format,
            include_future,
            exclude_future,
            paths,
        } => {
            let future = match (include_future, exclude_future) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::generate(&cli.source, &cli.output, format, future, &paths)
        }
        Commands::Paths { name, json } => {
            commands::list_paths(&cli.source, &cli.output, name.as_deref(), json)
        }
        Commands::Recipe { path } => commands::show_recipe(&cli.source, &cli.output, &path),
        Commands::Invalidations { max, paths } => {
            commands::invalidations(&cli.source, &cli.output, max, &paths)
        }
    }
}
