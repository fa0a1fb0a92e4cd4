//! CLI entry point for folio

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::build::CancelToken;
use folio::commands::build::BuildOptions;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Collects Markdown content with front-matter into a site model", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post or page
    New {
        /// Layout to use (post, page, draft)
        #[arg(short, long, default_value = "post")]
        layout: String,

        /// Title of the new post
        title: String,

        /// Path for the new post, relative to the source directory
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Collect content and assemble the site model
    #[command(alias = "b")]
    Build {
        /// Include drafts in published indices
        #[arg(long)]
        drafts: bool,

        /// Treat per-file errors as fatal
        #[arg(long)]
        strict: bool,

        /// Print the summary and site manifest as JSON
        #[arg(long)]
        json: bool,

        /// Rebuild whenever content or configuration changes
        #[arg(short, long)]
        watch: bool,
    },

    /// List site information
    List {
        /// Type of content to list (post, page, draft, tag, menu)
        #[arg(default_value = "post")]
        r#type: String,

        /// Include drafts in published indices
        #[arg(long)]
        drafts: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "folio=debug,info"
    } else {
        "folio=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            folio::commands::init::init_site(&target_dir)?;
            println!("Initialized empty site in {:?}", target_dir);
        }

        Commands::New {
            layout,
            title,
            path,
        } => {
            let project = folio::Project::new(&base_dir)?;
            tracing::info!("Creating new {} with title: {}", layout, title);
            folio::commands::new::run(&project, &title, &layout, path.as_deref())?;
        }

        Commands::Build {
            drafts,
            strict,
            json,
            watch,
        } => {
            let options = BuildOptions {
                drafts,
                strict,
                json,
            };
            let project = options.load_project(&base_dir)?;

            // Ctrl+C stops a running build between files, and ends watch mode
            let cancel = CancelToken::new();
            let handler_token = cancel.clone();
            ctrlc::set_handler(move || {
                tracing::info!("Interrupted, stopping...");
                handler_token.cancel();
            })
            .context("Failed to set Ctrl+C handler")?;

            tracing::info!("Building site model...");
            let build = folio::commands::build::run(&project, &options, &cancel)?;

            if watch {
                folio::commands::build::watch(&project, &options, &cancel).await?;
            } else if !build.is_success() {
                anyhow::bail!(
                    "Build failed with {} fatal error(s)",
                    build.summary.fatal().count()
                );
            }
        }

        Commands::List { r#type, drafts } => {
            let options = BuildOptions {
                drafts,
                ..Default::default()
            };
            let project = options.load_project(&base_dir)?;
            folio::commands::list::run(&project, &r#type)?;
        }

        Commands::Version => {
            println!("folio version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
