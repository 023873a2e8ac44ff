use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "easel")]
#[command(version, about = "Generate, preview, and export AI-generated visual sketches")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a batch of sketch candidates from a prompt
    Generate {
        /// What to draw
        prompt: String,

        /// Reference image attached to the prompt
        #[arg(long)]
        image: Option<PathBuf>,

        /// Number of candidates to request concurrently
        #[arg(short = 'n', long)]
        candidates: Option<usize>,

        /// Directory to write candidate sources into
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Generate a video clip via the long-running job API
    Video {
        /// What the clip should show
        prompt: String,

        /// Output file (defaults to a timestamped .mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run sketch sources in isolated sandboxes and report their lifecycle
    Render {
        /// Sketch source files, one candidate each
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Addons to inject, in order (comma-separated ids)
        #[arg(long, value_delimiter = ',')]
        addons: Vec<String>,
    },
    /// Export a sketch as a self-contained runnable HTML bundle
    Export {
        /// Sketch source file
        source: PathBuf,

        /// Addons to reference, in order (comma-separated ids)
        #[arg(long, value_delimiter = ',')]
        addons: Vec<String>,

        /// Output file (defaults to the source name with .html)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the library addons available for injection
    Addons,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "easel=debug" } else { "easel=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("EASEL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Generate {
            prompt,
            image,
            candidates,
            out_dir,
        } => {
            cmd::cmd_generate(
                &project_dir,
                prompt,
                image.as_deref(),
                *candidates,
                out_dir.as_deref(),
            )
            .await?;
        }
        Commands::Video { prompt, output } => {
            cmd::cmd_video(&project_dir, prompt, output.as_deref()).await?;
        }
        Commands::Render { sources, addons } => {
            cmd::cmd_render(&project_dir, sources, addons).await?;
        }
        Commands::Export {
            source,
            addons,
            output,
        } => {
            cmd::cmd_export(&project_dir, source, addons, output.as_deref())?;
        }
        Commands::Addons => cmd::cmd_addons(&project_dir)?,
    }

    Ok(())
}
