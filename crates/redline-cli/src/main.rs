//! Redline CLI - contract risk review from the command line.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use redline_core::{RedFlag, RedlineConfig};
use redline_server::{build_orchestrator, serve, AnalysisResponse, Orchestrator};

/// Redline - flag risky clauses in contracts and terms pages
#[derive(Parser)]
#[command(name = "redline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/redline/config.toml, then ./redline.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overrides the config file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Bind address, overrides the config file
        #[arg(short, long)]
        bind: Option<String>,

        /// Drop every indexed document before serving
        #[arg(long)]
        reset: bool,
    },

    /// Analyze a PDF contract
    Analyze {
        /// Path to the PDF
        path: PathBuf,

        /// Document key (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Analyze a terms page by URL
    AnalyzeUrl {
        url: String,
    },

    /// Ask a question about an analyzed document
    Chat {
        /// Document key used when it was analyzed
        filename: String,

        question: String,
    },

    /// Draft a negotiation email for one clause
    Negotiate {
        clause: String,

        /// What worries you about the clause
        risk: String,
    },

    /// Draft one negotiation email from a saved analysis (JSON from `analyze`)
    NegotiateAll {
        path: PathBuf,
    },

    /// Drop every indexed document
    Reset,

    /// Show index statistics
    Stats {
        /// Limit to one document key
        #[arg(long)]
        filename: Option<String>,
    },

    /// Create the database and write a default config file
    Init {
        /// Where to write the config file
        #[arg(long, default_value = "redline.toml")]
        output: PathBuf,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(cli: &Cli) -> Result<RedlineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RedlineConfig::load(path)?,
        None => RedlineConfig::load_default()?,
    };

    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }

    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Serve { bind, reset } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.server.reset_on_start |= reset;
            serve(&config).await?;
        }
        Commands::Analyze { path, name } => {
            let orchestrator = build_orchestrator(&config)?;
            analyze(&orchestrator, &path, name).await?;
            orchestrator.close().await?;
        }
        Commands::AnalyzeUrl { url } => {
            let orchestrator = build_orchestrator(&config)?;
            let response = orchestrator.analyze_url(&url).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            orchestrator.close().await?;
        }
        Commands::Chat { filename, question } => {
            let orchestrator = build_orchestrator(&config)?;
            let answer = orchestrator.chat(&filename, &question, &[]).await?;
            println!("{}", answer);
            orchestrator.close().await?;
        }
        Commands::Negotiate { clause, risk } => {
            let orchestrator = build_orchestrator(&config)?;
            println!("{}", orchestrator.negotiate(&clause, &risk).await?);
        }
        Commands::NegotiateAll { path } => {
            let red_flags = read_red_flags(&path)?;
            let orchestrator = build_orchestrator(&config)?;
            println!("{}", orchestrator.negotiate_all(&red_flags).await?);
        }
        Commands::Reset => {
            let orchestrator = build_orchestrator(&config)?;
            orchestrator.reset().await?;
            orchestrator.close().await?;
            println!("Index reset");
        }
        Commands::Stats { filename } => {
            let orchestrator = build_orchestrator(&config)?;
            let stats = orchestrator.stats(filename.as_deref()).await?;
            match &stats.filter {
                Some(name) => println!("Document: {}", name),
                None => println!("All documents"),
            }
            println!("  Documents: {}", stats.documents);
            println!("  Chunks:    {}", stats.chunks);
            orchestrator.close().await?;
        }
        Commands::Init { output, force } => {
            init(&config, &output, force).await?;
        }
    }

    Ok(())
}

async fn analyze(
    orchestrator: &Orchestrator,
    path: &Path,
    name: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filename = match name {
        Some(name) => name,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("path has no file name")?
            .to_string(),
    };

    let bytes = fs::read(path)?;
    let response = orchestrator.analyze_pdf(&filename, &bytes).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Accept either a full `analyze` response or a bare red flag array.
fn read_red_flags(path: &Path) -> Result<Vec<RedFlag>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    if let Ok(response) = serde_json::from_str::<AnalysisResponse>(&content) {
        return Ok(response.analysis.red_flags);
    }
    Ok(serde_json::from_str::<Vec<RedFlag>>(&content)?)
}

async fn init(
    config: &RedlineConfig,
    output: &Path,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() && !force {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            output.display()
        );
    } else {
        // Keys stay in the environment, never in the file.
        let mut template = config.clone();
        template.llm.api_key = None;
        template.embedding.api_key = None;
        fs::write(output, toml::to_string_pretty(&template)?)?;
        println!("Wrote config to: {}", output.display());
    }

    let orchestrator = build_orchestrator(config)?;
    orchestrator.close().await?;
    println!("Initialized database at: {}", config.database.path.display());
    Ok(())
}
