use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backlog_forge::config::Config;
use backlog_forge::export::{self, BacklogStats, ExportFormat, ExportOptions};
use backlog_forge::generation::OpenAiBackend;
use backlog_forge::orchestrator::*;
use backlog_forge::{api, document};

#[derive(Parser)]
#[command(name = "bforge")]
#[command(about = "Turn project descriptions into hierarchical work backlogs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate a backlog from project or feature text
    Generate {
        /// Input file, or "-" for stdin
        input: String,

        /// Project goal, included in the epic and feature prompts.
        /// With --feature it names the epic instead
        #[arg(short, long)]
        goal: Option<String>,

        /// Treat the input as a single feature
        #[arg(long)]
        feature: bool,

        /// Explicit feature title (with --feature)
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,
    },
    /// Generate a backlog from a Markdown document
    Document {
        input: PathBuf,

        /// Names the epic when the document has none
        #[arg(long)]
        project_name: Option<String>,

        /// Treat the document as a single feature
        #[arg(long)]
        feature: bool,

        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,
    },
    /// Show the classified sections of a Markdown document
    Classify { input: PathBuf },
}

/// Initialize tracing with output to stderr (for CLI output) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "backlog_forge=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Generation output goes to stdout, keep it clean
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    read_file(Path::new(input))
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn build_orchestrator(config: &Config) -> Arc<Orchestrator> {
    let backend = Arc::new(OpenAiBackend::from_config(&config.generation));
    Arc::new(Orchestrator::generative(backend))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Commands::Serve { .. });
    init_tracing(use_stderr);

    let config = Config::load();

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            tracing::info!("Starting backlog server on {}:{}", host, port);

            let app = api::create_router(build_orchestrator(&config));

            let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
            tracing::info!("Backlog server listening on http://{}:{}", host, port);

            axum::serve(listener, app).await?;
        }
        Commands::Generate {
            input,
            goal,
            feature,
            title,
            format,
        } => {
            let text = read_input(&input)?;
            let orchestrator = build_orchestrator(&config);

            let backlog = if feature {
                orchestrator
                    .run_feature_only(FeatureOnlyRequest {
                        feature_text: text,
                        feature_title: title,
                        goal,
                    })
                    .await?
            } else {
                orchestrator
                    .run_full_project(FullProjectRequest {
                        text,
                        goal,
                        input_type: InputType::Project,
                    })
                    .await?
            };

            tracing::info!(
                "Generated {} item(s)",
                BacklogStats::from_backlog(&backlog).total_items()
            );
            println!("{}", export::export(&backlog, format, ExportOptions::default()));
        }
        Commands::Document {
            input,
            project_name,
            feature,
            format,
        } => {
            let markdown = read_file(&input)?;
            let orchestrator = build_orchestrator(&config);

            let outcome = orchestrator
                .run_document(DocumentRequest {
                    markdown,
                    project_name,
                    input_type: if feature {
                        InputType::Feature
                    } else {
                        InputType::Project
                    },
                })
                .await?;

            tracing::info!(
                "Generated {} item(s) from {}",
                BacklogStats::from_backlog(&outcome.backlog).total_items(),
                outcome.source.as_str()
            );
            println!(
                "{}",
                export::export(&outcome.backlog, format, ExportOptions::default())
            );
        }
        Commands::Classify { input } => {
            let structure = document::extract_structure(&read_file(&input)?);
            for section in &structure.sections {
                println!(
                    "{}{} [{}] {}",
                    "  ".repeat(section.level.saturating_sub(1) as usize),
                    "#".repeat(section.level as usize),
                    section.kind.as_str(),
                    section.title
                );
            }
        }
    }

    Ok(())
}
