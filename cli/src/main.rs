use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use mcphub_core::config::Config;
use mcphub_core::tools::MEMORY_TOOL;
use mcphub_core::ToolRegistry;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod init;

#[derive(Parser)]
#[command(name = "mcphub")]
#[command(about = "mcphub - dispatch tool calls to pluggable backends", long_about = None)]
struct Cli {
    /// Config file (default: ~/.mcphub/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// List registered tools
    List,
    /// Call a tool with JSON arguments
    Call {
        tool: String,
        /// JSON object, or a bare string for the tool's first parameter
        args: Option<String>,
    },
    /// Store a memory event
    Remember {
        title: String,
        #[arg(short, long)]
        payload: Option<String>,
    },
    /// Search memory events; every keyword must match
    Recall { keywords: Vec<String> },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load_or_init(),
    }
}

fn parse_args(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(json!({}));
    };
    // Anything that is not JSON is passed through as a bare string.
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_registry(config_path: Option<&PathBuf>) -> Result<ToolRegistry> {
    let config = load_config(config_path)?;
    let registry = ToolRegistry::new();
    registry.register_from_config(&config);
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { force } => init::run_init(config_path.map(PathBuf::as_path), force)?,
        Commands::List => {
            for spec in build_registry(config_path)?.specs() {
                println!(
                    "  {}  {}",
                    style(&spec.name).white().bold(),
                    spec.description
                );
            }
        }
        Commands::Call { tool, args } => {
            let args = parse_args(args.as_deref())?;
            let result = build_registry(config_path)?
                .call(&tool, args)
                .await
                .with_context(|| format!("{} call failed", tool))?;
            print_json(&result)?;
        }
        Commands::Remember { title, payload } => {
            let payload = match payload {
                Some(raw) => serde_json::from_str(&raw).context("--payload must be JSON")?,
                None => json!({}),
            };
            let result = build_registry(config_path)?
                .call(
                    MEMORY_TOOL,
                    json!({"action": "add_event", "title": title, "payload": payload}),
                )
                .await?;
            println!(
                "{} Stored event {}",
                style("✓").green().bold(),
                result["id"].as_str().unwrap_or_default()
            );
        }
        Commands::Recall { keywords } => {
            let result = build_registry(config_path)?
                .call(
                    MEMORY_TOOL,
                    json!({"action": "query", "keywords": keywords.join(" ")}),
                )
                .await?;
            print_json(&result)?;
        }
    }

    Ok(())
}
