use anyhow::{anyhow, Context, Result};
use clap::Parser;
use greenform_fetch::app::build_orchestrator;
use greenform_fetch::server;
use greenform_fetch::utils::config_loader;
use greenform_fetch::utils::logging;
use greenform_fetch::utils::logging::LogLevel;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "greenform-fetch.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Order identifiers separated by commas, spaces or newlines
    #[arg(long, conflicts_with_all = ["ids_file", "serve"])]
    ids: Option<String>,
    /// Read identifiers from a file instead of stdin
    #[arg(long, conflicts_with = "serve")]
    ids_file: Option<String>,
    /// Run the HTTP server instead of a single batch
    #[arg(long)]
    serve: bool,
    /// Drop the persisted token before doing anything else
    #[arg(long)]
    clear_token: bool,
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Token lifecycle + remote clients
    // -------------------------------

    let orchestrator = build_orchestrator(&service_config).await?;
    if args.clear_token {
        orchestrator.tokens().clear().await;
    }

    // -------------------------------
    // 3a. Serve mode
    // -------------------------------

    if args.serve {
        info!("Service starting...");
        return server::server::start(&service_config.settings, orchestrator).await;
    }

    // -------------------------------
    // 3b. One-shot batch
    // -------------------------------

    let input = read_input(&args).await?;
    let result = orchestrator.fetch_many(&input).await?;
    if result.failure_count > 0 {
        warn!(failed = result.failure_count, "batch finished with failures");
    }

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", rendered);
    Ok(())
}

async fn read_input(args: &Args) -> Result<String> {
    if let Some(ids) = &args.ids {
        return Ok(ids.clone());
    }
    if let Some(path) = &args.ids_file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read ids file '{}'", path));
    }

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| anyhow!("cannot read ids from stdin: {}", e))?;
    Ok(input)
}
