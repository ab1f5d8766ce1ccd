use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use line_relay::api::ApiServerBuilder;
use line_relay::{Config, GeminiClient, LineClient, Relay};

/// LINE Relay - answer LINE chats (and image questions) with Gemini
#[derive(Parser)]
#[command(name = "line-relay", version, about)]
struct Cli {
    /// Port to listen on (overrides RELAY_PORT and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the configuration, print it with secrets redacted, and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,line_relay=info",
        1 => "info,line_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if matches!(cli.command, Some(Command::CheckConfig)) {
        println!("{config:#?}");
        return Ok(());
    }

    let line = LineClient::new(config.line.channel_access_token.clone(), config.line.timeout)?
        .with_base_urls(config.line.api_base.clone(), config.line.data_api_base.clone());

    let gemini = GeminiClient::new(
        config.gemini.api_key.clone(),
        config.gemini.model.clone(),
        config.gemini.timeout,
    )?
    .with_base_url(config.gemini.base_url.clone())
    .with_system_instruction(config.gemini.system_instruction.clone())
    .with_generation_config(config.gemini.generation)
    .with_safety_settings(config.gemini.safety);

    tracing::info!(
        port = config.server.port,
        model = %gemini.model(),
        upload_dir = %config.relay.upload_dir.display(),
        scope = ?config.relay.scope,
        "starting line relay"
    );

    let relay = Arc::new(Relay::new(
        Arc::new(line),
        Arc::new(gemini),
        config.relay.clone(),
    )?);

    let sweeper = relay.spawn_sweeper();
    if sweeper.is_some() {
        tracing::debug!(ttl_secs = ?config.relay.images.ttl_secs, "upload sweeper started");
    }

    ApiServerBuilder::new(relay, config.line.channel_secret.clone())
        .host(config.server.host.clone())
        .port(config.server.port)
        .build()
        .run()
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    Ok(())
}
