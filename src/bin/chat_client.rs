//! # chat-client
//!
//! Connects to a relay server, sends each input line, and prints every
//! line the server relays back. Typing `exit` quits without sending it.

use anyhow::{Context, Result};
use clap::Parser;
use relay_client::{Client, ClientConfig, ClientExit};
use relay_telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use tracing::{error, info, Level};

/// TCP relay client.
#[derive(Parser, Debug)]
#[command(name = "chat-client", about = "TCP relay client")]
struct Cli {
    /// Server port.
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Server host name or address.
    #[arg(long, default_value = "localhost")]
    address: String,

    /// Log output format: `pretty` or `json`.
    #[arg(long, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.address.clone(),
            port: self.port,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Logs go to stderr; stdout carries only relayed lines.
    let telemetry = TelemetryConfig {
        log_level: Level::WARN,
        ..TelemetryConfig::default()
    }
    .with_format(cli.log_format);
    init_telemetry(&telemetry).context("Failed to initialise logging")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to build runtime")?;
    let outcome = runtime.block_on(chat(cli.client_config()));
    // Stdin is read on a blocking thread that may still be parked in read(2).
    runtime.shutdown_background();

    let exit = outcome?;
    info!(?exit, "client exiting");
    Ok(())
}

async fn chat(config: ClientConfig) -> Result<ClientExit> {
    let client = match Client::connect(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "connection failed");
            return Err(e).context("Failed to connect to relay server");
        }
    };

    info!(peer = %client.peer_addr(), "type messages, `exit` to quit");

    let interrupt = tokio_util::sync::CancellationToken::new();
    let on_ctrl_c = interrupt.clone();
    let _ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    client
        .run_until(tokio::io::stdin(), tokio::io::stdout(), interrupt)
        .await
        .context("Connection to relay server failed")
}
