//! # chat-server
//!
//! TCP relay server: rebroadcasts every inbound frame to all connected
//! clients (or echoes it back to the sender in `--mode echo`).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use relay_core::{DispatchMode, Dispatcher};
use relay_server::{build_runtime, RelayServer, ServerConfig};
use relay_telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use tracing::{error, info};

/// TCP broadcast relay server.
#[derive(Parser, Debug)]
#[command(name = "chat-server", about = "TCP broadcast relay server")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Spread connections over one worker thread per core.
    #[arg(
        long,
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    multicore: bool,

    /// Dispatch policy: `broadcast` (chat) or `echo`.
    #[arg(long, default_value_t = DispatchMode::Broadcast)]
    mode: DispatchMode,

    /// Log output format: `pretty` or `json`.
    #[arg(long, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            multicore: self.multicore,
            mode: self.mode,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&TelemetryConfig::default().with_format(cli.log_format))
        .context("Failed to initialise logging")?;

    let config = cli.server_config();
    let runtime = build_runtime(config.multicore).context("Failed to build runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: ServerConfig) -> Result<()> {
    let dispatcher = Arc::new(Dispatcher::new(config.mode));
    let server = RelayServer::new(config, dispatcher);

    let (addr, accept_loop) = match server.listen().await {
        Ok(bound) => bound,
        Err(e) => {
            error!(error = %e, "relay server failed to start");
            return Err(e).context("Failed to start relay server");
        }
    };
    info!(%addr, multicore = server.config().multicore, "chat server ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    info!("Shutting down");
    server.stop(accept_loop).await;
    Ok(())
}
