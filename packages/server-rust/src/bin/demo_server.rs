//! Demo gateway: serves the deadline catalog over an in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waypoint_server::demo;
use waypoint_server::{GatewayBuilder, GatewayConfig, NetworkConfig, NetworkModule};

#[derive(Debug, Parser)]
#[command(name = "waypoint-demo", about = "Serve the deadline demo catalog over HTTP")]
struct Args {
    #[arg(long, env = "WAYPOINT_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "WAYPOINT_PORT", default_value_t = 3000)]
    port: u16,

    /// Queue process routes dispatch onto.
    #[arg(long, env = "WAYPOINT_QUEUE", default_value = "default")]
    queue: String,

    /// Per-dispatch budget in milliseconds; 0 disables it.
    #[arg(long, env = "WAYPOINT_DISPATCH_TIMEOUT_MS", default_value_t = 30_000)]
    dispatch_timeout_ms: u64,

    #[arg(long, env = "WAYPOINT_REQUEST_TIMEOUT_MS", default_value_t = 60_000)]
    request_timeout_ms: u64,

    /// Allowed CORS origin; repeatable. Defaults to any origin.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            queue: self.queue.clone(),
            dispatch_timeout: (self.dispatch_timeout_ms > 0)
                .then(|| Duration::from_millis(self.dispatch_timeout_ms)),
        }
    }

    fn network_config(&self) -> NetworkConfig {
        let mut config = NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..NetworkConfig::default()
        };
        if !self.cors_origins.is_empty() {
            config.cors_origins.clone_from(&self.cors_origins);
        }
        config
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let gateway = GatewayBuilder::new(Arc::new(demo::backend()), args.gateway_config())
        .with_validator(&demo::set_deadline(), demo::validate_deadline)
        .build(&demo::catalog())?;
    for route in gateway.routes() {
        info!(route = %route, "route ready");
    }

    let mut network = NetworkModule::new(args.network_config());
    network.start().await?;
    network.serve(gateway.into_router(), shutdown_signal()).await
}
