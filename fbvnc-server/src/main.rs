//! fbvnc-server: entry point.
//!
//! ```text
//! fbvnc-server                   Run in the foreground
//! fbvnc-server --config <path>   Load a custom config TOML
//! fbvnc-server --port <port>     Override the listening port
//! fbvnc-server --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fbvnc_server::config::ServerConfig;
use fbvnc_server::service::FbVncService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fbvnc-server", about = "Serve a Linux framebuffer over VNC")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "fbvnc-server.toml")]
    config: PathBuf,

    /// Listen on this TCP port instead of the configured one.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = ServerConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("fbvnc-server v{}", env!("CARGO_PKG_VERSION"));
    info!("framebuffer: {}", config.framebuffer.device.display());
    info!("keyboard: {}", config.keyboard.device.display());
    info!("listening on: {}", config.listen_addr());

    let service = FbVncService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received; shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    if let Err(e) = service.run().await {
        tracing::error!("fatal: {e}");
        return Err(e);
    }

    Ok(())
}
