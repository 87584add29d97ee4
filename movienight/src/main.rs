mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use movienight_core::{
    bootstrap::{init_services, load_config},
    logging,
};

use server::MovieNightServer;

#[derive(Parser, Debug)]
#[command(name = "movienight")]
#[command(about = "MovieNight chat server", long_about = None)]
struct Args {
    /// YAML config file, otherwise MOVIENIGHT_CONFIG_PATH or ./config.yaml
    #[arg(long)]
    config: Option<String>,

    /// Room settings file, overrides chat.settings_path
    #[arg(long)]
    settings: Option<String>,

    /// Admin password for this run instead of a generated one
    #[arg(long)]
    admin_pass: Option<String>,

    /// Stream key for this run, not persisted
    #[arg(long, env = "MOVIENIGHT_STREAM_KEY")]
    stream_key: Option<String>,

    /// Listen address (host:port), overrides server.host and server.port
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let mut config = load_config(args.config.as_deref())?;
    if let Some(settings) = args.settings {
        config.chat.settings_path = settings;
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("MovieNight server starting...");

    // 3. Initialize services
    let chat = init_services(&config)?;
    if let Some(password) = args.admin_pass {
        chat.settings().set_admin_password_override(password);
        info!("Admin password set from the command line");
    }
    if let Some(key) = args.stream_key {
        chat.settings().set_stream_key_override(key);
    }

    let listen = args.listen.unwrap_or_else(|| config.http_address());

    // 4. Run until shutdown
    MovieNightServer::new(config, chat, listen).start().await
}
