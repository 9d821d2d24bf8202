use clap::Parser;
use log::{error, info};
use netrec::configuration::config::Config;
use netrec::data_capture::{log_exchange, RecordListener};
use netrec::network::hello_server;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "netrec")]
#[command(version)]
#[command(about = "HTTP responder logging every request and response it sees")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "NETREC_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `bind_address` from the configuration
    #[arg(long, env = "NETREC_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Overrides `preview_bytes` from the configuration
    #[arg(long, env = "NETREC_PREVIEW_BYTES")]
    preview_bytes: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<Config, netrec::error_handling::types::ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(bind_address) = self.bind_address {
            config.bind_address = bind_address;
        }
        if let Some(preview_bytes) = self.preview_bytes {
            config.preview_bytes = preview_bytes;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let config = Args::parse().into_config().unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(1);
    });

    let addr = config.socket_addr().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let listener = hello_server::bind(addr).await.unwrap_or_else(|e| {
        error!("Unable to start listener: {}, exiting...", e);
        std::process::exit(1);
    });
    info!("Recording connections on {}", addr);

    let recorded = RecordListener::new(listener, log_exchange(config.preview_bytes));
    let body: Arc<str> = Arc::from(config.response_body);

    tokio::select! {
        res = hello_server::serve(recorded, body) => {
            if let Err(e) = res {
                error!("Server stopped: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }
}
