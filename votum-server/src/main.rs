use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use votum_core::ingest::{Ingest, IngestConfig};
use votum_core::store::BOOTHS;
use votum_crypto::LocalKeyService;
use votum_server::{config, endpoint};
use votum_store::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "votumd", about = "Ballot submission ingestion service")]
struct Args {
    /// Path to the JSON config file
    config: PathBuf,

    /// Override the listen address from the config file
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = config::from_file(&args.config)?;

    let listen = args.listen.unwrap_or_else(|| config.listen_address.clone());

    let keys =
        LocalKeyService::new().with_hex_key(config.key.name.as_str(), &config.key.material)?;

    let store = MemoryStore::new();

    for entry in &config.booths {
        store
            .seed(BOOTHS, &entry.booth_id, serde_json::to_value(&entry.location)?)
            .await;
    }

    info!(booths = config.booths.len(), %listen, "starting submission endpoint");

    let ingest = Ingest::new(
        store,
        keys,
        IngestConfig {
            key_name: config.key.name.clone(),
        },
    );

    let listener = TcpListener::bind(&listen).await?;

    endpoint::serve(listener, Arc::new(ingest)).await?;

    Ok(())
}
