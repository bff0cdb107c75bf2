mod cli;

use std::sync::Arc;

use clap::Parser;

use sqlbridge::services::database::InMemoryConfigSource;
use sqlbridge::{CoreConfig, SqlBridge, logging};

use crate::cli::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = CoreConfig::load(args.config.as_deref())?;
    logging::init(args.log_level.as_deref().unwrap_or(&config.logging.level));

    smol::block_on(run(args, config))
}

async fn run(args: Args, config: CoreConfig) -> anyhow::Result<()> {
    // the CLI only manages drivers, so no saved connections are needed
    let bridge = SqlBridge::new(&config, Arc::new(InMemoryConfigSource::new())).await?;
    let result = cli::run(args.command, &bridge).await;
    bridge.shutdown().await;
    result
}
