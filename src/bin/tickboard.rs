use anyhow::Context;
use clap::Parser;
use tickboard::config::Args;
use tickboard::{coordinator, logging};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;

    logging::init(&config.log_file, config.verbose)
        .with_context(|| format!("opening log file {}", config.log_file.display()))?;
    info!(
        stream = %config.stream_url,
        snapshot = %config.snapshot_addr,
        offset = ?config.offset,
        recolor = ?config.recolor,
        "starting"
    );

    coordinator::run(config).await
}
