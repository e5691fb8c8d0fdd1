use spdif_out::config::Config;
use spdif_out::services::Player;

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Starting spdif-out");

    // Load configuration, the first argument overrides the input file
    let mut config = Config::load()?;
    if let Some(input) = std::env::args().nth(1) {
        config.input_path = input;
    }
    config.validate()?;

    let stop = Arc::new(AtomicBool::new(false));
    let player = Player::new(config, stop.clone());

    // The output stream blocks on device writes, so keep it off the runtime
    let mut playback = tokio::task::spawn_blocking(move || player.run());

    let report = tokio::select! {
        result = &mut playback => result??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping playback");
            stop.store(true, Ordering::Relaxed);
            playback.await??
        }
    };

    tracing::info!(
        "Played {} bytes as {}",
        report.bytes_consumed,
        report.properties
    );
    if let Some(frames) = report.render_position {
        tracing::info!("Render position: {} frames", frames);
    }
    if let Some(frames) = report.presented_frames {
        tracing::info!("Presented: {} frames", frames);
    }
    tracing::info!(
        "Bursts: {} ({} bytes), short: {}, retry budget exhausted: {}, sink failures: {}",
        report.stats.bursts,
        report.stats.bytes_written,
        report.stats.short_bursts,
        report.stats.retries_exhausted,
        report.stats.sink_failures
    );

    tracing::info!("spdif-out shutdown complete");
    Ok(())
}
