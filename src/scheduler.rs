use crate::aggregator::StatusAggregator;
use std::time::{
    Duration,
    Instant,
};

/// Refresh, sleep, repeat. Scrapes are served concurrently from whatever snapshot the last cycle published.
pub async fn run(aggregator: StatusAggregator, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "starting refresh loop");
    loop {
        let started = Instant::now();
        let summary = aggregator.refresh().await;
        info!(
            servers = summary.servers,
            failed_instances = summary.failed_instances,
            skipped_servers = summary.skipped_servers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refreshed server info"
        );
        tokio::time::sleep(interval).await;
    }
}
