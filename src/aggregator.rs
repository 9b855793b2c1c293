use crate::{
    client::CraftyClient,
    error::{
        Error,
        Result,
    },
    snapshot::{
        InstanceStatus,
        ServerRecord,
        Snapshot,
        SnapshotStore,
    },
};
use chrono::Utc;
use crafty_exporter_config::InstanceConfig;
use std::{
    path::PathBuf,
    time::Duration,
};

/// Outcome of one refresh cycle, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshSummary {
    pub servers: usize,
    pub failed_instances: usize,
    pub skipped_servers: usize,
}

/// Polls every configured instance in turn and publishes the merged result as one [`Snapshot`].
pub struct StatusAggregator {
    clients: Vec<CraftyClient>,
    store: SnapshotStore,
    snapshot_file: Option<PathBuf>,
}

impl StatusAggregator {
    pub fn new(
        instances: &[InstanceConfig],
        timeout: Duration,
        store: SnapshotStore,
        snapshot_file: Option<PathBuf>,
    ) -> Result<Self> {
        let clients = instances
            .iter()
            .map(|instance| CraftyClient::new(instance, timeout))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            clients,
            store,
            snapshot_file,
        })
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run one cycle. Failing instances and servers are logged and left out; the snapshot is replaced even if it
    /// ends up empty.
    pub async fn refresh(&self) -> RefreshSummary {
        let mut snapshot = Snapshot::new(Utc::now());
        let mut summary = RefreshSummary::default();

        for client in &self.clients {
            match self.collect_instance(client, &mut snapshot.servers).await {
                Ok(skipped) => {
                    summary.skipped_servers += skipped;
                    snapshot.instances.push(InstanceStatus {
                        hostname: client.hostname().to_string(),
                        up: true,
                    });
                }
                Err(err) => {
                    error!(host = client.hostname(), "skipping instance: {err}");
                    summary.failed_instances += 1;
                    snapshot.instances.push(InstanceStatus {
                        hostname: client.hostname().to_string(),
                        up: false,
                    });
                }
            }
        }

        summary.servers = snapshot.servers.len();

        if let Some(file) = &self.snapshot_file {
            if let Err(err) = snapshot.save(file).await {
                warn!(?file, "failed to write snapshot file: {err}");
            }
        }

        self.store.publish(snapshot);
        debug!(?summary, "finished update");
        summary
    }

    /// Appends the instance's servers to `records` and returns how many servers had to be skipped. Nothing is
    /// appended if the listing itself fails.
    async fn collect_instance(&self, client: &CraftyClient, records: &mut Vec<ServerRecord>) -> Result<usize> {
        let host = client.hostname();
        let listing = client.list_servers().await?;
        if !listing.is_ok() {
            return Err(Error::UpstreamStatus {
                host: host.to_string(),
                status: listing.status,
            });
        }

        let servers = listing.data.unwrap_or_default();
        debug!(host, count = servers.len(), "listed servers");

        let mut skipped = 0;
        for server in servers {
            let server_id = server.server_id.clone();
            match client.get_server_stats(&server_id).await {
                Ok(stats) if stats.is_ok() => match stats.data {
                    Some(stats) => records.push(ServerRecord::new(host, server, stats)),
                    None => {
                        warn!(host, server_id, "stats response carried no data");
                        skipped += 1;
                    }
                },
                Ok(stats) => {
                    warn!(host, server_id, status = stats.status, "non-ok stats response");
                    skipped += 1;
                }
                Err(err) => {
                    warn!(host, server_id, "failed to fetch stats: {err}");
                    skipped += 1;
                }
            }
        }

        Ok(skipped)
    }
}
