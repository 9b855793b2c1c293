use crate::model::{
    ServerStats,
    ServerSummary,
};
use arc_swap::ArcSwapOption;
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::Path,
    sync::Arc,
};

/// A server's listing entry merged with its stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Hostname of the Crafty instance the server was listed by.
    pub instance: String,
    pub server: ServerSummary,
    pub stats: ServerStats,
    /// Display host used instead of a loopback `server_ip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl ServerRecord {
    pub fn new(instance: impl ToString, server: ServerSummary, stats: ServerStats) -> Self {
        let instance = instance.to_string();
        let hostname = server.advertises_loopback().then(|| instance.clone());
        Self {
            instance,
            server,
            stats,
            hostname,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server.server_id
    }

    /// Host players connect to: the instance hostname for loopback servers, the advertised IP otherwise.
    pub fn display_host(&self) -> &str {
        self.hostname
            .as_deref()
            .or(self.server.server_ip.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub hostname: String,
    /// Whether the server listing could be fetched in this cycle.
    pub up: bool,
}

/// Output of one complete refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collected_at: DateTime<Utc>,
    pub instances: Vec<InstanceStatus>,
    pub servers: Vec<ServerRecord>,
}

impl Snapshot {
    pub fn new(collected_at: DateTime<Utc>) -> Self {
        Self {
            collected_at,
            instances: Vec::new(),
            servers: Vec::new(),
        }
    }

    /// Write the snapshot as pretty JSON, replacing the file.
    pub async fn save(&self, file: impl AsRef<Path>) -> eyre::Result<()> {
        let file = file.as_ref();
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(file, json).await?;
        trace!(?file, "saved snapshot");
        Ok(())
    }
}

/// Shared handle on the latest [`Snapshot`]. The refresh loop publishes, scrapes read; a scrape always sees exactly one
/// cycle's output.
#[derive(Clone, Debug, Default)]
pub struct SnapshotStore {
    latest: Arc<ArcSwapOption<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.latest.store(Some(Arc::new(snapshot)));
    }

    /// `None` until the first refresh cycle completed.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.load_full()
    }
}
