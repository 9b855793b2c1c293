//! Turns the latest [`Snapshot`] into Prometheus metric families.
//!
//! A fresh registry is built for every scrape so servers that disappeared upstream also disappear from the output.
//! Each sample is derived independently: a field that is missing or fails to parse only drops its own sample.

pub mod units;

use crate::{
    model::NEVER_STARTED,
    snapshot::{
        ServerRecord,
        Snapshot,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use prometheus::{
    proto::MetricFamily,
    Encoder as _,
    Gauge,
    GaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use serde_json::Value;
use units::{
    parse_timestamp,
    seconds_since,
    size_to_mb,
};

pub use prometheus::TEXT_FORMAT;

const SERVER_LABELS: [&str; 2] = ["crafty_instance", "server_id"];
const CONNECTION_LABELS: [&str; 8] = [
    "crafty_instance",
    "server_id",
    "hostname",
    "server_port",
    "description",
    "world_name",
    "server_type",
    "version",
];

struct Families {
    registry: Registry,
    crashed: GaugeVec,
    cpu_usage: GaugeVec,
    created_seconds: GaugeVec,
    connection_info: GaugeVec,
    players_online: GaugeVec,
    players_max: GaugeVec,
    memory_usage_mb: GaugeVec,
    memory_percent: GaugeVec,
    running: GaugeVec,
    started_seconds: GaugeVec,
    world_size_mb: GaugeVec,
    instance_up: GaugeVec,
    last_refresh: Gauge,
}

impl Families {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let server_gauge = |name: &str, help: &str| gauge_vec(&registry, name, help, &SERVER_LABELS);

        Ok(Self {
            crashed: server_gauge("crashed", "Server has crashed")?,
            cpu_usage: server_gauge("cpu_usage", "Current CPU usage")?,
            created_seconds: server_gauge("created_seconds", "Created seconds ago")?,
            connection_info: gauge_vec(&registry, "connection_info", "Connection data", &CONNECTION_LABELS)?,
            players_online: server_gauge("players_online", "Players online")?,
            players_max: server_gauge("players_max", "Max players count")?,
            memory_usage_mb: server_gauge("memory_usage_mb", "Current memory usage in MB")?,
            memory_percent: server_gauge("memory_percent", "Current memory usage percent")?,
            running: server_gauge("running", "Server is running")?,
            started_seconds: server_gauge("started_seconds", "Started seconds ago, -1 if never started")?,
            world_size_mb: server_gauge("world_size_mb", "World size in MB")?,
            instance_up: gauge_vec(
                &registry,
                "instance_up",
                "Whether the Crafty instance could be listed in the last refresh",
                &["crafty_instance"],
            )?,
            last_refresh: {
                let gauge = Gauge::new(
                    "last_refresh_timestamp_seconds",
                    "Unix time the last refresh cycle finished at",
                )?;
                registry.register(Box::new(gauge.clone()))?;
                gauge
            },
            registry,
        })
    }

    fn observe(&self, record: &ServerRecord, now: DateTime<Utc>) {
        let instance = record.instance.as_str();
        let id = record.server_id();
        let labels = [instance, id];
        let stats = &record.stats;
        let set = |family: &GaugeVec, value: f64| family.with_label_values(&labels).set(value);

        match stats.crashed {
            Some(crashed) => set(&self.crashed, flag(crashed)),
            None => missing(record, "crashed"),
        }

        match stats.cpu {
            Some(cpu) => set(&self.cpu_usage, cpu),
            None => missing(record, "cpu"),
        }

        match record.server.created.as_deref() {
            Some(created) => match parse_timestamp(created) {
                Ok(created) => set(&self.created_seconds, seconds_since(created, now)),
                Err(err) => warn!(instance, server_id = id, "failed to parse created value: {err}"),
            },
            None => missing(record, "created"),
        }

        let port = record.server.server_port.map(|port| port.to_string()).unwrap_or_default();
        self.connection_info
            .with_label_values(&[
                instance,
                id,
                record.display_host(),
                port.as_str(),
                stats.desc.as_deref().unwrap_or_default(),
                stats.world_name.as_deref().unwrap_or_default(),
                record.server.server_type.as_deref().unwrap_or_default(),
                stats.version.as_deref().unwrap_or_default(),
            ])
            .set(1.0);

        match stats.online {
            Some(online) => set(&self.players_online, online),
            None => missing(record, "online"),
        }

        match stats.max {
            Some(max) => set(&self.players_max, max),
            None => missing(record, "max"),
        }

        // Anything but a size string (Crafty sends `0` for stopped servers) is reported as 0.
        match &stats.mem {
            Value::String(mem) => match size_to_mb(mem) {
                Ok(mb) => set(&self.memory_usage_mb, mb),
                Err(err) => warn!(instance, server_id = id, "failed to parse memory value: {err}"),
            },
            _ => set(&self.memory_usage_mb, 0.0),
        }

        match stats.mem_percent {
            Some(percent) => set(&self.memory_percent, percent),
            None => missing(record, "mem_percent"),
        }

        match stats.running {
            Some(running) => set(&self.running, flag(running)),
            None => missing(record, "running"),
        }

        match stats.started.as_deref() {
            Some(NEVER_STARTED) => set(&self.started_seconds, -1.0),
            Some(started) => match parse_timestamp(started) {
                Ok(started) => set(&self.started_seconds, seconds_since(started, now)),
                Err(err) => warn!(instance, server_id = id, "failed to parse started value: {err}"),
            },
            None => missing(record, "started"),
        }

        match stats.world_size.as_deref() {
            Some(world_size) => match size_to_mb(world_size) {
                Ok(mb) => set(&self.world_size_mb, mb),
                Err(err) => warn!(instance, server_id = id, "failed to parse world size value: {err}"),
            },
            None => missing(record, "world_size"),
        }
    }
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> prometheus::Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn missing(record: &ServerRecord, field: &str) {
    debug!(instance = record.instance, server_id = record.server_id(), field, "field missing from stats");
}

/// Metric families for `snapshot` as of `now`. Empty, with a warning, before the first refresh finished.
pub fn gather(snapshot: Option<&Snapshot>, now: DateTime<Utc>) -> prometheus::Result<Vec<MetricFamily>> {
    let Some(snapshot) = snapshot else {
        warn!("status not yet received");
        return Ok(Vec::new());
    };

    let families = Families::new()?;
    for instance in &snapshot.instances {
        families
            .instance_up
            .with_label_values(&[instance.hostname.as_str()])
            .set(flag(instance.up));
    }
    families
        .last_refresh
        .set(snapshot.collected_at.timestamp_millis() as f64 / 1000.0);
    for record in &snapshot.servers {
        families.observe(record, now);
    }

    let mut gathered = families.registry.gather();
    gathered.retain(|family| !family.get_metric().is_empty());
    Ok(gathered)
}

/// Text exposition of `snapshot` as of `now`.
pub fn render(snapshot: Option<&Snapshot>, now: DateTime<Utc>) -> prometheus::Result<String> {
    let families = gather(snapshot, now)?;
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}
