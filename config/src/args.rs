use clap::Parser;
use std::{
    net::IpAddr,
    path::PathBuf,
};

/// Crafty Controller Prometheus exporter
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML file listing the Crafty instances to poll.
    #[arg(long, env = "CRAFTY_CONFIG", default_value = "config.yaml", value_name = "FILE")]
    pub config: PathBuf,

    /// Seconds to wait between two refresh cycles.
    #[arg(long, env = "POLLING_INTERVAL_SECONDS", value_name = "SECONDS")]
    pub polling_interval_seconds: Option<u64>,

    /// Port the metrics endpoint listens on.
    #[arg(long, env = "EXPORTER_PORT", value_name = "PORT")]
    pub exporter_port: Option<u16>,

    /// Address the metrics endpoint binds to.
    #[arg(long, env = "EXPORTER_LISTEN_ADDRESS", value_name = "IP")]
    pub listen_address: Option<IpAddr>,

    /// Timeout for every request made to a Crafty API.
    #[arg(long, env = "CRAFTY_API_TIMEOUT", value_name = "SECONDS")]
    pub api_timeout_seconds: Option<u64>,

    /// Where the last snapshot is written after every refresh.
    #[arg(long, env = "SNAPSHOT_FILE", value_name = "FILE")]
    pub snapshot_file: Option<PathBuf>,

    /// Do not write the snapshot file at all.
    #[arg(long, env = "DISABLE_SNAPSHOT_FILE", action, conflicts_with = "snapshot_file")]
    pub no_snapshot_file: bool,

    /// Print the effective configuration (passwords redacted) and exit.
    #[arg(long, action)]
    pub print_config: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
        ValueKind,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(interval) = self.polling_interval_seconds {
                cache.insert("polling_interval_seconds".to_string(), interval.into());
            }
            if let Some(port) = self.exporter_port {
                cache.insert("exporter_port".to_string(), (port as u64).into());
            }
            if let Some(address) = &self.listen_address {
                cache.insert("listen_address".to_string(), address.to_string().into());
            }
            if let Some(timeout) = self.api_timeout_seconds {
                cache.insert("api_timeout_seconds".to_string(), timeout.into());
            }
            if let Some(file) = &self.snapshot_file {
                cache.insert("snapshot_file".to_string(), file.display().to_string().into());
            }
            if self.no_snapshot_file {
                cache.insert("snapshot_file".to_string(), Value::new(None, ValueKind::Nil));
            }
            Ok(cache)
        }
    }
}
