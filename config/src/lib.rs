#[macro_use]
extern crate tracing;

mod args;
mod instance_config;

pub use args::Args;
pub use instance_config::InstanceConfig;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::{
        IpAddr,
        SocketAddr,
    },
    path::PathBuf,
    time::Duration,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

/// Effective exporter settings: built-in defaults, overlaid by the config file, overlaid by command line arguments
/// and environment variables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, alias = "instances")]
    pub crafty_instances: Vec<InstanceConfig>,
    pub polling_interval_seconds: u64,
    pub exporter_port: u16,
    pub listen_address: IpAddr,
    pub api_timeout_seconds: u64,
    #[serde(default)]
    pub snapshot_file: Option<PathBuf>,
}

impl Settings {
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        debug!(config_file = ?args.config, "loading settings");

        let builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(
                config::File::from(args.config.clone())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            )
            .add_source(args.clone());

        let settings: Self = builder.build()?.try_deserialize()?;

        if settings.crafty_instances.is_empty() {
            warn!(config_file = ?args.config, "no crafty instances configured, metrics will stay empty");
        }
        if settings.polling_interval_seconds == 0 {
            return Err(config::ConfigError::Message(
                "polling_interval_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }

    pub fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.exporter_port)
    }

    /// YAML rendering of the settings with all passwords masked.
    pub fn redacted_yaml(&self) -> Result<String, serde_yml::Error> {
        let redacted = Self {
            crafty_instances: self.crafty_instances.iter().map(InstanceConfig::redacted).collect(),
            ..self.clone()
        };
        serde_yml::to_string(&redacted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.child("config.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn args_for(config: PathBuf) -> Args {
        Args {
            config,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_when_file_only_lists_instances() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "crafty_instances:\n  - hostname: crafty.example.org\n    username: exporter\n    password: secret\n",
        );

        let settings = Settings::new(&args_for(path)).unwrap();

        assert_eq!(
            settings.crafty_instances,
            vec![InstanceConfig::new("crafty.example.org", "exporter", "secret")]
        );
        assert_eq!(settings.polling_interval(), Duration::from_secs(15));
        assert_eq!(settings.api_timeout(), Duration::from_secs(5));
        assert_eq!(settings.listen_socket(), "0.0.0.0:9877".parse().unwrap());
        assert_eq!(settings.snapshot_file, Some(PathBuf::from("server_info.json")));
    }

    #[test]
    fn arguments_override_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "instances: []\nexporter_port: 9100\npolling_interval_seconds: 60\n");

        let args = Args {
            exporter_port: Some(9200),
            no_snapshot_file: true,
            ..args_for(path)
        };
        let settings = Settings::new(&args).unwrap();

        assert_eq!(settings.exporter_port, 9200);
        assert_eq!(settings.polling_interval_seconds, 60);
        assert_eq!(settings.snapshot_file, None);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Settings::new(&args_for(dir.child("absent.yaml"))).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "crafty_instances: []\npolling_interval_seconds: 0\n");
        assert!(Settings::new(&args_for(path)).is_err());
    }

    #[test]
    fn redacted_yaml_hides_passwords() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "crafty_instances:\n  - hostname: a\n    username: u\n    password: hunter2\n",
        );
        let yaml = Settings::new(&args_for(path)).unwrap().redacted_yaml().unwrap();
        assert!(!yaml.contains("hunter2"));
        assert!(yaml.contains("********"));
    }
}
