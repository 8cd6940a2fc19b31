use config::{Config, ConfigError, Environment, File};
use pc60fw_node::config::SessionConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ReaderConfig {
    pub device_address: Option<String>,
    #[serde(with = "humantime_serde")]
    pub discovery_timeout: Duration,
    pub vitals_log_path: PathBuf,
    pub enable_notify_command: bool,
    pub brightness: Option<u8>,
    pub event_queue_capacity: usize,
}

impl ReaderConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("device_address", None::<String>)?
            .set_default("discovery_timeout", "10s")?
            .set_default("vitals_log_path", "pc60fw.log")?
            .set_default("enable_notify_command", false)?
            .set_default("event_queue_capacity", 256)?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // Loaded into the process environment so the PC60FW_ source picks it up.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("PC60FW").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            enable_notify_command: self.enable_notify_command,
            brightness: self.brightness,
            event_queue_capacity: self.event_queue_capacity,
        }
    }
}
