//! Typed configuration: bus parameters and device records.
//!
//! Loaded from a YAML file and validated before anything touches the
//! network, so the controller only ever sees well-formed records.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::device::DeviceRecord;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("duplicate device id: {0}")]
    DuplicateDevice(String),
    #[error("invalid broker endpoint {endpoint}: {reason}")]
    InvalidBroker { endpoint: String, reason: String },
    #[error("unsupported broker scheme {0}://, expected mqtt:// or wss://")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker endpoint URL; the scheme selects the transport.
    pub broker: String,
    pub username: String,
    pub password: String,
    pub client_id: String,
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
}

fn default_base_topic() -> String {
    "homepage".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

impl AppConfig {
    /// Load and validate the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::DuplicateDevice(device.id.clone()));
            }
        }
        BrokerEndpoint::parse(&self.mqtt.broker)?;
        Ok(())
    }
}

/// Broker endpoint with the transport selected by scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEndpoint {
    /// Plain TCP: `mqtt://host[:port]`, port defaults to 1883.
    Tcp { host: String, port: u16 },
    /// TLS websocket: `wss://host[/path]`, path defaults to `/mqtt`.
    TlsWebsocket { url: String },
}

impl BrokerEndpoint {
    pub fn parse(endpoint: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidBroker {
            endpoint: endpoint.into(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "mqtt" => {
                let host = url.host_str().ok_or_else(|| ConfigError::InvalidBroker {
                    endpoint: endpoint.into(),
                    reason: "missing host".into(),
                })?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port: url.port().unwrap_or(1883),
                })
            }
            "wss" => {
                let mut url = url;
                if url.path().is_empty() || url.path() == "/" {
                    url.set_path("/mqtt");
                }
                Ok(Self::TlsWebsocket {
                    url: url.to_string(),
                })
            }
            scheme => Err(ConfigError::UnsupportedScheme(scheme.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const FULL_CONFIG: &str = r#"
mqtt:
  broker: mqtt://localhost:1883
  username: user
  password: pass
  client_id: switch-agent
  base_topic: home
devices:
  - id: lamp1
    name: Living room lamp
    enable_action: turn_on.sh
    disable_action: turn_off.sh
    state_command: query.sh
"#;

    #[test]
    fn test_load_full_config() {
        let file = write_config(FULL_CONFIG);
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.mqtt.client_id, "switch-agent");
        assert_eq!(config.mqtt.base_topic, "home");
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].id, "lamp1");
        assert_eq!(config.devices[0].state_command, "query.sh");
    }

    #[test]
    fn test_base_topic_defaults_to_homepage() {
        let file = write_config(
            r#"
mqtt:
  broker: mqtt://localhost
  username: user
  password: pass
  client_id: switch-agent
devices: []
"#,
        );
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.mqtt.base_topic, "homepage");
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_duplicate_device_id_is_rejected() {
        let file = write_config(
            r#"
mqtt:
  broker: mqtt://localhost
  username: user
  password: pass
  client_id: switch-agent
devices:
  - id: lamp1
    name: Lamp A
    enable_action: a
    disable_action: b
    state_command: c
  - id: lamp1
    name: Lamp B
    enable_action: a
    disable_action: b
    state_command: c
"#,
        );
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDevice(id) if id == "lamp1"));
    }

    #[test]
    fn test_unsupported_scheme_is_rejected_at_load() {
        let file = write_config(
            r#"
mqtt:
  broker: tcp://localhost
  username: user
  password: pass
  client_id: switch-agent
devices: []
"#,
        );
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(s) if s == "tcp"));
    }

    #[test]
    fn test_endpoint_tcp_default_port() {
        let endpoint = BrokerEndpoint::parse("mqtt://broker.local").unwrap();
        assert_eq!(
            endpoint,
            BrokerEndpoint::Tcp {
                host: "broker.local".into(),
                port: 1883
            }
        );
    }

    #[test]
    fn test_endpoint_tcp_explicit_port() {
        let endpoint = BrokerEndpoint::parse("mqtt://broker.local:8883").unwrap();
        assert_eq!(
            endpoint,
            BrokerEndpoint::Tcp {
                host: "broker.local".into(),
                port: 8883
            }
        );
    }

    #[test]
    fn test_endpoint_wss_default_path() {
        let endpoint = BrokerEndpoint::parse("wss://broker.example").unwrap();
        assert_eq!(
            endpoint,
            BrokerEndpoint::TlsWebsocket {
                url: "wss://broker.example/mqtt".into()
            }
        );
    }

    #[test]
    fn test_endpoint_wss_keeps_explicit_path() {
        let endpoint = BrokerEndpoint::parse("wss://broker.example/ws").unwrap();
        assert_eq!(
            endpoint,
            BrokerEndpoint::TlsWebsocket {
                url: "wss://broker.example/ws".into()
            }
        );
    }

    #[test]
    fn test_endpoint_garbage_is_invalid() {
        assert!(matches!(
            BrokerEndpoint::parse("not a url"),
            Err(ConfigError::InvalidBroker { .. })
        ));
    }
}
