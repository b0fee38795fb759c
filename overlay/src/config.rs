use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::{net::IpAddr, time::Duration};

/// How snapshots are pulled from the tracker. Chosen once at startup.
#[derive(Derivative, Serialize, Deserialize, clap::ValueEnum)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Open a WebSocket, take the first message, close it
    #[derivative(Default)]
    Streaming,
    /// One HTTP request per cycle
    Polling,
}

impl core::fmt::Display for Transport {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Streaming => write!(f, "streaming"),
            Self::Polling => write!(f, "polling"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub host: IpAddr,
    pub port: u16,
    pub transport: Transport,
    /// Interval between cycles, also the deadline for an attempt to resolve
    pub cadence_ms: u64,
    pub request_timeout_ms: u64,
    /// Refuse snapshots from a backend reporting a different version
    pub expected_version: Option<String>,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 17069,
            transport: Transport::Streaming,
            cadence_ms: 1000,
            request_timeout_ms: 1000,
            expected_version: None,
        }
    }
}

impl Connection {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn streaming_url(&self) -> String {
        format!("ws://{}/ws", self.authority())
    }

    pub fn polling_url(&self) -> String {
        format!("http://{}/http", self.authority())
    }

    fn authority(&self) -> String {
        match self.host {
            IpAddr::V4(ip) => format!("{ip}:{}", self.port),
            IpAddr::V6(ip) => format!("[{ip}]:{}", self.port),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Raw events remembered for dedup, oldest are forgotten first
    pub event_history_limit: usize,
    /// A repeated connection error is only logged at warn level once per window
    pub error_log_window_secs: u64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            event_history_limit: 1000,
            error_log_window_secs: 60 * 60,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub connection: Connection,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    const CONNECTION_STRING: &str = indoc!(
        r#"host = "127.0.0.1"
           port = 17069
           transport = "streaming"
           cadence_ms = 1000
           request_timeout_ms = 1000"#
    );

    const DIAGNOSTICS_STRING: &str = indoc!(
        r#"event_history_limit = 1000
           error_log_window_secs = 3600"#
    );

    #[test]
    fn test_deser_connection() {
        let conn: Connection = Default::default();
        let deser = toml::from_str(CONNECTION_STRING);
        assert_eq!(deser, Ok(conn));
    }

    #[test]
    fn test_deser_diagnostics() {
        let diag: Diagnostics = Default::default();
        let deser = toml::from_str(DIAGNOSTICS_STRING);
        assert_eq!(deser, Ok(diag));
    }

    #[test]
    fn test_deser_config() {
        let config: AppConfig = Default::default();
        let deser = toml::from_str(&format!(
            "[connection]\n{}\n[diagnostics]\n{}",
            CONNECTION_STRING, DIAGNOSTICS_STRING
        ));
        assert_eq!(deser, Ok(config));
    }

    #[test]
    fn test_ser_config() {
        let config = AppConfig {
            connection: Connection {
                transport: Transport::Polling,
                expected_version: Some("v2.3.0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let serialized = toml::to_string(&config).unwrap();
        let deser = toml::from_str(&serialized);
        assert_eq!(deser, Ok(config));
    }

    #[test]
    fn test_urls() {
        let mut conn = Connection::default();
        assert_eq!(conn.streaming_url(), "ws://127.0.0.1:17069/ws");
        assert_eq!(conn.polling_url(), "http://127.0.0.1:17069/http");

        conn.host = IpAddr::from([0u16, 0, 0, 0, 0, 0, 0, 1]);
        conn.port = 80;
        assert_eq!(conn.polling_url(), "http://[::1]:80/http");
    }
}
