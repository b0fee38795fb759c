use crate::config::{AppConfig, Connection, Transport};
use coarsetime::Instant;
use derivative::Derivative;
use futures::StreamExt;
use hud_common::snapshot::Snapshot;
use log::{debug, error, info, trace, warn};
use reqwest::{Client, ClientBuilder};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("no snapshot within {0:?}")]
    Timeout(Duration),
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("malformed snapshot: {0}")]
    MalformedPayload(String),
    #[error("tracker version {found} does not match the expected {expected}, update the overlay")]
    VersionMismatch { expected: String, found: String },
}

#[derive(Derivative)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum ConnectionState {
    #[derivative(Default)]
    Idle,
    /// An attempt is outstanding
    Connecting,
    Connected,
    /// The last attempt failed, waiting out the rest of the cycle
    Backoff,
}

/// Result of one connection cycle. `cycle` increases by one per cycle started.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub cycle: u64,
    pub result: Result<Snapshot, ConnectionError>,
}

/// Decodes a snapshot and checks the tracker version against `expected_version`.
/// A snapshot that does not report a version is accepted.
pub fn decode(payload: &[u8], expected_version: Option<&str>) -> Result<Snapshot, ConnectionError> {
    let snapshot = Snapshot::from_json(payload)
        .map_err(|e| ConnectionError::MalformedPayload(e.to_string()))?;

    match expected_version {
        Some(expected) if !snapshot.version.is_empty() && snapshot.version != expected => {
            Err(ConnectionError::VersionMismatch {
                expected: expected.to_string(),
                found: snapshot.version,
            })
        }
        _ => Ok(snapshot),
    }
}

/// Opens a socket per cycle and keeps only the first message, so a slow
/// consumer never works through a queue of stale snapshots
#[derive(Debug)]
struct WebSocketSource {
    url: String,
}

impl WebSocketSource {
    async fn fetch(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ConnectionError::Refused(e.to_string()))?;

        let payload = loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => break text.as_str().as_bytes().to_vec(),
                Some(Ok(Message::Binary(bytes))) => break bytes.to_vec(),
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ConnectionError::Refused(
                        "socket closed before sending a snapshot".to_string(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ConnectionError::Refused(e.to_string())),
            }
        };

        if let Err(e) = socket.close(None).await {
            debug!("Couldn't close snapshot socket cleanly: {e}");
        }
        Ok(payload)
    }
}

#[derive(Debug)]
struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    async fn fetch(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http_error)?;

        let body = response.bytes().await.map_err(http_error)?;
        Ok(body.to_vec())
    }
}

fn http_error(e: reqwest::Error) -> ConnectionError {
    if e.is_timeout() {
        ConnectionError::Timeout(Duration::ZERO)
    } else {
        ConnectionError::Refused(e.to_string())
    }
}

#[derive(Debug)]
enum Source {
    Streaming(WebSocketSource),
    Polling(HttpSource),
}

/// Owns the one transport used for the life of the process. Taking `&mut self`
/// to acquire means a second attempt can't start while one is pending.
#[derive(Debug)]
pub struct ConnectionManager {
    source: Source,
    request_timeout: Duration,
    expected_version: Option<String>,
}

impl ConnectionManager {
    pub fn new(connection: &Connection) -> Result<Self, reqwest::Error> {
        let source = match connection.transport {
            Transport::Streaming => Source::Streaming(WebSocketSource {
                url: connection.streaming_url(),
            }),
            Transport::Polling => Source::Polling(HttpSource {
                client: ClientBuilder::new()
                    .timeout(connection.request_timeout())
                    .no_proxy()
                    .build()?,
                url: connection.polling_url(),
            }),
        };

        Ok(Self {
            source,
            request_timeout: connection.request_timeout(),
            expected_version: connection.expected_version.clone(),
        })
    }

    pub fn transport(&self) -> Transport {
        match self.source {
            Source::Streaming(_) => Transport::Streaming,
            Source::Polling(_) => Transport::Polling,
        }
    }

    pub async fn acquire_snapshot(&mut self) -> Result<Snapshot, ConnectionError> {
        let source = &mut self.source;
        let attempt = async move {
            match source {
                Source::Streaming(source) => source.fetch().await,
                Source::Polling(source) => source.fetch().await,
            }
        };

        let payload = match timeout(self.request_timeout, attempt).await {
            Ok(Err(ConnectionError::Timeout(_))) | Err(_) => {
                return Err(ConnectionError::Timeout(self.request_timeout));
            }
            Ok(result) => result?,
        };
        decode(&payload, self.expected_version.as_deref())
    }
}

/// Keeps a backend that stays down from flooding the log: every failure is
/// logged at debug level, but a given reason only reaches warn level once per
/// window.
#[derive(Debug)]
pub struct ErrorLog {
    window: coarsetime::Duration,
    last_logged: HashMap<String, Instant>,
    consecutive: u64,
}

impl ErrorLog {
    pub fn new(window: Duration) -> Self {
        Self {
            window: coarsetime::Duration::from_secs(window.as_secs()),
            last_logged: HashMap::new(),
            consecutive: 0,
        }
    }

    /// Returns whether the failure was logged at warn level
    pub fn record(&mut self, error: &ConnectionError) -> bool {
        self.record_at(error, Instant::now())
    }

    fn record_at(&mut self, error: &ConnectionError, now: Instant) -> bool {
        self.consecutive += 1;
        let reason = error.to_string();
        debug!("Snapshot request {} failed: {reason}", self.consecutive);

        let window = self.window;
        self.last_logged
            .retain(|_, logged| now.duration_since(*logged) < window);
        if self.last_logged.contains_key(&reason) {
            return false;
        }

        warn!(
            "Couldn't get a snapshot from the tracker: {reason}. Retrying every cycle, \
             this message is repeated at most every {}s",
            window.as_secs()
        );
        self.last_logged.insert(reason, now);
        true
    }

    pub fn recovered(&mut self) {
        if self.consecutive > 0 {
            info!(
                "Got a snapshot from the tracker after {} failed attempts",
                self.consecutive
            );
            self.consecutive = 0;
        }
    }
}

/// Runs one cycle per `cadence`, in order, until the receiver hangs up.
///
/// There is no backoff: the tracker is local and restarts quickly, so a fixed
/// rate of one request per cycle is accepted while it is down. An attempt that
/// hasn't resolved by the next cycle boundary is dropped and reported as a
/// timeout, and nothing from it is ever delivered.
pub async fn run_cycles(
    mut manager: ConnectionManager,
    cadence: Duration,
    tx: crossbeam_channel::Sender<CycleOutcome>,
    mut error_log: ErrorLog,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle = 0u64;
    let mut state = ConnectionState::Idle;

    loop {
        ticker.tick().await;
        cycle += 1;
        state = update_state(state, ConnectionState::Connecting);

        let result = match timeout(cadence, manager.acquire_snapshot()).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Cycle {cycle} didn't resolve within {cadence:?}, abandoning it");
                Err(ConnectionError::Timeout(cadence))
            }
        };

        match &result {
            Ok(_) => {
                error_log.recovered();
                state = update_state(state, ConnectionState::Connected);
            }
            Err(e) => {
                error_log.record(e);
                state = update_state(state, ConnectionState::Backoff);
            }
        }

        if tx.send(CycleOutcome { cycle, result }).is_err() {
            info!("Snapshot receiver closed, stopping networking");
            return;
        }
    }
}

fn update_state(old: ConnectionState, new: ConnectionState) -> ConnectionState {
    if old != new {
        trace!("Connection state {old:?} -> {new:?}");
    }
    new
}

#[tokio::main]
pub async fn networking_thread(tx: crossbeam_channel::Sender<CycleOutcome>, config: AppConfig) {
    let connection = config.connection;
    let manager = match ConnectionManager::new(&connection) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Couldn't create the {} transport: {e}", connection.transport);
            return;
        }
    };

    info!(
        "Requesting snapshots by {} from {} every {:?}",
        manager.transport(),
        match manager.transport() {
            Transport::Streaming => connection.streaming_url(),
            Transport::Polling => connection.polling_url(),
        },
        connection.cadence()
    );

    let error_log = ErrorLog::new(Duration::from_secs(
        config.diagnostics.error_log_window_secs,
    ));
    run_cycles(manager, connection.cadence(), tx, error_log).await;
}
