use crate::capability::CapabilityResolver;
use crate::config::PdsConfig;
use crate::error::{PdsError, Result};
use crate::framer::LineFramer;
use crate::interpreter::{interpret, ResponseEvent};
use crate::protocol::{encode_batch, status_queries, Command};
use crate::state::StateStore;
use crate::subscription::Event;
use crate::types::ConnectionStatus;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

const READ_BUFFER_SIZE: usize = 1024;
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// State shared between a client and its session task
#[derive(Clone)]
pub(crate) struct Shared {
    pub state: StateStore,
    status: Arc<Mutex<ConnectionStatus>>,
    /// Broadcast channel for events (outside the state lock so publishing never blocks readers)
    events: broadcast::Sender<Event>,
}

impl Shared {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: StateStore::new(),
            status: Arc::new(Mutex::new(ConnectionStatus::Disconnected)),
            events,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `status`, publishing a change event if it differs
    pub fn set_status(&self, status: ConnectionStatus) {
        let previous = std::mem::replace(
            &mut *self.status.lock().unwrap_or_else(PoisonError::into_inner),
            status,
        );
        if previous != status {
            tracing::debug!("Status {:?} -> {:?}", previous, status);
            self.publish(Event::StatusChanged(status));
        }
    }

    pub fn publish(&self, event: Event) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Clear device state and report the session as disconnected
    pub fn disconnect(&self) {
        self.state.reset(BTreeSet::new());
        self.set_status(ConnectionStatus::Disconnected);
    }
}

/// Handle to one running session task
pub(crate) struct Connection {
    id: Uuid,
    config: PdsConfig,
    shared: Shared,
    /// Channel for sending outgoing wire strings to the session task
    outbound_tx: mpsc::UnboundedSender<String>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start a session task connecting to the configured host
    pub fn spawn(config: PdsConfig, resolver: Arc<dyn CapabilityResolver>, shared: Shared) -> Self {
        let id = Uuid::new_v4();
        shared.state.reset(resolver.initial(config.variant));
        shared.set_status(ConnectionStatus::Connecting);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (stop_tx, stop_rx) = oneshot::channel();

        let span = tracing::info_span!("pds", session = %id, device = %config.display_name());
        let session = Session {
            config: config.clone(),
            resolver,
            shared: shared.clone(),
            framer: LineFramer::new(),
        };
        let task = tokio::spawn(session.run(outbound_rx, stop_rx).instrument(span));

        Self {
            id,
            config,
            shared,
            outbound_tx,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PdsConfig {
        &self.config
    }

    /// Queue a wire string for transmission (fire and forget)
    pub fn send(&self, wire: String) -> Result<()> {
        if self.shared.status() != ConnectionStatus::Connected {
            tracing::warn!(
                "PDS {} not connected, dropping command {:?}",
                self.config.display_name(),
                wire
            );
            return Err(PdsError::NotConnected);
        }

        self.outbound_tx
            .send(wire)
            .map_err(|_| PdsError::NotConnected)
    }

    /// Stop the session task and wait for it to release the socket
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Session task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The task notices the closed stop channel and tears down on its own
        self.stop_tx.take();
    }
}

/// Everything owned by the session task
struct Session {
    config: PdsConfig,
    resolver: Arc<dyn CapabilityResolver>,
    shared: Shared,
    framer: LineFramer,
}

impl Session {
    async fn run(
        mut self,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let host = self.config.host.trim().to_string();
        let port = self.config.port;
        tracing::info!("Connecting to {}:{}", host, port);

        let connect = timeout(
            self.config.connect_timeout(),
            TcpStream::connect((host.as_str(), port)),
        );
        let stream = tokio::select! {
            biased;

            _ = &mut stop_rx => {
                tracing::debug!("Teardown requested while connecting");
                self.shared.disconnect();
                return;
            }
            result = connect => match result {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return self.fail(e.into()),
                Err(_) => return self.fail(PdsError::ConnectTimeout),
            },
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }
        tracing::info!("Connected to {}:{}", host, port);
        self.shared.set_status(ConnectionStatus::Connected);

        match self.serve(stream, &mut outbound_rx, &mut stop_rx).await {
            Ok(()) => {
                tracing::info!("Session closed");
                self.shared.disconnect();
            }
            Err(e) => self.fail(e),
        }
    }

    /// Pump the socket, the poll timer and outbound commands until stopped or failed
    async fn serve(
        &mut self,
        stream: TcpStream,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        stop_rx: &mut oneshot::Receiver<()>,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        let period = self.config.poll_interval();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let result = loop {
            tokio::select! {
                biased;

                _ = &mut *stop_rx => break Ok(()),

                _ = poll.tick() => {
                    if let Err(e) = write_wire(&mut writer, &encode_batch(&status_queries())).await {
                        break Err(e);
                    }
                }

                wire = outbound_rx.recv() => match wire {
                    Some(wire) => {
                        if let Err(e) = write_wire(&mut writer, &wire).await {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },

                read = reader.read(&mut buf) => match read {
                    Ok(0) => break Err(PdsError::ConnectionClosed),
                    Ok(n) => {
                        if let Some(burst) = self.handle_bytes(&buf[..n]) {
                            if let Err(e) = write_wire(&mut writer, &burst).await {
                                break Err(e);
                            }
                        }
                    }
                    Err(e) => break Err(e.into()),
                },
            }
        };

        // Timer goes first so it can never fire against a closed socket
        drop(poll);
        if let Err(e) = writer.shutdown().await {
            tracing::debug!("Error closing socket: {}", e);
        }
        result
    }

    /// Frame and interpret a chunk; returns one initialization burst per prompt line seen
    fn handle_bytes(&mut self, chunk: &[u8]) -> Option<String> {
        let mut burst: Option<String> = None;

        for line in self.framer.push(chunk) {
            tracing::debug!("Received: {:?}", line);

            // One lock per line: readers never see a half-applied take
            let events = self.shared.state.update(|state| interpret(&line, state));

            for event in events {
                match event {
                    ResponseEvent::DeviceReady => {
                        tracing::debug!("Device ready, sending initialization queries");
                        burst.get_or_insert_with(String::new).push_str(&self.init_burst());
                    }
                    ResponseEvent::Unrecognized(line) => {
                        tracing::trace!("Ignoring line {:?}", line);
                    }
                    event => {
                        if let ResponseEvent::ErrorOccurred(ref e) = event {
                            tracing::error!("PDS {} says: {}", self.config.display_name(), e);
                        }
                        if let Some(event) = Event::from_response(event) {
                            self.shared.publish(event);
                        }
                    }
                }
            }
        }

        burst
    }

    /// Empty line, version query, capability probes, then the status queries
    fn init_burst(&self) -> String {
        let mut commands = vec![Command::query("VER")];
        commands.extend(self.resolver.queries(self.config.variant));
        commands.extend(status_queries());

        let mut wire = String::from("\r");
        wire.push_str(&encode_batch(&commands));
        wire
    }

    fn fail(&self, error: PdsError) {
        tracing::error!("Network error on PDS {}: {}", self.config.display_name(), error);
        self.shared.publish(Event::TransportError(error.to_string()));
        self.shared.disconnect();
    }
}

async fn write_wire(writer: &mut OwnedWriteHalf, wire: &str) -> Result<()> {
    tracing::debug!("Sending: {:?}", wire);
    writer.write_all(wire.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{QueriedCapabilities, StaticCapabilities};
    use crate::types::{Capability, Variant};

    fn session(resolver: Arc<dyn CapabilityResolver>) -> Session {
        Session {
            config: PdsConfig::new("127.0.0.1", Variant::Pds901),
            resolver,
            shared: Shared::new(),
            framer: LineFramer::new(),
        }
    }

    #[test]
    fn init_burst_static() {
        let session = session(Arc::new(StaticCapabilities));
        assert_eq!(
            session.init_burst(),
            "\rVER -?\rPREVIEW -?\rPROGRAM -?\rLOGOSEL -?\r"
        );
    }

    #[test]
    fn init_burst_queried() {
        let session = session(Arc::new(QueriedCapabilities));
        let burst = session.init_burst();
        assert!(burst.starts_with("\rVER -?\rIAVAIL -i 7 -?\r"));
        assert!(burst.ends_with("OAVAIL -o 2 -?\rPREVIEW -?\rPROGRAM -?\rLOGOSEL -?\r"));
    }

    #[test]
    fn handle_bytes_updates_state_and_publishes() {
        let mut session = session(Arc::new(StaticCapabilities));
        let mut rx = session.shared.subscribe();

        assert_eq!(session.handle_bytes(b"PREVIEW -i2\rPROGRAM -i"), None);
        assert_eq!(session.handle_bytes(b"5\rTAKE -e 0\r"), None);

        let state = session.shared.state.current();
        assert_eq!(state.preview_input, Some(5));
        assert_eq!(state.program_input, Some(2));

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                Event::PreviewChanged(Some(2)),
                Event::ProgramChanged(Some(5)),
                Event::PreviewChanged(Some(5)),
                Event::ProgramChanged(Some(2)),
            ]
        );
    }

    #[test]
    fn handle_bytes_returns_burst_on_prompt() {
        let mut session = session(Arc::new(StaticCapabilities));
        let burst = session.handle_bytes(b"ShellApp waiting for input\r");
        assert_eq!(burst.as_deref(), Some("\rVER -?\rPREVIEW -?\rPROGRAM -?\rLOGOSEL -?\r"));
    }

    #[test]
    fn handle_bytes_answers_every_prompt() {
        let mut session = session(Arc::new(StaticCapabilities));
        let single = session.init_burst();
        let burst = session.handle_bytes(b"ShellApp waiting for input\rShellApp waiting for input\r");
        assert_eq!(burst, Some(format!("{}{}", single, single)));
    }

    #[test]
    fn handle_bytes_publishes_device_errors() {
        let mut session = session(Arc::new(StaticCapabilities));
        let mut rx = session.shared.subscribe();
        session.handle_bytes(b"ISEL -e -9999\r");
        assert!(matches!(rx.try_recv(), Ok(Event::DeviceError(_))));
    }

    #[test]
    fn disconnect_clears_state() {
        let shared = Shared::new();
        shared.state.reset(BTreeSet::from([Capability::Input7]));
        shared.set_status(ConnectionStatus::Connected);
        let mut rx = shared.subscribe();

        shared.disconnect();
        assert_eq!(shared.status(), ConnectionStatus::Disconnected);
        assert!(shared.state.current().capabilities.is_empty());
        assert_eq!(
            rx.try_recv().ok(),
            Some(Event::StatusChanged(ConnectionStatus::Disconnected))
        );

        // Repeating is a no-op
        shared.disconnect();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_before_connected_is_rejected() {
        let shared = Shared::new();
        // Unroutable address: the session is Connecting or has already failed
        let mut config = PdsConfig::new("10.255.255.1", Variant::Pds701);
        config.connect_timeout_ms = 60_000;
        let connection = Connection::spawn(config, Arc::new(StaticCapabilities), shared.clone());

        assert_ne!(shared.status(), ConnectionStatus::Connected);
        assert!(matches!(
            connection.send("TAKE\r".to_string()),
            Err(PdsError::NotConnected)
        ));

        connection.shutdown().await;
        assert_eq!(shared.status(), ConnectionStatus::Disconnected);
    }
}
