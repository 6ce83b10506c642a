use crate::actions::Action;
use crate::capability::CapabilityResolver;
use crate::config::PdsConfig;
use crate::connection::{Connection, Shared};
use crate::error::{PdsError, Result};
use crate::protocol::Command;
use crate::state::DeviceState;
use crate::subscription::{Event, EventReceiver};
use crate::types::ConnectionStatus;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Client for one PDS switcher
///
/// The `PdsClient` owns at most one session with the device at a time.
/// State and subscriptions survive reconfiguration; a new configuration
/// tears the old session down before starting the next.
pub struct PdsClient {
    shared: Shared,
    connection: Mutex<Option<Connection>>,
}

impl Default for PdsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PdsClient {
    /// Create an unconfigured client
    pub fn new() -> Self {
        Self {
            shared: Shared::new(),
            connection: Mutex::new(None),
        }
    }

    /// Configure a client and wait until the device accepts the connection
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pds_control::{PdsClient, PdsConfig, Variant};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PdsClient::connect(PdsConfig::new("192.168.0.10", Variant::Pds902)).await?;
    ///     client.send_action("ISEL", [("i", "3")]).await?;
    ///     client.send_action("TAKE", Vec::<(&str, &str)>::new()).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: PdsConfig) -> Result<Self> {
        if !config.has_host() {
            return Err(PdsError::InvalidConfig("host is empty".to_string()));
        }

        let client = Self::new();
        let mut events = client.subscribe();
        client.configure(config).await?;

        loop {
            match events.recv().await? {
                Event::StatusChanged(ConnectionStatus::Connected) => return Ok(client),
                Event::TransportError(e) => return Err(PdsError::Transport(e)),
                _ => {}
            }
        }
    }

    /// Apply a configuration
    ///
    /// Any existing session is torn down and the device state cleared. A new
    /// session is started when the configuration names a host; otherwise the
    /// client stays disconnected.
    pub async fn configure(&self, config: PdsConfig) -> Result<()> {
        let resolver = config.capability_mode.resolver();
        self.configure_with_resolver(config, resolver).await
    }

    /// Apply a configuration with a custom capability resolver
    pub async fn configure_with_resolver(
        &self,
        config: PdsConfig,
        resolver: Arc<dyn CapabilityResolver>,
    ) -> Result<()> {
        config.validate()?;

        let mut connection = self.connection.lock().await;
        if let Some(old) = connection.take() {
            tracing::debug!("Reconfiguring, closing session {}", old.id());
            old.shutdown().await;
        }
        self.shared.disconnect();

        if config.has_host() {
            *connection = Some(Connection::spawn(config, resolver, self.shared.clone()));
        } else {
            tracing::info!("No host configured, staying disconnected");
        }
        Ok(())
    }

    /// Send a raw verb with ordered options, e.g. `("ISEL", [("i", "3")])`
    ///
    /// Options with an empty value are left out of the command.
    pub async fn send_action<K, V>(
        &self,
        verb: &str,
        options: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.send_command(&Command::from_options(verb, options)).await
    }

    /// Validate a typed action against the configured variant and send it
    pub async fn send(&self, action: &Action) -> Result<()> {
        let connection = self.connection.lock().await;
        let connection = connection.as_ref().ok_or(PdsError::NotConnected)?;
        let command = action.to_command(connection.config().variant)?;
        connection.send(command.encode())
    }

    /// Send a prepared command
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        let connection = self.connection.lock().await;
        match connection.as_ref() {
            Some(connection) => connection.send(command.encode()),
            None => {
                tracing::warn!("No session configured, dropping {} command", command.verb());
                Err(PdsError::NotConnected)
            }
        }
    }

    /// Snapshot of the latest known device state
    pub fn state(&self) -> DeviceState {
        self.shared.state.current()
    }

    /// Current session lifecycle state
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Identifier of the running session, used in log spans
    pub async fn session_id(&self) -> Option<Uuid> {
        self.connection.lock().await.as_ref().map(Connection::id)
    }

    /// Subscribe to state changes, device errors and status changes
    ///
    /// Multiple subscriptions can be active simultaneously and outlive
    /// reconfiguration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pds_control::{Event, PdsClient, PdsConfig, Variant};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PdsClient::connect(PdsConfig::new("192.168.0.10", Variant::Pds701)).await?;
    ///     let mut rx = client.subscribe();
    ///
    ///     while let Ok(event) = rx.recv().await {
    ///         if let Event::ProgramChanged(input) = event {
    ///             println!("Program is now {:?}", input);
    ///         }
    ///     }
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.shared.subscribe())
    }

    /// Tear down the session and clear the device state
    ///
    /// Safe to call repeatedly.
    pub async fn shutdown(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            tracing::info!("Shutting down session {}", connection.id());
            connection.shutdown().await;
        }
        self.shared.disconnect();
    }
}
