use crate::error::{DeviceError, PdsError, Result};
use crate::interpreter::ResponseEvent;
use crate::types::{Capability, ConnectionStatus, InputId, LogoId};
use tokio::sync::broadcast;

/// Event published by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PreviewChanged(Option<InputId>),
    ProgramChanged(Option<InputId>),
    LogoChanged(Option<LogoId>),
    FirmwareVersion { version: String, at_least_v3: bool },
    CapabilityDiscovered(Capability),

    /// The device rejected a command with a negative error code
    DeviceError(DeviceError),

    /// The transport failed; the session is now disconnected
    TransportError(String),

    /// The session moved to a new lifecycle state
    StatusChanged(ConnectionStatus),
}

impl Event {
    /// Convert an interpreter event into the event subscribers see.
    ///
    /// Returns `None` for events that only matter to the session itself.
    pub(crate) fn from_response(event: ResponseEvent) -> Option<Self> {
        match event {
            ResponseEvent::PreviewChanged(input) => Some(Event::PreviewChanged(input)),
            ResponseEvent::ProgramChanged(input) => Some(Event::ProgramChanged(input)),
            ResponseEvent::LogoChanged(logo) => Some(Event::LogoChanged(logo)),
            ResponseEvent::VersionInfo { version, at_least_v3 } => {
                Some(Event::FirmwareVersion { version, at_least_v3 })
            }
            ResponseEvent::CapabilityDiscovered(cap) => Some(Event::CapabilityDiscovered(cap)),
            ResponseEvent::ErrorOccurred(error) => Some(Event::DeviceError(error)),
            ResponseEvent::DeviceReady | ResponseEvent::Unrecognized(_) => None,
        }
    }

    /// Whether the event reports a change to the device state
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Event::PreviewChanged(_)
                | Event::ProgramChanged(_)
                | Event::LogoChanged(_)
                | Event::FirmwareVersion { .. }
                | Event::CapabilityDiscovered(_)
        )
    }

    /// Whether the event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Event::DeviceError(_) | Event::TransportError(_))
    }
}

/// Receiver for session events
///
/// Created by [`PdsClient::subscribe`](crate::PdsClient::subscribe). A receiver
/// keeps working across reconfiguration and only closes when the client that
/// created it is dropped.
pub struct EventReceiver {
    rx: broadcast::Receiver<Event>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Wait for the next event
    ///
    /// A disconnect is reported as [`Event::StatusChanged`], not as an error.
    /// `ConnectionClosed` means the `PdsClient` itself is gone and no more
    /// events will arrive. `ChannelError` means this receiver fell more than
    /// 100 events behind; the skipped events are lost but the next call
    /// resumes with the oldest retained one, so poll [`PdsClient::state`](crate::PdsClient::state)
    /// to catch up.
    pub async fn recv(&mut self) -> Result<Event> {
        use broadcast::error::RecvError;

        match self.rx.recv().await {
            Ok(event) => Ok(event),
            Err(RecvError::Closed) => Err(PdsError::ConnectionClosed),
            Err(RecvError::Lagged(skipped)) => Err(lagged(skipped)),
        }
    }

    /// Take a queued event without waiting, `Ok(None)` if nothing is queued
    pub fn try_recv(&mut self) -> Result<Option<Event>> {
        use broadcast::error::TryRecvError;

        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(PdsError::ConnectionClosed),
            Err(TryRecvError::Lagged(skipped)) => Err(lagged(skipped)),
        }
    }
}

fn lagged(skipped: u64) -> PdsError {
    tracing::warn!("Event subscriber fell behind, {} events dropped", skipped);
    PdsError::ChannelError(format!("{} events dropped", skipped))
}
