use std::fmt;
use thiserror::Error;

/// Result type for PDS operations
pub type Result<T> = std::result::Result<T, PdsError>;

/// Errors that can occur when talking to a PDS switcher
#[derive(Error, Debug)]
pub enum PdsError {
    /// I/O error on the TCP transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure reported by the session task
    #[error("Transport error: {0}")]
    Transport(String),

    /// The TCP connection could not be established in time
    #[error("Connection timeout")]
    ConnectTimeout,

    /// Connection was closed by the device
    #[error("Connection closed")]
    ConnectionClosed,

    /// A command was sent while the session was not connected
    #[error("Not connected")]
    NotConnected,

    /// The device answered with a negative error code
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An action parameter is outside what the device accepts
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Named failure reported by the device through a `-e -NNNN` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorKind {
    /// The input selected with `ISEL` carries no valid signal
    InvalidSignal,
    GenericFailure,
    InvalidInCurrentState,
    NoDeviceResponse,
    InvalidDeviceResponse,
    Timeout,
    ParameterOutOfRange,
    LookupNotFound,
    ChecksumMismatch,
    VersionMismatch,
    UnsupportedInterface,
    InvalidPointerOperation,
    PartialCommandFailure,
    BufferOverflow,
    StillInitializing,
    Unspecified,
}

impl DeviceErrorKind {
    /// Map the magnitude of a device error code to its kind.
    ///
    /// Accepts either sign, so `-9994` and `9994` both map to
    /// [`DeviceErrorKind::ParameterOutOfRange`].
    pub fn from_code(code: i64) -> Self {
        match code.unsigned_abs() {
            9999 => Self::GenericFailure,
            9998 => Self::InvalidInCurrentState,
            9997 => Self::NoDeviceResponse,
            9996 => Self::InvalidDeviceResponse,
            9995 => Self::Timeout,
            9994 => Self::ParameterOutOfRange,
            9993 => Self::LookupNotFound,
            9992 => Self::ChecksumMismatch,
            9991 => Self::VersionMismatch,
            9990 => Self::UnsupportedInterface,
            9989 => Self::InvalidPointerOperation,
            9988 => Self::PartialCommandFailure,
            9987 => Self::BufferOverflow,
            9986 => Self::StillInitializing,
            _ => Self::Unspecified,
        }
    }

    /// Human-readable description of the failure
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidSignal => "selected input is an invalid or unavailable signal",
            Self::GenericFailure => "generic failure",
            Self::InvalidInCurrentState => "operation is not applicable in current state",
            Self::NoDeviceResponse => "did not get response from device",
            Self::InvalidDeviceResponse => "did not get valid response from device",
            Self::Timeout => "timeout occurred",
            Self::ParameterOutOfRange => "parameter / data out of range",
            Self::LookupNotFound => "no matching data in index",
            Self::ChecksumMismatch => "checksum didn't match",
            Self::VersionMismatch => "version didn't match",
            Self::UnsupportedInterface => "current device interface not supported",
            Self::InvalidPointerOperation => "pointer operation invalid",
            Self::PartialCommandFailure => "part of command had error",
            Self::BufferOverflow => "buffer overflow",
            Self::StillInitializing => "initialization is not done (still in progress)",
            Self::Unspecified => "unspecified error",
        }
    }
}

impl fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A device-reported error, as parsed from one response line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("device error {code}: {kind} ({line})")]
pub struct DeviceError {
    /// Mapped failure kind
    pub kind: DeviceErrorKind,
    /// Raw (negative) code as sent by the device, saturated to `i64::MIN`
    pub code: i64,
    /// The full response line the code arrived on
    pub line: String,
    /// Preview input at the time of an invalid-signal report
    pub preview_input: Option<u32>,
}
