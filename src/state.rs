use crate::types::{Capability, InputId, LogoId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Firmware version reported before the device has answered `VER -?`
pub const UNKNOWN_FIRMWARE: &str = "0";

/// Latest known state of the switcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Input currently on preview
    pub preview_input: Option<InputId>,

    /// Input currently on program
    pub program_input: Option<InputId>,

    /// Selected logo / black framestore
    pub logo_selection: Option<LogoId>,

    /// Dotted firmware version string
    pub firmware_version: String,

    /// Firmware major version is 3 or newer
    pub firmware_at_least_v3: bool,

    /// Optional hardware known to be present
    pub capabilities: BTreeSet<Capability>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            preview_input: None,
            program_input: None,
            logo_selection: None,
            firmware_version: UNKNOWN_FIRMWARE.to_string(),
            firmware_at_least_v3: false,
            capabilities: BTreeSet::new(),
        }
    }
}

impl DeviceState {
    /// Check whether a capability flag is set
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Record the firmware version and derive the v3 flag from its major component
    pub(crate) fn set_firmware_version(&mut self, version: impl Into<String>) {
        self.firmware_version = version.into();
        self.firmware_at_least_v3 = major_version(&self.firmware_version) >= 3;
    }

    /// Exchange preview and program, as the device does on a completed take
    pub(crate) fn swap_preview_program(&mut self) {
        std::mem::swap(&mut self.preview_input, &mut self.program_input);
    }
}

/// Integer part of a dotted version, 0 if it does not start with a digit
fn major_version(version: &str) -> u32 {
    let digits: String = version.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Shared holder of the device state for one session.
///
/// Readers get copies; every mutation happens under a single lock so a
/// reader never observes a half-applied update.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<DeviceState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state
    pub fn current(&self) -> DeviceState {
        self.lock().clone()
    }

    /// Apply `f` to the state while holding the lock
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        f(&mut *self.lock())
    }

    /// Forget everything and start over with the given capabilities
    pub(crate) fn reset(&self, capabilities: BTreeSet<Capability>) {
        *self.lock() = DeviceState {
            capabilities,
            ..DeviceState::default()
        };
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
