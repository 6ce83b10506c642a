//! Turns framed response lines into state mutations and events.
//!
//! Each line is tokenized once by [`ResponseLine::parse`] and dispatched on
//! its verb through [`HANDLERS`]. Error codes (`-e -NNNN`) are checked on
//! every line independently of the verb, so a single line can both update
//! state and report an error.

use crate::error::{DeviceError, DeviceErrorKind};
use crate::protocol::{ResponseLine, PROMPT_BANNER};
use crate::state::DeviceState;
use crate::types::{Capability, InputId, LogoId};

/// Code attached to an `ISEL` reply when the selected input has no signal
pub const INVALID_SIGNAL_CODE: i64 = -9999;

/// Outcome of interpreting one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// The shell prompt appeared; the session should send its initialization burst
    DeviceReady,
    VersionInfo { version: String, at_least_v3: bool },
    PreviewChanged(Option<InputId>),
    ProgramChanged(Option<InputId>),
    LogoChanged(Option<LogoId>),
    CapabilityDiscovered(Capability),
    ErrorOccurred(DeviceError),
    /// No pattern matched; carries the raw line
    Unrecognized(String),
}

type Handler = fn(&ResponseLine<'_>, &mut DeviceState, &mut Vec<ResponseEvent>);

/// Verb dispatch table
const HANDLERS: &[(&str, Handler)] = &[
    ("VER", on_version),
    ("PREVIEW", on_preview),
    ("PROGRAM", on_program),
    ("LOGOSEL", on_logo),
    ("ISEL", on_input_select),
    ("TAKE", on_take),
    ("IAVAIL", on_input_available),
    ("OAVAIL", on_output_available),
];

/// Interpret one line against `state`, applying every mutation it implies.
///
/// Always returns at least one event; a line nothing matched yields
/// [`ResponseEvent::Unrecognized`] and leaves `state` untouched.
pub fn interpret(line: &str, state: &mut DeviceState) -> Vec<ResponseEvent> {
    let mut events = Vec::new();

    if line.contains(PROMPT_BANNER) {
        events.push(ResponseEvent::DeviceReady);
    }

    if let Some(parsed) = ResponseLine::parse(line) {
        if let Some((_, handler)) = HANDLERS.iter().find(|(verb, _)| *verb == parsed.verb) {
            handler(&parsed, state, &mut events);
        }
        if let Some(error) = device_error(line, &parsed, state) {
            events.push(ResponseEvent::ErrorOccurred(error));
        }
    }

    if events.is_empty() {
        events.push(ResponseEvent::Unrecognized(line.to_string()));
    }
    events
}

fn on_version(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    let Some(version) = line.args.first().and_then(|arg| dotted_prefix(arg)) else {
        return;
    };
    state.set_firmware_version(version);
    events.push(ResponseEvent::VersionInfo {
        version: state.firmware_version.clone(),
        at_least_v3: state.firmware_at_least_v3,
    });
}

fn on_preview(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    if let Some(input) = index_option(line, 'i') {
        state.preview_input = Some(input);
        events.push(ResponseEvent::PreviewChanged(state.preview_input));
    }
}

fn on_program(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    if let Some(input) = index_option(line, 'i') {
        state.program_input = Some(input);
        events.push(ResponseEvent::ProgramChanged(state.program_input));
    }
}

fn on_logo(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    if let Some(logo) = index_option(line, 'l') {
        state.logo_selection = Some(logo);
        events.push(ResponseEvent::LogoChanged(state.logo_selection));
    }
}

/// Input select always targets preview
fn on_input_select(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    if let Some(input) = index_option(line, 'i') {
        state.preview_input = Some(input);
        events.push(ResponseEvent::PreviewChanged(state.preview_input));
    }
}

fn on_take(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    if line.option_int('e') == Some(0) {
        state.swap_preview_program();
        events.push(ResponseEvent::PreviewChanged(state.preview_input));
        events.push(ResponseEvent::ProgramChanged(state.program_input));
    }
}

fn on_input_available(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    let capability = index_option(line, 'i').and_then(Capability::for_input);
    mark_available(line, capability, state, events);
}

fn on_output_available(line: &ResponseLine<'_>, state: &mut DeviceState, events: &mut Vec<ResponseEvent>) {
    let capability = index_option(line, 'o').and_then(Capability::for_output);
    mark_available(line, capability, state, events);
}

fn mark_available(
    line: &ResponseLine<'_>,
    capability: Option<Capability>,
    state: &mut DeviceState,
    events: &mut Vec<ResponseEvent>,
) {
    let Some(capability) = capability else { return };
    if line.option_int('m') == Some(1) {
        state.capabilities.insert(capability);
        events.push(ResponseEvent::CapabilityDiscovered(capability));
    }
}

fn device_error(raw: &str, line: &ResponseLine<'_>, state: &DeviceState) -> Option<DeviceError> {
    let code = line.error_code()?;

    if line.verb == "ISEL" && code == INVALID_SIGNAL_CODE {
        return Some(DeviceError {
            kind: DeviceErrorKind::InvalidSignal,
            code,
            line: raw.to_string(),
            preview_input: state.preview_input,
        });
    }

    Some(DeviceError {
        kind: DeviceErrorKind::from_code(code),
        code,
        line: raw.to_string(),
        preview_input: None,
    })
}

fn index_option(line: &ResponseLine<'_>, key: char) -> Option<u32> {
    line.option(key).and_then(|value| value.parse().ok())
}

/// Leading run of digits and dots, if the token starts with a digit
fn dotted_prefix(token: &str) -> Option<&str> {
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    Some(&token[..end])
}
