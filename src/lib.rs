//! Rust library for controlling PDS video presentation switchers
//!
//! This library provides an async API for monitoring and controlling PDS-701,
//! PDS-901 and PDS-902 switchers through their line-oriented ASCII shell on
//! TCP port 3000. It supports:
//!
//! - Session lifecycle with status tracking and periodic state polling
//! - Preview, program and logo selection tracking
//! - Firmware version and optional hardware (capability) detection
//! - Device error codes mapped to named kinds
//! - Raw and typed (validated) command sending
//! - Real-time event subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use pds_control::{Action, Event, PdsClient, PdsConfig, Variant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PdsClient::connect(PdsConfig::new("192.168.0.10", Variant::Pds902)).await?;
//!     let mut events = client.subscribe();
//!
//!     client.send(&Action::SelectInput { input: 3, file: None }).await?;
//!     client.send(&Action::Take).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             Event::ProgramChanged(input) => println!("Program: {:?}", input),
//!             Event::DeviceError(e) => eprintln!("Device error: {}", e),
//!             _ => {}
//!         }
//!     }
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Client**: configuration, command sending and state access
//! - **Connection**: the session task owning the socket, poll timer and framing buffer
//! - **Framer**: splits the byte stream into CR-terminated lines
//! - **Interpreter**: turns lines into state mutations and events
//! - **State**: the latest known device state
//! - **Protocol**: command encoding and response tokenization
//! - **Capability**: strategies for discovering optional inputs/outputs
//! - **Actions**: typed, validated builders for the device command set

mod actions;
mod capability;
mod client;
mod config;
mod connection;
mod error;
mod framer;
mod interpreter;
mod protocol;
mod state;
mod subscription;
mod types;

// Public exports
pub use actions::{Action, TestPattern};
pub use capability::{CapabilityMode, CapabilityResolver, QueriedCapabilities, StaticCapabilities};
pub use client::PdsClient;
pub use config::PdsConfig;
pub use error::{DeviceError, DeviceErrorKind, PdsError, Result};
pub use framer::LineFramer;
pub use interpreter::{interpret, ResponseEvent};
pub use protocol::{encode_command, Command, ResponseLine, DEFAULT_PORT, PROMPT_BANNER};
pub use state::{DeviceState, StateStore};
pub use subscription::{Event, EventReceiver};
pub use types::{
    logo_choices, Capability, ConnectionStatus, InputChoice, InputId, InputKind, LogoId, Output,
    Variant, BLACK_LOGO_INPUT,
};
