//! Connect to a switcher and print everything it reports.
//!
//! Usage: `cargo run --example monitor -- <host> [variant] [static|query]`

use pds_control::{CapabilityMode, Event, PdsClient, PdsConfig, Variant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.0.10".to_string());
    let variant: Variant = match args.next() {
        Some(v) => v.parse()?,
        None => Variant::default(),
    };
    let capability_mode = match args.next().as_deref() {
        Some("query") => CapabilityMode::Query,
        _ => CapabilityMode::Static,
    };

    let config = PdsConfig {
        capability_mode,
        ..PdsConfig::new(host, variant)
    };

    println!("Connecting to {} ({})...", config.host, config.variant);
    let client = PdsClient::connect(config).await?;
    let mut events = client.subscribe();

    println!("Inputs:");
    for input in variant.inputs() {
        println!("  {:>2}  {}", input.id, input.label);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event? {
                Event::TransportError(e) => {
                    eprintln!("Connection lost: {}", e);
                    break;
                }
                Event::DeviceError(e) => eprintln!("Device error: {}", e),
                event if event.is_state_change() => {
                    let state = client.state();
                    println!(
                        "{:?} -> preview {:?}, program {:?}, logo {:?}, firmware {}",
                        event,
                        state.preview_input,
                        state.program_input,
                        state.logo_selection,
                        state.firmware_version
                    );
                }
                event => println!("{:?}", event),
            },
        }
    }

    client.shutdown().await;
    Ok(())
}
