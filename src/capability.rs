//! How a session learns which optional inputs and outputs exist.
//!
//! Older firmware has no availability queries, so the model chosen in the
//! configuration is the only source. Newer units answer `IAVAIL` / `OAVAIL`.
//! Both strategies sit behind [`CapabilityResolver`]; replies to availability
//! queries are applied by the interpreter whichever strategy is active.

use crate::protocol::Command;
use crate::types::{Capability, Variant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Optional inputs that can be probed with `IAVAIL`
pub const QUERYABLE_INPUTS: [u32; 4] = [7, 8, 9, 10];

/// Optional outputs that can be probed with `OAVAIL`
pub const QUERYABLE_OUTPUTS: [u32; 1] = [2];

/// Strategy for discovering capability flags
pub trait CapabilityResolver: Debug + Send + Sync + 'static {
    /// Flags assumed as soon as a session starts
    fn initial(&self, variant: Variant) -> BTreeSet<Capability>;

    /// Queries appended to the initialization burst
    fn queries(&self, variant: Variant) -> Vec<Command>;
}

/// Capabilities implied by the configured hardware model
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCapabilities;

impl CapabilityResolver for StaticCapabilities {
    fn initial(&self, variant: Variant) -> BTreeSet<Capability> {
        variant.capabilities()
    }

    fn queries(&self, _variant: Variant) -> Vec<Command> {
        Vec::new()
    }
}

/// Capabilities reported by the device at runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct QueriedCapabilities;

impl CapabilityResolver for QueriedCapabilities {
    fn initial(&self, _variant: Variant) -> BTreeSet<Capability> {
        BTreeSet::new()
    }

    fn queries(&self, _variant: Variant) -> Vec<Command> {
        let inputs = QUERYABLE_INPUTS
            .iter()
            .map(|input| Command::query("IAVAIL").with_option("i", input.to_string()));
        let outputs = QUERYABLE_OUTPUTS
            .iter()
            .map(|output| Command::query("OAVAIL").with_option("o", output.to_string()));
        inputs.chain(outputs).collect()
    }
}

/// Configuration switch selecting a built-in resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    /// Derive flags from the configured variant
    #[default]
    Static,
    /// Ask the device
    Query,
}

impl CapabilityMode {
    /// Resolver implementing this mode
    pub fn resolver(&self) -> Arc<dyn CapabilityResolver> {
        match self {
            CapabilityMode::Static => Arc::new(StaticCapabilities),
            CapabilityMode::Query => Arc::new(QueriedCapabilities),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_batch;

    #[test]
    fn static_uses_variant() {
        let caps = StaticCapabilities.initial(Variant::Pds901);
        assert!(caps.contains(&Capability::Input7));
        assert!(caps.contains(&Capability::Input8));
        assert!(!caps.contains(&Capability::Input9));
        assert!(StaticCapabilities.queries(Variant::Pds901).is_empty());
    }

    #[test]
    fn queried_starts_empty_and_probes() {
        assert!(QueriedCapabilities.initial(Variant::Pds902).is_empty());
        let wire = encode_batch(&QueriedCapabilities.queries(Variant::Pds902));
        assert_eq!(
            wire,
            "IAVAIL -i 7 -?\rIAVAIL -i 8 -?\rIAVAIL -i 9 -?\rIAVAIL -i 10 -?\rOAVAIL -o 2 -?\r"
        );
    }

    #[test]
    fn mode_selects_resolver() {
        let resolver = CapabilityMode::Query.resolver();
        assert_eq!(resolver.queries(Variant::Pds701).len(), 5);
        let resolver = CapabilityMode::Static.resolver();
        assert_eq!(resolver.initial(Variant::Pds701), Variant::Pds701.capabilities());
    }

    #[test]
    fn mode_serde() {
        let mode: CapabilityMode = serde_json::from_str("\"query\"").unwrap();
        assert_eq!(mode, CapabilityMode::Query);
    }
}
