use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Input index on the switcher (1-based, 10 is the virtual Black/Logo input)
pub type InputId = u32;

/// Logo / black framestore index (0 is black)
pub type LogoId = u32;

/// Virtual input that routes the selected logo or black framestore
pub const BLACK_LOGO_INPUT: InputId = 10;

/// Hardware model of the connected switcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "VariantRepr", into = "String")]
pub enum Variant {
    #[default]
    Pds701,
    Pds901,
    Pds902,
}

impl Variant {
    /// All known variants
    pub const ALL: [Variant; 3] = [Variant::Pds701, Variant::Pds901, Variant::Pds902];

    /// Numeric id used by host configuration UIs
    pub fn id(&self) -> u8 {
        match self {
            Variant::Pds701 => 1,
            Variant::Pds901 => 2,
            Variant::Pds902 => 3,
        }
    }

    /// Look a variant up by its numeric id
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.id() == id)
    }

    /// Model name as printed on the device
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Pds701 => "PDS-701",
            Variant::Pds901 => "PDS-901",
            Variant::Pds902 => "PDS-902",
        }
    }

    /// Inputs this model can select, in display order
    pub fn inputs(&self) -> Vec<InputChoice> {
        let mut inputs: Vec<InputChoice> = (1..=4)
            .map(|id| InputChoice::new(id, InputKind::Vga))
            .chain((5..=6).map(|id| InputChoice::new(id, InputKind::Dvi)))
            .collect();

        if matches!(self, Variant::Pds901 | Variant::Pds902) {
            inputs.push(InputChoice::new(7, InputKind::Dvi));
            inputs.push(InputChoice::new(8, InputKind::Dvi));
        }
        if matches!(self, Variant::Pds701 | Variant::Pds902) {
            inputs.push(InputChoice::new(9, InputKind::Sdi));
        }
        inputs.push(InputChoice::new(BLACK_LOGO_INPUT, InputKind::BlackLogo));
        inputs
    }

    /// Whether `input` exists on this model
    pub fn has_input(&self, input: InputId) -> bool {
        self.inputs().iter().any(|choice| choice.id == input)
    }

    /// Optional hardware implied by the model alone
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        let mut caps: BTreeSet<Capability> = self
            .inputs()
            .iter()
            .filter_map(|choice| Capability::for_input(choice.id))
            .collect();
        if *self == Variant::Pds902 {
            caps.insert(Capability::SecondOutput);
        }
        caps
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u8>() {
            return Variant::from_id(id).ok_or_else(|| format!("unknown variant id {}", id));
        }
        let normalized = trimmed.to_ascii_uppercase().replace('_', "-");
        Variant::ALL
            .into_iter()
            .find(|v| v.label() == normalized || v.label().replace('-', "") == normalized)
            .ok_or_else(|| format!("unknown variant {:?}", s))
    }
}

/// Accepts either the numeric id or the model name
#[derive(Deserialize)]
#[serde(untagged)]
enum VariantRepr {
    Id(u8),
    Name(String),
}

impl TryFrom<VariantRepr> for Variant {
    type Error = String;

    fn try_from(repr: VariantRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            VariantRepr::Id(id) => {
                Variant::from_id(id).ok_or_else(|| format!("unknown variant id {}", id))
            }
            VariantRepr::Name(name) => name.parse(),
        }
    }
}

impl From<Variant> for String {
    fn from(variant: Variant) -> Self {
        variant.label().to_string()
    }
}

/// Signal type of a physical input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Vga,
    Dvi,
    Sdi,
    BlackLogo,
}

/// A selectable input with its display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputChoice {
    pub id: InputId,
    pub kind: InputKind,
    pub label: String,
}

impl InputChoice {
    fn new(id: InputId, kind: InputKind) -> Self {
        let label = match kind {
            InputKind::Vga => format!("{} VGA", id),
            InputKind::Dvi => format!("{} DVI", id),
            InputKind::Sdi => format!("{} SDI", id),
            InputKind::BlackLogo => "Black/Logo".to_string(),
        };
        Self { id, kind, label }
    }
}

/// Logo framestores selectable with `LOGOSEL`
pub fn logo_choices() -> Vec<(LogoId, &'static str)> {
    vec![(0, "Black"), (1, "Logo 1"), (2, "Logo 2"), (3, "Logo 3")]
}

/// Optional hardware that differs between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "input7Available")]
    Input7,
    #[serde(rename = "input8Available")]
    Input8,
    #[serde(rename = "input9Available")]
    Input9,
    #[serde(rename = "input10Available")]
    Input10,
    #[serde(rename = "secondOutputAvailable")]
    SecondOutput,
}

impl Capability {
    /// Capability flag guarding an optional input, if the input is optional
    pub fn for_input(input: InputId) -> Option<Self> {
        match input {
            7 => Some(Capability::Input7),
            8 => Some(Capability::Input8),
            9 => Some(Capability::Input9),
            10 => Some(Capability::Input10),
            _ => None,
        }
    }

    /// Capability flag guarding an optional output
    pub fn for_output(output: u32) -> Option<Self> {
        match output {
            2 => Some(Capability::SecondOutput),
            _ => None,
        }
    }
}

/// Output a test pattern or raster box applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    Program,
    Preview,
}

impl Output {
    /// Wire value of the `-o` option
    pub fn code(&self) -> u32 {
        match self {
            Output::Program => 1,
            Output::Preview => 3,
        }
    }
}

/// Lifecycle state of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(variant: Variant) -> Vec<InputId> {
        variant.inputs().iter().map(|c| c.id).collect()
    }

    #[test]
    fn input_catalog_per_variant() {
        assert_eq!(ids(Variant::Pds701), vec![1, 2, 3, 4, 5, 6, 9, 10]);
        assert_eq!(ids(Variant::Pds901), vec![1, 2, 3, 4, 5, 6, 7, 8, 10]);
        assert_eq!(ids(Variant::Pds902), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn input_labels() {
        let inputs = Variant::Pds902.inputs();
        assert_eq!(inputs[0].label, "1 VGA");
        assert_eq!(inputs[4].label, "5 DVI");
        assert_eq!(inputs[8].label, "9 SDI");
        assert_eq!(inputs[9].label, "Black/Logo");
    }

    #[test]
    fn static_capabilities() {
        let caps = Variant::Pds701.capabilities();
        assert!(caps.contains(&Capability::Input9));
        assert!(caps.contains(&Capability::Input10));
        assert!(!caps.contains(&Capability::Input7));
        assert!(!caps.contains(&Capability::SecondOutput));

        let caps = Variant::Pds902.capabilities();
        assert_eq!(caps.len(), 5);
    }

    #[test]
    fn parse_variant() {
        assert_eq!("1".parse::<Variant>(), Ok(Variant::Pds701));
        assert_eq!("PDS-901".parse::<Variant>(), Ok(Variant::Pds901));
        assert_eq!("pds902".parse::<Variant>(), Ok(Variant::Pds902));
        assert!("4".parse::<Variant>().is_err());
        assert!("PDS-999".parse::<Variant>().is_err());
    }

    #[test]
    fn variant_serde() {
        let v: Variant = serde_json::from_str("2").unwrap();
        assert_eq!(v, Variant::Pds901);
        let v: Variant = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(v, Variant::Pds902);
        assert_eq!(serde_json::to_string(&Variant::Pds701).unwrap(), "\"PDS-701\"");
    }

    #[test]
    fn capability_serde_names() {
        assert_eq!(
            serde_json::to_string(&Capability::Input7).unwrap(),
            "\"input7Available\""
        );
        assert_eq!(
            serde_json::to_string(&Capability::SecondOutput).unwrap(),
            "\"secondOutputAvailable\""
        );
    }
}
