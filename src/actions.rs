//! Typed builders for the commands a switcher accepts.
//!
//! Each [`Action`] validates its parameters against the ranges the device
//! accepts and against the inputs present on the configured [`Variant`],
//! then produces a [`Command`]. Sending raw verbs through
//! [`PdsClient::send_action`](crate::PdsClient::send_action) bypasses these checks.

use crate::error::{PdsError, Result};
use crate::protocol::Command;
use crate::types::{InputId, LogoId, Output, Variant};

/// Largest still-image file number accepted by `ISEL -f`
pub const MAX_STILL_FILE: u8 = 64;

/// Longest transition time, in tenths of a second
pub const MAX_TRANSITION_TENTHS: u32 = 129;

/// Largest PiP recall slot
pub const MAX_PIP_RECALL: u8 = 10;

/// Test patterns understood by `OTPT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPattern {
    HorizontalRamp,
    VerticalRamp,
    ColorBars100,
    Grid16,
    Grid32,
    Burst,
    ColorBars75,
    Gray50,
    VerticalGraySteps,
    HorizontalGraySteps,
    White,
    Black,
    Red,
    Green,
    Blue,
}

impl TestPattern {
    /// Wire value of the `-t` option
    pub fn code(&self) -> u32 {
        match self {
            TestPattern::HorizontalRamp => 1,
            TestPattern::VerticalRamp => 2,
            TestPattern::ColorBars100 => 3,
            TestPattern::Grid16 => 4,
            TestPattern::Grid32 => 5,
            TestPattern::Burst => 6,
            TestPattern::ColorBars75 => 7,
            TestPattern::Gray50 => 8,
            TestPattern::VerticalGraySteps => 9,
            TestPattern::HorizontalGraySteps => 10,
            TestPattern::White => 11,
            TestPattern::Black => 12,
            TestPattern::Red => 13,
            TestPattern::Green => 14,
            TestPattern::Blue => 15,
        }
    }
}

/// A switcher operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Swap preview and program
    Take,
    /// Route an input (optionally a stored still file) to preview
    SelectInput { input: InputId, file: Option<u8> },
    Freeze(bool),
    /// Force the output to black
    Black(bool),
    TestPatternEnable { output: Output, on: bool },
    TestPatternType { output: Output, pattern: TestPattern },
    RasterBox { output: Output, on: bool },
    /// Transition duration in tenths of a second
    TransitionTime { tenths: u32 },
    SelectLogo(LogoId),
    SaveLogo(LogoId),
    AutoTake(bool),
    /// Toggle the PiP on the next take
    PendPip { pip: u8, pend: bool },
    /// Input shown in a PiP; `pip` 0 addresses all PiPs
    PipInput { pip: u8, input: InputId },
    PipRecall { pip: u8, slot: u8 },
}

impl Action {
    /// Command verb sent for this action
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Take => "TAKE",
            Action::SelectInput { .. } => "ISEL",
            Action::Freeze(_) => "FREEZE",
            Action::Black(_) => "BLACK",
            Action::TestPatternEnable { .. } => "OTPM",
            Action::TestPatternType { .. } => "OTPT",
            Action::RasterBox { .. } => "ORBM",
            Action::TransitionTime { .. } => "TRNTIME",
            Action::SelectLogo(_) => "LOGOSEL",
            Action::SaveLogo(_) => "LOGOSAVE",
            Action::AutoTake(_) => "AUTOTAKE",
            Action::PendPip { .. } => "PENDPIP",
            Action::PipInput { .. } => "PIPISEL",
            Action::PipRecall { .. } => "PIPREC",
        }
    }

    /// Validate against `variant` and build the command
    pub fn to_command(&self, variant: Variant) -> Result<Command> {
        let cmd = Command::new(self.verb());
        let cmd = match *self {
            Action::Take => cmd,
            Action::SelectInput { input, file } => {
                check_input(variant, input)?;
                let file = match file {
                    Some(file) => {
                        check_range("still file", file.into(), 1, MAX_STILL_FILE.into())?;
                        file.to_string()
                    }
                    None => String::new(),
                };
                cmd.with_option("i", input.to_string()).with_option("f", file)
            }
            Action::Freeze(on) | Action::Black(on) | Action::AutoTake(on) => {
                cmd.with_option("m", flag(on))
            }
            Action::TestPatternEnable { output, on } | Action::RasterBox { output, on } => cmd
                .with_option("o", output.code().to_string())
                .with_option("m", flag(on)),
            Action::TestPatternType { output, pattern } => cmd
                .with_option("o", output.code().to_string())
                .with_option("t", pattern.code().to_string()),
            Action::TransitionTime { tenths } => {
                check_range("transition time", tenths, 0, MAX_TRANSITION_TENTHS)?;
                cmd.with_option("s", format!("{}.{}", tenths / 10, tenths % 10))
            }
            Action::SelectLogo(logo) => {
                check_range("logo", logo, 0, 3)?;
                cmd.with_option("l", logo.to_string())
            }
            Action::SaveLogo(logo) => {
                check_range("logo", logo, 1, 3)?;
                cmd.with_option("l", logo.to_string())
            }
            Action::PendPip { pip, pend } => {
                check_range("PiP", pip.into(), 1, 2)?;
                cmd.with_option("p", pip.to_string()).with_option("m", flag(pend))
            }
            Action::PipInput { pip, input } => {
                check_range("PiP", pip.into(), 0, 2)?;
                check_input(variant, input)?;
                cmd.with_option("p", pip.to_string())
                    .with_option("i", input.to_string())
            }
            Action::PipRecall { pip, slot } => {
                check_range("PiP", pip.into(), 1, 2)?;
                check_range("PiP recall slot", slot.into(), 1, MAX_PIP_RECALL.into())?;
                cmd.with_option("p", pip.to_string())
                    .with_option("f", slot.to_string())
            }
        };
        Ok(cmd)
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

fn check_input(variant: Variant, input: InputId) -> Result<()> {
    if variant.has_input(input) {
        Ok(())
    } else {
        Err(PdsError::InvalidParameter(format!(
            "input {} does not exist on {}",
            input, variant
        )))
    }
}

fn check_range(what: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PdsError::InvalidParameter(format!(
            "{} {} outside {}..={}",
            what, value, min, max
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(action: Action) -> String {
        action.to_command(Variant::Pds902).unwrap().encode()
    }

    #[test]
    fn take() {
        assert_eq!(wire(Action::Take), "TAKE\r");
    }

    #[test]
    fn select_input() {
        assert_eq!(wire(Action::SelectInput { input: 3, file: None }), "ISEL -i 3\r");
        assert_eq!(
            wire(Action::SelectInput { input: 10, file: Some(12) }),
            "ISEL -i 10 -f 12\r"
        );
    }

    #[test]
    fn select_input_checks_variant() {
        let action = Action::SelectInput { input: 7, file: None };
        assert!(action.to_command(Variant::Pds901).is_ok());
        assert!(matches!(
            action.to_command(Variant::Pds701),
            Err(PdsError::InvalidParameter(_))
        ));
        let action = Action::SelectInput { input: 9, file: None };
        assert!(action.to_command(Variant::Pds901).is_err());
    }

    #[test]
    fn still_file_range() {
        let action = Action::SelectInput { input: 1, file: Some(65) };
        assert!(action.to_command(Variant::Pds701).is_err());
        let action = Action::SelectInput { input: 1, file: Some(0) };
        assert!(action.to_command(Variant::Pds701).is_err());
    }

    #[test]
    fn mode_flags() {
        assert_eq!(wire(Action::Freeze(true)), "FREEZE -m 1\r");
        assert_eq!(wire(Action::Black(false)), "BLACK -m 0\r");
        assert_eq!(wire(Action::AutoTake(true)), "AUTOTAKE -m 1\r");
    }

    #[test]
    fn outputs() {
        assert_eq!(
            wire(Action::TestPatternEnable { output: Output::Preview, on: true }),
            "OTPM -o 3 -m 1\r"
        );
        assert_eq!(
            wire(Action::TestPatternType { output: Output::Program, pattern: TestPattern::ColorBars75 }),
            "OTPT -o 1 -t 7\r"
        );
        assert_eq!(
            wire(Action::RasterBox { output: Output::Program, on: false }),
            "ORBM -o 1 -m 0\r"
        );
    }

    #[test]
    fn transition_time() {
        assert_eq!(wire(Action::TransitionTime { tenths: 10 }), "TRNTIME -s 1.0\r");
        assert_eq!(wire(Action::TransitionTime { tenths: 129 }), "TRNTIME -s 12.9\r");
        assert_eq!(wire(Action::TransitionTime { tenths: 5 }), "TRNTIME -s 0.5\r");
        assert!(Action::TransitionTime { tenths: 130 }.to_command(Variant::Pds701).is_err());
    }

    #[test]
    fn logos() {
        assert_eq!(wire(Action::SelectLogo(0)), "LOGOSEL -l 0\r");
        assert!(Action::SelectLogo(4).to_command(Variant::Pds701).is_err());
        assert_eq!(wire(Action::SaveLogo(2)), "LOGOSAVE -l 2\r");
        assert!(Action::SaveLogo(0).to_command(Variant::Pds701).is_err());
    }

    #[test]
    fn pip() {
        assert_eq!(wire(Action::PendPip { pip: 2, pend: true }), "PENDPIP -p 2 -m 1\r");
        assert_eq!(wire(Action::PipInput { pip: 0, input: 5 }), "PIPISEL -p 0 -i 5\r");
        assert_eq!(wire(Action::PipRecall { pip: 1, slot: 10 }), "PIPREC -p 1 -f 10\r");
        assert!(Action::PendPip { pip: 0, pend: true }.to_command(Variant::Pds701).is_err());
        assert!(Action::PipRecall { pip: 1, slot: 11 }.to_command(Variant::Pds701).is_err());
        assert!(Action::PipInput { pip: 1, input: 8 }.to_command(Variant::Pds701).is_err());
    }
}
