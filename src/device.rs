//! Device records and the two-valued switch state domain.

use std::collections::HashMap;

use serde::Deserialize;

/// A switchable device backed by host shell commands.
///
/// Records are immutable after configuration load; the agent never rewrites
/// the actions it was handed.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    /// Command that turns the device on.
    pub enable_action: String,
    /// Command that turns the device off.
    pub disable_action: String,
    /// Command whose trimmed stdout reports the current state.
    pub state_command: String,
}

/// Devices keyed by id, built once at startup.
pub type DeviceRegistry = HashMap<String, DeviceRecord>;

/// Switch state as it appears on the bus: `"0"` (off) or `"1"` (on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Off,
    On,
}

impl DeviceState {
    /// Parse a control payload. Only the exact texts `"0"` and `"1"` are
    /// control messages; anything else is not one.
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "0" => Some(Self::Off),
            "1" => Some(Self::On),
            _ => None,
        }
    }

    /// Interpret state-query output. Output outside the two-valued domain
    /// is unknown and reads as off.
    pub fn from_query_output(output: &str) -> Self {
        if output == "1" {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "0",
            Self::On => "1",
        }
    }

    /// Human-readable form for log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parse_is_strict() {
        assert_eq!(DeviceState::from_payload("0"), Some(DeviceState::Off));
        assert_eq!(DeviceState::from_payload("1"), Some(DeviceState::On));
        assert_eq!(DeviceState::from_payload("maybe"), None);
        assert_eq!(DeviceState::from_payload(""), None);
        assert_eq!(DeviceState::from_payload("01"), None);
    }

    #[test]
    fn test_query_output_parse_is_lenient() {
        assert_eq!(DeviceState::from_query_output("1"), DeviceState::On);
        assert_eq!(DeviceState::from_query_output("0"), DeviceState::Off);
        assert_eq!(DeviceState::from_query_output("running"), DeviceState::Off);
        assert_eq!(DeviceState::from_query_output(""), DeviceState::Off);
    }

    #[test]
    fn test_display_matches_bus_payload() {
        assert_eq!(DeviceState::On.to_string(), "1");
        assert_eq!(DeviceState::Off.to_string(), "0");
    }
}
