//! Charger operating mode

use serde::{Deserialize, Serialize};

/// Charging stage reported in the primary telemetry frame.
///
/// The controller reports an index into a fixed five-entry table. Index 2 has
/// no label in the table and is kept as [`ChargeMode::Reserved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargeMode {
    Idle,
    /// Constant-current bulk charging
    ConstantCurrent,
    Reserved,
    Float,
    Starting,
    /// Index outside the mode table
    Unknown(u16),
}

impl ChargeMode {
    /// Labels in table order.
    pub const LABELS: [&'static str; 5] = ["IDLE", "CC", "", "FLOAT", "STARTING"];

    /// Map the raw table index to a mode.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => ChargeMode::Idle,
            1 => ChargeMode::ConstantCurrent,
            2 => ChargeMode::Reserved,
            3 => ChargeMode::Float,
            4 => ChargeMode::Starting,
            other => ChargeMode::Unknown(other),
        }
    }

    /// Raw table index as sent by the controller.
    pub fn raw(self) -> u16 {
        match self {
            ChargeMode::Idle => 0,
            ChargeMode::ConstantCurrent => 1,
            ChargeMode::Reserved => 2,
            ChargeMode::Float => 3,
            ChargeMode::Starting => 4,
            ChargeMode::Unknown(raw) => raw,
        }
    }

    /// Table text for this mode; empty for reserved and unknown indices.
    pub fn label(self) -> &'static str {
        Self::LABELS.get(self.raw() as usize).copied().unwrap_or("")
    }
}

impl std::fmt::Display for ChargeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeMode::Unknown(raw) => write!(f, "UNKNOWN({raw})"),
            ChargeMode::Reserved => f.write_str("RESERVED"),
            mode => f.write_str(mode.label()),
        }
    }
}
