//! Unified error types for the boiler controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! boundary uniform. All variants are `Copy` so they can be passed through
//! the cycle without allocation. Faults observed at runtime are *not*
//! errors in this sense; they are expressed as mode transitions and
//! outbound messages. These types cover construction and message-batch
//! problems only.

use core::fmt;

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid.
    Config(ConfigError),
    /// The inbound batch was malformed.
    Transmission(TransmissionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transmission(e) => write!(f, "transmission: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation. The message names which and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Transmission errors
// ---------------------------------------------------------------------------

/// Why a cycle's inbound batch could not be trusted. Any of these drives
/// the controller straight to emergency stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionError {
    /// No level reading, or more than one.
    LevelReading,
    /// No steam reading, or more than one.
    SteamReading,
    /// Pump state count does not match the installed pumps, or an index
    /// repeats or is out of range.
    PumpStates,
    /// Pump controller state count does not match, repeats, or is out of
    /// range.
    PumpControlStates,
    /// A sensor reading was NaN or infinite.
    NonFiniteReading,
}

impl fmt::Display for TransmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelReading => write!(f, "level reading missing or duplicated"),
            Self::SteamReading => write!(f, "steam reading missing or duplicated"),
            Self::PumpStates => write!(f, "pump state set malformed"),
            Self::PumpControlStates => write!(f, "pump controller state set malformed"),
            Self::NonFiniteReading => write!(f, "non-finite sensor reading"),
        }
    }
}

impl From<TransmissionError> for Error {
    fn from(e: TransmissionError) -> Self {
        Self::Transmission(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_funnel_into_the_top_level_type() {
        let config: Error = ConfigError::ValidationFailed("pump count out of 1..=6").into();
        assert_eq!(
            config.to_string(),
            "config: validation failed: pump count out of 1..=6"
        );

        let transmission: Error = TransmissionError::LevelReading.into();
        assert_eq!(
            transmission.to_string(),
            "transmission: level reading missing or duplicated"
        );
    }
}
