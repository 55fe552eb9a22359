//! Inbound message batch and the outbound sink port.
//!
//! ```text
//!   Plant ──▶ Inbox (borrowed, one cycle) ──▶ BoilerController
//!   BoilerController ──▶ MessageSink (port trait) ──▶ Plant
//! ```
//!
//! Both sides are borrowed for exactly one cycle; the controller never
//! retains them. Extraction is strict: a required reading that is missing
//! *or duplicated* counts as not received at all, and pump-state sets must
//! cover every installed pump exactly once.

use crate::config::MAX_PUMPS;
use crate::error::TransmissionError;
use crate::messages::Message;

/// The sensor snapshot every well-formed batch must carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReadings {
    /// Water level (litres).
    pub water: f64,
    /// Steam output rate (litres/second).
    pub steam: f64,
    /// Reported physical pump states, indexed by pump.
    pub pump_state: [bool; MAX_PUMPS],
    /// Pump states as reported by the pump controller units.
    pub pump_control_state: [bool; MAX_PUMPS],
}

/// An ordered inbound batch, borrowed for one cycle and read by index.
#[derive(Debug, Clone, Copy)]
pub struct Inbox<'a> {
    messages: &'a [Message],
}

impl<'a> Inbox<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Read one message by batch position.
    pub fn read(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'a, Message> {
        self.messages.iter()
    }

    /// True if the plant announced readiness this cycle.
    pub fn boiler_waiting(&self) -> bool {
        self.messages
            .iter()
            .any(|m| matches!(m, Message::SteamBoilerWaiting))
    }

    /// True if the plant confirmed initialisation this cycle.
    pub fn physical_units_ready(&self) -> bool {
        self.messages
            .iter()
            .any(|m| matches!(m, Message::PhysicalUnitsReady))
    }

    /// Extract the full sensor snapshot, or fail with the first
    /// transmission problem found.
    pub fn extract_readings(
        &self,
        pump_count: usize,
    ) -> Result<CycleReadings, TransmissionError> {
        let water = self
            .only_level()
            .ok_or(TransmissionError::LevelReading)?;
        let steam = self
            .only_steam()
            .ok_or(TransmissionError::SteamReading)?;
        if !water.is_finite() || !steam.is_finite() {
            return Err(TransmissionError::NonFiniteReading);
        }

        let mut pump_state = [None; MAX_PUMPS];
        for m in self.messages {
            if let Message::PumpState { index, on } = *m {
                if index >= pump_count || pump_state[index].is_some() {
                    return Err(TransmissionError::PumpStates);
                }
                pump_state[index] = Some(on);
            }
        }
        if pump_state[..pump_count].iter().any(Option::is_none) {
            return Err(TransmissionError::PumpStates);
        }

        let mut pump_control_state = [None; MAX_PUMPS];
        for m in self.messages {
            if let Message::PumpControlState { index, on } = *m {
                if index >= pump_count || pump_control_state[index].is_some() {
                    return Err(TransmissionError::PumpControlStates);
                }
                pump_control_state[index] = Some(on);
            }
        }
        if pump_control_state[..pump_count].iter().any(Option::is_none) {
            return Err(TransmissionError::PumpControlStates);
        }

        Ok(CycleReadings {
            water,
            steam,
            pump_state: pump_state.map(|s| s.unwrap_or(false)),
            pump_control_state: pump_control_state.map(|s| s.unwrap_or(false)),
        })
    }

    /// The level reading, if exactly one was received.
    fn only_level(&self) -> Option<f64> {
        self.only_match(|m| match m {
            Message::Level(v) => Some(*v),
            _ => None,
        })
    }

    /// The steam reading, if exactly one was received.
    fn only_steam(&self) -> Option<f64> {
        self.only_match(|m| match m {
            Message::Steam(v) => Some(*v),
            _ => None,
        })
    }

    /// The single value selected by `pick`, or `None` on zero or multiple
    /// matches. A duplicated reading cannot be trusted any more than a
    /// missing one.
    fn only_match<T>(&self, pick: impl Fn(&Message) -> Option<T>) -> Option<T> {
        let mut found = None;
        for m in self.messages {
            if let Some(v) = pick(m) {
                if found.is_some() {
                    return None;
                }
                found = Some(v);
            }
        }
        found
    }
}

/// Write-side port: the controller hands each outbound message to the sink
/// as it is produced. Adapters decide where they go.
pub trait MessageSink {
    fn send(&mut self, message: Message);
}

/// Convenience impl so plain vectors work as sinks in tests and harnesses.
impl MessageSink for Vec<Message> {
    fn send(&mut self, message: Message) {
        self.push(message);
    }
}
