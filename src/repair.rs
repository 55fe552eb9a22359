//! Per-unit repair handshakes.
//!
//! Every physical unit (water sensor, steam sensor, each pump, each pump
//! controller) carries a small state machine tracking its repair protocol
//! with the plant:
//!
//! ```text
//!   NoFail ──[diagnosed]──▶ FailDetected ──[detection sent]──▶ WaitingFailAck
//!     ▲                                                             │
//!     └──[repaired, ack sent]── WaitingRepair ◀──[plant acked]──────┘
//! ```
//!
//! Handshakes are independent: several units can be anywhere in the
//! protocol at once. Only the legal predecessor state advances; stray
//! acknowledgements and repair notices are ignored.

use log::info;

use crate::config::MAX_PUMPS;
use crate::diagnosis::FailureType;

/// Where a unit sits in the repair protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairState {
    #[default]
    NoFail,
    FailDetected,
    WaitingFailAck,
    WaitingRepair,
}

/// Identity of one physical unit, used for logging and message dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitId {
    Water,
    Steam,
    Pump(usize),
    Controller(usize),
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Water => write!(f, "water sensor"),
            Self::Steam => write!(f, "steam sensor"),
            Self::Pump(i) => write!(f, "pump {i}"),
            Self::Controller(i) => write!(f, "pump controller {i}"),
        }
    }
}

/// One unit's repair record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitRecord {
    pub state: RepairState,
    /// Diagnosis that opened the handshake; `NoFailure` once repaired.
    pub failure: FailureType,
}

impl UnitRecord {
    /// A diagnosed failure opens the handshake. Only a healthy unit can
    /// fail; re-diagnosing a unit already in the protocol is a no-op.
    pub fn detect(&mut self, failure: FailureType) -> bool {
        if self.state != RepairState::NoFail {
            return false;
        }
        self.state = RepairState::FailDetected;
        self.failure = failure;
        true
    }

    /// The detection message went out this cycle.
    pub fn detection_sent(&mut self) -> bool {
        if self.state != RepairState::FailDetected {
            return false;
        }
        self.state = RepairState::WaitingFailAck;
        true
    }

    /// The plant acknowledged the detection.
    pub fn acknowledge(&mut self) -> bool {
        if self.state != RepairState::WaitingFailAck {
            return false;
        }
        self.state = RepairState::WaitingRepair;
        true
    }

    /// The plant reports the unit repaired. Clears the failure.
    pub fn repair(&mut self) -> bool {
        if self.state != RepairState::WaitingRepair {
            return false;
        }
        self.state = RepairState::NoFail;
        self.failure = FailureType::NoFailure;
        true
    }

    /// True while the unit is anywhere in the repair protocol.
    pub fn broken(&self) -> bool {
        self.state != RepairState::NoFail
    }
}

/// All repair records for one plant.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    pub water: UnitRecord,
    pub steam: UnitRecord,
    pub pumps: [UnitRecord; MAX_PUMPS],
    pub controllers: [UnitRecord; MAX_PUMPS],
    pump_count: usize,
}

impl UnitRegistry {
    pub fn new(pump_count: usize) -> Self {
        Self {
            water: UnitRecord::default(),
            steam: UnitRecord::default(),
            pumps: [UnitRecord::default(); MAX_PUMPS],
            controllers: [UnitRecord::default(); MAX_PUMPS],
            pump_count,
        }
    }

    pub fn unit(&self, id: UnitId) -> &UnitRecord {
        match id {
            UnitId::Water => &self.water,
            UnitId::Steam => &self.steam,
            UnitId::Pump(i) => &self.pumps[i],
            UnitId::Controller(i) => &self.controllers[i],
        }
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut UnitRecord {
        match id {
            UnitId::Water => &mut self.water,
            UnitId::Steam => &mut self.steam,
            UnitId::Pump(i) => &mut self.pumps[i],
            UnitId::Controller(i) => &mut self.controllers[i],
        }
    }

    /// Open the handshake for `id` with the diagnosed failure type.
    pub fn detect(&mut self, id: UnitId, failure: FailureType) -> bool {
        let opened = self.unit_mut(id).detect(failure);
        if opened {
            info!("failure detected: {id} ({failure:?})");
        }
        opened
    }

    /// Complete a repair for `id`. Returns true when the unit was actually
    /// waiting for one.
    pub fn repair(&mut self, id: UnitId) -> bool {
        let repaired = self.unit_mut(id).repair();
        if repaired {
            info!("repaired: {id}");
        }
        repaired
    }

    pub fn water_broken(&self) -> bool {
        self.water.broken()
    }

    /// Active failures excluding the water sensor: the count that decides
    /// Degraded versus Normal. Water is excluded because it governs Rescue
    /// instead.
    pub fn active_non_water_failures(&self) -> usize {
        let pumps = self.pumps[..self.pump_count]
            .iter()
            .filter(|u| u.broken())
            .count();
        let controllers = self.controllers[..self.pump_count]
            .iter()
            .filter(|u| u.broken())
            .count();
        pumps + controllers + usize::from(self.steam.broken())
    }

    /// Pump availability mask for the selection algorithm: true when pump
    /// `i` may be commanded on.
    pub fn pump_available(&self, i: usize) -> bool {
        !self.pumps[i].broken()
    }
}
