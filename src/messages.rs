//! Typed plant ⇄ controller message vocabulary.
//!
//! One enum variant per wire kind, payloads typed. Messages are small and
//! `Copy`; the controller builds outbound ones directly, no shared
//! templates or buffers involved.

/// Operating mode announced to the plant each cycle.
///
/// The controller's internal Waiting mode has no wire representation; both
/// Waiting and Initialisation announce `Initialisation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Initialisation,
    Normal,
    Degraded,
    Rescue,
    EmergencyStop,
}

impl Mode {
    /// Wire-level name, for logging and display.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Initialisation => "INITIALISATION",
            Self::Normal => "NORMAL",
            Self::Degraded => "DEGRADED",
            Self::Rescue => "RESCUE",
            Self::EmergencyStop => "EMERGENCY_STOP",
        }
    }
}

/// One message on the plant ⇄ controller wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    // ── plant → controller ────────────────────────────────────
    /// Plant announces readiness to start a run.
    SteamBoilerWaiting,
    /// Plant confirms initialisation completion.
    PhysicalUnitsReady,
    /// Water level reading (litres).
    Level(f64),
    /// Steam output reading (litres/second).
    Steam(f64),
    /// Reported physical state of one pump.
    PumpState { index: usize, on: bool },
    /// State of one pump as seen by its controller unit.
    PumpControlState { index: usize, on: bool },
    LevelFailureAcknowledgement,
    SteamFailureAcknowledgement,
    PumpFailureAcknowledgement(usize),
    PumpControlFailureAcknowledgement(usize),
    LevelRepaired,
    SteamRepaired,
    PumpRepaired(usize),
    PumpControlRepaired(usize),

    // ── controller → plant ────────────────────────────────────
    ModeAnnouncement(Mode),
    ProgramReady,
    /// Toggle the drain valve. Only ever sent during initialisation.
    Valve,
    OpenPump(usize),
    ClosePump(usize),
    LevelFailureDetection,
    SteamFailureDetection,
    PumpFailureDetection(usize),
    PumpControlFailureDetection(usize),
    LevelRepairedAcknowledgement,
    SteamRepairedAcknowledgement,
    PumpRepairedAcknowledgement(usize),
    PumpControlRepairedAcknowledgement(usize),
}

impl Message {
    /// Wire-level kind name, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::SteamBoilerWaiting => "STEAM_BOILER_WAITING",
            Self::PhysicalUnitsReady => "PHYSICAL_UNITS_READY",
            Self::Level(_) => "LEVEL_v",
            Self::Steam(_) => "STEAM_v",
            Self::PumpState { .. } => "PUMP_STATE_n_b",
            Self::PumpControlState { .. } => "PUMP_CONTROL_STATE_n_b",
            Self::LevelFailureAcknowledgement => "LEVEL_FAILURE_ACKNOWLEDGEMENT",
            Self::SteamFailureAcknowledgement => "STEAM_OUTCOME_FAILURE_ACKNOWLEDGEMENT",
            Self::PumpFailureAcknowledgement(_) => "PUMP_FAILURE_ACKNOWLEDGEMENT_n",
            Self::PumpControlFailureAcknowledgement(_) => {
                "PUMP_CONTROL_FAILURE_ACKNOWLEDGEMENT_n"
            }
            Self::LevelRepaired => "LEVEL_REPAIRED",
            Self::SteamRepaired => "STEAM_REPAIRED",
            Self::PumpRepaired(_) => "PUMP_REPAIRED_n",
            Self::PumpControlRepaired(_) => "PUMP_CONTROL_REPAIRED_n",
            Self::ModeAnnouncement(_) => "MODE_m",
            Self::ProgramReady => "PROGRAM_READY",
            Self::Valve => "VALVE",
            Self::OpenPump(_) => "OPEN_PUMP_n",
            Self::ClosePump(_) => "CLOSE_PUMP_n",
            Self::LevelFailureDetection => "LEVEL_FAILURE_DETECTION",
            Self::SteamFailureDetection => "STEAM_FAILURE_DETECTION",
            Self::PumpFailureDetection(_) => "PUMP_FAILURE_DETECTION_n",
            Self::PumpControlFailureDetection(_) => "PUMP_CONTROL_FAILURE_DETECTION_n",
            Self::LevelRepairedAcknowledgement => "LEVEL_REPAIRED_ACKNOWLEDGEMENT",
            Self::SteamRepairedAcknowledgement => "STEAM_REPAIRED_ACKNOWLEDGEMENT",
            Self::PumpRepairedAcknowledgement(_) => "PUMP_REPAIRED_ACKNOWLEDGEMENT_n",
            Self::PumpControlRepairedAcknowledgement(_) => {
                "PUMP_CONTROL_REPAIRED_ACKNOWLEDGEMENT_n"
            }
        }
    }
}
