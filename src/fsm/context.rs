//! Shared mutable context threaded through every mode handler.
//!
//! `CycleContext` is the blackboard the mode handlers read from and write
//! to: the cycle's sensor snapshot and fault summary come in, the desired
//! actuator states and handshake intents go out. The controller refreshes
//! the inputs before each tick and turns the outputs into wire messages
//! afterwards.

use log::warn;

use crate::config::{BoilerConfig, MAX_PUMPS};
use crate::diagnosis::STUCK_CYCLES;
use crate::mailbox::CycleReadings;
use crate::prediction::{Band, PredictionEngine};

use super::ModeId;

/// The shared context passed to every mode handler function.
#[derive(Clone)]
pub struct CycleContext {
    /// Plant characteristics, fixed for the run.
    pub config: BoilerConfig,

    // ── Cycle inputs (refreshed by the controller every clock) ──
    /// This cycle's sensor snapshot.
    pub readings: CycleReadings,
    /// Plant announced `STEAM_BOILER_WAITING` this cycle.
    pub boiler_waiting: bool,
    /// Plant announced `PHYSICAL_UNITS_READY` this cycle.
    pub units_ready: bool,

    // ── Fault summary (written before the mode update runs) ──
    /// The water sensor is inside a repair handshake.
    pub water_broken: bool,
    /// Active failures other than the water sensor.
    pub non_water_failures: usize,
    /// Per-pump availability for the selection algorithm.
    pub pump_available: [bool; MAX_PUMPS],
    /// Consecutive identical water readings, including this cycle's.
    pub water_stuck_run: u32,

    // ── Continuous state ──
    /// Last cycle's water reading.
    pub previous_water: Option<f64>,
    /// Last cycle's steam reading.
    pub previous_steam: Option<f64>,
    /// Band predicted last cycle for the chosen pump count.
    pub predicted: Option<Band>,
    /// Last water reading taken while the sensor was trusted. Seeds the
    /// rescue estimate when no band has been recorded yet.
    pub last_healthy_water: f64,
    /// Valve position as commanded. Only initialisation moves it.
    pub valve_open: bool,
    /// Commanded pump states as last sent to the plant (diff base for
    /// open/close emission).
    pub commanded: [bool; MAX_PUMPS],
    /// Initialisation reached the normal band; latched until the plant
    /// confirms readiness.
    pub init_complete: bool,
    /// Cycles the level has refused to fall while draining.
    drain_stall: u32,
    /// Level seen on the previous draining cycle.
    drain_last: Option<f64>,

    // ── Cycle outputs (written by mode handlers) ──
    /// Pump states the current mode wants this cycle.
    pub desired: [bool; MAX_PUMPS],
    /// Request one VALVE toggle this cycle.
    pub valve_toggle: bool,
    /// Request a PROGRAM_READY announcement this cycle.
    pub program_ready: bool,

    prediction: PredictionEngine,
}

impl CycleContext {
    pub fn new(config: BoilerConfig) -> Self {
        Self {
            config,
            readings: CycleReadings {
                water: 0.0,
                steam: 0.0,
                pump_state: [false; MAX_PUMPS],
                pump_control_state: [false; MAX_PUMPS],
            },
            boiler_waiting: false,
            units_ready: false,
            water_broken: false,
            non_water_failures: 0,
            pump_available: [true; MAX_PUMPS],
            water_stuck_run: 0,
            previous_water: None,
            previous_steam: None,
            predicted: None,
            last_healthy_water: 0.0,
            valve_open: false,
            commanded: [false; MAX_PUMPS],
            init_complete: false,
            drain_stall: 0,
            drain_last: None,
            desired: [false; MAX_PUMPS],
            valve_toggle: false,
            program_ready: false,
            prediction: PredictionEngine::new(),
        }
    }

    /// Load one cycle's inputs and clear the per-cycle outputs.
    pub fn begin_cycle(&mut self, readings: CycleReadings, waiting: bool, ready: bool) {
        self.readings = readings;
        self.boiler_waiting = waiting;
        self.units_ready = ready;
        self.desired = self.commanded;
        self.valve_toggle = false;
        self.program_ready = false;
    }

    /// Run the selection algorithm against `water` (observed or estimated)
    /// and fill `desired`. Returns the emergency transition when the
    /// chosen band risks the limit levels.
    pub fn select_pumps(&mut self, water: f64) -> Option<ModeId> {
        let choice = self
            .prediction
            .choose(&self.config, water, self.readings.steam);

        if choice.band.min <= self.config.minimal_limit_level
            || choice.band.max >= self.config.maximal_limit_level
        {
            warn!(
                "predicted level [{:.1}, {:.1}] risks the limit band",
                choice.band.min, choice.band.max
            );
            self.desired = [false; MAX_PUMPS];
            return Some(ModeId::EmergencyStop);
        }

        let mut remaining = choice.pump_count;
        for i in 0..self.config.pump_count {
            if remaining > 0 && self.pump_available[i] {
                self.desired[i] = true;
                remaining -= 1;
            } else {
                self.desired[i] = false;
            }
        }
        self.predicted = Some(choice.band);
        None
    }

    /// Water level to steer by while the sensor is down: the previous
    /// band's pessimistic edge, low side when the boiler was last seen
    /// below the target, high side otherwise.
    pub fn rescue_estimate(&self) -> f64 {
        match self.predicted {
            Some(band) => {
                if self.last_healthy_water < self.config.normal_band_midpoint() {
                    band.min
                } else {
                    band.max
                }
            }
            None => self.last_healthy_water,
        }
    }

    /// Whether the water level has sat still long enough to count as a
    /// stuck sensor.
    pub fn water_reading_frozen(&self) -> bool {
        self.water_stuck_run >= STUCK_CYCLES
    }

    pub fn close_all_pumps(&mut self) {
        self.desired = [false; MAX_PUMPS];
    }

    pub fn open_all_pumps(&mut self) {
        for i in 0..self.config.pump_count {
            self.desired[i] = true;
        }
    }

    /// Request a valve toggle so that the valve ends up open or closed as
    /// asked; a no-op when it is already there.
    pub fn set_valve(&mut self, open: bool) {
        if self.valve_open != open {
            self.valve_toggle = true;
            self.valve_open = open;
        }
    }

    /// Track the draining level during initialisation. Returns true when
    /// the level has failed to fall for two consecutive cycles.
    pub fn drain_stalled(&mut self, water: f64) -> bool {
        if let Some(previous) = self.drain_last {
            if water >= previous {
                self.drain_stall += 1;
            } else {
                self.drain_stall = 0;
            }
        }
        self.drain_last = Some(water);
        self.drain_stall >= 2
    }

    /// Forget the drain watch once the level is no longer being drained.
    pub fn reset_drain_watch(&mut self) {
        self.drain_stall = 0;
        self.drain_last = None;
    }
}
