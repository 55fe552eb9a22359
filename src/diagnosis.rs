//! Per-cycle fault classification and cross-unit disambiguation.
//!
//! Runs every operating cycle **before the mode machine** and decides, from
//! one cycle's evidence, which physical units are lying. Classification is
//! per unit; disambiguation then resolves the cases where a wrong water
//! reading could equally be explained by a misbehaving pump.
//!
//! ## Fault lifecycle
//!
//! 1. A unit with no open handshake produces a candidate [`FailureType`].
//! 2. The disambiguation table attributes each observed discrepancy to
//!    exactly one unit.
//! 3. The controller opens the repair handshake for every attributed unit
//!    and reacts with a mode change (water → Rescue, others → Degraded,
//!    water + steam together → EmergencyStop).
//! 4. Diagnosis is re-run with fresh evidence every cycle; there is no
//!    retry within a cycle.

use log::error;

use crate::config::{BoilerConfig, MAX_PUMPS};
use crate::prediction::Band;
use crate::repair::UnitRegistry;

/// Identical consecutive readings before a sensor is declared stuck.
pub const STUCK_CYCLES: u32 = 3;

/// Tolerance around the predicted band before the water reading counts as
/// deviating (litres).
pub const LEVEL_SLACK: f64 = 0.5;

/// How a unit is failing, as diagnosed this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureType {
    #[default]
    NoFailure,
    /// Reading outside its physical range.
    OutOfBounds,
    /// Sensor repeating itself, or a pump ignoring its command.
    Stuck,
    /// Water below the band predicted last cycle.
    BelowPredicted,
    /// Water above the band predicted last cycle.
    AbovePredicted,
}

/// Tracks identical consecutive readings for one sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StuckCounter {
    last: Option<f64>,
    run: u32,
}

impl StuckCounter {
    /// Feed one reading; returns the current run of identical values.
    pub fn observe(&mut self, value: f64) -> u32 {
        match self.last {
            Some(previous) if previous == value => self.run += 1,
            _ => self.run = 1,
        }
        self.last = Some(value);
        self.run
    }

    /// Forget the history, e.g. after the sensor is repaired.
    pub fn reset(&mut self) {
        self.last = None;
        self.run = 0;
    }

    pub fn run(&self) -> u32 {
        self.run
    }
}

/// One cycle's evidence, borrowed from the controller.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub water: f64,
    pub steam: f64,
    /// Steam reading of the previous cycle, if any.
    pub previous_steam: Option<f64>,
    /// Reported physical pump states.
    pub pump_state: &'a [bool],
    /// Pump states reported by the controller units.
    pub pump_control_state: &'a [bool],
    /// What the controller commanded last cycle.
    pub commanded: &'a [bool],
    /// Band predicted last cycle for the chosen pump count.
    pub predicted: Option<Band>,
}

/// Failures attributed this cycle, one entry per unit at most.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attribution {
    pub water: Option<FailureType>,
    pub steam: Option<FailureType>,
    pub pumps: [Option<FailureType>; MAX_PUMPS],
    pub controllers: [Option<FailureType>; MAX_PUMPS],
}

impl Attribution {
    pub fn is_empty(&self) -> bool {
        self.water.is_none()
            && self.steam.is_none()
            && self.pumps.iter().all(Option::is_none)
            && self.controllers.iter().all(Option::is_none)
    }
}

/// The diagnosis supervisor. Owns the stuck-reading history; everything
/// else is a pure function of the cycle's observation.
#[derive(Debug, Clone, Default)]
pub struct DiagnosisSupervisor {
    water_stuck: StuckCounter,
    steam_stuck: StuckCounter,
}

impl DiagnosisSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the stuck counters. Called once per cycle with the raw
    /// readings, in every mode that receives them.
    pub fn track(&mut self, water: f64, steam: f64) {
        self.water_stuck.observe(water);
        self.steam_stuck.observe(steam);
    }

    pub fn water_stuck_run(&self) -> u32 {
        self.water_stuck.run()
    }

    /// Forget the water history after a level-sensor repair.
    pub fn reset_water(&mut self) {
        self.water_stuck.reset();
    }

    /// Forget the steam history after a steam-sensor repair.
    pub fn reset_steam(&mut self) {
        self.steam_stuck.reset();
    }

    /// Classify and disambiguate one cycle. Units already inside a repair
    /// handshake produce no new candidates.
    pub fn diagnose(
        &self,
        cfg: &BoilerConfig,
        obs: &Observation<'_>,
        registry: &UnitRegistry,
    ) -> Attribution {
        let mut attr = Attribution::default();
        let pump_count = cfg.pump_count;

        let steam_candidate = if registry.steam.broken() {
            FailureType::NoFailure
        } else {
            self.steam_candidate(cfg, obs)
        };
        let water_candidate = if registry.water_broken() {
            FailureType::NoFailure
        } else {
            self.water_candidate(cfg, obs)
        };

        let mut pump_suspect = [false; MAX_PUMPS];
        let mut controller_suspect = [false; MAX_PUMPS];
        for i in 0..pump_count {
            pump_suspect[i] =
                !registry.pumps[i].broken() && obs.pump_state[i] != obs.commanded[i];
            controller_suspect[i] = !registry.controllers[i].broken()
                && obs.pump_control_state[i] != obs.commanded[i];
        }

        if steam_candidate != FailureType::NoFailure {
            attr.steam = Some(steam_candidate);
        }

        match water_candidate {
            // A reading outside [0, C] or frozen in place cannot be
            // explained by any pump: the sensor itself is at fault. Pump
            // and controller discrepancies are attributed independently.
            FailureType::OutOfBounds | FailureType::Stuck => {
                attr.water = Some(water_candidate);
                for i in 0..pump_count {
                    attribute_without_water_evidence(
                        &mut attr,
                        i,
                        pump_suspect[i],
                        controller_suspect[i],
                    );
                }
            }

            // The level left the predicted band: either the sensor lies,
            // or a pump is secretly running (level above) or secretly
            // stopped (level below).
            FailureType::BelowPredicted | FailureType::AbovePredicted => {
                let above = water_candidate == FailureType::AbovePredicted;
                let mut explained = false;
                for i in 0..pump_count {
                    let commanded_on = obs.commanded[i];
                    match (pump_suspect[i], controller_suspect[i]) {
                        // A pump whose reported or controller-reported
                        // state disagrees with its command, in the
                        // direction that explains the deviation, takes the
                        // blame; the water sensor is exonerated.
                        (true, _) | (false, true) if above != commanded_on => {
                            attr.pumps[i] = Some(FailureType::Stuck);
                            explained = true;
                        }
                        // Discrepancy in the non-explaining direction:
                        // attribute the unit on its own evidence.
                        (true, _) => attr.pumps[i] = Some(FailureType::Stuck),
                        (false, true) => {
                            attr.controllers[i] = Some(FailureType::Stuck)
                        }
                        (false, false) => {}
                    }
                }
                if !explained {
                    // Blame the water sensor only when nothing else is
                    // suspect; at most the steam sensor may already be
                    // down.
                    let others_broken = (0..pump_count).any(|i| {
                        registry.pumps[i].broken()
                            || registry.controllers[i].broken()
                            || attr.pumps[i].is_some()
                            || attr.controllers[i].is_some()
                    });
                    if !others_broken {
                        attr.water = Some(water_candidate);
                    }
                }
            }

            FailureType::NoFailure => {
                for i in 0..pump_count {
                    attribute_without_water_evidence(
                        &mut attr,
                        i,
                        pump_suspect[i],
                        controller_suspect[i],
                    );
                }
            }
        }

        log_attribution(&attr, pump_count);
        attr
    }

    fn steam_candidate(&self, cfg: &BoilerConfig, obs: &Observation<'_>) -> FailureType {
        let s = obs.steam;
        if s < 0.0 || s > cfg.maximal_steam_rate {
            return FailureType::OutOfBounds;
        }
        // A falling steam rate is treated as a sensor failure.
        if let Some(previous) = obs.previous_steam {
            if s < previous {
                return FailureType::OutOfBounds;
            }
        }
        if self.steam_stuck.run() >= STUCK_CYCLES && s != cfg.maximal_steam_rate {
            return FailureType::Stuck;
        }
        FailureType::NoFailure
    }

    fn water_candidate(&self, cfg: &BoilerConfig, obs: &Observation<'_>) -> FailureType {
        let w = obs.water;
        if w < 0.0 || w > cfg.capacity {
            return FailureType::OutOfBounds;
        }
        if self.water_stuck.run() >= STUCK_CYCLES {
            return FailureType::Stuck;
        }
        if let Some(band) = obs.predicted {
            if w < band.min - LEVEL_SLACK {
                return FailureType::BelowPredicted;
            }
            if w > band.max + LEVEL_SLACK {
                return FailureType::AbovePredicted;
            }
        }
        FailureType::NoFailure
    }
}

/// The table rows that need no water evidence: a pump discrepancy blames
/// the pump (with or without controller agreement); a controller-only
/// discrepancy blames the controller.
fn attribute_without_water_evidence(
    attr: &mut Attribution,
    i: usize,
    pump_suspect: bool,
    controller_suspect: bool,
) {
    match (pump_suspect, controller_suspect) {
        (true, _) => attr.pumps[i] = Some(FailureType::Stuck),
        (false, true) => attr.controllers[i] = Some(FailureType::Stuck),
        (false, false) => {}
    }
}

fn log_attribution(attr: &Attribution, pump_count: usize) {
    if let Some(f) = attr.water {
        error!("fault attributed to water sensor: {f:?}");
    }
    if let Some(f) = attr.steam {
        error!("fault attributed to steam sensor: {f:?}");
    }
    for i in 0..pump_count {
        if let Some(f) = attr.pumps[i] {
            error!("fault attributed to pump {i}: {f:?}");
        }
        if let Some(f) = attr.controllers[i] {
            error!("fault attributed to pump controller {i}: {f:?}");
        }
    }
}
