//! The boiler controller — per-cycle orchestration.
//!
//! [`BoilerController`] owns the mode machine, the diagnosis supervisor,
//! the repair registry, and the shared context. One call to [`clock`]
//! covers one 5-second plant tick:
//!
//! ```text
//!  Inbox ──▶ extract ─▶ handshakes ─▶ diagnose ─▶ mode update ─▶ emit ──▶ MessageSink
//! ```
//!
//! Every step is deterministic and allocation-free; outbound messages
//! leave in a fixed order (failure and repair traffic, then pump
//! commands, then the mode announcement).
//!
//! [`clock`]: BoilerController::clock

use heapless::Vec;
use log::warn;

use crate::config::BoilerConfig;
use crate::diagnosis::{Attribution, DiagnosisSupervisor, Observation};
use crate::error::Result;
use crate::fsm::context::CycleContext;
use crate::fsm::states::build_mode_table;
use crate::fsm::{ModeId, ModeMachine};
use crate::mailbox::{Inbox, MessageSink};
use crate::messages::{Message, Mode};
use crate::repair::{UnitId, UnitRegistry};

/// Detection and acknowledgement messages queued within one cycle. Sized
/// for every unit failing and recovering at once.
const QUEUE_CAPACITY: usize = 32;

/// The steam-boiler controller. All run state lives here; the inbound and
/// outbound mailboxes are borrowed per cycle.
#[derive(Clone)]
pub struct BoilerController {
    fsm: ModeMachine,
    ctx: CycleContext,
    registry: UnitRegistry,
    supervisor: DiagnosisSupervisor,
    queued: Vec<Message, QUEUE_CAPACITY>,
}

impl BoilerController {
    /// Build a controller in Waiting mode for the given plant.
    pub fn new(config: BoilerConfig) -> Result<Self> {
        config.validate()?;
        let registry = UnitRegistry::new(config.pump_count);
        Ok(Self {
            fsm: ModeMachine::new(build_mode_table(), ModeId::Waiting),
            ctx: CycleContext::new(config),
            registry,
            supervisor: DiagnosisSupervisor::new(),
            queued: Vec::new(),
        })
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current mode, for display only.
    pub fn status(&self) -> &'static str {
        self.fsm.current_name()
    }

    /// Current mode identity.
    pub fn mode(&self) -> ModeId {
        self.fsm.current_mode()
    }

    /// Commanded state of pump `i`, as last sent to the plant.
    pub fn pump_commanded(&self, i: usize) -> bool {
        self.ctx.commanded[i]
    }

    /// Valve position as commanded.
    pub fn valve_open(&self) -> bool {
        self.ctx.valve_open
    }

    /// Where `unit` sits in its repair handshake.
    pub fn unit_state(&self, unit: UnitId) -> crate::repair::RepairState {
        self.registry.unit(unit).state
    }

    /// Active failures excluding the water sensor.
    pub fn active_failures(&self) -> usize {
        self.registry.active_non_water_failures()
    }

    /// Process one clock signal: read the batch, run the cycle, write the
    /// outbound messages.
    pub fn clock(&mut self, inbox: &Inbox<'_>, sink: &mut impl MessageSink) {
        self.queued.clear();

        // Emergency stop is terminal: announce it and nothing else.
        if self.fsm.current_mode() == ModeId::EmergencyStop {
            sink.send(Message::ModeAnnouncement(Mode::EmergencyStop));
            return;
        }

        // 1. Extract the expected readings. A malformed batch means the
        //    transport cannot be trusted: stop, announce, done.
        let readings = match inbox.extract_readings(self.ctx.config.pump_count) {
            Ok(readings) => readings,
            Err(e) => {
                warn!("transmission failure: {e}");
                self.fsm.force_transition(ModeId::EmergencyStop, &mut self.ctx);
                sink.send(Message::ModeAnnouncement(Mode::EmergencyStop));
                return;
            }
        };
        self.supervisor.track(readings.water, readings.steam);
        self.ctx
            .begin_cycle(readings, inbox.boiler_waiting(), inbox.physical_units_ready());

        // 2. Plant handshakes that change the mode.
        if self.ctx.units_ready {
            let target = self.post_initialisation_target();
            self.fsm.force_transition(target, &mut self.ctx);
        }
        if self.fsm.current_mode() == ModeId::Waiting && self.ctx.boiler_waiting {
            self.fsm.force_transition(ModeId::Initialisation, &mut self.ctx);
        }

        // 3. Diagnose this cycle's evidence.
        if self.fsm.current_mode().operating() {
            let observation = Observation {
                water: readings.water,
                steam: readings.steam,
                previous_steam: self.ctx.previous_steam,
                pump_state: &readings.pump_state,
                pump_control_state: &readings.pump_control_state,
                commanded: &self.ctx.commanded,
                predicted: self.ctx.predicted,
            };
            let attribution =
                self.supervisor
                    .diagnose(&self.ctx.config, &observation, &self.registry);
            self.open_handshakes(&attribution);
        }

        // 4. Repair traffic from the plant.
        self.process_acknowledgements(inbox);
        self.process_repairs(inbox);

        // 5. Re-derive the mode from the fault picture and run it.
        self.refresh_fault_summary();
        self.adjust_mode();
        self.fsm.tick(&mut self.ctx);

        // 6. Emit, in fixed order. An emergency reached during the cycle
        //    announces itself and suppresses everything else.
        if self.fsm.current_mode() == ModeId::EmergencyStop {
            sink.send(Message::ModeAnnouncement(Mode::EmergencyStop));
        } else {
            for message in &self.queued {
                sink.send(*message);
            }
            for i in 0..self.ctx.config.pump_count {
                if self.ctx.desired[i] != self.ctx.commanded[i] {
                    sink.send(if self.ctx.desired[i] {
                        Message::OpenPump(i)
                    } else {
                        Message::ClosePump(i)
                    });
                    self.ctx.commanded[i] = self.ctx.desired[i];
                }
            }
            if self.ctx.valve_toggle {
                sink.send(Message::Valve);
            }
            if self.ctx.program_ready {
                sink.send(Message::ProgramReady);
            }
            sink.send(Message::ModeAnnouncement(self.fsm.current_mode().announced()));
        }

        // 7. This cycle's readings become next cycle's history.
        self.ctx.previous_water = Some(readings.water);
        self.ctx.previous_steam = Some(readings.steam);
    }

    // ── Handshake plumbing ────────────────────────────────────

    /// Open a repair handshake and queue the detection message for every
    /// unit the diagnosis attributed this cycle.
    fn open_handshakes(&mut self, attribution: &Attribution) {
        if let Some(failure) = attribution.water {
            if self.registry.detect(UnitId::Water, failure) {
                self.queue(Message::LevelFailureDetection);
                self.registry.water.detection_sent();
            }
        }
        if let Some(failure) = attribution.steam {
            if self.registry.detect(UnitId::Steam, failure) {
                self.queue(Message::SteamFailureDetection);
                self.registry.steam.detection_sent();
            }
        }
        for i in 0..self.ctx.config.pump_count {
            if let Some(failure) = attribution.pumps[i] {
                if self.registry.detect(UnitId::Pump(i), failure) {
                    self.queue(Message::PumpFailureDetection(i));
                    self.registry.pumps[i].detection_sent();
                }
            }
            if let Some(failure) = attribution.controllers[i] {
                if self.registry.detect(UnitId::Controller(i), failure) {
                    self.queue(Message::PumpControlFailureDetection(i));
                    self.registry.controllers[i].detection_sent();
                }
            }
        }
    }

    fn process_acknowledgements(&mut self, inbox: &Inbox<'_>) {
        let pump_count = self.ctx.config.pump_count;
        for message in inbox.iter() {
            match *message {
                Message::LevelFailureAcknowledgement => {
                    self.registry.water.acknowledge();
                }
                Message::SteamFailureAcknowledgement => {
                    self.registry.steam.acknowledge();
                }
                Message::PumpFailureAcknowledgement(i) if i < pump_count => {
                    self.registry.pumps[i].acknowledge();
                }
                Message::PumpControlFailureAcknowledgement(i) if i < pump_count => {
                    self.registry.controllers[i].acknowledge();
                }
                _ => {}
            }
        }
    }

    fn process_repairs(&mut self, inbox: &Inbox<'_>) {
        let pump_count = self.ctx.config.pump_count;
        for message in inbox.iter() {
            match *message {
                Message::LevelRepaired => {
                    if self.registry.repair(UnitId::Water) {
                        self.supervisor.reset_water();
                        self.queue(Message::LevelRepairedAcknowledgement);
                    }
                }
                Message::SteamRepaired => {
                    if self.registry.repair(UnitId::Steam) {
                        self.supervisor.reset_steam();
                        self.queue(Message::SteamRepairedAcknowledgement);
                    }
                }
                Message::PumpRepaired(i) if i < pump_count => {
                    if self.registry.repair(UnitId::Pump(i)) {
                        self.queue(Message::PumpRepairedAcknowledgement(i));
                    }
                }
                Message::PumpControlRepaired(i) if i < pump_count => {
                    if self.registry.repair(UnitId::Controller(i)) {
                        self.queue(Message::PumpControlRepairedAcknowledgement(i));
                    }
                }
                _ => {}
            }
        }
    }

    // ── Mode plumbing ─────────────────────────────────────────

    /// Where the controller lands once the plant confirms its physical
    /// units: Normal, unless faults were already on the books.
    fn post_initialisation_target(&self) -> ModeId {
        if self.registry.water_broken() {
            ModeId::Rescue
        } else if self.registry.active_non_water_failures() > 0 {
            ModeId::Degraded
        } else {
            ModeId::Normal
        }
    }

    /// Copy the fault picture into the context for the mode handlers.
    fn refresh_fault_summary(&mut self) {
        self.ctx.water_broken = self.registry.water_broken();
        self.ctx.non_water_failures = self.registry.active_non_water_failures();
        for i in 0..self.ctx.config.pump_count {
            self.ctx.pump_available[i] = self.registry.pump_available(i);
        }
        self.ctx.water_stuck_run = self.supervisor.water_stuck_run();
    }

    /// Re-derive the operating mode from the fault picture. Losing both
    /// level and steam sensing leaves nothing to steer by.
    fn adjust_mode(&mut self) {
        if !self.fsm.current_mode().operating() {
            return;
        }
        if self.registry.water_broken() && self.registry.steam.broken() {
            warn!("water and steam sensing both lost");
            self.fsm.force_transition(ModeId::EmergencyStop, &mut self.ctx);
            return;
        }
        let target = if self.registry.water_broken() {
            ModeId::Rescue
        } else if self.registry.active_non_water_failures() > 0 {
            ModeId::Degraded
        } else {
            ModeId::Normal
        };
        self.fsm.force_transition(target, &mut self.ctx);
    }

    fn queue(&mut self, message: Message) {
        // Capacity covers every unit failing and recovering in the same
        // cycle; a push can only fail if that bound is wrong.
        if self.queued.push(message).is_err() {
            debug_assert!(false, "cycle message queue overflow");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_PUMPS;

    fn controller() -> BoilerController {
        BoilerController::new(BoilerConfig::default()).expect("default config is valid")
    }

    fn nominal_batch(water: f64, steam: f64, commanded: &[bool]) -> std::vec::Vec<Message> {
        let mut batch = vec![Message::Level(water), Message::Steam(steam)];
        for (i, on) in commanded.iter().enumerate() {
            batch.push(Message::PumpState { index: i, on: *on });
            batch.push(Message::PumpControlState { index: i, on: *on });
        }
        batch
    }

    fn run(
        controller: &mut BoilerController,
        batch: &[Message],
    ) -> std::vec::Vec<Message> {
        let mut out = std::vec::Vec::new();
        controller.clock(&Inbox::new(batch), &mut out);
        out
    }

    /// Drive a fresh controller through waiting and initialisation into
    /// Normal, with the level already in band.
    fn controller_in_normal() -> (BoilerController, [bool; MAX_PUMPS]) {
        let mut c = controller();
        let mut batch = nominal_batch(500.0, 0.0, &[false; 4]);
        batch.push(Message::SteamBoilerWaiting);
        run(&mut c, &batch);
        assert_eq!(c.mode(), ModeId::Initialisation);

        let mut batch = nominal_batch(500.5, 0.0, &[false; 4]);
        batch.push(Message::PhysicalUnitsReady);
        run(&mut c, &batch);
        assert_eq!(c.mode(), ModeId::Normal);
        let commanded = c.ctx.commanded;
        (c, commanded)
    }

    #[test]
    fn rejects_invalid_configuration() {
        let cfg = BoilerConfig {
            pump_count: 0,
            ..Default::default()
        };
        assert!(BoilerController::new(cfg).is_err());
    }

    #[test]
    fn starts_waiting_and_announces_initialisation() {
        let mut c = controller();
        let out = run(&mut c, &nominal_batch(300.0, 0.0, &[false; 4]));
        assert_eq!(c.mode(), ModeId::Waiting);
        assert_eq!(
            out,
            vec![Message::ModeAnnouncement(Mode::Initialisation)]
        );
    }

    #[test]
    fn status_tracks_the_mode() {
        let mut c = controller();
        assert_eq!(c.status(), "WAITING");
        let mut batch = nominal_batch(500.0, 0.0, &[false; 4]);
        batch.push(Message::SteamBoilerWaiting);
        run(&mut c, &batch);
        assert_eq!(c.status(), "INITIALISATION");
    }

    #[test]
    fn transmission_failure_stops_immediately() {
        let mut c = controller();
        let out = run(&mut c, &[Message::Steam(0.0)]);
        assert_eq!(c.mode(), ModeId::EmergencyStop);
        assert_eq!(out, vec![Message::ModeAnnouncement(Mode::EmergencyStop)]);
    }

    #[test]
    fn emergency_stop_emits_only_the_mode_forever() {
        let mut c = controller();
        run(&mut c, &[]);
        assert_eq!(c.mode(), ModeId::EmergencyStop);
        for _ in 0..3 {
            let out = run(&mut c, &nominal_batch(500.0, 5.0, &[false; 4]));
            assert_eq!(out, vec![Message::ModeAnnouncement(Mode::EmergencyStop)]);
        }
    }

    #[test]
    fn initialisation_fill_opens_every_pump() {
        let mut c = controller();
        let mut batch = nominal_batch(0.0, 0.0, &[false; 4]);
        batch.push(Message::SteamBoilerWaiting);
        let out = run(&mut c, &batch);
        for i in 0..4 {
            assert!(out.contains(&Message::OpenPump(i)), "pump {i} must open");
        }
        assert!(out.contains(&Message::ModeAnnouncement(Mode::Initialisation)));
        assert!(!out.contains(&Message::Valve));
    }

    #[test]
    fn ready_handshake_promotes_to_normal() {
        let (c, _) = controller_in_normal();
        assert_eq!(c.mode(), ModeId::Normal);
    }

    #[test]
    fn normal_cycle_commands_pumps_and_announces() {
        let (mut c, commanded) = controller_in_normal();
        let out = run(
            &mut c,
            &nominal_batch(500.0, 5.0, &commanded[..4]),
        );
        assert!(out.contains(&Message::ModeAnnouncement(Mode::Normal)));
        // k* = 2 at w=500, s=5: pump 0 is already running from the ready
        // cycle, so only pump 1 is newly opened.
        assert!(out.contains(&Message::OpenPump(1)));
        assert!(!out.contains(&Message::ClosePump(0)));
    }

    #[test]
    fn unchanged_pump_states_are_not_re_sent() {
        let (mut c, commanded) = controller_in_normal();
        run(&mut c, &nominal_batch(500.0, 5.0, &commanded[..4]));
        let commanded = c.ctx.commanded;
        // Same level and a slightly higher steam rate: the same two pumps
        // stay on and no pump message repeats.
        let out = run(&mut c, &nominal_batch(501.0, 6.0, &commanded[..4]));
        assert!(out
            .iter()
            .all(|m| !matches!(m, Message::OpenPump(_) | Message::ClosePump(_))));
    }
}
