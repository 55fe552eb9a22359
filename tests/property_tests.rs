//! Property tests for the controller invariants: emergency stop is
//! absorbing, broken pumps stay closed, handshakes never skip states,
//! pump selection is optimal, and cycles are deterministic.

use boiler_controller::config::BoilerConfig;
use boiler_controller::controller::BoilerController;
use boiler_controller::fsm::ModeId;
use boiler_controller::mailbox::Inbox;
use boiler_controller::messages::{Message, Mode};
use boiler_controller::prediction::PredictionEngine;
use boiler_controller::repair::{RepairState, UnitId};
use proptest::prelude::*;

// ── Harness ───────────────────────────────────────────────────

fn run(c: &mut BoilerController, messages: &[Message]) -> Vec<Message> {
    let mut out = Vec::new();
    c.clock(&Inbox::new(messages), &mut out);
    out
}

fn commanded(c: &BoilerController) -> [bool; 4] {
    [0, 1, 2, 3].map(|i| c.pump_commanded(i))
}

fn batch(water: f64, steam: f64, reported: [bool; 4]) -> Vec<Message> {
    let mut messages = vec![Message::Level(water), Message::Steam(steam)];
    for (i, on) in reported.iter().enumerate() {
        messages.push(Message::PumpState { index: i, on: *on });
        messages.push(Message::PumpControlState { index: i, on: *on });
    }
    messages
}

/// A controller already running in Normal mode.
fn controller_in_normal() -> BoilerController {
    let mut c = BoilerController::new(BoilerConfig::default()).unwrap();
    let mut first = batch(450.0, 0.0, [false; 4]);
    first.push(Message::SteamBoilerWaiting);
    run(&mut c, &first);
    let mut second = batch(450.5, 0.0, [false; 4]);
    second.push(Message::PhysicalUnitsReady);
    run(&mut c, &second);
    assert_eq!(c.mode(), ModeId::Normal);
    c
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (-100.0f64..1200.0).prop_map(Message::Level),
        (-5.0f64..15.0).prop_map(Message::Steam),
        (0usize..4, any::<bool>())
            .prop_map(|(index, on)| Message::PumpState { index, on }),
        (0usize..4, any::<bool>())
            .prop_map(|(index, on)| Message::PumpControlState { index, on }),
        Just(Message::SteamBoilerWaiting),
        Just(Message::PhysicalUnitsReady),
        Just(Message::LevelFailureAcknowledgement),
        Just(Message::LevelRepaired),
        (0usize..4).prop_map(Message::PumpFailureAcknowledgement),
        (0usize..4).prop_map(Message::PumpRepaired),
    ]
}

/// A structurally well-formed cycle input with arbitrary values.
fn arb_cycle() -> impl Strategy<Value = (f64, f64, [bool; 4])> {
    (
        -50.0f64..1100.0,
        -2.0f64..12.0,
        proptest::array::uniform4(any::<bool>()),
    )
}

// ── Emergency stop is absorbing ───────────────────────────────

proptest! {
    /// Once stopped, every cycle emits exactly one EMERGENCY_STOP
    /// announcement and nothing else, whatever arrives.
    #[test]
    fn emergency_stop_absorbs_all_input(
        batches in proptest::collection::vec(
            proptest::collection::vec(arb_message(), 0..12), 1..8),
    ) {
        let mut c = BoilerController::new(BoilerConfig::default()).unwrap();
        // An empty batch is a transmission failure: immediate stop.
        run(&mut c, &[]);
        prop_assert_eq!(c.mode(), ModeId::EmergencyStop);

        for messages in &batches {
            let out = run(&mut c, messages);
            prop_assert_eq!(
                out,
                vec![Message::ModeAnnouncement(Mode::EmergencyStop)]
            );
        }
    }
}

// ── A broken pump is never commanded on ───────────────────────

proptest! {
    /// Whatever the plant reports, a pump inside a repair handshake is
    /// commanded closed on every non-terminal cycle.
    #[test]
    fn broken_pumps_stay_closed(
        cycles in proptest::collection::vec(arb_cycle(), 1..25),
    ) {
        let mut c = controller_in_normal();
        for (water, steam, reported) in cycles {
            run(&mut c, &batch(water, steam, reported));
            if c.mode() == ModeId::EmergencyStop {
                break;
            }
            for i in 0..4 {
                if c.unit_state(UnitId::Pump(i)) != RepairState::NoFail {
                    prop_assert!(
                        !c.pump_commanded(i),
                        "pump {} commanded on while broken", i
                    );
                }
            }
        }
    }
}

// ── Handshakes never skip a state ─────────────────────────────

proptest! {
    /// Under arbitrary interleavings of failures, acknowledgements, and
    /// repair notices, a pump's repair state only ever moves along the
    /// legal edges of the handshake.
    #[test]
    fn handshake_states_move_along_legal_edges(
        steps in proptest::collection::vec(
            (any::<bool>(), any::<bool>(), any::<bool>()), 1..30),
    ) {
        let mut c = controller_in_normal();
        let mut previous = c.unit_state(UnitId::Pump(0));

        for (lie, ack, repaired) in steps {
            let mut reported = commanded(&c);
            if lie {
                reported[0] = !reported[0];
            }
            // Keep the rest of the plant quiet so only pump 0 moves.
            let mut messages = vec![Message::Level(500.0), Message::Steam(10.0)];
            for (i, on) in reported.iter().enumerate() {
                messages.push(Message::PumpState { index: i, on: *on });
            }
            for (i, on) in commanded(&c).iter().enumerate() {
                messages.push(Message::PumpControlState { index: i, on: *on });
            }
            if ack {
                messages.push(Message::PumpFailureAcknowledgement(0));
            }
            if repaired {
                messages.push(Message::PumpRepaired(0));
            }
            run(&mut c, &messages);
            if c.mode() == ModeId::EmergencyStop {
                break;
            }

            let current = c.unit_state(UnitId::Pump(0));
            let legal = matches!(
                (previous, current),
                (RepairState::NoFail, RepairState::NoFail)
                    | (RepairState::NoFail, RepairState::WaitingFailAck)
                    | (RepairState::WaitingFailAck, RepairState::WaitingFailAck)
                    | (RepairState::WaitingFailAck, RepairState::WaitingRepair)
                    | (RepairState::WaitingRepair, RepairState::WaitingRepair)
                    | (RepairState::WaitingRepair, RepairState::NoFail)
            );
            prop_assert!(legal, "illegal edge {previous:?} -> {current:?}");
            previous = current;
        }
    }
}

// ── The chosen pump count is optimal ──────────────────────────

proptest! {
    /// For any observed level and steam rate, no other pump count lands
    /// its midpoint closer to the target than the chosen one.
    #[test]
    fn chosen_pump_count_minimises_midpoint_distance(
        water in 0.0f64..1000.0,
        steam in 0.0f64..10.0,
    ) {
        let cfg = BoilerConfig::default();
        let mut engine = PredictionEngine::new();
        let choice = engine.choose(&cfg, water, steam);
        let target = cfg.normal_band_midpoint();
        let chosen = (choice.band.midpoint() - target).abs();

        let bands: Vec<_> = engine.bands(&cfg, water, steam).to_vec();
        for (k, band) in bands.iter().enumerate() {
            prop_assert!(
                chosen <= (band.midpoint() - target).abs() + 1e-9,
                "count {} beats the chosen {}", k, choice.pump_count
            );
        }
    }
}

// ── Cycles are deterministic ──────────────────────────────────

proptest! {
    /// Two controllers in identical states produce identical outbound
    /// batches from the same inbound batch.
    #[test]
    fn identical_state_and_input_give_identical_output(
        warmup in proptest::collection::vec(arb_cycle(), 0..6),
        probe in proptest::collection::vec(arb_message(), 0..12),
    ) {
        let mut c = controller_in_normal();
        for (water, steam, reported) in warmup {
            run(&mut c, &batch(water, steam, reported));
        }

        let mut twin = c.clone();
        let out_a = run(&mut c, &probe);
        let out_b = run(&mut twin, &probe);
        prop_assert_eq!(out_a, out_b);
        prop_assert_eq!(c.mode(), twin.mode());
    }
}

// ── A healthy plant is never condemned ────────────────────────

proptest! {
    /// Simulate a faithful plant: steam only rises (up to W), the level
    /// follows the commanded pumps exactly, every unit reports the truth.
    /// The controller must stay in Normal and raise no detections; in
    /// particular the observed level always lands inside the band
    /// predicted the cycle before.
    #[test]
    fn faithful_plant_stays_in_normal(
        increments in proptest::collection::vec(0.05f64..0.3, 5..40),
    ) {
        let cfg = BoilerConfig::default();
        let mut c = controller_in_normal();

        let mut water = 450.5;
        let mut steam = 0.0f64;
        for delta in increments {
            // Plant physics over one 5 s tick: inflow from the pumps as
            // commanded, outflow at the (risen) steam rate.
            let pumps_on = commanded(&c).iter().filter(|on| **on).count() as f64;
            steam = (steam + delta).min(cfg.maximal_steam_rate);
            water += 5.0 * (cfg.pump_capacity(0) * pumps_on) - 5.0 * steam;

            let messages = batch(water, steam, commanded(&c));
            let out = run(&mut c, &messages);
            prop_assert_eq!(c.mode(), ModeId::Normal);
            prop_assert!(
                !out.iter().any(|m| matches!(
                    m,
                    Message::LevelFailureDetection
                        | Message::SteamFailureDetection
                        | Message::PumpFailureDetection(_)
                        | Message::PumpControlFailureDetection(_)
                )),
                "healthy plant was condemned"
            );
        }
    }
}
