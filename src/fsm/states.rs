//! Concrete mode handlers and table builder.
//!
//! ```text
//!  WAITING ──[plant waiting]──▶ INITIALISATION ──[units ready]──▶ NORMAL
//!                                                                  │ ▲
//!                                      [non-water fault] ──────────┘ │
//!                                               ▼                    │
//!                                           DEGRADED ──[all repaired]┘
//!                                            │    ▲
//!                              [water fault] │    │ [water repaired,
//!                                            ▼    │  others pending]
//!                                            RESCUE
//!
//!  Any mode ──[hazard / transmission failure]──▶ EMERGENCY_STOP (terminal)
//! ```
//!
//! Transitions driven by plant handshakes and diagnosis are forced by the
//! controller between ticks; the handlers here implement each mode's own
//! per-cycle work and the hazards it can detect itself.

use log::{error, info, warn};

use super::context::CycleContext;
use super::{ModeDescriptor, ModeId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table. Called once at controller construction.
pub fn build_mode_table() -> [ModeDescriptor; ModeId::COUNT] {
    [
        // Index 0 — Waiting
        ModeDescriptor {
            id: ModeId::Waiting,
            name: "WAITING",
            on_enter: None,
            on_update: waiting_update,
        },
        // Index 1 — Initialisation
        ModeDescriptor {
            id: ModeId::Initialisation,
            name: "INITIALISATION",
            on_enter: Some(initialisation_enter),
            on_update: initialisation_update,
        },
        // Index 2 — Normal
        ModeDescriptor {
            id: ModeId::Normal,
            name: "NORMAL",
            on_enter: Some(normal_enter),
            on_update: normal_update,
        },
        // Index 3 — Degraded
        ModeDescriptor {
            id: ModeId::Degraded,
            name: "DEGRADED",
            on_enter: Some(degraded_enter),
            on_update: degraded_update,
        },
        // Index 4 — Rescue
        ModeDescriptor {
            id: ModeId::Rescue,
            name: "RESCUE",
            on_enter: Some(rescue_enter),
            on_update: rescue_update,
        },
        // Index 5 — EmergencyStop
        ModeDescriptor {
            id: ModeId::EmergencyStop,
            name: "EMERGENCY_STOP",
            on_enter: Some(emergency_enter),
            on_update: emergency_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING — plant not yet announced
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_update(_ctx: &mut CycleContext) -> Option<ModeId> {
    // The controller promotes Waiting to Initialisation as soon as the
    // plant announces itself, so the announcement is acted on within the
    // same cycle. Nothing to do here.
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  INITIALISATION — bring the level into the normal band
// ═══════════════════════════════════════════════════════════════════════════

fn initialisation_enter(ctx: &mut CycleContext) {
    info!(
        "initialisation: target band [{:.0}, {:.0}] L",
        ctx.config.minimal_normal_level, ctx.config.maximal_normal_level
    );
}

fn initialisation_update(ctx: &mut CycleContext) -> Option<ModeId> {
    let water = ctx.readings.water;

    // The boiler is cold: any steam reading at all means the steam sensor
    // is defective, and without it the run cannot be supervised.
    if ctx.readings.steam != 0.0 {
        warn!("steam reported {:.2} L/s before startup", ctx.readings.steam);
        return Some(ModeId::EmergencyStop);
    }
    if water < 0.0 || water > ctx.config.capacity {
        warn!("level reported {water:.1} L outside the tank");
        return Some(ModeId::EmergencyStop);
    }
    if !ctx.init_complete && ctx.water_reading_frozen() {
        warn!("level frozen at {water:.1} L while filling");
        return Some(ModeId::EmergencyStop);
    }

    if ctx.init_complete {
        // Holding pattern until the plant confirms its units.
        ctx.close_all_pumps();
        ctx.program_ready = true;
        return None;
    }

    if water >= ctx.config.maximal_normal_level {
        ctx.close_all_pumps();
        ctx.set_valve(true);
        if ctx.drain_stalled(water) {
            warn!("valve open but the level refuses to fall");
            return Some(ModeId::EmergencyStop);
        }
    } else if water <= ctx.config.minimal_normal_level {
        ctx.open_all_pumps();
        ctx.set_valve(false);
        ctx.reset_drain_watch();
    } else {
        ctx.close_all_pumps();
        ctx.set_valve(false);
        ctx.reset_drain_watch();
        ctx.init_complete = true;
        ctx.program_ready = true;
        ctx.last_healthy_water = water;
        info!("initialisation complete at {water:.1} L");
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL — steer by the observed level
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(_ctx: &mut CycleContext) {
    info!("normal operation");
}

fn normal_update(ctx: &mut CycleContext) -> Option<ModeId> {
    ctx.last_healthy_water = ctx.readings.water;
    ctx.select_pumps(ctx.readings.water)
}

// ═══════════════════════════════════════════════════════════════════════════
//  DEGRADED — a non-water unit is down; the level sensor is still trusted
// ═══════════════════════════════════════════════════════════════════════════

fn degraded_enter(ctx: &mut CycleContext) {
    warn!(
        "degraded operation, {} unit(s) awaiting repair",
        ctx.non_water_failures
    );
}

fn degraded_update(ctx: &mut CycleContext) -> Option<ModeId> {
    ctx.last_healthy_water = ctx.readings.water;
    ctx.select_pumps(ctx.readings.water)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESCUE — level sensor down; steer by the estimate
// ═══════════════════════════════════════════════════════════════════════════

fn rescue_enter(_ctx: &mut CycleContext) {
    warn!("rescue operation, steering by estimated level");
}

fn rescue_update(ctx: &mut CycleContext) -> Option<ModeId> {
    let estimate = ctx.rescue_estimate();
    ctx.select_pumps(estimate)
}

// ═══════════════════════════════════════════════════════════════════════════
//  EMERGENCY_STOP — terminal
// ═══════════════════════════════════════════════════════════════════════════

fn emergency_enter(ctx: &mut CycleContext) {
    ctx.close_all_pumps();
    error!("emergency stop");
}

fn emergency_update(ctx: &mut CycleContext) -> Option<ModeId> {
    ctx.close_all_pumps();
    None
}
