//! Table-driven mode machine.
//!
//! Classic embedded FSM pattern: one descriptor per mode holding plain
//! `fn` pointers — no closures, no dynamic dispatch, no heap.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  ModeTable                                                    │
//! │  ┌────────────────┬───────────┬──────────────────────────┐    │
//! │  │ ModeId          │ on_enter  │ on_update                │    │
//! │  ├────────────────┼───────────┼──────────────────────────┤    │
//! │  │ Waiting         │ —         │ fn(ctx)->Option<ModeId>  │    │
//! │  │ Initialisation  │ fn(ctx)   │ fn(ctx)->Option<ModeId>  │    │
//! │  │ Normal          │ fn(ctx)   │ fn(ctx)->Option<ModeId>  │    │
//! │  │ Degraded        │ fn(ctx)   │ fn(ctx)->Option<ModeId>  │    │
//! │  │ Rescue          │ fn(ctx)   │ fn(ctx)->Option<ModeId>  │    │
//! │  │ EmergencyStop   │ fn(ctx)   │ fn(ctx)->Option<ModeId>  │    │
//! │  └────────────────┴───────────┴──────────────────────────┘    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each cycle the engine calls `on_update` for the current mode; a
//! returned `Some(next)` triggers the transition. The controller can also
//! force a transition between update calls (diagnosis outcomes, plant
//! handshakes). Emergency stop is terminal: the engine refuses to leave it.

pub mod context;
pub mod states;

use context::CycleContext;
use log::{info, warn};

use crate::messages::Mode;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Every mode the controller can operate in.
/// Must stay in sync with the table built in [`states::build_mode_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModeId {
    Waiting = 0,
    Initialisation = 1,
    Normal = 2,
    Degraded = 3,
    Rescue = 4,
    EmergencyStop = 5,
}

impl ModeId {
    /// Total number of modes — sizes the table array.
    pub const COUNT: usize = 6;

    /// Convert a table index back to a `ModeId`. Out-of-range indices
    /// collapse to `EmergencyStop`, the safe terminal.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Waiting,
            1 => Self::Initialisation,
            2 => Self::Normal,
            3 => Self::Degraded,
            4 => Self::Rescue,
            5 => Self::EmergencyStop,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::EmergencyStop
            }
        }
    }

    /// The mode announced to the plant. Waiting has no wire form of its
    /// own; the plant sees `INITIALISATION` for both pre-run modes.
    pub fn announced(self) -> Mode {
        match self {
            Self::Waiting | Self::Initialisation => Mode::Initialisation,
            Self::Normal => Mode::Normal,
            Self::Degraded => Mode::Degraded,
            Self::Rescue => Mode::Rescue,
            Self::EmergencyStop => Mode::EmergencyStop,
        }
    }

    /// Whether diagnosis runs in this mode.
    pub fn operating(self) -> bool {
        matches!(self, Self::Normal | Self::Degraded | Self::Rescue)
    }
}

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Signature for the `on_enter` action, run once per transition.
pub type ModeActionFn = fn(&mut CycleContext);

/// Signature for the per-cycle update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type ModeUpdateFn = fn(&mut CycleContext) -> Option<ModeId>;

/// Static descriptor for a single mode.
#[derive(Clone, Copy)]
pub struct ModeDescriptor {
    pub id: ModeId,
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_update: ModeUpdateFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The mode machine engine. Owns the descriptor table and the index of the
/// current mode; all working state lives in the [`CycleContext`] threaded
/// through every handler call.
#[derive(Clone)]
pub struct ModeMachine {
    table: [ModeDescriptor; ModeId::COUNT],
    current: usize,
}

impl ModeMachine {
    pub fn new(table: [ModeDescriptor; ModeId::COUNT], initial: ModeId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the current mode's update handler and apply any transition it
    /// requests.
    pub fn tick(&mut self, ctx: &mut CycleContext) {
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (diagnosis outcomes, plant
    /// handshakes). A no-op when already in the target mode.
    pub fn force_transition(&mut self, next: ModeId, ctx: &mut CycleContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_mode(&self) -> ModeId {
        ModeId::from_index(self.current)
    }

    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: ModeId, ctx: &mut CycleContext) {
        if self.current_mode() == ModeId::EmergencyStop {
            // Terminal. Nothing leaves emergency stop.
            warn!("transition out of emergency stop refused");
            return;
        }
        let next_idx = next_id as usize;
        info!(
            "mode transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
