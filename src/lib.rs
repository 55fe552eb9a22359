//! Steam-boiler controller library.
//!
//! A cyclic, externally driven controller for a steam boiler plant. Every
//! five simulated seconds the plant delivers a batch of messages (sensor
//! readings, per-pump states, repair notifications); the controller answers
//! with actuator commands, failure detections, and a mode announcement.
//!
//! ```text
//!  Inbox (borrowed batch) ──▶ ┌──────────────────────────────┐
//!                             │       BoilerController       │
//!                             │  Mode FSM · Diagnosis ·      │ ──▶ MessageSink
//!                             │  Prediction · Repair units   │
//!                             └──────────────────────────────┘
//! ```
//!
//! All controller state lives inside a single [`controller::BoilerController`]
//! instance; a cycle reads the inbound batch exactly once, runs to
//! completion, and allocates nothing.

#![deny(unused_must_use)]

pub mod config;
pub mod controller;
pub mod diagnosis;
pub mod error;
pub mod fsm;
pub mod mailbox;
pub mod messages;
pub mod prediction;
pub mod repair;
