//! Tick-based authoritative world simulation for Emberfall.
//!
//! Drives an [`ef_core::World`] forward in fixed ticks. Each tick advances
//! the clock, fires due scheduled effects (walk steps, animation changes,
//! attack resolution), runs the registered systems in order, and applies
//! spawns and despawns queued along the way. Scheduled effects carry a
//! generation token and are dropped when the entity has moved on.

/// Action queues, dispatch table, and AI behaviours.
pub mod action_queue;
/// Simulation clock in milliseconds.
pub mod clock;
/// Monster combat and combat-related scheduled effects.
pub mod combat;
/// Deferred world mutations applied at the tick boundary.
pub mod command;
/// Configuration types for simulation runs.
pub mod config;
/// Mutable context passed to systems each tick.
pub mod context;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Step-by-step movement and broadcast deduplication.
pub mod movement;
/// Breadth-first path walks.
pub mod pathing;
/// Dirty-state saves and player repositories.
pub mod persistence;
/// Top-level simulation orchestrator.
pub mod simulation;
/// Component bundles for players, monsters, and NPCs.
pub mod spawn;
/// The trait that all simulation systems implement.
pub mod system;
/// Tracing subscriber setup.
pub mod telemetry;
/// Effects scheduled for a later tick.
pub mod timer;

/// Re-exports of the stock systems.
pub use action_queue::ActionQueueSystem;
pub use combat::CombatSystem;
pub use movement::MovementSystem;
pub use persistence::PersistenceSystem;

/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-export of [`context::SimContext`].
pub use context::SimContext;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-export of [`simulation::Simulation`].
pub use simulation::Simulation;
/// Re-export of [`system::System`].
pub use system::System;
/// Re-export of [`telemetry::init_tracing`].
pub use telemetry::init_tracing;
