//! Constraint-based scheduling core.
//!
//! Turns a declarative template of steps -- durations, precedence relations,
//! resource requirements, timing policies, an optional wall-clock anchor --
//! into a concrete timed plan: start/end offsets per step, critical-path
//! designation, per-step slack, all subject to finite resource capacities.
//!
//! Two public operations form the boundary:
//! - [`solve`]: full pipeline (validation, CPM, resource resolution,
//!   anchoring) producing a [`models::SolvedSchedule`] or a [`SolveError`].
//! - [`validate`]: dry diagnostics pass returning structured errors and
//!   advisory warnings without resolving resources.
//!
//! The accompanying binary speaks a one-request JSON protocol on
//! stdin/stdout for hosts that embed the engine as a child process.

pub mod config;
pub mod logging;
pub mod models;
pub mod solver;
pub mod validate;

mod anchor;
mod cpm;
mod graph;
mod interner;

pub use config::EngineConfig;
pub use solver::{solve, SolveError};
pub use validate::{validate, ValidationOutcome};
