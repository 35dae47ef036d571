#![allow(clippy::field_reassign_with_default)]

//! Crate containing drivers for tick-by-tick vehicle simulation runs:
//! - [`schedule`]: replay a prescribed speed schedule and total energy and distance
//! - [`accel`]: standing-start acceleration profile with a trace of what limited it
//! - [`efficiency`]: breakdown of cruising losses at steady speeds
//!
//! All drivers consume a [`simulation::Stepper`], created fresh per run through
//! [`simulation::InitSimulation`].  A reference road-load stepper built from a
//! [`vehicle::Vehicle`] is provided in [`simulation`].
//!
//! # Features:
//! - logging: emit `log` records from the drivers (default)
//! - validation: validate vehicle inputs with `validator` (default)
//! - bincode: enable bincode (de)serialization via [`traits::SerdeAPI`]

#[macro_use]
pub mod macros;

pub mod accel;
pub mod efficiency;
pub mod error;
pub mod imports;
pub mod params;
pub mod prelude;
pub mod schedule;
pub mod simulation;
pub mod traits;
pub mod utils;
pub mod vehicle;
