//! Errors that callers may want to tell apart.  They travel inside
//! [`anyhow::Error`] and can be recovered with `downcast_ref::<SimError>()`.

use thiserror::Error;

use crate::simulation::LimitingCause;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid vehicle: {0}")]
    InvalidVehicle(String),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error(
        "vehicle failed to accelerate at {commanded:5.2} m/s^2 (only {achieved:5.2}) ({cause})"
    )]
    ScheduleNotMet {
        commanded: f64,
        achieved: f64,
        cause: LimitingCause,
    },
    #[error("vehicle can not maintain speed {speed:5.2} m/s: {cause}")]
    CannotHoldSpeed { speed: f64, cause: LimitingCause },
    #[error("efficiency is undefined at non-positive speed {0} m/s")]
    NonPositiveSpeed(f64),
    #[error("acceleration profile did not reach top speed and quarter mile within {ticks} ticks")]
    DidNotTerminate { ticks: u64 },
    #[error("requested acceleration must be finite, got {0}")]
    NonFiniteRequest(f64),
}
