//! Convenience module for exposing commonly used structs

pub use crate::accel::{run_accel_profile, AccelProfile, AccelProfileParams, LimitingReason};
pub use crate::efficiency::{efficiency_at_speeds, EfficiencyCause, EfficiencyMap};
pub use crate::error::SimError;
pub use crate::schedule::{Schedule, ScheduleResult};
pub use crate::simulation::{
    InitSimulation, LimitingCause, PowerBreakdown, SimParams, SimState, SimSetup, Simulation,
    Stepper, TickOutcome,
};
pub use crate::traits::SerdeAPI;
pub use crate::vehicle::Vehicle;
