//! Module containing physical constants and default run parameters.

/// Unit conversions that should NEVER change
pub const KPH_PER_MPS: f64 = 3.6;
pub const M_PER_MI: f64 = 1609.344;

/// 100 km/h, reference speed for the standing-start benchmark, $m/s$
pub const KPH_100_MPS: f64 = 100.0 / KPH_PER_MPS;
/// Quarter mile, $m$
pub const QUARTER_MILE_M: f64 = M_PER_MI / 4.0;

/// Standard gravitational acceleration, $m/s^2$
pub const A_GRAV_MPS2: f64 = 9.81;
/// Sea level air density at approximately 20C, $kg/m^3$
pub const AIR_DENSITY_KG_PER_M3: f64 = 1.2;

// Driver defaults that should be changed only by advanced users

/// Acceleration requested during a standing-start run, far beyond what any
/// vehicle can achieve so that every tick runs at the enforced limit, $m/s^2$
pub const ACCEL_REQ_MAX_MPS2: f64 = 1_000.0;
/// Achieved acceleration below which the vehicle is considered to be at top speed, $m/s^2$
pub const TOP_SPEED_ACCEL_MPS2: f64 = 0.05;
/// Largest acceleration magnitude tolerated while holding a cruise speed, $m/s^2$
pub const HOLD_SPEED_ACCEL_TOL_MPS2: f64 = 0.01;
/// Speed sampling interval of an acceleration profile, $ms$
pub const PROFILE_SAMPLE_INTERVAL_MS: u64 = 10;
/// Tick budget of an acceleration profile
pub const ACCEL_PROFILE_MAX_TICKS: u64 = 1_000_000;
/// Default simulation tick, $\mu s$
pub const SIM_DT_US: u64 = 1_000;
