//! Standing-start acceleration profile.
//!
//! Every tick requests an acceleration no vehicle can reach and lets the
//! stepper clamp it, so the run always proceeds at the enforced ceiling without
//! knowing the vehicle's capability curve in advance.  The clamp reason of
//! each tick is kept as a run-length encoded trace.

use crate::imports::*;
use crate::simulation::{InitSimulation, LimitingCause, Stepper};

/// Driver parameters for [`run_accel_profile`]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AccelProfileParams {
    /// Acceleration requested every tick, $m/s^2$
    pub accel_req_mps2: f64,
    /// Achieved acceleration below which top speed is considered reached, $m/s^2$
    pub top_speed_accel_mps2: f64,
    /// Interval between speed samples in [`AccelProfile::profile_mps`]
    #[serde(with = "utils::serde_secs")]
    pub sample_interval: Duration,
    /// Tick budget; runs that have not latched both top speed and quarter mile
    /// by then fail with [`SimError::DidNotTerminate`]
    pub max_ticks: u64,
    /// If set, limiting reasons lasting at most this many ticks are folded
    /// into their neighbors, see [`AccelProfile::coalesce_limits`]
    #[serde(default)]
    pub coalesce_ticks: Option<u32>,
}

impl Default for AccelProfileParams {
    fn default() -> Self {
        Self {
            accel_req_mps2: params::ACCEL_REQ_MAX_MPS2,
            top_speed_accel_mps2: params::TOP_SPEED_ACCEL_MPS2,
            sample_interval: Duration::from_millis(params::PROFILE_SAMPLE_INTERVAL_MS),
            max_ticks: params::ACCEL_PROFILE_MAX_TICKS,
            coalesce_ticks: None,
        }
    }
}

impl SerdeAPI for AccelProfileParams {
    fn init(&mut self) -> anyhow::Result<()> {
        ensure!(
            self.accel_req_mps2.is_finite() && self.accel_req_mps2 > 0.0,
            format_dbg!(self.accel_req_mps2)
        );
        ensure!(
            !self.sample_interval.is_zero(),
            format_dbg!(self.sample_interval.is_zero())
        );
        ensure!(self.max_ticks > 0, format_dbg!(self.max_ticks > 0));
        Ok(())
    }
}

/// Constraint that continuously capped acceleration for `duration`
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct LimitingReason {
    pub cause: LimitingCause,
    #[serde(with = "utils::serde_secs")]
    pub duration: Duration,
}

/// Outcome of a standing-start run
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AccelProfile {
    /// Speed when acceleration first fell below the top speed threshold, $m/s$
    pub top_speed_mps: f64,
    /// Time to exceed 100 km/h, $s$.  NaN if top speed is below 100 km/h.
    #[serde(with = "utils::serde_nan")]
    pub accel_100_s: f64,
    /// Time to reach top speed, $s$
    pub accel_top_s: f64,
    /// Time to exceed a quarter mile, $s$
    pub quarter_mile_s: f64,
    /// Largest achieved acceleration, $m/s^2$
    pub peak_accel_mps2: f64,
    /// Run-length encoded trace of what limited acceleration
    pub limits: Vec<LimitingReason>,
    /// Speed samples at [`AccelProfileParams::sample_interval`], $m/s$
    pub profile_mps: Vec<f64>,
    /// Simulated duration of the run
    #[serde(with = "utils::serde_secs")]
    pub elapsed: Duration,
}

impl SerdeAPI for AccelProfile {}

impl AccelProfile {
    /// Sum of all limiting reason durations
    pub fn limits_duration(&self) -> Duration {
        self.limits.iter().map(|r| r.duration).sum()
    }

    /// Folds limiting reasons lasting at most `min_duration` into the next
    /// longer reason, or into the previous one when the next longer reason has
    /// the same cause.  Total duration is preserved; trailing short reasons go
    /// to the last kept reason.  Does nothing if no reason is longer than
    /// `min_duration`.
    pub fn coalesce_limits(&mut self, min_duration: Duration) {
        if !self.limits.iter().any(|r| r.duration > min_duration) {
            return;
        }
        let mut merged: Vec<LimitingReason> = Vec::with_capacity(self.limits.len());
        let mut extra = Duration::ZERO;
        for reason in self.limits.drain(..) {
            if reason.duration <= min_duration {
                extra += reason.duration;
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.cause == reason.cause => {
                    last.duration += reason.duration + extra;
                }
                _ => merged.push(LimitingReason {
                    cause: reason.cause,
                    duration: reason.duration + extra,
                }),
            }
            extra = Duration::ZERO;
        }
        if let Some(last) = merged.last_mut() {
            last.duration += extra;
        }
        self.limits = merged;
    }
}

/// Runs a fresh simulation of `veh` from rest at maximum acceleration until
/// both top speed and the quarter mile are reached.
///
/// # Errors
/// Fails with [`SimError::DidNotTerminate`] if that takes more than
/// [`AccelProfileParams::max_ticks`] ticks, e.g. for a vehicle that cannot
/// move.
pub fn run_accel_profile<V: InitSimulation + ?Sized>(
    veh: &V,
    params: &AccelProfileParams,
) -> anyhow::Result<AccelProfile> {
    let mut sim = veh.init_simulation().with_context(|| format_dbg!())?;
    let dt = sim.dt();

    let mut top_speed: Option<(f64, f64)> = None;
    let mut accel_100: Option<f64> = None;
    let mut quarter_mile: Option<f64> = None;
    let mut peak_accel = 0.0_f64;
    let mut limits: Vec<LimitingReason> = Vec::new();
    let mut profile = Vec::new();
    let mut since_sample = Duration::ZERO;
    let mut ticks: u64 = 0;

    while top_speed.is_none() || quarter_mile.is_none() {
        if ticks >= params.max_ticks {
            #[cfg(feature = "logging")]
            log::warn!(
                "{}",
                format_dbg!((ticks, sim.state().speed_mps, sim.state().dist_m))
            );
            bail!(SimError::DidNotTerminate { ticks });
        }
        let outcome = sim
            .tick(params.accel_req_mps2)
            .with_context(|| format!("{}\ntime step: {ticks}", format_dbg!()))?;
        ticks += 1;

        // an honored request is not expected; book it under the running cause
        let cause = outcome
            .limit
            .or_else(|| limits.last().map(|r| r.cause))
            .unwrap_or(LimitingCause::Power);
        match limits.last_mut() {
            Some(last) if last.cause == cause => last.duration += dt,
            _ => {
                #[cfg(feature = "logging")]
                log::debug!("{:?}: now limited by {cause}", sim.state().time);
                limits.push(LimitingReason {
                    cause,
                    duration: dt,
                });
            }
        }

        peak_accel = peak_accel.max(outcome.accel_mps2);

        let state = sim.state();
        let time_s = state.time.as_secs_f64();
        if state.speed_mps > params::KPH_100_MPS && accel_100.is_none() {
            accel_100 = Some(time_s);
        }
        if state.dist_m > params::QUARTER_MILE_M && quarter_mile.is_none() {
            quarter_mile = Some(time_s);
        }
        if outcome.accel_mps2 < params.top_speed_accel_mps2
            && top_speed.is_none()
            && state.speed_mps > 0.0
        {
            #[cfg(feature = "logging")]
            log::debug!("top speed {} m/s at {time_s} s", state.speed_mps);
            top_speed = Some((state.speed_mps, time_s));
            if state.speed_mps < params::KPH_100_MPS {
                accel_100 = Some(f64::NAN);
            }
        }

        since_sample += dt;
        if since_sample > params.sample_interval {
            profile.push(state.speed_mps);
            since_sample -= params.sample_interval;
        }
    }

    let (top_speed_mps, accel_top_s) = top_speed.with_context(|| format_dbg!())?;
    let mut accel_profile = AccelProfile {
        top_speed_mps,
        accel_100_s: accel_100.unwrap_or(f64::NAN),
        accel_top_s,
        quarter_mile_s: quarter_mile.with_context(|| format_dbg!())?,
        peak_accel_mps2: peak_accel,
        limits,
        profile_mps: profile,
        elapsed: sim.state().time,
    };
    if let Some(n) = params.coalesce_ticks {
        accel_profile.coalesce_limits(dt * n);
    }
    Ok(accel_profile)
}
