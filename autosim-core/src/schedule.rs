//! Replays a prescribed speed schedule tick by tick.

use crate::imports::*;
use crate::simulation::{InitSimulation, Stepper};

/// Piecewise-linear speed target.  `speeds_mps[i]` is the target speed at
/// `i * interval`; between consecutive checkpoints the commanded acceleration
/// is constant.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Schedule {
    /// Time between checkpoints
    #[serde(with = "utils::serde_secs")]
    pub interval: Duration,
    /// Target speed at each checkpoint, $m/s$
    pub speeds_mps: Vec<f64>,
}

impl SerdeAPI for Schedule {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()
    }
}

/// Totals of a [`Schedule`] run
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ScheduleResult {
    /// Energy drawn from the powertrain, $J$
    pub energy_j: f64,
    /// Distance traveled, $m$
    pub dist_m: f64,
}

impl SerdeAPI for ScheduleResult {}

impl Schedule {
    pub fn new(interval: Duration, speeds_mps: Vec<f64>) -> Self {
        Self {
            interval,
            speeds_mps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.speeds_mps.is_empty()
    }

    /// Checks that checkpoints are spaced in time and that every target is a
    /// speed the vehicle could be driven at
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        ensure!(
            !self.interval.is_zero(),
            SimError::InvalidSchedule(format_dbg!(self.interval.is_zero()))
        );
        if let Some((i, speed)) = self
            .speeds_mps
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && **s >= 0.0))
        {
            bail!(SimError::InvalidSchedule(format!(
                "target speed {speed} m/s at checkpoint {i} is not a finite, non-negative speed"
            )));
        }
        Ok(())
    }

    /// Drives a fresh simulation of `veh` through the schedule.
    ///
    /// Each segment commands `(target - speed) / interval`, where `speed` is the
    /// simulated speed when the previous segment ended, so any tracking drift
    /// carries into the next segment.  Energy is integrated over the
    /// simulation's own tick, which need not match `interval`.
    ///
    /// # Errors
    /// - [`SimError::InvalidSchedule`] if [`validate`](Schedule::validate) fails
    /// - [`SimError::ScheduleNotMet`] as soon as a tick cannot achieve the
    ///   commanded acceleration
    pub fn run<V: InitSimulation + ?Sized>(&self, veh: &V) -> anyhow::Result<ScheduleResult> {
        self.validate()?;
        let mut sim = veh.init_simulation().with_context(|| format_dbg!())?;
        let mut result = ScheduleResult::default();
        if self.is_empty() {
            return Ok(result);
        }

        let interval_s = self.interval.as_secs_f64();
        let dt_s = sim.dt().as_secs_f64();
        for (i, &speed_target) in self.speeds_mps.iter().enumerate() {
            let accel = (speed_target - sim.state().speed_mps) / interval_s;
            let time_target = self.interval * u32::try_from(i).with_context(|| format_dbg!(i))?;
            #[cfg(feature = "logging")]
            log::debug!(
                "checkpoint {i}: {} m/s by {:?}, commanding {accel} m/s^2",
                speed_target,
                time_target
            );
            while sim.state().time < time_target {
                let outcome = sim
                    .tick(accel)
                    .with_context(|| format!("{}\ncheckpoint: {i}", format_dbg!()))?;
                if let Some(cause) = outcome.limit {
                    bail!(SimError::ScheduleNotMet {
                        commanded: accel,
                        achieved: outcome.accel_mps2,
                        cause,
                    });
                }
                result.energy_j += sim.power().total() * dt_s;
            }
        }
        result.dist_m = sim.state().dist_m;
        Ok(result)
    }
}
