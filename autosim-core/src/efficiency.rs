//! Breakdown of the power needed to hold steady cruise speeds.

use crate::imports::*;
use crate::simulation::{InitSimulation, Stepper};

/// Named buckets of an [`EfficiencyMap`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EfficiencyCause {
    Aerodynamics,
    RollingResistance,
    Accessory,
    /// Whatever the other causes do not account for, e.g. driveline losses
    Losses,
}

impl EfficiencyCause {
    pub const ALL: [Self; 4] = [
        Self::Aerodynamics,
        Self::RollingResistance,
        Self::Accessory,
        Self::Losses,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aerodynamics => "Aerodynamics",
            Self::RollingResistance => "Rolling Resistance",
            Self::Accessory => "Accessory",
            Self::Losses => "Losses",
        }
    }
}

impl fmt::Display for EfficiencyCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Specific power, i.e. power divided by speed, by cause at each requested
/// speed, $N$ or equivalently $J/m$.  All vectors share the order of
/// `speeds_mps`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EfficiencyMap {
    pub speeds_mps: Vec<f64>,
    pub aerodynamics: Vec<f64>,
    pub rolling_resistance: Vec<f64>,
    pub accessory: Vec<f64>,
    pub losses: Vec<f64>,
}

impl SerdeAPI for EfficiencyMap {}

impl EfficiencyMap {
    fn with_capacity(n: usize) -> Self {
        Self {
            speeds_mps: Vec::with_capacity(n),
            aerodynamics: Vec::with_capacity(n),
            rolling_resistance: Vec::with_capacity(n),
            accessory: Vec::with_capacity(n),
            losses: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.speeds_mps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speeds_mps.is_empty()
    }

    pub fn get(&self, cause: EfficiencyCause) -> &[f64] {
        match cause {
            EfficiencyCause::Aerodynamics => &self.aerodynamics,
            EfficiencyCause::RollingResistance => &self.rolling_resistance,
            EfficiencyCause::Accessory => &self.accessory,
            EfficiencyCause::Losses => &self.losses,
        }
    }

    /// Total specific power at each speed
    pub fn total(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                EfficiencyCause::ALL
                    .iter()
                    .map(|&cause| self.get(cause)[i])
                    .sum()
            })
            .collect()
    }

    /// Cause name to values, keyed by [`EfficiencyCause::name`]
    pub fn to_map(&self) -> BTreeMap<&'static str, Vec<f64>> {
        EfficiencyCause::ALL
            .iter()
            .map(|&cause| (cause.name(), self.get(cause).to_vec()))
            .collect()
    }
}

/// Holds a fresh simulation of `veh` at each of `speeds_mps` for one tick and
/// splits the power it draws into [`EfficiencyCause`]s.
///
/// # Errors
/// - [`SimError::NonPositiveSpeed`] for a speed that is zero, negative or not
///   finite, where specific power is undefined
/// - [`SimError::CannotHoldSpeed`] if the vehicle cannot sustain a speed
pub fn efficiency_at_speeds<V: InitSimulation + ?Sized>(
    veh: &V,
    speeds_mps: &[f64],
) -> anyhow::Result<EfficiencyMap> {
    let mut sim = veh.init_simulation().with_context(|| format_dbg!())?;
    let mut eff = EfficiencyMap::with_capacity(speeds_mps.len());

    for &speed in speeds_mps {
        ensure!(
            speed.is_finite() && speed > 0.0,
            SimError::NonPositiveSpeed(speed)
        );
        sim.set_speed(speed);
        let outcome = sim.tick(0.0).with_context(|| format_dbg!(speed))?;
        if outcome.accel_mps2.abs() > params::HOLD_SPEED_ACCEL_TOL_MPS2 {
            let cause = outcome.limit.with_context(|| {
                format!(
                    "{}\nspeed changed without a limiting cause",
                    format_dbg!((speed, outcome.accel_mps2))
                )
            })?;
            bail!(SimError::CannotHoldSpeed { speed, cause });
        }

        let total = sim.power().total() / speed;
        let aero = sim.aero_drag_force();
        let rolling = sim.rolling_drag_force();
        let accessory = sim.power().accessory_w / speed;
        eff.speeds_mps.push(speed);
        eff.aerodynamics.push(aero);
        eff.rolling_resistance.push(rolling);
        eff.accessory.push(accessory);
        eff.losses.push(total - (accessory + aero + rolling));
    }
    Ok(eff)
}
