//! Module containing the vehicle road-load and powertrain parameters consumed by
//! the reference [`Simulation`](crate::simulation::Simulation).

use crate::imports::*;
#[cfg(feature = "validation")]
use validator::Validate;

fn default_air_density() -> f64 {
    params::AIR_DENSITY_KG_PER_M3
}

fn default_a_grav() -> f64 {
    params::A_GRAV_MPS2
}

#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "validation", derive(Validate))]
/// Struct containing vehicle attributes
pub struct Vehicle {
    /// Vehicle name
    #[serde(default)]
    pub name: String,
    /// Aerodynamic drag coefficient
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub drag_coef: f64,
    /// Frontal area, $m^2$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub frontal_area_m2: f64,
    /// Total vehicle mass including cargo and passengers, $kg$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub veh_kg: f64,
    /// Rolling resistance coefficient
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub wheel_rr_coef: f64,
    /// Wheel coefficient of friction
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub wheel_coef_of_fric: f64,
    /// Fraction of weight on the drive axle while stopped
    #[cfg_attr(feature = "validation", validate(range(min = 0.0, max = 1.0)))]
    pub drive_axle_weight_frac: f64,
    /// Vehicle center of mass height, $m$  
    /// **NOTE:** positive for FWD, negative for RWD, AWD, 4WD
    pub veh_cg_m: f64,
    /// Wheelbase, $m$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub wheel_base_m: f64,
    /// Mass moment of inertia of each wheel, $kg \cdot m^2$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub wheel_inertia_kg_m2: f64,
    /// Number of wheels
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub num_wheels: f64,
    /// Wheel radius, $m$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub wheel_radius_m: f64,
    /// Peak propulsion power at the powertrain output, $kW$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub pwr_max_kw: f64,
    /// Speeds at which [`pwr_max_frac`](Vehicle::pwr_max_frac) is defined, $m/s$.
    /// Leave empty for full power at every speed.
    #[serde(default)]
    pub pwr_max_frac_speed_mps: Vec<f64>,
    /// Fraction of [`pwr_max_kw`](Vehicle::pwr_max_kw) available at each speed
    #[serde(default)]
    pub pwr_max_frac: Vec<f64>,
    /// Powertrain output to wheel efficiency
    #[cfg_attr(feature = "validation", validate(range(min = 0.0, max = 1.0)))]
    pub drivetrain_eff: f64,
    /// Constant accessory load, $kW$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub aux_kw: f64,
    /// Maximum vehicle speed, e.g. from gearing or a governor, $m/s$
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub max_speed_mps: f64,
    /// Air density, $kg/m^3$
    #[serde(default = "default_air_density")]
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub air_density_kg_per_m3: f64,
    /// Gravitational acceleration, $m/s^2$
    #[serde(default = "default_a_grav")]
    #[cfg_attr(feature = "validation", validate(range(min = 0.0)))]
    pub a_grav_mps2: f64,

    // derived
    /// Mass including rotational inertia of the wheels, $kg$
    #[serde(skip)]
    pub mass_eff_kg: f64,
    /// Traction-limited acceleration, $m/s^2$
    #[serde(skip)]
    pub max_trac_mps2: f64,
    #[serde(skip)]
    pwr_max_frac_speed_arr: Array1<f64>,
    #[serde(skip)]
    pwr_max_frac_arr: Array1<f64>,
}

impl SerdeAPI for Vehicle {
    fn init(&mut self) -> anyhow::Result<()> {
        self.set_derived()
    }
}

impl Vehicle {
    /// Validates inputs and sets derived parameters:
    ///     - `mass_eff_kg`
    ///     - `max_trac_mps2`
    pub fn set_derived(&mut self) -> anyhow::Result<()> {
        #[cfg(feature = "validation")]
        self.validate()
            .map_err(|e| SimError::InvalidVehicle(e.to_string()))?;
        ensure!(
            self.veh_kg > 0.0,
            SimError::InvalidVehicle(format_dbg!(self.veh_kg > 0.0))
        );
        ensure!(
            self.wheel_base_m > 0.0,
            SimError::InvalidVehicle(format_dbg!(self.wheel_base_m > 0.0))
        );
        ensure!(
            self.wheel_radius_m > 0.0,
            SimError::InvalidVehicle(format_dbg!(self.wheel_radius_m > 0.0))
        );
        ensure!(
            self.drivetrain_eff > 0.0,
            SimError::InvalidVehicle(format_dbg!(self.drivetrain_eff > 0.0))
        );
        ensure!(
            self.pwr_max_frac_speed_mps.len() == self.pwr_max_frac.len(),
            SimError::InvalidVehicle(format!(
                "`pwr_max_frac_speed_mps` and `pwr_max_frac` lengths differ: {} != {}",
                self.pwr_max_frac_speed_mps.len(),
                self.pwr_max_frac.len()
            ))
        );
        ensure!(
            utils::is_sorted(&self.pwr_max_frac_speed_mps),
            SimError::InvalidVehicle("`pwr_max_frac_speed_mps` must be sorted".into())
        );
        ensure!(
            self.pwr_max_frac.iter().all(|f| (0.0..=1.0).contains(f)),
            SimError::InvalidVehicle("`pwr_max_frac` values must be in [0, 1]".into())
        );

        // weight transfer term of the traction limit
        ensure!(
            self.weight_transfer_factor() > 0.0,
            SimError::InvalidVehicle(format!(
                "`veh_cg_m` of {} m shifts all weight off the drive axle: {}",
                self.veh_cg_m,
                format_dbg!(self.weight_transfer_factor() > 0.0)
            ))
        );

        self.update_derived();
        Ok(())
    }

    fn weight_transfer_factor(&self) -> f64 {
        1.0 + self.veh_cg_m * self.wheel_coef_of_fric / self.wheel_base_m
    }

    /// Recomputes derived parameters from inputs already known to be valid
    fn update_derived(&mut self) {
        self.mass_eff_kg = self.veh_kg
            + self.num_wheels * self.wheel_inertia_kg_m2 / self.wheel_radius_m.powi(2);
        self.max_trac_mps2 = (self.wheel_coef_of_fric
            * self.drive_axle_weight_frac
            * self.veh_kg
            * self.a_grav_mps2
            / self.weight_transfer_factor())
            / (self.veh_kg * self.a_grav_mps2)
            * self.a_grav_mps2;
        self.pwr_max_frac_speed_arr = Array1::from_vec(self.pwr_max_frac_speed_mps.clone());
        self.pwr_max_frac_arr = Array1::from_vec(self.pwr_max_frac.clone());
    }

    /// Fraction of peak power available at `speed_mps`
    pub fn pwr_max_frac_at(&self, speed_mps: f64) -> f64 {
        if self.pwr_max_frac_arr.is_empty() {
            1.0
        } else {
            utils::interpolate(
                speed_mps,
                &self.pwr_max_frac_speed_arr,
                &self.pwr_max_frac_arr,
                false,
            )
        }
    }

    /// Maximum propulsion power delivered to the wheels at `speed_mps`, $W$
    pub fn pwr_max_wheel_w(&self, speed_mps: f64) -> f64 {
        self.pwr_max_kw * 1e3 * self.pwr_max_frac_at(speed_mps) * self.drivetrain_eff
    }

    /// Aerodynamic drag force at `speed_mps`, $N$
    pub fn aero_drag_force(&self, speed_mps: f64) -> f64 {
        0.5 * self.air_density_kg_per_m3
            * self.drag_coef
            * self.frontal_area_m2
            * speed_mps.powi(2)
    }

    /// Rolling resistance force at `speed_mps`, $N$.  Zero at standstill.
    pub fn rolling_drag_force(&self, speed_mps: f64) -> f64 {
        if speed_mps > 0.0 {
            self.veh_kg * self.a_grav_mps2 * self.wheel_rr_coef
        } else {
            0.0
        }
    }

    /// Sum of aerodynamic and rolling drag at `speed_mps`, $N$
    pub fn road_load_force(&self, speed_mps: f64) -> f64 {
        self.aero_drag_force(speed_mps) + self.rolling_drag_force(speed_mps)
    }

    /// Maximum braking deceleration magnitude, $m/s^2$
    pub fn max_brake_mps2(&self) -> f64 {
        self.wheel_coef_of_fric * self.a_grav_mps2
    }

    /// Compact sedan with roughly 80 kW, used for testing
    pub fn mock_vehicle() -> Self {
        let mut veh = Self {
            name: String::from("Mock Sedan 80kW FWD"),
            drag_coef: 0.3,
            frontal_area_m2: 2.2,
            veh_kg: 1_500.0,
            wheel_rr_coef: 0.01,
            wheel_coef_of_fric: 0.9,
            drive_axle_weight_frac: 0.6,
            veh_cg_m: 0.53,
            wheel_base_m: 2.7,
            wheel_inertia_kg_m2: 0.815,
            num_wheels: 4.0,
            wheel_radius_m: 0.326,
            pwr_max_kw: 80.0,
            pwr_max_frac_speed_mps: vec![],
            pwr_max_frac: vec![],
            drivetrain_eff: 0.9,
            aux_kw: 0.7,
            max_speed_mps: 70.0,
            air_density_kg_per_m3: params::AIR_DENSITY_KG_PER_M3,
            a_grav_mps2: params::A_GRAV_MPS2,
            ..Default::default()
        };
        veh.update_derived();
        veh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_derived_via_mock() {
        let veh = Vehicle::mock_vehicle();
        assert!(veh.mass_eff_kg > veh.veh_kg);
        // front wheel drive with weight transfer is less than mu * axle fraction * g
        assert!(veh.max_trac_mps2 > 0.0);
        assert!(veh.max_trac_mps2 < 0.9 * 0.6 * params::A_GRAV_MPS2);
    }

    #[test]
    fn test_drag_forces() {
        let veh = Vehicle::mock_vehicle();
        assert_eq!(veh.aero_drag_force(0.0), 0.0);
        assert_eq!(veh.rolling_drag_force(0.0), 0.0);
        assert!(almost_eq(
            veh.aero_drag_force(20.0),
            0.5 * 1.2 * 0.3 * 2.2 * 400.0,
            None
        ));
        assert!(almost_eq(veh.rolling_drag_force(20.0), 147.15, None));
    }

    #[test]
    fn test_pwr_max_frac_curve() {
        let mut veh = Vehicle::mock_vehicle();
        assert_eq!(veh.pwr_max_frac_at(33.0), 1.0);
        veh.pwr_max_frac_speed_mps = vec![0.0, 10.0, 40.0];
        veh.pwr_max_frac = vec![0.5, 1.0, 0.8];
        veh.set_derived().unwrap();
        assert!(almost_eq(veh.pwr_max_frac_at(5.0), 0.75, None));
        assert!(almost_eq(veh.pwr_max_frac_at(60.0), 0.8, None));
        assert!(almost_eq(veh.pwr_max_wheel_w(10.0), 80e3 * 0.9, None));
    }

    #[test]
    fn test_input_validation() {
        let mut veh = Vehicle::mock_vehicle();
        veh.veh_kg = 0.0;
        let err = veh.set_derived().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::InvalidVehicle(_))
        ));

        let mut veh = Vehicle::mock_vehicle();
        veh.pwr_max_frac = vec![1.0];
        assert!(veh.set_derived().is_err());
    }

    #[test]
    fn test_mock_matches_set_derived() {
        let veh = Vehicle::mock_vehicle();
        let mut veh_checked = veh.clone();
        veh_checked.set_derived().unwrap();
        assert_eq!(veh, veh_checked);
    }

    #[test]
    fn test_cg_height_bounds_traction() {
        // rear drive: negative cg height, weight transfer helps until it divides by zero
        let mut veh = Vehicle::mock_vehicle();
        veh.veh_cg_m = -0.53;
        veh.set_derived().unwrap();
        assert!(veh.max_trac_mps2 > Vehicle::mock_vehicle().max_trac_mps2);
        assert!(veh.max_trac_mps2.is_finite());

        for cg in [-3.0, -5.0] {
            veh.veh_cg_m = cg;
            let err = veh.set_derived().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<SimError>(),
                Some(SimError::InvalidVehicle(_))
            ));
        }
    }

    #[test]
    #[cfg(feature = "validation")]
    fn test_range_validation() {
        let mut veh = Vehicle::mock_vehicle();
        veh.drive_axle_weight_frac = 1.5;
        let err = veh.set_derived().unwrap_err();
        assert!(err.to_string().contains("drive_axle_weight_frac"));
    }

    #[test]
    fn test_yaml_roundtrip_sets_derived() {
        let veh = Vehicle::mock_vehicle();
        let yaml = veh.to_yaml().unwrap();
        let veh_de = Vehicle::from_yaml(yaml).unwrap();
        assert_eq!(veh, veh_de);
        assert!(veh_de.max_trac_mps2 > 0.0);
    }
}
