//! The per-tick stepping primitive consumed by the drivers, and a reference
//! road-load implementation of it.

use crate::imports::*;
use crate::vehicle::Vehicle;

/// Physical constraint that capped the achieved acceleration of a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitingCause {
    /// Tire to road friction on the drive axle
    Traction,
    /// Available propulsion power, including the balance of power against drag
    /// at top speed
    Power,
    /// Vehicle maximum speed
    SpeedLimit,
    /// Friction brake capacity
    Braking,
}

impl fmt::Display for LimitingCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Traction => "traction limit",
            Self::Power => "power limit",
            Self::SpeedLimit => "speed limit",
            Self::Braking => "braking limit",
        };
        f.write_str(label)
    }
}

/// Result of one tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickOutcome {
    /// Achieved acceleration, $m/s^2$
    pub accel_mps2: f64,
    /// Constraint that held the acceleration below the request, if any
    pub limit: Option<LimitingCause>,
}

/// Power contributions of the most recent tick, $W$
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerBreakdown {
    /// Power to overcome aerodynamic drag
    pub aero_w: f64,
    /// Power to overcome rolling resistance
    pub rolling_w: f64,
    /// Power to change kinetic energy, negative while slowing
    pub inertial_w: f64,
    /// Power dissipated by friction brakes
    pub brake_w: f64,
    /// Power lost between powertrain output and wheels
    pub driveline_loss_w: f64,
    /// Accessory load
    pub accessory_w: f64,
}

impl PowerBreakdown {
    /// Total power drawn from the powertrain
    pub fn total(&self) -> f64 {
        self.aero_w
            + self.rolling_w
            + self.inertial_w
            + self.brake_w
            + self.driveline_loss_w
            + self.accessory_w
    }
}

/// Kinematic state of a stepper
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Number of ticks taken
    pub i: u64,
    /// Speed, $m/s$
    pub speed_mps: f64,
    /// Cumulative distance, $m$
    pub dist_m: f64,
    /// Cumulative time
    #[serde(with = "utils::serde_secs")]
    pub time: Duration,
}

/// Fixed-interval stepping primitive
pub trait Stepper {
    /// Advance by exactly one [`dt`](Stepper::dt) commanding `accel_req_mps2`.
    /// A tick whose achieved acceleration is held below the request reports
    /// the binding constraint in [`TickOutcome::limit`]; `Err` is reserved for
    /// failures that invalidate the run.
    fn tick(&mut self, accel_req_mps2: f64) -> anyhow::Result<TickOutcome>;
    fn state(&self) -> &SimState;
    /// Overwrite the current speed, bypassing acceleration
    fn set_speed(&mut self, speed_mps: f64);
    /// Fixed tick interval
    fn dt(&self) -> Duration;
    /// Power contributions of the most recent tick
    fn power(&self) -> &PowerBreakdown;
    /// Aerodynamic drag at the current speed, $N$
    fn aero_drag_force(&self) -> f64;
    /// Rolling resistance at the current speed, $N$
    fn rolling_drag_force(&self) -> f64;
}

/// Anything that can produce a fresh [`Stepper`]
pub trait InitSimulation {
    type Sim: Stepper;
    /// Build a new stepper at rest, failing on physically invalid configuration
    fn init_simulation(&self) -> anyhow::Result<Self::Sim>;
}

/// Stepper parameters
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SimParams {
    /// Tick interval
    #[serde(with = "utils::serde_secs")]
    pub dt: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt: Duration::from_micros(params::SIM_DT_US),
        }
    }
}

impl SerdeAPI for SimParams {
    fn init(&mut self) -> anyhow::Result<()> {
        ensure!(!self.dt.is_zero(), format_dbg!(self.dt.is_zero()));
        Ok(())
    }
}

/// Vehicle together with stepper parameters
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SimSetup {
    pub veh: Vehicle,
    #[serde(default)]
    pub sim_params: SimParams,
}

impl SerdeAPI for SimSetup {
    fn init(&mut self) -> anyhow::Result<()> {
        self.veh.init().with_context(|| anyhow!(format_dbg!()))?;
        self.sim_params
            .init()
            .with_context(|| anyhow!(format_dbg!()))?;
        Ok(())
    }
}

impl InitSimulation for SimSetup {
    type Sim = Simulation;
    fn init_simulation(&self) -> anyhow::Result<Simulation> {
        Simulation::new(self.veh.clone(), self.sim_params.clone())
    }
}

impl InitSimulation for Vehicle {
    type Sim = Simulation;
    fn init_simulation(&self) -> anyhow::Result<Simulation> {
        Simulation::new(self.clone(), SimParams::default())
    }
}

/// Point-mass road-load simulation of a [`Vehicle`]
#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    veh: Vehicle,
    sim_params: SimParams,
    state: SimState,
    power: PowerBreakdown,
}

impl Simulation {
    pub fn new(mut veh: Vehicle, mut sim_params: SimParams) -> anyhow::Result<Self> {
        veh.set_derived().with_context(|| format_dbg!())?;
        sim_params.init().with_context(|| format_dbg!())?;
        Ok(Self {
            veh,
            sim_params,
            state: Default::default(),
            power: Default::default(),
        })
    }

    pub fn veh(&self) -> &Vehicle {
        &self.veh
    }

    /// Clamps `accel_req_mps2` to what the vehicle can achieve from the
    /// current speed over one tick
    fn achievable_accel(&self, accel_req_mps2: f64) -> TickOutcome {
        let veh = &self.veh;
        let dt_s = self.sim_params.dt.as_secs_f64();
        let speed = self.state.speed_mps;
        let f_road = veh.road_load_force(speed);
        let mass = veh.mass_eff_kg;

        let mut outcome = TickOutcome {
            accel_mps2: accel_req_mps2,
            limit: None,
        };
        let mut cap = |accel_max: f64, cause: LimitingCause| {
            if accel_max < outcome.accel_mps2 {
                outcome.accel_mps2 = accel_max;
                outcome.limit = Some(cause);
            }
        };
        cap(
            (veh.max_trac_mps2 * veh.veh_kg - f_road) / mass,
            LimitingCause::Traction,
        );
        // power available is unbounded force at standstill, traction governs there
        if speed > 0.0 {
            cap(
                (veh.pwr_max_wheel_w(speed) / speed - f_road) / mass,
                LimitingCause::Power,
            );
        }
        cap((veh.max_speed_mps - speed) / dt_s, LimitingCause::SpeedLimit);

        let accel_brake = -(veh.max_brake_mps2() * veh.veh_kg + f_road) / mass;
        if outcome.accel_mps2 < accel_brake {
            outcome.accel_mps2 = accel_brake;
            // a propulsive cap pushed below the floor keeps its own cause
            if accel_req_mps2 < accel_brake || outcome.limit.is_none() {
                outcome.limit = Some(LimitingCause::Braking);
            }
        }
        // the vehicle stops rather than reversing
        outcome.accel_mps2 = outcome.accel_mps2.max(-speed / dt_s);
        outcome
    }

    /// Sets [`PowerBreakdown`] for a tick accelerating at `accel_mps2` at
    /// mean speed `speed_mps`
    fn set_power(&mut self, accel_mps2: f64, speed_mps: f64) {
        let veh = &self.veh;
        let aero_w = veh.aero_drag_force(speed_mps) * speed_mps;
        let rolling_w = veh.rolling_drag_force(speed_mps) * speed_mps;
        let inertial_w = veh.mass_eff_kg * accel_mps2 * speed_mps;
        let pwr_tractive = aero_w + rolling_w + inertial_w;
        let (brake_w, driveline_loss_w) = if pwr_tractive >= 0.0 {
            (0.0, pwr_tractive * (1.0 / veh.drivetrain_eff - 1.0))
        } else {
            (-pwr_tractive, 0.0)
        };
        self.power = PowerBreakdown {
            aero_w,
            rolling_w,
            inertial_w,
            brake_w,
            driveline_loss_w,
            accessory_w: veh.aux_kw * 1e3,
        };
    }
}

impl Stepper for Simulation {
    fn tick(&mut self, accel_req_mps2: f64) -> anyhow::Result<TickOutcome> {
        ensure!(
            accel_req_mps2.is_finite(),
            SimError::NonFiniteRequest(accel_req_mps2)
        );
        let dt = self.sim_params.dt;
        let dt_s = dt.as_secs_f64();
        let outcome = self.achievable_accel(accel_req_mps2);

        let speed_prev = self.state.speed_mps;
        let speed = (speed_prev + outcome.accel_mps2 * dt_s).max(0.0);
        let speed_mean = 0.5 * (speed_prev + speed);
        self.set_power(outcome.accel_mps2, speed_mean);

        let vs = &mut self.state;
        vs.speed_mps = speed;
        vs.dist_m += speed_mean * dt_s;
        vs.time += dt;
        vs.i += 1;
        ensure!(
            vs.speed_mps.is_finite() && vs.dist_m.is_finite(),
            format!("{}\ntime step: {}", format_dbg!(vs), vs.i)
        );
        Ok(outcome)
    }

    fn state(&self) -> &SimState {
        &self.state
    }

    fn set_speed(&mut self, speed_mps: f64) {
        self.state.speed_mps = speed_mps;
    }

    fn dt(&self) -> Duration {
        self.sim_params.dt
    }

    fn power(&self) -> &PowerBreakdown {
        &self.power
    }

    fn aero_drag_force(&self) -> f64 {
        self.veh.aero_drag_force(self.state.speed_mps)
    }

    fn rolling_drag_force(&self) -> f64 {
        self.veh.rolling_drag_force(self.state.speed_mps)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Point mass with no limits and no losses other than a fixed accessory load
    #[derive(Clone, Debug, Default)]
    pub(crate) struct IdealStepper {
        pub state: SimState,
        pub power: PowerBreakdown,
        pub dt: Duration,
        pub mass_kg: f64,
        pub aux_w: f64,
    }

    impl IdealStepper {
        pub fn new(dt: Duration) -> Self {
            Self {
                dt,
                mass_kg: 1_000.0,
                aux_w: 500.0,
                ..Default::default()
            }
        }
    }

    impl Stepper for IdealStepper {
        fn tick(&mut self, accel_req_mps2: f64) -> anyhow::Result<TickOutcome> {
            let dt_s = self.dt.as_secs_f64();
            let speed_prev = self.state.speed_mps;
            self.state.speed_mps += accel_req_mps2 * dt_s;
            let speed_mean = 0.5 * (speed_prev + self.state.speed_mps);
            self.state.dist_m += speed_mean * dt_s;
            self.state.time += self.dt;
            self.state.i += 1;
            let inertial_w = self.mass_kg * accel_req_mps2 * speed_mean;
            self.power = PowerBreakdown {
                inertial_w,
                brake_w: (-inertial_w).max(0.0),
                accessory_w: self.aux_w,
                ..Default::default()
            };
            Ok(TickOutcome {
                accel_mps2: accel_req_mps2,
                limit: None,
            })
        }

        fn state(&self) -> &SimState {
            &self.state
        }

        fn set_speed(&mut self, speed_mps: f64) {
            self.state.speed_mps = speed_mps;
        }

        fn dt(&self) -> Duration {
            self.dt
        }

        fn power(&self) -> &PowerBreakdown {
            &self.power
        }

        fn aero_drag_force(&self) -> f64 {
            0.0
        }

        fn rolling_drag_force(&self) -> f64 {
            0.0
        }
    }

    pub(crate) struct IdealVehicle {
        pub dt: Duration,
    }

    impl InitSimulation for IdealVehicle {
        type Sim = IdealStepper;
        fn init_simulation(&self) -> anyhow::Result<IdealStepper> {
            Ok(IdealStepper::new(self.dt))
        }
    }

    fn mock_sim() -> Simulation {
        Vehicle::mock_vehicle().init_simulation().unwrap()
    }

    #[test]
    fn test_standing_start_is_traction_limited() {
        let mut sim = mock_sim();
        let outcome = sim.tick(1_000.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::Traction));
        let veh = sim.veh();
        assert!(almost_eq(
            outcome.accel_mps2,
            veh.max_trac_mps2 * veh.veh_kg / veh.mass_eff_kg,
            None
        ));
        assert_eq!(sim.state().i, 1);
        assert_eq!(sim.state().time, Duration::from_millis(1));
        assert!(sim.state().speed_mps > 0.0);
    }

    #[test]
    fn test_power_limited_at_speed() {
        let mut sim = mock_sim();
        sim.set_speed(30.0);
        let outcome = sim.tick(1_000.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::Power));
        // wheel power at the limit matches available power
        let veh = sim.veh().clone();
        let f_road = veh.road_load_force(30.0);
        assert!(almost_eq(
            (outcome.accel_mps2 * veh.mass_eff_kg + f_road) * 30.0,
            veh.pwr_max_wheel_w(30.0),
            Some(1e-9)
        ));
    }

    #[test]
    fn test_speed_limit() {
        let mut veh = Vehicle::mock_vehicle();
        veh.max_speed_mps = 10.0;
        let mut sim = veh.init_simulation().unwrap();
        sim.set_speed(9.9999);
        let outcome = sim.tick(1_000.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::SpeedLimit));
        assert!(almost_eq(sim.state().speed_mps, 10.0, None));
        let outcome = sim.tick(1_000.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::SpeedLimit));
        assert!(outcome.accel_mps2.abs() < 1e-6);
    }

    #[test]
    fn test_braking_and_standstill() {
        let mut sim = mock_sim();
        sim.set_speed(20.0);
        let outcome = sim.tick(-50.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::Braking));
        assert!(sim.power().brake_w > 0.0);
        assert_eq!(sim.power().driveline_loss_w, 0.0);

        // stopping short of the request is not a limit
        sim.set_speed(0.001);
        let outcome = sim.tick(-5.0).unwrap();
        assert_eq!(outcome.limit, None);
        assert_eq!(sim.state().speed_mps, 0.0);
        assert!(almost_eq(outcome.accel_mps2, -1.0, None));
    }

    #[test]
    fn test_overspeed_is_speed_limited() {
        let mut veh = Vehicle::mock_vehicle();
        veh.max_speed_mps = 30.0;
        let mut sim = veh.init_simulation().unwrap();
        sim.set_speed(40.0);
        // needs far more than the brakes give, but the speed cap is what binds
        let outcome = sim.tick(0.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::SpeedLimit));
        assert!(outcome.accel_mps2 < -veh.max_brake_mps2());

        sim.set_speed(40.0);
        let outcome = sim.tick(-1_000.0).unwrap();
        assert_eq!(outcome.limit, Some(LimitingCause::Braking));
    }

    #[test]
    fn test_cruise_power_breakdown() {
        let mut sim = mock_sim();
        sim.set_speed(25.0);
        let outcome = sim.tick(0.0).unwrap();
        assert_eq!(outcome.limit, None);
        let pwr = *sim.power();
        let veh = sim.veh();
        assert_eq!(pwr.inertial_w, 0.0);
        assert_eq!(pwr.brake_w, 0.0);
        assert!(almost_eq(pwr.aero_w, sim.aero_drag_force() * 25.0, None));
        assert!(almost_eq(pwr.rolling_w, sim.rolling_drag_force() * 25.0, None));
        assert!(almost_eq(
            pwr.total(),
            (pwr.aero_w + pwr.rolling_w) / veh.drivetrain_eff + veh.aux_kw * 1e3,
            None
        ));
    }

    #[test]
    fn test_time_is_exact() {
        let mut sim = mock_sim();
        for _ in 0..1_000 {
            sim.tick(1.0).unwrap();
        }
        assert_eq!(sim.state().time, Duration::from_secs(1));
        assert!(almost_eq(sim.state().speed_mps, 1.0, Some(1e-9)));
        assert!(almost_eq(sim.state().dist_m, 0.5, Some(1e-9)));
    }

    #[test]
    fn test_non_finite_request() {
        let mut sim = mock_sim();
        let err = sim.tick(f64::NAN).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::NonFiniteRequest(_))
        ));
    }

    #[test]
    fn test_sim_setup_serde() {
        let setup = SimSetup {
            veh: Vehicle::mock_vehicle(),
            sim_params: SimParams {
                dt: Duration::from_micros(500),
            },
        };
        let json = setup.to_json().unwrap();
        let setup_de = SimSetup::from_json(json).unwrap();
        assert_eq!(setup, setup_de);
        assert_eq!(
            setup_de.init_simulation().unwrap().dt(),
            Duration::from_micros(500)
        );
        assert!(SimParams::from_json(r#"{"dt":0.0}"#).is_err());
    }
}
