//! Relativistic trajectory integration through gas in E and B fields.

use tpcrec_core::constants::{C_LGT, E_CHG, MEV_TO_J, P_MC2};
use tpcrec_core::error::TrackingError;
use tpcrec_core::gas::GasModel;
use tpcrec_core::trajectory::{TrajectoryBatch, TrajectorySample};
use tpcrec_core::vector::Vec3;
use tpcrec_core::DetectorConfig;

/// Integration options for the tracker.
#[derive(Clone, Copy, Debug)]
pub struct TrackerConfig {
    /// Fixed RK4 time step, s.
    pub dt: f64,
    /// Termination threshold on kinetic energy per nucleon, MeV/u.
    pub e_min_per_u: f64,
    /// Safety cap on the number of recorded samples.
    pub max_samples: usize,
    /// Chamber radius, m; the track terminates when the transverse radius
    /// exceeds it.
    pub chamber_radius: f64,
    /// Chamber length, m; the track terminates when z leaves [0, length].
    pub chamber_length: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            dt: 1.0e-9,
            e_min_per_u: 1.0e-3,
            max_samples: 50_000,
            chamber_radius: 0.275,
            chamber_length: 1.0,
        }
    }
}

impl TrackerConfig {
    /// Set the integration time step, s.
    #[must_use]
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the low-energy termination threshold, MeV/u.
    #[must_use]
    pub fn with_e_min(mut self, e_min_per_u: f64) -> Self {
        self.e_min_per_u = e_min_per_u;
        self
    }

    /// Set the sample-count safety cap.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Set the chamber dimensions, m.
    #[must_use]
    pub fn with_chamber(mut self, radius: f64, length: f64) -> Self {
        self.chamber_radius = radius;
        self.chamber_length = length;
        self
    }
}

/// Integrator state: position (m) and momentum (kg·m/s).
#[derive(Clone, Copy)]
struct State {
    pos: Vec3,
    mom: Vec3,
}

/// Fixed-step RK4 integrator for a charged particle in E and B fields with
/// continuous energy loss in the gas.
///
/// The tracker holds a reference to the gas model, which must outlive it.
/// It keeps no mutable state between calls and may be shared across
/// threads.
#[derive(Clone, Debug)]
pub struct Tracker<'a> {
    gas: &'a GasModel,
    config: DetectorConfig,
    opts: TrackerConfig,
}

impl<'a> Tracker<'a> {
    /// Create a tracker over `gas` with the given detector configuration
    /// and default integration options.
    #[must_use]
    pub fn new(gas: &'a GasModel, config: DetectorConfig) -> Self {
        Self {
            gas,
            config,
            opts: TrackerConfig::default(),
        }
    }

    /// Replace the integration options.
    #[must_use]
    pub fn with_options(mut self, opts: TrackerConfig) -> Self {
        self.opts = opts;
        self
    }

    /// The active integration options.
    #[must_use]
    pub fn options(&self) -> &TrackerConfig {
        &self.opts
    }

    /// Integrate a particle launched from (x0, y0, z0) m with kinetic
    /// energy `energy_u` MeV/u and momentum direction given by `azimuth`
    /// and `polar` (rad), using the configured magnetic field.
    pub fn track_particle(
        &self,
        x0: f64,
        y0: f64,
        z0: f64,
        energy_u: f64,
        azimuth: f64,
        polar: f64,
    ) -> Result<TrajectoryBatch, TrackingError> {
        self.track_particle_in_field(x0, y0, z0, energy_u, azimuth, polar, self.config.bfield)
    }

    /// Same as [`track_particle`](Self::track_particle) with an explicit
    /// magnetic field, used by the minimizer to vary the field magnitude.
    #[allow(clippy::too_many_arguments)]
    pub fn track_particle_in_field(
        &self,
        x0: f64,
        y0: f64,
        z0: f64,
        energy_u: f64,
        azimuth: f64,
        polar: f64,
        bfield: Vec3,
    ) -> Result<TrajectoryBatch, TrackingError> {
        if !(energy_u > 0.0) || !energy_u.is_finite() {
            return Err(TrackingError::InvalidArgument(format!(
                "initial energy must be positive and finite, got {energy_u} MeV/u"
            )));
        }
        if !(azimuth.is_finite() && polar.is_finite()) {
            return Err(TrackingError::InvalidArgument(
                "launch angles must be finite".into(),
            ));
        }

        let mass_num = f64::from(self.config.mass_num);
        let rest_energy = mass_num * P_MC2; // MeV
        let charge = f64::from(self.config.charge_num) * E_CHG; // C

        // initial momentum from E/u and direction
        let total_energy = mass_num * energy_u + rest_energy;
        let p_mev = (total_energy * total_energy - rest_energy * rest_energy).sqrt();
        let p_si = p_mev * MEV_TO_J / C_LGT;
        let dir = Vec3::new(
            polar.sin() * azimuth.cos(),
            polar.sin() * azimuth.sin(),
            polar.cos(),
        );

        let mut state = State {
            pos: Vec3::new(x0, y0, z0),
            mom: dir * p_si,
        };
        let mut time = 0.0;
        let dt = self.opts.dt;

        let mut trajectory = TrajectoryBatch::with_capacity(256);
        trajectory.push(make_sample(&state, time, rest_energy, mass_num));

        loop {
            let next = self.rk4_step(&state, charge, rest_energy, bfield, dt);
            if !next.pos.is_finite() || !next.mom.is_finite() {
                return Err(TrackingError::Numerical {
                    step: trajectory.len(),
                });
            }

            // continuous energy loss over the step's path length, applied
            // by shrinking the momentum at fixed direction
            let ds = (next.pos - state.pos).norm();
            let kin = kinetic_energy(next.mom, rest_energy);
            let kin_new = kin - self.gas.stopping_power(kin) * ds;
            if kin_new <= 0.0 {
                // particle ranged out inside this step
                break;
            }
            let p_new = ((kin_new + rest_energy).powi(2) - rest_energy * rest_energy).sqrt();
            let p_cur = next.mom.norm();
            state = State {
                pos: next.pos,
                mom: next.mom * (p_new * MEV_TO_J / C_LGT / p_cur),
            };
            time += dt;

            trajectory.push(make_sample(&state, time, rest_energy, mass_num));

            if kin_new / mass_num < self.opts.e_min_per_u {
                break;
            }
            let r_trans = state.pos.x.hypot(state.pos.y);
            if r_trans > self.opts.chamber_radius
                || state.pos.z < 0.0
                || state.pos.z > self.opts.chamber_length
            {
                break;
            }
            if trajectory.len() >= self.opts.max_samples {
                break;
            }
        }

        Ok(trajectory)
    }

    /// One classical RK4 step of (position, momentum) under the Lorentz
    /// force.
    fn rk4_step(&self, s: &State, charge: f64, rest_energy: f64, bfield: Vec3, dt: f64) -> State {
        let deriv = |st: &State| {
            let v = velocity(st.mom, rest_energy);
            let force = (self.config.efield + v.cross(bfield)) * charge;
            (v, force)
        };

        let (k1v, k1f) = deriv(s);
        let s2 = State {
            pos: s.pos + k1v * (dt / 2.0),
            mom: s.mom + k1f * (dt / 2.0),
        };
        let (k2v, k2f) = deriv(&s2);
        let s3 = State {
            pos: s.pos + k2v * (dt / 2.0),
            mom: s.mom + k2f * (dt / 2.0),
        };
        let (k3v, k3f) = deriv(&s3);
        let s4 = State {
            pos: s.pos + k3v * dt,
            mom: s.mom + k3f * dt,
        };
        let (k4v, k4f) = deriv(&s4);

        State {
            pos: s.pos + (k1v + k2v * 2.0 + k3v * 2.0 + k4v) * (dt / 6.0),
            mom: s.mom + (k1f + k2f * 2.0 + k3f * 2.0 + k4f) * (dt / 6.0),
        }
    }
}

/// Relativistic velocity v = p c² / E_total for momentum in kg·m/s.
fn velocity(mom: Vec3, rest_energy_mev: f64) -> Vec3 {
    let rest_j = rest_energy_mev * MEV_TO_J;
    let p_c = mom.norm() * C_LGT;
    let total_j = (p_c * p_c + rest_j * rest_j).sqrt();
    mom * (C_LGT * C_LGT / total_j)
}

/// Kinetic energy (MeV) of a particle with momentum in kg·m/s.
fn kinetic_energy(mom: Vec3, rest_energy_mev: f64) -> f64 {
    let p_mev = mom.norm() * C_LGT / MEV_TO_J;
    (p_mev * p_mev + rest_energy_mev * rest_energy_mev).sqrt() - rest_energy_mev
}

fn make_sample(state: &State, time: f64, rest_energy: f64, mass_num: f64) -> TrajectorySample {
    let kin = kinetic_energy(state.mom, rest_energy);
    TrajectorySample {
        x: state.pos.x,
        y: state.pos.y,
        z: state.pos.z,
        time,
        energy_u: kin / mass_num,
        azimuth: state.mom.y.atan2(state.mom.x),
        polar: state.mom.x.hypot(state.mom.y).atan2(state.mom.z),
    }
}
