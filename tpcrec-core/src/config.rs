//! Detector and electronics configuration.

use crate::vector::Vec3;
use serde::{Deserialize, Serialize};

/// Number of pads on the canonical AT-TPC pad plane.
pub const NUM_PADS: usize = 10_240;

/// Number of time buckets per recorded trace.
pub const NUM_TB: usize = 512;

/// Configuration for the detector, fields, gas electronics chain, and the
/// tracked/beam species.
///
/// Units follow the conventions of the reconstruction core: lengths in m,
/// energies in MeV, fields in V/m and T, angles in rad. Quantities that are
/// conventionally quoted in other units (clock in MHz, drift velocity in
/// cm/µs) are stored as configured and converted through accessors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Mass number A of the tracked species.
    pub mass_num: u32,
    /// Charge number Z of the tracked species.
    pub charge_num: u32,
    /// Mass number A of the beam species.
    pub beam_mass_num: u32,
    /// Charge number Z of the beam species.
    pub beam_charge_num: u32,
    /// Beam kinetic energy at the chamber entrance, MeV.
    pub beam_energy: f64,
    /// Electric field vector, V/m.
    pub efield: Vec3,
    /// Magnetic field vector, T.
    pub bfield: Vec3,
    /// Mean energy per ion pair in the gas, eV.
    pub ioniz: f64,
    /// Micromegas avalanche gain.
    pub micromegas_gain: f64,
    /// Electronics gain applied after the avalanche.
    pub electronics_gain: f64,
    /// Detector tilt about the x axis, rad.
    pub tilt: f64,
    /// Electron drift velocity, cm/µs. The z component is the (positive)
    /// speed at which electrons approach the pad plane; the transverse
    /// components displace the arrival point in-plane.
    pub drift_velocity: Vec3,
    /// Sampling clock, MHz.
    pub clock: f64,
    /// Shaping time of the electronics impulse response, s.
    pub shape: f64,
    /// Transverse diffusion coefficient, m per sqrt(m) of drift.
    pub diff_sigma: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mass_num: 4,
            charge_num: 2,
            beam_mass_num: 4,
            beam_charge_num: 2,
            beam_energy: 8.0,
            efield: Vec3::new(0.0, 0.0, -9.2e3),
            bfield: Vec3::new(0.0, 0.0, 1.75),
            ioniz: 41.0,
            micromegas_gain: 8000.0,
            electronics_gain: 1.0,
            tilt: 0.0,
            drift_velocity: Vec3::new(0.0, 0.0, 5.2),
            clock: 12.5,
            shape: 280.0e-9,
            diff_sigma: 2.5e-3,
        }
    }
}

impl DetectorConfig {
    /// Sampling clock in Hz.
    #[inline]
    #[must_use]
    pub fn clock_hz(&self) -> f64 {
        self.clock * 1.0e6
    }

    /// Drift velocity in m/s.
    #[inline]
    #[must_use]
    pub fn drift_velocity_mps(&self) -> Vec3 {
        // 1 cm/us = 1e4 m/s
        self.drift_velocity * 1.0e4
    }

    /// Set the tracked species.
    #[must_use]
    pub fn with_species(mut self, mass_num: u32, charge_num: u32) -> Self {
        self.mass_num = mass_num;
        self.charge_num = charge_num;
        self
    }

    /// Set the beam species and its entrance energy (MeV).
    #[must_use]
    pub fn with_beam(mut self, mass_num: u32, charge_num: u32, energy: f64) -> Self {
        self.beam_mass_num = mass_num;
        self.beam_charge_num = charge_num;
        self.beam_energy = energy;
        self
    }

    /// Set the electric field, V/m.
    #[must_use]
    pub fn with_efield(mut self, efield: Vec3) -> Self {
        self.efield = efield;
        self
    }

    /// Set the magnetic field, T.
    #[must_use]
    pub fn with_bfield(mut self, bfield: Vec3) -> Self {
        self.bfield = bfield;
        self
    }

    /// Set the mean energy per ion pair, eV.
    #[must_use]
    pub fn with_ioniz(mut self, ioniz: f64) -> Self {
        self.ioniz = ioniz;
        self
    }

    /// Set the detector tilt, rad.
    #[must_use]
    pub fn with_tilt(mut self, tilt: f64) -> Self {
        self.tilt = tilt;
        self
    }

    /// Set the drift velocity, cm/µs.
    #[must_use]
    pub fn with_drift_velocity(mut self, vd: Vec3) -> Self {
        self.drift_velocity = vd;
        self
    }

    /// Set the sampling clock, MHz.
    #[must_use]
    pub fn with_clock(mut self, clock_mhz: f64) -> Self {
        self.clock = clock_mhz;
        self
    }

    /// Set the shaping time, s.
    #[must_use]
    pub fn with_shape(mut self, shape: f64) -> Self {
        self.shape = shape;
        self
    }

    /// Set the transverse diffusion coefficient, m/sqrt(m).
    #[must_use]
    pub fn with_diff_sigma(mut self, diff_sigma: f64) -> Self {
        self.diff_sigma = diff_sigma;
        self
    }

    /// Set the gains of the electronics chain.
    #[must_use]
    pub fn with_gains(mut self, micromegas: f64, electronics: f64) -> Self {
        self.micromegas_gain = micromegas;
        self.electronics_gain = electronics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions() {
        let config = DetectorConfig::default();
        assert_eq!(config.clock_hz(), 12.5e6);
        let vd = config.drift_velocity_mps();
        assert!((vd.z - 5.2e4).abs() < 1e-9);
    }

    #[test]
    fn test_builder() {
        let config = DetectorConfig::default()
            .with_species(1, 1)
            .with_beam(40, 18, 120.0)
            .with_bfield(Vec3::new(0.0, 0.0, 0.5))
            .with_tilt(0.108)
            .with_clock(6.25);
        assert_eq!(config.mass_num, 1);
        assert_eq!(config.beam_mass_num, 40);
        assert_eq!(config.bfield.z, 0.5);
        assert_eq!(config.tilt, 0.108);
        assert_eq!(config.clock_hz(), 6.25e6);
    }
}
