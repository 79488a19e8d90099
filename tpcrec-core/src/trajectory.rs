//! Trajectory sample records and columnar trajectory storage.

use crate::constants::P_MC2;
use crate::vector::Vec3;
use ndarray::Array2;

/// One integration step of a tracked particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct TrajectorySample {
    /// X position, m.
    pub x: f64,
    /// Y position, m.
    pub y: f64,
    /// Z position, m.
    pub z: f64,
    /// Time since the start of the track, s.
    pub time: f64,
    /// Kinetic energy per nucleon, MeV/u.
    pub energy_u: f64,
    /// Azimuthal angle of the momentum, rad.
    pub azimuth: f64,
    /// Polar angle of the momentum, rad.
    pub polar: f64,
}

/// A trajectory stored in Structure of Arrays layout.
///
/// Samples are append-only during integration and frozen once the tracker
/// returns. Time is monotonically non-decreasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrajectoryBatch {
    /// X positions, m.
    pub x: Vec<f64>,
    /// Y positions, m.
    pub y: Vec<f64>,
    /// Z positions, m.
    pub z: Vec<f64>,
    /// Sample times, s.
    pub time: Vec<f64>,
    /// Kinetic energies per nucleon, MeV/u.
    pub energy_u: Vec<f64>,
    /// Momentum azimuthal angles, rad.
    pub azimuth: Vec<f64>,
    /// Momentum polar angles, rad.
    pub polar: Vec<f64>,
}

impl TrajectoryBatch {
    /// Create an empty batch with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            time: Vec::with_capacity(capacity),
            energy_u: Vec::with_capacity(capacity),
            azimuth: Vec::with_capacity(capacity),
            polar: Vec::with_capacity(capacity),
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True when the batch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append one sample.
    pub fn push(&mut self, sample: TrajectorySample) {
        self.x.push(sample.x);
        self.y.push(sample.y);
        self.z.push(sample.z);
        self.time.push(sample.time);
        self.energy_u.push(sample.energy_u);
        self.azimuth.push(sample.azimuth);
        self.polar.push(sample.polar);
    }

    /// Read back sample `i`.
    #[must_use]
    pub fn sample(&self, i: usize) -> TrajectorySample {
        TrajectorySample {
            x: self.x[i],
            y: self.y[i],
            z: self.z[i],
            time: self.time[i],
            energy_u: self.energy_u[i],
            azimuth: self.azimuth[i],
            polar: self.polar[i],
        }
    }

    /// Position of sample `i`.
    #[inline]
    #[must_use]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.x[i], self.y[i], self.z[i])
    }

    /// All positions as a Vec of 3-vectors.
    #[must_use]
    pub fn positions(&self) -> Vec<Vec3> {
        (0..self.len()).map(|i| self.position(i)).collect()
    }

    /// Total kinetic energy (MeV) of each sample for a species of the given
    /// mass number.
    #[must_use]
    pub fn total_energies(&self, mass_num: u32) -> Vec<f64> {
        let a = f64::from(mass_num);
        self.energy_u.iter().map(|eu| eu * a).collect()
    }

    /// Path length along the trajectory, m.
    #[must_use]
    pub fn path_length(&self) -> f64 {
        (1..self.len())
            .map(|i| (self.position(i) - self.position(i - 1)).norm())
            .sum()
    }

    /// Momentum magnitude (MeV/c) of sample `i` for the given mass number.
    #[must_use]
    pub fn momentum_mag(&self, i: usize, mass_num: u32) -> f64 {
        let rest = f64::from(mass_num) * P_MC2;
        let total = self.energy_u[i] * f64::from(mass_num) + rest;
        (total * total - rest * rest).max(0.0).sqrt()
    }

    /// Copy out an n x 7 matrix of (x, y, z, t, E/u, azimuth, polar) rows.
    #[must_use]
    pub fn to_matrix(&self) -> Array2<f64> {
        let n = self.len();
        let mut m = Array2::zeros((n, 7));
        for i in 0..n {
            m[[i, 0]] = self.x[i];
            m[[i, 1]] = self.y[i];
            m[[i, 2]] = self.z[i];
            m[[i, 3]] = self.time[i];
            m[[i, 4]] = self.energy_u[i];
            m[[i, 5]] = self.azimuth[i];
            m[[i, 6]] = self.polar[i];
        }
        m
    }

    /// Copy out an n x 3 matrix of positions.
    #[must_use]
    pub fn position_matrix(&self) -> Array2<f64> {
        let n = self.len();
        let mut m = Array2::zeros((n, 3));
        for i in 0..n {
            m[[i, 0]] = self.x[i];
            m[[i, 1]] = self.y[i];
            m[[i, 2]] = self.z[i];
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, t: f64, eu: f64) -> TrajectorySample {
        TrajectorySample {
            x,
            y: 0.0,
            z: 0.0,
            time: t,
            energy_u: eu,
            azimuth: 0.0,
            polar: std::f64::consts::FRAC_PI_2,
        }
    }

    #[test]
    fn test_push_and_read_back() {
        let mut batch = TrajectoryBatch::with_capacity(4);
        assert!(batch.is_empty());
        batch.push(sample(0.0, 0.0, 2.0));
        batch.push(sample(0.01, 1e-9, 1.9));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.sample(1).x, 0.01);
        assert_eq!(batch.position(1), Vec3::new(0.01, 0.0, 0.0));
    }

    #[test]
    fn test_path_length() {
        let mut batch = TrajectoryBatch::default();
        batch.push(sample(0.0, 0.0, 2.0));
        batch.push(sample(0.03, 1e-9, 1.9));
        batch.push(sample(0.07, 2e-9, 1.8));
        assert!((batch.path_length() - 0.07).abs() < 1e-15);
    }

    #[test]
    fn test_total_energies() {
        let mut batch = TrajectoryBatch::default();
        batch.push(sample(0.0, 0.0, 1.5));
        let total = batch.total_energies(4);
        assert!((total[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_momentum_magnitude() {
        let mut batch = TrajectoryBatch::default();
        batch.push(sample(0.0, 0.0, 2.0));
        // p = sqrt((A*(Eu + m_p))^2 - (A*m_p)^2) for A = 4
        let rest = 4.0 * P_MC2;
        let expected = ((8.0 + rest).powi(2) - rest * rest).sqrt();
        assert!((batch.momentum_mag(0, 4) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_shapes() {
        let mut batch = TrajectoryBatch::default();
        batch.push(sample(0.0, 0.0, 2.0));
        batch.push(sample(0.01, 1e-9, 1.9));
        assert_eq!(batch.to_matrix().dim(), (2, 7));
        assert_eq!(batch.position_matrix().dim(), (2, 3));
        assert_eq!(batch.to_matrix()[[1, 0]], 0.01);
        assert_eq!(batch.position_matrix()[[1, 0]], 0.01);
    }
}
