//! Forward projection of a trajectory to pad-plane electronics signals.

use crate::padplane::{PadPlane, NO_PAD};
use ndarray::Array2;
use std::collections::HashMap;
use tpcrec_core::constants::E_CHG;
use tpcrec_core::error::ProjectionError;
use tpcrec_core::vector::Vec3;
use tpcrec_core::{DetectorConfig, NUM_PADS, NUM_TB};

/// Per-pad time-domain signals in a compact sparse layout: parallel arrays
/// of pad ids and fixed-stride amplitude blocks.
#[derive(Clone, Debug, Default)]
pub struct PadSignalBatch {
    pads: Vec<u16>,
    /// Amplitudes, one [`NUM_TB`]-long block per entry of `pads`.
    amplitudes: Vec<f64>,
}

impl PadSignalBatch {
    /// Number of pads with signal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pads.len()
    }

    /// True when no pad received charge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    /// Pad id of entry `i`.
    #[inline]
    #[must_use]
    pub fn pad_id(&self, i: usize) -> u16 {
        self.pads[i]
    }

    /// Amplitude block of entry `i`.
    #[inline]
    #[must_use]
    pub fn signal(&self, i: usize) -> &[f64] {
        &self.amplitudes[i * NUM_TB..(i + 1) * NUM_TB]
    }

    /// Iterate over (pad id, amplitude block) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &[f64])> + '_ {
        (0..self.len()).map(move |i| (self.pad_id(i), self.signal(i)))
    }

    /// Sum of all amplitudes over all pads and time buckets.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.amplitudes.iter().sum()
    }

    /// Convert to a map keyed by pad id, for callers that need random
    /// access at the API boundary.
    #[must_use]
    pub fn into_map(self) -> HashMap<u16, Vec<f64>> {
        let mut map = HashMap::with_capacity(self.pads.len());
        for i in 0..self.pads.len() {
            map.insert(
                self.pads[i],
                self.amplitudes[i * NUM_TB..(i + 1) * NUM_TB].to_vec(),
            );
        }
        map
    }

    fn entry(&mut self, pad: u16, index: &mut HashMap<u16, usize>) -> usize {
        *index.entry(pad).or_insert_with(|| {
            self.pads.push(pad);
            self.amplitudes.extend(std::iter::repeat(0.0).take(NUM_TB));
            self.pads.len() - 1
        })
    }
}

/// One row per pad that collected charge: pad-center position, the time
/// bucket of the signal peak, and the integrated amplitude.
#[derive(Clone, Debug, Default)]
pub struct PeaksTable {
    /// Pad-center x, m.
    pub x: Vec<f64>,
    /// Pad-center y, m.
    pub y: Vec<f64>,
    /// Time bucket at the signal maximum.
    pub time_bucket: Vec<u32>,
    /// Integrated amplitude over all time buckets.
    pub amplitude: Vec<f64>,
    /// Pad id.
    pub pad: Vec<u16>,
}

impl PeaksTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pad.len()
    }

    /// True when no pad collected charge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pad.is_empty()
    }

    /// Copy out an n x 5 matrix of (x, y, tb, amplitude, pad) rows.
    #[must_use]
    pub fn to_matrix(&self) -> Array2<f64> {
        let n = self.len();
        let mut m = Array2::zeros((n, 5));
        for i in 0..n {
            m[[i, 0]] = self.x[i];
            m[[i, 1]] = self.y[i];
            m[[i, 2]] = f64::from(self.time_bucket[i]);
            m[[i, 3]] = self.amplitude[i];
            m[[i, 4]] = f64::from(self.pad[i]);
        }
        m
    }
}

/// Projects simulated trajectories onto the pad plane and folds in the
/// electronics response.
///
/// The generator holds a reference to the pad plane, which must outlive
/// it. It is stateless between calls and safe to share across threads.
#[derive(Clone, Debug)]
pub struct EventGenerator<'a> {
    pad_plane: &'a PadPlane,
    config: DetectorConfig,
    /// Discretized shaping impulse response, normalized to unit sum so the
    /// convolution conserves integrated charge.
    kernel: Vec<f64>,
}

impl<'a> EventGenerator<'a> {
    /// Create a generator over `pad_plane` with the given configuration.
    pub fn new(
        pad_plane: &'a PadPlane,
        config: DetectorConfig,
    ) -> Result<Self, ProjectionError> {
        if !(config.ioniz > 0.0) {
            return Err(ProjectionError::InvalidArgument(format!(
                "ionization potential must be positive, got {} eV",
                config.ioniz
            )));
        }
        if !(config.clock > 0.0) || !(config.shape > 0.0) {
            return Err(ProjectionError::InvalidArgument(format!(
                "clock ({} MHz) and shaping time ({} s) must be positive",
                config.clock, config.shape
            )));
        }
        if !(config.drift_velocity.z > 0.0) {
            return Err(ProjectionError::InvalidArgument(
                "drift velocity z component must be positive (speed toward the pad plane)"
                    .into(),
            ));
        }

        let kernel = shaping_kernel(config.shape, config.clock_hz());
        Ok(Self {
            pad_plane,
            config,
            kernel,
        })
    }

    /// The detector configuration in use.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Project a trajectory to shaped, gain-scaled per-pad signals.
    ///
    /// `positions` and `energies` (total kinetic energy per sample, MeV)
    /// run in parallel; between consecutive samples the released charge is
    /// the energy difference divided by the ionization potential.
    pub fn make_event(
        &self,
        positions: &[Vec3],
        energies: &[f64],
    ) -> Result<PadSignalBatch, ProjectionError> {
        let mut batch = PadSignalBatch::default();
        let mut index = HashMap::new();
        self.project(positions, energies, |pad, tb, amp| {
            let slot = batch.entry(pad, &mut index);
            batch.amplitudes[slot * NUM_TB + tb] += amp;
        })?;

        // electronics response per pad
        let mut shaped = vec![0.0; batch.amplitudes.len()];
        for slot in 0..batch.pads.len() {
            let raw = &batch.amplitudes[slot * NUM_TB..(slot + 1) * NUM_TB];
            let out = &mut shaped[slot * NUM_TB..(slot + 1) * NUM_TB];
            for (tb, &q) in raw.iter().enumerate() {
                if q == 0.0 {
                    continue;
                }
                for (k, &h) in self.kernel[..NUM_TB - tb].iter().enumerate() {
                    out[tb + k] += q * h;
                }
            }
        }
        batch.amplitudes = shaped;
        Ok(batch)
    }

    /// One row per pad touched, with the peak time bucket and the
    /// integrated amplitude. Requires a pad plane built from the canonical
    /// geometry (pad centers available).
    pub fn make_peaks(
        &self,
        positions: &[Vec3],
        energies: &[f64],
    ) -> Result<PeaksTable, ProjectionError> {
        let centers = self.pad_plane.pad_centers().ok_or_else(|| {
            ProjectionError::InvalidArgument(
                "pad centers unavailable: peaks need a canonical pad plane".into(),
            )
        })?;

        let event = self.make_event(positions, energies)?;
        let mut peaks = PeaksTable::default();
        for (pad, signal) in event.iter() {
            let mut peak_tb = 0usize;
            let mut peak_amp = f64::MIN;
            let mut integral = 0.0;
            for (tb, &a) in signal.iter().enumerate() {
                integral += a;
                if a > peak_amp {
                    peak_amp = a;
                    peak_tb = tb;
                }
            }
            let center = centers[pad as usize];
            peaks.x.push(center[0]);
            peaks.y.push(center[1]);
            peaks.time_bucket.push(peak_tb as u32);
            peaks.amplitude.push(integral);
            peaks.pad.push(pad);
        }
        Ok(peaks)
    }

    /// The mesh signal: the per-time-bucket sum across all pads.
    pub fn make_mesh_signal(
        &self,
        positions: &[Vec3],
        energies: &[f64],
    ) -> Result<Vec<f64>, ProjectionError> {
        let event = self.make_event(positions, energies)?;
        let mut mesh = vec![0.0; NUM_TB];
        for (_, signal) in event.iter() {
            for (tb, &a) in signal.iter().enumerate() {
                mesh[tb] += a;
            }
        }
        Ok(mesh)
    }

    /// The hit pattern: integrated amplitude per pad, over all pads.
    ///
    /// Computed from the unshaped deposits; since the shaping kernel has
    /// unit sum this equals the per-pad integral of
    /// [`make_event`](Self::make_event) up to the kernel tail truncated at
    /// the trace end.
    pub fn make_hit_pattern(
        &self,
        positions: &[Vec3],
        energies: &[f64],
    ) -> Result<Vec<f64>, ProjectionError> {
        let mut hits = vec![0.0; NUM_PADS];
        self.project(positions, energies, |pad, _tb, amp| {
            hits[pad as usize] += amp;
        })?;
        Ok(hits)
    }

    /// Shared projection loop: charge released between consecutive
    /// samples, tilt correction, drift to the pad plane, lateral
    /// diffusion, pad lookup. Calls `deposit(pad, tb, amplitude)` for each
    /// resolved charge packet; packets that miss the pad plane are
    /// silently dropped.
    fn project<F>(
        &self,
        positions: &[Vec3],
        energies: &[f64],
        mut deposit: F,
    ) -> Result<(), ProjectionError>
    where
        F: FnMut(u16, usize, f64),
    {
        if positions.len() != energies.len() {
            return Err(ProjectionError::InvalidArgument(format!(
                "positions ({}) and energies ({}) differ in length",
                positions.len(),
                energies.len()
            )));
        }
        if positions.len() < 2 {
            return Err(ProjectionError::EmptyTrajectory(positions.len()));
        }

        let gain = self.config.micromegas_gain * self.config.electronics_gain * E_CHG;
        let vd = self.config.drift_velocity_mps();
        let clock = self.config.clock_hz();
        let (cos_t, sin_t) = (self.config.tilt.cos(), self.config.tilt.sin());

        for i in 1..positions.len() {
            let de = energies[i - 1] - energies[i];
            if de <= 0.0 {
                continue;
            }
            let electrons = de * 1.0e6 / self.config.ioniz;
            let amp = electrons * gain;

            let mid = (positions[i - 1] + positions[i]) * 0.5;
            // tilt correction: rotate about x by -tilt into the detector
            // frame, pad plane at z = 0
            let y_det = mid.y * cos_t + mid.z * sin_t;
            let z_det = -mid.y * sin_t + mid.z * cos_t;
            if z_det < 0.0 {
                continue;
            }

            let t_drift = z_det / vd.z;
            let u = mid.x + vd.x * t_drift;
            let v = y_det + vd.y * t_drift;
            let tb = ((t_drift * clock) as usize).min(NUM_TB - 1);

            let sigma = self.config.diff_sigma * z_det.sqrt();
            if sigma > 0.0 {
                self.deposit_diffused(u, v, tb, amp, sigma, &mut deposit);
            } else if let Ok(pad) = self.pad_plane.pad_at(u, v) {
                if pad != NO_PAD {
                    deposit(pad, tb, amp);
                }
            }
        }
        Ok(())
    }

    /// Spread one charge packet over a 5x5 Gaussian kernel of sub-points.
    ///
    /// The grid spacing of 1.2 sigma keeps the support within the 3 sigma
    /// disk while preserving the packet's standard deviation to about 1%;
    /// weights are renormalized so the full packet charge lands on the
    /// plane (minus sub-points that miss it).
    fn deposit_diffused<F>(
        &self,
        u: f64,
        v: f64,
        tb: usize,
        amp: f64,
        sigma: f64,
        deposit: &mut F,
    ) where
        F: FnMut(u16, usize, f64),
    {
        const STEP_SIGMA: f64 = 1.2;
        let step = STEP_SIGMA * sigma;
        let mut weights = [[0.0_f64; 5]; 5];
        let mut total = 0.0;
        for (gi, row) in weights.iter_mut().enumerate() {
            for (gj, w) in row.iter_mut().enumerate() {
                let dx = (gi as f64 - 2.0) * step;
                let dy = (gj as f64 - 2.0) * step;
                *w = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
                total += *w;
            }
        }
        for gi in 0..5 {
            for gj in 0..5 {
                let dx = (gi as f64 - 2.0) * step;
                let dy = (gj as f64 - 2.0) * step;
                if let Ok(pad) = self.pad_plane.pad_at(u + dx, v + dy) {
                    if pad != NO_PAD {
                        deposit(pad, tb, amp * weights[gi][gj] / total);
                    }
                }
            }
        }
    }
}

/// Discretized semi-Gaussian shaping response `(t/tau) exp(1 - t/tau)`,
/// sampled per time bucket and normalized to unit sum.
fn shaping_kernel(shape: f64, clock_hz: f64) -> Vec<f64> {
    let tau_tb = shape * clock_hz;
    let mut kernel: Vec<f64> = (0..NUM_TB)
        .map(|k| {
            let t = k as f64 / tau_tb;
            t * (1.0 - t).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}
