//! Transforms of recorded per-pad traces into fit observations.

use ndarray::Array2;
use tpcrec_core::error::ProjectionError;
use tpcrec_core::{NUM_PADS, NUM_TB};

/// An event as recorded by the electronics: one amplitude trace per
/// activated pad.
///
/// Holds the merged, calibrated traces; building it from raw acquisition
/// files is the concern of an upstream unpacking layer.
#[derive(Clone, Debug, Default)]
pub struct ObservedEvent {
    /// Event id assigned by the acquisition.
    pub event_id: u32,
    /// Acquisition timestamp.
    pub timestamp: u64,
    pads: Vec<u16>,
    /// One [`NUM_TB`]-long block per entry of `pads`.
    traces: Vec<f64>,
}

impl ObservedEvent {
    /// Create an empty event.
    #[must_use]
    pub fn new(event_id: u32, timestamp: u64) -> Self {
        Self {
            event_id,
            timestamp,
            pads: Vec::new(),
            traces: Vec::new(),
        }
    }

    /// Number of recorded traces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pads.len()
    }

    /// True when the event has no traces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    /// Append the trace for one pad. Each pad may appear at most once.
    pub fn push_trace(&mut self, pad: u16, trace: &[f64]) -> Result<(), ProjectionError> {
        if usize::from(pad) >= NUM_PADS {
            return Err(ProjectionError::InvalidArgument(format!(
                "pad id {pad} out of range (num pads {NUM_PADS})"
            )));
        }
        if trace.len() != NUM_TB {
            return Err(ProjectionError::InvalidArgument(format!(
                "trace has {} samples, expected {NUM_TB}",
                trace.len()
            )));
        }
        if self.pads.contains(&pad) {
            return Err(ProjectionError::InvalidArgument(format!(
                "pad {pad} already has a trace"
            )));
        }
        self.pads.push(pad);
        self.traces.extend_from_slice(trace);
        Ok(())
    }

    /// The trace of entry `i`.
    #[inline]
    #[must_use]
    pub fn trace(&self, i: usize) -> &[f64] {
        &self.traces[i * NUM_TB..(i + 1) * NUM_TB]
    }

    /// Total activation of each pad: the per-pad sum over all time
    /// buckets, as a dense length-[`NUM_PADS`] vector.
    #[must_use]
    pub fn hits(&self) -> Vec<f64> {
        let mut hits = vec![0.0; NUM_PADS];
        for (i, &pad) in self.pads.iter().enumerate() {
            hits[pad as usize] = self.trace(i).iter().sum();
        }
        hits
    }

    /// Scatter points of the event: one (x, y, tb, amplitude) row per
    /// nonzero trace sample, with x and y taken from the pad centers.
    ///
    /// `pad_centers` is indexed by pad id, as produced by the canonical
    /// pad plane.
    pub fn xyzs(&self, pad_centers: &[[f64; 2]]) -> Result<Array2<f64>, ProjectionError> {
        if pad_centers.len() < NUM_PADS {
            return Err(ProjectionError::InvalidArgument(format!(
                "pad center table has {} entries, expected {NUM_PADS}",
                pad_centers.len()
            )));
        }
        let mut rows = Vec::new();
        for (i, &pad) in self.pads.iter().enumerate() {
            let center = pad_centers[pad as usize];
            for (tb, &a) in self.trace(i).iter().enumerate() {
                if a != 0.0 {
                    rows.push([center[0], center[1], tb as f64, a]);
                }
            }
        }
        let mut m = Array2::zeros((rows.len(), 4));
        for (r, row) in rows.iter().enumerate() {
            for c in 0..4 {
                m[[r, c]] = row[c];
            }
        }
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_with(entries: &[(usize, f64)]) -> Vec<f64> {
        let mut t = vec![0.0; NUM_TB];
        for &(tb, a) in entries {
            t[tb] = a;
        }
        t
    }

    #[test]
    fn test_hits_integrates_traces() {
        let mut event = ObservedEvent::new(7, 1234);
        event
            .push_trace(100, &trace_with(&[(10, 5.0), (11, 7.0)]))
            .unwrap();
        event.push_trace(200, &trace_with(&[(42, 3.0)])).unwrap();
        assert_eq!(event.len(), 2);

        let hits = event.hits();
        assert_eq!(hits.len(), NUM_PADS);
        assert_eq!(hits[100], 12.0);
        assert_eq!(hits[200], 3.0);
        assert_eq!(hits[0], 0.0);
    }

    #[test]
    fn test_xyzs_rows() {
        let plane = crate::padplane::PadPlane::canonical(0.0);
        let centers = plane.pad_centers().unwrap();

        let mut event = ObservedEvent::new(0, 0);
        event
            .push_trace(55, &trace_with(&[(100, 2.0), (101, 4.0)]))
            .unwrap();
        let xyzs = event.xyzs(centers).unwrap();
        assert_eq!(xyzs.dim(), (2, 4));
        assert_eq!(xyzs[[0, 0]], centers[55][0]);
        assert_eq!(xyzs[[0, 1]], centers[55][1]);
        assert_eq!(xyzs[[0, 2]], 100.0);
        assert_eq!(xyzs[[0, 3]], 2.0);
        assert_eq!(xyzs[[1, 2]], 101.0);
    }

    #[test]
    fn test_push_trace_validation() {
        let mut event = ObservedEvent::new(0, 0);
        assert!(event.push_trace(60000, &vec![0.0; NUM_TB]).is_err());
        assert!(event.push_trace(1, &[0.0; 10]).is_err());
        event.push_trace(1, &vec![0.0; NUM_TB]).unwrap();
        assert!(event.push_trace(1, &vec![0.0; NUM_TB]).is_err());
    }
}
