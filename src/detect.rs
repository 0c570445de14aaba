//! Timing synchronization by reference correlation
//!
//! The [`SyncDetector`] slides the reference sync waveform across an
//! incoming sample buffer and reports the best-aligned index. The
//! correlation metric is normalized against both the replica energy
//! and the windowed signal energy, so the detection threshold is
//! independent of the input level.

use nalgebra::DVector;
use num_complex::Complex;
use num_traits::Zero;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::params::SystemParams;
use crate::waveform::reference_waveform;

/// Detection confidence threshold
///
/// A candidate index is accepted only if its normalized correlation
/// metric exceeds this value. The metric lies in `[0, 1]`, with `1`
/// a perfect noise-free match. A fixed design constant.
pub const SYNC_THRESHOLD: f32 = 0.6;

/// Correlation-based timing offset detector
///
/// Holds the time-domain replica of the sync waveform, memoized at
/// construction since [`SystemParams`] never change mid-session.
/// [`search()`](SyncDetector::search) takes no mutable state; the
/// acquisition sequencer owns all cross-call state.
#[derive(Clone, Debug)]
pub struct SyncDetector {
    // time-domain sync replica, no cyclic prefix
    replica: DVector<Complex<f32>>,

    // replica energy, precomputed for the metric denominator
    replica_energy: f32,
}

impl SyncDetector {
    /// Create a detector for the given numerology
    pub fn new(params: &SystemParams) -> Self {
        let replica = reference_waveform(params);
        let replica_energy = replica.iter().map(|sa| sa.norm_sqr()).sum();
        Self {
            replica,
            replica_energy,
        }
    }

    /// Search a buffer for the sync waveform
    ///
    /// Cross-correlates the replica against every alignment of
    /// `samples` and returns the index of the strongest match, if
    /// its normalized metric
    ///
    /// ```txt
    /// |Σ conj(replica) · window|²
    /// ───────────────────────────
    ///      E_replica · E_window
    /// ```
    ///
    /// exceeds [`SYNC_THRESHOLD`]. Returns `None` if no alignment
    /// qualifies. A buffer shorter than the replica is an ordinary
    /// "not found": the detector never faults on input length.
    pub fn search(&self, samples: &[Complex<f32>]) -> Option<usize> {
        let n = self.replica.len();
        if samples.len() < n {
            debug!(
                "detect: buffer of {} samples shorter than replica ({})",
                samples.len(),
                n
            );
            return None;
        }

        let mut best_metric = 0.0f32;
        let mut best_index = 0usize;
        for index in 0..=samples.len() - n {
            let window = &samples[index..index + n];

            let mut corr: Complex<f32> = Complex::zero();
            let mut window_energy = 0.0f32;
            for (r, sa) in self.replica.iter().zip(window.iter()) {
                corr += r.conj() * *sa;
                window_energy += sa.norm_sqr();
            }
            if window_energy <= 0.0f32 {
                continue;
            }

            let metric = corr.norm_sqr() / (self.replica_energy * window_energy);
            if metric > best_metric {
                best_metric = metric;
                best_index = index;
            }
        }

        if best_metric > SYNC_THRESHOLD {
            debug!(
                "detect: sync at sample {}, metric {:.3}",
                best_index, best_metric
            );
            Some(best_index)
        } else {
            None
        }
    }

    /// Length of the reference replica, in samples
    ///
    /// Buffers shorter than this can never produce a detection.
    pub fn replica_len(&self) -> usize {
        self.replica.len()
    }
}
