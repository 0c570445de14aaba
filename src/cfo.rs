//! Carrier frequency offset estimation
//!
//! The [`CfoEstimator`] measures the residual carrier offset by
//! correlating each cyclic prefix against the symbol tail it was
//! copied from. Any offset rotates the two copies against each
//! other by a phase proportional to the offset. Estimates from
//! every observed symbol are accumulated, so the reported value
//! smooths out as more buffers arrive; the acquisition sequencer
//! waits for [`REQUIRED_AVERAGING_SYMBOLS`] before trusting it.

use num_complex::Complex;
use num_traits::Zero;

#[cfg(not(test))]
use log::trace;

#[cfg(test)]
use std::println as trace;

use crate::params::SystemParams;

/// Symbols required before the averaged estimate is trustworthy
///
/// The per-symbol phase measurement is noisy; the running average
/// needs at least this many symbols to settle. A fixed design
/// constant.
pub const REQUIRED_AVERAGING_SYMBOLS: u32 = 144;

/// Cyclic-prefix correlation frequency offset estimator
///
/// Feed one buffer per call to
/// [`estimate()`](CfoEstimator::estimate); the estimator walks the
/// buffer symbol by symbol and folds each cyclic prefix correlation
/// into its running accumulator. The accumulator persists across
/// calls until [`reset()`](CfoEstimator::reset).
#[derive(Clone, Debug)]
pub struct CfoEstimator {
    // FFT length, in samples
    fft_len: usize,

    // cyclic prefix length, in samples
    cp_len: usize,

    // stride between symbol starts, in samples
    samples_per_symbol: usize,

    // subcarrier spacing, which converts phase to Hz
    subcarrier_spacing_hz: f32,

    // running sum of prefix correlations
    accumulator: Complex<f32>,

    // lifetime count of symbols folded into the accumulator
    symbols_accumulated: u32,
}

impl CfoEstimator {
    /// Create an estimator for the given numerology
    pub fn new(params: &SystemParams) -> Self {
        Self {
            fft_len: params.fft_len(),
            cp_len: params.cp_len(),
            samples_per_symbol: params.samples_per_symbol(),
            subcarrier_spacing_hz: params.subcarrier_spacing_hz(),
            accumulator: Complex::zero(),
            symbols_accumulated: 0,
        }
    }

    /// Fold a buffer into the running estimate
    ///
    /// Correlates the cyclic prefix of every complete symbol in
    /// `samples` against the end of that symbol, one FFT length
    /// later. Returns the averaged offset estimate so far, in Hz.
    /// A buffer too short to hold one cyclic-prefixed symbol leaves
    /// the estimate unchanged.
    pub fn estimate(&mut self, samples: &[Complex<f32>]) -> f32 {
        let symbol_len = self.fft_len + self.cp_len;
        let mut start = 0usize;
        while start + symbol_len <= samples.len() {
            let mut corr: Complex<f32> = Complex::zero();
            for i in start..start + self.cp_len {
                corr += samples[i].conj() * samples[i + self.fft_len];
            }
            self.accumulator += corr;
            self.symbols_accumulated += 1;
            start += self.samples_per_symbol;
        }

        let foff = self.frequency_offset_hz();
        trace!(
            "cfo: {:.1} Hz over {} symbols",
            foff,
            self.symbols_accumulated
        );
        foff
    }

    /// Averaged frequency offset estimate, in Hz
    ///
    /// The phase of the accumulated prefix correlation, scaled by
    /// the subcarrier spacing. Zero until any symbols have been
    /// observed. Unambiguous for offsets within ±half the
    /// subcarrier spacing.
    pub fn frequency_offset_hz(&self) -> f32 {
        if self.symbols_accumulated == 0 {
            return 0.0f32;
        }
        self.accumulator.arg() * self.subcarrier_spacing_hz
            / (2.0f32 * std::f32::consts::PI)
    }

    /// Lifetime count of symbols folded into the average
    pub fn symbols_accumulated(&self) -> u32 {
        self.symbols_accumulated
    }

    /// Has the average settled?
    ///
    /// True once at least [`REQUIRED_AVERAGING_SYMBOLS`] have been
    /// observed.
    pub fn is_converged(&self) -> bool {
        self.symbols_accumulated >= REQUIRED_AVERAGING_SYMBOLS
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.accumulator = Complex::zero();
        self.symbols_accumulated = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    use crate::waveform::{apply_cfo, cp_symbol_stream};

    #[test]
    fn test_estimates_known_offset() {
        const OFFSET_HZ: f32 = 200.0;

        let params = SystemParams::default();
        let mut stream = cp_symbol_stream(&params, 72);
        apply_cfo(&mut stream, OFFSET_HZ, params.sample_rate_hz());

        let mut uut = CfoEstimator::new(&params);
        let foff = uut.estimate(&stream);
        assert_eq!(72, uut.symbols_accumulated());
        assert_approx_eq!(OFFSET_HZ, foff, 1.0f32);
    }

    #[test]
    fn test_negative_offset() {
        const OFFSET_HZ: f32 = -340.0;

        let params = SystemParams::default();
        let mut stream = cp_symbol_stream(&params, 36);
        apply_cfo(&mut stream, OFFSET_HZ, params.sample_rate_hz());

        let mut uut = CfoEstimator::new(&params);
        assert_approx_eq!(OFFSET_HZ, uut.estimate(&stream), 1.0f32);
    }

    #[test]
    fn test_accumulates_across_calls() {
        let params = SystemParams::default();
        let mut stream = cp_symbol_stream(&params, 72);
        apply_cfo(&mut stream, 120.0, params.sample_rate_hz());

        let mut uut = CfoEstimator::new(&params);
        assert!(!uut.is_converged());

        uut.estimate(&stream);
        assert_eq!(72, uut.symbols_accumulated());
        assert!(!uut.is_converged());

        // a second frame pushes the average past the requirement
        let foff = uut.estimate(&stream);
        assert_eq!(144, uut.symbols_accumulated());
        assert!(uut.is_converged());
        assert_approx_eq!(120.0f32, foff, 1.0f32);

        uut.reset();
        assert_eq!(0, uut.symbols_accumulated());
        assert_eq!(0.0f32, uut.frequency_offset_hz());
    }

    #[test]
    fn test_short_buffer_is_ignored() {
        let params = SystemParams::default();
        let mut uut = CfoEstimator::new(&params);

        let short = cp_symbol_stream(&params, 1);
        let foff = uut.estimate(&short[..params.samples_per_symbol() - 1]);
        assert_eq!(0.0f32, foff);
        assert_eq!(0, uut.symbols_accumulated());
    }

    #[test]
    fn test_no_offset_reads_zero() {
        let params = SystemParams::default();
        let stream = cp_symbol_stream(&params, 12);

        let mut uut = CfoEstimator::new(&params);
        assert_approx_eq!(0.0f32, uut.estimate(&stream), 0.5f32);
    }
}
