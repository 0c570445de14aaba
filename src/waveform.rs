//! Sync waveform construction
//!
//! The transmitter places a known Zadoff–Chu sequence on the 62
//! center subcarriers of one OFDM symbol, with the DC bin and the
//! spectrum edges left as nulls. [`reference_waveform()`] regenerates
//! the matching time-domain replica, which the
//! [`SyncDetector`](crate::SyncDetector) correlates against the
//! received signal. The replica carries no cyclic prefix.

use nalgebra::DVector;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::params::SystemParams;

/// Number of occupied sync subcarriers
///
/// The sync sequence occupies 31 subcarriers on either side of DC.
/// The DC bin itself is always null.
pub const NUM_SYNC_SUBCARRIERS: usize = 62;

/// Smallest supported FFT length
///
/// Enough room for the sync subcarriers, the DC null, and at least
/// one guard bin at the spectrum edge.
pub const MIN_FFT_LEN: usize = NUM_SYNC_SUBCARRIERS + 2;

/// Zadoff–Chu root index for the sync sequence
pub const SYNC_SEQUENCE_ROOT: u32 = 25;

// Length of the underlying Zadoff–Chu sequence. The middle element
// is punctured so the remaining 62 fit around the DC null.
const ZC_LEN: usize = 63;

/// Frequency-domain sync sequence
///
/// Returns the 62 nonzero subcarrier values: a length-63 Zadoff–Chu
/// sequence of root [`SYNC_SEQUENCE_ROOT`] with its middle element
/// punctured. Every element has unit magnitude, which gives the
/// time-domain replica a flat spectrum and a sharp autocorrelation
/// peak.
pub fn sync_sequence() -> Vec<Complex<f32>> {
    let mut out = Vec::with_capacity(NUM_SYNC_SUBCARRIERS);
    for n in 0..ZC_LEN {
        if n == ZC_LEN / 2 {
            continue;
        }
        let phase = -std::f32::consts::PI
            * (SYNC_SEQUENCE_ROOT as f32)
            * (n as f32)
            * ((n + 1) as f32)
            / ZC_LEN as f32;
        out.push(Complex::from_polar(1.0f32, phase));
    }
    out
}

/// Time-domain reference sync waveform
///
/// Maps [`sync_sequence()`] onto the center subcarriers (the first
/// half below DC, the second half above) and modulates it into a
/// time-domain waveform of length [`fft_len`](SystemParams::fft_len)
/// with an inverse FFT. All remaining bins, including DC and the
/// spectrum edges, are null.
///
/// The output is deterministic in `params`; callers that invoke this
/// repeatedly may cache the result.
pub fn reference_waveform(params: &SystemParams) -> DVector<Complex<f32>> {
    let n = params.fft_len();
    debug_assert!(n >= MIN_FFT_LEN);

    let seq = sync_sequence();
    let half = NUM_SYNC_SUBCARRIERS / 2;

    let mut bins = vec![Complex::new(0.0f32, 0.0f32); n];
    for (k, d) in seq[..half].iter().enumerate() {
        // negative frequencies: subcarriers -31 … -1
        bins[n - half + k] = *d;
    }
    for (k, d) in seq[half..].iter().enumerate() {
        // positive frequencies: subcarriers +1 … +31
        bins[k + 1] = *d;
    }

    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(n);
    ifft.process(&mut bins);

    // unitary scaling, matching a 1/sqrt(N) forward transform
    let scale = 1.0f32 / (n as f32).sqrt();
    DVector::from_iterator(n, bins.into_iter().map(|sa| sa * scale))
}

/// Deterministic low-level filler samples
///
/// Generates complex pseudo-noise of roughly `amplitude` from a
/// 64-bit LCG. Used by tests to surround the sync waveform with
/// uncorrelated junk.
#[cfg(test)]
pub fn test_noise(len: usize, amplitude: f32, mut seed: u64) -> Vec<Complex<f32>> {
    let mut out = Vec::with_capacity(len);
    let mut next = move || {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((seed >> 32) as u32 as f32 / (1u64 << 31) as f32) - 1.0f32
    };
    for _i in 0..len {
        out.push(Complex::new(next() * amplitude, next() * amplitude));
    }
    out
}

/// Build a buffer with the reference waveform at a known offset
///
/// The rest of the buffer is filled with low-level pseudo-noise.
/// Panics if the waveform does not fit.
#[cfg(test)]
pub fn embed_reference(params: &SystemParams, offset: usize, total_len: usize) -> Vec<Complex<f32>> {
    let replica = reference_waveform(params);
    assert!(offset + replica.len() <= total_len);

    let mut out = test_noise(total_len, 0.02f32, 0x1ceb00da);
    for (o, r) in out[offset..].iter_mut().zip(replica.iter()) {
        *o = *r;
    }
    out
}

/// Generate a stream of cyclic-prefixed OFDM symbols
///
/// Each symbol is the reference waveform body with its tail copied
/// in front as a cyclic prefix, padded with zeros out to
/// [`samples_per_symbol`](SystemParams::samples_per_symbol). The
/// content does not matter to the frequency offset estimator; only
/// the prefix structure does.
#[cfg(test)]
pub fn cp_symbol_stream(params: &SystemParams, num_symbols: usize) -> Vec<Complex<f32>> {
    let body = reference_waveform(params);
    let cp = params.cp_len();
    let mut out = Vec::with_capacity(num_symbols * params.samples_per_symbol());
    for _i in 0..num_symbols {
        out.extend(body.iter().skip(body.len() - cp));
        out.extend(body.iter());
        for _pad in (params.fft_len() + cp)..params.samples_per_symbol() {
            out.push(Complex::new(0.0f32, 0.0f32));
        }
    }
    out
}

/// Rotate samples by a carrier frequency offset
///
/// Applies `exp(j 2π f t)` to the buffer in place, with `t` in
/// samples at the rate `sample_rate_hz`.
#[cfg(test)]
pub fn apply_cfo(samples: &mut [Complex<f32>], freq_hz: f32, sample_rate_hz: f32) {
    const TWOPI: f32 = 2.0f32 * std::f32::consts::PI;

    let rad_per_sa = TWOPI * freq_hz / sample_rate_hz;
    for (t, sa) in samples.iter_mut().enumerate() {
        *sa *= Complex::from_polar(1.0f32, rad_per_sa * t as f32);
    }
}
