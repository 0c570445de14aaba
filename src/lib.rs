//! # campon: OFDM acquisition and camping
//!
//! This crate carries an OFDM receiver from cold start to *camped*:
//! timing- and frequency-synchronized and ready for data
//! demodulation. It detects a known synchronization waveform in a
//! streamed time-domain signal, estimates the timing offset from its
//! position, then estimates and averages the carrier frequency
//! offset (CFO) over a bounded number of frames before declaring the
//! receiver camped.
//!
//! ## Example
//!
//! You will first need complex baseband samples from a quadrature
//! front-end, such as a software-defined radio, at the sampling rate
//! implied by your numerology
//! ([`sample_rate_hz()`](SystemParams::sample_rate_hz)). Obtaining
//! the samples is beyond the scope of this crate.
//!
//! ```
//! use campon::{Acquirer, SystemParams};
//! use num_complex::Complex;
//!
//! # let next_sample_block = || vec![Complex::new(0.0f32, 0.0f32); 512];
//! #
//! // numerology is fixed for the receiver session
//! let params = SystemParams::default();
//! let mut acquirer = Acquirer::new(params);
//!
//! // feed one buffer of samples per call until camped
//! loop {
//!     let block: Vec<Complex<f32>> = next_sample_block();
//!     let status = acquirer.search_step(&block);
//!     if let Some(toff) = status.timing_offset {
//!         // align frame processing to the sync position
//!         let _ = toff;
//!     }
//!     if status.camped {
//!         // apply status.freq_offset_hz to the local oscillator
//!         // and begin demodulation
//!         break;
//!     }
//! #   break;
//! }
//! ```
//!
//! The [`Acquirer`] owns all acquisition state for one receiver
//! session. Calls are synchronous and never block; absence of a
//! detection is an ordinary per-call outcome, so the only error the
//! crate reports is an invalid [`SystemParams`] combination at
//! construction time.
//!
//! ## Background
//!
//! The synchronization waveform is one OFDM symbol: a Zadoff–Chu
//! sequence on the 62 center subcarriers with guard and DC nulls,
//! transmitted without a cyclic prefix. The [`SyncDetector`] finds
//! it by normalized cross-correlation; the [`CfoEstimator`] then
//! measures the carrier offset from the cyclic prefix structure of
//! the following symbols. Once at least
//! [`REQUIRED_AVERAGING_SYMBOLS`] symbols have been averaged, in
//! whole frames, the receiver camps.
//!
//! Progress is reported through the [`log`](https://crates.io/crates/log)
//! facade; route it to any logger or ignore it.

mod acquire;
mod cfo;
mod detect;
mod params;
mod waveform;

pub use acquire::{Acquirer, Acquisition, AcquisitionState, BlockIter};
pub use cfo::{CfoEstimator, REQUIRED_AVERAGING_SYMBOLS};
pub use detect::{SyncDetector, SYNC_THRESHOLD};
pub use params::{ParamsError, SystemParams};
pub use waveform::{
    reference_waveform, sync_sequence, MIN_FFT_LEN, NUM_SYNC_SUBCARRIERS, SYNC_SEQUENCE_ROOT,
};
