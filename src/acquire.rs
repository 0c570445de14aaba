//! Acquisition sequencer
//!
//! The [`Acquirer`] is the state machine that carries a receiver
//! from cold start to *camped*: ready for data demodulation. Each
//! call to [`search_step()`](Acquirer::search_step) consumes one
//! buffer of baseband samples and advances the machine:
//!
//! 1. **Searching**: run the [`SyncDetector`](crate::SyncDetector)
//!    until the sync waveform is found. The detected index, less
//!    the cyclic prefix length, becomes the timing offset.
//! 2. **Estimating**: run the [`CfoEstimator`](crate::CfoEstimator)
//!    once per frame until enough symbols have been averaged. This
//!    phase is skipped entirely when CFO correction is disabled.
//! 3. **Camped**: terminal. Every further call reports camped with
//!    the converged offsets.
//!
//! Absence of a match is an ordinary outcome, not an error; the
//! machine keeps searching on the next buffer. There is no internal
//! bound on search attempts.

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;

use num_complex::Complex;

use crate::cfo::{CfoEstimator, REQUIRED_AVERAGING_SYMBOLS};
use crate::detect::SyncDetector;
use crate::params::SystemParams;

/// Per-call acquisition report
///
/// A transient value describing the receiver after one
/// [`search_step()`](Acquirer::search_step). Callers typically
/// apply `freq_offset_hz` to the front-end local oscillator and
/// use `timing_offset` to align subsequent frame processing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Acquisition {
    /// Is the receiver camped and ready for demodulation?
    pub camped: bool,

    /// Timing offset, in samples
    ///
    /// The detected sync index referenced to the cyclic-prefixed
    /// frame boundary: the raw correlation index minus the cyclic
    /// prefix length. `None` until timing sync has been found. May
    /// be negative when the sync waveform begins less than one
    /// prefix into the buffer.
    pub timing_offset: Option<i64>,

    /// Carrier frequency offset estimate, in Hz
    ///
    /// Zero until frequency estimation begins; still converging
    /// until `camped` is reported.
    pub freq_offset_hz: f32,
}

/// Acquisition progress, for inspection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Searching for timing sync
    Searching,

    /// Timing sync found; averaging the frequency offset
    ///
    /// Payload is the number of frames left before camping.
    EstimatingCfo(u32),

    /// Camped: timing and frequency converged (terminal)
    Camped,
}

/// OFDM acquisition state machine
///
/// Owns all cross-call acquisition state for one receiver session.
/// Construct once at session setup and feed successive sample
/// buffers to [`search_step()`](Acquirer::search_step); the machine
/// never needs resetting unless the session restarts, for which
/// [`reset()`](Acquirer::reset) restores initial conditions.
///
/// Invocations mutate state in place and must be serialized by the
/// caller; the `&mut self` receiver enforces single ownership.
///
/// ```
/// use campon::{Acquirer, SystemParams};
/// use num_complex::Complex;
///
/// let mut acq = Acquirer::new(SystemParams::default());
///
/// // no sync waveform in this buffer: keep searching
/// let silence = vec![Complex::new(0.0f32, 0.0f32); 512];
/// let status = acq.search_step(&silence);
/// assert!(!status.camped);
/// assert_eq!(None, status.timing_offset);
/// ```
#[derive(Clone, Debug)]
pub struct Acquirer {
    params: SystemParams,
    detector: SyncDetector,
    estimator: CfoEstimator,
    state: AcquisitionState,

    // timing offset, latched at detection
    timing_offset: Option<i64>,

    // most recent frequency offset estimate
    freq_offset_hz: f32,

    // frames of averaging required after timing sync
    initial_countdown: u32,
}

impl Acquirer {
    /// Create an acquirer for one receiver session
    ///
    /// The convergence countdown is sized so that at least
    /// [`REQUIRED_AVERAGING_SYMBOLS`] symbols are averaged before
    /// camping, in whole frames.
    pub fn new(params: SystemParams) -> Self {
        // whole frames of averaging: ceil(required / symbols per frame)
        let symbols_per_frame = params.symbols_per_frame();
        let initial_countdown =
            (REQUIRED_AVERAGING_SYMBOLS + symbols_per_frame - 1) / symbols_per_frame;
        Self {
            detector: SyncDetector::new(&params),
            estimator: CfoEstimator::new(&params),
            state: AcquisitionState::Searching,
            timing_offset: None,
            freq_offset_hz: 0.0f32,
            initial_countdown,
            params,
        }
    }

    /// Process one buffer of samples
    ///
    /// The sole entry point: call repeatedly with successive sample
    /// buffers from the receiver loop. Dispatches to the sync
    /// detector or the frequency offset estimator depending on the
    /// current state and reports the receiver status. This is a
    /// total function of the buffer: any length, including empty,
    /// yields a well-formed [`Acquisition`].
    pub fn search_step(&mut self, samples: &[Complex<f32>]) -> Acquisition {
        match self.state {
            AcquisitionState::Searching => match self.detector.search(samples) {
                Some(index) => {
                    // the replica has no cyclic prefix; downstream
                    // offsets are referenced to the prefixed
                    // symbol boundary
                    let toff = index as i64 - self.params.cp_len() as i64;
                    self.timing_offset = Some(toff);
                    info!("acquire: sync found at sample {}, timing offset {}", index, toff);

                    if self.params.cfo_correction() {
                        self.state = AcquisitionState::EstimatingCfo(self.initial_countdown);
                        self.report(false)
                    } else {
                        info!("acquire: camped (frequency correction disabled)");
                        self.state = AcquisitionState::Camped;
                        self.report(true)
                    }
                }
                None => {
                    debug!("acquire: searching");
                    self.report(false)
                }
            },
            AcquisitionState::EstimatingCfo(frames_left) => {
                if frames_left > 0 {
                    self.freq_offset_hz = self.estimator.estimate(samples);
                    self.state = AcquisitionState::EstimatingCfo(frames_left - 1);
                    debug!(
                        "acquire: frequency offset {:.1} Hz, {} frames to camp",
                        self.freq_offset_hz,
                        frames_left - 1
                    );
                    self.report(false)
                } else {
                    info!("acquire: camped, frequency offset {:.1} Hz", self.freq_offset_hz);
                    self.state = AcquisitionState::Camped;
                    self.report(true)
                }
            }
            AcquisitionState::Camped => self.report(true),
        }
    }

    /// Acquire from a source of sample buffers
    ///
    /// Binds an iterator of sample blocks and yields one
    /// [`Acquisition`] per block. A convenience over calling
    /// [`search_step()`](Acquirer::search_step) in a loop.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter<'rx, I>(&'rx mut self, blocks: I) -> BlockIter<'rx, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<[Complex<f32>]>,
    {
        BlockIter {
            source: blocks.into_iter(),
            acquirer: self,
        }
    }

    /// Current acquisition progress
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// System parameters this acquirer was built with
    pub fn params(&self) -> &SystemParams {
        &self.params
    }

    /// Reset to initial conditions for a new session
    ///
    /// Drops timing sync, clears the frequency average, and
    /// restores the convergence countdown. Equivalent to
    /// constructing a fresh `Acquirer`.
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.state = AcquisitionState::Searching;
        self.timing_offset = None;
        self.freq_offset_hz = 0.0f32;
    }

    // Build the per-call report from latched state
    fn report(&self, camped: bool) -> Acquisition {
        Acquisition {
            camped,
            timing_offset: self.timing_offset,
            freq_offset_hz: self.freq_offset_hz,
        }
    }
}

/// Sample block iterator
///
/// Bound to a source of sample blocks by
/// [`Acquirer::iter()`]. Each `next()` feeds one block through the
/// state machine and returns its [`Acquisition`].
#[derive(Debug)]
pub struct BlockIter<'rx, I> {
    source: I,
    acquirer: &'rx mut Acquirer,
}

impl<'rx, I, B> Iterator for BlockIter<'rx, I>
where
    I: Iterator<Item = B>,
    B: AsRef<[Complex<f32>]>,
{
    type Item = Acquisition;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.source.next()?;
        Some(self.acquirer.search_step(block.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    use crate::waveform::{apply_cfo, cp_symbol_stream, embed_reference, test_noise};

    // FFT 64, CP 16, one 80-sample symbol, 72 symbols per frame
    fn scenario_params(cfo_correction: bool) -> SystemParams {
        SystemParams::new(64, 16, 15e3, 80, cfo_correction, 72).expect("valid params")
    }

    // one frame of cyclic-prefixed symbols with a known offset
    fn offset_frame(params: &SystemParams, freq_hz: f32) -> Vec<Complex<f32>> {
        let mut frame = cp_symbol_stream(params, params.symbols_per_frame() as usize);
        apply_cfo(&mut frame, freq_hz, params.sample_rate_hz());
        frame
    }

    #[test]
    fn test_sync_found_with_prefix_correction() {
        // detection at raw index 100 reports timing offset 84
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        let buffer = embed_reference(&params, 100, 256);
        let status = acq.search_step(&buffer);

        assert!(!status.camped);
        assert_eq!(Some(84), status.timing_offset);
        assert_eq!(AcquisitionState::EstimatingCfo(2), acq.state());
    }

    #[test]
    fn test_no_match_keeps_searching() {
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        for _i in 0..5 {
            let status = acq.search_step(&test_noise(256, 0.5f32, 99));
            assert!(!status.camped);
            assert_eq!(None, status.timing_offset);
            assert_eq!(0.0f32, status.freq_offset_hz);
            assert_eq!(AcquisitionState::Searching, acq.state());
        }
    }

    #[test]
    fn test_countdown_and_camping() {
        // 144 required symbols at 72 per frame: countdown starts at
        // 2; two estimation calls, then the third call camps
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        let sync = embed_reference(&params, 100, 256);
        assert!(!acq.search_step(&sync).camped);

        let frame = offset_frame(&params, 250.0);

        let first = acq.search_step(&frame);
        assert!(!first.camped);
        assert_eq!(AcquisitionState::EstimatingCfo(1), acq.state());

        let second = acq.search_step(&frame);
        assert!(!second.camped);
        assert_eq!(AcquisitionState::EstimatingCfo(0), acq.state());

        let third = acq.search_step(&frame);
        assert!(third.camped);
        assert_eq!(AcquisitionState::Camped, acq.state());
        assert_eq!(Some(84), third.timing_offset);
        assert_approx_eq!(250.0f32, third.freq_offset_hz, 2.0f32);
    }

    #[test]
    fn test_camped_is_terminal() {
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        acq.search_step(&embed_reference(&params, 10, 128));
        let frame = offset_frame(&params, 100.0);
        acq.search_step(&frame);
        acq.search_step(&frame);
        let camped = acq.search_step(&frame);
        assert!(camped.camped);

        // any input, including empty, reports the same answer
        for buffer in [&[][..], &frame[..], &test_noise(32, 1.0f32, 3)[..]] {
            let again = acq.search_step(buffer);
            assert_eq!(camped, again);
        }
    }

    #[test]
    fn test_cfo_disabled_camps_immediately() {
        let params = scenario_params(false);
        let mut acq = Acquirer::new(params);

        assert!(!acq.search_step(&test_noise(256, 0.5f32, 41)).camped);

        let status = acq.search_step(&embed_reference(&params, 100, 256));
        assert!(status.camped);
        assert_eq!(Some(84), status.timing_offset);
        assert_eq!(0.0f32, status.freq_offset_hz);
        assert_eq!(AcquisitionState::Camped, acq.state());
    }

    #[test]
    fn test_short_buffer_is_not_found() {
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        let status = acq.search_step(&test_noise(32, 0.5f32, 8));
        assert!(!status.camped);
        assert_eq!(None, status.timing_offset);
        assert_eq!(0.0f32, status.freq_offset_hz);
    }

    #[test]
    fn test_never_camped_before_sync() {
        // odd symbols-per-frame exercises the countdown rounding:
        // ceil(144 / 7) = 21 frames
        let params = SystemParams::new(64, 16, 15e3, 80, true, 7).expect("valid params");
        let mut acq = Acquirer::new(params);
        assert_eq!(21, acq.initial_countdown);

        for _i in 0..8 {
            assert!(!acq.search_step(&test_noise(200, 0.8f32, 77)).camped);
            assert_eq!(AcquisitionState::Searching, acq.state());
        }
    }

    #[test]
    fn test_iter_binding() {
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        let frame = offset_frame(&params, 150.0);
        let blocks = vec![
            embed_reference(&params, 100, 256),
            frame.clone(),
            frame.clone(),
            frame,
        ];

        let camped: Vec<bool> = acq.iter(&blocks).map(|st| st.camped).collect();
        assert_eq!(vec![false, false, false, true], camped);
    }

    #[test]
    fn test_reset_restores_initial_conditions() {
        let params = scenario_params(true);
        let mut acq = Acquirer::new(params);

        acq.search_step(&embed_reference(&params, 100, 256));
        let frame = offset_frame(&params, 100.0);
        acq.search_step(&frame);
        acq.search_step(&frame);
        assert!(acq.search_step(&frame).camped);

        acq.reset();
        assert_eq!(AcquisitionState::Searching, acq.state());
        let status = acq.search_step(&test_noise(256, 0.5f32, 12));
        assert!(!status.camped);
        assert_eq!(None, status.timing_offset);
        assert_eq!(0.0f32, status.freq_offset_hz);
    }
}
