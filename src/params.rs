//! System parameters for the OFDM downlink
//!
//! [`SystemParams`] collects the numerology the acquisition chain
//! needs: FFT length, cyclic prefix length, subcarrier spacing, and
//! the framing constants. The struct is read-only once built; the
//! constructor validates the combination and rejects anything the
//! sync waveform cannot fit into.

use thiserror::Error;

use crate::waveform::MIN_FFT_LEN;

/// OFDM numerology, fixed for the receiver session
///
/// Create with [`SystemParams::new()`] or use the
/// [`Default`](#impl-Default-for-SystemParams) profile, which is a
/// narrowband LTE-like configuration (128-point FFT, 32-sample
/// cyclic prefix, 15 kHz subcarrier spacing, 72 symbols per frame).
///
/// ```
/// use campon::SystemParams;
///
/// let params = SystemParams::default();
/// assert_eq!(params.fft_len(), 128);
/// assert_eq!(params.sample_rate_hz(), 128.0 * 15000.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemParams {
    // FFT length, in samples
    fft_len: usize,

    // cyclic prefix length, in samples
    cp_len: usize,

    // subcarrier spacing, in Hz
    subcarrier_spacing_hz: f32,

    // total samples per cyclic-prefixed symbol
    samples_per_symbol: usize,

    // perform carrier frequency offset estimation before camping?
    cfo_correction: bool,

    // OFDM symbols per radio frame
    symbols_per_frame: u32,
}

impl SystemParams {
    /// Create and validate system parameters
    ///
    /// `fft_len` must leave room for the 62 sync subcarriers; see
    /// [`ParamsError`] for the full list of rejected combinations.
    /// `samples_per_symbol` is the length of one cyclic-prefixed
    /// symbol and must be at least `fft_len + cp_len`.
    ///
    /// Set `cfo_correction` to `false` to camp immediately after
    /// timing sync, skipping frequency offset estimation entirely.
    pub fn new(
        fft_len: usize,
        cp_len: usize,
        subcarrier_spacing_hz: f32,
        samples_per_symbol: usize,
        cfo_correction: bool,
        symbols_per_frame: u32,
    ) -> Result<Self, ParamsError> {
        if fft_len < MIN_FFT_LEN {
            return Err(ParamsError::FftTooShort(fft_len));
        }
        if samples_per_symbol < fft_len + cp_len {
            return Err(ParamsError::SymbolTooShort {
                samples_per_symbol,
                required: fft_len + cp_len,
            });
        }
        if symbols_per_frame == 0 {
            return Err(ParamsError::EmptyFrame);
        }
        if !(subcarrier_spacing_hz > 0.0f32) {
            return Err(ParamsError::BadSubcarrierSpacing(subcarrier_spacing_hz));
        }

        Ok(Self {
            fft_len,
            cp_len,
            subcarrier_spacing_hz,
            samples_per_symbol,
            cfo_correction,
            symbols_per_frame,
        })
    }

    /// FFT length, in samples
    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Cyclic prefix length, in samples
    pub fn cp_len(&self) -> usize {
        self.cp_len
    }

    /// Subcarrier spacing, in Hz
    pub fn subcarrier_spacing_hz(&self) -> f32 {
        self.subcarrier_spacing_hz
    }

    /// Length of one cyclic-prefixed OFDM symbol, in samples
    pub fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    /// Is carrier frequency offset estimation enabled?
    pub fn cfo_correction(&self) -> bool {
        self.cfo_correction
    }

    /// OFDM symbols per radio frame
    pub fn symbols_per_frame(&self) -> u32 {
        self.symbols_per_frame
    }

    /// Baseband sampling rate, in Hz
    ///
    /// The sampling rate follows from the numerology: one FFT
    /// interval spans exactly `1 / subcarrier_spacing` seconds.
    pub fn sample_rate_hz(&self) -> f32 {
        self.fft_len as f32 * self.subcarrier_spacing_hz
    }
}

impl Default for SystemParams {
    fn default() -> Self {
        Self {
            fft_len: 128,
            cp_len: 32,
            subcarrier_spacing_hz: 15_000.0f32,
            samples_per_symbol: 160,
            cfo_correction: true,
            symbols_per_frame: 72,
        }
    }
}

/// Invalid [`SystemParams`] combination
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParamsError {
    /// The FFT is too short to carry the sync subcarriers
    ///
    /// The sync waveform occupies
    /// [`NUM_SYNC_SUBCARRIERS`](crate::NUM_SYNC_SUBCARRIERS) bins
    /// plus a DC null and at least one guard bin.
    #[error("FFT length {0} cannot carry the sync waveform (expected >= {min})", min = MIN_FFT_LEN)]
    FftTooShort(usize),

    /// Symbol length is shorter than FFT plus cyclic prefix
    #[error("samples per symbol {samples_per_symbol} below FFT + cyclic prefix ({required})")]
    SymbolTooShort {
        samples_per_symbol: usize,
        required: usize,
    },

    /// A frame must contain at least one symbol
    #[error("symbols per frame must be nonzero")]
    EmptyFrame,

    /// Subcarrier spacing must be a positive frequency
    #[error("subcarrier spacing {0} Hz is not positive")]
    BadSubcarrierSpacing(f32),
}
