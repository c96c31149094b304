//! Random-access burst (RACH) detector: a three-input streaming block
//! (`detect_core`) plus its companion FFT-based peak finder (`detect_fft`),
//! per spec §4.6. Neither is a `Consumer`/`Producer` in the sample-bus
//! sense — RACH reasons over three simultaneous input streams (raw signal,
//! reference power, correlator power) rather than a single channel's ring
//! buffer, so it is driven directly by the caller rather than scheduled.

pub mod detect_core;
pub mod detect_fft;

pub use detect_core::{RachBurst, RachDetector};
pub use detect_fft::{RachFftDetector, SpectralPeak};
