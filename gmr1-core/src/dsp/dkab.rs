//! DKAB (idle-slot keepalive burst) demodulation.

use crate::descriptors::DKAB;
use crate::errors::{DemodError, Gmr1Error};
use crate::sample::Sample;

/// Result of demodulating one DKAB burst: the 8 soft bits plus a `weak`
/// flag raised when the burst's energy is too low to trust the decision
/// (mirrors the original's `rv == 1` "weak" return).
#[derive(Debug, Clone)]
pub struct DkabResult {
    pub soft_bits: [i8; 8],
    pub weak: bool,
}

/// Demodulate an 8-soft-bit DKAB burst.
pub fn dkab_demod(window: &[Sample], sps: u32) -> Result<DkabResult, Gmr1Error> {
    let len = DKAB.len_samples(sps);
    if window.len() < len {
        return Err(Gmr1Error::Demod(DemodError::WindowOutOfRange {
            begin: 0,
            len,
            data_len: window.len(),
        }));
    }
    let burst = &window[..len];
    let sps = sps.max(1) as usize;

    let mut soft_bits = [0i8; 8];
    let mut total_mag = 0.0f64;
    for (i, slot) in burst.chunks(sps).take(8).enumerate() {
        let avg: Sample = slot.iter().fold(Sample::new(0.0, 0.0), |a, b| a + b)
            / slot.len().max(1) as f32;
        total_mag += avg.norm() as f64;
        let confidence = (avg.norm() as f64 * 64.0).clamp(1.0, 127.0) as i8;
        soft_bits[i] = if avg.re >= 0.0 { confidence } else { -confidence };
    }

    let mean_mag = total_mag / 8.0;
    let weak = mean_mag < 0.1;

    Ok(DkabResult { soft_bits, weak })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn strong_burst_is_not_weak() {
        let sps = 4u32;
        let window = vec![Complex32::new(1.0, 0.0); DKAB.len_samples(sps)];
        let result = dkab_demod(&window, sps).unwrap();
        assert!(!result.weak);
    }

    #[test]
    fn near_zero_burst_is_weak() {
        let sps = 4u32;
        let window = vec![Complex32::new(0.001, 0.0); DKAB.len_samples(sps)];
        let result = dkab_demod(&window, sps).unwrap();
        assert!(result.weak);
    }
}
