//! DSP leaf collaborators.
//!
//! Every function here has a specified call shape the actor layer depends
//! on; the bit-exact GMR-1 demodulation algorithms are out of scope (spec
//! §1) but the shape and the shared helpers (burst energy, dB conversion)
//! are implemented in full so the actor layer has something real to call.

pub mod cipher;
pub mod dkab;
pub mod fcch;
pub mod interleaver;
pub mod l2_codec;
pub mod pi4cxpsk;

use crate::sample::Sample;

/// Sum of squared magnitude over a burst, excluding the outer 1/32 of the
/// burst on each side (guards against ramp-up/down energy skewing the
/// estimate, mirroring the reference receiver's `burst_energy`).
pub fn burst_energy(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let exclude = samples.len() / 32;
    let start = exclude;
    let end = samples.len().saturating_sub(exclude).max(start);
    samples[start..end]
        .iter()
        .map(|s| (s.norm_sqr()) as f64)
        .sum()
}

/// Convert a normalized frequency in radians/sample to Hz at the given
/// sample rate.
pub fn to_hz(radians_per_sample: f64, sample_rate: f64) -> f64 {
    radians_per_sample * sample_rate / (2.0 * std::f64::consts::PI)
}

/// Convert a linear power ratio to decibels.
pub fn to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        10.0 * linear.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn burst_energy_excludes_edges() {
        let mut samples = vec![Complex32::new(0.0, 0.0); 320];
        // Put a spike only in the excluded leading region.
        samples[0] = Complex32::new(100.0, 0.0);
        let e = burst_energy(&samples);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn burst_energy_counts_interior() {
        let mut samples = vec![Complex32::new(0.0, 0.0); 320];
        samples[160] = Complex32::new(2.0, 0.0);
        let e = burst_energy(&samples);
        assert!((e - 4.0).abs() < 1e-9);
    }

    #[test]
    fn db_conversion_roundtrip() {
        assert!((to_db(1.0)).abs() < 1e-9);
        assert!((to_db(10.0) - 10.0).abs() < 1e-9);
    }
}
