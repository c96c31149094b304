//! RACH FFT: companion spectral peak finder. Accumulates a sliding
//! 512-point FFT over the raw stream with 50% overlap, applies a
//! Blackman-Harris window, and reports bins whose magnitude-squared
//! exceeds a moving-average threshold (spec §4.6, "Companion FFT block").

use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::sample::Sample;

const FFT_SIZE: usize = 512;
const HOP: usize = FFT_SIZE / 2;
const PEAK_HALF_WINDOW: usize = 15;
const PEAK_THRESHOLD: f64 = 8.5;

/// One spectral peak observed in a single FFT frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    /// Absolute sample position the FFT frame started at.
    pub position: u64,
    /// Bin index (0..FFT_SIZE) the peak was found at.
    pub bin: usize,
    /// Magnitude-squared value at that bin.
    pub magnitude: f64,
}

fn blackman_harris_window(n: usize) -> Vec<f32> {
    const A0: f64 = 0.35875;
    const A1: f64 = 0.48829;
    const A2: f64 = 0.14128;
    const A3: f64 = 0.01168;
    (0..n)
        .map(|i| {
            let x = 2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64;
            (A0 - A1 * x.cos() + A2 * (2.0 * x).cos() - A3 * (3.0 * x).cos()) as f32
        })
        .collect()
}

/// Sliding FFT + moving-average peak detector, driven directly by the
/// caller (not a `Consumer` — see `rach::mod` doc comment).
pub struct RachFftDetector {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    carry: Vec<Sample>,
    carry_start: u64,
    have_start: bool,
}

impl RachFftDetector {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(FFT_SIZE),
            window: blackman_harris_window(FFT_SIZE),
            carry: Vec::new(),
            carry_start: 0,
            have_start: false,
        }
    }

    /// Feed a contiguous chunk of raw samples starting at absolute
    /// position `base_pos`. Returns every spectral peak found in any FFT
    /// frame completed during this call.
    pub fn process(&mut self, samples: &[Sample], base_pos: u64) -> Vec<SpectralPeak> {
        if !self.have_start {
            self.carry_start = base_pos;
            self.have_start = true;
        }
        self.carry.extend_from_slice(samples);

        let mut peaks = Vec::new();
        while self.carry.len() >= FFT_SIZE {
            let mut frame: Vec<Complex32> = self.carry[..FFT_SIZE]
                .iter()
                .zip(self.window.iter())
                .map(|(s, w)| *s * *w)
                .collect();
            self.fft.process(&mut frame);

            let spectrum: Vec<f64> = frame.iter().map(|c| c.norm_sqr() as f64).collect();
            peaks.extend(find_peaks(&spectrum, self.carry_start));

            self.carry.drain(..HOP);
            self.carry_start += HOP as u64;
        }
        peaks
    }
}

impl Default for RachFftDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn find_peaks(spectrum: &[f64], position: u64) -> Vec<SpectralPeak> {
    let n = spectrum.len();
    let mut peaks = Vec::new();
    for bin in 0..n {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for d in 1..=PEAK_HALF_WINDOW {
            sum += spectrum[(bin + n - d) % n];
            sum += spectrum[(bin + d) % n];
            count += 2;
        }
        let avg = sum / count as f64;
        if avg > 0.0 && spectrum[bin] > PEAK_THRESHOLD * avg {
            peaks.push(SpectralPeak {
                position,
                bin,
                magnitude: spectrum[bin],
            });
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_symmetric_and_unity_peak() {
        let w = blackman_harris_window(FFT_SIZE);
        assert_eq!(w.len(), FFT_SIZE);
        assert!((w[0] - w[FFT_SIZE - 1]).abs() < 1e-5);
        let mid = w[FFT_SIZE / 2];
        assert!(mid > w[0]);
    }

    #[test]
    fn tone_produces_a_single_dominant_bin() {
        let mut det = RachFftDetector::new();
        let bin = 40usize;
        let samples: Vec<Sample> = (0..FFT_SIZE)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * i as f32 / FFT_SIZE as f32;
                Complex32::new(phase.cos(), phase.sin())
            })
            .collect();

        let peaks = det.process(&samples, 0);
        assert!(!peaks.is_empty());
        assert!(peaks.iter().any(|p| (p.bin as i64 - bin as i64).abs() <= 1));
    }

    #[test]
    fn silence_yields_no_peaks() {
        let mut det = RachFftDetector::new();
        let samples = vec![Complex32::new(0.0, 0.0); FFT_SIZE * 2];
        let peaks = det.process(&samples, 0);
        assert!(peaks.is_empty());
    }
}
