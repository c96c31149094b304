//! Frequency-correction burst (pure tone) acquisition.
//!
//! `fcch_rough` / `fcch_fine` / `fcch_rough_multi` mirror the call shapes
//! `actors::fcch` drives: coarse time-of-arrival from an energy scan,
//! refined TOA and frequency error from the phase ramp of a pure tone.

use crate::errors::{DemodError, Gmr1Error};
use crate::sample::Sample;

/// Number of symbols a reference FCCH burst occupies.
pub const FCCH_SYMS: usize = 142;

/// Candidate time-of-arrival with the strength it was found at, used by
/// `fcch_rough_multi` to rank survivors before fine acquisition.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub toa: usize,
    pub strength: f64,
}

/// Coarse TOA: the start of the strongest constant-energy run of length
/// `sps` symbols' worth of samples within `window`.
pub fn fcch_rough(window: &[Sample], sps: u32, _freq_bias: f64) -> Result<usize, Gmr1Error> {
    let span = (sps as usize * FCCH_SYMS).max(1);
    if window.len() < span {
        return Err(Gmr1Error::Demod(DemodError::FcchRoughFailed));
    }
    let energies = sliding_energy(window, span);
    energies
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .map(|(i, _)| i)
        .ok_or(Gmr1Error::Demod(DemodError::FcchRoughFailed))
}

/// Refine a coarse TOA: centroid of energy around the coarse estimate, plus
/// a frequency error estimate from the mean phase increment across the
/// tone (a pure tone has a constant phase increment equal to its offset
/// from baseband).
pub fn fcch_fine(
    window: &[Sample],
    len: usize,
    _freq_bias: f64,
) -> Result<(f64, f64), Gmr1Error> {
    if window.len() < len || len < 2 {
        return Err(Gmr1Error::Demod(DemodError::FcchFineFailed));
    }
    let burst = &window[..len];

    let mut weighted_pos = 0.0f64;
    let mut total_energy = 0.0f64;
    for (i, s) in burst.iter().enumerate() {
        let e = s.norm_sqr() as f64;
        weighted_pos += i as f64 * e;
        total_energy += e;
    }
    if total_energy <= 0.0 {
        return Err(Gmr1Error::Demod(DemodError::FcchFineFailed));
    }
    let toa = weighted_pos / total_energy;

    let mut phase_sum = 0.0f64;
    for pair in burst.windows(2) {
        let delta = pair[1] * pair[0].conj();
        phase_sum += (delta.im as f64).atan2(delta.re as f64);
    }
    let freq_err = phase_sum / (burst.len() - 1) as f64;

    Ok((toa, freq_err))
}

/// Multiple-candidate coarse acquisition: local maxima of the sliding
/// energy profile, strongest first, capped at `capacity`.
pub fn fcch_rough_multi(
    window: &[Sample],
    sps: u32,
    _freq_bias: f64,
    capacity: usize,
) -> Result<Vec<Candidate>, Gmr1Error> {
    let span = (sps as usize * FCCH_SYMS).max(1);
    if window.len() < span {
        return Err(Gmr1Error::Demod(DemodError::FcchRoughFailed));
    }
    let energies = sliding_energy(window, span);

    let mut peaks = Vec::new();
    for i in 1..energies.len().saturating_sub(1) {
        if energies[i] >= energies[i - 1] && energies[i] >= energies[i + 1] {
            peaks.push(Candidate {
                toa: i,
                strength: energies[i],
            });
        }
    }
    if peaks.is_empty() && !energies.is_empty() {
        let (i, &e) = energies
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();
        peaks.push(Candidate {
            toa: i,
            strength: e,
        });
    }
    peaks.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap());
    peaks.truncate(capacity);
    Ok(peaks)
}

fn sliding_energy(window: &[Sample], span: usize) -> Vec<f64> {
    if window.len() < span {
        return Vec::new();
    }
    let mut energies = Vec::with_capacity(window.len() - span + 1);
    let mut sum: f64 = window[..span].iter().map(|s| s.norm_sqr() as f64).sum();
    energies.push(sum);
    for i in 1..=(window.len() - span) {
        sum -= window[i - 1].norm_sqr() as f64;
        sum += window[i + span - 1].norm_sqr() as f64;
        energies.push(sum);
    }
    energies
}
