//! RACH core: a three-input (raw / reference-power / correlator-power)
//! streaming burst detector with a sliding scan window and
//! improve-and-reset locking behaviour (spec §4.6).

use crate::sample::Sample;

/// Trigger ratio: matched-filter output must exceed current reference
/// power by this factor to begin or extend a detection.
const TRIGGER_RATIO: f64 = 1.5;

/// One emitted burst capture.
#[derive(Debug, Clone)]
pub struct RachBurst {
    /// Absolute sample position the capture was taken at.
    pub pos: u64,
    /// Captured samples, `burst_length` long.
    pub data: Vec<Sample>,
    /// Item tag value attached alongside the capture (`burst_length`,
    /// carried so downstream consumers don't need to recompute it).
    pub length_tag: usize,
}

#[derive(Debug, Clone, Copy)]
struct Lock {
    cnt: usize,
    max_corr: f64,
    max_pos: u64,
    /// Index into the current work slice the maximum was observed at;
    /// `None` once the slice that produced it has been fully processed
    /// (the max then only lives on in `saved_burst`).
    max_i: Option<usize>,
}

/// Streaming RACH burst detector. Owns no knowledge of ring buffers or the
/// sample bus: callers feed it aligned slices of raw signal, reference
/// power and correlator power and collect emitted `RachBurst`s.
pub struct RachDetector {
    burst_offset: i64,
    burst_length: usize,
    scan_window: usize,
    lock: Option<Lock>,
    /// Burst buffer saved across invocations when a lock survives past the
    /// end of one work slice without flushing.
    saved_burst: Vec<Sample>,
}

impl RachDetector {
    pub fn new(burst_offset: i64, burst_length: usize, scan_window: usize) -> Self {
        Self {
            burst_offset,
            burst_length,
            scan_window,
            lock: None,
            saved_burst: Vec::new(),
        }
    }

    /// Minimum lookback, in samples, the caller must keep available before
    /// index 0 of every input (spec §4.6, "Required history").
    pub fn required_history(&self) -> usize {
        1 + self.burst_length + self.burst_offset.max(0) as usize
    }

    fn extract_burst(&self, raw: &[Sample], mi: usize) -> Option<Vec<Sample>> {
        let start = mi as i64 + self.burst_offset;
        if start < 0 {
            return None;
        }
        let start = start as usize;
        if start + self.burst_length > raw.len() {
            return None;
        }
        Some(raw[start..start + self.burst_length].to_vec())
    }

    /// Feed one aligned slice of raw samples, reference power and
    /// correlator power (all the same length), starting at absolute
    /// position `base_pos`. Returns every burst that flushed during this
    /// call, in order.
    pub fn process(&mut self, raw: &[Sample], pwr: &[f64], corr: &[f64], base_pos: u64) -> Vec<RachBurst> {
        debug_assert_eq!(raw.len(), pwr.len());
        debug_assert_eq!(raw.len(), corr.len());

        let mut emitted = Vec::new();

        for i in 0..raw.len() {
            let pos = base_pos + i as u64;
            let triggers = corr[i] > TRIGGER_RATIO * pwr[i];

            match &mut self.lock {
                None => {
                    if triggers {
                        self.lock = Some(Lock {
                            cnt: self.scan_window,
                            max_corr: corr[i],
                            max_pos: pos,
                            max_i: Some(i),
                        });
                    }
                }
                Some(lock) => {
                    if triggers && corr[i] > lock.max_corr {
                        lock.max_corr = corr[i];
                        lock.max_pos = pos;
                        lock.max_i = Some(i);
                        lock.cnt = self.scan_window;
                    } else {
                        lock.cnt = lock.cnt.saturating_sub(1);
                    }

                    if lock.cnt == 0 {
                        let lock = self.lock.take().unwrap();
                        let data = match lock.max_i.and_then(|mi| self.extract_burst(raw, mi)) {
                            Some(data) => data,
                            None => std::mem::take(&mut self.saved_burst),
                        };
                        if data.len() == self.burst_length {
                            emitted.push(RachBurst {
                                pos: lock.max_pos,
                                data,
                                length_tag: self.burst_length,
                            });
                        }
                    }
                }
            }
        }

        if let Some(lock) = &self.lock {
            if let Some(mi) = lock.max_i {
                if let Some(data) = self.extract_burst(raw, mi) {
                    self.saved_burst = data;
                }
            }
        }

        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    fn sample(v: f32) -> Sample {
        Complex32::new(v, 0.0)
    }

    #[test]
    fn idle_stays_idle_below_trigger_ratio() {
        let mut det = RachDetector::new(0, 4, 3);
        let raw = vec![sample(1.0); 10];
        let pwr = vec![1.0; 10];
        let corr = vec![1.0; 10]; // 1.0 <= 1.5 * 1.0, never triggers
        let bursts = det.process(&raw, &pwr, &corr, 0);
        assert!(bursts.is_empty());
    }

    #[test]
    fn locks_and_emits_after_scan_window_elapses() {
        let mut det = RachDetector::new(0, 4, 2);
        let raw: Vec<Sample> = (0..10).map(|i| sample(i as f32)).collect();
        let pwr = vec![1.0; 10];
        let mut corr = vec![1.0; 10];
        corr[3] = 10.0; // single strong peak at i=3

        let bursts = det.process(&raw, &pwr, &corr, 0);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].pos, 3);
        assert_eq!(bursts[0].data.len(), 4);
        assert_eq!(bursts[0].length_tag, 4);
    }

    #[test]
    fn sliding_reset_tracks_a_later_larger_peak() {
        let mut det = RachDetector::new(0, 2, 3);
        let raw: Vec<Sample> = (0..12).map(|i| sample(i as f32)).collect();
        let pwr = vec![1.0; 12];
        let mut corr = vec![1.0; 12];
        corr[1] = 5.0;
        corr[3] = 9.0; // improves within the scan window, resets cnt

        let bursts = det.process(&raw, &pwr, &corr, 0);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].pos, 3);
    }

    #[test]
    fn unflushed_lock_saves_burst_for_next_call() {
        let mut det = RachDetector::new(0, 2, 5);
        let raw: Vec<Sample> = (0..4).map(|i| sample(i as f32)).collect();
        let pwr = vec![1.0; 4];
        let mut corr = vec![1.0; 4];
        corr[0] = 10.0;

        let bursts = det.process(&raw, &pwr, &corr, 0);
        assert!(bursts.is_empty());
        assert_eq!(det.saved_burst.len(), 2);
    }
}
