//! FCCH acquisition actor: detects the frequency-correction burst (a pure
//! tone), acquires coarse time and frequency, then spawns one BCCH actor
//! per validated candidate burst window.

use crate::actor::{ActorKind, Consumer, Spawner, TERMINATE, WorkResult};
use crate::actors::bcch::{BcchActor, BcchParams};
use crate::config::{ChannelMap, SystemConfig};
use crate::dsp::burst_energy;
use crate::dsp::fcch::{fcch_fine, fcch_rough, fcch_rough_multi, FCCH_SYMS};
use crate::logging::SignalLogger;
use crate::sample::{Sample, SampleIndex};
use crate::tap::TapSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Single,
    Multi,
}

/// Parameters an FCCH actor is spawned with.
#[derive(Clone)]
pub struct FcchParams {
    pub sps: u32,
    pub arfcn: u32,
    pub channel: usize,
    pub tap: TapSink,
    pub channel_map: ChannelMap,
    /// Overridable for tests; defaults to `SystemConfig::SYM_RATE`.
    pub sym_rate: u32,
}

impl FcchParams {
    pub fn new(sps: u32, arfcn: u32, channel: usize, tap: TapSink, channel_map: ChannelMap) -> Self {
        Self {
            sps,
            arfcn,
            channel,
            tap,
            channel_map,
            sym_rate: SystemConfig::SYM_RATE,
        }
    }
}

pub struct FcchActor {
    params: FcchParams,
    state: State,
    discard_remaining: usize,
    freq_err: f64,
    /// Running count of samples this actor has been advanced past; used to
    /// compute the absolute alignment index handed to spawned children.
    time: u64,
    log: SignalLogger,
}

impl FcchActor {
    pub fn new(params: FcchParams) -> Self {
        Self {
            discard_remaining: SystemConfig::START_DISCARD,
            state: State::Single,
            freq_err: 0.0,
            time: 0,
            log: SignalLogger::default(),
            params,
        }
    }

    fn window_for_duration(&self, seconds: f64) -> usize {
        ((seconds * self.params.sym_rate as f64) as usize) * self.params.sps as usize
    }

    fn work_single(&mut self, window: &[Sample]) -> WorkResult {
        let needed = self.window_for_duration(0.330);
        if window.len() < needed {
            return 0;
        }
        let scan = &window[..needed];
        let rough = match fcch_rough(scan, self.params.sps, 0.0) {
            Ok(r) => r,
            Err(_) => return 0,
        };

        let fine_len = FCCH_SYMS * self.params.sps as usize;
        if scan.len() < rough + fine_len {
            return 0;
        }
        let (_toa, freq_err) = match fcch_fine(&scan[rough..], fine_len, 0.0) {
            Ok(v) => v,
            Err(_) => return 0,
        };

        self.freq_err = freq_err;
        self.state = State::Multi;

        let discard = rough.saturating_sub(fine_len).max(0);
        discard.max(1) as WorkResult
    }

    fn work_multi(&mut self, window: &[Sample], spawner: &mut Spawner) -> WorkResult {
        let needed = self.window_for_duration(0.650);
        if window.len() < needed {
            return 0;
        }
        let scan = &window[..needed];
        let candidates = match fcch_rough_multi(scan, self.params.sps, -self.freq_err, 16) {
            Ok(c) => c,
            Err(_) => return TERMINATE,
        };
        if candidates.is_empty() {
            self.log.info("FCCH", "no candidates found, terminating");
            return TERMINATE;
        }

        let fine_len = FCCH_SYMS * self.params.sps as usize;
        let fcch_region_len = ((117usize.saturating_sub(10)) * self.params.sps as usize).max(1);
        let sps = self.params.sps as usize;

        let measure = |toa: usize| -> Option<(f64, f64, f64)> {
            if scan.len() < toa + fine_len {
                return None;
            }
            let (toa_fine, freq_err) = fcch_fine(&scan[toa..], fine_len, 0.0).ok()?;
            let fcch_start = toa + 5 * sps;
            let cich_start = toa + (5 + 117) * sps;
            if scan.len() < cich_start + fcch_region_len {
                return None;
            }
            let fcch_energy = burst_energy(&scan[fcch_start..fcch_start + fcch_region_len]);
            let cich_energy = burst_energy(&scan[cich_start..cich_start + fcch_region_len]);
            let snr = fcch_energy / cich_energy.max(1e-9);
            Some((toa_fine, freq_err, snr))
        };

        let (_ref_toa_fine, ref_freq_err, ref_snr) = match measure(candidates[0].toa) {
            Some(v) => v,
            None => return TERMINATE,
        };

        // The reference candidate (strongest FCCH peak) is always spawned;
        // the SNR/delta-freq gates below only prune the weaker runners-up.
        let mut spawned = 0usize;
        let ref_align = self.time + candidates[0].toa as u64;
        let ref_bcch_params = BcchParams {
            sps: self.params.sps,
            arfcn: self.params.arfcn,
            channel: self.params.channel,
            tap: self.params.tap.clone(),
            channel_map: self.params.channel_map.clone(),
            align: ref_align,
            freq_err: ref_freq_err,
        };
        spawner.spawn(self.params.channel, Box::new(BcchActor::new(ref_bcch_params)));
        spawned += 1;

        for candidate in candidates.iter().skip(1) {
            let Some((_toa_fine, freq_err, snr)) = measure(candidate.toa) else {
                continue;
            };
            if snr < 2.0 || snr < ref_snr / 6.0 {
                continue;
            }
            let delta_hz = crate::dsp::to_hz(ref_freq_err - freq_err, self.params.sym_rate as f64 * sps as f64);
            if delta_hz.abs() > 500.0 {
                continue;
            }

            let align = self.time + candidate.toa as u64;
            let bcch_params = BcchParams {
                sps: self.params.sps,
                arfcn: self.params.arfcn,
                channel: self.params.channel,
                tap: self.params.tap.clone(),
                channel_map: self.params.channel_map.clone(),
                align,
                freq_err,
            };
            spawner.spawn(self.params.channel, Box::new(BcchActor::new(bcch_params)));
            spawned += 1;
        }

        self.log
            .info("FCCH", format!("spawned {} BCCH candidate(s)", spawned));
        TERMINATE
    }
}

impl Consumer for FcchActor {
    fn kind(&self) -> ActorKind {
        ActorKind::Fcch
    }

    fn work(&mut self, window: &[Sample], cursor: SampleIndex, spawner: &mut Spawner) -> WorkResult {
        self.time = cursor;

        if self.discard_remaining > 0 {
            let n = self.discard_remaining.min(window.len());
            self.discard_remaining -= n;
            return n.max(if window.is_empty() { 0 } else { 1 }) as WorkResult;
        }

        match self.state {
            State::Single => self.work_single(window),
            State::Multi => self.work_multi(window, spawner),
        }
    }
}
