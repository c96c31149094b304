//! TCH3 traffic actor: quarter-rate traffic channel carrying DKAB keepalive
//! bursts, FACCH3 signalling (reassembled from four quarter-bursts), and
//! speech-3 payload, per spec §4.4.

use crate::actor::{ActorKind, Consumer, Spawner, TERMINATE, WorkResult};
use crate::actors::tch9::{Tch9Actor, Tch9Params};
use crate::config::{drain_align_err, ChannelMap, SystemConfig};
use crate::descriptors::{frame_len_samples, BurstType, DKAB, FACCH_3, SPEECH_3};
use crate::dsp::burst_energy;
use crate::dsp::cipher::{A5LikeStream, CipherStream};
use crate::dsp::dkab::dkab_demod;
use crate::dsp::l2_codec;
use crate::dsp::pi4cxpsk::{pi4cxpsk_demod, pi4cxpsk_detect};
use crate::logging::SignalLogger;
use crate::sample::{Sample, SampleIndex};
use crate::tap::{ChannelType, TapSink};

/// Parameters a TCH3 actor is spawned with.
#[derive(Clone)]
pub struct Tch3Params {
    pub sps: u32,
    pub arfcn: u32,
    pub tn: u8,
    pub channel: usize,
    pub tap: TapSink,
    pub channel_map: ChannelMap,
    pub align: u64,
    pub freq_err: f64,
    pub ref_energy: f64,
}

/// Accumulated state for one in-progress FACCH3 message (four quarter
/// bursts keyed by `fn & 3`). `sync_id` is the demodulated training-field
/// discriminator the real message boundary is tracked by (it alternates
/// between successive FACCH3 messages); each slot keeps its own absolute
/// frame number for per-burst ciphering.
struct FacchGroup {
    sync_id: u8,
    slots: [Option<(u32, Vec<i8>)>; 4],
}

impl FacchGroup {
    fn new(sync_id: u8) -> Self {
        Self {
            sync_id,
            slots: [None, None, None, None],
        }
    }

    fn complete(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }
}

pub struct Tch3Actor {
    params: Tch3Params,
    aligned: bool,
    align: u64,
    align_err: i64,
    freq_err: f64,
    frame_no: u32,
    energy_dkab: f64,
    energy_burst: f64,
    weak_cnt: u32,
    group: Option<FacchGroup>,
    followed: bool,
    cipher: A5LikeStream,
    log: SignalLogger,
}

impl Tch3Actor {
    pub fn new(params: Tch3Params) -> Self {
        Self {
            align: params.align,
            freq_err: params.freq_err,
            energy_burst: params.ref_energy,
            align_err: 0,
            aligned: false,
            frame_no: 0,
            energy_dkab: 0.0,
            weak_cnt: 0,
            group: None,
            followed: false,
            cipher: A5LikeStream,
            log: SignalLogger::default(),
            params,
        }
    }

    fn margin_samples(&self) -> u64 {
        SystemConfig::TCH3_MARGIN as u64 * self.params.sps as u64
    }

    fn slot_offset_samples(&self) -> u64 {
        self.params.sps as u64 * self.params.tn as u64 * 39
    }

    /// Decrypt soft bits by flipping the hard-decision sign wherever the
    /// matching keystream bit is 1, keeping the confidence magnitude.
    fn decrypt_soft_bits(soft_bits: &[i8], keystream: &[u8]) -> Vec<i8> {
        soft_bits
            .iter()
            .enumerate()
            .map(|(i, &bit)| {
                let byte = keystream.get(i / 8).copied().unwrap_or(0);
                let ks_bit = (byte >> (7 - (i % 8))) & 1;
                if ks_bit == 1 {
                    -bit
                } else {
                    bit
                }
            })
            .collect()
    }

    fn pack_hard_bits(soft_bits: &[i8]) -> Vec<u8> {
        soft_bits
            .chunks(8)
            .map(|chunk| {
                chunk.iter().enumerate().fold(0u8, |acc, (i, &b)| {
                    acc | (((b >= 0) as u8) << (7 - i))
                })
            })
            .collect()
    }

    /// Flush a completed FACCH3 group: decrypt each quarter-burst against
    /// its own frame-numbered cipher stream, concatenate, and CRC-decode.
    fn facch3_decode(&mut self, group: &FacchGroup) -> Option<Vec<u8>> {
        if !group.complete() {
            return None;
        }
        let mut decrypted = Vec::new();
        for slot in group.slots.iter() {
            let (fn_no, soft) = slot.as_ref().expect("checked complete() above");
            let keystream = self
                .cipher
                .generate(0, &SystemConfig::DEFAULT_KEY, *fn_no, soft.len());
            decrypted.extend(Self::decrypt_soft_bits(soft, &keystream));
        }
        let available_bytes = decrypted.len() / 8;
        if available_bytes < 3 {
            return None;
        }
        let payload_bytes = available_bytes - 2;
        l2_codec::decode_frame(&decrypted, payload_bytes).ok()
    }

    fn handle_facch3(&mut self, burst: &[Sample], cursor: SampleIndex, spawner: &mut Spawner) {
        let Ok(out) = pi4cxpsk_demod(burst, &FACCH_3, self.params.sps) else {
            return;
        };
        let bi = (self.frame_no % 4) as usize;

        if self
            .group
            .as_ref()
            .map(|g| g.sync_id != out.sync_id)
            .unwrap_or(false)
        {
            // A new logical message started before the previous one filled;
            // drop the stale partial group.
            self.group = None;
        }

        let group = self.group.get_or_insert_with(|| FacchGroup::new(out.sync_id));
        group.slots[bi] = Some((self.frame_no, out.soft_bits));

        if bi == 3 {
            let group = self.group.take().unwrap();
            if let Some(payload) = self.facch3_decode(&group) {
                let _ = self.params.tap.send(
                    ChannelType::Facch3,
                    self.params.arfcn,
                    self.frame_no,
                    self.params.tn,
                    &payload,
                );

                if !self.followed && l2_codec::is_assignment_command_1(&payload) {
                    if let Some((tn, arfcn)) = l2_codec::parse_assignment_command_1(&payload) {
                        if let Some(idx) = self.params.channel_map.channel_index_for_arfcn(arfcn) {
                            let tch9_params = Tch9Params {
                                sps: self.params.sps,
                                arfcn,
                                tn,
                                channel: idx,
                                tap: self.params.tap.clone(),
                                align: cursor + self.margin_samples(),
                                freq_err: self.freq_err,
                            };
                            spawner.spawn(idx, Box::new(Tch9Actor::new(tch9_params)));
                            self.followed = true;
                            self.log
                                .info("TCH3", format!("spawned TCH9 on arfcn={} tn={}", arfcn, tn));
                        }
                    }
                }
            }
        }
    }

    fn handle_speech3(&mut self, burst: &[Sample]) {
        let Ok(out) = pi4cxpsk_demod(burst, &SPEECH_3, self.params.sps) else {
            return;
        };
        let keystream = self
            .cipher
            .generate(1, &SystemConfig::DEFAULT_KEY, self.frame_no, 208);
        let decrypted = Self::decrypt_soft_bits(&out.soft_bits, &keystream);
        let bytes = Self::pack_hard_bits(&decrypted);
        let half = bytes.len() / 2;
        for chunk in [&bytes[..half], &bytes[half..]] {
            if chunk.len() >= 10 {
                let _ = self.params.tap.send(
                    ChannelType::Tch3,
                    self.params.arfcn,
                    self.frame_no,
                    self.params.tn,
                    &chunk[..10],
                );
            }
        }
    }
}

impl Consumer for Tch3Actor {
    fn kind(&self) -> ActorKind {
        ActorKind::Tch3
    }

    fn work(&mut self, window: &[Sample], cursor: SampleIndex, spawner: &mut Spawner) -> WorkResult {
        if !self.aligned {
            let target = self.align.saturating_sub(self.margin_samples());
            if cursor < target {
                if window.is_empty() {
                    return 0;
                }
                let gap = (target - cursor) as usize;
                let consume = gap.min(window.len());
                return consume.max(1) as WorkResult;
            }
            self.aligned = true;
        }

        let frame_len = frame_len_samples(self.params.sps);
        let required = self.margin_samples() as usize * 2 + frame_len * 2;
        if window.len() < required {
            return 0;
        }

        let slot_abs = self.align + self.slot_offset_samples();
        if slot_abs < cursor {
            self.frame_no = self.frame_no.wrapping_add(1);
            self.align += frame_len as u64;
            return (frame_len as u64) as WorkResult;
        }
        let idx = (slot_abs - cursor) as usize;
        let ref_len = FACCH_3.len_samples(self.params.sps);
        if idx + ref_len > window.len() {
            return 0;
        }
        let burst = &window[idx..idx + ref_len];
        let be = burst_energy(burst);
        let det = (self.energy_dkab + self.energy_burst) / 4.0;

        if be < det {
            let dkab_len = DKAB.len_samples(self.params.sps);
            if idx + dkab_len <= window.len() {
                match dkab_demod(&window[idx..idx + dkab_len], self.params.sps) {
                    Ok(result) if result.weak => {
                        self.weak_cnt += 1;
                        if self.weak_cnt > SystemConfig::DKAB_WEAK_THRESHOLD {
                            self.log.info("TCH3", "too many weak DKAB bursts, tearing down");
                            return TERMINATE;
                        }
                    }
                    Ok(_) => {
                        self.energy_dkab = 0.1 * be + 0.9 * self.energy_dkab;
                    }
                    Err(_) => {}
                }
            }
        } else {
            self.weak_cnt = 0;
            self.energy_burst = 0.1 * be + 0.9 * self.energy_burst;

            match pi4cxpsk_detect(burst, self.params.sps) {
                Ok(BurstType::Facch3) => self.handle_facch3(burst, cursor, spawner),
                Ok(_) => self.handle_speech3(burst),
                Err(_) => {}
            }

            if let Ok(out) = pi4cxpsk_demod(burst, &FACCH_3, self.params.sps) {
                let expected_toa = FACCH_3.len_samples(self.params.sps) as f64 / 2.0;
                self.align_err += ((out.toa - expected_toa) * 4.0).round() as i64;
                self.freq_err += out.freq_err;
            }
        }

        self.frame_no = self.frame_no.wrapping_add(1);
        let adjust = drain_align_err(&mut self.align_err);
        let advance = (frame_len as i64 + adjust).max(1) as u64;
        self.align += advance;
        advance as WorkResult
    }
}
