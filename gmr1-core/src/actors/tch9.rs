//! TCH9 traffic actor: one 9.6 kbit/s burst per TDMA frame, dispatching
//! between FACCH9 signalling and interleaved TCH9 speech data by
//! `sync_id` (spec §4.5).

use crate::actor::{ActorKind, Consumer, Spawner, TERMINATE, WorkResult};
use crate::config::{drain_align_err, SystemConfig};
use crate::descriptors::{frame_len_samples, NORMAL_TRAFFIC_9};
use crate::dsp::burst_energy;
use crate::dsp::cipher::{A5LikeStream, CipherStream};
use crate::dsp::interleaver::BlockInterleaver;
use crate::dsp::l2_codec;
use crate::dsp::pi4cxpsk::pi4cxpsk_demod;
use crate::logging::SignalLogger;
use crate::sample::{Sample, SampleIndex};
use crate::tap::{ChannelType, TapSink};

const FACCH9_KEYSTREAM_BITS: usize = 658;
const TCH9_INTERLEAVE_DEPTH: usize = 18;
const TCH9_BLOCK_BITS: usize = 144;

/// Parameters a TCH9 actor is spawned with.
#[derive(Clone)]
pub struct Tch9Params {
    pub sps: u32,
    pub arfcn: u32,
    pub tn: u8,
    pub channel: usize,
    pub tap: TapSink,
    pub align: u64,
    pub freq_err: f64,
}

pub struct Tch9Actor {
    params: Tch9Params,
    aligned: bool,
    align: u64,
    align_err: i64,
    freq_err: f64,
    frame_no: u32,
    bad_crc: u32,
    interleaver: BlockInterleaver,
    cipher: A5LikeStream,
    log: SignalLogger,
}

impl Tch9Actor {
    pub fn new(params: Tch9Params) -> Self {
        Self {
            align: params.align,
            freq_err: params.freq_err,
            align_err: 0,
            aligned: false,
            frame_no: 0,
            bad_crc: 0,
            interleaver: BlockInterleaver::new(TCH9_INTERLEAVE_DEPTH, TCH9_BLOCK_BITS),
            cipher: A5LikeStream,
            log: SignalLogger::default(),
            params,
        }
    }

    fn margin_samples(&self) -> u64 {
        SystemConfig::TCH9_MARGIN as u64 * self.params.sps as u64
    }

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

    fn handle_facch9(&mut self, soft_bits: &[i8]) -> WorkResult {
        let keystream = self
            .cipher
            .generate(0, &SystemConfig::DEFAULT_KEY, self.frame_no, FACCH9_KEYSTREAM_BITS);
        let decrypted = Self::decrypt_soft_bits(soft_bits, &keystream);
        let available_bytes = decrypted.len() / 8;
        if available_bytes < 3 {
            self.bad_crc += 1;
        } else {
            let payload_bytes = available_bytes - 2;
            match l2_codec::decode_frame(&decrypted, payload_bytes) {
                Ok(payload) => {
                    self.bad_crc = 0;
                    let _ = self.params.tap.send(
                        ChannelType::Facch9,
                        self.params.arfcn,
                        self.frame_no,
                        self.params.tn,
                        &payload,
                    );
                }
                Err(_) => self.bad_crc += 1,
            }
        }

        if self.bad_crc > SystemConfig::FACCH9_BAD_CRC_THRESHOLD {
            self.log.info("TCH9", "too many bad FACCH9 CRCs, tearing down");
            return TERMINATE;
        }
        0
    }

    fn handle_tch9(&mut self, soft_bits: &[i8]) {
        if let Some(block) = self.interleaver.push(soft_bits) {
            let bytes: Vec<u8> = block
                .chunks(8)
                .map(|chunk| {
                    chunk.iter().enumerate().fold(0u8, |acc, (i, &b)| {
                        acc | (((b >= 0) as u8) << (7 - i))
                    })
                })
                .collect();
            // TCH9 speech frames carry no checksum: emit unconditionally.
            let _ = self.params.tap.send(
                ChannelType::Tch9,
                self.params.arfcn,
                self.frame_no,
                self.params.tn,
                &bytes,
            );
        }
    }
}

impl Consumer for Tch9Actor {
    fn kind(&self) -> ActorKind {
        ActorKind::Tch9
    }

    fn work(&mut self, window: &[Sample], cursor: SampleIndex, _spawner: &mut Spawner) -> WorkResult {
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

        let slot_abs = self.align + self.params.sps as u64 * self.params.tn as u64 * 39;
        if slot_abs < cursor {
            return 0;
        }
        let idx = (slot_abs - cursor) as usize;
        let len = NORMAL_TRAFFIC_9.len_samples(self.params.sps);
        if idx + len > window.len() {
            return 0;
        }
        let burst = &window[idx..idx + len];
        let _ = burst_energy(burst);

        let result = pi4cxpsk_demod(burst, &NORMAL_TRAFFIC_9, self.params.sps);
        let mut terminate = false;
        if let Ok(out) = result {
            let expected_toa = NORMAL_TRAFFIC_9.len_samples(self.params.sps) as f64 / 2.0;
            self.align_err += ((out.toa - expected_toa) * 4.0).round() as i64;
            self.freq_err += out.freq_err;

            if out.sync_id == 0 {
                if self.handle_facch9(&out.soft_bits) < 0 {
                    terminate = true;
                }
            } else {
                self.handle_tch9(&out.soft_bits);
            }
        }

        if terminate {
            return TERMINATE;
        }

        self.frame_no = self.frame_no.wrapping_add(1);
        let adjust = drain_align_err(&mut self.align_err);
        let advance = (frame_len as i64 + adjust).max(1) as u64;
        self.align += advance;
        advance as WorkResult
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    fn tap() -> TapSink {
        TapSink::connect(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 4729))).unwrap()
    }

    fn params() -> Tch9Params {
        Tch9Params {
            sps: 1,
            arfcn: 100,
            tn: 5,
            channel: 0,
            tap: tap(),
            align: 0,
            freq_err: 0.0,
        }
    }

    #[test]
    fn terminates_after_too_many_bad_facch9_crcs() {
        let mut actor = Tch9Actor::new(params());
        actor.aligned = true;
        let frame_len = frame_len_samples(actor.params.sps);
        let window = vec![Complex32::new(0.0, 0.0); frame_len * 4];

        let mut terminated = false;
        for _ in 0..40 {
            let mut requests = Vec::new();
            let mut spawner = Spawner::new(&mut requests);
            let r = actor.work(&window, 0, &mut spawner);
            if r < 0 {
                terminated = true;
                break;
            }
        }
        assert!(terminated);
    }

    #[test]
    fn parks_until_aligned() {
        let mut actor = Tch9Actor::new(Tch9Params {
            align: 9000,
            ..params()
        });
        let window = vec![Complex32::new(0.0, 0.0); 10];
        let mut requests = Vec::new();
        let mut spawner = Spawner::new(&mut requests);
        let r = actor.work(&window, 0, &mut spawner);
        assert_eq!(r, 10);
        assert!(!actor.aligned);
    }
}
