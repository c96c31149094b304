//! BCCH/CCCH actor: per-frame broadcast and common control channel decode,
//! System Information realignment, and immediate-assignment dispatch onto a
//! freshly spawned TCH3 actor (spec §4.3).

use crate::actor::{ActorKind, Consumer, Spawner, TERMINATE, WorkResult};
use crate::actors::tch3::{Tch3Actor, Tch3Params};
use crate::config::{drain_align_err, ChannelMap, SystemConfig};
use crate::descriptors::{frame_len_samples, BCCH, CCCH};
use crate::dsp::l2_codec::{self, Si1Alignment};
use crate::dsp::pi4cxpsk::{pi4cxpsk_demod, DemodOutput};
use crate::dsp::burst_energy;
use crate::logging::SignalLogger;
use crate::sample::{Sample, SampleIndex};
use crate::tap::{ChannelType, TapSink};

/// Parameters a BCCH actor is spawned with.
#[derive(Clone)]
pub struct BcchParams {
    pub sps: u32,
    pub arfcn: u32,
    pub channel: usize,
    pub tap: TapSink,
    pub channel_map: ChannelMap,
    /// Absolute sample index where the next frame is expected to start.
    pub align: u64,
    pub freq_err: f64,
}

pub struct BcchActor {
    params: BcchParams,
    aligned: bool,
    align: u64,
    align_err: i64,
    freq_err: f64,
    frame_no: u32,
    sa_sirfn_delay: u32,
    sa_bcch_stn: u32,
    bcch_err: u32,
    bcch_energy: f64,
    last_assignment: Option<(u32, u8, u8)>,
    log: SignalLogger,
}

impl BcchActor {
    pub fn new(params: BcchParams) -> Self {
        Self {
            align: params.align,
            freq_err: params.freq_err,
            align_err: 0,
            aligned: false,
            frame_no: 0,
            sa_sirfn_delay: 0,
            sa_bcch_stn: 0,
            bcch_err: 0,
            bcch_energy: 0.0,
            last_assignment: None,
            log: SignalLogger::default(),
            params,
        }
    }

    fn margin_samples(&self) -> u64 {
        SystemConfig::BCCH_MARGIN as u64 * self.params.sps as u64
    }

    fn slot_offset_samples(&self, stn: u32) -> u64 {
        self.params.sps as u64 * stn as u64 * 39
    }

    /// Decode one burst at absolute `slot_abs` against `descriptor`, returning
    /// the demod output and CRC-checked payload bytes (however many the
    /// simplified leaf soft-bit count supports, minus the trailing checksum).
    fn decode_slot(
        window: &[Sample],
        cursor: SampleIndex,
        slot_abs: u64,
        descriptor: &crate::descriptors::BurstDescriptor,
        sps: u32,
    ) -> Option<(DemodOutput, Vec<u8>, f64)> {
        if slot_abs < cursor {
            return None;
        }
        let idx = (slot_abs - cursor) as usize;
        let len = descriptor.len_samples(sps);
        if idx + len > window.len() {
            return None;
        }
        let burst = &window[idx..idx + len];
        let be = burst_energy(burst);
        let out = pi4cxpsk_demod(burst, descriptor, sps).ok()?;
        let available_bytes = out.soft_bits.len() / 8;
        if available_bytes < 3 {
            return None;
        }
        let payload_bytes = available_bytes - 2;
        let payload = l2_codec::decode_frame(&out.soft_bits, payload_bytes).ok()?;
        Some((out, payload, be))
    }
}

impl Consumer for BcchActor {
    fn kind(&self) -> ActorKind {
        ActorKind::Bcch
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

        let sirfn = (self.frame_no as i64 - self.sa_sirfn_delay as i64).rem_euclid(64) as u32;
        let slot_abs = self.align + self.slot_offset_samples(self.sa_bcch_stn);

        if sirfn % 8 == 2 {
            match Self::decode_slot(window, cursor, slot_abs, &BCCH, self.params.sps) {
                Some((out, payload, be)) => {
                    let toa_err = out.toa - (BCCH.len_samples(self.params.sps) as f64) / 2.0;
                    self.align_err += (toa_err * 4.0).round() as i64;
                    self.freq_err += out.freq_err;
                    self.bcch_err = 0;
                    self.bcch_energy = be;

                    if let Some(Si1Alignment {
                        sa_sirfn_delay,
                        sa_bcch_stn,
                    }) = l2_codec::parse_si1_alignment(&payload)
                    {
                        self.sa_sirfn_delay = sa_sirfn_delay;
                        self.sa_bcch_stn = sa_bcch_stn;
                    }

                    self.log.debug("BCCH", format!("decoded frame fn={}", self.frame_no));
                    let _ = self.params.tap.send(
                        ChannelType::Bcch,
                        self.params.arfcn,
                        self.frame_no,
                        self.sa_bcch_stn as u8,
                        &payload,
                    );
                }
                None => {
                    self.bcch_err += 1;
                    if self.bcch_err > 10 {
                        self.log.info("BCCH", "channel lost, too many bad CRCs");
                        return TERMINATE;
                    }
                }
            }
        } else {
            match Self::decode_slot(window, cursor, slot_abs, &CCCH, self.params.sps) {
                Some((_out, payload, be)) if be >= self.bcch_energy / 2.0 => {
                    if l2_codec::is_immediate_assignment(&payload) {
                        if let Some((arfcn, tn, dkab_pos)) = l2_codec::parse_immediate_assignment(&payload) {
                            let assignment = (arfcn, tn, dkab_pos);
                            if self.last_assignment != Some(assignment) {
                                self.last_assignment = Some(assignment);
                                if let Some(idx) = self.params.channel_map.channel_index_for_arfcn(arfcn) {
                                    let tch3_params = Tch3Params {
                                        sps: self.params.sps,
                                        arfcn,
                                        tn,
                                        channel: idx,
                                        tap: self.params.tap.clone(),
                                        channel_map: self.params.channel_map.clone(),
                                        align: cursor + self.margin_samples(),
                                        freq_err: self.freq_err,
                                        ref_energy: self.bcch_energy / 2.0,
                                    };
                                    spawner.spawn(idx, Box::new(Tch3Actor::new(tch3_params)));
                                    self.log.info(
                                        "CCCH",
                                        format!("spawned TCH3 on arfcn={} tn={}", arfcn, tn),
                                    );
                                } else {
                                    self.log.warn(
                                        "CCCH",
                                        format!("immediate assignment to unknown arfcn={}", arfcn),
                                    );
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        self.frame_no = (self.frame_no + 1) & 0x00FF_FFFF;
        let adjust = drain_align_err(&mut self.align_err);
        let advance = (frame_len as i64 + adjust).max(1) as u64;
        self.align += advance;
        advance as WorkResult
    }
}
