//! Read-only burst descriptor tables.
//!
//! Lengths are expressed in symbols; actors convert to samples by
//! multiplying by `sps`. Exact bit-level sync sequences are a DSP-leaf
//! concern (`dsp::pi4cxpsk`) — this module only carries the geometry the
//! scheduling layer needs to map a burst window.

/// The eight burst types the receiver maps bursts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstType {
    Bcch,
    Ccch,
    Rach,
    NormalTraffic3,
    NormalTraffic9,
    Facch3,
    Speech3,
    Dkab,
}

/// Static geometry for one burst type.
#[derive(Debug, Clone, Copy)]
pub struct BurstDescriptor {
    pub burst_type: BurstType,
    /// Length of the burst payload, in symbols.
    pub len_symbols: usize,
    /// Padding window added on each side when mapping the burst for
    /// demodulation, in symbols (mirrors the original's ad-hoc per-channel
    /// `win` margins: `BCCH_MARGIN`-class constants cover frame alignment,
    /// this is the per-burst demod window).
    pub window_symbols: usize,
}

impl BurstDescriptor {
    /// Expected burst length in samples at the given oversampling ratio.
    pub fn len_samples(&self, sps: u32) -> usize {
        self.len_symbols * sps as usize
    }

    pub fn window_samples(&self, sps: u32) -> usize {
        self.window_symbols * sps as usize
    }
}

pub const BCCH: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::Bcch,
    len_symbols: 39,
    window_symbols: 20,
};

pub const CCCH: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::Ccch,
    len_symbols: 39,
    window_symbols: 20,
};

pub const RACH: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::Rach,
    len_symbols: 30,
    window_symbols: 15,
};

pub const NORMAL_TRAFFIC_3: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::NormalTraffic3,
    len_symbols: 39,
    window_symbols: 1,
};

pub const NORMAL_TRAFFIC_9: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::NormalTraffic9,
    len_symbols: 39,
    window_symbols: 1,
};

pub const FACCH_3: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::Facch3,
    len_symbols: 39,
    window_symbols: 1,
};

pub const SPEECH_3: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::Speech3,
    len_symbols: 39,
    window_symbols: 1,
};

pub const DKAB: BurstDescriptor = BurstDescriptor {
    burst_type: BurstType::Dkab,
    len_symbols: 8,
    window_symbols: 1,
};

/// One GMR-1 TDMA frame: 24 timeslots of 39 symbols each.
pub const TIMESLOTS_PER_FRAME: usize = 24;
pub const SYMBOLS_PER_TIMESLOT: usize = 39;

/// Frame length in samples at the given oversampling ratio.
pub fn frame_len_samples(sps: u32) -> usize {
    sps as usize * SYMBOLS_PER_TIMESLOT * TIMESLOTS_PER_FRAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_len_matches_24_times_39_times_sps() {
        assert_eq!(frame_len_samples(4), 4 * 39 * 24);
        assert_eq!(frame_len_samples(1), 39 * 24);
        assert_eq!(frame_len_samples(16), 16 * 39 * 24);
    }

    #[test]
    fn descriptor_scales_with_sps() {
        assert_eq!(BCCH.len_samples(4), 39 * 4);
        assert_eq!(DKAB.len_samples(1), 8);
    }
}
