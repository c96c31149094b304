//! System-wide constants and per-channel configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Fixed system constants carried over from the reference receiver's
/// hand-tuned margins and timing budget.
pub struct SystemConfig;

impl SystemConfig {
    /// GMR-1 symbol rate in symbols/second.
    pub const SYM_RATE: u32 = 23_400;

    /// Maximum number of input channels the CLI will attach producers for.
    pub const MAX_CHANS: usize = 16;

    /// Samples to discard at stream start before attempting FCCH acquisition.
    pub const START_DISCARD: usize = 8_000;

    /// TCH3 realignment margin, in symbol periods.
    pub const TCH3_MARGIN: i64 = 10;

    /// TCH9 realignment margin, in symbol periods.
    pub const TCH9_MARGIN: i64 = 50;

    /// BCCH realignment margin, in symbol periods.
    pub const BCCH_MARGIN: i64 = 100;

    /// Alignment-error correction threshold: a quarter-sample discipline
    /// accumulator exceeding this (in either direction) triggers a one
    /// frame-length timing shift.
    pub const ALIGN_ERR_THRESHOLD: i64 = 4;

    /// Default destination for GSMTAP datagrams.
    pub const DEFAULT_TAP_ADDR: &'static str = "127.0.0.1:4729";

    /// Placeholder ciphering key used by TCH3/TCH9 actors. Key exchange is
    /// out of scope; every actor enciphers against this fixed key so the
    /// cipher-stream call shape is exercised end to end.
    pub const DEFAULT_KEY: [u8; 8] = [0x42; 8];

    /// DKAB weak-burst count before a TCH3 channel tears itself down.
    pub const DKAB_WEAK_THRESHOLD: u32 = 8;

    /// Consecutive bad-CRC count before a FACCH9 channel tears itself down.
    pub const FACCH9_BAD_CRC_THRESHOLD: u32 = 10;
}

/// One `arfcn:filename` channel assignment parsed from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub arfcn: u32,
    pub filename: String,
}

impl ChannelSpec {
    /// Parse a single `arfcn:filename` argument.
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        let (arfcn_str, filename) =
            arg.split_once(':')
                .ok_or_else(|| ConfigError::MalformedChannelArg {
                    arg: arg.to_string(),
                })?;
        let arfcn: u32 = arfcn_str
            .parse()
            .map_err(|_| ConfigError::InvalidArfcn {
                value: arfcn_str.to_string(),
            })?;
        Ok(Self {
            arfcn,
            filename: filename.to_string(),
        })
    }
}

/// Shared, read-only ARFCN → channel-index lookup table, handed to BCCH and
/// TCH3 actors so they can resolve an assignment message's ARFCN to the
/// bus channel carrying that frequency (only channels the CLI was actually
/// given a file for can be assigned onto).
#[derive(Clone)]
pub struct ChannelMap(Arc<Vec<ChannelSpec>>);

impl ChannelMap {
    pub fn new(specs: Vec<ChannelSpec>) -> Self {
        Self(Arc::new(specs))
    }

    pub fn channel_index_for_arfcn(&self, arfcn: u32) -> Option<usize> {
        self.0.iter().position(|c| c.arfcn == arfcn)
    }
}

/// Validate the `sps` (samples per symbol) argument against the receiver's
/// supported range.
pub fn validate_sps(sps: i32) -> Result<u32, ConfigError> {
    if !(1..=16).contains(&sps) {
        return Err(ConfigError::SpsOutOfRange { sps });
    }
    Ok(sps as u32)
}

/// Drain an alignment-error accumulator (quarter-samples) into whole-sample
/// shifts of the next frame's advance, per spec §3's bounded-correction
/// invariant: |align_err| > 4 shifts the frame length by one sample and
/// decrements the accumulator by 4 of matching sign, repeated until the
/// accumulator settles within [-4, 4].
///
/// Returns the signed sample adjustment to add to the nominal frame length.
pub fn drain_align_err(align_err: &mut i64) -> i64 {
    let mut adjust = 0i64;
    while *align_err > SystemConfig::ALIGN_ERR_THRESHOLD {
        adjust += 1;
        *align_err -= 4;
    }
    while *align_err < -SystemConfig::ALIGN_ERR_THRESHOLD {
        adjust -= 1;
        *align_err += 4;
    }
    adjust
}

#[cfg(test)]
mod align_tests {
    use super::*;

    #[test]
    fn drains_until_bounded() {
        let mut e = 13i64;
        let adjust = drain_align_err(&mut e);
        assert_eq!(adjust, 3);
        assert!(e.abs() <= SystemConfig::ALIGN_ERR_THRESHOLD);
    }

    #[test]
    fn negative_error_drains_negative_adjust() {
        let mut e = -9i64;
        let adjust = drain_align_err(&mut e);
        assert_eq!(adjust, -2);
        assert!(e.abs() <= SystemConfig::ALIGN_ERR_THRESHOLD);
    }

    #[test]
    fn small_error_untouched() {
        let mut e = 2i64;
        let adjust = drain_align_err(&mut e);
        assert_eq!(adjust, 0);
        assert_eq!(e, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_channel_arg() {
        let spec = ChannelSpec::parse("120:samples.cfile").unwrap();
        assert_eq!(spec.arfcn, 120);
        assert_eq!(spec.filename, "samples.cfile");
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(ChannelSpec::parse("120samples.cfile").is_err());
    }

    #[test]
    fn rejects_non_numeric_arfcn() {
        assert!(ChannelSpec::parse("abc:samples.cfile").is_err());
    }

    #[test]
    fn sps_range_is_inclusive() {
        assert!(validate_sps(1).is_ok());
        assert!(validate_sps(16).is_ok());
        assert!(validate_sps(0).is_err());
        assert!(validate_sps(17).is_err());
    }

    #[test]
    fn channel_map_resolves_arfcn_to_index() {
        let map = ChannelMap::new(vec![
            ChannelSpec {
                arfcn: 100,
                filename: "a.cfile".into(),
            },
            ChannelSpec {
                arfcn: 200,
                filename: "b.cfile".into(),
            },
        ]);
        assert_eq!(map.channel_index_for_arfcn(200), Some(1));
        assert_eq!(map.channel_index_for_arfcn(999), None);
    }
}
