//! GMR-1 receiver error types with granular categories.
//!
//! Leaf collaborators (DSP primitives, FEC codecs, file I/O) return
//! `Result<T, Gmr1Error>`. The actor scheduling boundary does not use this
//! type: actors advance the sample bus via the signed-integer `WorkResult`
//! protocol described in `actor.rs`, which is itself part of the contract
//! under test, not an error condition.

use thiserror::Error;

/// Top-level error type for all GMR-1 receiver operations.
#[derive(Debug, Error)]
pub enum Gmr1Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("demodulation error: {0}")]
    Demod(#[from] DemodError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Configuration / argument parsing errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sps must be within [1,16], got {sps}")]
    SpsOutOfRange { sps: i32 },

    #[error("channel argument must be of the form arfcn:filename, got {arg:?}")]
    MalformedChannelArg { arg: String },

    #[error("at least one channel must be specified")]
    NoChannels,

    #[error("invalid arfcn {value:?} in channel argument")]
    InvalidArfcn { value: String },

    #[error("invalid socket address {value:?}: {reason}")]
    InvalidTapAddr { value: String, reason: String },
}

/// Resource errors: allocation failure, file/socket open failure.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to open sample file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no free actor slot for channel {channel}")]
    ActorAllocation { channel: usize },

    #[error("channel index {channel} out of range (n_chans={n_chans})")]
    ChannelOutOfRange { channel: usize, n_chans: usize },

    #[error("failed to bind tap socket: {source}")]
    TapBind {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write debug dump {path}: {source}")]
    DumpWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Leaf demodulation failures, distinct from the clean "not enough data yet"
/// `0` work-result return.
#[derive(Debug, Error)]
pub enum DemodError {
    #[error("window out of range: begin={begin}, len={len}, data_len={data_len}")]
    WindowOutOfRange {
        begin: i64,
        len: usize,
        data_len: usize,
    },

    #[error("FCCH rough acquisition failed")]
    FcchRoughFailed,

    #[error("FCCH fine acquisition failed")]
    FcchFineFailed,

    #[error("no burst type matched in detector bank")]
    NoBurstTypeMatch,
}

/// Leaf L2/FEC decode failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("CRC check failed")]
    CrcMismatch,

    #[error("insufficient soft bits: need {required}, have {available}")]
    InsufficientBits { required: usize, available: usize },
}

/// Result type alias for GMR-1 receiver operations.
pub type Result<T> = std::result::Result<T, Gmr1Error>;
