//! The five actor kinds the receiver dispatches (spec §4.2-§4.5, §6).
//!
//! `file_source` is the sole producer; the rest are consumers that chain by
//! spawning one another as control-plane messages reveal new logical
//! channels (FCCH -> BCCH -> TCH3 -> TCH9).

pub mod bcch;
pub mod fcch;
pub mod file_source;
pub mod tch3;
pub mod tch9;
