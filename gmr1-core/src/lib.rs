//! Receiver orchestration core for a GMR-1 satellite air-interface SDR.
//!
//! A single-threaded cooperative scheduler (`bus`) sweeps per-channel ring
//! buffers (`ring`), driving producer/consumer actors (`actor`, `actors`)
//! that chain by spawning one another as control-plane messages reveal new
//! logical channels: FCCH acquisition hands off to BCCH/CCCH decode, which
//! spawns TCH3 traffic actors on assignment, which in turn spawn TCH9. A
//! standalone random-access burst detector (`rach`) runs outside that
//! actor chain. DSP leaf collaborators (`dsp`) and burst geometry tables
//! (`descriptors`) are shared by every actor kind.

pub mod actor;
pub mod actors;
pub mod bus;
pub mod config;
pub mod descriptors;
pub mod dsp;
pub mod errors;
pub mod logging;
pub mod rach;
pub mod ring;
pub mod sample;
pub mod tap;

pub use actor::{ActorKind, Consumer, Producer, Spawner, SpawnRequest, WorkResult, PARK, TERMINATE};
pub use bus::SampleBus;
pub use config::{ChannelMap, ChannelSpec, SystemConfig};
pub use errors::{ConfigError, DecodeError, DemodError, Gmr1Error, ResourceError, Result};
pub use sample::{Sample, SampleIndex};
