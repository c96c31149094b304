//! Sample actor contracts: the coroutine-like producer/consumer protocol
//! the bus drives (`work() -> WorkResult`: negative terminates, zero parks,
//! positive advances the actor's cursor by that many samples).

use crate::sample::{Sample, SampleIndex};

/// Tagged variant over the known actor kinds, used for diagnostics and
/// dispatch bookkeeping rather than runtime string typing (Design Note,
/// "Dynamic dispatch").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    FileSource,
    Fcch,
    Bcch,
    Tch3,
    Tch9,
    RachCore,
    RachFft,
}

impl ActorKind {
    /// Subsystem tag used when logging through `crate::logging`.
    pub fn log_tag(&self) -> &'static str {
        match self {
            ActorKind::FileSource => "BUS",
            ActorKind::Fcch => "FCCH",
            ActorKind::Bcch => "BCCH",
            ActorKind::Tch3 => "TCH3",
            ActorKind::Tch9 => "TCH9",
            ActorKind::RachCore | ActorKind::RachFft => "RACH",
        }
    }
}

/// The sole actor control-flow signal: `r < 0` terminate, `r == 0` park
/// (insufficient data, try again next sweep), `r > 0` advance the cursor by
/// that many samples.
pub type WorkResult = i64;

pub const PARK: WorkResult = 0;

/// Conventional terminal code used when an actor has no more specific
/// reason to report; any negative value terminates.
pub const TERMINATE: WorkResult = -1;

/// A request to attach a new consumer to a channel, queued by a `Spawner`
/// during a sweep and applied after the sweep completes (Design Note,
/// "Cyclic ownership" — append-only deferred queue to avoid iterator
/// invalidation while actors are being driven).
pub struct SpawnRequest {
    pub channel: usize,
    pub consumer: Box<dyn Consumer>,
}

/// Handed to a consumer's `work` call so it can request new consumers be
/// attached to any channel (including its own) without reaching back into
/// the bus directly.
pub struct Spawner<'a> {
    requests: &'a mut Vec<SpawnRequest>,
}

impl<'a> Spawner<'a> {
    pub fn new(requests: &'a mut Vec<SpawnRequest>) -> Self {
        Self { requests }
    }

    pub fn spawn(&mut self, channel: usize, consumer: Box<dyn Consumer>) {
        self.requests.push(SpawnRequest { channel, consumer });
    }
}

/// A producer actor: the sole writer for one channel's ring buffer.
///
/// `produce` is handed the remaining ring capacity and an output buffer to
/// append newly generated samples to; it returns the `WorkResult` of that
/// invocation. Returning samples and a positive count go hand in hand: the
/// bus trusts `out.len()` over the numeric return for the actual append,
/// but the sign of the return still carries park/terminate semantics.
pub trait Producer {
    fn kind(&self) -> ActorKind;
    fn produce(&mut self, max_samples: usize, out: &mut Vec<Sample>) -> WorkResult;
}

/// A consumer actor: reads a read-only window starting at its own cursor
/// and reports how far to advance.
///
/// `cursor` is the absolute sample index the window begins at; actors that
/// need to reason about alignment in absolute terms (BCCH, TCH3, TCH9) use
/// it rather than keeping their own approximate running count.
pub trait Consumer {
    fn kind(&self) -> ActorKind;
    fn work(&mut self, window: &[Sample], cursor: SampleIndex, spawner: &mut Spawner) -> WorkResult;
}
