//! Sample bus: per-channel ring buffers plus the single-threaded,
//! round-robin cooperative scheduler described in spec §4.1.

use crate::actor::{Consumer, Producer, SpawnRequest, Spawner};
use crate::logging::SignalLogger;
use crate::ring::RingBuffer;
use crate::sample::SampleIndex;

/// Ring capacity ceiling, in samples, before a producer is asked to park.
/// Chosen generously relative to one TDMA frame (sps·39·24 at sps=16 is
/// ~15,000 samples) so the slowest realistic consumer chain never starves.
pub const DEFAULT_RING_CAPACITY: usize = 1 << 20;

struct ConsumerSlot {
    cursor: SampleIndex,
    actor: Box<dyn Consumer>,
    terminated: bool,
}

struct Channel {
    ring: RingBuffer,
    producer: Option<Box<dyn Producer>>,
    producer_terminated: bool,
    consumers: Vec<ConsumerSlot>,
    capacity: usize,
}

impl Channel {
    fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(),
            producer: None,
            producer_terminated: true,
            consumers: Vec::new(),
            capacity,
        }
    }
}

/// Per-sweep bookkeeping returned so callers (and tests) can observe
/// scheduler progress without threading extra state through `work`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub progressed: bool,
    pub active_producers: usize,
    pub active_consumers: usize,
}

/// Orchestrates producers and consumers across N channels.
pub struct SampleBus {
    channels: Vec<Channel>,
    pending_spawns: Vec<(usize, Box<dyn Consumer>)>,
}

impl SampleBus {
    /// Allocate a bus with `n_chans` empty channels.
    pub fn alloc(n_chans: usize) -> Self {
        Self::alloc_with_capacity(n_chans, DEFAULT_RING_CAPACITY)
    }

    pub fn alloc_with_capacity(n_chans: usize, capacity: usize) -> Self {
        Self {
            channels: (0..n_chans).map(|_| Channel::new(capacity)).collect(),
            pending_spawns: Vec::new(),
        }
    }

    pub fn n_chans(&self) -> usize {
        self.channels.len()
    }

    /// Replace any prior producer on `ch` with `producer`.
    pub fn set_producer(&mut self, ch: usize, producer: Box<dyn Producer>) {
        let channel = &mut self.channels[ch];
        channel.producer = Some(producer);
        channel.producer_terminated = false;
    }

    /// Attach a new consumer to `ch`. May be called from inside another
    /// actor's `work` via `Spawner`, in which case the attach is deferred
    /// to the start of the next sweep.
    pub fn add_consumer(&mut self, ch: usize, consumer: Box<dyn Consumer>) {
        let cursor = self.channels[ch].ring.head_index();
        self.channels[ch].consumers.push(ConsumerSlot {
            cursor,
            actor: consumer,
            terminated: false,
        });
    }

    /// Number of live (non-terminated) consumers across all channels.
    pub fn total_consumers(&self) -> usize {
        self.channels.iter().map(|c| c.consumers.len()).sum()
    }

    fn all_producers_terminated(&self) -> bool {
        self.channels.iter().all(|c| c.producer_terminated)
    }

    /// Run one scheduling sweep across all channels: step 1-4 of spec §4.1.
    pub fn sweep(&mut self, log: &mut SignalLogger) -> SweepStats {
        // Apply spawns queued by the previous sweep before driving any
        // actor this sweep, so a spawned child's first window starts no
        // earlier than the ring's current head (Design Note: a spawn
        // "takes effect on the next sweep but no later").
        for (channel, consumer) in self.pending_spawns.drain(..) {
            let cursor = self.channels[channel].ring.head_index();
            self.channels[channel].consumers.push(ConsumerSlot {
                cursor,
                actor: consumer,
                terminated: false,
            });
        }

        let mut stats = SweepStats::default();
        let mut deferred: Vec<SpawnRequest> = Vec::new();

        for ch_idx in 0..self.channels.len() {
            // Step 1: producer.
            {
                let channel = &mut self.channels[ch_idx];
                if !channel.producer_terminated {
                    let free = channel.capacity.saturating_sub(channel.ring.len());
                    if free > 0 {
                        let mut buf = Vec::new();
                        let r = channel
                            .producer
                            .as_mut()
                            .expect("producer marked active without instance")
                            .produce(free, &mut buf);
                        if r < 0 {
                            channel.producer_terminated = true;
                            stats.progressed = true;
                        } else if !buf.is_empty() {
                            channel.ring.append(&buf);
                            stats.progressed = true;
                        }
                    }
                }
            }

            // Step 2: consumers, in insertion order.
            {
                let channel = &mut self.channels[ch_idx];
                for slot in channel.consumers.iter_mut() {
                    if slot.terminated {
                        continue;
                    }
                    let window = channel.ring.window_from(slot.cursor);
                    if window.is_empty() {
                        continue;
                    }
                    let mut spawner = Spawner::new(&mut deferred);
                    let r = slot.actor.work(window, slot.cursor, &mut spawner);
                    if r < 0 {
                        slot.terminated = true;
                        stats.progressed = true;
                    } else if r > 0 {
                        slot.cursor += r as SampleIndex;
                        stats.progressed = true;
                    }
                }
                channel.consumers.retain(|s| !s.terminated);
            }

            // Step 3: advance ring head to the slowest surviving consumer,
            // or fully drain if nobody is left watching this channel.
            {
                let channel = &mut self.channels[ch_idx];
                let new_head = channel
                    .consumers
                    .iter()
                    .map(|s| s.cursor)
                    .min()
                    .unwrap_or_else(|| channel.ring.tail_index());
                channel.ring.advance_to(new_head);
            }
        }

        for req in deferred {
            self.pending_spawns.push((req.channel, req.consumer));
        }

        stats.active_producers = self
            .channels
            .iter()
            .filter(|c| !c.producer_terminated)
            .count();
        stats.active_consumers = self.total_consumers();

        if stats.progressed {
            log.trace(
                "BUS",
                format!(
                    "sweep: producers_active={} consumers_active={}",
                    stats.active_producers, stats.active_consumers
                ),
            );
        }

        stats
    }

    /// Drive sweeps until all producers have terminated and no consumer
    /// made progress, or no consumers remain anywhere.
    pub fn run(&mut self, log: &mut SignalLogger) {
        loop {
            let stats = self.sweep(log);
            let halted_on_silence = self.all_producers_terminated() && !stats.progressed;
            let halted_on_drain = stats.active_consumers == 0 && self.pending_spawns.is_empty();
            if halted_on_silence || halted_on_drain {
                log.info("BUS", "scheduler halted");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorKind, TERMINATE};
    use crate::logging::{LogConfig, SignalLogger};
    use crate::sample::Sample;

    struct FiniteProducer {
        remaining: Vec<Sample>,
    }

    impl Producer for FiniteProducer {
        fn kind(&self) -> ActorKind {
            ActorKind::FileSource
        }

        fn produce(&mut self, max_samples: usize, out: &mut Vec<Sample>) -> i64 {
            if self.remaining.is_empty() {
                return TERMINATE;
            }
            let n = max_samples.min(self.remaining.len());
            out.extend(self.remaining.drain(0..n));
            out.len() as i64
        }
    }

    struct CountingConsumer {
        seen: std::rc::Rc<std::cell::RefCell<Vec<Sample>>>,
    }

    impl Consumer for CountingConsumer {
        fn kind(&self) -> ActorKind {
            ActorKind::Fcch
        }

        fn work(&mut self, window: &[Sample], _cursor: u64, _spawner: &mut Spawner) -> i64 {
            self.seen.borrow_mut().extend_from_slice(window);
            window.len() as i64
        }
    }

    #[test]
    fn consumer_sees_every_sample_in_order() {
        let samples: Vec<Sample> = (0..37).map(|i| Sample::new(i as f32, 0.0)).collect();
        let mut bus = SampleBus::alloc(1);
        bus.set_producer(
            0,
            Box::new(FiniteProducer {
                remaining: samples.clone(),
            }),
        );
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        bus.add_consumer(0, Box::new(CountingConsumer { seen: seen.clone() }));

        let mut log = SignalLogger::new(LogConfig::disabled());
        bus.run(&mut log);

        assert_eq!(*seen.borrow(), samples);
    }

    #[test]
    fn empty_producer_halts_immediately() {
        let mut bus = SampleBus::alloc(1);
        bus.set_producer(0, Box::new(FiniteProducer { remaining: vec![] }));
        let mut log = SignalLogger::new(LogConfig::disabled());
        bus.run(&mut log);
        assert_eq!(bus.total_consumers(), 0);
    }

    struct TerminatingConsumer {
        ticks_left: i32,
    }

    impl Consumer for TerminatingConsumer {
        fn kind(&self) -> ActorKind {
            ActorKind::Bcch
        }

        fn work(&mut self, window: &[Sample], _cursor: u64, _spawner: &mut Spawner) -> i64 {
            self.ticks_left -= 1;
            if self.ticks_left <= 0 {
                return TERMINATE;
            }
            window.len() as i64
        }
    }

    #[test]
    fn terminated_consumer_is_removed_and_ring_advances() {
        let samples: Vec<Sample> = (0..10).map(|i| Sample::new(i as f32, 0.0)).collect();
        let mut bus = SampleBus::alloc(1);
        bus.set_producer(0, Box::new(FiniteProducer { remaining: samples }));
        bus.add_consumer(0, Box::new(TerminatingConsumer { ticks_left: 2 }));
        let mut log = SignalLogger::new(LogConfig::disabled());
        bus.run(&mut log);
        assert_eq!(bus.total_consumers(), 0);
    }

    struct SpawningConsumer {
        spawned: bool,
    }

    impl Consumer for SpawningConsumer {
        fn kind(&self) -> ActorKind {
            ActorKind::Fcch
        }

        fn work(&mut self, window: &[Sample], _cursor: u64, spawner: &mut Spawner) -> i64 {
            if !self.spawned {
                self.spawned = true;
                spawner.spawn(0, Box::new(TerminatingConsumer { ticks_left: 1 }));
            }
            window.len() as i64
        }
    }

    #[test]
    fn spawned_consumer_attaches_on_next_sweep() {
        let samples: Vec<Sample> = (0..5).map(|i| Sample::new(i as f32, 0.0)).collect();
        let mut bus = SampleBus::alloc(1);
        bus.set_producer(0, Box::new(FiniteProducer { remaining: samples }));
        bus.add_consumer(0, Box::new(SpawningConsumer { spawned: false }));

        let mut log = SignalLogger::new(LogConfig::disabled());
        // One sweep: producer emits, spawning consumer runs and queues a spawn.
        bus.sweep(&mut log);
        assert_eq!(bus.total_consumers(), 1);
        // Next sweep: the queued spawn attaches.
        bus.sweep(&mut log);
        assert_eq!(bus.total_consumers(), 2);
    }
}
