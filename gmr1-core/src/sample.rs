//! Primitive sample types shared across the ring buffer, actors and bus.

use num_complex::Complex32;

/// A complex baseband sample (in-phase, quadrature).
pub type Sample = Complex32;

/// Absolute position of a sample within its channel's stream, counted from
/// the first sample the producer ever emitted.
pub type SampleIndex = u64;
