//! Hit finding on individual pulses: baseline and noise estimation, the
//! dual-threshold interval scan, and calibration of intervals into hits.
pub(crate) mod baseline;
pub(crate) mod hit_builder;
pub(crate) mod hit_properties;
pub(crate) mod intervals;

pub use baseline::compute_pulse_properties;
pub use hit_builder::{HitBuffers, HitRecordBuilder, PulseContext, Thresholds, find_hits};
pub use hit_properties::compute_hit_properties;
pub use intervals::find_intervals_above_threshold;
