pub mod metrics;
pub mod tracer;

pub use tracer::{TracerEngine, TracerError, TracerOptions};

pub type Channel = u32;
pub type Intensity = u16;
pub type SampleIndex = usize;
pub type EventNumber = u64;

/// Converts a channel id into a row index of a per-channel container.
pub fn channel_index(channel: Channel) -> usize {
    channel as usize
}
