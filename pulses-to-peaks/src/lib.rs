//! This crate converts the raw digitizer pulses of one trigger into calibrated
//! hits, assembles per channel and summed waveforms, proposes peaks on the sums
//! and passes them through an ordered chain of pruning rules.
//!
//! Typical usage, given a validated [DspConfig] and a list of [EventRecord]s:
//! ```ignore
//! let mut buffers = HitBuffers::new(config.hit_finder.max_hits_per_pulse);
//! let event = process_event(Event::from(record), &config, &mut buffers)?;
//! for peak in event.accepted_peaks() { /* ... */ }
//! ```
pub mod calibration;
pub mod datatype;
pub(crate) mod detectors;
pub mod error;
pub mod parameters;
pub mod processing;
pub mod pruning;
pub mod pulse_detection;
pub mod utils;
pub mod waveform;
pub(crate) mod window;

pub use datatype::{Event, EventRecord, EventSummary, Hit, Peak, PeakType, Pulse};
pub use error::{ConfigError, DspError, DspResult};
pub use parameters::DspConfig;
pub use processing::{process_event, process_events};
pub use pulse_detection::HitBuffers;

pub type Real = f64;
