//! Records produced and consumed by the processing stages.
use super::Real;
use std::fmt::{Debug, Display};

pub(crate) mod event;
pub(crate) mod hit;
pub(crate) mod peak;
pub(crate) mod pulse;
pub(crate) mod tracepoint;

pub use event::{ChannelBaseline, Event, EventRecord, EventSummary, Waveform};
pub use hit::Hit;
pub use peak::{Peak, PeakType, PruningState};
pub use pulse::{Pulse, PulseProperties};
pub(crate) use tracepoint::TracePoint;

/// This trait abstracts any type used as a time variable
pub(crate) trait Temporal: Default + Copy + Debug + Display + PartialEq {}

impl Temporal for usize {}

impl Temporal for Real {}
