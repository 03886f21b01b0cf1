use crate::Real;
use dsp_common::{Channel, EventNumber, SampleIndex};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type DspResult<T> = Result<T, DspError>;

/// Everything known about a hit that failed its geometric or numeric checks.
#[derive(Debug, Clone, PartialEq)]
pub struct HitViolationReport {
    pub event_number: EventNumber,
    pub channel: Channel,
    pub pulse_index: usize,
    pub pulse_left: SampleIndex,
    pub pulse_right: SampleIndex,
    pub left: SampleIndex,
    pub index_of_maximum: SampleIndex,
    pub right: SampleIndex,
    pub left_in_pulse: SampleIndex,
    pub max_in_pulse: SampleIndex,
    pub right_in_pulse: SampleIndex,
    pub center: Real,
    pub sample_duration: Real,
    pub height: Real,
    pub noise_sigma: Real,
    pub threshold: Real,
    pub area: Real,
}

impl Display for HitViolationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Hit {}-{}-{} in event {}, channel {}, pulse {} violates its invariants.",
            self.left,
            self.index_of_maximum,
            self.right,
            self.event_number,
            self.channel,
            self.pulse_index
        )?;
        writeln!(
            f,
            "Indices in pulse: {}-{}-{}. Pulse bounds: {}-{}.",
            self.left_in_pulse, self.max_in_pulse, self.right_in_pulse, self.pulse_left, self.pulse_right
        )?;
        writeln!(
            f,
            "Center of gravity at {} ({} samples).",
            self.center,
            self.center / self.sample_duration
        )?;
        writeln!(
            f,
            "Height is {}, noise sigma is {}, threshold at {}.",
            self.height, self.noise_sigma, self.threshold
        )?;
        write!(f, "Area is {}.", self.area)
    }
}

#[derive(Debug, Error)]
pub enum DspError {
    #[error("Hit finder defect:\n{0}")]
    HitInvariantViolation(Box<HitViolationReport>),
    #[error("Hit {left}-{right} has zero area, its center of mass is undefined")]
    ZeroAreaCenter { left: SampleIndex, right: SampleIndex },
    #[error("Hits must be sorted by left boundary: hit {index} starts at {left}, before {previous_left}")]
    HitsOutOfOrder {
        index: usize,
        left: SampleIndex,
        previous_left: SampleIndex,
    },
    #[error("Baseline and noise of pulse {pulse} were already computed")]
    PulsePropertiesAlreadySet { pulse: usize },
    #[error("No waveform named {0} in event")]
    UnknownWaveform(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    IO(#[from] std::io::Error),
    #[error("Cannot parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
