use crate::{
    Real,
    error::{DspError, DspResult},
};
use dsp_common::{Channel, Intensity, SampleIndex};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// Derived per-pulse quantities, in ADC counts of the inverted waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PulseProperties {
    pub baseline: Real,
    pub noise_sigma: Real,
    /// Lowest sample relative to the baseline.
    pub minimum: Real,
    /// Highest sample relative to the baseline.
    pub maximum: Real,
}

/// One contiguous digitizer recording on one channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pulse {
    channel: Channel,
    left: SampleIndex,
    samples: Vec<Intensity>,
    #[serde(skip)]
    properties: OnceCell<PulseProperties>,
}

impl Pulse {
    pub fn new(channel: Channel, left: SampleIndex, samples: Vec<Intensity>) -> Self {
        Self {
            channel,
            left,
            samples,
            properties: OnceCell::new(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn left(&self) -> SampleIndex {
        self.left
    }

    /// Absolute index of the last sample (inclusive).
    pub fn right(&self) -> SampleIndex {
        self.left + self.samples.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Intensity] {
        &self.samples
    }

    /// Writes `reference_baseline - raw` into `out`, so that signal points upwards.
    pub(crate) fn invert_into(&self, reference_baseline: Real, out: &mut Vec<Real>) {
        out.clear();
        out.extend(
            self.samples
                .iter()
                .map(|&raw| reference_baseline - raw as Real),
        );
    }

    pub fn properties(&self) -> Option<&PulseProperties> {
        self.properties.get()
    }

    /// Stores the derived quantities. These may only be computed once.
    pub(crate) fn set_properties(
        &self,
        pulse_index: usize,
        properties: PulseProperties,
    ) -> DspResult<&PulseProperties> {
        self.properties
            .set(properties)
            .map_err(|_| DspError::PulsePropertiesAlreadySet { pulse: pulse_index })?;
        self.properties
            .get()
            .ok_or(DspError::PulsePropertiesAlreadySet { pulse: pulse_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let pulse = Pulse::new(4, 100, vec![0; 10]);
        assert_eq!(pulse.left(), 100);
        assert_eq!(pulse.right(), 109);
        assert_eq!(pulse.len(), 10);
    }

    #[test]
    fn inversion_points_signal_upwards() {
        let pulse = Pulse::new(0, 0, vec![16000, 15990, 16005]);
        let mut w = Vec::new();
        pulse.invert_into(16000.0, &mut w);
        assert_eq!(w, vec![0.0, 10.0, -5.0]);
    }

    #[test]
    fn properties_are_set_once() {
        let pulse = Pulse::new(0, 0, vec![1, 2, 3]);
        let properties = PulseProperties {
            baseline: 1.0,
            noise_sigma: 0.5,
            minimum: -1.0,
            maximum: 2.0,
        };
        assert!(pulse.properties().is_none());
        assert!(pulse.set_properties(3, properties).is_ok());
        assert_eq!(pulse.properties(), Some(&properties));
        assert!(matches!(
            pulse.set_properties(3, properties),
            Err(DspError::PulsePropertiesAlreadySet { pulse: 3 })
        ));
    }
}
