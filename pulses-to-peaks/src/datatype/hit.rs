use crate::Real;
use dsp_common::{Channel, SampleIndex};
use serde::Serialize;

/// A calibrated excursion above the hit finder's thresholds within one pulse.
///
/// Hits are only created by [crate::pulse_detection::HitRecordBuilder], which
/// checks `left <= index_of_maximum <= right`, `left <= center / dt <= right`
/// and `threshold <= height <= area` beforehand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hit {
    pub(crate) channel: Channel,
    pub(crate) left: SampleIndex,
    pub(crate) right: SampleIndex,
    pub(crate) index_of_maximum: SampleIndex,
    /// Area-weighted center, in ns.
    pub(crate) center: Real,
    /// In photoelectrons.
    pub(crate) area: Real,
    /// In photoelectrons per sample.
    pub(crate) height: Real,
    pub(crate) noise_sigma: Real,
    pub(crate) found_in_pulse: usize,
    pub(crate) n_saturated: usize,
    pub(crate) summed_samples: Real,
}

impl Hit {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn left(&self) -> SampleIndex {
        self.left
    }

    pub fn right(&self) -> SampleIndex {
        self.right
    }

    pub fn index_of_maximum(&self) -> SampleIndex {
        self.index_of_maximum
    }

    pub fn center(&self) -> Real {
        self.center
    }

    pub fn area(&self) -> Real {
        self.area
    }

    pub fn height(&self) -> Real {
        self.height
    }

    pub fn noise_sigma(&self) -> Real {
        self.noise_sigma
    }

    pub fn found_in_pulse(&self) -> usize {
        self.found_in_pulse
    }

    pub fn n_saturated(&self) -> usize {
        self.n_saturated
    }

    pub fn summed_samples(&self) -> Real {
        self.summed_samples
    }

    pub fn length(&self) -> usize {
        self.right - self.left + 1
    }
}

#[cfg(test)]
pub(crate) fn test_hit(channel: Channel, left: SampleIndex, right: SampleIndex) -> Hit {
    Hit {
        channel,
        left,
        right,
        index_of_maximum: left,
        center: left as Real,
        area: 1.0,
        height: 1.0,
        noise_sigma: 0.0,
        found_in_pulse: 0,
        n_saturated: 0,
        summed_samples: 0.0,
    }
}
