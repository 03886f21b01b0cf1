use super::{Hit, Peak, Pulse};
use crate::{
    Real,
    error::{DspError, DspResult},
};
use dsp_common::{Channel, EventNumber, SampleIndex};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A named, full-length waveform in photoelectrons per sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
    pub name: String,
    pub samples: Vec<Real>,
    /// Channels which were summed into this waveform.
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelBaseline {
    pub mean: Real,
    pub stdev: Real,
}

/// The serialized form of an event handed over by the reader.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventRecord {
    pub event_number: EventNumber,
    /// Number of samples in the event.
    pub length: usize,
    pub pulses: Vec<Pulse>,
}

/// Everything produced while processing one trigger.
#[derive(Debug, Clone)]
pub struct Event {
    pub(crate) event_number: EventNumber,
    pub(crate) length: usize,
    pub(crate) pulses: Vec<Pulse>,
    /// Calibrated waveform of every channel, one row each.
    pub(crate) channel_waveforms: Array2<Real>,
    pub(crate) channel_baselines: Vec<Option<ChannelBaseline>>,
    pub(crate) waveforms: Vec<Waveform>,
    pub(crate) hits: Vec<Hit>,
    pub(crate) peaks: Vec<Peak>,
    pub(crate) noise_pulses_in: Vec<u32>,
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        Event::new(record.event_number, record.length, record.pulses)
    }
}

impl Event {
    pub fn new(event_number: EventNumber, length: usize, pulses: Vec<Pulse>) -> Self {
        Self {
            event_number,
            length,
            pulses,
            channel_waveforms: Array2::zeros((0, length)),
            channel_baselines: Vec::new(),
            waveforms: Vec::new(),
            hits: Vec::new(),
            peaks: Vec::new(),
            noise_pulses_in: Vec::new(),
        }
    }

    pub fn event_number(&self) -> EventNumber {
        self.event_number
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn channel_waveforms(&self) -> &Array2<Real> {
        &self.channel_waveforms
    }

    pub fn channel_baseline(&self, channel: Channel) -> Option<&ChannelBaseline> {
        self.channel_baselines
            .get(channel as usize)
            .and_then(Option::as_ref)
    }

    pub fn waveforms(&self) -> &[Waveform] {
        &self.waveforms
    }

    pub fn get_waveform(&self, name: &str) -> DspResult<&Waveform> {
        self.waveforms
            .iter()
            .find(|waveform| waveform.name == name)
            .ok_or_else(|| DspError::UnknownWaveform(name.to_owned()))
    }

    /// Adds a waveform, replacing any waveform with the same name.
    pub(crate) fn append_waveform(&mut self, waveform: Waveform) {
        match self.waveforms.iter_mut().find(|w| w.name == waveform.name) {
            Some(existing) => *existing = waveform,
            None => self.waveforms.push(waveform),
        }
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Hits found in the pulse at `pulse_index`.
    pub fn hits_in_pulse(&self, pulse_index: usize) -> impl Iterator<Item = &Hit> {
        self.hits
            .iter()
            .filter(move |hit| hit.found_in_pulse == pulse_index)
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn accepted_peaks(&self) -> impl Iterator<Item = &Peak> {
        self.peaks.iter().filter(|peak| !peak.is_rejected())
    }

    pub fn noise_pulses_in(&self, channel: Channel) -> u32 {
        self.noise_pulses_in
            .get(channel as usize)
            .copied()
            .unwrap_or_default()
    }
}

/// Output view of a finished event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventSummary<'a> {
    pub event_number: EventNumber,
    pub length: SampleIndex,
    pub hits: &'a [Hit],
    pub peaks: &'a [Peak],
    pub noise_pulses_in: &'a [u32],
}

impl<'a> From<&'a Event> for EventSummary<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            event_number: event.event_number,
            length: event.length,
            hits: &event.hits,
            peaks: &event.peaks,
            noise_pulses_in: &event.noise_pulses_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::hit::test_hit;

    #[test]
    fn waveforms_are_replaced_by_name() {
        let mut event = Event::new(0, 3, Vec::new());
        event.append_waveform(Waveform {
            name: "top".to_owned(),
            samples: vec![0.0; 3],
            channels: vec![],
        });
        event.append_waveform(Waveform {
            name: "top".to_owned(),
            samples: vec![1.0; 3],
            channels: vec![0],
        });
        assert_eq!(event.waveforms().len(), 1);
        assert_eq!(
            event.get_waveform("top").map(|w| w.samples.clone()).ok(),
            Some(vec![1.0; 3])
        );
        assert!(matches!(
            event.get_waveform("bottom"),
            Err(DspError::UnknownWaveform(_))
        ));
    }

    #[test]
    fn hits_grouped_by_pulse() {
        let mut event = Event::new(0, 100, Vec::new());
        let mut first = test_hit(0, 0, 5);
        first.found_in_pulse = 0;
        let mut second = test_hit(0, 10, 15);
        second.found_in_pulse = 1;
        let mut third = test_hit(1, 20, 25);
        third.found_in_pulse = 1;
        event.hits = vec![first, second, third];

        let lefts: Vec<_> = event.hits_in_pulse(1).map(Hit::left).collect();
        assert_eq!(lefts, vec![10, 20]);
        assert_eq!(event.hits_in_pulse(2).count(), 0);
    }
}
