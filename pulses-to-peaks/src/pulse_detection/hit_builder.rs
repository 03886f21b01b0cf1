use super::{compute_hit_properties, compute_pulse_properties, find_intervals_above_threshold};
use crate::{
    Real,
    calibration::{GainChoice, adc_to_pe},
    datatype::{Event, Hit, Pulse, PulseProperties},
    error::{DspError, DspResult, HitViolationReport},
    parameters::{DigitizerSettings, HitFinderSettings},
};
use dsp_common::{
    Channel, EventNumber, channel_index,
    metrics::names::{HITS_FOUND, NOISE_PULSES, PULSES_PROCESSED, TOO_MANY_HITS},
};
use metrics::counter;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, warn};

/// Number of too-many-hits messages logged at info level before they are demoted.
const TOO_MANY_HITS_REPORT_LIMIT: usize = 3;

static TOO_MANY_HITS_REPORTED: AtomicUsize = AtomicUsize::new(0);

/// Fixed capacity scratch space reused for every pulse of every event
/// processed on one thread.
#[derive(Debug, Clone)]
pub struct HitBuffers {
    intervals: Vec<(usize, usize)>,
    index_of_maxima: Vec<usize>,
    areas: Vec<Real>,
    centers: Vec<Real>,
    waveform: Vec<Real>,
}

impl HitBuffers {
    pub fn new(max_hits_per_pulse: usize) -> Self {
        Self {
            intervals: vec![(0, 0); max_hits_per_pulse],
            index_of_maxima: vec![0; max_hits_per_pulse],
            areas: vec![0.0; max_hits_per_pulse],
            centers: vec![0.0; max_hits_per_pulse],
            waveform: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.intervals.len()
    }
}

/// High and low thresholds for one pulse, in ADC counts above baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub high: Real,
    pub low: Real,
}

impl Thresholds {
    /// Each threshold is the largest of its noise-relative, absolute and
    /// minimum-relative candidates.
    pub fn for_pulse(settings: &HitFinderSettings, properties: &PulseProperties) -> Self {
        Self {
            high: (settings.height_over_noise_high_threshold * properties.noise_sigma)
                .max(settings.absolute_adc_counts_high_threshold)
                .max(-settings.height_over_min_high_threshold * properties.minimum),
            low: (settings.height_over_noise_low_threshold * properties.noise_sigma)
                .max(settings.absolute_adc_counts_low_threshold)
                .max(-settings.height_over_min_low_threshold * properties.minimum),
        }
    }
}

/// A baseline subtracted pulse being turned into hits.
pub struct PulseContext<'a> {
    pub pulse_index: usize,
    pub pulse: &'a Pulse,
    pub properties: &'a PulseProperties,
    /// Baseline subtracted, polarity corrected samples of `pulse`.
    pub w: &'a [Real],
    pub adc_to_pe: Real,
    pub high_threshold: Real,
}

/// Calibrates raw intervals into [Hit]s and checks their invariants.
pub struct HitRecordBuilder<'a> {
    digitizer: &'a DigitizerSettings,
    settings: &'a HitFinderSettings,
    event_number: EventNumber,
}

impl<'a> HitRecordBuilder<'a> {
    pub fn new(
        digitizer: &'a DigitizerSettings,
        settings: &'a HitFinderSettings,
        event_number: EventNumber,
    ) -> Self {
        Self {
            digitizer,
            settings,
            event_number,
        }
    }

    /// `interval`, `index_of_maximum` and `center` are in samples, the first
    /// relative to the pulse and the others relative to the interval start.
    pub fn build(
        &self,
        context: &PulseContext,
        interval: (usize, usize),
        index_of_maximum: usize,
        area: Real,
        center: Real,
    ) -> DspResult<Hit> {
        let (left_in_pulse, right_in_pulse) = interval;
        let max_in_pulse = left_in_pulse + index_of_maximum;
        let pulse_left = context.pulse.left();
        let dt = self.digitizer.sample_duration;

        let left = pulse_left + left_in_pulse;
        let right = pulse_left + right_in_pulse;
        let center_in_samples = center + left as Real;
        let height = context.w.get(max_in_pulse).copied().unwrap_or(Real::NAN) * context.adc_to_pe;
        let area = area * context.adc_to_pe;
        let noise_sigma = context.properties.noise_sigma * context.adc_to_pe;
        let threshold = context.high_threshold * context.adc_to_pe;

        let hit = Hit {
            channel: context.pulse.channel(),
            left,
            right,
            index_of_maximum: pulse_left + max_in_pulse,
            center: center_in_samples * dt,
            area,
            height,
            noise_sigma,
            found_in_pulse: context.pulse_index,
            n_saturated: self.count_saturated(context, interval),
            summed_samples: self.summed_samples(context, left_in_pulse),
        };

        let geometry_ok = hit.left <= hit.index_of_maximum && hit.index_of_maximum <= hit.right;
        let center_ok = (left as Real) <= center_in_samples && center_in_samples <= right as Real;
        let amplitude_ok = 0.0 <= threshold && threshold <= height && height <= area;
        if geometry_ok && center_ok && amplitude_ok {
            Ok(hit)
        } else {
            Err(DspError::HitInvariantViolation(Box::new(
                HitViolationReport {
                    event_number: self.event_number,
                    channel: hit.channel,
                    pulse_index: context.pulse_index,
                    pulse_left,
                    pulse_right: context.pulse.right(),
                    left,
                    index_of_maximum: hit.index_of_maximum,
                    right,
                    left_in_pulse,
                    max_in_pulse,
                    right_in_pulse,
                    center: hit.center,
                    sample_duration: dt,
                    height,
                    noise_sigma,
                    threshold,
                    area,
                },
            )))
        }
    }

    /// Samples at or beyond the digitizer's full scale. Only counted when the
    /// pulse reached full scale at all.
    fn count_saturated(&self, context: &PulseContext, (left, right): (usize, usize)) -> usize {
        let full_scale = self.digitizer.reference_baseline - context.properties.baseline;
        if context.properties.maximum < full_scale {
            return 0;
        }
        context
            .w
            .get(left..=right)
            .unwrap_or_default()
            .iter()
            .filter(|&&x| x >= full_scale)
            .count()
    }

    /// Sum over a fixed window starting `sum_start` samples after the hit,
    /// clamped to the pulse.
    fn summed_samples(&self, context: &PulseContext, left_in_pulse: usize) -> Real {
        let start = (left_in_pulse + self.settings.sum_start).min(context.w.len());
        let end = (start + self.settings.sum_n_samples).min(context.w.len());
        context.w.get(start..end).unwrap_or_default().iter().sum::<Real>() * context.adc_to_pe
    }
}

/// How loudly the `reported`-th too-many-hits occurrence (counting from 0) is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TooManyHitsReport {
    Info,
    /// The last message at info level, followed by a notice that the rest are demoted.
    LastInfo,
    Debug,
}

impl TooManyHitsReport {
    fn for_occurrence(reported: usize) -> Self {
        if reported + 1 < TOO_MANY_HITS_REPORT_LIMIT {
            Self::Info
        } else if reported + 1 == TOO_MANY_HITS_REPORT_LIMIT {
            Self::LastInfo
        } else {
            Self::Debug
        }
    }
}

fn report_too_many_hits(event_number: EventNumber, channel: Channel, pulse_index: usize, capacity: usize) {
    counter!(TOO_MANY_HITS).increment(1);
    let reported = TOO_MANY_HITS_REPORTED.fetch_add(1, Ordering::Relaxed);
    let report = TooManyHitsReport::for_occurrence(reported);
    match report {
        TooManyHitsReport::Info | TooManyHitsReport::LastInfo => {
            info!(
                event_number,
                channel,
                pulse_index,
                "Pulse filled all {capacity} hit slots, any further hits are dropped. Consider raising max-hits-per-pulse."
            );
            if report == TooManyHitsReport::LastInfo {
                info!("Further too-many hit messages will be suppressed!");
            }
        }
        TooManyHitsReport::Debug => debug!(
            event_number,
            channel, pulse_index, "Pulse filled all {capacity} hit slots"
        ),
    }
}

/// Finds the hits in every pulse of `event`, computing each pulse's
/// baseline and noise on the way.
///
/// Pulses in dead channels get their properties computed but are not searched.
/// Pulses in live channels without hits are counted as noise pulses.
#[tracing::instrument(skip_all, fields(event_number = event.event_number(), num_hits))]
pub fn find_hits(
    event: &mut Event,
    digitizer: &DigitizerSettings,
    settings: &HitFinderSettings,
    buffers: &mut HitBuffers,
) -> DspResult<()> {
    let builder = HitRecordBuilder::new(digitizer, settings, event.event_number());
    let mut hits = Vec::new();
    let mut noise_pulses_in = vec![0u32; digitizer.n_channels];

    let HitBuffers {
        intervals,
        index_of_maxima,
        areas,
        centers,
        waveform,
    } = buffers;
    let capacity = intervals.len();

    for (pulse_index, pulse) in event.pulses().iter().enumerate() {
        if pulse.is_empty() {
            warn!(pulse_index, channel = pulse.channel(), "Skipping empty pulse");
            continue;
        }
        pulse.invert_into(digitizer.reference_baseline, waveform);
        let properties = pulse.set_properties(
            pulse_index,
            compute_pulse_properties(waveform, settings.initial_baseline_samples),
        )?;
        counter!(PULSES_PROCESSED).increment(1);

        match digitizer.gain(pulse.channel()) {
            None => {
                error!(pulse_index, channel = pulse.channel(), "Gain for channel is unknown, skipping pulse");
                continue;
            }
            Some(gain) if gain == 0.0 => {
                debug!(pulse_index, channel = pulse.channel(), "Dead channel, skipping pulse");
                continue;
            }
            Some(_) => {}
        }
        let adc_to_pe = adc_to_pe(digitizer, pulse.channel(), GainChoice::Calibrated);

        waveform.iter_mut().for_each(|x| *x -= properties.baseline);
        let thresholds = Thresholds::for_pulse(settings, properties);
        let n_intervals = find_intervals_above_threshold(
            waveform,
            thresholds.high,
            thresholds.low,
            intervals,
            settings.dynamic_low_threshold_coeff,
        );

        if n_intervals == 0 {
            if let Some(count) = noise_pulses_in.get_mut(channel_index(pulse.channel())) {
                *count += 1;
            }
            counter!(NOISE_PULSES).increment(1);
            continue;
        }
        if n_intervals == capacity {
            report_too_many_hits(event.event_number(), pulse.channel(), pulse_index, capacity);
        }

        let found = intervals.get(..n_intervals).unwrap_or_default();
        compute_hit_properties(waveform, found, index_of_maxima, areas, centers)?;

        let context = PulseContext {
            pulse_index,
            pulse,
            properties,
            w: waveform.as_slice(),
            adc_to_pe,
            high_threshold: thresholds.high,
        };
        for (((&interval, &index_of_maximum), &area), &center) in found
            .iter()
            .zip(index_of_maxima.iter())
            .zip(areas.iter())
            .zip(centers.iter())
        {
            hits.push(builder.build(&context, interval, index_of_maximum, area, center)?);
        }
        counter!(HITS_FOUND).increment(n_intervals as u64);
    }

    tracing::Span::current().record("num_hits", hits.len());
    event.hits = hits;
    event.noise_pulses_in = noise_pulses_in;
    Ok(())
}
