use crate::{
    Real,
    calibration::{GainChoice, adc_to_pe},
    datatype::{ChannelBaseline, Event, Pulse, Waveform},
    parameters::{AssemblySettings, DigitizerSettings},
};
use dsp_common::{Channel, channel_index};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Lower and upper fractions of the sorted baseline samples which are averaged.
const TRIMMED_RANGE: (Real, Real) = (0.4, 0.6);

/// Picks the raw samples used for a channel's baseline: the first
/// `samples_per_pulse` of each pulse, excluding pulses which start at sample 0
/// or immediately after the preceding pulse.
/// Falls back to every pulse if all of them are excluded.
fn baseline_samples(pulses: &[&Pulse], samples_per_pulse: usize) -> Vec<Real> {
    let mut previous_end: Option<usize> = None;
    let mut eligible = Vec::new();
    for pulse in pulses {
        let adjacent = previous_end.is_some_and(|end| end + 1 == pulse.left());
        if pulse.left() != 0 && !adjacent {
            eligible.push(*pulse);
        }
        previous_end = Some(pulse.right());
    }
    let chosen: &[&Pulse] = if eligible.is_empty() { pulses } else { &eligible };
    chosen
        .iter()
        .flat_map(|pulse| pulse.samples().iter().take(samples_per_pulse))
        .map(|&raw| raw as Real)
        .collect()
}

/// Mean of the 40th to 60th percentile of `samples`, and the standard
/// deviation of all of them.
fn trimmed_baseline(mut samples: Vec<Real>) -> Option<ChannelBaseline> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(Real::total_cmp);
    let n = samples.len();
    let lower = (TRIMMED_RANGE.0 * n as Real) as usize;
    let upper = (TRIMMED_RANGE.1 * n as Real) as usize;
    let mean = match samples.get(lower..upper) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.iter().sum::<Real>() / trimmed.len() as Real,
        _ => samples.get(n / 2).copied()?,
    };

    let full_mean = samples.iter().sum::<Real>() / n as Real;
    let variance = samples.iter().map(|x| (x - full_mean).powi(2)).sum::<Real>() / n as Real;
    Some(ChannelBaseline {
        mean,
        stdev: variance.sqrt(),
    })
}

/// Reconstructs a full length, calibrated waveform for every live channel.
///
/// Gaps between pulses are zero. Channels which are dead, or missing from the
/// gain table, keep an all zero row.
#[tracing::instrument(skip_all, fields(event_number = event.event_number(), num_live_channels))]
pub fn assemble_channel_waveforms(
    event: &mut Event,
    digitizer: &DigitizerSettings,
    settings: &AssemblySettings,
) {
    let length = event.length();
    let mut matrix = Array2::<Real>::zeros((digitizer.n_channels, length));
    let mut baselines = vec![None; digitizer.n_channels];

    let mut by_channel = BTreeMap::<Channel, Vec<&Pulse>>::new();
    for pulse in event.pulses().iter().filter(|pulse| !pulse.is_empty()) {
        by_channel.entry(pulse.channel()).or_default().push(pulse);
    }

    let mut num_live_channels = 0;
    for (channel, mut pulses) in by_channel {
        let Some(gain) = digitizer.gain(channel) else {
            error!(channel, "Gain for channel is unknown, skipping it");
            continue;
        };
        if gain == 0.0 {
            debug!(channel, "Gain for channel is zero, assuming dead");
            continue;
        }
        let index = channel_index(channel);
        if index >= matrix.nrows() {
            continue;
        }
        pulses.sort_by_key(|pulse| pulse.left());

        let samples = baseline_samples(&pulses, settings.baseline_samples_at_start_of_pulse);
        let Some(baseline) = trimmed_baseline(samples) else {
            continue;
        };
        let to_pe = adc_to_pe(digitizer, channel, GainChoice::Calibrated);

        let mut row = matrix.row_mut(index);
        for pulse in &pulses {
            if pulse.right() >= length {
                warn!(
                    channel,
                    pulse_left = pulse.left(),
                    pulse_right = pulse.right(),
                    length,
                    "Pulse extends beyond the end of the event, truncating"
                );
            }
            for (target, &raw) in row
                .iter_mut()
                .skip(pulse.left())
                .zip(pulse.samples())
            {
                *target = (baseline.mean - raw as Real) * to_pe;
            }
        }
        if let Some(slot) = baselines.get_mut(index) {
            *slot = Some(baseline);
        }
        num_live_channels += 1;
    }

    tracing::Span::current().record("num_live_channels", num_live_channels);
    event.channel_waveforms = matrix;
    event.channel_baselines = baselines;
}

fn sum_channels(matrix: &Array2<Real>, channels: &[Channel]) -> Array1<Real> {
    let mut sum = Array1::zeros(matrix.ncols());
    for &channel in channels {
        let index = channel_index(channel);
        if index < matrix.nrows() {
            sum += &matrix.row(index);
        }
    }
    sum
}

/// Adds one summed waveform per channel group, and the combined waveform, to
/// the event. Every configured waveform is produced, even if no live channel
/// contributes to it.
#[tracing::instrument(skip_all, fields(event_number = event.event_number()))]
pub fn sum_waveforms(event: &mut Event, settings: &AssemblySettings) {
    let mut combined = Array1::<Real>::zeros(event.length());
    let mut combined_channels = Vec::new();

    for (name, channels) in &settings.channel_groups {
        let sum = sum_channels(event.channel_waveforms(), channels);
        if settings.combined.members.contains(name) {
            combined += &sum;
            combined_channels.extend_from_slice(channels);
        }
        event.append_waveform(Waveform {
            name: name.clone(),
            samples: sum.to_vec(),
            channels: channels.clone(),
        });
    }

    combined_channels.sort_unstable();
    event.append_waveform(Waveform {
        name: settings.combined.name.clone(),
        samples: combined.to_vec(),
        channels: combined_channels,
    });
}
