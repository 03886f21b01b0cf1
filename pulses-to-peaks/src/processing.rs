use crate::{
    datatype::{Event, EventRecord},
    error::{DspError, DspResult},
    parameters::DspConfig,
    pruning::prune_peaks,
    pulse_detection::{HitBuffers, find_hits},
    waveform::{assemble_channel_waveforms, find_peak_candidates, sum_waveforms},
};
use dsp_common::metrics::{
    failures::{self, FailureKind},
    names::{EVENTS_PROCESSED, FAILURES},
};
use metrics::counter;
use rayon::prelude::*;
use tracing::error;

fn failure_kind(error: &DspError) -> FailureKind {
    match error {
        DspError::HitInvariantViolation(_) => FailureKind::HitInvariantViolation,
        DspError::ZeroAreaCenter { .. } => FailureKind::ZeroAreaHit,
        DspError::HitsOutOfOrder { .. } => FailureKind::HitsOutOfOrder,
        DspError::UnknownWaveform(_) => FailureKind::MissingWaveform,
        DspError::PulsePropertiesAlreadySet { .. } => FailureKind::DataProcessingFailed,
    }
}

/// Runs every stage on one event: hit finding, waveform assembly, peak
/// finding with each configured finder, and the pruning chain.
#[tracing::instrument(skip_all, fields(event_number = event.event_number(), num_hits, num_peaks))]
pub fn process_event(
    mut event: Event,
    config: &DspConfig,
    buffers: &mut HitBuffers,
) -> DspResult<Event> {
    find_hits(&mut event, &config.digitizer, &config.hit_finder, buffers)?;
    assemble_channel_waveforms(&mut event, &config.digitizer, &config.assembly);
    sum_waveforms(&mut event, &config.assembly);
    for finder in &config.peak_finders {
        find_peak_candidates(&mut event, finder)?;
    }
    prune_peaks(
        &mut event,
        &config.pruning.waveform,
        config.digitizer.sample_duration,
        &config.pruning.rules,
    )?;

    let span = tracing::Span::current();
    span.record("num_hits", event.hits().len());
    span.record("num_peaks", event.peaks().len());
    counter!(EVENTS_PROCESSED).increment(1);
    Ok(event)
}

/// Processes independent events in parallel, each thread reusing its own
/// hit buffers. Events which fail are logged, counted and left out of the
/// result, which otherwise keeps the input order.
#[tracing::instrument(skip_all, fields(num_events = records.len()))]
pub fn process_events(records: Vec<EventRecord>, config: &DspConfig) -> Vec<Event> {
    let processed: Vec<Option<Event>> = records
        .into_par_iter()
        .map_init(
            || HitBuffers::new(config.hit_finder.max_hits_per_pulse),
            |buffers, record| {
                let event_number = record.event_number;
                process_event(Event::from(record), config, buffers)
                    .inspect_err(|e| {
                        error!(event_number, "Event processing failed: {e}");
                        counter!(FAILURES, &[failures::get_label(failure_kind(e))]).increment(1);
                    })
                    .ok()
            },
        )
        .collect();
    processed.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calibration::{GainChoice, adc_to_pe},
        datatype::{PeakType, Pulse, PruningState},
        parameters::tests::TEST_CONFIG,
        pulse_detection::hit_builder::tests::triangle_pulse,
    };
    use assert_approx_eq::assert_approx_eq;

    fn config() -> DspConfig {
        DspConfig::from_json_str(TEST_CONFIG).expect("test config should parse")
    }

    fn triangle_event(event_number: u64) -> Event {
        Event::new(
            event_number,
            1000,
            vec![
                Pulse::new(0, 0, triangle_pulse(1000, 410, 10, 500)),
                Pulse::new(2, 100, triangle_pulse(200, 100, 10, 500)),
                Pulse::new(3, 600, vec![15900; 50]),
            ],
        )
    }

    #[test]
    fn triangle_end_to_end() {
        let config = config();
        let mut buffers = HitBuffers::new(config.hit_finder.max_hits_per_pulse);
        let event = process_event(triangle_event(1), &config, &mut buffers)
            .expect("event should process");
        let to_pe = adc_to_pe(&config.digitizer, 0, GainChoice::Calibrated);

        // Hits: only the live channel with signal
        assert_eq!(event.hits().len(), 1);
        let hit = &event.hits()[0];
        assert_eq!((hit.left(), hit.index_of_maximum(), hit.right()), (401, 410, 419));
        assert_approx_eq!(hit.area(), 5000.0 * to_pe, 1e-9);
        assert_eq!(event.hits_in_pulse(0).count(), 1);
        assert_eq!(event.noise_pulses_in(3), 1);
        assert_eq!(event.noise_pulses_in(2), 0);

        // Waveforms: the dead channel does not contribute, veto is all zero
        let top = event.get_waveform("top").expect("top is present");
        assert_approx_eq!(top.samples[410], 500.0 * to_pe, 1e-9);
        assert!(event.channel_waveforms().row(2).iter().all(|&x| x == 0.0));
        let veto = event.get_waveform("veto").expect("veto is present");
        assert!(veto.samples.iter().all(|&x| x == 0.0));
        assert!(event.get_waveform("filtered-for-large-s2").is_ok());

        // One candidate covering the triangle, widened by the filter, and accepted
        assert_eq!(event.peaks().len(), 1);
        let peak = &event.peaks()[0];
        assert_eq!(peak.peak_type(), PeakType::LargeS2);
        assert_eq!((peak.left(), peak.index_of_maximum(), peak.right()), (400, 410, 420));
        assert_approx_eq!(peak.height(), 500.0 * to_pe, 1e-9);
        assert_approx_eq!(peak.area(), 5000.0 * to_pe, 1e-9);
        assert_eq!(peak.pruning(), &PruningState::Accepted);
        assert_eq!(event.accepted_peaks().count(), 1);
    }

    #[test]
    fn failed_events_are_dropped() {
        let mut config = config();
        // Low threshold far below zero, so the interval swallows the undershoot before
        // the spike and its area falls below the height
        config.hit_finder.absolute_adc_counts_low_threshold = -100.0;
        config.hit_finder.height_over_noise_low_threshold = -100.0;
        config.hit_finder.height_over_min_low_threshold = -100.0;

        let flat = EventRecord {
            event_number: 1,
            length: 100,
            pulses: vec![Pulse::new(0, 10, vec![15900; 80])],
        };
        let mut samples = vec![15900; 40];
        samples.extend([15908; 20]);
        samples.push(15840);
        samples.extend([15900; 5]);
        let undershoot = EventRecord {
            event_number: 2,
            length: 100,
            pulses: vec![Pulse::new(0, 10, samples)],
        };
        let also_flat = EventRecord {
            event_number: 3,
            length: 100,
            pulses: vec![Pulse::new(1, 10, vec![15900; 80])],
        };

        let events = process_events(vec![flat, undershoot, also_flat], &config);
        let numbers: Vec<_> = events.iter().map(Event::event_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(events[0].noise_pulses_in(0), 1);
        assert_eq!(events[1].noise_pulses_in(1), 1);
    }

    #[test]
    fn parallel_results_keep_input_order() {
        let config = config();
        let records: Vec<_> = (0..16)
            .map(|n| {
                let event = triangle_event(n);
                EventRecord {
                    event_number: event.event_number(),
                    length: event.length(),
                    pulses: event.pulses().to_vec(),
                }
            })
            .collect();
        let events = process_events(records, &config);
        let numbers: Vec<_> = events.iter().map(Event::event_number).collect();
        assert_eq!(numbers, (0..16).collect::<Vec<_>>());
        assert!(events.iter().all(|event| event.hits().len() == 1));
    }
}
