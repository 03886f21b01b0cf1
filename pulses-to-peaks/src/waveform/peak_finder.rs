use crate::{
    Real,
    datatype::{Event, Peak, PeakType, Waveform},
    detectors::{EventFilter, Region, ThresholdRegionDetector},
    error::DspResult,
    parameters::PeakFinderSettings,
    window::convolve_same,
};
use dsp_common::metrics::names::PEAK_CANDIDATES;
use metrics::counter;

/// Name under which the filtered waveform searched for `peak_type` is stored.
pub fn filtered_waveform_name(peak_type: PeakType) -> String {
    format!("filtered-for-{peak_type}")
}

/// Builds a candidate peak from the unfiltered samples within `region`.
fn peak_from_region(peak_type: PeakType, samples: &[Real], region: Region) -> Option<Peak> {
    let in_region = samples.get(region.left..=region.right)?;
    let (argmax, height) = in_region
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, Real)>, (i, x)| match best {
            Some((_, max)) if max >= x => best,
            _ => Some((i, x)),
        })?;
    let area = in_region.iter().sum();
    Some(Peak::new(
        peak_type,
        region.left,
        region.right,
        region.left + argmax,
        height,
        area,
    ))
}

/// Filters the configured sum waveform, then proposes a candidate peak for
/// each run of filtered samples above threshold. Heights and areas are taken
/// from the unfiltered waveform.
#[tracing::instrument(skip_all, fields(peak_type = %settings.peak_type, num_candidates))]
pub fn find_peak_candidates(event: &mut Event, settings: &PeakFinderSettings) -> DspResult<()> {
    let waveform = event.get_waveform(&settings.waveform)?;
    let filtered = convolve_same(&waveform.samples, &settings.filter_kernel);

    let candidates: Vec<Peak> = filtered
        .iter()
        .copied()
        .enumerate()
        .events(ThresholdRegionDetector::new(settings.threshold))
        .filter_map(|region| peak_from_region(settings.peak_type, &waveform.samples, region))
        .collect();
    let channels = waveform.channels.clone();

    tracing::Span::current().record("num_candidates", candidates.len());
    counter!(PEAK_CANDIDATES).increment(candidates.len() as u64);

    event.append_waveform(Waveform {
        name: filtered_waveform_name(settings.peak_type),
        samples: filtered,
        channels,
    });
    event.peaks.extend(candidates);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DspError;
    use assert_approx_eq::assert_approx_eq;

    fn event_with_tpc(samples: Vec<Real>) -> Event {
        let mut event = Event::new(0, samples.len(), Vec::new());
        event.append_waveform(Waveform {
            name: "tpc".to_owned(),
            samples,
            channels: vec![0, 1],
        });
        event
    }

    fn settings(kernel: Vec<Real>, threshold: Real) -> PeakFinderSettings {
        PeakFinderSettings {
            peak_type: PeakType::LargeS2,
            waveform: "tpc".to_owned(),
            filter_kernel: kernel,
            threshold,
        }
    }

    #[test]
    fn quantities_come_from_unfiltered_waveform() {
        let mut event = event_with_tpc(vec![0.0, 0.0, 1.0, 4.0, 1.0, 0.0, 0.0, 0.0]);
        find_peak_candidates(&mut event, &settings(vec![0.25, 0.5, 0.25], 0.2))
            .expect("tpc exists");

        // Filtered: [0, 0.25, 1.5, 2.5, 1.5, 0.25, 0, 0]
        let filtered = event
            .get_waveform("filtered-for-large-s2")
            .expect("filtered waveform is stored");
        assert_approx_eq!(filtered.samples[3], 2.5);

        assert_eq!(event.peaks().len(), 1);
        let peak = &event.peaks()[0];
        assert_eq!((peak.left(), peak.index_of_maximum(), peak.right()), (1, 3, 5));
        assert_approx_eq!(peak.height(), 4.0);
        assert_approx_eq!(peak.area(), 6.0);
        assert!(!peak.is_evaluated());
    }

    #[test]
    fn separate_regions_give_separate_peaks() {
        let mut event = event_with_tpc(vec![0.0, 3.0, 0.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0]);
        find_peak_candidates(&mut event, &settings(vec![1.0], 1.0)).expect("tpc exists");
        let bounds: Vec<_> = event.peaks().iter().map(|p| (p.left(), p.right())).collect();
        assert_eq!(bounds, vec![(1, 1), (5, 6)]);
        assert_approx_eq!(event.peaks()[1].area(), 4.0);
    }

    #[test]
    fn region_at_the_end_is_cut_short() {
        let mut event = event_with_tpc(vec![0.0, 0.0, 5.0, 5.0, 5.0]);
        find_peak_candidates(&mut event, &settings(vec![1.0], 1.0)).expect("tpc exists");
        assert_eq!(event.peaks().len(), 1);
        assert_eq!(event.peaks()[0].right(), 3);
    }

    #[test]
    fn unknown_waveform() {
        let mut event = event_with_tpc(vec![0.0; 4]);
        let mut settings = settings(vec![1.0], 1.0);
        settings.waveform = "sides".to_owned();
        assert!(matches!(
            find_peak_candidates(&mut event, &settings),
            Err(DspError::UnknownWaveform(_))
        ));
    }
}
