//! An ordered chain of rules which accept or reject candidate peaks.
//!
//! Each rule inspects one peak at a time and either has no objection or gives
//! a reason for rejecting it. The first rule to reject a peak wins, later rules
//! skip it.
pub(crate) mod rules;

use crate::{
    Real,
    datatype::{Event, Peak, PeakType},
    error::DspResult,
};
use dsp_common::{SampleIndex, metrics::names::PEAKS_REJECTED, metrics::peaks_rejected};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifies the rule which rejected a peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RuleName {
    NonIsolated,
    WideS1s,
    WideShallowS2s,
    S1sWithNearbyNegativeExcursions,
    S1sInS2Tails,
    S2sInS2Tails,
}

/// Window lengths and ratio limits of the isolation test for one peak type.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IsolationWindow {
    pub test_before: usize,
    pub test_after: usize,
    pub before_to_height_ratio_max: Real,
    pub after_to_height_ratio_max: Real,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NonIsolatedSettings {
    pub s1: IsolationWindow,
    pub large_s2: IsolationWindow,
    pub small_s2: IsolationWindow,
}

impl Default for NonIsolatedSettings {
    fn default() -> Self {
        Self {
            s1: IsolationWindow {
                test_before: 50,
                test_after: 10,
                before_to_height_ratio_max: 0.01,
                after_to_height_ratio_max: 0.04,
            },
            large_s2: IsolationWindow {
                test_before: 21,
                test_after: 21,
                before_to_height_ratio_max: 0.05,
                after_to_height_ratio_max: 0.05,
            },
            small_s2: IsolationWindow {
                test_before: 10,
                test_after: 10,
                before_to_height_ratio_max: 0.05,
                after_to_height_ratio_max: 0.05,
            },
        }
    }
}

impl NonIsolatedSettings {
    pub fn for_type(&self, peak_type: PeakType) -> &IsolationWindow {
        match peak_type {
            PeakType::S1 => &self.s1,
            PeakType::LargeS2 => &self.large_s2,
            PeakType::SmallS2 => &self.small_s2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WideS1sSettings {
    pub peak_type: PeakType,
    /// Fraction of the height at which the width is measured.
    pub fraction: Real,
    /// In ns.
    pub max_width: Real,
}

impl Default for WideS1sSettings {
    fn default() -> Self {
        Self {
            peak_type: PeakType::S1,
            fraction: 0.25,
            max_width: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ShapeRatioSettings {
    pub peak_type: PeakType,
    pub min_ratio: Real,
    pub max_ratio: Real,
}

impl Default for ShapeRatioSettings {
    fn default() -> Self {
        Self {
            peak_type: PeakType::SmallS2,
            min_ratio: 0.0,
            max_ratio: 0.062451,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NegativeExcursionSettings {
    pub peak_type: PeakType,
    pub window_before: usize,
    pub window_after: usize,
    pub factor: Real,
}

impl Default for NegativeExcursionSettings {
    fn default() -> Self {
        Self {
            peak_type: PeakType::S1,
            window_before: 500,
            window_after: 100,
            factor: 3.0,
        }
    }
}

/// Rejects peaks of `affected_type` starting at or after the earliest S2
/// higher than `amplitude_threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailSettings {
    pub affected_type: PeakType,
    pub amplitude_threshold: Real,
}

mod defaults {
    use crate::{Real, datatype::PeakType};

    pub(super) fn s1_tail_affected_type() -> PeakType {
        PeakType::S1
    }
    pub(super) fn s1_tail_amplitude_threshold() -> Real {
        3.12255
    }
    pub(super) fn s2_tail_affected_type() -> PeakType {
        PeakType::SmallS2
    }
    pub(super) fn s2_tail_amplitude_threshold() -> Real {
        624.151
    }
}

/// One configured entry of the pruning chain, tagged by its rule name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum PruningRule {
    NonIsolated(NonIsolatedSettings),
    WideS1s(WideS1sSettings),
    WideShallowS2s(ShapeRatioSettings),
    S1sWithNearbyNegativeExcursions(NegativeExcursionSettings),
    #[serde(rename_all = "kebab-case")]
    S1sInS2Tails {
        #[serde(default = "defaults::s1_tail_affected_type")]
        affected_type: PeakType,
        #[serde(default = "defaults::s1_tail_amplitude_threshold")]
        amplitude_threshold: Real,
    },
    #[serde(rename_all = "kebab-case")]
    S2sInS2Tails {
        #[serde(default = "defaults::s2_tail_affected_type")]
        affected_type: PeakType,
        #[serde(default = "defaults::s2_tail_amplitude_threshold")]
        amplitude_threshold: Real,
    },
}

impl PruningRule {
    pub fn name(&self) -> RuleName {
        match self {
            PruningRule::NonIsolated(_) => RuleName::NonIsolated,
            PruningRule::WideS1s(_) => RuleName::WideS1s,
            PruningRule::WideShallowS2s(_) => RuleName::WideShallowS2s,
            PruningRule::S1sWithNearbyNegativeExcursions(_) => {
                RuleName::S1sWithNearbyNegativeExcursions
            }
            PruningRule::S1sInS2Tails { .. } => RuleName::S1sInS2Tails,
            PruningRule::S2sInS2Tails { .. } => RuleName::S2sInS2Tails,
        }
    }

    fn tail_settings(&self) -> Option<TailSettings> {
        match *self {
            PruningRule::S1sInS2Tails {
                affected_type,
                amplitude_threshold,
            }
            | PruningRule::S2sInS2Tails {
                affected_type,
                amplitude_threshold,
            } => Some(TailSettings {
                affected_type,
                amplitude_threshold,
            }),
            _ => None,
        }
    }

    /// Returns the reason this rule rejects `peak`, if it does.
    pub fn evaluate(&self, peak: &Peak, context: &PruningContext) -> Option<String> {
        match self {
            PruningRule::NonIsolated(settings) => rules::non_isolated(settings, peak, context),
            PruningRule::WideS1s(settings) => rules::wide_s1s(settings, peak, context),
            PruningRule::WideShallowS2s(settings) => rules::wide_shallow_s2s(settings, peak),
            PruningRule::S1sWithNearbyNegativeExcursions(settings) => {
                rules::nearby_negative_excursions(settings, peak, context)
            }
            PruningRule::S1sInS2Tails { .. } | PruningRule::S2sInS2Tails { .. } => self
                .tail_settings()
                .and_then(|settings| rules::in_s2_tail(&settings, peak, context)),
        }
    }
}

/// Earliest start of an S2 candidate higher than `amplitude_threshold`.
fn earliest_s2_above(peaks: &[Peak], amplitude_threshold: Real) -> Option<SampleIndex> {
    peaks
        .iter()
        .filter(|peak| peak.peak_type().is_s2() && peak.height() > amplitude_threshold)
        .map(Peak::left)
        .min()
}

/// What the rules may look at besides the peak itself. Built once per event,
/// before any rule runs.
pub struct PruningContext<'a> {
    /// The waveform the peaks were found on.
    pub samples: &'a [Real],
    /// In ns.
    pub sample_duration: Real,
    /// Tail boundary per amplitude threshold of the configured tail rules.
    tail_boundaries: Vec<(Real, Option<SampleIndex>)>,
}

impl<'a> PruningContext<'a> {
    pub fn new(
        samples: &'a [Real],
        sample_duration: Real,
        peaks: &[Peak],
        rules: &[PruningRule],
    ) -> Self {
        let tail_boundaries = rules
            .iter()
            .filter_map(PruningRule::tail_settings)
            .map(|settings| {
                (
                    settings.amplitude_threshold,
                    earliest_s2_above(peaks, settings.amplitude_threshold),
                )
            })
            .collect();
        Self {
            samples,
            sample_duration,
            tail_boundaries,
        }
    }

    /// Start of the earliest candidate S2 above `amplitude_threshold` in this
    /// event, or `None` if there is no such S2.
    pub fn tail_boundary(&self, amplitude_threshold: Real) -> Option<SampleIndex> {
        self.tail_boundaries
            .iter()
            .find(|(threshold, _)| *threshold == amplitude_threshold)
            .and_then(|(_, boundary)| *boundary)
    }
}

/// Runs `rules` in order over every peak in `peaks`. Every peak ends up
/// evaluated; a peak rejected by one rule is not shown to the later ones.
pub fn run_pruning_chain(peaks: &mut [Peak], rules: &[PruningRule], context: &PruningContext) {
    peaks.iter_mut().for_each(Peak::mark_evaluated);
    for rule in rules {
        let name = rule.name();
        for (index, peak) in peaks.iter_mut().enumerate() {
            if peak.is_rejected() {
                continue;
            }
            if let Some(reason) = rule.evaluate(peak, context) {
                debug!(peak_index = index, rule = %name, reason = %reason, "Peak rejected");
                counter!(PEAKS_REJECTED, &[peaks_rejected::get_label(&name.to_string())])
                    .increment(1);
                peak.reject(reason, name);
            }
        }
    }
}

/// Applies the configured pruning chain to the event's candidate peaks.
#[tracing::instrument(skip_all, fields(event_number = event.event_number(), num_accepted))]
pub fn prune_peaks(
    event: &mut Event,
    waveform: &str,
    sample_duration: Real,
    rules: &[PruningRule],
) -> DspResult<()> {
    let samples = event.get_waveform(waveform)?.samples.clone();
    let mut peaks = std::mem::take(&mut event.peaks);
    let context = PruningContext::new(&samples, sample_duration, &peaks, rules);
    run_pruning_chain(&mut peaks, rules, &context);
    event.peaks = peaks;

    tracing::Span::current().record("num_accepted", event.accepted_peaks().count());
    Ok(())
}
