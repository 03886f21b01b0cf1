//! Defines the configuration consumed by every processing stage.
use crate::{Real, datatype::PeakType, error::ConfigError, pruning::PruningRule};
use dsp_common::Channel;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

mod defaults {
    use crate::Real;

    pub(super) fn sample_duration() -> Real {
        10.0
    }
    pub(super) fn voltage_range() -> Real {
        2.25
    }
    pub(super) fn bits() -> u32 {
        14
    }
    pub(super) fn reference_baseline() -> Real {
        16000.0
    }
    pub(super) fn load_resistor() -> Real {
        50.0
    }
    pub(super) fn external_amplification() -> Real {
        10.0
    }
    pub(super) fn reference_gain() -> Real {
        2.0e6
    }
    pub(super) fn combined_waveform() -> String {
        "tpc".to_owned()
    }
}

/// Digitizer and amplifier constants, and the per channel gains.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DigitizerSettings {
    pub n_channels: usize,
    /// Duration of one sample, in ns.
    #[serde(default = "defaults::sample_duration")]
    pub sample_duration: Real,
    /// Full input range, in V.
    #[serde(default = "defaults::voltage_range")]
    pub voltage_range: Real,
    #[serde(default = "defaults::bits")]
    pub bits: u32,
    /// Raw value corresponding to zero signal; also the full scale of the inverted waveform.
    #[serde(default = "defaults::reference_baseline")]
    pub reference_baseline: Real,
    /// In Ohm.
    #[serde(default = "defaults::load_resistor")]
    pub load_resistor: Real,
    #[serde(default = "defaults::external_amplification")]
    pub external_amplification: Real,
    /// Gain assumed when a channel's calibrated gain is unknown.
    #[serde(default = "defaults::reference_gain")]
    pub reference_gain: Real,
    /// Gain of each channel, zero marks a dead channel.
    pub gains: Vec<Real>,
}

impl DigitizerSettings {
    /// Gain of `channel`, or `None` if the channel is not in the gain table.
    pub fn gain(&self, channel: Channel) -> Option<Real> {
        self.gains.get(channel as usize).copied()
    }
}

/// Parameters of the hit finder. Thresholds are computed per pulse from three
/// quantities, the largest of which is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HitFinderSettings {
    /// Number of samples at the start of each pulse averaged for its baseline.
    pub initial_baseline_samples: usize,
    /// Capacity of the hit buffers. Hits beyond this in one pulse are dropped.
    pub max_hits_per_pulse: usize,
    pub height_over_noise_high_threshold: Real,
    pub height_over_noise_low_threshold: Real,
    pub absolute_adc_counts_high_threshold: Real,
    pub absolute_adc_counts_low_threshold: Real,
    pub height_over_min_high_threshold: Real,
    pub height_over_min_low_threshold: Real,
    /// Fraction of a sample above the high threshold to which the low threshold is raised.
    pub dynamic_low_threshold_coeff: Real,
    /// Length of the summed-samples window.
    pub sum_n_samples: usize,
    /// Offset of the summed-samples window from the start of the hit.
    pub sum_start: usize,
}

impl Default for HitFinderSettings {
    fn default() -> Self {
        Self {
            initial_baseline_samples: 50,
            max_hits_per_pulse: 50,
            height_over_noise_high_threshold: 5.0,
            height_over_noise_low_threshold: 2.0,
            absolute_adc_counts_high_threshold: 15.0,
            absolute_adc_counts_low_threshold: 5.0,
            height_over_min_high_threshold: 3.0,
            height_over_min_low_threshold: 1.0,
            dynamic_low_threshold_coeff: 0.0,
            sum_n_samples: 20,
            sum_start: 200,
        }
    }
}

/// The waveform summed from two channel groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CombinedGroup {
    #[serde(default = "defaults::combined_waveform")]
    pub name: String,
    pub members: [String; 2],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssemblySettings {
    /// Number of samples at the start of each eligible pulse used for the channel baseline.
    #[serde(default = "AssemblySettings::default_baseline_samples")]
    pub baseline_samples_at_start_of_pulse: usize,
    pub channel_groups: BTreeMap<String, Vec<Channel>>,
    pub combined: CombinedGroup,
}

impl AssemblySettings {
    fn default_baseline_samples() -> usize {
        23
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeakFinderSettings {
    pub peak_type: PeakType,
    /// Name of the sum waveform to search.
    #[serde(default = "defaults::combined_waveform")]
    pub waveform: String,
    pub filter_kernel: Vec<Real>,
    /// Applied to the filtered waveform, in photoelectrons per sample.
    pub threshold: Real,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PruningSettings {
    /// Name of the sum waveform inspected by the rules.
    #[serde(default = "defaults::combined_waveform")]
    pub waveform: String,
    /// Applied in this order.
    pub rules: Vec<PruningRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DspConfig {
    pub digitizer: DigitizerSettings,
    #[serde(default)]
    pub hit_finder: HitFinderSettings,
    pub assembly: AssemblySettings,
    #[serde(default)]
    pub peak_finders: Vec<PeakFinderSettings>,
    pub pruning: PruningSettings,
}

impl DspConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parses, validates, and normalises the filter kernels.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Names of every waveform the assembler is guaranteed to produce.
    pub fn waveform_names(&self) -> impl Iterator<Item = &str> {
        self.assembly
            .channel_groups
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(self.assembly.combined.name.as_str()))
    }

    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let digitizer = &self.digitizer;
        if digitizer.n_channels == 0 {
            return Err(ConfigError::Invalid("n-channels must be positive".to_owned()));
        }
        if digitizer.gains.len() != digitizer.n_channels {
            return Err(ConfigError::Invalid(format!(
                "{} gains given for {} channels",
                digitizer.gains.len(),
                digitizer.n_channels
            )));
        }
        if digitizer.sample_duration <= 0.0 {
            return Err(ConfigError::Invalid(
                "sample-duration must be positive".to_owned(),
            ));
        }
        if self.hit_finder.max_hits_per_pulse == 0 {
            return Err(ConfigError::Invalid(
                "max-hits-per-pulse must be positive".to_owned(),
            ));
        }
        if !(0.0..1.0).contains(&self.hit_finder.dynamic_low_threshold_coeff) {
            return Err(ConfigError::Invalid(
                "dynamic-low-threshold-coeff must lie in [0, 1)".to_owned(),
            ));
        }
        let hit_finder = &self.hit_finder;
        for (name, value) in [
            (
                "height-over-noise-high-threshold",
                hit_finder.height_over_noise_high_threshold,
            ),
            (
                "absolute-adc-counts-high-threshold",
                hit_finder.absolute_adc_counts_high_threshold,
            ),
            (
                "height-over-min-high-threshold",
                hit_finder.height_over_min_high_threshold,
            ),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        if self.hit_finder.initial_baseline_samples == 0 {
            return Err(ConfigError::Invalid(
                "initial-baseline-samples must be positive".to_owned(),
            ));
        }
        for (group, members) in &self.assembly.channel_groups {
            if let Some(channel) = members
                .iter()
                .find(|&&channel| channel as usize >= digitizer.n_channels)
            {
                return Err(ConfigError::Invalid(format!(
                    "Group {group} contains channel {channel}, beyond the {} channels",
                    digitizer.n_channels
                )));
            }
        }
        let combined = &self.assembly.combined;
        if let Some(member) = combined
            .members
            .iter()
            .find(|member| !self.assembly.channel_groups.contains_key(member.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "Combined waveform {} refers to unknown group {member}",
                combined.name
            )));
        }
        if self.assembly.channel_groups.contains_key(&combined.name) {
            return Err(ConfigError::Invalid(format!(
                "Combined waveform {} shadows a channel group",
                combined.name
            )));
        }

        let waveform_names: Vec<String> = self.waveform_names().map(str::to_owned).collect();
        let is_known = |name: &str| waveform_names.iter().any(|known| known == name);

        for finder in &mut self.peak_finders {
            if !is_known(&finder.waveform) {
                return Err(ConfigError::Invalid(format!(
                    "Peak finder for {} searches unknown waveform {}",
                    finder.peak_type, finder.waveform
                )));
            }
            let sum: Real = finder.filter_kernel.iter().sum();
            if finder.filter_kernel.is_empty() || sum == 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "Filter kernel for {} must be non-empty with a non-zero sum",
                    finder.peak_type
                )));
            }
            finder.filter_kernel.iter_mut().for_each(|c| *c /= sum);
        }
        if !is_known(&self.pruning.waveform) {
            return Err(ConfigError::Invalid(format!(
                "Pruning inspects unknown waveform {}",
                self.pruning.waveform
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    pub(crate) const TEST_CONFIG: &str = r#"{
        "digitizer": {
            "n-channels": 6,
            "gains": [2e6, 2e6, 0, 2e6, 2e6, 2e6]
        },
        "hit-finder": {
            "initial-baseline-samples": 40,
            "max-hits-per-pulse": 10,
            "height-over-noise-high-threshold": 0,
            "height-over-noise-low-threshold": 0,
            "absolute-adc-counts-high-threshold": 50,
            "absolute-adc-counts-low-threshold": 5,
            "height-over-min-high-threshold": 0,
            "height-over-min-low-threshold": 0,
            "dynamic-low-threshold-coeff": 0.0
        },
        "assembly": {
            "baseline-samples-at-start-of-pulse": 20,
            "channel-groups": {
                "top": [0, 1, 2],
                "bottom": [3, 4],
                "veto": [5]
            },
            "combined": { "name": "tpc", "members": ["top", "bottom"] }
        },
        "peak-finders": [
            {
                "peak-type": "large-s2",
                "waveform": "tpc",
                "filter-kernel": [1, 2, 1],
                "threshold": 0.05
            }
        ],
        "pruning": {
            "rules": [
                { "rule": "non-isolated" },
                { "rule": "s2s-in-s2-tails" }
            ]
        }
    }"#;

    #[test]
    fn parse_and_normalise() {
        let config = DspConfig::from_json_str(TEST_CONFIG).expect("config should parse");
        assert_eq!(config.digitizer.n_channels, 6);
        assert_approx_eq!(config.digitizer.sample_duration, 10.0);
        assert_eq!(config.digitizer.gain(2), Some(0.0));
        assert_eq!(config.digitizer.gain(6), None);
        assert_eq!(config.hit_finder.max_hits_per_pulse, 10);
        assert_eq!(config.hit_finder.sum_n_samples, 20);
        assert_eq!(config.pruning.waveform, "tpc");
        assert_eq!(config.pruning.rules.len(), 2);

        let kernel = &config.peak_finders[0].filter_kernel;
        assert_approx_eq!(kernel[0], 0.25);
        assert_approx_eq!(kernel[1], 0.5);
        assert_approx_eq!(kernel[2], 0.25);

        let names: Vec<_> = config.waveform_names().collect();
        assert_eq!(names, vec!["bottom", "top", "veto", "tpc"]);
    }

    #[test]
    fn gains_must_match_channels() {
        let json = TEST_CONFIG.replace("\"n-channels\": 6", "\"n-channels\": 7");
        assert!(matches!(
            DspConfig::from_json_str(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_combined_member() {
        let json = TEST_CONFIG.replace("[\"top\", \"bottom\"]", "[\"top\", \"middle\"]");
        assert!(matches!(
            DspConfig::from_json_str(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_peak_finder_waveform() {
        let json = TEST_CONFIG.replace("\"waveform\": \"tpc\"", "\"waveform\": \"sides\"");
        assert!(matches!(
            DspConfig::from_json_str(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_hit_capacity() {
        let json = TEST_CONFIG.replace("\"max-hits-per-pulse\": 10", "\"max-hits-per-pulse\": 0");
        assert!(matches!(
            DspConfig::from_json_str(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn negative_high_threshold() {
        let json = TEST_CONFIG.replace(
            "\"absolute-adc-counts-high-threshold\": 50",
            "\"absolute-adc-counts-high-threshold\": -5",
        );
        assert!(matches!(
            DspConfig::from_json_str(&json),
            Err(ConfigError::Invalid(message)) if message.contains("absolute-adc-counts-high-threshold")
        ));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            DspConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }
}
