use metrics::{describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "pulses_to_peaks_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

/// Registers descriptions for every counter in [names].
pub fn describe_metrics() {
    use names::*;

    describe_counter!(EVENTS_PROCESSED, metrics::Unit::Count, "Events processed");
    describe_counter!(
        PULSES_PROCESSED,
        metrics::Unit::Count,
        "Pulses whose baseline and noise were computed"
    );
    describe_counter!(
        NOISE_PULSES,
        metrics::Unit::Count,
        "Pulses in live channels without any hits"
    );
    describe_counter!(HITS_FOUND, metrics::Unit::Count, "Hits found in pulses");
    describe_counter!(
        TOO_MANY_HITS,
        metrics::Unit::Count,
        "Pulses whose hit buffer was exhausted"
    );
    describe_counter!(
        PEAK_CANDIDATES,
        metrics::Unit::Count,
        "Candidate peaks proposed on sum waveforms"
    );
    describe_counter!(
        PEAKS_REJECTED,
        metrics::Unit::Count,
        "Candidate peaks rejected, by pruning rule"
    );
    describe_counter!(FAILURES, metrics::Unit::Count, "Failures by kind");
}

pub mod names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "pulses_to_peaks_";

    pub const EVENTS_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "events_processed");
    pub const PULSES_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "pulses_processed");
    pub const NOISE_PULSES: &str = concatcp!(METRIC_NAME_PREFIX, "noise_pulses");
    pub const HITS_FOUND: &str = concatcp!(METRIC_NAME_PREFIX, "hits_found");
    pub const TOO_MANY_HITS: &str = concatcp!(METRIC_NAME_PREFIX, "too_many_hits");
    pub const PEAK_CANDIDATES: &str = concatcp!(METRIC_NAME_PREFIX, "peak_candidates");
    pub const PEAKS_REJECTED: &str = concatcp!(METRIC_NAME_PREFIX, "peaks_rejected");
    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
}

pub mod peaks_rejected {
    // Label building function
    pub fn get_label(rule: &str) -> (&'static str, String) {
        ("rule", rule.to_owned())
    }
}

pub mod failures {
    #[derive(Debug, Clone, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        HitInvariantViolation,
        ZeroAreaHit,
        HitsOutOfOrder,
        MissingWaveform,
        DataProcessingFailed,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::HitInvariantViolation => "hit_invariant_violation",
                FailureKind::ZeroAreaHit => "zero_area_hit",
                FailureKind::HitsOutOfOrder => "hits_out_of_order",
                FailureKind::MissingWaveform => "missing_waveform",
                FailureKind::DataProcessingFailed => "data_processing_failed",
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            names::EVENTS_PROCESSED,
            names::HITS_FOUND,
            names::PEAKS_REJECTED,
            names::FAILURES,
        ] {
            assert!(name.starts_with(names::METRIC_NAME_PREFIX));
        }
    }

    #[test]
    fn failure_labels() {
        assert_eq!(
            failures::get_label(failures::FailureKind::ZeroAreaHit),
            ("failure_kind", "zero_area_hit")
        );
        assert_eq!(
            peaks_rejected::get_label("wide-s1s"),
            ("rule", "wide-s1s".to_owned())
        );
    }
}
