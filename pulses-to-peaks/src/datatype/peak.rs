use crate::{Real, pruning::RuleName};
use dsp_common::SampleIndex;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PeakType {
    S1,
    LargeS2,
    SmallS2,
}

impl PeakType {
    pub fn is_s2(self) -> bool {
        matches!(self, PeakType::LargeS2 | PeakType::SmallS2)
    }
}

/// Outcome of the pruning chain for one peak. Once rejected, a peak stays rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PruningState {
    #[default]
    Unevaluated,
    Accepted,
    Rejected {
        reason: String,
        rejected_by: RuleName,
    },
}

/// A candidate or accepted cluster of signal on a sum waveform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Peak {
    pub(crate) peak_type: PeakType,
    pub(crate) left: SampleIndex,
    pub(crate) right: SampleIndex,
    pub(crate) index_of_maximum: SampleIndex,
    pub(crate) height: Real,
    pub(crate) area: Real,
    pub(crate) pruning: PruningState,
}

impl Peak {
    pub fn new(
        peak_type: PeakType,
        left: SampleIndex,
        right: SampleIndex,
        index_of_maximum: SampleIndex,
        height: Real,
        area: Real,
    ) -> Self {
        Self {
            peak_type,
            left,
            right,
            index_of_maximum,
            height,
            area,
            pruning: PruningState::Unevaluated,
        }
    }

    pub fn peak_type(&self) -> PeakType {
        self.peak_type
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

    pub fn height(&self) -> Real {
        self.height
    }

    pub fn area(&self) -> Real {
        self.area
    }

    /// Number of samples spanned, bounds inclusive.
    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn pruning(&self) -> &PruningState {
        &self.pruning
    }

    pub fn is_evaluated(&self) -> bool {
        !matches!(self.pruning, PruningState::Unevaluated)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.pruning, PruningState::Rejected { .. })
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.pruning {
            PruningState::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn rejected_by(&self) -> Option<RuleName> {
        match &self.pruning {
            PruningState::Rejected { rejected_by, .. } => Some(*rejected_by),
            _ => None,
        }
    }

    /// Moves an unevaluated peak to accepted. Has no effect otherwise.
    pub(crate) fn mark_evaluated(&mut self) {
        if let PruningState::Unevaluated = self.pruning {
            self.pruning = PruningState::Accepted;
        }
    }

    /// Rejects the peak unless an earlier rule already did.
    /// Returns whether the state changed.
    pub(crate) fn reject(&mut self, reason: String, rejected_by: RuleName) -> bool {
        if self.is_rejected() {
            return false;
        }
        self.pruning = PruningState::Rejected {
            reason,
            rejected_by,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn peak_type_names() {
        assert_eq!(PeakType::LargeS2.to_string(), "large-s2");
        assert_eq!(PeakType::from_str("small-s2").ok(), Some(PeakType::SmallS2));
        assert!(PeakType::SmallS2.is_s2());
        assert!(!PeakType::S1.is_s2());
    }

    #[test]
    fn first_rejection_wins() {
        let mut peak = Peak::new(PeakType::S1, 10, 20, 15, 2.0, 10.0);
        assert!(!peak.is_evaluated());
        peak.mark_evaluated();
        assert_eq!(peak.pruning(), &PruningState::Accepted);

        assert!(peak.reject("first".to_owned(), RuleName::WideS1s));
        assert!(!peak.reject("second".to_owned(), RuleName::NonIsolated));
        assert_eq!(peak.rejection_reason(), Some("first"));
        assert_eq!(peak.rejected_by(), Some(RuleName::WideS1s));

        peak.mark_evaluated();
        assert!(peak.is_rejected());
    }

    #[test]
    fn width_is_inclusive() {
        let peak = Peak::new(PeakType::SmallS2, 10, 10, 10, 1.0, 1.0);
        assert_eq!(peak.width(), 1);
    }
}
