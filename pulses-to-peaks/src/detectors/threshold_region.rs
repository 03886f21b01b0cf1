use super::Detector;
use crate::Real;

/// A contiguous run of samples above threshold, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    pub(crate) left: usize,
    pub(crate) right: usize,
}

/// Reports each run of samples strictly above `threshold`.
///
/// The final sample of the trace is treated as below threshold, so a run
/// reaching the end is closed one sample early, and a run consisting of only
/// the final sample is not reported.
#[derive(Default, Clone)]
pub(crate) struct ThresholdRegionDetector {
    threshold: Real,
    start: Option<usize>,
    last_time: Option<usize>,
}

impl ThresholdRegionDetector {
    pub(crate) fn new(threshold: Real) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }
}

impl Detector for ThresholdRegionDetector {
    type TracePointType = (usize, Real);
    type EventPointType = Region;

    fn signal(&mut self, time: usize, value: Real) -> Option<Region> {
        self.last_time = Some(time);
        if value > self.threshold {
            self.start.get_or_insert(time);
            None
        } else {
            self.start.take().map(|left| Region {
                left,
                right: time - 1,
            })
        }
    }

    fn finish(&mut self) -> Option<Region> {
        let left = self.start.take()?;
        let right = self.last_time?.checked_sub(1)?;
        (left <= right).then_some(Region { left, right })
    }
}
