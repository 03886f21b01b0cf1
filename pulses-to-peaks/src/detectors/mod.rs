pub(crate) mod threshold_region;

use crate::datatype::TracePoint;
use std::fmt::Debug;

pub(crate) use threshold_region::{Region, ThresholdRegionDetector};

/// Consumes trace points one at a time and reports an event whenever one completes.
pub(crate) trait Detector: Default + Clone {
    type TracePointType: TracePoint;
    type EventPointType: Debug + Clone;

    fn signal(
        &mut self,
        time: <Self::TracePointType as TracePoint>::Time,
        value: <Self::TracePointType as TracePoint>::Value,
    ) -> Option<Self::EventPointType>;

    /// Called once after the last point, to flush an event still in progress.
    fn finish(&mut self) -> Option<Self::EventPointType>;
}

#[derive(Clone)]
pub(crate) struct EventIter<I, D>
where
    I: Iterator<Item = D::TracePointType>,
    D: Detector,
{
    source: I,
    detector: D,
    finished: bool,
}

impl<I, D> Iterator for EventIter<I, D>
where
    I: Iterator<Item = D::TracePointType>,
    D: Detector,
{
    type Item = D::EventPointType;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for trace in &mut self.source {
            if let Some(event) = self.detector.signal(trace.get_time(), trace.get_value()) {
                return Some(event);
            }
        }
        self.finished = true;
        self.detector.finish()
    }
}

pub(crate) trait EventFilter<I, D>
where
    I: Iterator<Item = D::TracePointType>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D>;
}

impl<I, D> EventFilter<I, D> for I
where
    I: Iterator<Item = D::TracePointType>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D> {
        EventIter {
            source: self,
            detector,
            finished: false,
        }
    }
}
