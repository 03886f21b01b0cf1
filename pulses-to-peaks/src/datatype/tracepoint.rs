use super::Temporal;

/// An abstraction of the types that are processed by the windows and detectors.
/// To implement TracePoint a type must contain time data and a value.
pub(crate) trait TracePoint: Clone {
    /// The type which represents the time of the data point.
    /// This should be trivially copyable (usually a scalar).
    type Time: Temporal;

    /// The type which contains the value of the data point.
    type Value: Copy;

    /// Returns the time of the data point.
    fn get_time(&self) -> Self::Time;

    /// Returns the value of the data point.
    fn get_value(&self) -> Self::Value;
}

/// The first element is the time and the second the value.
impl<X, Y> TracePoint for (X, Y)
where
    X: Temporal,
    Y: Copy,
{
    type Time = X;
    type Value = Y;

    fn get_time(&self) -> Self::Time {
        self.0
    }

    fn get_value(&self) -> Self::Value {
        self.1
    }
}
