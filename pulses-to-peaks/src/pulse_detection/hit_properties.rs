use crate::{
    Real,
    error::{DspError, DspResult},
};

/// For each interval, writes the index of its maximum and its center of mass,
/// both relative to the interval start, and its area.
///
/// The output slices must be at least as long as `intervals`; only the
/// leading entries are written. Does not allocate.
pub fn compute_hit_properties(
    w: &[Real],
    intervals: &[(usize, usize)],
    index_of_maxima: &mut [usize],
    areas: &mut [Real],
    centers: &mut [Real],
) -> DspResult<()> {
    let outputs = index_of_maxima
        .iter_mut()
        .zip(areas.iter_mut())
        .zip(centers.iter_mut());
    for (&(left, right), ((index_of_maximum, area), center)) in intervals.iter().zip(outputs) {
        let samples = w.get(left..=right).unwrap_or_default();
        let mut max_value = Real::NEG_INFINITY;
        let mut argmax = 0;
        let mut sum = 0.0;
        let mut moment = 0.0;
        for (i, &x) in samples.iter().enumerate() {
            if x > max_value {
                max_value = x;
                argmax = i;
            }
            sum += x;
            moment += i as Real * x;
        }
        if sum == 0.0 {
            return Err(DspError::ZeroAreaCenter { left, right });
        }
        *index_of_maximum = argmax;
        *area = sum;
        *center = moment / sum;
    }
    Ok(())
}
