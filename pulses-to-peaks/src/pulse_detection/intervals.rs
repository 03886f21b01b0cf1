use crate::Real;

/// Scans `w` for intervals above `low_threshold` which contain at least one
/// sample above `high_threshold`, writing their inclusive bounds into `intervals`.
///
/// Inside an interval, each sample above the high threshold raises the low
/// threshold to `dynamic_low_threshold_coeff` times its value, if that is
/// larger. The raised threshold holds until the end of `w`.
///
/// Stops once `intervals` is full, and returns the number written.
/// Does not allocate.
pub fn find_intervals_above_threshold(
    w: &[Real],
    high_threshold: Real,
    mut low_threshold: Real,
    intervals: &mut [(usize, usize)],
    dynamic_low_threshold_coeff: Real,
) -> usize {
    let capacity = intervals.len();
    if capacity == 0 {
        return 0;
    }
    let last = w.len().saturating_sub(1);
    let mut n_intervals = 0;
    let mut start: Option<usize> = None;
    let mut qualified = false;

    for (i, &x) in w.iter().enumerate() {
        if start.is_none() && x > low_threshold {
            start = Some(i);
        }
        let Some(left) = start else {
            continue;
        };
        if x > high_threshold {
            qualified = true;
            low_threshold = low_threshold.max(dynamic_low_threshold_coeff * x);
        }
        let below = x <= low_threshold;
        if below || i == last {
            // A threshold raised on the opening sample itself leaves nothing to record
            let right = if below {
                i.checked_sub(1).filter(|&right| right >= left)
            } else {
                Some(i)
            };
            if let Some(right) = right.filter(|_| qualified) {
                if let Some(slot) = intervals.get_mut(n_intervals) {
                    *slot = (left, right);
                }
                n_intervals += 1;
                if n_intervals == capacity {
                    break;
                }
            }
            start = None;
            qualified = false;
        }
    }
    n_intervals
}
