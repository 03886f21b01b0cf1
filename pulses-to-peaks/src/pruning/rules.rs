use super::{
    NegativeExcursionSettings, NonIsolatedSettings, PruningContext, ShapeRatioSettings,
    TailSettings, WideS1sSettings,
};
use crate::{Real, datatype::Peak};

fn mean(samples: Option<&[Real]>) -> Option<Real> {
    samples
        .filter(|samples| !samples.is_empty())
        .map(|samples| samples.iter().sum::<Real>() / samples.len() as Real)
}

/// Rejects a peak if the mean signal just before or just after it exceeds a
/// fraction of its height. Windows are clipped to the waveform; an empty
/// window never objects.
pub(crate) fn non_isolated(
    settings: &NonIsolatedSettings,
    peak: &Peak,
    context: &PruningContext,
) -> Option<String> {
    let window = settings.for_type(peak.peak_type());
    let samples = context.samples;

    let before_start = peak.left().saturating_sub(window.test_before);
    let before = mean(samples.get(before_start..peak.left().min(samples.len())));
    let limit = window.before_to_height_ratio_max * peak.height();
    if let Some(before) = before.filter(|&before| before > limit) {
        return Some(format!(
            "{} samples before peak contain signal (mean {before}, which is more than {limit}, {} x peak height)",
            window.test_before, window.before_to_height_ratio_max
        ));
    }

    let after_start = (peak.right() + 1).min(samples.len());
    let after_end = (after_start + window.test_after).min(samples.len());
    let after = mean(samples.get(after_start..after_end));
    let limit = window.after_to_height_ratio_max * peak.height();
    if let Some(after) = after.filter(|&after| after > limit) {
        return Some(format!(
            "{} samples after peak contain signal (mean {after}, which is more than {limit}, {} x peak height)",
            window.test_after, window.after_to_height_ratio_max
        ));
    }
    None
}

/// Number of contiguous samples around the maximum, within the peak, at or
/// above `fraction` of its height.
pub(crate) fn width_at_fraction(samples: &[Real], peak: &Peak, fraction: Real) -> usize {
    let level = fraction * peak.height();
    let above = |i: usize| samples.get(i).is_some_and(|&x| x >= level);

    let mut left = peak.index_of_maximum();
    if !above(left) {
        return 0;
    }
    let mut right = left;
    while left > peak.left() && above(left - 1) {
        left -= 1;
    }
    while right < peak.right() && above(right + 1) {
        right += 1;
    }
    right - left + 1
}

pub(crate) fn wide_s1s(
    settings: &WideS1sSettings,
    peak: &Peak,
    context: &PruningContext,
) -> Option<String> {
    if peak.peak_type() != settings.peak_type {
        return None;
    }
    let width =
        width_at_fraction(context.samples, peak, settings.fraction) as Real * context.sample_duration;
    (width > settings.max_width).then(|| {
        format!(
            "Width at {} of maximum is {width} ns, more than the maximum {} ns",
            settings.fraction, settings.max_width
        )
    })
}

/// Height per sample of width, which must lie within the configured band.
pub(crate) fn wide_shallow_s2s(settings: &ShapeRatioSettings, peak: &Peak) -> Option<String> {
    if peak.peak_type() != settings.peak_type {
        return None;
    }
    let ratio = peak.height() / peak.width() as Real;
    (!(settings.min_ratio..=settings.max_ratio).contains(&ratio)).then(|| {
        format!(
            "Max/width ratio {ratio} is outside [{}, {}]",
            settings.min_ratio, settings.max_ratio
        )
    })
}

pub(crate) fn nearby_negative_excursions(
    settings: &NegativeExcursionSettings,
    peak: &Peak,
    context: &PruningContext,
) -> Option<String> {
    if peak.peak_type() != settings.peak_type {
        return None;
    }
    let samples = context.samples;
    let start = peak.left().saturating_sub(settings.window_before);
    let end = (peak.right() + settings.window_after + 1).min(samples.len());
    let lowest = samples
        .get(start..end)?
        .iter()
        .copied()
        .fold(Real::INFINITY, Real::min);
    (lowest < 0.0 && settings.factor * lowest.abs() > peak.height()).then(|| {
        format!(
            "Nearby negative excursion of {lowest}, height ({}) not at least {} x as large",
            peak.height(),
            settings.factor
        )
    })
}

/// Rejects peaks of the affected type starting at or after the event's tail
/// boundary. Only the S2 which sets the boundary is exempt; later S2s above the
/// amplitude threshold are rejected like any other.
pub(crate) fn in_s2_tail(
    settings: &TailSettings,
    peak: &Peak,
    context: &PruningContext,
) -> Option<String> {
    if peak.peak_type() != settings.affected_type {
        return None;
    }
    let boundary = context.tail_boundary(settings.amplitude_threshold)?;
    let sets_boundary = peak.left() == boundary
        && peak.peak_type().is_s2()
        && peak.height() > settings.amplitude_threshold;
    (peak.left() >= boundary && !sets_boundary).then(|| {
        format!(
            "{} starts at {}, at or beyond {boundary}, the start of an S2 higher than {}",
            peak.peak_type(),
            peak.left(),
            settings.amplitude_threshold
        )
    })
}
