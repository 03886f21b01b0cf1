//! Small numeric helpers shared between stages.
use crate::{
    Real,
    datatype::Hit,
    error::{DspError, DspResult},
};
use dsp_common::Channel;
use std::collections::{BTreeMap, HashMap};

/// Returns the number of hit-free samples before each hit.
/// The gap of the first hit is 0 by definition.
/// Hits must be sorted by left boundary, this is checked.
pub fn gaps_between_hits(hits: &[Hit]) -> DspResult<Vec<usize>> {
    let Some(first) = hits.first() else {
        return Ok(Vec::new());
    };
    let mut gaps = Vec::with_capacity(hits.len());
    gaps.push(0);
    // Running right boundary
    let mut boundary = first.right();
    let mut last_left = first.left();
    for (i, hit) in hits.iter().enumerate().skip(1) {
        if hit.left() < last_left {
            return Err(DspError::HitsOutOfOrder {
                index: i,
                left: hit.left(),
                previous_left: last_left,
            });
        }
        gaps.push(hit.left().saturating_sub(boundary + 1));
        boundary = boundary.max(hit.right());
        last_left = hit.left();
    }
    Ok(gaps)
}

/// Counts hits in each channel, optionally adding up `weights` instead of ones.
pub fn count_hits_per_channel(
    hits: &[Hit],
    n_channels: usize,
    weights: Option<&[Real]>,
) -> Vec<Real> {
    let mut counts = vec![0.0; n_channels];
    for (i, hit) in hits.iter().enumerate() {
        if let Some(count) = counts.get_mut(hit.channel() as usize) {
            *count += weights.and_then(|w| w.get(i)).copied().unwrap_or(1.0);
        }
    }
    counts
}

/// Inverts a group to channels table into a channel to group lookup.
pub fn group_by_channel(groups: &BTreeMap<String, Vec<Channel>>) -> HashMap<Channel, &str> {
    groups
        .iter()
        .flat_map(|(name, channels)| channels.iter().map(move |&ch| (ch, name.as_str())))
        .collect()
}

/// Sorts `values` and splits the sorted sequence wherever consecutive values
/// are more than `diff_threshold` apart. `pick` maps each sorted position and
/// its value into the cluster element.
fn split_sorted<T>(
    values: &[Real],
    diff_threshold: Real,
    pick: impl Fn(usize, Real) -> T,
) -> Vec<Vec<T>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(Real::total_cmp);

    let mut clusters = Vec::new();
    let mut current = Vec::new();
    let mut previous: Option<Real> = None;
    for (position, &value) in sorted.iter().enumerate() {
        if previous.is_some_and(|previous| value - previous > diff_threshold) {
            clusters.push(std::mem::take(&mut current));
        }
        current.push(pick(position, value));
        previous = Some(value);
    }
    if !current.is_empty() {
        clusters.push(current);
    }
    clusters
}

/// Sorts `values` and splits them into clusters wherever consecutive values
/// are more than `diff_threshold` apart.
pub fn cluster_by_diff(values: &[Real], diff_threshold: Real) -> Vec<Vec<Real>> {
    split_sorted(values, diff_threshold, |_, value| value)
}

/// As [cluster_by_diff], but returns positions in the sorted sequence rather
/// than the values. These are not indices into the unsorted `values`.
pub fn cluster_indices_by_diff(values: &[Real], diff_threshold: Real) -> Vec<Vec<usize>> {
    split_sorted(values, diff_threshold, |position, _| position)
}
