//! Per channel waveform reconstruction, channel group sums, and the search
//! for candidate peaks on the sums.
pub(crate) mod assembler;
pub(crate) mod peak_finder;

pub use assembler::{assemble_channel_waveforms, sum_waveforms};
pub use peak_finder::{filtered_waveform_name, find_peak_candidates};
