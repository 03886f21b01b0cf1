use super::{Window, WindowFilter};
use crate::Real;
use std::collections::VecDeque;

/// Discrete convolution with a fixed kernel. The history starts zeroed, so the
/// window produces output from the first value on, matching a full convolution.
#[derive(Clone)]
pub(crate) struct ConvolutionWindow {
    kernel: Vec<Real>,
    /// Most recent value first.
    history: VecDeque<Real>,
}

impl ConvolutionWindow {
    pub(crate) fn new(kernel: &[Real]) -> Self {
        ConvolutionWindow {
            kernel: kernel.to_vec(),
            history: VecDeque::from(vec![0.0; kernel.len()]),
        }
    }

    /// Number of samples the output lags the input by, when centred.
    pub(crate) fn delay(&self) -> usize {
        self.kernel.len().saturating_sub(1) / 2
    }
}

impl Window for ConvolutionWindow {
    type TimeType = usize;
    type InputType = Real;
    type OutputType = Real;

    fn push(&mut self, value: Real) -> bool {
        self.history.pop_back();
        self.history.push_front(value);
        true
    }

    fn output(&self) -> Option<Real> {
        Some(
            self.kernel
                .iter()
                .zip(&self.history)
                .map(|(k, x)| k * x)
                .sum(),
        )
    }

    fn apply_time_shift(&self, time: usize) -> usize {
        time.saturating_sub(self.delay())
    }
}

/// Convolves `samples` with `kernel`, keeping the centred part of the same
/// length as `samples`.
pub(crate) fn convolve_same(samples: &[Real], kernel: &[Real]) -> Vec<Real> {
    let window = ConvolutionWindow::new(kernel);
    let delay = window.delay();
    samples
        .iter()
        .copied()
        .chain(std::iter::repeat_n(0.0, kernel.len().saturating_sub(1)))
        .enumerate()
        .window(window)
        .skip(delay)
        .take(samples.len())
        .map(|(_, value)| value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn full_convolution_from_first_sample() {
        let output: Vec<_> = [1.0, 2.0, 3.0]
            .into_iter()
            .enumerate()
            .window(ConvolutionWindow::new(&[1.0, 1.0]))
            .collect();
        assert_eq!(output, vec![(0, 1.0), (1, 3.0), (2, 5.0)]);
    }

    #[test]
    fn same_with_odd_kernel() {
        let output = convolve_same(&[0.0, 0.0, 4.0, 0.0, 0.0], &[0.25, 0.5, 0.25]);
        let expected = [0.0, 1.0, 2.0, 1.0, 0.0];
        assert_eq!(output.len(), expected.len());
        for (o, e) in output.iter().zip(expected) {
            assert_approx_eq!(*o, e);
        }
    }

    #[test]
    fn same_with_even_kernel() {
        // Full convolution is [1, 3, 6, 10, 14, 12, 9, 5], centred part starts at 1
        let output = convolve_same(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0; 4]);
        assert_eq!(output, vec![3.0, 6.0, 10.0, 14.0, 12.0]);

        let output = convolve_same(&[1.0, 2.0, 3.0], &[1.0, 1.0]);
        assert_eq!(output, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn asymmetric_kernel() {
        let output = convolve_same(&[0.0, 1.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(output, vec![1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn empty_input() {
        assert!(convolve_same(&[], &[1.0, 2.0, 1.0]).is_empty());
    }
}
