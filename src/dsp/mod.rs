//! Frequency-domain convolution and small block helpers shared by the
//! rendering pipelines.

pub mod filters;

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Symmetric Hann window of the given length.
pub fn hann_window(len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / (len - 1) as f32).cos())
        .collect()
}

/// FFT convolution engine. Owns a planner so repeated chunk convolutions
/// reuse cached plans.
pub struct Convolver {
    planner: FftPlanner<f32>,
}

impl Default for Convolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Convolver {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Full linear convolution, length `signal + kernel - 1`.
    pub fn convolve_full(&mut self, signal: &[f32], kernel: &[f32]) -> Vec<f32> {
        if signal.is_empty() || kernel.is_empty() {
            return Vec::new();
        }

        let output_length = signal.len() + kernel.len() - 1;
        let fft_size = output_length.next_power_of_two();

        let fft = self.planner.plan_fft_forward(fft_size);
        let ifft = self.planner.plan_fft_inverse(fft_size);

        let mut signal_c: Vec<Complex<f32>> = signal
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(fft_size)
            .collect();
        let mut kernel_c: Vec<Complex<f32>> = kernel
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(fft_size)
            .collect();

        fft.process(&mut signal_c);
        fft.process(&mut kernel_c);

        for (s, k) in signal_c.iter_mut().zip(kernel_c.iter()) {
            *s *= k;
        }

        ifft.process(&mut signal_c);

        let scale = 1.0 / fft_size as f32;
        signal_c
            .iter()
            .take(output_length)
            .map(|c| c.re * scale)
            .collect()
    }

    /// Convolution trimmed to the signal's length, centered on the full
    /// result (the kernel's group delay is split evenly around each sample).
    pub fn convolve_same(&mut self, signal: &[f32], kernel: &[f32]) -> Vec<f32> {
        if signal.is_empty() || kernel.is_empty() {
            return vec![0.0; signal.len()];
        }
        let full = self.convolve_full(signal, kernel);
        let start = (kernel.len() - 1) / 2;
        full[start..start + signal.len()].to_vec()
    }
}

/// Shifts a signal right by `delay` samples, keeping the original length.
pub fn delay_samples(signal: &[f32], delay: usize) -> Vec<f32> {
    let mut out = vec![0.0; signal.len()];
    if delay < signal.len() {
        out[delay..].copy_from_slice(&signal[..signal.len() - delay]);
    }
    out
}

/// Peak across a pair of channels.
pub fn stereo_peak(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .chain(right.iter())
        .fold(0.0f32, |m, v| m.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn convolve_naive(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; signal.len() + kernel.len() - 1];
        for (i, &s) in signal.iter().enumerate() {
            for (j, &k) in kernel.iter().enumerate() {
                out[i + j] += s * k;
            }
        }
        out
    }

    #[test]
    fn full_matches_naive() {
        let signal = [1.0, 2.0, 3.0, 4.0, 0.5];
        let kernel = [0.5, 0.3, 0.1];
        let mut conv = Convolver::new();
        let fft = conv.convolve_full(&signal, &kernel);
        let naive = convolve_naive(&signal, &kernel);
        assert_eq!(fft.len(), naive.len());
        for (a, b) in fft.iter().zip(naive.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn same_is_centered_slice_of_full() {
        let signal = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let kernel = [0.25, 0.5, 1.0, 0.5, 0.25];
        let mut conv = Convolver::new();
        let same = conv.convolve_same(&signal, &kernel);
        assert_eq!(same.len(), signal.len());
        // Kernel center lands on the impulse position.
        assert_abs_diff_eq!(same[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(same[1], 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(same[2], 0.25, epsilon = 1e-5);
    }

    #[test]
    fn delay_shifts_right() {
        let out = delay_samples(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out, vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn delay_longer_than_signal_is_silence() {
        let out = delay_samples(&[1.0, 2.0], 5);
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn hann_window_symmetric_and_zero_ended() {
        let w = hann_window(4096);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(w[4095], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(w[1], w[4094], epsilon = 1e-6);
    }
}
