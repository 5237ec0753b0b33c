//! Butterworth biquad filtering applied over whole buffers.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::error::{BackendError, Result};

fn design(
    filter_type: Type<f32>,
    sample_rate: f32,
    cutoff: f32,
) -> Result<DirectForm2Transposed<f32>> {
    if !(cutoff > 0.0 && cutoff < sample_rate / 2.0) {
        return Err(BackendError::Filter(format!(
            "cutoff {} Hz out of range for {} Hz",
            cutoff, sample_rate
        )));
    }
    let coeffs = Coefficients::<f32>::from_params(
        filter_type,
        sample_rate.hz(),
        cutoff.hz(),
        Q_BUTTERWORTH_F32,
    )
    .map_err(|e| BackendError::Filter(format!("{:?}", e)))?;
    Ok(DirectForm2Transposed::<f32>::new(coeffs))
}

/// Second-order Butterworth high-pass over the whole signal, zero initial
/// state.
pub fn highpass(signal: &[f32], sample_rate: u32, cutoff: f32) -> Result<Vec<f32>> {
    let mut filter = design(Type::HighPass, sample_rate as f32, cutoff)?;
    Ok(signal.iter().map(|&x| filter.run(x)).collect())
}

/// Second-order Butterworth low-pass over the whole signal, zero initial
/// state.
pub fn lowpass(signal: &[f32], sample_rate: u32, cutoff: f32) -> Result<Vec<f32>> {
    let mut filter = design(Type::LowPass, sample_rate as f32, cutoff)?;
    Ok(signal.iter().map(|&x| filter.run(x)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sr: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn rms(signal: &[f32]) -> f32 {
        (signal.iter().map(|x| x * x).sum::<f32>() / signal.len() as f32).sqrt()
    }

    #[test]
    fn highpass_attenuates_low_frequencies() {
        let sr = 44100;
        let low = sine(100.0, sr, sr as usize);
        let high = sine(8000.0, sr, sr as usize);
        let low_out = highpass(&low, sr, 3000.0).unwrap();
        let high_out = highpass(&high, sr, 3000.0).unwrap();
        assert!(rms(&low_out) < 0.05);
        assert!(rms(&high_out) > 0.5);
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let sr = 44100;
        let low = sine(200.0, sr, sr as usize);
        let high = sine(12000.0, sr, sr as usize);
        let low_out = lowpass(&low, sr, 2200.0).unwrap();
        let high_out = lowpass(&high, sr, 2200.0).unwrap();
        assert!(rms(&low_out) > 0.5);
        assert!(rms(&high_out) < 0.05);
    }

    #[test]
    fn rejects_cutoff_above_nyquist() {
        assert!(lowpass(&[0.0; 8], 8000, 4000.0).is_err());
    }
}
