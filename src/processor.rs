//! Position-dependent convolution pipelines: procedural binaural, fixed
//! stereo images, cinema reflections, and loudspeaker crosstalk
//! cancellation.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dsp::{delay_samples, filters, hann_window, Convolver};
use crate::error::Result;
use crate::hrtf::{HrirPair, HrtfEngine};
use crate::models::{Physics, Role};
use crate::trajectory::TrajectoryEngine;

pub const CHUNK_SIZE: usize = 4096;
pub const HOP_SIZE: usize = 2048;

/// Attenuation of the cross-fed impulse responses in the fixed-stereo mode,
/// modeling interaural shadowing.
const SHADOW_FACTOR: f32 = 0.6;

const ETHEREAL_HIGHPASS_HZ: f32 = 3000.0;

const REFLECTION_DELAY_SECONDS: f32 = 0.022;
const REFLECTION_LOWPASS_HZ: f32 = 4000.0;
const REFLECTION_GAIN: f32 = 0.25;

const XTC_EAR_SEPARATION_M: f32 = 0.15;
const XTC_INCIDENCE_DEG: f32 = 20.0;
const XTC_LOWPASS_HZ: f32 = 2200.0;
const XTC_CANCEL_GAIN: f32 = 0.55;
const XTC_MAKEUP_GAIN: f32 = 1.1;

const SPEED_OF_SOUND_M_S: f32 = 343.0;

pub struct SpatialProcessor<'a> {
    hrtf: &'a HrtfEngine,
    trajectory: TrajectoryEngine,
    convolver: Convolver,
    rng: StdRng,
}

impl<'a> SpatialProcessor<'a> {
    /// The seed feeds both the trajectory noise field and the per-chunk
    /// position jitter, so a render is reproducible for a given project.
    pub fn new(hrtf: &'a HrtfEngine, seed: u64) -> Self {
        Self {
            hrtf,
            trajectory: TrajectoryEngine::new(seed),
            convolver: Convolver::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Renders a mono object to stereo by convolving windowed chunks with
    /// the impulse response at the object's position at each chunk center.
    ///
    /// Signals shorter than one chunk produce silence: the chunk loop never
    /// runs and the zero-initialized buffers are returned as-is.
    pub fn process_object_binaural(
        &mut self,
        mono: &[f32],
        sample_rate: u32,
        role: Role,
        physics: &Physics,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        // High-pass ethereal material up front to keep low-frequency
        // coloration out of the elevated image.
        let source = if role == Role::Ethereal {
            filters::highpass(mono, sample_rate, ETHEREAL_HIGHPASS_HZ)?
        } else {
            mono.to_vec()
        };

        let mut out_l = vec![0.0f32; source.len() + CHUNK_SIZE];
        let mut out_r = vec![0.0f32; source.len() + CHUNK_SIZE];
        let window = hann_window(CHUNK_SIZE);

        let end = source.len().saturating_sub(CHUNK_SIZE);
        for pos in (0..end).step_by(HOP_SIZE) {
            let chunk: Vec<f32> = source[pos..pos + CHUNK_SIZE]
                .iter()
                .zip(window.iter())
                .map(|(s, w)| s * w)
                .collect();
            let t = (pos as f64 + CHUNK_SIZE as f64 / 2.0) / sample_rate as f64;

            let (azi, ele) = match role {
                Role::Anchor => (0.0, 0.0),
                Role::LfeFocused => (0.0, -10.0),
                _ => self.trajectory.position(physics, role, t, &mut self.rng),
            };
            let ir = self.hrtf.ir_at(azi, ele)?;

            let conv_l = self.convolver.convolve_same(&chunk, &ir.left);
            let conv_r = self.convolver.convolve_same(&chunk, &ir.right);
            for i in 0..CHUNK_SIZE {
                out_l[pos + i] += conv_l[i];
                out_r[pos + i] += conv_r[i];
            }
        }

        out_l.truncate(source.len());
        out_r.truncate(source.len());
        Ok((out_l, out_r))
    }

    /// Fixed wide image: the left input rendered at 90°, the right at 270°,
    /// each cross-fed into the opposite ear's response attenuated by the
    /// shadow factor.
    pub fn process_stereo_fixed(
        &mut self,
        left: &[f32],
        right: &[f32],
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        let ir_left_src = self.hrtf.ir_at(90.0, 0.0)?;
        let ir_right_src = self.hrtf.ir_at(270.0, 0.0)?;
        Ok(self.crossfeed_convolve(left, right, &ir_left_src, &ir_right_src, SHADOW_FACTOR))
    }

    /// Cinema image: ±30° front placement followed by a simulated early
    /// reflection (opposite channel delayed, low-passed, attenuated).
    pub fn process_stereo_cinema(
        &mut self,
        left: &[f32],
        right: &[f32],
        sample_rate: u32,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        let ir_left_src = self.hrtf.ir_at(30.0, 0.0)?;
        let ir_right_src = self.hrtf.ir_at(330.0, 0.0)?;
        let (mut out_l, mut out_r) =
            self.crossfeed_convolve(left, right, &ir_left_src, &ir_right_src, 1.0);

        let delay = (REFLECTION_DELAY_SECONDS * sample_rate as f32) as usize;
        let ref_l = filters::lowpass(
            &delay_samples(&out_r, delay),
            sample_rate,
            REFLECTION_LOWPASS_HZ,
        )?;
        let ref_r = filters::lowpass(
            &delay_samples(&out_l, delay),
            sample_rate,
            REFLECTION_LOWPASS_HZ,
        )?;
        for (o, r) in out_l.iter_mut().zip(ref_l.iter()) {
            *o += r * REFLECTION_GAIN;
        }
        for (o, r) in out_r.iter_mut().zip(ref_r.iter()) {
            *o += r * REFLECTION_GAIN;
        }
        Ok((out_l, out_r))
    }

    /// Shared chunked convolution for the two fixed-topology modes. Each
    /// input feeds its own response pair; the opposite-ear channel of each
    /// pair is scaled by `cross_gain` before convolution.
    fn crossfeed_convolve(
        &mut self,
        left: &[f32],
        right: &[f32],
        ir_left_src: &HrirPair,
        ir_right_src: &HrirPair,
        cross_gain: f32,
    ) -> (Vec<f32>, Vec<f32>) {
        let len = left.len().min(right.len());
        let mut out_l = vec![0.0f32; len + CHUNK_SIZE];
        let mut out_r = vec![0.0f32; len + CHUNK_SIZE];
        let window = hann_window(CHUNK_SIZE);

        let ir_l_to_r: Vec<f32> = ir_left_src.right.iter().map(|v| v * cross_gain).collect();
        let ir_r_to_l: Vec<f32> = ir_right_src.left.iter().map(|v| v * cross_gain).collect();

        let end = len.saturating_sub(CHUNK_SIZE);
        for pos in (0..end).step_by(HOP_SIZE) {
            let cl: Vec<f32> = left[pos..pos + CHUNK_SIZE]
                .iter()
                .zip(window.iter())
                .map(|(s, w)| s * w)
                .collect();
            let cr: Vec<f32> = right[pos..pos + CHUNK_SIZE]
                .iter()
                .zip(window.iter())
                .map(|(s, w)| s * w)
                .collect();

            let ll = self.convolver.convolve_same(&cl, &ir_left_src.left);
            let lr = self.convolver.convolve_same(&cl, &ir_l_to_r);
            let rl = self.convolver.convolve_same(&cr, &ir_r_to_l);
            let rr = self.convolver.convolve_same(&cr, &ir_right_src.right);

            for i in 0..CHUNK_SIZE {
                out_l[pos + i] += ll[i] + rl[i];
                out_r[pos + i] += lr[i] + rr[i];
            }
        }

        out_l.truncate(len);
        out_r.truncate(len);
        (out_l, out_r)
    }
}

/// Crosstalk cancellation for loudspeaker playback of a finished stereo
/// mix. The inter-aural delay follows from the effective ear separation and
/// incidence angle; the delayed opposite channel is low-passed, scaled and
/// subtracted, with makeup gain restoring level. Not involutive: applying
/// it twice keeps cancelling.
pub fn apply_xtc(left: &[f32], right: &[f32], sample_rate: u32) -> Result<(Vec<f32>, Vec<f32>)> {
    let delay = ((XTC_EAR_SEPARATION_M * XTC_INCIDENCE_DEG.to_radians().sin()
        / SPEED_OF_SOUND_M_S)
        * sample_rate as f32) as usize;

    let crosstalk_into_l = filters::lowpass(&delay_samples(right, delay), sample_rate, XTC_LOWPASS_HZ)?;
    let crosstalk_into_r = filters::lowpass(&delay_samples(left, delay), sample_rate, XTC_LOWPASS_HZ)?;

    let out_l = left
        .iter()
        .zip(crosstalk_into_l.iter())
        .map(|(s, c)| (s - c * XTC_CANCEL_GAIN) * XTC_MAKEUP_GAIN)
        .collect();
    let out_r = right
        .iter()
        .zip(crosstalk_into_r.iter())
        .map(|(s, c)| (s - c * XTC_CANCEL_GAIN) * XTC_MAKEUP_GAIN)
        .collect();
    Ok((out_l, out_r))
}
