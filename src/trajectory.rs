//! Trajectory synthesis: position as a pure function of (physics, role,
//! time), for short-form circular motion, long-form harmonic motion over a
//! coherent noise field, and Catmull-Rom keyframe paths.

use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::PI;
use std::str::FromStr;

use crate::error::BackendError;
use crate::math::cartesian_to_spherical;
use crate::models::{Harmonic, Keyframe, Physics, Role};

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryPreset {
    Organic,
    Chaotic,
    Smooth,
    Curious,
    Aggressive,
}

#[derive(Debug, Clone, Copy)]
struct PresetParams {
    base_speed: f32,
    noise_scale: f32,
    noise_strength: f32,
    harmonics: usize,
}

impl TrajectoryPreset {
    fn params(self) -> PresetParams {
        match self {
            TrajectoryPreset::Organic => PresetParams {
                base_speed: 0.3,
                noise_scale: 0.5,
                noise_strength: 0.3,
                harmonics: 3,
            },
            TrajectoryPreset::Chaotic => PresetParams {
                base_speed: 1.2,
                noise_scale: 2.0,
                noise_strength: 0.8,
                harmonics: 5,
            },
            TrajectoryPreset::Smooth => PresetParams {
                base_speed: 0.15,
                noise_scale: 0.2,
                noise_strength: 0.1,
                harmonics: 2,
            },
            TrajectoryPreset::Curious => PresetParams {
                base_speed: 0.6,
                noise_scale: 1.0,
                noise_strength: 0.5,
                harmonics: 4,
            },
            TrajectoryPreset::Aggressive => PresetParams {
                base_speed: 1.5,
                noise_scale: 3.0,
                noise_strength: 0.9,
                harmonics: 6,
            },
        }
    }
}

impl FromStr for TrajectoryPreset {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "organic" => Ok(TrajectoryPreset::Organic),
            "chaotic" => Ok(TrajectoryPreset::Chaotic),
            "smooth" => Ok(TrajectoryPreset::Smooth),
            "curious" => Ok(TrajectoryPreset::Curious),
            "aggressive" => Ok(TrajectoryPreset::Aggressive),
            other => Err(BackendError::UnknownPreset(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Coherent noise field
// ---------------------------------------------------------------------------

/// Classic permutation table from Ken Perlin's reference implementation.
const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

#[inline]
fn perm(x: i32, seed: i32) -> u8 {
    PERM[(x.wrapping_add(seed) & 255) as usize]
}

#[inline]
fn grad2(hash: u8, x: f32, y: f32) -> f32 {
    let h = hash & 7;
    let u = if h < 4 { x } else { y };
    let v = if h < 4 { y } else { x };
    (if h & 1 != 0 { -u } else { u }) + (if h & 2 != 0 { -2.0 * v } else { 2.0 * v })
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Seeded 2D gradient noise, sampled in roughly `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct NoiseField {
    seed: i32,
}

impl NoiseField {
    pub fn with_seed(seed: i32) -> Self {
        Self { seed }
    }

    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let xi = x.floor() as i32;
        let yi = y.floor() as i32;
        let xf = x - x.floor();
        let yf = y - y.floor();

        let u = fade(xf);
        let v = fade(yf);

        let aa = perm(perm(xi, self.seed) as i32 + yi, self.seed);
        let ab = perm(perm(xi, self.seed) as i32 + yi + 1, self.seed);
        let ba = perm(perm(xi + 1, self.seed) as i32 + yi, self.seed);
        let bb = perm(perm(xi + 1, self.seed) as i32 + yi + 1, self.seed);

        let x1 = lerp(grad2(aa, xf, yf), grad2(ba, xf - 1.0, yf), u);
        let x2 = lerp(grad2(ab, xf, yf - 1.0), grad2(bb, xf - 1.0, yf - 1.0), u);

        lerp(x1, x2, v).clamp(-1.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Centered Catmull-Rom interpolation; passes exactly through `p1` at t=0
/// and `p2` at t=1.
pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t * t
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t * t * t)
}

pub struct TrajectoryEngine {
    noise: Option<NoiseField>,
}

impl TrajectoryEngine {
    /// Engine with a coherent noise field derived from the project seed.
    pub fn new(seed: u64) -> Self {
        Self {
            noise: Some(NoiseField::with_seed(seed as i32)),
        }
    }

    /// Engine without a noise field; long-form motion falls back to two
    /// decorrelated sinusoids and stays fully deterministic.
    pub fn without_noise() -> Self {
        Self { noise: None }
    }

    /// Authors long-form procedural physics for a role and preset. Harmonic
    /// frequencies, amplitudes, phases and direction come from the injected
    /// generator.
    pub fn generate(&self, role: Role, preset: TrajectoryPreset, rng: &mut StdRng) -> Physics {
        let mut params = preset.params();
        match role {
            Role::Anchor => {
                params.base_speed = 0.05;
                params.noise_strength = 0.02;
            }
            Role::Ethereal => {
                params.base_speed *= 1.5;
                params.noise_strength *= 1.3;
            }
            _ => {}
        }

        let harmonics = (0..params.harmonics)
            .map(|_| Harmonic {
                freq: rng.gen_range(0.1..2.0),
                amp: rng.gen_range(0.3..1.0),
                phase: rng.gen_range(0.0..2.0 * PI),
            })
            .collect();

        Physics::ProceduralLong {
            base_speed: params.base_speed,
            noise_scale: params.noise_scale,
            noise_strength: params.noise_strength,
            harmonics,
            direction: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
        }
    }

    /// Normalizes an authored keyframe list into keyframed physics: sorted
    /// by time, duplicate times removed, and closed at the project duration
    /// with the first keyframe's position so motion loops back to its start.
    pub fn keyframe_track(mut points: Vec<Keyframe>, duration: f64) -> Physics {
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        points.dedup_by(|a, b| a.time == b.time);
        if let Some(first) = points.first().cloned() {
            if points.last().map(|last| last.time < duration).unwrap_or(false) {
                points.push(Keyframe {
                    time: duration,
                    azi: first.azi,
                    ele: first.ele,
                    object_name: first.object_name,
                });
            }
        }
        Physics::Keyframes { points }
    }

    /// Angular position for an object at `time` seconds. The generator is
    /// only consulted by short-form physics with nonzero randomness.
    pub fn position(
        &self,
        physics: &Physics,
        role: Role,
        time: f64,
        rng: &mut StdRng,
    ) -> (f32, f32) {
        match physics {
            Physics::Procedural {
                speed,
                direction,
                start_phase,
                randomness,
            } => self.procedural_position(*speed, *direction, *start_phase, *randomness, role, time, rng),
            Physics::ProceduralLong {
                base_speed,
                noise_scale,
                noise_strength,
                harmonics,
                direction,
            } => self.long_position(*base_speed, *noise_scale, *noise_strength, harmonics, *direction, role, time),
            Physics::Keyframes { points } => interpolate_keyframes(points, time),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn procedural_position(
        &self,
        speed: f32,
        direction: f32,
        start_phase: f32,
        randomness: f32,
        role: Role,
        time: f64,
        rng: &mut StdRng,
    ) -> (f32, f32) {
        let t = time as f32;
        let angle = start_phase.to_radians() + direction * speed * 0.5 * t;
        let mut x = angle.cos();
        let mut y = angle.sin();
        let mut z = if role == Role::Ethereal {
            0.7 + (t * 0.5).sin() * 0.2
        } else {
            (t * 0.3).sin() * 0.3
        };

        if randomness > 0.0 {
            x += rng.gen_range(-randomness..=randomness);
            y += rng.gen_range(-randomness..=randomness);
            z += rng.gen_range(-randomness * 0.5..=randomness * 0.5);
        }

        cartesian_to_spherical(x, y, z)
    }

    #[allow(clippy::too_many_arguments)]
    fn long_position(
        &self,
        base_speed: f32,
        noise_scale: f32,
        noise_strength: f32,
        harmonics: &[Harmonic],
        direction: f32,
        role: Role,
        time: f64,
    ) -> (f32, f32) {
        let t = time as f32;

        // Several incommensurate sinusoids avoid an audibly periodic orbit.
        let mut angle = 0.0f32;
        for h in harmonics {
            angle += h.amp * (h.freq * t + h.phase).sin();
        }
        let angle = angle * direction * base_speed;

        let (noise_x, noise_y) = match &self.noise {
            Some(noise) => (
                noise.sample(t * noise_scale, 0.0) * noise_strength,
                noise.sample(t * noise_scale, 100.0) * noise_strength,
            ),
            None => (
                (t * 2.3 * noise_scale).sin() * noise_strength,
                (t * 3.7 * noise_scale).cos() * noise_strength,
            ),
        };

        let x = angle.cos() + noise_x;
        let y = angle.sin() + noise_y;

        let elevation = if role == Role::Ethereal {
            45.0 + (t * 0.4).sin() * 20.0 + self.field(t * 0.3, 200.0) * 15.0
        } else {
            (t * 0.3).sin() * 25.0 + self.field(t * 0.2, 300.0) * 10.0
        };

        let azimuth = y.atan2(x).to_degrees().rem_euclid(360.0);
        (azimuth, elevation)
    }

    fn field(&self, x: f32, y: f32) -> f32 {
        self.noise.as_ref().map(|n| n.sample(x, y)).unwrap_or(0.0)
    }
}

/// Catmull-Rom interpolation over a sorted keyframe list. Control points at
/// the ends are clamped to the nearest valid index; times outside every
/// segment map to the first keyframe.
fn interpolate_keyframes(points: &[Keyframe], time: f64) -> (f32, f32) {
    if points.is_empty() {
        return (0.0, 0.0);
    }

    for i in 0..points.len().saturating_sub(1) {
        let k1 = &points[i];
        let k2 = &points[i + 1];
        if k1.time <= time && time <= k2.time {
            let span = k2.time - k1.time;
            let t = if span > 0.0 {
                ((time - k1.time) / span) as f32
            } else {
                0.0
            };
            let k0 = &points[i.saturating_sub(1)];
            let k3 = &points[(i + 2).min(points.len() - 1)];
            let azi = catmull_rom(k0.azi, k1.azi, k2.azi, k3.azi, t).rem_euclid(360.0);
            let ele = catmull_rom(k0.ele, k1.ele, k2.ele, k3.ele, t);
            return (azi, ele);
        }
    }

    (points[0].azi, points[0].ele)
}
