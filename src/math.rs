//! Coordinate conversions and panning gain laws.

use std::f32::consts::FRAC_PI_2;

/// Converts a cartesian direction vector to (azimuth, elevation) in degrees.
///
/// Convention: 0° = front (+y), 90° = right (+x), 180° = back, 270° = left.
/// Elevation is positive above ear level. A zero-length vector maps to
/// elevation 0.
pub fn cartesian_to_spherical(x: f32, y: f32, z: f32) -> (f32, f32) {
    let azimuth = x.atan2(y).to_degrees().rem_euclid(360.0);
    let distance = (x * x + y * y + z * z).sqrt();
    let elevation = if distance > 0.0 {
        (z / distance).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        0.0
    };
    (azimuth, elevation)
}

/// Constant-power stereo pan gains for an azimuth in degrees.
pub fn calculate_stereo_gains(azimuth: f32) -> (f32, f32) {
    let rads = azimuth.rem_euclid(360.0).to_radians();
    let pan_position = rads.sin();
    let norm_pan = (pan_position + 1.0) / 2.0;
    let gain_l = (norm_pan * FRAC_PI_2).cos();
    let gain_r = (norm_pan * FRAC_PI_2).sin();
    (gain_l, gain_r)
}

/// 5.1 channel gains `[L, R, C, LFE, Ls, Rs]` for an azimuth in degrees,
/// constant-power interpolated between adjacent speaker nodes.
pub fn calculate_5_1_gains(azimuth: f32) -> [f32; 6] {
    let azimuth = azimuth.rem_euclid(360.0);
    let mut gains = [0.0f32; 6];

    // (angle, channel) nodes walked clockwise from center, closing the loop.
    let speaker_nodes: [(f32, usize); 6] = [
        (0.0, 2),
        (30.0, 1),
        (110.0, 5),
        (250.0, 4),
        (330.0, 0),
        (360.0, 2),
    ];

    for window in speaker_nodes.windows(2) {
        let (angle_start, ch_start) = window[0];
        let (angle_end, ch_end) = window[1];
        if angle_start <= azimuth && azimuth <= angle_end {
            let segment_range = (angle_end - angle_start).max(1.0);
            let t = (azimuth - angle_start) / segment_range;
            gains[ch_start] = (t * FRAC_PI_2).cos();
            gains[ch_end] = (t * FRAC_PI_2).sin();
            break;
        }
    }

    gains
}
