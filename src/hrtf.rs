//! HRIR database: loads per-angle impulse-response recordings and answers
//! interpolated queries through a nearest-neighbor index over
//! (elevation, azimuth).

use std::collections::HashMap;
use std::path::PathBuf;

use crate::audio_io::load_audio;
use crate::error::{BackendError, Result};
use crate::kdtree::KdTree;

/// Subdirectory scanned for impulse-response recordings.
pub const HRIR_SUBDIR: &str = "D1_HRIR_WAV";

/// Interpolated responses are truncated/zero-padded to this length, capping
/// convolution cost regardless of the source recording length.
pub const INTERPOLATED_IR_LEN: usize = 256;

/// Below this angular distance a query returns the stored response as-is.
const EXACT_MATCH_DISTANCE: f32 = 0.1;

const DISTANCE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct HrirPair {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// Extracts (azimuth, elevation) from a file stem of the form
/// `..._azi_<value>_ele_<value>`, decimal commas normalized to dots and
/// azimuth wrapped into [0, 360).
fn parse_angles(stem: &str) -> Option<(f32, f32)> {
    let azi_str = stem.split("azi_").nth(1)?.split('_').next()?.replace(',', ".");
    let ele_str = stem.split("ele_").nth(1)?.replace(',', ".");
    let azi = azi_str.parse::<f32>().ok()?.rem_euclid(360.0);
    let ele = ele_str.parse::<f32>().ok()?;
    Some((azi, ele))
}

pub struct HrtfEngine {
    root: PathBuf,
    coords: Vec<[f32; 2]>,
    hrirs: Vec<HrirPair>,
    tree: Option<KdTree>,
}

impl HrtfEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            coords: Vec::new(),
            hrirs: Vec::new(),
            tree: None,
        }
    }

    pub fn len(&self) -> usize {
        self.hrirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hrirs.is_empty()
    }

    /// Scans the recording directory and builds the angular index. Files
    /// whose names carry no angle pair or that fail to decode are skipped;
    /// an entirely unusable directory is fatal.
    pub fn load(&mut self) -> Result<()> {
        let dir = self.root.join(HRIR_SUBDIR);
        let entries =
            std::fs::read_dir(&dir).map_err(|_| BackendError::HrirLoad(dir.clone()))?;

        self.coords.clear();
        self.hrirs.clear();
        self.tree = None;

        // Millidegree keys dedup re-recorded angles; the last file wins.
        let mut slots: HashMap<(i64, i64), usize> = HashMap::new();

        for entry in entries.flatten() {
            let path = entry.path();
            let is_wav = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if !is_wav {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((azi, ele)) = parse_angles(stem) else {
                log::debug!("skipping {}: no angle pair in name", path.display());
                continue;
            };
            let audio = match load_audio(&path) {
                Ok(audio) => audio,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if audio.channels.len() < 2 || audio.frames() == 0 {
                log::warn!("skipping {}: not a stereo impulse response", path.display());
                continue;
            }

            let pair = HrirPair {
                left: audio.channels[0].clone(),
                right: audio.channels[1].clone(),
            };
            let key = (
                (ele * 1000.0).round() as i64,
                (azi * 1000.0).round() as i64,
            );
            match slots.get(&key) {
                Some(&slot) => self.hrirs[slot] = pair,
                None => {
                    slots.insert(key, self.hrirs.len());
                    self.coords.push([ele, azi]);
                    self.hrirs.push(pair);
                }
            }
        }

        if self.hrirs.is_empty() {
            return Err(BackendError::HrirLoad(dir));
        }

        self.tree = Some(KdTree::build(&self.coords));
        log::info!(
            "loaded {} HRIR recordings from {}",
            self.hrirs.len(),
            dir.display()
        );
        Ok(())
    }

    /// Interpolated impulse-response pair for a direction. An exact angular
    /// match returns the stored recording unmodified; otherwise the three
    /// nearest recordings are blended with inverse-distance weights into a
    /// fixed-length response.
    pub fn ir_at(&self, azimuth: f32, elevation: f32) -> Result<HrirPair> {
        let tree = self.tree.as_ref().ok_or(BackendError::NotLoaded)?;
        let neighbors = tree.k_nearest([elevation, azimuth.rem_euclid(360.0)], 3);
        let Some(&(nearest_idx, nearest_dist)) = neighbors.first() else {
            return Err(BackendError::NotLoaded);
        };

        if nearest_dist < EXACT_MATCH_DISTANCE {
            return Ok(self.hrirs[nearest_idx].clone());
        }

        let weights: Vec<f32> = neighbors
            .iter()
            .map(|&(_, d)| 1.0 / (d + DISTANCE_EPSILON))
            .collect();
        let total: f32 = weights.iter().sum();

        let mut left = vec![0.0f32; INTERPOLATED_IR_LEN];
        let mut right = vec![0.0f32; INTERPOLATED_IR_LEN];
        for (&(idx, _), &w) in neighbors.iter().zip(weights.iter()) {
            let w = w / total;
            let ir = &self.hrirs[idx];
            let l = ir.left.len().min(INTERPOLATED_IR_LEN);
            for i in 0..l {
                left[i] += ir.left[i] * w;
            }
            let r = ir.right.len().min(INTERPOLATED_IR_LEN);
            for i in 0..r {
                right[i] += ir.right[i] * w;
            }
        }

        Ok(HrirPair { left, right })
    }
}
