//! Project document schema: objects, roles, physics and keyframes, plus the
//! role-assignment and seeded physics-generation rules used when a project
//! is created from a set of stems.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{BackendError, Result};

pub const FORMAT_VERSION: &str = "1.0";

/// Behavioral role of an audio object. Drives both trajectory synthesis and
/// the processor's position dispatch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anchor,
    LfeFocused,
    Ethereal,
    Spatial,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Anchor => "anchor",
            Role::LfeFocused => "lfe_focused",
            Role::Ethereal => "ethereal",
            Role::Spatial => "spatial",
        };
        f.write_str(s)
    }
}

/// One sinusoid of a long-form procedural trajectory.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Harmonic {
    pub freq: f32,
    pub amp: f32,
    pub phase: f32,
}

/// A position waypoint on an object's motion path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    pub azi: f32,
    pub ele: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
}

/// Motion model of an object, resolved once at load time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Physics {
    /// Short-form circular motion evaluated per convolution chunk.
    Procedural {
        speed: f32,
        direction: f32,
        start_phase: f32,
        randomness: f32,
    },
    /// Harmonic-sum motion with a coherent noise field, used by trajectory
    /// authoring.
    ProceduralLong {
        base_speed: f32,
        noise_scale: f32,
        noise_strength: f32,
        harmonics: Vec<Harmonic>,
        direction: f32,
    },
    /// Spline-interpolated motion through authored waypoints.
    Keyframes { points: Vec<Keyframe> },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ObjectData {
    pub name: String,
    pub file: PathBuf,
    pub role: Role,
    pub physics: Physics,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectData {
    pub version: String,
    pub created_at: u64,
    pub seed: u64,
    pub duration: f64,
    pub sample_rate: u32,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    pub objects: Vec<ObjectData>,
}

/// A stem to be turned into a project object.
#[derive(Debug, Clone)]
pub struct Stem {
    pub name: String,
    pub file: PathBuf,
}

/// Fixed 8-channel surround layout: canonical azimuth and role per channel
/// name.
pub const SURROUND_MAP: [(&str, f32, Role); 8] = [
    ("FL", 30.0, Role::Spatial),
    ("FR", 330.0, Role::Spatial),
    ("FC", 0.0, Role::Anchor),
    ("LFE", 0.0, Role::LfeFocused),
    ("SL", 110.0, Role::Spatial),
    ("SR", 250.0, Role::Spatial),
    ("BL", 150.0, Role::Spatial),
    ("BR", 210.0, Role::Spatial),
];

pub fn surround_channel(name: &str) -> Option<(f32, Role)> {
    let upper = name.to_uppercase();
    SURROUND_MAP
        .iter()
        .find(|(ch, _, _)| *ch == upper)
        .map(|&(_, azi, role)| (azi, role))
}

const ANCHOR_TERMS: [&str; 5] = ["vocal", "voice", "lead", "dialog", "fc"];
const LFE_TERMS: [&str; 5] = ["bass", "kick", "sub", "808", "lfe"];
const ETHEREAL_TERMS: [&str; 6] = ["air", "pad", "ambience", "noise", "fx", "atm"];

/// Classifies a stem by keyword match over its name, case-insensitive.
pub fn detect_role(name: &str) -> Role {
    let name = name.to_lowercase();
    if ANCHOR_TERMS.iter().any(|kw| name.contains(kw)) {
        return Role::Anchor;
    }
    if LFE_TERMS.iter().any(|kw| name.contains(kw)) {
        return Role::LfeFocused;
    }
    if ETHEREAL_TERMS.iter().any(|kw| name.contains(kw)) {
        return Role::Ethereal;
    }
    Role::Spatial
}

/// Randomized short-form physics for a non-surround object. The generator
/// is injected so project creation stays deterministic per seed without
/// touching any process-wide RNG state.
pub fn generate_physics(role: Role, rng: &mut StdRng) -> Physics {
    let speed = match role {
        Role::Spatial => rng.gen_range(0.3..1.2),
        Role::Anchor => 0.05,
        _ => 1.2,
    };
    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let start_phase = match role {
        Role::Spatial => rng.gen_range(0.0..360.0),
        _ => 0.0,
    };
    let randomness = match role {
        Role::Spatial => 0.2,
        Role::Anchor => 0.02,
        _ => 0.5,
    };
    Physics::Procedural {
        speed,
        direction,
        start_phase,
        randomness,
    }
}

/// Static physics pinned at a surround channel's canonical azimuth.
fn pinned_physics(azimuth: f32) -> Physics {
    Physics::Procedural {
        speed: 0.0,
        direction: 1.0,
        start_phase: azimuth,
        randomness: 0.0,
    }
}

impl ProjectData {
    /// Builds a project document from a stem list. All randomized physics
    /// come from a generator seeded with `seed`, so identical inputs yield
    /// an identical document (modulo `created_at`).
    pub fn create(
        stems: &[Stem],
        duration: f64,
        sample_rate: u32,
        is_surround: bool,
        seed: Option<u64>,
        keyframes: Vec<Keyframe>,
    ) -> ProjectData {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let objects = stems
            .iter()
            .map(|stem| {
                let surround = if is_surround {
                    surround_channel(&stem.name)
                } else {
                    None
                };
                let (role, physics) = match surround {
                    Some((azimuth, role)) => (role, pinned_physics(azimuth)),
                    None => {
                        let role = detect_role(&stem.name);
                        (role, generate_physics(role, &mut rng))
                    }
                };
                let object_keyframes = keyframes
                    .iter()
                    .filter(|kf| kf.object_name.as_deref() == Some(stem.name.as_str()))
                    .cloned()
                    .collect();
                ObjectData {
                    name: stem.name.clone(),
                    file: stem.file.clone(),
                    role,
                    physics,
                    keyframes: object_keyframes,
                }
            })
            .collect();

        ProjectData {
            version: FORMAT_VERSION.to_string(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            seed,
            duration,
            sample_rate,
            keyframes,
            objects,
        }
    }

    pub fn load(path: &Path) -> Result<ProjectData> {
        if !path.exists() {
            return Err(BackendError::MissingProject(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(names: &[&str]) -> Vec<Stem> {
        names
            .iter()
            .map(|n| Stem {
                name: n.to_string(),
                file: PathBuf::from(format!("{n}.wav")),
            })
            .collect()
    }

    #[test]
    fn keyword_classification() {
        assert_eq!(detect_role("Lead Vocal"), Role::Anchor);
        assert_eq!(detect_role("808_kick"), Role::LfeFocused);
        assert_eq!(detect_role("Ambience Pad"), Role::Ethereal);
        assert_eq!(detect_role("guitar"), Role::Spatial);
    }

    #[test]
    fn surround_stems_get_pinned_physics() {
        let project = ProjectData::create(&stems(&["FL", "LFE"]), 10.0, 48000, true, Some(7), vec![]);
        assert_eq!(project.objects[0].role, Role::Spatial);
        match &project.objects[0].physics {
            Physics::Procedural {
                speed,
                start_phase,
                randomness,
                ..
            } => {
                assert_eq!(*speed, 0.0);
                assert_eq!(*start_phase, 30.0);
                assert_eq!(*randomness, 0.0);
            }
            other => panic!("unexpected physics: {other:?}"),
        }
        assert_eq!(project.objects[1].role, Role::LfeFocused);
    }

    #[test]
    fn creation_is_deterministic_per_seed() {
        let names = ["guitar", "vocal", "pad", "bass"];
        let a = ProjectData::create(&stems(&names), 30.0, 44100, false, Some(42), vec![]);
        let b = ProjectData::create(&stems(&names), 30.0, 44100, false, Some(42), vec![]);
        assert_eq!(a.seed, b.seed);
        for (oa, ob) in a.objects.iter().zip(b.objects.iter()) {
            assert_eq!(oa.role, ob.role);
            assert_eq!(oa.physics, ob.physics);
        }

        let c = ProjectData::create(&stems(&names), 30.0, 44100, false, Some(43), vec![]);
        let moved: Vec<bool> = a
            .objects
            .iter()
            .zip(c.objects.iter())
            .map(|(oa, oc)| oa.physics != oc.physics)
            .collect();
        assert!(moved.iter().any(|&m| m), "different seed changed nothing");
    }

    #[test]
    fn round_trip_preserves_roles_and_physics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let project = ProjectData::create(
            &stems(&["vocal", "guitar", "sub", "fx_sweep"]),
            12.5,
            48000,
            false,
            Some(99),
            vec![Keyframe {
                time: 0.0,
                azi: 10.0,
                ele: 5.0,
                object_name: Some("guitar".into()),
            }],
        );
        project.save(&path).unwrap();
        let loaded = ProjectData::load(&path).unwrap();

        assert_eq!(loaded.objects.len(), 4);
        assert_eq!(loaded.seed, 99);
        assert_eq!(loaded.sample_rate, 48000);
        for (a, b) in project.objects.iter().zip(loaded.objects.iter()) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.physics, b.physics);
        }
        assert_eq!(loaded.objects[1].keyframes.len(), 1);
    }

    #[test]
    fn missing_project_file() {
        let err = ProjectData::load(Path::new("/nonexistent/p.json")).unwrap_err();
        assert!(matches!(err, BackendError::MissingProject(_)));
    }

    #[test]
    fn physics_json_is_tagged() {
        let physics = Physics::Procedural {
            speed: 1.0,
            direction: -1.0,
            start_phase: 90.0,
            randomness: 0.2,
        };
        let json = serde_json::to_value(&physics).unwrap();
        assert_eq!(json["type"], "procedural");
    }
}
