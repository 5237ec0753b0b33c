//! Project rendering: loads a project document, runs every object through
//! the processor pipeline selected by the output format, sums into a master
//! buffer, applies loudspeaker post-processing and writes the mix.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::audio_io::{load_audio, write_wav_stereo};
use crate::dsp::stereo_peak;
use crate::error::{BackendError, Result};
use crate::hrtf::HrtfEngine;
use crate::models::{ObjectData, Physics, ProjectData};
use crate::processor::{apply_xtc, SpatialProcessor};
use crate::trajectory::TrajectoryEngine;

const NORMALIZE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Binaural,
    CinemaBinaural,
    StaticBinaural,
    StaticSpeaker,
    Speaker3d,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Binaural => "binaural",
            OutputFormat::CinemaBinaural => "cinema_binaural",
            OutputFormat::StaticBinaural => "static_binaural",
            OutputFormat::StaticSpeaker => "static_speaker",
            OutputFormat::Speaker3d => "speaker_3d",
        }
    }

    /// Loudspeaker formats get crosstalk cancellation on the finished mix.
    pub fn is_speaker(self) -> bool {
        matches!(self, OutputFormat::StaticSpeaker | OutputFormat::Speaker3d)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = BackendError;

    /// Strict: an unrecognized format is an error, not a silent fallback to
    /// the default pipeline.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binaural" => Ok(OutputFormat::Binaural),
            "cinema_binaural" => Ok(OutputFormat::CinemaBinaural),
            "static_binaural" => Ok(OutputFormat::StaticBinaural),
            "static_speaker" => Ok(OutputFormat::StaticSpeaker),
            "speaker_3d" => Ok(OutputFormat::Speaker3d),
            other => Err(BackendError::UnknownFormat(other.to_string())),
        }
    }
}

/// Renders a project document to a stereo WAV next to the project file (or
/// at `out_path`), returning the output path.
pub fn render_project(
    project_path: &Path,
    hrtf: &HrtfEngine,
    format: OutputFormat,
    out_path: Option<&Path>,
) -> Result<PathBuf> {
    let project = ProjectData::load(project_path)?;
    let sample_rate = project.sample_rate;
    let master_len = (project.duration * sample_rate as f64) as usize;
    let mut master_l = vec![0.0f32; master_len];
    let mut master_r = vec![0.0f32; master_len];

    log::info!(
        "rendering {} ({} objects, {:.2}s at {} Hz, format {})",
        project_path.display(),
        project.objects.len(),
        project.duration,
        sample_rate,
        format
    );

    let mut processor = SpatialProcessor::new(hrtf, project.seed);

    for object in &project.objects {
        let (l, r) = render_object(&mut processor, object, &project, format)
            .map_err(|e| e.for_object(&object.name))?;
        let n = l.len().min(master_len);
        for i in 0..n {
            master_l[i] += l[i];
            master_r[i] += r[i];
        }
    }

    let (mut master_l, mut master_r) = if format.is_speaker() {
        apply_xtc(&master_l, &master_r, sample_rate)?
    } else {
        (master_l, master_r)
    };

    let peak = stereo_peak(&master_l, &master_r);
    if peak > 0.0 {
        let scale = 1.0 / (peak + NORMALIZE_EPSILON);
        for s in master_l.iter_mut().chain(master_r.iter_mut()) {
            *s *= scale;
        }
    }

    let out = match out_path {
        Some(p) => p.to_path_buf(),
        None => default_output_path(project_path, format),
    };
    write_wav_stereo(&out, &master_l, &master_r, sample_rate)?;
    log::info!("render finished: {}", out.display());
    Ok(out)
}

fn default_output_path(project_path: &Path, format: OutputFormat) -> PathBuf {
    let stem = project_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("render");
    project_path.with_file_name(format!("{}_{}.wav", stem, format))
}

fn render_object(
    processor: &mut SpatialProcessor,
    object: &ObjectData,
    project: &ProjectData,
    format: OutputFormat,
) -> Result<(Vec<f32>, Vec<f32>)> {
    log::info!("processing object: {} ({})", object.name, object.role);

    let audio = load_audio(&object.file)?;
    if audio.sample_rate != project.sample_rate {
        return Err(BackendError::SampleRateMismatch {
            source_rate: audio.sample_rate,
            project_rate: project.sample_rate,
        });
    }

    match format {
        OutputFormat::CinemaBinaural => {
            let (l, r) = audio.as_stereo();
            processor.process_stereo_cinema(&l, &r, project.sample_rate)
        }
        OutputFormat::StaticBinaural | OutputFormat::StaticSpeaker => {
            let (l, r) = audio.as_stereo();
            processor.process_stereo_fixed(&l, &r)
        }
        OutputFormat::Binaural | OutputFormat::Speaker3d => {
            let mono = audio.mix_to_mono();
            let physics = resolve_physics(object, project.duration);
            processor.process_object_binaural(&mono, project.sample_rate, object.role, &physics)
        }
    }
}

/// Resolves an object's motion model once per render: authored keyframes
/// take precedence and are normalized (ordered, closed at the project
/// duration).
fn resolve_physics(object: &ObjectData, duration: f64) -> Physics {
    if !object.keyframes.is_empty() {
        return TrajectoryEngine::keyframe_track(object.keyframes.clone(), duration);
    }
    if let Physics::Keyframes { points } = &object.physics {
        return TrajectoryEngine::keyframe_track(points.clone(), duration);
    }
    object.physics.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_strict() {
        assert_eq!("binaural".parse::<OutputFormat>().unwrap(), OutputFormat::Binaural);
        assert_eq!(
            "speaker_3d".parse::<OutputFormat>().unwrap(),
            OutputFormat::Speaker3d
        );
        assert!(matches!(
            "quadraphonic".parse::<OutputFormat>(),
            Err(BackendError::UnknownFormat(_))
        ));
    }

    #[test]
    fn speaker_formats_flagged() {
        assert!(OutputFormat::Speaker3d.is_speaker());
        assert!(OutputFormat::StaticSpeaker.is_speaker());
        assert!(!OutputFormat::Binaural.is_speaker());
        assert!(!OutputFormat::CinemaBinaural.is_speaker());
    }

    #[test]
    fn default_output_name_carries_format() {
        let out = default_output_path(Path::new("/tmp/session.json"), OutputFormat::Binaural);
        assert_eq!(out, PathBuf::from("/tmp/session_binaural.wav"));
    }
}
