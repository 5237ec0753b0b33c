//! End-to-end rendering through the full pipeline: project document in,
//! stereo WAV out.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use spatial_backend::audio_io::{load_audio, write_wav_mono, write_wav_stereo};
use spatial_backend::hrtf::HRIR_SUBDIR;
use spatial_backend::models::Stem;
use spatial_backend::renderer::render_project;
use spatial_backend::{BackendError, HrtfEngine, OutputFormat, ProjectData};

const SAMPLE_RATE: u32 = 44100;

/// Writes a grid of synthetic impulse-response recordings covering the
/// directions the pipelines query.
fn write_hrir_fixture(root: &Path) {
    let dir = root.join(HRIR_SUBDIR);
    std::fs::create_dir_all(&dir).unwrap();

    for ele in [-45i32, 0, 45] {
        for azi in (0..360).step_by(30) {
            let mut left = vec![0.0f32; 64];
            let mut right = vec![0.0f32; 64];
            // Direction-dependent but energy-preserving-ish responses.
            left[0] = 0.8;
            left[1] = (azi as f32).to_radians().sin() * 0.1;
            right[0] = 0.8;
            right[1] = (azi as f32).to_radians().cos() * 0.1;
            let name = format!("ref_azi_{},0_ele_{},0.wav", azi, ele);
            write_wav_stereo(&dir.join(name), &left, &right, SAMPLE_RATE).unwrap();
        }
    }
}

fn write_sine_stem(path: &Path, freq: f32, seconds: f64) {
    let frames = (seconds * SAMPLE_RATE as f64) as usize;
    let samples: Vec<f32> = (0..frames)
        .map(|i| (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect();
    write_wav_mono(path, &samples, SAMPLE_RATE).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    hrtf: HrtfEngine,
    project_path: PathBuf,
    duration: f64,
}

fn fixture(stem_seconds: f64, stems: &[(&str, f32)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_hrir_fixture(dir.path());

    let mut hrtf = HrtfEngine::new(dir.path());
    hrtf.load().unwrap();

    let stem_list: Vec<Stem> = stems
        .iter()
        .map(|(name, freq)| {
            let file = dir.path().join(format!("{name}.wav"));
            write_sine_stem(&file, *freq, stem_seconds);
            Stem {
                name: name.to_string(),
                file,
            }
        })
        .collect();

    let project = ProjectData::create(&stem_list, stem_seconds, SAMPLE_RATE, false, Some(1234), vec![]);
    let project_path = dir.path().join("session.json");
    project.save(&project_path).unwrap();

    Fixture {
        _dir: dir,
        hrtf,
        project_path,
        duration: stem_seconds,
    }
}

#[test]
fn binaural_render_shape_and_level() {
    let fx = fixture(1.0, &[("guitar", 440.0), ("vocal", 220.0)]);
    let out = render_project(&fx.project_path, &fx.hrtf, OutputFormat::Binaural, None).unwrap();

    let mix = load_audio(&out).unwrap();
    assert_eq!(mix.channels.len(), 2);
    assert_eq!(mix.frames(), (fx.duration * SAMPLE_RATE as f64) as usize);

    let peak = mix
        .channels
        .iter()
        .flatten()
        .fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(peak <= 1.0 + 1e-3, "clipping after normalization: {peak}");
    assert!(peak > 0.01, "render is silent");
}

#[test]
fn output_name_carries_format() {
    let fx = fixture(0.5, &[("guitar", 440.0)]);
    let out = render_project(
        &fx.project_path,
        &fx.hrtf,
        OutputFormat::CinemaBinaural,
        None,
    )
    .unwrap();
    assert!(out
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .ends_with("_cinema_binaural.wav"));
}

#[test]
fn all_formats_render() {
    let fx = fixture(0.5, &[("guitar", 440.0), ("pad_airy", 600.0)]);
    for format in [
        OutputFormat::Binaural,
        OutputFormat::CinemaBinaural,
        OutputFormat::StaticBinaural,
        OutputFormat::StaticSpeaker,
        OutputFormat::Speaker3d,
    ] {
        let out = render_project(&fx.project_path, &fx.hrtf, format, None).unwrap();
        let mix = load_audio(&out).unwrap();
        assert_eq!(mix.frames(), (fx.duration * SAMPLE_RATE as f64) as usize);
    }
}

#[test]
fn sub_chunk_sources_render_silence() {
    // 2000 frames is shorter than one convolution chunk, so the chunk loop
    // never runs and the mix stays empty.
    let seconds = 2000.0 / SAMPLE_RATE as f64;
    let fx = fixture(seconds, &[("guitar", 440.0)]);
    let out = render_project(&fx.project_path, &fx.hrtf, OutputFormat::Binaural, None).unwrap();

    let mix = load_audio(&out).unwrap();
    let peak = mix
        .channels
        .iter()
        .flatten()
        .fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(peak < 1e-6, "expected silence, got peak {peak}");
}

#[test]
fn sample_rate_mismatch_names_object() {
    let fx = fixture(0.5, &[("guitar", 440.0)]);

    // Overwrite the stem with audio at a different rate.
    let project = ProjectData::load(&fx.project_path).unwrap();
    let stem_path = &project.objects[0].file;
    let samples = vec![0.1f32; 24000];
    write_wav_mono(stem_path, &samples, 48000).unwrap();

    let err =
        render_project(&fx.project_path, &fx.hrtf, OutputFormat::Binaural, None).unwrap_err();
    match err {
        BackendError::Object { name, source } => {
            assert_eq!(name, "guitar");
            assert!(matches!(
                *source,
                BackendError::SampleRateMismatch {
                    source_rate: 48000,
                    project_rate: SAMPLE_RATE,
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_stem_names_object() {
    let fx = fixture(0.5, &[("guitar", 440.0)]);
    let project = ProjectData::load(&fx.project_path).unwrap();
    std::fs::remove_file(&project.objects[0].file).unwrap();

    let err =
        render_project(&fx.project_path, &fx.hrtf, OutputFormat::Binaural, None).unwrap_err();
    assert!(matches!(err, BackendError::Object { .. }));
}

#[test]
fn keyframed_object_renders() {
    let fx = fixture(1.0, &[("guitar", 440.0)]);

    let mut project = ProjectData::load(&fx.project_path).unwrap();
    project.objects[0].keyframes = vec![
        spatial_backend::models::Keyframe {
            time: 0.0,
            azi: 30.0,
            ele: 0.0,
            object_name: Some("guitar".into()),
        },
        spatial_backend::models::Keyframe {
            time: 0.5,
            azi: 210.0,
            ele: 20.0,
            object_name: Some("guitar".into()),
        },
    ];
    project.save(&fx.project_path).unwrap();

    let out = render_project(&fx.project_path, &fx.hrtf, OutputFormat::Binaural, None).unwrap();
    let mix = load_audio(&out).unwrap();
    let peak = mix
        .channels
        .iter()
        .flatten()
        .fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(peak > 0.01);
}
