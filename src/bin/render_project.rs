use clap::{Args as ClapArgs, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use spatial_backend::audio_io::load_audio;
use spatial_backend::config::CONFIG;
use spatial_backend::extract::{MediaExtractor, PcmExtractor};
use spatial_backend::models::{Role, Stem};
use spatial_backend::renderer::{render_project, OutputFormat};
use spatial_backend::trajectory::{TrajectoryEngine, TrajectoryPreset};
use spatial_backend::{HrtfEngine, ProjectData};

/// CLI for creating and rendering spatial audio projects
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project document from an audio file or multichannel stem set
    Create(CreateArgs),
    /// Render a project document to a spatialized stereo mix
    Render(RenderArgs),
}

#[derive(ClapArgs)]
struct CreateArgs {
    /// Input audio file (multichannel inputs are split into per-channel stems)
    input: PathBuf,
    /// Force the surround channel layout even for few stems
    #[arg(long, default_value_t = false)]
    surround: bool,
    /// Seed for reproducible physics generation
    #[arg(long)]
    seed: Option<u64>,
    /// Author long-form trajectories with this preset
    /// (organic, chaotic, smooth, curious, aggressive)
    #[arg(long)]
    trajectory: Option<String>,
    /// Output path for the project document
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs)]
struct RenderArgs {
    /// Path to the project document
    project: PathBuf,
    /// Output format: binaural, cinema_binaural, static_binaural,
    /// static_speaker or speaker_3d
    #[arg(long, default_value = "binaural")]
    format: String,
    /// Output path for the rendered mix
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Create(args) => create_command(args)?,
        Commands::Render(args) => render_command(args)?,
    }
    Ok(())
}

fn create_command(args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = PcmExtractor;
    let audio_path = extractor.extract_audio(&args.input)?;
    let info = load_audio(&audio_path)?;

    let input_stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("project")
        .to_string();
    let stems_dir = audio_path.with_file_name(format!("{}_stems", input_stem));

    let stems: Vec<Stem> = match extractor.split_channels(&audio_path, &stems_dir)? {
        Some(list) => list
            .into_iter()
            .map(|s| Stem {
                name: s.name,
                file: s.file,
            })
            .collect(),
        None => vec![Stem {
            name: input_stem.clone(),
            file: audio_path.clone(),
        }],
    };

    let is_surround = args.surround || stems.len() > 2;
    let mut project = ProjectData::create(
        &stems,
        info.duration_seconds(),
        info.sample_rate,
        is_surround,
        args.seed,
        vec![],
    );

    if let Some(preset) = args.trajectory {
        let preset: TrajectoryPreset = preset.parse()?;
        let engine = TrajectoryEngine::new(project.seed);
        let mut rng = StdRng::seed_from_u64(project.seed);
        for object in &mut project.objects {
            if matches!(object.role, Role::Spatial | Role::Ethereal) {
                object.physics = engine.generate(object.role, preset, &mut rng);
            }
        }
    }

    let out = args
        .out
        .unwrap_or_else(|| audio_path.with_file_name(format!("{}_project.json", input_stem)));
    project.save(&out)?;
    println!("Project created at {} (seed {})", out.display(), project.seed);
    Ok(())
}

fn render_command(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let format: OutputFormat = args.format.parse()?;

    let mut hrtf = HrtfEngine::new(CONFIG.hrtf_dir.clone());
    hrtf.load()?;

    // Relative output paths land in the configured output directory.
    let out = match args.out {
        Some(p) if p.is_absolute() => Some(p),
        Some(p) => {
            std::fs::create_dir_all(&CONFIG.output_dir)?;
            Some(CONFIG.output_dir.join(p))
        }
        None => None,
    };

    let out = render_project(&args.project, &hrtf, format, out.as_deref())?;
    println!("Rendered: {}", out.display());
    Ok(())
}
