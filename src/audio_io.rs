//! Decoding of source stems via symphonia and 16-bit WAV output via hound.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use crate::error::{BackendError, Result};

/// Fully decoded audio, one buffer per channel.
#[derive(Debug)]
pub struct LoadedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl LoadedAudio {
    pub fn frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Per-frame mean of all channels.
    pub fn mix_to_mono(&self) -> Vec<f32> {
        let frames = self.frames();
        let n = self.channels.len();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return self.channels[0].clone();
        }
        let mut out = vec![0.0f32; frames];
        for channel in &self.channels {
            for (o, &s) in out.iter_mut().zip(channel.iter()) {
                *o += s;
            }
        }
        for o in &mut out {
            *o /= n as f32;
        }
        out
    }

    /// First two channels; mono input is duplicated into both.
    pub fn as_stereo(&self) -> (Vec<f32>, Vec<f32>) {
        match self.channels.len() {
            0 => (Vec::new(), Vec::new()),
            1 => (self.channels[0].clone(), self.channels[0].clone()),
            _ => (self.channels[0].clone(), self.channels[1].clone()),
        }
    }
}

/// Decodes an audio file to planar f32 channels at its native rate.
pub fn load_audio(path: &Path) -> Result<LoadedAudio> {
    if !path.exists() {
        return Err(BackendError::MissingSource(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| BackendError::Decode("no default track".into()))?;
    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| BackendError::Decode("unknown sample rate".into()))?;
    let channel_count = track
        .codec_params
        .channels
        .ok_or_else(|| BackendError::Decode("unknown channel count".into()))?
        .count();

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels: Vec<Vec<f32>> = vec![Vec::new(); channel_count];
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(BackendError::Decode(e.to_string())),
        };
        let decoded = decoder
            .decode(&packet)
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if sample_buf.is_none() {
            sample_buf = Some(SampleBuffer::<f32>::new(
                decoded.capacity() as u64,
                *decoded.spec(),
            ));
        }
        let sbuf = sample_buf.as_mut().unwrap();
        sbuf.copy_interleaved_ref(decoded);
        for frame in sbuf.samples().chunks(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame.iter()) {
                channel.push(sample);
            }
        }
    }

    Ok(LoadedAudio {
        channels,
        sample_rate,
    })
}

/// Writes a stereo buffer pair as 16-bit PCM.
pub fn write_wav_stereo(path: &Path, left: &[f32], right: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for (&l, &r) in left.iter().zip(right.iter()) {
        writer.write_sample((l.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        writer.write_sample((r.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Writes a mono buffer as 16-bit PCM.
pub fn write_wav_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
