//! Media-extraction collaborator contract. The renderer only depends on
//! this interface; container demuxing sits behind it, outside the core.

use std::path::{Path, PathBuf};

use crate::audio_io::{load_audio, write_wav_mono};
use crate::error::{BackendError, Result};

/// Channel names of the fixed 8-channel layout, in file order.
pub const CHANNEL_LAYOUT_8: [&str; 8] = ["FL", "FR", "FC", "LFE", "SL", "SR", "BL", "BR"];

#[derive(Debug, Clone)]
pub struct ChannelStem {
    pub name: String,
    pub file: PathBuf,
}

pub trait MediaExtractor {
    /// Returns a decoded PCM audio file for the given media file, or the
    /// same path if it already is one.
    fn extract_audio(&self, media: &Path) -> Result<PathBuf>;

    /// Splits a multichannel PCM file into named mono stems under `dest`.
    /// `None` means no split happened (two channels or fewer).
    fn split_channels(&self, audio: &Path, dest: &Path) -> Result<Option<Vec<ChannelStem>>>;
}

const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "flac", "mp3", "ogg", "aiff", "m4a"];

/// Extractor for inputs that are already PCM audio. Audio files pass
/// through unchanged and multichannel files are split in-process; video
/// containers need an external transcoding step and are rejected.
pub struct PcmExtractor;

impl MediaExtractor for PcmExtractor {
    fn extract_audio(&self, media: &Path) -> Result<PathBuf> {
        let ext = media
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some(e) if AUDIO_EXTENSIONS.contains(&e) => Ok(media.to_path_buf()),
            _ => Err(BackendError::UnsupportedMedia(media.to_path_buf())),
        }
    }

    fn split_channels(&self, audio: &Path, dest: &Path) -> Result<Option<Vec<ChannelStem>>> {
        let loaded = load_audio(audio)?;
        if loaded.channels.len() <= 2 {
            return Ok(None);
        }
        std::fs::create_dir_all(dest)?;

        let mut stems = Vec::with_capacity(loaded.channels.len());
        for (i, channel) in loaded.channels.iter().enumerate() {
            let name = CHANNEL_LAYOUT_8
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("CH{}", i + 1));
            let file = dest.join(format!("{}.wav", name));
            write_wav_mono(&file, channel, loaded.sample_rate)?;
            stems.push(ChannelStem { name, file });
        }
        log::info!(
            "split {} into {} channel stems",
            audio.display(),
            stems.len()
        );
        Ok(Some(stems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_multichannel(path: &Path, channels: usize, frames: usize) {
        let spec = hound::WavSpec {
            channels: channels as u16,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in 0..frames {
            for ch in 0..channels {
                let v = if ch == frame % channels { 0.5 } else { 0.0 };
                writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn passthrough_for_audio_rejects_video() {
        let extractor = PcmExtractor;
        assert_eq!(
            extractor.extract_audio(Path::new("mix.flac")).unwrap(),
            PathBuf::from("mix.flac")
        );
        assert!(matches!(
            extractor.extract_audio(Path::new("movie.mkv")),
            Err(BackendError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn stereo_is_not_split() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("stereo.wav");
        write_multichannel(&src, 2, 256);
        let extractor = PcmExtractor;
        assert!(extractor
            .split_channels(&src, &dir.path().join("stems"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn surround_split_uses_layout_names() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("surround.wav");
        write_multichannel(&src, 6, 256);
        let extractor = PcmExtractor;
        let stems = extractor
            .split_channels(&src, &dir.path().join("stems"))
            .unwrap()
            .unwrap();
        assert_eq!(stems.len(), 6);
        assert_eq!(stems[0].name, "FL");
        assert_eq!(stems[3].name, "LFE");
        for stem in &stems {
            assert!(stem.file.exists());
        }
    }
}
