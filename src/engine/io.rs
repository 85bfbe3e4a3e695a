//! Audio file I/O for Aberrant
//!
//! Loading accepts any integer or float WAV that hound can decode. Saving is
//! always 16-bit PCM regardless of the internal float representation.
//!
//! These functions allocate and touch the filesystem; they belong to voice
//! setup and teardown, never to the audio thread.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};

use crate::engine::buffer::{AudioBuffer, MAX_CHANNELS};
use crate::error::{AberrantError, Result};

/// Bit depth used for every saved file
pub const SAVE_BIT_DEPTH: u16 = 16;

/// Load a WAV file into an AudioBuffer
///
/// # Errors
/// * `FileNotFound` - if the path does not exist
/// * `AudioRead` - if hound cannot open or decode the file (including truncated data)
/// * `UnsupportedFormat` - if the channel count is outside 1-16 or the bit depth is unusable
pub fn load_wav(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(AberrantError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| read_error(path, e))?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.channels > MAX_CHANNELS {
        return Err(AberrantError::UnsupportedFormat {
            path: path.display().to_string(),
            details: format!("{} channels (supported: 1-{})", spec.channels, MAX_CHANNELS),
        });
    }

    let samples = read_samples_as_f32(reader, &spec, path)?;
    let buffer = AudioBuffer::from_interleaved(&samples, spec.channels, spec.sample_rate)?;

    info!(
        "Loaded {} ({} frames, {} ch, {} Hz)",
        path.display(),
        buffer.num_frames(),
        buffer.channels(),
        buffer.sample_rate()
    );

    Ok(buffer)
}

/// Save an AudioBuffer as a 16-bit PCM WAV file
///
/// Samples outside [-1, 1] are clipped on conversion.
pub fn save_wav_pcm16(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: SAVE_BIT_DEPTH,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| write_error(path, e))?;

    for &sample in buffer.samples() {
        writer
            .write_sample(f32_to_i16(sample))
            .map_err(|e| write_error(path, e))?;
    }

    writer.finalize().map_err(|e| write_error(path, e))?;

    info!(
        "Saved {} ({} frames, 16-bit PCM)",
        path.display(),
        buffer.num_frames()
    );

    Ok(())
}

/// Convert a float sample to 16-bit PCM, clipping out-of-range values
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

fn read_samples_as_f32<R: std::io::Read>(
    reader: WavReader<R>,
    spec: &WavSpec,
    path: &Path,
) -> Result<Vec<f32>> {
    match spec.sample_format {
        SampleFormat::Float => {
            debug!("Decoding {}-bit float samples", spec.bits_per_sample);
            reader
                .into_samples::<f32>()
                .map(|s| s.map_err(|e| read_error(path, e)))
                .collect()
        }
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(AberrantError::UnsupportedFormat {
                    path: path.display().to_string(),
                    details: format!("{}-bit integer samples", bits),
                });
            }
            debug!("Decoding {}-bit integer samples", bits);
            let scale = 1.0 / (1u64 << (bits - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| {
                    s.map(|v| (v as f64 * scale) as f32)
                        .map_err(|e| read_error(path, e))
                })
                .collect()
        }
    }
}

fn read_error(path: &Path, source: hound::Error) -> AberrantError {
    AberrantError::AudioRead {
        path: path.display().to_string(),
        source,
    }
}

fn write_error(path: &Path, source: hound::Error) -> AberrantError {
    AberrantError::AudioWrite {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn test_f32_to_i16_clips() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32768);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_missing_file() {
        let err = load_wav(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert!(err.to_string().contains("/definitely/not/here.wav"));
    }

    #[test]
    fn test_garbage_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"this is not a riff header").unwrap();

        let err = load_wav(&path).unwrap_err();
        assert_eq!(err.error_code(), "AUDIO_READ");
        assert!(err.to_string().contains("garbage.wav"));
    }

    #[test]
    fn test_saved_file_is_16_bit_pcm() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buffer = AudioBuffer::sine_wave(220.0, 0.05, 48000).unwrap();
        save_wav_pcm16(&buffer, &path).unwrap();

        let spec = WavReader::open(&path).unwrap().spec();
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.num_frames(), buffer.num_frames());
        assert_abs_diff_eq!(loaded.samples()[100], buffer.samples()[100], epsilon = 1e-3);
    }

    #[test]
    fn test_loads_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [0.25_f32, -0.25, 0.5, -0.5] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.sample_rate(), 44100);
        assert_eq!(loaded.samples(), &[0.25, -0.25, 0.5, -0.5]);
    }
}
