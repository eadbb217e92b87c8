// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Decoding clips into memory.
//!
//! Clips are short, so they are decoded in full on first play and kept around for the
//! life of their handle.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

use super::AudioError;

/// A fully decoded clip as interleaved f32 samples.
#[derive(Clone, Debug)]
pub struct Clip {
    data: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl Clip {
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32) -> Clip {
        Clip {
            data,
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of frames in the clip.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the sample for the given frame and output channel. Mono clips feed every
    /// output channel; otherwise output channels wrap around the clip's channels.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        let channel = if channels == 1 { 0 } else { channel % channels };
        self.data
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Decodes the file at the given path, transcoding it to the target sample rate.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<Clip, AudioError> {
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.to_path_buf()));
    }

    let decode_err = |reason: String| AudioError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| decode_err(e.to_string()))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no audio track found".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs()
        .make(&params, &decoder_opts)
        .map_err(|e| decode_err(e.to_string()))?;

    let mut samples = Vec::new();
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut sample_rate = params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(decode_err(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A single bad packet shouldn't take down the whole clip.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = ?path, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_err(e.to_string())),
        };

        let spec = *decoded.spec();
        if channels == 0 {
            channels = spec.channels.count() as u16;
        }
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if channels == 0 || sample_rate == 0 {
        return Err(decode_err("unable to determine the clip format".to_string()));
    }

    let clip = if sample_rate != target_rate && target_rate > 0 {
        info!(
            path = ?path,
            source_rate = sample_rate,
            target_rate,
            "Transcoding clip"
        );
        Clip::new(
            transcode(&samples, channels, sample_rate, target_rate)?,
            channels,
            target_rate,
        )
    } else {
        Clip::new(samples, channels, sample_rate)
    };

    info!(
        path = ?path,
        channels = clip.channels(),
        sample_rate = clip.sample_rate(),
        duration_ms = clip.duration().as_millis(),
        "Clip decoded"
    );
    Ok(clip)
}

/// The number of frames fed to the resampler at a time.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Resamples interleaved samples from one sample rate to another. The resampler's
/// delay is trimmed so the output lines up with the input and has the length the new
/// rate implies.
fn transcode(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    if source_frames == 0 {
        return Ok(Vec::new());
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (source_frames as f64 * ratio).ceil() as usize;

    let sinc_params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, channels)
            .map_err(|_| AudioError::ResamplingFailed(source_rate, target_rate))?;

    // rubato works on planar buffers.
    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|channel| {
            samples[..source_frames * channels]
                .iter()
                .skip(channel)
                .step_by(channels)
                .copied()
                .collect()
        })
        .collect();

    let delay = resampler.output_delay();
    let mut output = vec![Vec::with_capacity(expected + delay); channels];
    let mut scratch = resampler.output_buffer_allocate(true);
    let mut position = 0;
    while output[0].len() < expected + delay {
        let needed = resampler.input_frames_next();
        let result = if position + needed <= source_frames {
            let block: Vec<&[f32]> = planar
                .iter()
                .map(|channel| &channel[position..position + needed])
                .collect();
            position += needed;
            resampler.process_into_buffer(&block, &mut scratch, None)
        } else if position < source_frames {
            let block: Vec<&[f32]> = planar.iter().map(|channel| &channel[position..]).collect();
            position = source_frames;
            resampler.process_partial_into_buffer(Some(block.as_slice()), &mut scratch, None)
        } else {
            // Flush what is left in the resampler.
            resampler.process_partial_into_buffer(None::<&[Vec<f32>]>, &mut scratch, None)
        };
        let (_, produced) =
            result.map_err(|_| AudioError::ResamplingFailed(source_rate, target_rate))?;

        if produced == 0 && position >= source_frames {
            break;
        }
        for (out, chunk) in output.iter_mut().zip(scratch.iter()) {
            out.extend_from_slice(&chunk[..produced]);
        }
    }

    let mut interleaved = Vec::with_capacity(expected * channels);
    for frame in delay..(delay + expected) {
        for channel in &output {
            interleaved.push(channel.get(frame).copied().unwrap_or(0.0));
        }
    }
    Ok(interleaved)
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_decode_wav() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tone.wav");
        write_wav(&path, 2, 44100, 441)?;

        let clip = decode_file(&path, 44100)?;
        assert_eq!(2, clip.channels());
        assert_eq!(44100, clip.sample_rate());
        assert_eq!(441, clip.frames());
        assert_eq!(Duration::from_millis(10), clip.duration());
        Ok(())
    }

    #[test]
    fn test_decode_transcodes() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tone.wav");
        write_wav(&path, 1, 44100, 4410)?;

        let clip = decode_file(&path, 48000)?;
        assert_eq!(48000, clip.sample_rate());
        assert_eq!(4800, clip.frames());
        Ok(())
    }

    #[test]
    fn test_decode_missing() {
        assert!(matches!(
            decode_file(Path::new("/nonexistent/clip.wav"), 44100),
            Err(AudioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_decode_garbage() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a wav file")?;

        assert!(matches!(
            decode_file(&path, 44100),
            Err(AudioError::Decode { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_decode_transcodes_low_rate() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("low.wav");
        write_wav(&path, 2, 22050, 2205)?;

        let clip = decode_file(&path, 48000)?;
        assert_eq!(2, clip.channels());
        assert_eq!(48000, clip.sample_rate());
        assert_eq!(4800, clip.frames());
        assert_eq!(Duration::from_millis(100), clip.duration());
        Ok(())
    }

    #[test]
    fn test_transcode_stereo() -> Result<(), AudioError> {
        let source: Vec<f32> = (0..4410).flat_map(|_| [0.5f32, -0.5]).collect();
        let result = transcode(&source, 2, 44100, 48000)?;

        assert_eq!(9600, result.len());
        // Away from the edges a constant signal stays constant on each channel.
        assert!((result[4800] - 0.5).abs() < 0.01, "{}", result[4800]);
        assert!((result[4801] + 0.5).abs() < 0.01, "{}", result[4801]);
        Ok(())
    }

    #[test]
    fn test_transcode_empty() -> Result<(), AudioError> {
        assert!(transcode(&[], 1, 44100, 48000)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_clip_sample_mapping() {
        let mono = Clip::new(vec![0.5, 0.25], 1, 44100);
        assert_eq!(0.5, mono.sample(0, 1));
        assert_eq!(0.25, mono.sample(1, 0));
        assert_eq!(0.0, mono.sample(2, 0));

        let stereo = Clip::new(vec![0.1, 0.2, 0.3, 0.4], 2, 44100);
        assert_eq!(0.2, stereo.sample(0, 1));
        assert_eq!(0.3, stereo.sample(1, 2));
    }
}
