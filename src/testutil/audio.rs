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
use std::{error::Error, f32::consts::PI, fs::File, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Writes a 16 bit WAV file holding a 440Hz tone on every channel.
pub fn write_wav(
    path: &Path,
    channels: u16,
    sample_rate: u32,
    frames: usize,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;

    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let sample = ((2.0 * PI * 440.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}
