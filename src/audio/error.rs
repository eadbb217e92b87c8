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
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Audio file {0} not found")]
    FileNotFound(PathBuf),

    #[error("Unable to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Unable to resample from {0} Hz to {1} Hz")]
    ResamplingFailed(u32, u32),

    #[error("No audio device found with name {0}")]
    DeviceNotFound(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AudioError {
    pub(crate) fn device(err: impl std::fmt::Display) -> AudioError {
        AudioError::Device(err.to_string())
    }
}
