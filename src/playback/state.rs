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
use std::fmt;

/// The state of a single clip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// No handle has been created yet.
    #[default]
    Absent,
    /// A handle exists but hasn't been played.
    Ready,
    Playing,
    Paused,
    /// Stopped and rewound.
    Stopped,
    /// The last play failed.
    Error(String),
}

impl PlaybackState {
    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // A stopped clip is ready to go again as far as anyone looking is concerned.
            PlaybackState::Absent | PlaybackState::Ready | PlaybackState::Stopped => {
                write!(f, "Ready")
            }
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::Paused => write!(f, "Paused"),
            PlaybackState::Error(cause) => write!(f, "Error: {}", cause),
        }
    }
}
