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
use std::path::Path;

mod audio;
mod error;
pub mod pack;
mod soundboard;

pub use audio::{Audio, DEFAULT_DEVICE};
pub use error::ConfigError;
pub use soundboard::Soundboard;

/// Loads the soundboard configuration, falling back to the defaults (relative to the
/// current directory) when no file is given.
pub fn load(path: Option<&Path>) -> Result<Soundboard, ConfigError> {
    match path {
        Some(path) => Soundboard::deserialize(path),
        None => Ok(Soundboard::default()),
    }
}
