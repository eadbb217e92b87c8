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
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;
use crate::pack::catalog::{DEFAULT_PACK, FALLBACK_PACKS};

/// The prefix for environment variables that override the config file.
const ENV_PREFIX: &str = "SOUNDTAP";

/// The configuration for the soundboard.
#[derive(Deserialize, Clone, Debug)]
pub struct Soundboard {
    /// The directory holding the pack index and pack definitions.
    #[serde(default = "default_packs")]
    packs: PathBuf,

    /// The directory relative clip paths are resolved against.
    #[serde(default = "default_sounds")]
    sounds: PathBuf,

    /// The file preferences are persisted to.
    #[serde(default = "default_state")]
    state: PathBuf,

    /// The directory exports are written to.
    #[serde(default = "default_exports")]
    exports: PathBuf,

    /// The pack to use when none has been selected before.
    #[serde(default = "default_pack")]
    default_pack: String,

    /// The packs to offer when the pack index can't be read.
    #[serde(default = "default_fallback_packs")]
    fallback_packs: Vec<String>,

    /// The audio configuration.
    #[serde(default)]
    audio: Audio,
}

fn default_packs() -> PathBuf {
    PathBuf::from("packs")
}

fn default_sounds() -> PathBuf {
    PathBuf::from(".")
}

fn default_state() -> PathBuf {
    PathBuf::from("soundtap-state.json")
}

fn default_exports() -> PathBuf {
    PathBuf::from(".")
}

fn default_pack() -> String {
    DEFAULT_PACK.to_string()
}

fn default_fallback_packs() -> Vec<String> {
    FALLBACK_PACKS.iter().map(|pack| pack.to_string()).collect()
}

impl Default for Soundboard {
    fn default() -> Self {
        Soundboard {
            packs: default_packs(),
            sounds: default_sounds(),
            state: default_state(),
            exports: default_exports(),
            default_pack: default_pack(),
            fallback_packs: default_fallback_packs(),
            audio: Audio::default(),
        }
    }
}

impl Soundboard {
    /// Parse the soundboard configuration from a YAML file. Relative paths in the file
    /// are resolved against the file's directory.
    pub fn deserialize(path: &Path) -> Result<Soundboard, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Soundboard>()?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    /// Resolves every relative path against the given directory.
    pub fn relative_to(mut self, base: &Path) -> Soundboard {
        for path in [
            &mut self.packs,
            &mut self.sounds,
            &mut self.state,
            &mut self.exports,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    pub fn packs(&self) -> &Path {
        &self.packs
    }

    pub fn sounds(&self) -> &Path {
        &self.sounds
    }

    pub fn state(&self) -> &Path {
        &self.state
    }

    pub fn exports(&self) -> &Path {
        &self.exports
    }

    pub fn default_pack(&self) -> &str {
        &self.default_pack
    }

    pub fn fallback_packs(&self) -> &[String] {
        &self.fallback_packs
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }
}
