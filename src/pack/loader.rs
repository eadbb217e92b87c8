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
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use super::error::{LoadCause, LoadError};
use super::model::SoundPack;
use crate::config::pack::PackDefinition;

/// Loads pack definitions from the packs directory.
#[derive(Clone, Debug)]
pub struct Loader {
    packs_dir: PathBuf,
}

impl Loader {
    /// Creates a new loader for the given directory.
    pub fn new(packs_dir: &Path) -> Loader {
        Loader {
            packs_dir: packs_dir.to_path_buf(),
        }
    }

    /// Loads the pack with the given identifier.
    pub fn load(&self, id: &str) -> Result<SoundPack, LoadError> {
        let path = self.path_for(id)?;
        let result = fs::read_to_string(&path)
            .map_err(LoadCause::from)
            .and_then(|contents| Ok(PackDefinition::parse(&contents)?))
            .map(|definition| definition.to_pack());

        match result {
            Ok(pack) => {
                info!(id, pack = %pack, "Loaded sound pack");
                Ok(pack)
            }
            Err(cause) => {
                let err = LoadError::new(id, cause);
                warn!(err = %err, "Sound pack not loaded");
                Err(err)
            }
        }
    }

    /// Resolves the path of a pack, refusing identifiers that would escape the packs
    /// directory.
    fn path_for(&self, id: &str) -> Result<PathBuf, LoadError> {
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.packs_dir.join(id)),
            _ => Err(LoadError::new(id, LoadCause::InvalidId)),
        }
    }
}
