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
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::error::CatalogError;
use crate::config;

/// The name of the file in the packs directory that lists the available packs.
pub const INDEX_FILE: &str = "index.json";

/// The pack used when nothing else is available.
pub const DEFAULT_PACK: &str = "dndeekend.json";

/// The packs assumed to exist when the index can't be read.
pub const FALLBACK_PACKS: [&str; 2] = [DEFAULT_PACK, "migo.json"];

/// The JSON representation of the pack index.
#[derive(Deserialize)]
struct PackIndex {
    #[serde(default)]
    packs: Vec<String>,
}

/// Discovers the available sound packs.
#[derive(Clone, Debug)]
pub struct Catalog {
    /// The directory holding the pack index and pack definitions.
    packs_dir: PathBuf,
    /// Packs to fall back to if the index is unavailable.
    fallback: Vec<String>,
    /// The pack to add if no packs are found at all.
    default_pack: String,
}

impl Catalog {
    /// Creates a new catalog for the given directory with the built-in fallbacks.
    pub fn new(packs_dir: &Path) -> Catalog {
        Catalog {
            packs_dir: packs_dir.to_path_buf(),
            fallback: FALLBACK_PACKS.iter().map(|pack| pack.to_string()).collect(),
            default_pack: DEFAULT_PACK.to_string(),
        }
    }

    /// Creates the catalog described by the soundboard configuration.
    pub fn from_config(config: &config::Soundboard) -> Catalog {
        Catalog::new(config.packs())
            .with_fallback(config.fallback_packs().to_vec())
            .with_default_pack(config.default_pack())
    }

    /// Replaces the fallback pack list.
    pub fn with_fallback(mut self, fallback: Vec<String>) -> Catalog {
        self.fallback = fallback;
        self
    }

    /// Replaces the default pack.
    pub fn with_default_pack(mut self, default_pack: &str) -> Catalog {
        self.default_pack = default_pack.to_string();
        self
    }

    pub fn default_pack(&self) -> &str {
        &self.default_pack
    }

    /// Lists the available packs. The list is never empty.
    pub fn list_packs(&self) -> Vec<String> {
        let mut packs = match self.read_index() {
            Ok(packs) => packs,
            Err(e) => {
                warn!(err = %e, "Unable to read pack index, using fallback packs");
                self.fallback.clone()
            }
        };

        if packs.is_empty() {
            packs.push(self.default_pack.clone());
        }

        debug!(packs = packs.len(), "Discovered sound packs");
        packs
    }

    fn read_index(&self) -> Result<Vec<String>, CatalogError> {
        let path = self.packs_dir.join(INDEX_FILE);
        let contents = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let index: PackIndex = serde_json::from_str(&contents)
            .map_err(|source| CatalogError::Parse { path, source })?;
        Ok(index.packs)
    }
}

/// Converts a pack identifier into something friendlier to show to a user:
/// `sci-fi_sounds.json` becomes `Sci Fi Sounds`.
pub fn display_name(id: &str) -> String {
    let stem = id.strip_suffix(".json").unwrap_or(id);
    stem.replace(['-', '_'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
