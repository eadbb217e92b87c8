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
use std::path::PathBuf;

/// Errors reading the pack catalog. These are never fatal: the catalog falls back to
/// its built-in pack list.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unable to read pack index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed pack index {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a pack couldn't be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadCause {
    #[error("invalid pack identifier")]
    InvalidId,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("malformed pack definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A pack failed to load. Nothing from a failed load is ever applied.
#[derive(Debug, thiserror::Error)]
#[error("Failed to load sound pack {id}: {cause}")]
pub struct LoadError {
    pub id: String,
    #[source]
    pub cause: LoadCause,
}

impl LoadError {
    pub fn new(id: &str, cause: impl Into<LoadCause>) -> LoadError {
        LoadError {
            id: id.to_string(),
            cause: cause.into(),
        }
    }
}
