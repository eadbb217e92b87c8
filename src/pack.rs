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

//! Sound packs.
//!
//! This module provides:
//! - Pack discovery through the pack index
//! - Pack loading and parsing
//! - The sound model and its flat index addressing

pub mod catalog;
pub mod error;
pub mod loader;
pub mod model;

pub use catalog::{display_name, Catalog};
pub use error::{CatalogError, LoadCause, LoadError};
pub use loader::Loader;
pub use model::{Location, SoundDef, SoundEntry, SoundGroup, SoundPack};
