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

//! Persisted user preferences.
//!
//! Preferences are kept per pack: the global volume and the loop and volume settings of
//! every clip, stored in the same shape as the pack definition. Separately, the last
//! selected pack is remembered. Saved clip settings are matched to a freshly loaded pack
//! by flat index only, so they stop lining up if a pack's structure is edited.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::pack::PackDefinition;
use crate::pack::catalog::DEFAULT_PACK;
use crate::pack::SoundPack;

pub mod kv;

pub use kv::{FileStore, KeyValueStore, MemoryStore, PersistenceError};

/// The key holding application wide settings.
pub const APP_KEY: &str = "soundTapApp";

/// The key the single-pack settings format was stored under.
pub const LEGACY_KEY: &str = "soundTapSettings";

/// The prefix of the per-pack settings keys.
const PACK_KEY_PREFIX: &str = "soundTapPack_";

/// Returns the key that holds the settings for the given pack.
pub fn pack_key(pack_id: &str) -> String {
    format!("{}{}", PACK_KEY_PREFIX, pack_id)
}

/// Application wide settings.
#[derive(Deserialize, Serialize, Debug, Default)]
struct AppSettings {
    #[serde(rename = "currentSoundPack", skip_serializing_if = "Option::is_none")]
    current_sound_pack: Option<String>,
}

/// Settings saved before they were split per pack.
#[derive(Deserialize, Debug)]
struct LegacySettings {
    #[serde(rename = "currentSoundPack")]
    current_sound_pack: Option<String>,
    #[serde(flatten)]
    pack: serde_json::Value,
}

/// A saved setting for a single clip. Only fields that were saved are present.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SoundOverride {
    pub looping: Option<bool>,
    pub volume: Option<u8>,
}

/// The saved settings for a pack, addressed by flat index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
    pub global_volume: Option<u8>,
    pub sounds: BTreeMap<usize, SoundOverride>,
}

impl Overrides {
    /// Extracts the overrides from saved pack settings.
    fn from_definition(definition: &PackDefinition) -> Overrides {
        Overrides {
            global_volume: definition.global_volume(),
            sounds: definition
                .flat_sounds()
                .into_iter()
                .enumerate()
                .map(|(index, sound)| {
                    (
                        index,
                        SoundOverride {
                            looping: sound.looping(),
                            volume: sound.volume(),
                        },
                    )
                })
                .filter(|(_, sound)| sound.looping.is_some() || sound.volume.is_some())
                .collect(),
        }
    }

    /// Applies the overrides to a pack. Only the fields that are present are written,
    /// and overrides for indices the pack doesn't have are ignored. Returns the global
    /// volume to use.
    pub fn apply(&self, pack: &mut SoundPack) -> u8 {
        for (index, sound_override) in &self.sounds {
            let Some(sound) = pack.sound_mut(*index) else {
                debug!(index, "Ignoring override for missing sound");
                continue;
            };
            if let Some(looping) = sound_override.looping {
                sound.set_looping(looping);
            }
            if let Some(volume) = sound_override.volume {
                sound.set_volume(volume);
            }
        }

        self.global_volume
            .unwrap_or_else(|| pack.global_volume_default())
    }
}

/// Persists and restores preferences on top of a key-value store.
pub struct PreferenceStore {
    store: Arc<dyn KeyValueStore>,
    /// Set once the legacy migration has been attempted.
    migrated: AtomicBool,
}

impl PreferenceStore {
    /// Creates a new preference store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> PreferenceStore {
        PreferenceStore {
            store,
            migrated: AtomicBool::new(false),
        }
    }

    /// Saves the complete current state of a pack along with the pack selection.
    pub fn save(
        &self,
        pack_id: &str,
        global_volume: u8,
        pack: &SoundPack,
    ) -> Result<(), PersistenceError> {
        let result = serde_json::to_string(&PackDefinition::from_pack(global_volume, pack))
            .map_err(PersistenceError::from)
            .and_then(|settings| self.store.set(&pack_key(pack_id), &settings))
            .and_then(|_| self.save_last_selected_pack(pack_id));

        match &result {
            Ok(_) => debug!(pack = pack_id, "Settings saved"),
            Err(e) => error!(pack = pack_id, err = %e, "Failed to save settings"),
        }
        result
    }

    /// Loads the saved overrides for a pack. Returns None if nothing was saved or the
    /// saved settings can't be read.
    pub fn load(&self, pack_id: &str) -> Option<Overrides> {
        let settings = match self.store.get(&pack_key(pack_id)) {
            Ok(settings) => settings?,
            Err(e) => {
                error!(pack = pack_id, err = %e, "Failed to read settings");
                return None;
            }
        };

        match PackDefinition::parse(&settings) {
            Ok(definition) => {
                info!(pack = pack_id, "Settings loaded");
                Some(Overrides::from_definition(&definition))
            }
            Err(e) => {
                warn!(pack = pack_id, err = %e, "Ignoring unreadable settings");
                None
            }
        }
    }

    /// Removes the saved settings for a pack.
    pub fn clear(&self, pack_id: &str) -> Result<(), PersistenceError> {
        self.store.remove(&pack_key(pack_id))?;
        info!(pack = pack_id, "Settings cleared");
        Ok(())
    }

    /// Returns the last selected pack, migrating legacy settings first.
    pub fn load_last_selected_pack(&self) -> Option<String> {
        self.migrate_legacy();

        let settings = match self.store.get(APP_KEY) {
            Ok(settings) => settings?,
            Err(e) => {
                error!(err = %e, "Failed to read pack selection");
                return None;
            }
        };

        match serde_json::from_str::<AppSettings>(&settings) {
            Ok(settings) => settings.current_sound_pack,
            Err(e) => {
                warn!(err = %e, "Ignoring unreadable pack selection");
                None
            }
        }
    }

    /// Remembers the selected pack.
    pub fn save_last_selected_pack(&self, pack_id: &str) -> Result<(), PersistenceError> {
        let settings = serde_json::to_string(&AppSettings {
            current_sound_pack: Some(pack_id.to_string()),
        })?;
        self.store.set(APP_KEY, &settings)
    }

    /// Splits settings saved in the legacy single-key format into the pack selection and
    /// per-pack settings, then removes the legacy key. Only the first call does anything.
    pub fn migrate_legacy(&self) {
        if self.migrated.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.try_migrate_legacy() {
            error!(err = %e, "Failed to migrate legacy settings");
        }
    }

    fn try_migrate_legacy(&self) -> Result<(), PersistenceError> {
        let Some(legacy) = self.store.get(LEGACY_KEY)? else {
            return Ok(());
        };
        let legacy: LegacySettings = serde_json::from_str(&legacy)?;

        let pack_id = match legacy.current_sound_pack {
            Some(pack_id) => {
                self.save_last_selected_pack(&pack_id)?;
                pack_id
            }
            None => DEFAULT_PACK.to_string(),
        };

        self.store
            .set(&pack_key(&pack_id), &serde_json::to_string(&legacy.pack)?)?;
        self.store.remove(LEGACY_KEY)?;
        info!(pack = %pack_id, "Migrated legacy settings");
        Ok(())
    }
}
