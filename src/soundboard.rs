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

//! The soundboard application state.
//!
//! A [`Soundboard`] ties the pack catalog, the pack loader, the preference store and the
//! playback engine together. None of its operations fail: each one reports a [`Status`]
//! for whoever is driving the board to show.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, span, warn, Span};

use crate::audio;
use crate::config::{self, pack::PackDefinition};
use crate::pack::{display_name, Catalog, LoadError, Loader, SoundPack};
use crate::playback::{PlaybackEngine, PlaybackState};
use crate::prefs::{KeyValueStore, PreferenceStore};

/// How a status message should be shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// The outcome of a soundboard operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub level: Level,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Status {
        Status {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Status {
        Status {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info => write!(f, "{}", self.message),
            Level::Error => write!(f, "Error: {}", self.message),
        }
    }
}

/// Everything needed to render a single clip.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub index: usize,
    pub name: String,
    /// The group the clip belongs to, if any.
    pub group: Option<String>,
    pub looping: bool,
    pub volume: u8,
    pub state: PlaybackState,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No sound pack is loaded")]
    NoPack,
    #[error("Unable to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Returns the file name settings for the given pack are exported under.
pub fn export_file_name(pack_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "sound-tap-{}-settings-{}.json",
        pack_id.replacen(".json", "", 1),
        now.format("%Y-%m-%dT%H-%M-%S")
    )
}

/// The soundboard.
pub struct Soundboard {
    catalog: Catalog,
    loader: Loader,
    prefs: PreferenceStore,
    engine: PlaybackEngine,
    /// The directory exports go to by default.
    exports: PathBuf,
    /// The packs offered by the catalog.
    packs: Vec<String>,
    /// The loaded pack's identifier. None until a pack loads successfully.
    current: Option<String>,
    pack: SoundPack,
    span: Span,
}

impl Soundboard {
    /// Creates a new soundboard. Nothing is loaded until [`Soundboard::init`] is called.
    pub fn new(
        config: &config::Soundboard,
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn audio::Backend>,
    ) -> Soundboard {
        Soundboard {
            catalog: Catalog::from_config(config),
            loader: Loader::new(config.packs()),
            prefs: PreferenceStore::new(store),
            engine: PlaybackEngine::new(backend, config.sounds()),
            exports: config.exports().to_path_buf(),
            packs: Vec::new(),
            current: None,
            pack: SoundPack::empty(),
            span: span!(tracing::Level::INFO, "soundboard"),
        }
    }

    /// Discovers packs and loads the remembered pack (or the default one) with its saved
    /// settings.
    pub fn init(&mut self) -> Status {
        let span = self.span.clone();
        let _enter = span.enter();

        self.packs = self.catalog.list_packs();
        let selected = self.remembered_pack(&self.packs);

        self.engine.reset();
        match self.loader.load(&selected) {
            Ok(pack) => {
                self.activate(&selected, pack);
                info!(pack = %selected, sounds = self.pack.len(), "Soundboard ready.");
                Status::info(format!(
                    "Ready! Loaded sound pack {} with {} sounds.",
                    display_name(&selected),
                    self.pack.len()
                ))
            }
            Err(e) => {
                error!(err = %e, "Failed to initialize.");
                self.current = None;
                self.pack = SoundPack::empty();
                Status::error(format!(
                    "Error loading sounds from {}. Please check your sound pack files.",
                    display_name(&selected)
                ))
            }
        }
    }

    /// Switches to another pack. If the pack can't be loaded the current one stays.
    pub fn switch_pack(&mut self, pack_id: &str) -> Status {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.current.as_deref() == Some(pack_id) {
            return Status::info(format!(
                "Already using sound pack: {}",
                display_name(pack_id)
            ));
        }

        self.engine.stop_all();
        let pack = match self.loader.load(pack_id) {
            Ok(pack) => pack,
            Err(e) => {
                error!(err = %e, "Failed to switch sound pack.");
                return Status::error(format!(
                    "Error loading sound pack: {}",
                    display_name(pack_id)
                ));
            }
        };

        self.engine.reset();
        self.activate(pack_id, pack);
        // Only the selection is saved. The pack's own settings are untouched until the
        // user changes something.
        if let Err(e) = self.prefs.save_last_selected_pack(pack_id) {
            error!(err = %e, "Failed to save pack selection.");
        }

        info!(pack = pack_id, "Switched sound pack.");
        Status::info(format!("Switched to sound pack: {}", display_name(pack_id)))
    }

    /// The last selected pack if the catalog still offers it, otherwise the default.
    fn remembered_pack(&self, packs: &[String]) -> String {
        self.prefs
            .load_last_selected_pack()
            .filter(|pack_id| packs.contains(pack_id))
            .unwrap_or_else(|| self.catalog.default_pack().to_string())
    }

    /// Applies a pack's saved settings, returning the global volume to use.
    fn apply_saved(&self, pack_id: &str, pack: &mut SoundPack) -> u8 {
        match self.prefs.load(pack_id) {
            Some(overrides) => overrides.apply(pack),
            None => pack.global_volume_default(),
        }
    }

    /// Applies saved settings to a freshly loaded pack and makes it current.
    fn activate(&mut self, pack_id: &str, mut pack: SoundPack) {
        let global_volume = self.apply_saved(pack_id, &mut pack);
        self.engine.set_global_volume(&pack, global_volume as i64);
        self.pack = pack;
        self.current = Some(pack_id.to_string());
    }

    /// Saves the current pack's settings. A failed save only means the change won't
    /// survive a restart.
    fn save(&self) {
        let Some(pack_id) = &self.current else {
            return;
        };
        if let Err(e) = self
            .prefs
            .save(pack_id, self.engine.global_volume(), &self.pack)
        {
            debug!(parent: &self.span, pack = %pack_id, err = %e, "Change not persisted.");
        }
    }

    fn sound_name(&self, index: usize) -> Option<String> {
        self.pack.sound(index).map(|sound| sound.name().to_string())
    }

    fn unknown(index: usize) -> Status {
        Status::error(format!("No sound with index {}", index))
    }

    /// Plays a clip, stopping everything else first if exclusive.
    pub fn play(&mut self, index: usize, exclusive: bool) -> Status {
        let Some(name) = self.sound_name(index) else {
            return Soundboard::unknown(index);
        };
        match self.engine.play(&self.pack, index, exclusive) {
            Ok(()) => Status::info(format!("Playing {}", name)),
            Err(e) => Status::error(format!("Unable to play {}: {}", name, e)),
        }
    }

    pub fn pause(&mut self, index: usize) -> Status {
        let Some(name) = self.sound_name(index) else {
            return Soundboard::unknown(index);
        };
        if !self.engine.is_playing(index) {
            return Status::info(format!("{} is not playing", name));
        }
        self.engine.pause(index);
        Status::info(format!("Paused {}", name))
    }

    pub fn stop(&mut self, index: usize) -> Status {
        let Some(name) = self.sound_name(index) else {
            return Soundboard::unknown(index);
        };
        self.engine.stop(index);
        Status::info(format!("Stopped {}", name))
    }

    pub fn stop_all(&mut self) -> Status {
        let count = self.engine.stop_all();
        Status::info(format!("Stopped all sounds ({} were playing)", count))
    }

    pub fn set_loop(&mut self, index: usize, looping: bool) -> Status {
        let Some(name) = self.sound_name(index) else {
            return Soundboard::unknown(index);
        };
        if let Err(e) = self.engine.set_loop(&mut self.pack, index, looping) {
            return Status::error(e.to_string());
        }
        self.save();
        Status::info(format!(
            "Loop {} for {}",
            if looping { "on" } else { "off" },
            name
        ))
    }

    pub fn set_global_volume(&mut self, percent: i64) -> Status {
        self.engine.set_global_volume(&self.pack, percent);
        self.save();
        Status::info(format!(
            "Global volume set to {}%",
            self.engine.global_volume()
        ))
    }

    pub fn set_individual_volume(&mut self, index: usize, percent: i64) -> Status {
        let Some(name) = self.sound_name(index) else {
            return Soundboard::unknown(index);
        };
        if let Err(e) = self
            .engine
            .set_individual_volume(&mut self.pack, index, percent)
        {
            return Status::error(e.to_string());
        }
        self.save();
        let volume = self.pack.sound(index).map_or(0, |sound| sound.volume());
        Status::info(format!("{} volume set to {}%", name, volume))
    }

    /// Writes the current settings to a file in the given directory, in the same shape
    /// as a pack definition. Returns the written path.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let pack_id = self.current.as_deref().ok_or(ExportError::NoPack)?;
        self.write_export(pack_id, self.engine.global_volume(), &self.pack, dir)
    }

    /// Exports the saved settings of a pack, or of the remembered pack if none is given.
    /// Nothing is loaded for playback and the pack selection is left alone.
    pub fn export_saved(&self, pack_id: Option<&str>, dir: &Path) -> Result<PathBuf, ExportError> {
        let pack_id = match pack_id {
            Some(pack_id) => pack_id.to_string(),
            None => self.remembered_pack(&self.catalog.list_packs()),
        };

        let mut pack = self.loader.load(&pack_id)?;
        let global_volume = self.apply_saved(&pack_id, &mut pack);
        self.write_export(&pack_id, global_volume, &pack, dir)
    }

    fn write_export(
        &self,
        pack_id: &str,
        global_volume: u8,
        pack: &SoundPack,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let contents = PackDefinition::from_pack(global_volume, pack).to_pretty_json()?;

        let path = dir.join(export_file_name(pack_id, Utc::now()));
        fs::create_dir_all(dir)
            .and_then(|_| fs::write(&path, contents))
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;

        info!(parent: &self.span, pack = pack_id, path = ?path, "Settings exported.");
        Ok(path)
    }

    /// Exports the current settings, reporting the outcome.
    pub fn export(&self, dir: &Path) -> Status {
        match self.export_to(dir) {
            Ok(path) => Status::info(format!("Settings exported to {}", path.display())),
            Err(e) => {
                error!(parent: &self.span, err = %e, "Failed to export settings.");
                Status::error(format!("Failed to export settings: {}", e))
            }
        }
    }

    /// Clears the current pack's saved settings and reloads everything, if the
    /// confirmation callback agrees.
    pub fn reset<F>(&mut self, confirm: F) -> Status
    where
        F: FnOnce(&str) -> bool,
    {
        let Some(pack_id) = self.current.clone() else {
            return Status::error("No sound pack is loaded");
        };

        let prompt = format!(
            "Reset all settings to defaults? This clears all volume and loop adjustments \
             and returns to the values from {}. This can't be undone.",
            display_name(&pack_id)
        );
        if !confirm(&prompt) {
            return Status::info("Reset cancelled");
        }

        if let Err(e) = self.prefs.clear(&pack_id) {
            error!(parent: &self.span, pack = %pack_id, err = %e, "Failed to reset settings.");
            return Status::error(format!("Failed to reset settings: {}", e));
        }

        let status = self.init();
        if status.is_error() {
            return status;
        }
        Status::info(format!("Settings reset for {}", display_name(&pack_id)))
    }

    /// Applies pending playback notifications. Returns the clips whose state changed.
    pub fn process_notifications(&mut self) -> Vec<(usize, PlaybackState)> {
        let changed = self.engine.process_notifications();
        for (index, state) in &changed {
            if let PlaybackState::Error(cause) = state {
                warn!(parent: &self.span, index, cause = %cause, "Clip failed.");
            }
        }
        changed
    }

    /// Returns a tile for every clip, in flat index order.
    pub fn tiles(&self) -> Vec<Tile> {
        self.pack
            .sounds()
            .into_iter()
            .map(|(index, sound, group)| Tile {
                index,
                name: sound.name().to_string(),
                group: group.map(str::to_string),
                looping: sound.looping(),
                volume: sound.volume(),
                state: self.engine.state(index),
            })
            .collect()
    }

    /// Returns the available packs with their display names.
    pub fn packs(&self) -> Vec<(String, String)> {
        self.packs
            .iter()
            .map(|pack_id| (pack_id.clone(), display_name(pack_id)))
            .collect()
    }

    pub fn current_pack(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn pack(&self) -> &SoundPack {
        &self.pack
    }

    pub fn global_volume(&self) -> u8 {
        self.engine.global_volume()
    }

    pub fn playing(&self) -> Vec<usize> {
        self.engine.playing()
    }

    pub fn exports(&self) -> &Path {
        &self.exports
    }
}
