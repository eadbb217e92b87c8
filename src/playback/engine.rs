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
use std::{
    collections::{hash_map::Entry, BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, span, warn, Level, Span};

use super::{PlaybackError, PlaybackState};
use crate::audio::{self, Notification, NotificationKind, Notifier};
use crate::pack::SoundPack;
use crate::volume::{self, DEFAULT_VOLUME};

/// A live backend handle and the generation of its latest play.
struct Clip {
    handle: Box<dyn audio::Handle>,
    generation: u64,
}

/// Plays the clips of the current pack.
pub struct PlaybackEngine {
    backend: Arc<dyn audio::Backend>,
    /// The directory relative clip files are resolved against.
    sounds_dir: PathBuf,
    clips: HashMap<usize, Clip>,
    states: HashMap<usize, PlaybackState>,
    playing: BTreeSet<usize>,
    global_volume: u8,
    /// Generations are unique across the engine's lifetime, so notifications from
    /// handles dropped by a reset can never match a newer handle.
    last_generation: u64,
    tx: crossbeam_channel::Sender<Notification>,
    rx: crossbeam_channel::Receiver<Notification>,
    span: Span,
}

impl PlaybackEngine {
    /// Creates a new engine on the given backend.
    pub fn new(backend: Arc<dyn audio::Backend>, sounds_dir: &Path) -> PlaybackEngine {
        let (tx, rx) = crossbeam_channel::unbounded();
        PlaybackEngine {
            backend,
            sounds_dir: sounds_dir.to_path_buf(),
            clips: HashMap::new(),
            states: HashMap::new(),
            playing: BTreeSet::new(),
            global_volume: DEFAULT_VOLUME,
            last_generation: 0,
            tx,
            rx,
            span: span!(Level::INFO, "playback"),
        }
    }

    /// Plays the clip at the given flat index. An exclusive play stops everything else
    /// (including the clip itself, which restarts) first.
    pub fn play(
        &mut self,
        pack: &SoundPack,
        index: usize,
        exclusive: bool,
    ) -> Result<(), PlaybackError> {
        let span = self.span.clone();
        let _enter = span.enter();

        let sound = pack.sound(index).ok_or(PlaybackError::UnknownClip(index))?;
        if sound.file().as_os_str().is_empty() {
            let err = PlaybackError::NoFile(index);
            warn!(index, sound = sound.name(), "Clip has no file.");
            self.playing.remove(&index);
            self.states
                .insert(index, PlaybackState::Error(err.to_string()));
            return Err(err);
        }
        if exclusive {
            self.stop_all();
        }

        self.last_generation += 1;
        let generation = self.last_generation;
        let gain = volume::resolve(self.global_volume, sound.volume());

        let clip = match self.clips.entry(index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.sounds_dir.join(sound.file());
                let notifier = Notifier::new(index, self.tx.clone());
                match self.backend.open(index, &path, notifier) {
                    Ok(handle) => {
                        debug!(index, path = ?path, "Created clip handle");
                        self.states.insert(index, PlaybackState::Ready);
                        entry.insert(Clip {
                            handle,
                            generation: 0,
                        })
                    }
                    Err(e) => {
                        let cause = e.to_string();
                        warn!(index, err = %e, "Unable to open clip");
                        self.playing.remove(&index);
                        self.states.insert(index, PlaybackState::Error(cause.clone()));
                        return Err(PlaybackError::Native { index, cause });
                    }
                }
            }
        };

        clip.handle.set_looping(sound.looping());
        clip.handle.set_gain(gain);
        if clip.handle.has_ended() {
            clip.handle.rewind();
        }
        clip.generation = generation;

        match clip.handle.play(generation) {
            Ok(()) => {
                info!(
                    index,
                    sound = sound.name(),
                    gain,
                    looping = sound.looping(),
                    exclusive,
                    "Playing clip."
                );
                self.playing.insert(index);
                self.states.insert(index, PlaybackState::Playing);
                Ok(())
            }
            Err(e) => {
                let cause = e.to_string();
                warn!(index, sound = sound.name(), err = %e, "Unable to play clip.");
                self.playing.remove(&index);
                self.states.insert(index, PlaybackState::Error(cause.clone()));
                Err(PlaybackError::Native { index, cause })
            }
        }
    }

    /// Pauses the clip if it's playing.
    pub fn pause(&mut self, index: usize) {
        if !self.playing.contains(&index) {
            return;
        }
        if let Some(clip) = self.clips.get_mut(&index) {
            clip.handle.pause();
            self.playing.remove(&index);
            self.states.insert(index, PlaybackState::Paused);
            info!(parent: &self.span, index, "Paused clip.");
        }
    }

    /// Stops the clip and rewinds it.
    pub fn stop(&mut self, index: usize) {
        if let Some(clip) = self.clips.get_mut(&index) {
            clip.handle.pause();
            clip.handle.rewind();
            self.playing.remove(&index);
            self.states.insert(index, PlaybackState::Stopped);
            info!(parent: &self.span, index, "Stopped clip.");
        }
    }

    /// Stops every clip that is playing or ready. Paused clips are left alone. Returns
    /// the number of clips that were playing.
    pub fn stop_all(&mut self) -> usize {
        let count = self.playing.len();
        let to_stop: Vec<usize> = self
            .clips
            .keys()
            .copied()
            .filter(|index| {
                matches!(
                    self.state(*index),
                    PlaybackState::Playing | PlaybackState::Ready
                )
            })
            .collect();
        for index in to_stop {
            self.stop(index);
        }
        self.playing.clear();

        info!(parent: &self.span, count, "Stopped all clips.");
        count
    }

    /// Sets whether a clip loops. The sound definition is updated even if the clip has
    /// never been played.
    pub fn set_loop(
        &mut self,
        pack: &mut SoundPack,
        index: usize,
        looping: bool,
    ) -> Result<(), PlaybackError> {
        let sound = pack
            .sound_mut(index)
            .ok_or(PlaybackError::UnknownClip(index))?;
        sound.set_looping(looping);
        if let Some(clip) = self.clips.get_mut(&index) {
            clip.handle.set_looping(looping);
        }
        info!(parent: &self.span, index, looping, "Set clip looping.");
        Ok(())
    }

    /// Sets the global volume and re-applies gain to every live clip.
    pub fn set_global_volume(&mut self, pack: &SoundPack, percent: i64) {
        self.global_volume = volume::clamp_percent(percent);
        for (index, clip) in self.clips.iter_mut() {
            if let Some(sound) = pack.sound(*index) {
                clip.handle
                    .set_gain(volume::resolve(self.global_volume, sound.volume()));
            }
        }
        info!(
            parent: &self.span,
            volume = self.global_volume,
            "Set global volume."
        );
    }

    /// Sets a clip's volume and re-applies its gain if it has a live handle.
    pub fn set_individual_volume(
        &mut self,
        pack: &mut SoundPack,
        index: usize,
        percent: i64,
    ) -> Result<(), PlaybackError> {
        let sound = pack
            .sound_mut(index)
            .ok_or(PlaybackError::UnknownClip(index))?;
        sound.set_volume(volume::clamp_percent(percent));
        if let Some(clip) = self.clips.get_mut(&index) {
            clip.handle
                .set_gain(volume::resolve(self.global_volume, sound.volume()));
        }
        info!(
            parent: &self.span,
            index,
            volume = sound.volume(),
            "Set clip volume."
        );
        Ok(())
    }

    /// Applies pending backend notifications. Returns the clips whose state changed.
    pub fn process_notifications(&mut self) -> Vec<(usize, PlaybackState)> {
        let mut changed = Vec::new();
        while let Ok(notification) = self.rx.try_recv() {
            let index = notification.index;
            let current = self
                .clips
                .get(&index)
                .is_some_and(|clip| clip.generation == notification.generation);
            if !current || self.state(index) != PlaybackState::Playing {
                debug!(
                    parent: &self.span,
                    index,
                    generation = notification.generation,
                    kind = ?notification.kind,
                    "Ignoring stale notification."
                );
                continue;
            }

            let state = match notification.kind {
                NotificationKind::Ready => {
                    debug!(parent: &self.span, index, "Clip ready.");
                    continue;
                }
                NotificationKind::Ended => {
                    info!(parent: &self.span, index, "Clip ended.");
                    PlaybackState::Stopped
                }
                NotificationKind::Failed(cause) => {
                    warn!(parent: &self.span, index, cause = %cause, "Clip failed.");
                    PlaybackState::Error(cause)
                }
            };
            self.playing.remove(&index);
            self.states.insert(index, state.clone());
            changed.push((index, state));
        }
        changed
    }

    /// Drops every handle. Used when switching packs.
    pub fn reset(&mut self) {
        for clip in self.clips.values_mut() {
            clip.handle.pause();
        }
        self.clips.clear();
        self.states.clear();
        self.playing.clear();
        // Anything still queued belongs to the handles that were just dropped.
        while self.rx.try_recv().is_ok() {}
        info!(parent: &self.span, "Reset playback.");
    }

    pub fn state(&self, index: usize) -> PlaybackState {
        self.states.get(&index).cloned().unwrap_or_default()
    }

    /// The playing clips in index order.
    pub fn playing(&self) -> Vec<usize> {
        self.playing.iter().copied().collect()
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.playing.contains(&index)
    }

    pub fn global_volume(&self) -> u8 {
        self.global_volume
    }
}
