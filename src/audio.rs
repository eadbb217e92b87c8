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
use std::{fmt, path::Path, sync::Arc};

use crate::config;

pub mod cpal;
pub mod decode;
mod error;
pub mod mixer;
pub mod mock;

pub use error::AudioError;

/// What happened to a clip outside of a direct call.
#[derive(Clone, Debug, PartialEq)]
pub enum NotificationKind {
    /// The clip has its media and started playing.
    Ready,
    /// The clip reached its end without looping.
    Ended,
    /// The clip could not be played.
    Failed(String),
}

/// An asynchronous report from a clip handle. The generation is the one passed to the
/// `play` call that led to the notification, so stale reports can be told apart.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub index: usize,
    pub generation: u64,
    pub kind: NotificationKind,
}

/// Sends notifications for a single clip.
#[derive(Clone)]
pub struct Notifier {
    index: usize,
    tx: crossbeam_channel::Sender<Notification>,
}

impl Notifier {
    pub fn new(index: usize, tx: crossbeam_channel::Sender<Notification>) -> Notifier {
        Notifier { index, tx }
    }

    pub fn ready(&self, generation: u64) {
        self.send(generation, NotificationKind::Ready);
    }

    pub fn ended(&self, generation: u64) {
        self.send(generation, NotificationKind::Ended);
    }

    pub fn failed(&self, generation: u64, cause: String) {
        self.send(generation, NotificationKind::Failed(cause));
    }

    fn send(&self, generation: u64, kind: NotificationKind) {
        // The receiver only goes away on shutdown, at which point nobody cares.
        let _ = self.tx.send(Notification {
            index: self.index,
            generation,
            kind,
        });
    }
}

/// A playable clip. One handle exists per sound; it is reused across plays so that
/// resuming continues from where it was paused.
pub trait Handle: Send {
    /// Starts or resumes playback. Errors returned here are immediate failures; later
    /// failures arrive as notifications tagged with the generation.
    fn play(&mut self, generation: u64) -> Result<(), AudioError>;

    /// Pauses playback, keeping the position.
    fn pause(&mut self);

    /// Moves the position back to the start.
    fn rewind(&mut self);

    /// Sets whether the clip restarts when it reaches its end.
    fn set_looping(&mut self, looping: bool);

    /// Sets the gain, between 0 and 1.
    fn set_gain(&mut self, gain: f32);

    /// Returns true if the clip reached its end without looping.
    fn has_ended(&self) -> bool;
}

/// An audio output that clips can be opened on.
pub trait Backend: fmt::Display + Send + Sync {
    /// Opens a handle for the clip at the given path. Opening is cheap: media is only
    /// read once the clip is first played.
    fn open(
        &self,
        index: usize,
        path: &Path,
        notifier: Notifier,
    ) -> Result<Box<dyn Handle>, AudioError>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, AudioError> {
    cpal::Backend::list()
}

/// Gets the backend for the configured device.
pub fn get_backend(config: &config::Audio) -> Result<Arc<dyn Backend>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Backend::get(device)));
    };

    Ok(Arc::new(cpal::Backend::get(config)?))
}
