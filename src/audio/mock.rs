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
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{AudioError, Notifier};

/// What a mock clip has been told to do.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipState {
    pub path: PathBuf,
    pub playing: bool,
    pub looping: bool,
    pub gain: f32,
    pub ended: bool,
    pub generation: u64,
    /// The number of successful play calls.
    pub plays: usize,
    /// The number of rewinds.
    pub rewinds: usize,
}

struct Clip {
    state: ClipState,
    notifier: Notifier,
}

/// A mock backend. Doesn't actually play anything. Files can be marked as failing,
/// either immediately on play or later through a notification.
#[derive(Clone)]
pub struct Backend {
    name: String,
    clips: Arc<Mutex<HashMap<usize, Arc<Mutex<Clip>>>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
    failing_async: Arc<Mutex<HashSet<PathBuf>>>,
    opened: Arc<AtomicUsize>,
}

impl Backend {
    /// Gets the given mock backend.
    pub fn get(name: &str) -> Backend {
        Backend {
            name: name.to_string(),
            clips: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            failing_async: Arc::new(Mutex::new(HashSet::new())),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes play fail immediately for the given file.
    pub fn fail_file(&self, path: &Path) {
        self.failing.lock().insert(path.to_path_buf());
    }

    /// Makes play fail through a notification for the given file.
    pub fn fail_file_async(&self, path: &Path) {
        self.failing_async.lock().insert(path.to_path_buf());
    }

    /// The number of handles opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Returns the state of the most recently opened clip for the given index.
    pub fn clip(&self, index: usize) -> Option<ClipState> {
        self.clips
            .lock()
            .get(&index)
            .map(|clip| clip.lock().state.clone())
    }

    /// Simulates the clip reaching its end. Looping clips just keep going. Returns true
    /// if the clip ended.
    pub fn finish(&self, index: usize) -> bool {
        let Some(clip) = self.clips.lock().get(&index).cloned() else {
            return false;
        };
        let mut clip = clip.lock();
        if !clip.state.playing || clip.state.looping {
            return false;
        }

        clip.state.playing = false;
        clip.state.ended = true;
        clip.notifier.ended(clip.state.generation);
        true
    }
}

impl super::Backend for Backend {
    fn open(
        &self,
        index: usize,
        path: &Path,
        notifier: Notifier,
    ) -> Result<Box<dyn super::Handle>, AudioError> {
        debug!(backend = self.name, index, path = ?path, "Opening clip");
        self.opened.fetch_add(1, Ordering::Relaxed);

        let clip = Arc::new(Mutex::new(Clip {
            state: ClipState {
                path: path.to_path_buf(),
                gain: 1.0,
                ..Default::default()
            },
            notifier,
        }));
        self.clips.lock().insert(index, clip.clone());

        Ok(Box::new(Handle {
            clip,
            fails: self.failing.lock().contains(path),
            fails_async: self.failing_async.lock().contains(path),
        }))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

struct Handle {
    clip: Arc<Mutex<Clip>>,
    fails: bool,
    fails_async: bool,
}

impl super::Handle for Handle {
    fn play(&mut self, generation: u64) -> Result<(), AudioError> {
        let mut clip = self.clip.lock();
        if self.fails {
            return Err(AudioError::Playback(format!(
                "unable to play {}",
                clip.state.path.display()
            )));
        }

        info!(path = ?clip.state.path, generation, "Playing clip (mock)");
        clip.state.generation = generation;
        clip.state.playing = true;
        clip.state.ended = false;
        clip.state.plays += 1;

        if self.fails_async {
            clip.state.playing = false;
            let cause = format!("unable to decode {}", clip.state.path.display());
            clip.notifier.failed(generation, cause);
        } else {
            clip.notifier.ready(generation);
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.clip.lock().state.playing = false;
    }

    fn rewind(&mut self) {
        let mut clip = self.clip.lock();
        clip.state.ended = false;
        clip.state.rewinds += 1;
    }

    fn set_looping(&mut self, looping: bool) {
        self.clip.lock().state.looping = looping;
    }

    fn set_gain(&mut self, gain: f32) {
        self.clip.lock().state.gain = gain;
    }

    fn has_ended(&self) -> bool {
        self.clip.lock().state.ended
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::{Backend as _, NotificationKind};

    #[test]
    fn test_mock_clip_lifecycle() -> Result<(), AudioError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let backend = Backend::get("mock");
        let mut handle = backend.open(0, Path::new("a.wav"), Notifier::new(0, tx))?;

        handle.set_looping(false);
        handle.set_gain(0.5);
        handle.play(1)?;
        assert_eq!(Some(NotificationKind::Ready), rx.try_recv().ok().map(|n| n.kind));

        let state = backend.clip(0).ok_or(AudioError::Playback("no clip".into()))?;
        assert!(state.playing);
        assert_eq!(0.5, state.gain);
        assert_eq!(1, state.plays);

        assert!(backend.finish(0));
        assert!(handle.has_ended());
        let ended = rx.try_recv().ok();
        assert_eq!(Some(1), ended.as_ref().map(|n| n.generation));
        assert_eq!(Some(NotificationKind::Ended), ended.map(|n| n.kind));

        handle.rewind();
        assert!(!handle.has_ended());
        assert_eq!(1, backend.opened());
        Ok(())
    }

    #[test]
    fn test_mock_failures() -> Result<(), AudioError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let backend = Backend::get("mock");
        backend.fail_file(Path::new("bad.wav"));
        backend.fail_file_async(Path::new("corrupt.wav"));

        let mut bad = backend.open(0, Path::new("bad.wav"), Notifier::new(0, tx.clone()))?;
        assert!(bad.play(1).is_err());

        let mut corrupt = backend.open(1, Path::new("corrupt.wav"), Notifier::new(1, tx))?;
        corrupt.play(1)?;
        assert!(matches!(
            rx.try_recv().map(|n| n.kind),
            Ok(NotificationKind::Failed(_))
        ));
        Ok(())
    }

    #[test]
    fn test_looping_clip_does_not_finish() -> Result<(), AudioError> {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let backend = Backend::get("mock");
        let mut handle = backend.open(0, Path::new("a.wav"), Notifier::new(0, tx))?;
        handle.set_looping(true);
        handle.play(1)?;
        assert!(!backend.finish(0));
        Ok(())
    }
}
