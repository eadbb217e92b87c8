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

//! The in-memory sound model.
//!
//! A pack is an ordered list of entries, each either a single sound or a named group of
//! sounds. Every sound is addressed by its flat index: the position it has when the entries
//! are walked in order with each group expanded in place. The flat index is derived from the
//! entries on every traversal and is never cached.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::volume::{DEFAULT_VOLUME, MAX_VOLUME};

/// A single playable clip.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundDef {
    /// The name shown on the clip's tile.
    name: String,
    /// The audio file, as written in the pack definition.
    file: PathBuf,
    /// Whether the clip loops when played.
    looping: bool,
    /// The clip volume as a percentage.
    volume: u8,
}

impl SoundDef {
    /// Creates a new sound with the default loop and volume settings.
    pub fn new(name: &str, file: impl Into<PathBuf>) -> SoundDef {
        SoundDef {
            name: name.to_string(),
            file: file.into(),
            looping: false,
            volume: DEFAULT_VOLUME,
        }
    }

    /// Sets whether the sound loops.
    pub fn with_looping(mut self, looping: bool) -> SoundDef {
        self.looping = looping;
        self
    }

    /// Sets the sound volume.
    pub fn with_volume(mut self, volume: u8) -> SoundDef {
        self.set_volume(volume);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Sets the volume, clamping it to a valid percentage.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
    }
}

/// A named, single level grouping of sounds. Groups only affect display.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundGroup {
    name: String,
    sounds: Vec<SoundDef>,
}

impl SoundGroup {
    /// Creates a new group.
    pub fn new(name: &str, sounds: Vec<SoundDef>) -> SoundGroup {
        SoundGroup {
            name: name.to_string(),
            sounds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sounds(&self) -> &[SoundDef] {
        &self.sounds
    }
}

/// A top level entry in a pack.
#[derive(Clone, Debug, PartialEq)]
pub enum SoundEntry {
    Sound(SoundDef),
    Group(SoundGroup),
}

impl SoundEntry {
    /// The number of flat indices this entry occupies.
    pub fn len(&self) -> usize {
        match self {
            SoundEntry::Sound(_) => 1,
            SoundEntry::Group(group) => group.sounds.len(),
        }
    }

    /// Returns true if the entry contributes no flat indices (an empty group).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a flat index lives within the nested entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// The index of the top level entry.
    pub entry: usize,
    /// The index within the group, or None if the entry is a single sound.
    pub local: Option<usize>,
}

/// Returns every sound in flat index order.
pub fn flatten(entries: &[SoundEntry]) -> Vec<&SoundDef> {
    let mut sounds = Vec::new();
    for entry in entries {
        match entry {
            SoundEntry::Sound(sound) => sounds.push(sound),
            SoundEntry::Group(group) => sounds.extend(group.sounds.iter()),
        }
    }
    sounds
}

/// Maps a flat index to its location within the entries.
pub fn global_to_local(entries: &[SoundEntry], index: usize) -> Option<Location> {
    let mut start = 0;
    for (entry_index, entry) in entries.iter().enumerate() {
        let len = entry.len();
        if index < start + len {
            return Some(Location {
                entry: entry_index,
                local: match entry {
                    SoundEntry::Sound(_) => None,
                    SoundEntry::Group(_) => Some(index - start),
                },
            });
        }
        start += len;
    }
    None
}

/// Maps a location back to its flat index.
pub fn local_to_global(entries: &[SoundEntry], location: Location) -> Option<usize> {
    let entry = entries.get(location.entry)?;
    let start: usize = entries[..location.entry].iter().map(SoundEntry::len).sum();
    match (entry, location.local) {
        (SoundEntry::Sound(_), None) => Some(start),
        (SoundEntry::Group(group), Some(local)) if local < group.sounds.len() => Some(start + local),
        _ => None,
    }
}

/// A loaded sound pack.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundPack {
    /// The global volume the pack asks for.
    global_volume_default: u8,
    /// The entries of the pack.
    entries: Vec<SoundEntry>,
}

impl SoundPack {
    /// Creates a new pack.
    pub fn new(global_volume_default: u8, entries: Vec<SoundEntry>) -> SoundPack {
        SoundPack {
            global_volume_default: global_volume_default.min(MAX_VOLUME),
            entries,
        }
    }

    /// An empty pack, used when nothing could be loaded.
    pub fn empty() -> SoundPack {
        SoundPack::new(DEFAULT_VOLUME, Vec::new())
    }

    pub fn global_volume_default(&self) -> u8 {
        self.global_volume_default
    }

    pub fn entries(&self) -> &[SoundEntry] {
        &self.entries
    }

    /// The number of flat indices in the pack.
    pub fn len(&self) -> usize {
        self.entries.iter().map(SoundEntry::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flatten(&self) -> Vec<&SoundDef> {
        flatten(&self.entries)
    }

    pub fn location(&self, index: usize) -> Option<Location> {
        global_to_local(&self.entries, index)
    }

    pub fn index_of(&self, location: Location) -> Option<usize> {
        local_to_global(&self.entries, location)
    }

    /// Gets the sound at the given flat index.
    pub fn sound(&self, index: usize) -> Option<&SoundDef> {
        let location = self.location(index)?;
        match (&self.entries[location.entry], location.local) {
            (SoundEntry::Sound(sound), None) => Some(sound),
            (SoundEntry::Group(group), Some(local)) => group.sounds.get(local),
            _ => None,
        }
    }

    /// Gets the sound at the given flat index for modification. This is the same record
    /// the nested entries hold, so there is nothing else to keep in sync.
    pub fn sound_mut(&mut self, index: usize) -> Option<&mut SoundDef> {
        let location = self.location(index)?;
        match (&mut self.entries[location.entry], location.local) {
            (SoundEntry::Sound(sound), None) => Some(sound),
            (SoundEntry::Group(group), Some(local)) => group.sounds.get_mut(local),
            _ => None,
        }
    }

    /// Lists every sound in flat index order along with the name of the group it belongs
    /// to, if any.
    pub fn sounds(&self) -> Vec<(usize, &SoundDef, Option<&str>)> {
        let mut sounds = Vec::with_capacity(self.len());
        for entry in &self.entries {
            match entry {
                SoundEntry::Sound(sound) => sounds.push((sounds.len(), sound, None)),
                SoundEntry::Group(group) => {
                    for sound in &group.sounds {
                        sounds.push((sounds.len(), sound, Some(group.name.as_str())));
                    }
                }
            }
        }
        sounds
    }
}

impl fmt::Display for SoundPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} sounds, global volume {}%",
            self.entries.len(),
            self.len(),
            self.global_volume_default
        )
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// A pack with a mix of single sounds and groups:
    /// 0: intro, 1-2: combat (hit, miss), 3: crowd, an empty group, 4-6: weather.
    pub(crate) fn grouped_pack() -> SoundPack {
        SoundPack::new(
            70,
            vec![
                SoundEntry::Sound(SoundDef::new("Intro", "sounds/intro.mp3")),
                SoundEntry::Group(SoundGroup::new(
                    "Combat",
                    vec![
                        SoundDef::new("Hit", "sounds/hit.wav").with_volume(90),
                        SoundDef::new("Miss", "sounds/miss.wav"),
                    ],
                )),
                SoundEntry::Sound(SoundDef::new("Crowd", "sounds/crowd.ogg").with_looping(true)),
                SoundEntry::Group(SoundGroup::new("Empty", vec![])),
                SoundEntry::Group(SoundGroup::new(
                    "Weather",
                    vec![
                        SoundDef::new("Rain", "sounds/rain.mp3").with_looping(true),
                        SoundDef::new("Wind", "sounds/wind.mp3"),
                        SoundDef::new("Thunder", "sounds/thunder.mp3").with_volume(100),
                    ],
                )),
            ],
        )
    }

    #[test]
    fn test_flatten() {
        let pack = grouped_pack();
        let names: Vec<&str> = pack.flatten().iter().map(|sound| sound.name()).collect();
        assert_eq!(
            vec!["Intro", "Hit", "Miss", "Crowd", "Rain", "Wind", "Thunder"],
            names
        );
        assert_eq!(7, pack.len());
    }

    #[test]
    fn test_global_to_local() {
        let pack = grouped_pack();
        assert_eq!(
            Some(Location {
                entry: 0,
                local: None
            }),
            pack.location(0)
        );
        assert_eq!(
            Some(Location {
                entry: 1,
                local: Some(1)
            }),
            pack.location(2)
        );
        assert_eq!(
            Some(Location {
                entry: 2,
                local: None
            }),
            pack.location(3)
        );
        // The empty group contributes nothing, so index 4 lands in the weather group.
        assert_eq!(
            Some(Location {
                entry: 4,
                local: Some(0)
            }),
            pack.location(4)
        );
        assert_eq!(None, pack.location(7));
    }

    #[test]
    fn test_round_trip() {
        let pack = grouped_pack();
        let flat = pack.flatten();
        for (index, sound) in flat.iter().enumerate() {
            let location = pack.location(index).expect("location should exist");
            let addressed = match (&pack.entries()[location.entry], location.local) {
                (SoundEntry::Sound(leaf), None) => leaf,
                (SoundEntry::Group(group), Some(local)) => &group.sounds()[local],
                _ => panic!("mismatched location for index {}", index),
            };
            assert_eq!(*sound, addressed);
            assert_eq!(Some(index), pack.index_of(location));
        }
    }

    #[test]
    fn test_local_to_global_invalid() {
        let pack = grouped_pack();
        assert_eq!(
            None,
            pack.index_of(Location {
                entry: 0,
                local: Some(0)
            })
        );
        assert_eq!(
            None,
            pack.index_of(Location {
                entry: 1,
                local: None
            })
        );
        assert_eq!(
            None,
            pack.index_of(Location {
                entry: 1,
                local: Some(2)
            })
        );
        assert_eq!(
            None,
            pack.index_of(Location {
                entry: 9,
                local: None
            })
        );
    }

    #[test]
    fn test_sound_mut_updates_nested_record() {
        let mut pack = grouped_pack();
        pack.sound_mut(5).expect("sound should exist").set_volume(30);
        pack.sound_mut(1).expect("sound should exist").set_looping(true);

        match &pack.entries()[4] {
            SoundEntry::Group(group) => assert_eq!(30, group.sounds()[1].volume()),
            _ => panic!("expected group"),
        }
        assert_eq!(30, pack.flatten()[5].volume());
        assert!(pack.sound(1).expect("sound should exist").looping());
        assert!(pack.sound_mut(7).is_none());
    }

    #[test]
    fn test_sounds_iterator() {
        let pack = grouped_pack();
        let sounds: Vec<(usize, &str, Option<&str>)> = pack
            .sounds()
            .into_iter()
            .map(|(index, sound, group)| (index, sound.name(), group))
            .collect();
        assert_eq!((0, "Intro", None), sounds[0]);
        assert_eq!((2, "Miss", Some("Combat")), sounds[2]);
        assert_eq!((6, "Thunder", Some("Weather")), sounds[6]);
        assert_eq!(7, sounds.len());
    }

    #[test]
    fn test_volume_clamped() {
        let sound = SoundDef::new("Loud", "loud.wav").with_volume(200);
        assert_eq!(100, sound.volume());
        assert_eq!(100, SoundPack::new(150, vec![]).global_volume_default());
    }
}
