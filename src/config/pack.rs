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

//! JSON representations of pack definitions and saved pack settings.
//!
//! Saved settings, exports and pack definitions all share one shape, so the same types
//! serve every one of them. Fields are optional here; defaults are decided when the
//! definition is converted into a [`SoundPack`].

use serde::{Deserialize, Serialize};

use crate::pack::{SoundDef, SoundEntry, SoundGroup, SoundPack};
use crate::volume::{clamp_percent, DEFAULT_VOLUME};

/// A JSON representation of a sound pack.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct PackDefinition {
    /// The global volume for the pack.
    #[serde(rename = "globalVolume", skip_serializing_if = "Option::is_none")]
    global_volume: Option<i64>,

    /// The sounds and groups in the pack.
    #[serde(default)]
    sounds: Vec<EntryDefinition>,
}

/// A single entry. Anything with a `sounds` list is a group.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum EntryDefinition {
    Group(GroupDefinition),
    Sound(SoundDefinition),
}

/// A JSON representation of a group of sounds.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct GroupDefinition {
    #[serde(default)]
    name: String,
    sounds: Vec<SoundDefinition>,
}

/// A JSON representation of a sound.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct SoundDefinition {
    #[serde(default)]
    name: String,
    #[serde(default)]
    file: String,
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    looping: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<i64>,
}

impl PackDefinition {
    /// Parses a definition from JSON.
    pub fn parse(contents: &str) -> Result<PackDefinition, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Captures the complete current state of a pack. Every field of every sound is
    /// written, and groups are preserved.
    pub fn from_pack(global_volume: u8, pack: &SoundPack) -> PackDefinition {
        PackDefinition {
            global_volume: Some(global_volume as i64),
            sounds: pack
                .entries()
                .iter()
                .map(|entry| match entry {
                    SoundEntry::Sound(sound) => {
                        EntryDefinition::Sound(SoundDefinition::from_sound(sound))
                    }
                    SoundEntry::Group(group) => EntryDefinition::Group(GroupDefinition {
                        name: group.name().to_string(),
                        sounds: group
                            .sounds()
                            .iter()
                            .map(SoundDefinition::from_sound)
                            .collect(),
                    }),
                })
                .collect(),
        }
    }

    /// The global volume, clamped to a valid percentage.
    pub fn global_volume(&self) -> Option<u8> {
        self.global_volume.map(clamp_percent)
    }

    /// Every sound definition in flat index order.
    pub fn flat_sounds(&self) -> Vec<&SoundDefinition> {
        let mut sounds = Vec::new();
        for entry in &self.sounds {
            match entry {
                EntryDefinition::Sound(sound) => sounds.push(sound),
                EntryDefinition::Group(group) => sounds.extend(group.sounds.iter()),
            }
        }
        sounds
    }

    /// Converts the definition into a pack, filling in defaults. Sounds without a file
    /// are kept; they fail when played.
    pub fn to_pack(&self) -> SoundPack {
        let entries = self
            .sounds
            .iter()
            .map(|entry| match entry {
                EntryDefinition::Sound(sound) => SoundEntry::Sound(sound.to_sound()),
                EntryDefinition::Group(group) => SoundEntry::Group(SoundGroup::new(
                    &group.name,
                    group.sounds.iter().map(SoundDefinition::to_sound).collect(),
                )),
            })
            .collect();

        SoundPack::new(self.global_volume().unwrap_or(DEFAULT_VOLUME), entries)
    }

    /// Pretty prints the definition with four space indentation.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only ever writes valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl SoundDefinition {
    fn from_sound(sound: &SoundDef) -> SoundDefinition {
        SoundDefinition {
            name: sound.name().to_string(),
            file: sound.file().to_string_lossy().into_owned(),
            looping: Some(sound.looping()),
            volume: Some(sound.volume() as i64),
        }
    }

    fn to_sound(&self) -> SoundDef {
        SoundDef::new(&self.name, &self.file)
            .with_looping(self.looping.unwrap_or(false))
            .with_volume(self.volume.map(clamp_percent).unwrap_or(DEFAULT_VOLUME))
    }

    /// The loop flag, if the definition sets one.
    pub fn looping(&self) -> Option<bool> {
        self.looping
    }

    /// The volume, if the definition sets one, clamped to a valid percentage.
    pub fn volume(&self) -> Option<u8> {
        self.volume.map(clamp_percent)
    }
}

#[cfg(test)]
mod test {
    use crate::pack::model::test::grouped_pack;

    use super::*;

    #[test]
    fn test_parse_definition() -> Result<(), Box<dyn std::error::Error>> {
        let definition = PackDefinition::parse(
            r#"{
                "globalVolume": 65,
                "sounds": [
                    {"name": "Intro", "file": "sounds/intro.mp3"},
                    {"name": "Combat", "sounds": [
                        {"name": "Hit", "file": "sounds/hit.wav", "volume": 150},
                        {"name": "Miss", "file": "sounds/miss.wav", "loop": true}
                    ]},
                    {"name": "Silent", "file": "sounds/silent.wav", "volume": 0}
                ]
            }"#,
        )?;

        let pack = definition.to_pack();
        assert_eq!(65, pack.global_volume_default());
        assert_eq!(3, pack.entries().len());
        assert_eq!(4, pack.len());

        let intro = pack.sound(0).expect("intro");
        assert_eq!("Intro", intro.name());
        assert!(!intro.looping());
        assert_eq!(DEFAULT_VOLUME, intro.volume());

        assert_eq!(100, pack.sound(1).expect("hit").volume());
        assert!(pack.sound(2).expect("miss").looping());
        // Zero is a real volume, not a missing one.
        assert_eq!(0, pack.sound(3).expect("silent").volume());

        match &pack.entries()[1] {
            SoundEntry::Group(group) => assert_eq!("Combat", group.name()),
            _ => panic!("expected a group"),
        }
        Ok(())
    }

    #[test]
    fn test_parse_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let pack = PackDefinition::parse("{}")?.to_pack();
        assert!(pack.is_empty());
        assert_eq!(DEFAULT_VOLUME, pack.global_volume_default());
        Ok(())
    }

    #[test]
    fn test_missing_file() -> Result<(), Box<dyn std::error::Error>> {
        let definition = PackDefinition::parse(r#"{"sounds": [{"name": "Nothing"}]}"#)?;
        let pack = definition.to_pack();
        assert_eq!(1, pack.len());
        assert_eq!(Some("Nothing"), pack.sound(0).map(|sound| sound.name()));
        assert!(pack
            .sound(0)
            .is_some_and(|sound| sound.file().as_os_str().is_empty()));
        Ok(())
    }

    #[test]
    fn test_from_pack_preserves_groups() -> Result<(), Box<dyn std::error::Error>> {
        let pack = grouped_pack();
        let definition = PackDefinition::from_pack(55, &pack);
        assert_eq!(Some(55), definition.global_volume());
        assert_eq!(pack.len(), definition.flat_sounds().len());

        // Everything is written out, including settings that match the defaults.
        let json: serde_json::Value = serde_json::from_str(&definition.to_pretty_json()?)?;
        let miss = &json["sounds"][1]["sounds"][1];
        assert_eq!("Miss", miss["name"]);
        assert_eq!("sounds/miss.wav", miss["file"]);
        assert_eq!(false, miss["loop"]);
        assert_eq!(80, miss["volume"]);

        let restored = PackDefinition::parse(&definition.to_pretty_json()?)?.to_pack();
        assert_eq!(pack.entries(), restored.entries());
        Ok(())
    }

    #[test]
    fn test_pretty_json_indent() -> Result<(), Box<dyn std::error::Error>> {
        let json = PackDefinition::from_pack(80, &grouped_pack()).to_pretty_json()?;
        assert!(json.starts_with("{\n    \"globalVolume\": 80,\n    \"sounds\": [\n"));
        Ok(())
    }
}
