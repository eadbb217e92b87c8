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
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use super::write_wav;
use crate::config;

const DNDEEKEND: &str = r#"{
    "globalVolume": 60,
    "sounds": [
        { "name": "Tavern", "file": "sounds/tavern.wav", "loop": true, "volume": 50 },
        {
            "name": "Combat",
            "sounds": [
                { "name": "Sword", "file": "sounds/sword.wav" },
                { "name": "Shield", "file": "sounds/shield.wav", "volume": 90 }
            ]
        },
        { "name": "Dragon", "file": "sounds/dragon.wav" }
    ]
}"#;

const MIGO: &str = r#"{
    "sounds": [
        { "name": "Bell", "file": "sounds/bell.wav" },
        { "name": "Horn", "file": "sounds/horn.wav" }
    ]
}"#;

/// A temporary soundboard directory with two packs:
///
/// - `dndeekend.json` (global volume 60): 0 Tavern (looping, 50), 1 Sword and
///   2 Shield (90) in the Combat group, 3 Dragon.
/// - `migo.json` (default global volume): 0 Bell, 1 Horn. Horn's file is missing.
pub struct PackFixture {
    dir: TempDir,
}

impl PackFixture {
    pub fn new() -> Result<PackFixture, Box<dyn Error>> {
        let fixture = PackFixture {
            dir: tempfile::tempdir()?,
        };

        fs::create_dir_all(fixture.packs())?;
        fixture.write_pack("index.json", r#"{ "packs": ["dndeekend.json", "migo.json"] }"#)?;
        fixture.write_pack("dndeekend.json", DNDEEKEND)?;
        fixture.write_pack("migo.json", MIGO)?;

        for clip in ["tavern", "sword", "shield", "dragon", "bell"] {
            write_wav(
                &fixture.path().join("sounds").join(format!("{}.wav", clip)),
                1,
                44100,
                441,
            )?;
        }

        Ok(fixture)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn packs(&self) -> PathBuf {
        self.path().join("packs")
    }

    /// Writes a file into the packs directory.
    pub fn write_pack(&self, name: &str, contents: &str) -> Result<(), Box<dyn Error>> {
        fs::write(self.packs().join(name), contents)?;
        Ok(())
    }

    /// A default configuration rooted at the fixture.
    pub fn config(&self) -> config::Soundboard {
        config::Soundboard::default().relative_to(self.path())
    }
}
