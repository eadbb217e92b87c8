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

//! Volume resolution for clips.

/// The volume a clip gets when its definition doesn't specify one.
pub const DEFAULT_VOLUME: u8 = 80;

/// The maximum volume percentage.
pub const MAX_VOLUME: u8 = 100;

/// Clamps an arbitrary integer into a volume percentage.
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, MAX_VOLUME as i64) as u8
}

/// Resolves the gain a clip should play at given the global and individual volume
/// percentages. The result is always within [0.0, 1.0].
pub fn resolve(global_percent: u8, individual_percent: u8) -> f32 {
    let global = global_percent as f32 / 100.0;
    let individual = individual_percent as f32 / 100.0;
    (global * individual).clamp(0.0, 1.0)
}
