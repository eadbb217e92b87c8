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
// Mixing of clip voices, independent of the output stream.
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::decode::Clip;
use super::Notifier;

/// The playback state of a single clip.
pub struct VoiceState {
    /// The decoded clip, once decoding has finished.
    pub clip: Option<Arc<Clip>>,
    /// Whether decoding is in progress.
    pub loading: bool,
    pub playing: bool,
    pub looping: bool,
    pub gain: f32,
    /// The next frame to mix.
    pub position: usize,
    pub ended: bool,
    /// The generation of the play call currently in effect.
    pub generation: u64,
}

/// A clip voice shared between its handle and the mixer.
pub struct Voice {
    pub notifier: Notifier,
    pub state: Mutex<VoiceState>,
}

impl Voice {
    pub fn new(notifier: Notifier) -> Voice {
        Voice {
            notifier,
            state: Mutex::new(VoiceState {
                clip: None,
                loading: false,
                playing: false,
                looping: false,
                gain: 1.0,
                position: 0,
                ended: false,
                generation: 0,
            }),
        }
    }
}

/// Mixes every playing voice into an interleaved output buffer.
#[derive(Clone)]
pub struct Mixer {
    voices: Arc<RwLock<Vec<Arc<Voice>>>>,
    num_channels: u16,
    sample_rate: u32,
}

impl Mixer {
    pub fn new(num_channels: u16, sample_rate: u32) -> Mixer {
        Mixer {
            voices: Arc::new(RwLock::new(Vec::new())),
            num_channels: num_channels.max(1),
            sample_rate,
        }
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn add_voice(&self, voice: Arc<Voice>) {
        self.voices.write().push(voice);
    }

    /// Drops voices nobody else holds anymore.
    pub fn prune(&self) {
        self.voices
            .write()
            .retain(|voice| Arc::strong_count(voice) > 1);
    }

    pub fn voice_count(&self) -> usize {
        self.voices.read().len()
    }

    /// Mixes into the given buffer, overwriting it.
    pub fn mix(&self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.num_channels as usize;

        // Never block the audio thread: voices that are busy are skipped for a block.
        let Some(voices) = self.voices.try_read() else {
            return;
        };
        for voice in voices.iter() {
            let Some(mut state) = voice.state.try_lock() else {
                continue;
            };
            if !state.playing {
                continue;
            }
            let Some(clip) = state.clip.clone() else {
                continue;
            };

            let frames = clip.frames();
            for frame in output.chunks_mut(channels) {
                if state.position >= frames {
                    if state.looping && frames > 0 {
                        state.position = 0;
                    } else {
                        state.playing = false;
                        state.ended = true;
                        voice.notifier.ended(state.generation);
                        break;
                    }
                }

                for (channel, sample) in frame.iter_mut().enumerate() {
                    *sample += clip.sample(state.position, channel) * state.gain;
                }
                state.position += 1;
            }
        }

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}
