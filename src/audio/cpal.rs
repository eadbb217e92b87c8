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
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, warn, Level};

use super::{
    decode,
    mixer::{Mixer, Voice},
    AudioError, Notifier,
};
use crate::config;

/// An output device with a continuously running stream. Clips are mixed into the
/// stream as they play.
pub struct Backend {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The mixer feeding the output stream.
    mixer: Mixer,
    /// Dropping this stops the output thread.
    _shutdown: crossbeam_channel::Sender<()>,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={}) ({})",
            self.name,
            self.mixer.num_channels(),
            self.mixer.sample_rate(),
            self.host_id.name()
        )
    }
}

impl Backend {
    /// Lists the names of the output devices known to cpal.
    pub fn list() -> Result<Vec<String>, AudioError> {
        let mut names: Vec<String> = Backend::list_cpal_devices()?
            .into_iter()
            .map(|(_, name, _)| name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Lists cpal output devices with their hosts.
    fn list_cpal_devices() -> Result<Vec<(cpal::HostId, String, cpal::Device)>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = cpal::host_from_id(host_id).map_err(AudioError::device)?;
            let host_devices = match host.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                match device.name() {
                    Ok(name) => devices.push((host_id, name, device)),
                    Err(e) => warn!(err = %e, "Unable to get device name"),
                }
            }
        }

        Ok(devices)
    }

    /// Gets the configured cpal device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Backend, AudioError> {
        let name = config.device();
        let (host_id, name, device) = if name == config::DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?;
            let device_name = device.name().map_err(AudioError::device)?;
            (host.id(), device_name, device)
        } else {
            Backend::list_cpal_devices()?
                .into_iter()
                .find(|(_, device_name, _)| device_name.trim() == name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?
        };

        let supported = device
            .default_output_config()
            .map_err(AudioError::device)?;
        let num_channels = supported.channels();
        let sample_rate = config.sample_rate().unwrap_or(supported.sample_rate());
        let sample_format = supported.sample_format();

        let mixer = Mixer::new(num_channels, sample_rate);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded(1);

        let output_mixer = mixer.clone();
        thread::spawn(move || {
            let stream_config = cpal::StreamConfig {
                channels: num_channels,
                sample_rate,
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = match sample_format {
                cpal::SampleFormat::F32 => {
                    build_stream::<f32>(&device, &stream_config, output_mixer)
                }
                cpal::SampleFormat::I16 => {
                    build_stream::<i16>(&device, &stream_config, output_mixer)
                }
                cpal::SampleFormat::I32 => {
                    build_stream::<i32>(&device, &stream_config, output_mixer)
                }
                format => Err(AudioError::Device(format!(
                    "unsupported sample format {:?}",
                    format
                ))),
            };
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = started_tx.send(Err(e));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = started_tx.send(Err(AudioError::device(e)));
                return;
            }

            info!("CPAL output stream started");
            let _ = started_tx.send(Ok(()));

            // Keep the stream alive until the backend is dropped.
            let _ = shutdown_rx.recv();
            info!("CPAL output stream stopped");
        });

        started_rx
            .recv()
            .map_err(|_| AudioError::Device("output thread exited".to_string()))??;

        Ok(Backend {
            name,
            host_id,
            mixer,
            _shutdown: shutdown_tx,
        })
    }
}

/// Builds an output stream that converts the mixed f32 samples to the device format.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Mixer,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.mix(&mut scratch);
                for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(src);
                }
            },
            |err| error!("CPAL output stream error: {}", err),
            None,
        )
        .map_err(AudioError::device)
}

impl super::Backend for Backend {
    fn open(
        &self,
        index: usize,
        path: &Path,
        notifier: Notifier,
    ) -> Result<Box<dyn super::Handle>, AudioError> {
        self.mixer.prune();
        let voice = Arc::new(Voice::new(notifier));
        self.mixer.add_voice(voice.clone());

        Ok(Box::new(Handle {
            index,
            path: path.to_path_buf(),
            sample_rate: self.mixer.sample_rate(),
            voice,
        }))
    }
}

/// A clip voice in the cpal mixer.
struct Handle {
    index: usize,
    path: PathBuf,
    sample_rate: u32,
    voice: Arc<Voice>,
}

impl Handle {
    /// Decodes the clip on a background thread. Playback starts when decoding finishes
    /// unless the clip was paused or stopped in the meantime.
    fn start_decode(&self) {
        let voice = self.voice.clone();
        let path = self.path.clone();
        let sample_rate = self.sample_rate;
        let index = self.index;

        thread::spawn(move || {
            let span = span!(Level::INFO, "decode clip", index);
            let _enter = span.enter();

            let result = decode::decode_file(&path, sample_rate);
            let mut state = voice.state.lock();
            state.loading = false;
            match result {
                Ok(clip) => {
                    state.clip = Some(Arc::new(clip));
                    voice.notifier.ready(state.generation);
                }
                Err(e) => {
                    error!(index, path = ?path, err = %e, "Unable to decode clip");
                    state.playing = false;
                    voice.notifier.failed(state.generation, e.to_string());
                }
            }
        });
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        // The mixer only lets go of the voice on the next prune.
        self.voice.state.lock().playing = false;
    }
}

impl super::Handle for Handle {
    fn play(&mut self, generation: u64) -> Result<(), AudioError> {
        if !self.path.exists() {
            return Err(AudioError::FileNotFound(self.path.clone()));
        }

        let mut state = self.voice.state.lock();
        state.generation = generation;
        state.playing = true;
        state.ended = false;
        if state.clip.is_some() {
            self.voice.notifier.ready(generation);
        } else if !state.loading {
            state.loading = true;
            drop(state);
            self.start_decode();
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.voice.state.lock().playing = false;
    }

    fn rewind(&mut self) {
        let mut state = self.voice.state.lock();
        state.position = 0;
        state.ended = false;
    }

    fn set_looping(&mut self, looping: bool) {
        self.voice.state.lock().looping = looping;
    }

    fn set_gain(&mut self, gain: f32) {
        self.voice.state.lock().gain = gain.clamp(0.0, 1.0);
    }

    fn has_ended(&self) -> bool {
        self.voice.state.lock().ended
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::audio::{Handle as _, NotificationKind};
    use crate::testutil::{eventually, write_wav};

    fn handle(path: &Path) -> (Handle, crossbeam_channel::Receiver<crate::audio::Notification>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = Handle {
            index: 0,
            path: path.to_path_buf(),
            sample_rate: 44100,
            voice: Arc::new(Voice::new(Notifier::new(0, tx))),
        };
        (handle, rx)
    }

    #[test]
    fn test_play_decodes_in_background() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("clip.wav");
        write_wav(&path, 1, 44100, 441)?;

        let (mut handle, rx) = handle(&path);
        handle.play(1)?;

        let mut received = Vec::new();
        eventually(
            || {
                received.extend(rx.try_iter());
                !received.is_empty()
            },
            "Clip never became ready",
        );
        assert_eq!(NotificationKind::Ready, received[0].kind);
        assert_eq!(1, received[0].generation);

        let state = handle.voice.state.lock();
        assert!(state.playing);
        assert_eq!(Some(441), state.clip.as_ref().map(|clip| clip.frames()));
        Ok(())
    }

    #[test]
    fn test_paused_during_decode_stays_paused() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("clip.wav");
        write_wav(&path, 1, 44100, 441)?;

        let (mut handle, _rx) = handle(&path);
        handle.play(1)?;
        handle.pause();

        eventually(
            || handle.voice.state.lock().clip.is_some(),
            "Clip never decoded",
        );
        assert!(!handle.voice.state.lock().playing);
        Ok(())
    }

    #[test]
    fn test_play_failures() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let (mut missing, _rx) = handle(&dir.path().join("missing.wav"));
        assert!(matches!(missing.play(1), Err(AudioError::FileNotFound(_))));

        let path = dir.path().join("corrupt.wav");
        std::fs::write(&path, b"not audio")?;
        let (mut corrupt, rx) = handle(&path);
        corrupt.play(4)?;

        let mut received = Vec::new();
        eventually(
            || {
                received.extend(rx.try_iter());
                !received.is_empty()
            },
            "Decode failure never reported",
        );
        assert!(matches!(received[0].kind, NotificationKind::Failed(_)));
        assert_eq!(4, received[0].generation);
        assert!(!corrupt.voice.state.lock().playing);
        Ok(())
    }
}
