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
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::soundboard::Soundboard;

pub mod keyboard;

/// How often pending playback notifications are applied.
const NOTIFICATION_INTERVAL: Duration = Duration::from_millis(50);

/// Controller events that will trigger behavior in the soundboard.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Plays a clip on its own, stopping everything else.
    Play(usize),

    /// Plays a clip alongside whatever is already playing.
    Add(usize),

    /// Pauses a clip. Does nothing if it isn't playing.
    Pause(usize),

    /// Stops a clip and rewinds it.
    Stop(usize),

    /// Stops every clip that isn't paused.
    StopAll,

    /// Turns looping on or off for a clip.
    Loop(usize, bool),

    /// Sets a clip's volume percentage.
    Volume(usize, i64),

    /// Sets the global volume percentage.
    GlobalVolume(i64),

    /// Switches to another sound pack.
    Pack(String),

    /// Lists the available sound packs.
    Packs,

    /// Lists the clips in the current pack.
    List,

    /// Exports the current settings.
    Export,

    /// Asks to reset the current pack's settings. Needs a confirmation.
    Reset,

    /// Answers a pending question.
    Confirm(bool),

    /// Stops the controller.
    Quit,
}

/// Errors parsing a command line into an event.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("No command given")]
    Empty,

    #[error("Unrecognized command: {0}")]
    Unknown(String),

    #[error("Usage: {command} {usage}")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },
}

const PLAY: &str = "play";
const ADD: &str = "add";
const PAUSE: &str = "pause";
const STOP: &str = "stop";
const STOP_ALL: &str = "stopall";
const LOOP: &str = "loop";
const VOLUME: &str = "vol";
const GLOBAL_VOLUME: &str = "gvol";
const PACK: &str = "pack";
const PACKS: &str = "packs";
const LIST: &str = "list";
const EXPORT: &str = "export";
const RESET: &str = "reset";
const QUIT: &str = "quit";

/// The commands, for help text.
pub const COMMANDS: [&str; 14] = [
    "play N", "add N", "pause N", "stop N", STOP_ALL, "loop N on|off", "vol N P", "gvol P",
    "pack ID", PACKS, LIST, EXPORT, RESET, QUIT,
];

fn arg<T: FromStr>(
    arg: Option<&str>,
    command: &'static str,
    usage: &'static str,
) -> Result<T, ParseError> {
    arg.and_then(|arg| arg.parse().ok())
        .ok_or(ParseError::Usage { command, usage })
}

impl FromStr for Event {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Event, ParseError> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ParseError::Empty)?.to_lowercase();
        let first = words.next();
        let second = words.next();

        Ok(match command.as_str() {
            PLAY => Event::Play(arg(first, PLAY, "N")?),
            ADD => Event::Add(arg(first, ADD, "N")?),
            PAUSE => Event::Pause(arg(first, PAUSE, "N")?),
            STOP => Event::Stop(arg(first, STOP, "N")?),
            STOP_ALL => Event::StopAll,
            LOOP => {
                let index = arg(first, LOOP, "N on|off")?;
                match second.map(str::to_lowercase).as_deref() {
                    Some("on") => Event::Loop(index, true),
                    Some("off") => Event::Loop(index, false),
                    _ => {
                        return Err(ParseError::Usage {
                            command: LOOP,
                            usage: "N on|off",
                        })
                    }
                }
            }
            VOLUME => Event::Volume(arg(first, VOLUME, "N P")?, arg(second, VOLUME, "N P")?),
            GLOBAL_VOLUME => Event::GlobalVolume(arg(first, GLOBAL_VOLUME, "P")?),
            PACK => Event::Pack(
                first
                    .ok_or(ParseError::Usage {
                        command: PACK,
                        usage: "ID",
                    })?
                    .to_string(),
            ),
            PACKS => Event::Packs,
            LIST => Event::List,
            EXPORT => Event::Export,
            RESET => Event::Reset,
            "y" | "yes" => Event::Confirm(true),
            "n" | "no" => Event::Confirm(false),
            QUIT | "exit" => Event::Quit,
            _ => return Err(ParseError::Unknown(command)),
        })
    }
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Applies events to a soundboard and reports what happened.
struct Session {
    board: Soundboard,
    /// Set while a reset is waiting for its confirmation.
    reset_pending: bool,
}

impl Session {
    /// Applies an event, returning the lines to show.
    fn apply(&mut self, event: Event) -> Vec<String> {
        if self.reset_pending && !matches!(event, Event::Confirm(_)) {
            self.reset_pending = false;
            info!("Pending reset abandoned.");
        }

        let board = &mut self.board;
        let status = match event {
            Event::Play(index) => board.play(index, true),
            Event::Add(index) => board.play(index, false),
            Event::Pause(index) => board.pause(index),
            Event::Stop(index) => board.stop(index),
            Event::StopAll => board.stop_all(),
            Event::Loop(index, looping) => board.set_loop(index, looping),
            Event::Volume(index, percent) => board.set_individual_volume(index, percent),
            Event::GlobalVolume(percent) => board.set_global_volume(percent),
            Event::Pack(pack_id) => board.switch_pack(&pack_id),
            Event::Export => {
                let dir = board.exports().to_path_buf();
                board.export(&dir)
            }
            Event::Packs => return self.packs(),
            Event::List => return self.list(),
            Event::Reset => {
                let mut prompt = String::new();
                let status = board.reset(|message| {
                    prompt = message.to_string();
                    false
                });
                if status.is_error() {
                    return vec![status.to_string()];
                }
                self.reset_pending = true;
                return vec![format!("{} (yes/no)", prompt)];
            }
            Event::Confirm(answer) => {
                if !self.reset_pending {
                    return vec!["Nothing to confirm".to_string()];
                }
                self.reset_pending = false;
                board.reset(|_| answer)
            }
            Event::Quit => return Vec::new(),
        };

        vec![status.to_string()]
    }

    fn packs(&self) -> Vec<String> {
        let current = self.board.current_pack();
        self.board
            .packs()
            .into_iter()
            .map(|(pack_id, name)| {
                let marker = if current == Some(pack_id.as_str()) {
                    '*'
                } else {
                    ' '
                };
                format!("{} {} ({})", marker, pack_id, name)
            })
            .collect()
    }

    fn list(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Global volume: {}%",
            self.board.global_volume()
        )];
        lines.extend(self.board.tiles().into_iter().map(|tile| {
            let name = match &tile.group {
                Some(group) => format!("{} / {}", group, tile.name),
                None => tile.name.clone(),
            };
            format!(
                "{:>3}  {:<32} {:>3}%  {}  {}",
                tile.index,
                name,
                tile.volume,
                if tile.looping { "loop" } else { "once" },
                tile.state
            )
        }));
        lines
    }

    /// Applies pending playback notifications, returning the lines to show.
    fn notifications(&mut self) -> Vec<String> {
        self.board
            .process_notifications()
            .into_iter()
            .map(|(index, state)| {
                let name = self
                    .board
                    .pack()
                    .sound(index)
                    .map_or_else(|| index.to_string(), |sound| sound.name().to_string());
                format!("{}: {}", name, state)
            })
            .collect()
    }
}

/// Drives a soundboard.
pub struct Controller {
    handle: JoinHandle<Soundboard>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(board: Soundboard, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(
                Controller::trigger_events(board, driver)
                    .instrument(span!(Level::INFO, "controller")),
            ),
        }
    }

    /// Join will block until the controller finishes, returning the soundboard.
    pub async fn join(&mut self) -> Result<Soundboard, JoinError> {
        (&mut self.handle).await
    }

    /// Applies events from the driver and playback notifications until the driver
    /// finishes or asks to quit.
    async fn trigger_events(board: Soundboard, driver: Arc<dyn Driver>) -> Soundboard {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);
        let mut ticker = tokio::time::interval(NOTIFICATION_INTERVAL);
        let mut session = Session {
            board,
            reset_pending: false,
        };

        info!(
            pack = session.board.current_pack().unwrap_or("none"),
            "Controller started."
        );

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let event = match event {
                        Some(Event::Quit) | None => break,
                        Some(event) => event,
                    };
                    info!(event = ?event, "Received event.");
                    for line in session.apply(event) {
                        println!("{}", line);
                    }
                }
                _ = ticker.tick() => {
                    for line in session.notifications() {
                        println!("{}", line);
                    }
                }
            }
        }

        info!("Controller closing.");
        drop(events_rx);
        match join_handle.await {
            Ok(Err(e)) => error!(err = %e, "Event monitor failed."),
            Err(e) => error!(err = %e, "Error waiting for event monitor to stop."),
            Ok(Ok(())) => {}
        }
        session.board.stop_all();
        session.board
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io, sync::Arc};

    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::*;
    use crate::audio::mock;
    use crate::playback::PlaybackState;
    use crate::prefs::MemoryStore;
    use crate::testutil::PackFixture;

    /// Sends a fixed list of events, then finishes.
    struct ScriptedDriver {
        events: parking_lot::Mutex<Vec<Event>>,
    }

    impl ScriptedDriver {
        fn new(events: Vec<Event>) -> ScriptedDriver {
            ScriptedDriver {
                events: parking_lot::Mutex::new(events),
            }
        }
    }

    impl Driver for ScriptedDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = std::mem::take(&mut *self.events.lock());
            tokio::task::spawn_blocking(move || {
                for event in events {
                    if events_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Ok(())
            })
        }
    }

    fn board(fixture: &PackFixture, backend: &mock::Backend) -> Soundboard {
        let mut board = Soundboard::new(
            &fixture.config(),
            Arc::new(MemoryStore::new()),
            Arc::new(backend.clone()),
        );
        board.init();
        board
    }

    #[test]
    fn test_parse() {
        assert_eq!(Ok(Event::Play(3)), "play 3".parse::<Event>());
        assert_eq!(Ok(Event::Add(0)), "ADD 0".parse::<Event>());
        assert_eq!(Ok(Event::Pause(1)), " pause  1 ".parse::<Event>());
        assert_eq!(Ok(Event::Stop(2)), "stop 2".parse::<Event>());
        assert_eq!(Ok(Event::StopAll), "stopall".parse::<Event>());
        assert_eq!(Ok(Event::Loop(4, true)), "loop 4 on".parse::<Event>());
        assert_eq!(Ok(Event::Loop(4, false)), "loop 4 OFF".parse::<Event>());
        assert_eq!(Ok(Event::Volume(1, 35)), "vol 1 35".parse::<Event>());
        assert_eq!(Ok(Event::GlobalVolume(-5)), "gvol -5".parse::<Event>());
        assert_eq!(Ok(Event::Pack("Migo.json".to_string())), "pack Migo.json".parse::<Event>());
        assert_eq!(Ok(Event::Packs), "packs".parse::<Event>());
        assert_eq!(Ok(Event::List), "list".parse::<Event>());
        assert_eq!(Ok(Event::Export), "export".parse::<Event>());
        assert_eq!(Ok(Event::Reset), "reset".parse::<Event>());
        assert_eq!(Ok(Event::Confirm(true)), "yes".parse::<Event>());
        assert_eq!(Ok(Event::Confirm(false)), "n".parse::<Event>());
        assert_eq!(Ok(Event::Quit), "quit".parse::<Event>());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Err(ParseError::Empty), "   ".parse::<Event>());
        assert_eq!(
            Err(ParseError::Unknown("dance".to_string())),
            "dance".parse::<Event>()
        );
        assert!(matches!(
            "play".parse::<Event>(),
            Err(ParseError::Usage { command: PLAY, .. })
        ));
        assert!(matches!(
            "play -1".parse::<Event>(),
            Err(ParseError::Usage { .. })
        ));
        assert!(matches!(
            "loop 1 maybe".parse::<Event>(),
            Err(ParseError::Usage { command: LOOP, .. })
        ));
        assert!(matches!(
            "vol 1".parse::<Event>(),
            Err(ParseError::Usage { .. })
        ));
        assert!(matches!(
            "pack".parse::<Event>(),
            Err(ParseError::Usage { .. })
        ));
    }

    #[test]
    fn test_session() -> Result<(), Box<dyn Error>> {
        let fixture = PackFixture::new()?;
        let backend = mock::Backend::get("mock");
        let mut session = Session {
            board: board(&fixture, &backend),
            reset_pending: false,
        };

        assert_eq!(vec!["Playing Tavern"], session.apply(Event::Add(0)));
        assert_eq!(vec!["Playing Sword"], session.apply(Event::Add(1)));
        session.apply(Event::Play(3));
        assert_eq!(vec![3], session.board.playing());

        let packs = session.apply(Event::Packs);
        assert_eq!(
            vec![
                "* dndeekend.json (Dndeekend)".to_string(),
                "  migo.json (Migo)".to_string()
            ],
            packs
        );

        let list = session.apply(Event::List);
        assert_eq!(5, list.len());
        assert_eq!("Global volume: 60%", list[0]);
        assert!(list[2].contains("Combat / Sword"), "{}", list[2]);
        assert!(list[4].contains("Playing"), "{}", list[4]);

        assert!(session.board.process_notifications().is_empty());
        assert!(backend.finish(3));
        assert_eq!(vec!["Dragon: Ready"], session.notifications());
        Ok(())
    }

    #[test]
    fn test_session_reset_confirmation() -> Result<(), Box<dyn Error>> {
        let fixture = PackFixture::new()?;
        let backend = mock::Backend::get("mock");
        let mut session = Session {
            board: board(&fixture, &backend),
            reset_pending: false,
        };

        session.apply(Event::GlobalVolume(10));
        assert_eq!(
            vec!["Nothing to confirm".to_string()],
            session.apply(Event::Confirm(true))
        );

        let prompt = session.apply(Event::Reset);
        assert!(prompt[0].contains("Dndeekend"), "{}", prompt[0]);
        assert!(prompt[0].ends_with("(yes/no)"));
        assert_eq!(10, session.board.global_volume());

        // Anything other than an answer abandons the reset.
        session.apply(Event::List);
        assert_eq!(
            vec!["Nothing to confirm".to_string()],
            session.apply(Event::Confirm(true))
        );

        session.apply(Event::Reset);
        assert_eq!(
            vec!["Settings reset for Dndeekend".to_string()],
            session.apply(Event::Confirm(true))
        );
        assert_eq!(60, session.board.global_volume());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let fixture = PackFixture::new()?;
        let backend = mock::Backend::get("mock");
        let driver = Arc::new(ScriptedDriver::new(vec![
            Event::Add(0),
            Event::Add(1),
            Event::Loop(1, true),
            Event::GlobalVolume(30),
            Event::Pack("migo.json".to_string()),
            Event::Add(0),
            Event::Quit,
            Event::Add(1),
        ]));

        let mut controller = Controller::new(board(&fixture, &backend), driver);
        let board = controller.join().await?;

        assert_eq!(Some("migo.json"), board.current_pack());
        // The clip played before quitting is stopped on the way out, and nothing after
        // the quit was applied.
        assert!(board.playing().is_empty());
        assert_eq!(PlaybackState::Stopped, board.tiles()[0].state);
        assert_eq!(PlaybackState::Absent, board.tiles()[1].state);
        Ok(())
    }
}
