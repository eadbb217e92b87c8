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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::{Event, COMMANDS};

/// A controller that drives the soundboard from lines typed on the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and forwards a single command. Returns false once there is nothing more
    /// to read.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "> ")?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            info!("Keyboard input closed.");
            return Ok(false);
        }

        let event = match input.parse::<Event>() {
            Ok(event) => event,
            Err(e) => {
                warn!(input = input.trim(), err = %e, "Unrecognized input");
                writeln!(writer, "{}", e)?;
                writeln!(writer, "Commands: {}", COMMANDS.join(", "))?;
                return Ok(true);
            }
        };

        let quit = event == Event::Quit;
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(!quit)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");
            println!("Commands: {}", COMMANDS.join(", "));

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};

    use tokio::sync::mpsc;

    use super::Driver;
    use crate::controller::Event;

    fn get_event(input: &str) -> Result<(bool, Option<Event>, String), io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let more = Driver::monitor_io(&sender, reader, &mut writer)?;

        // Force the sender to close.
        drop(sender);
        Ok((
            more,
            receiver.blocking_recv(),
            String::from_utf8_lossy(&writer).to_string(),
        ))
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!((true, Some(Event::Play(2))), {
            let (more, event, _) = get_event("play 2\n")?;
            (more, event)
        });
        assert_eq!(Some(Event::Loop(0, true)), get_event("loop 0 on\n")?.1);
        assert_eq!(
            Some(Event::Pack("migo.json".to_string())),
            get_event("pack migo.json")?.1
        );
        Ok(())
    }

    #[test]
    fn test_keyboard_quit_and_close() -> Result<(), io::Error> {
        let (more, event, _) = get_event("quit\n")?;
        assert!(!more);
        assert_eq!(Some(Event::Quit), event);

        let (more, event, _) = get_event("")?;
        assert!(!more);
        assert_eq!(None, event);
        Ok(())
    }

    #[test]
    fn test_keyboard_unrecognized() -> Result<(), io::Error> {
        let (more, event, output) = get_event("dance\n")?;
        assert!(more);
        assert_eq!(None, event);
        assert!(output.contains("Unrecognized command: dance"), "{}", output);
        assert!(output.contains("Commands: play N"), "{}", output);
        Ok(())
    }
}
