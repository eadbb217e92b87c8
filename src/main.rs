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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use soundtap::config::Audio;
use soundtap::controller::{keyboard, Controller};
use soundtap::pack::{display_name, Catalog};
use soundtap::prefs::FileStore;
use soundtap::soundboard::Soundboard;
use soundtap::{audio, config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A soundboard for sound packs."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will start the soundboard, controlled from the keyboard.
    Start {
        /// The path to the soundboard config. Defaults are used when omitted.
        config_path: Option<PathBuf>,
    },
    /// Lists the available sound packs.
    Packs {
        /// The path to the soundboard config.
        config_path: Option<PathBuf>,
    },
    /// Exports the saved settings for a sound pack.
    Export {
        /// The path to the soundboard config.
        config_path: Option<PathBuf>,
        /// The pack to export. Defaults to the last selected pack.
        #[arg(short, long)]
        pack: Option<String>,
        /// The directory to write the export to. Defaults to the configured exports
        /// directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so they don't interleave with the command prompt.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => {
            let config = config::load(config_path.as_deref())?;
            let store = FileStore::open_or_empty(config.state());
            let backend = audio::get_backend(config.audio())?;
            println!("Output: {}", backend);

            let mut board = Soundboard::new(&config, Arc::new(store), backend);
            println!("{}", board.init());

            Controller::new(board, Arc::new(keyboard::Driver::new()))
                .join()
                .await?;
        }
        Commands::Packs { config_path } => {
            let config = config::load(config_path.as_deref())?;
            let packs = Catalog::from_config(&config).list_packs();

            println!("Sound packs (count: {}):", packs.len());
            for pack in packs {
                println!("- {} ({})", pack, display_name(&pack));
            }
        }
        Commands::Export {
            config_path,
            pack,
            output,
        } => {
            let config = config::load(config_path.as_deref())?;
            let store = FileStore::open_or_empty(config.state());
            // Exporting never plays anything.
            let backend = audio::get_backend(&Audio::new("mock"))?;

            let board = Soundboard::new(&config, Arc::new(store), backend);
            let dir = output.unwrap_or_else(|| config.exports().to_path_buf());
            let path = board.export_saved(pack.as_deref(), &dir)?;
            println!("Settings exported to {}", path.display());
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}
