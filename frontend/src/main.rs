use std::path::PathBuf;

use c64_core::prelude::Machine;
use clap::Parser;
use serde::{Deserialize, Serialize};

mod audio;
mod emulator;
mod input;
mod overlay;
mod rom_path;
mod video;

/// Minimal Commodore 64 emulator: boots a disk image and runs it full speed.
#[derive(Parser, Debug)]
#[command(name = "c64", about = "A Commodore 64 emulator")]
struct Cli {
    /// Disk image to boot, by name (without extension), found under --rom-dir.
    diskimage: Option<String>,

    /// Window scale factor.
    #[arg(long)]
    scale: Option<u32>,

    /// Directory containing .d64/.d81 disk images.
    #[arg(long)]
    rom_dir: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Default)]
struct Config {
    diskimage: Option<String>,
    scale: Option<u32>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("c64-frontend").join("config.toml"))
}

fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
            log::warn!("ignoring malformed config at {}: {e}", path.display());
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

fn save_config(config: &Config) {
    let Some(path) = config_path() else { return };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::warn!("could not create config directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(config) {
        Ok(text) => {
            if let Err(e) = std::fs::write(&path, text) {
                log::warn!("failed to write config to {}: {e}", path.display());
            }
        }
        Err(e) => log::warn!("failed to serialize config: {e}"),
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config();

    let diskimage_name = cli
        .diskimage
        .clone()
        .or(config.diskimage.clone())
        .unwrap_or_else(|| "steelrangerdemo".to_string());
    let scale = cli.scale.or(config.scale).unwrap_or(3);
    let rom_dir = cli
        .rom_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|d| d.join("c64-frontend")))
        .expect("could not resolve a rom directory; pass --rom-dir explicitly");

    let disk = match rom_path::load_disk_image(&rom_dir, &diskimage_name) {
        Ok(disk) => Some(disk),
        Err(e) => {
            log::error!("failed to load disk image '{diskimage_name}' from {}: {e}", rom_dir.display());
            None
        }
    };

    let mut machine = Machine::new(disk);
    machine.reset();

    emulator::run(&mut machine, scale);

    save_config(&Config {
        diskimage: Some(diskimage_name),
        scale: Some(scale),
    });
}
