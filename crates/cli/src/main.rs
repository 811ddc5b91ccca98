use clap::Parser;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

use busloader_core::device::Device;
use busloader_core::sim::SimBoard;
use busloader_core::store::FLASH_REGION_LEN;

/// BusLoader console simulator: runs the programmer firmware logic against a
/// simulated board and a scripted (or piped) console session.
#[derive(Parser, Debug)]
#[command(author, version, about = "BusLoader Simulator", long_about = None)]
struct Args {
    /// YAML board profile; the built-in board is used when omitted
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Console input script; stdin is read to EOF when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Flash image file backing the program store (created when missing)
    #[arg(short = 'F', long)]
    flash_image: Option<PathBuf>,

    /// Simulate N button presses before the console session
    #[arg(long, default_value = "0")]
    button_presses: u32,

    /// Write a JSON device snapshot after the session
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug-level execution tracing
    #[arg(short, long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Starting BusLoader Simulator");

    let profile = match &args.profile {
        Some(path) => {
            info!("Loading board profile: {:?}", path);
            busloader_config::BoardProfile::from_file(path)?
        }
        None => {
            info!("Using default board profile");
            busloader_config::BoardProfile::default()
        }
    };

    let mut board = SimBoard::new(&profile);

    if let Some(path) = &args.flash_image {
        if path.exists() {
            let image = std::fs::read(path)?;
            info!(
                "Loaded flash image {:?} ({} bytes, sha256 {:.16})",
                path,
                image.len(),
                hex_digest(&image)
            );
            board.load_flash_image(&image);
        } else {
            info!("Flash image {:?} missing, starting erased", path);
        }
    }

    let input = match &args.input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let mut device = Device::new(board, profile.clone())?;

    for press in 0..args.button_presses {
        info!("Simulating button press {}", press + 1);
        device.board_mut().hold_low(profile.pins.button);
        device.poll();
        device.board_mut().release(profile.pins.button);
        device.poll();
    }

    device.board_mut().push_input(&input);
    while device.board().pending_input() > 0 {
        device.poll();
    }
    // A few idle iterations, as the real main loop never stops.
    for _ in 0..4 {
        device.poll();
    }

    print!("{}", device.board_mut().take_output());

    info!(
        "Session complete: {} bus cells latched, {} ms simulated sleep",
        device.board().latched().len(),
        device.board().slept_ms()
    );

    if let Some(path) = &args.flash_image {
        let flash: Vec<u8> = device.board().flash_bytes().to_vec();
        std::fs::write(path, &flash)?;
        info!(
            "Persisted flash image {:?} ({} bytes, sha256 {:.16})",
            path,
            FLASH_REGION_LEN,
            hex_digest(&flash)
        );
    }

    if let Some(path) = &args.snapshot {
        let mut snapshot = device.snapshot();
        snapshot.slept_ms = Some(device.board().slept_ms());
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        info!("Wrote device snapshot to {:?}", path);
    }

    Ok(())
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
