// src/main.rs
use std::sync::mpsc;
use std::time::{Duration, Instant};
use anyhow::{bail, Context};
use clap::Parser;
use piezo_force::cli::Args;
use piezo_force::config::{AcquisitionConfig, CalibrationFile};
use piezo_force::drivers::SerialByteSource;
use piezo_force::engine;
use piezo_force::session::{replay_capture, AcquisitionSession};
use piezo_force::types::{Command, Event, Outcome};
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();
    let mut config = AcquisitionConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.reconstruct |= args.reconstruct;
    let calibration = CalibrationFile::load(&args.calibration)
        .with_context(|| format!("loading {}", args.calibration.display()))?;
    if let Some(path) = &args.replay {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let snapshot = replay_capture(&bytes, &config, &calibration)?;
        println!("{}", serde_json::to_string_pretty(&snapshot.metadata)?);
        return Ok(());
    }
    let source = SerialByteSource::open(&args.port, args.baud)
        .with_context(|| format!("opening {}", args.port))?;
    log::info!("Connected to {} at {} baud", args.port, args.baud);
    let session = AcquisitionSession::new(source, &config, calibration)?;
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let (tx, rx) = mpsc::channel();
    let handle = engine::spawn(session, rx_cmd, tx, Duration::from_millis(args.tick_ms));
    let total = Duration::from_secs(args.duration);
    let started = Instant::now();
    let mut last_report = 0;
    let mut shutdown_sent = false;
    let snapshot = loop {
        let event = match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => Some(event),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                bail!("acquisition thread exited without a capture")
            }
        };
        match event {
            Some(Event::Stopped(snapshot)) => break snapshot,
            Some(Event::Outcome(Outcome::OffsetsCalibrated(file))) => {
                file.save(&args.calibration)
                    .with_context(|| format!("saving {}", args.calibration.display()))?;
                log::info!("Offsets saved to {}", args.calibration.display());
            }
            Some(Event::Error(message)) => log::warn!("{message}"),
            Some(_) | None => {}
        }
        let elapsed = started.elapsed();
        if elapsed.as_secs() > last_report {
            last_report = elapsed.as_secs();
            log::info!("Time: {last_report}s");
        }
        if elapsed >= total && !shutdown_sent {
            if args.calibrate_offset {
                tx_cmd.send(Command::CalibrateOffset).ok();
            }
            tx_cmd.send(Command::Shutdown).ok();
            shutdown_sent = true;
        }
    };
    if handle.join().is_err() {
        bail!("acquisition thread panicked");
    }
    println!("{}", serde_json::to_string_pretty(&snapshot.metadata)?);
    Ok(())
}
