//! Argument parsing for the headless acquisition binary
use std::path::PathBuf;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Serial device the front end is attached to
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    pub port: String,
    /// Serial baud rate
    #[arg(short, long, default_value_t = 921_600)]
    pub baud: u32,
    /// Circuit, display and sync settings (YAML)
    #[arg(short, long, default_value = "config/acquisition.yaml")]
    pub config: PathBuf,
    /// Per-channel offsets and trend coefficients (YAML)
    #[arg(long, default_value = "config/calibration_params.yaml")]
    pub calibration: PathBuf,
    /// Capture length in seconds
    #[arg(short, long, default_value_t = 120)]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub duration: u64,
    /// Reconstruct force from the selected channel, overriding the config file
    #[arg(short, long)]
    pub reconstruct: bool,
    /// Recompute channel offsets from the final window and save them
    #[arg(long)]
    pub calibrate_offset: bool,
    /// Sleep between acquisition ticks, in milliseconds
    #[arg(long, default_value_t = 1)]
    pub tick_ms: u64,
    /// Decode a raw byte capture file instead of reading the serial port
    #[arg(long)]
    pub replay: Option<PathBuf>,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults() {
        let args = Args::parse_from(["piezo-force"]);
        assert_eq!(args.port, "/dev/ttyUSB0");
        assert_eq!(args.baud, 921_600);
        assert_eq!(args.duration, 120);
        assert!(!args.reconstruct);
        assert!(args.replay.is_none());
        assert_eq!(args.verbose.log_level_filter(), log::LevelFilter::Info);
    }
    #[test]
    fn overrides_and_zero_duration() {
        let args = Args::parse_from(["piezo-force", "-p", "COM4", "-d", "5", "-r", "-v"]);
        assert_eq!(args.port, "COM4");
        assert_eq!(args.duration, 5);
        assert!(args.reconstruct);
        assert_eq!(args.verbose.log_level_filter(), log::LevelFilter::Debug);
        assert!(Args::try_parse_from(["piezo-force", "-d", "0"]).is_err());
        let replay = Args::parse_from(["piezo-force", "--replay", "capture.bin"]);
        assert_eq!(replay.replay, Some(PathBuf::from("capture.bin")));
    }
}
