//! Defaults shared by the tutorial binaries, plus logger setup.

use std::io::Write;
use std::path::PathBuf;

use clap::ValueEnum;

/// Frames the file sink saves before it stops writing.
pub const DEFAULT_FRAME_LIMIT: usize = 5;

/// Directory the file sink writes into, relative to the working directory.
pub const DEFAULT_IMAGE_DIR: &str = "images";

/// Used for pacing when the container doesn't report a frame rate.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImageFormat {
    #[default]
    Ppm,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ppm => "ppm",
            Self::Png => "png",
        }
    }
}

/// Where and how many frames to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveConfig {
    pub out_dir: PathBuf,
    pub limit: usize,
    pub format: ImageFormat,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            limit: DEFAULT_FRAME_LIMIT,
            format: ImageFormat::default(),
        }
    }
}

/// Installs `env_logger` with an `info` default, overridable via `RUST_LOG`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
