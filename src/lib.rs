//! Decode a video stream with FFmpeg and either save its first frames as
//! images or show it on screen.
//!
//! [`MediaSession`] opens an input, picks its first video stream and runs the
//! read → filter → decode loop, feeding frames to a [`sink::FrameSink`]. The
//! pipeline is written against the traits in [`library`]; the `ffmpeg`
//! feature provides the real implementation in [`libav`].

pub mod cancel;
pub mod config;
pub mod decode;
pub mod error;
pub mod library;
pub mod media;
pub mod pacing;
pub mod picture;
pub mod session;
pub mod sink;

#[cfg(feature = "ffmpeg")]
pub mod libav;

pub use cancel::CancelToken;
pub use decode::DecodeStats;
pub use error::{Error, LibError, Result};
pub use session::MediaSession;
