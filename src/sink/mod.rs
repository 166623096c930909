//! Frame consumers fed by the decode loop.

mod display;
mod file;

pub use display::{ChannelSurface, DisplaySink, Surface, YuvImage};
pub use file::{write_ppm, FileSink, FrameStore};

use crate::error::Result;

/// Receives each decoded frame once, while the frame slot is still valid.
///
/// Returning an error aborts the decode loop, so sinks recover from their
/// own per-frame failures and only report what should stop the session.
pub trait FrameSink<F> {
    fn consume(&mut self, frame: &F) -> Result<()>;
}

impl<F, T> FrameSink<F> for T
where
    T: FnMut(&F) -> Result<()>,
{
    fn consume(&mut self, frame: &F) -> Result<()> {
        self(frame)
    }
}
