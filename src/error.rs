use std::path::PathBuf;

use thiserror::Error;

/// `AVERROR(EINVAL)`, used for argument errors raised on this side of the
/// library boundary.
pub(crate) const AVERROR_EINVAL: i32 = -22;

/// Status returned by a call into the media library.
///
/// `Again` and `Eof` are flow control, not failures: the decode loop treats
/// them as "no output yet" and "drained" respectively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibError {
    #[error("resource temporarily unavailable")]
    Again,
    #[error("end of file")]
    Eof,
    #[error("{message} (code {code})")]
    Failed { code: i32, message: String },
}

impl LibError {
    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self::Failed {
            code,
            message: message.into(),
        }
    }

    /// True for the statuses that end an inner loop without being an error.
    pub fn is_flow(&self) -> bool {
        matches!(self, Self::Again | Self::Eof)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("couldn't initialize media library: {0}")]
    Init(#[source] LibError),
    #[error("couldn't open input {locator:?}: {source}")]
    Open {
        locator: String,
        #[source]
        source: LibError,
    },
    #[error("couldn't find stream information in {locator:?}: {source}")]
    Probe {
        locator: String,
        #[source]
        source: LibError,
    },
    #[error("no video stream found")]
    StreamNotFound,
    #[error("unsupported codec: {codec}")]
    CodecUnsupported { codec: String },
    #[error("couldn't open decoder: {0}")]
    DecoderInit(#[source] LibError),
    #[error("bitstream filter failed: {0}")]
    Filter(#[source] LibError),
    #[error("couldn't set up scaler: {0}")]
    Scale(#[source] LibError),
    #[error("couldn't write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("display error: {0}")]
    Display(String),
}

impl Error {
    /// Errors that end a session before the decode loop starts.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Self::Open { .. }
                | Self::Probe { .. }
                | Self::StreamNotFound
                | Self::CodecUnsupported { .. }
                | Self::DecoderInit(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
