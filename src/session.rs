use log::{debug, info};

use crate::error::{Error, LibError, Result, AVERROR_EINVAL};
use crate::library::{Demuxer, MediaLibrary};
use crate::media::{Framing, MediaKind, StreamInfo, TargetFormat};

/// One open input with its video decoder.
///
/// Fields drop in declaration order, which releases the native handles in
/// reverse order of acquisition on every exit path.
pub struct MediaSession<L: MediaLibrary> {
    pub(crate) filter: Option<L::Filter>,
    pub(crate) decoder: L::Decoder,
    pub(crate) demuxer: L::Demuxer,
    pub(crate) stream: StreamInfo,
}

impl<L: MediaLibrary> MediaSession<L> {
    /// Opens `locator`, picks its first video stream and opens a decoder for
    /// it. Length-prefixed H.264/HEVC streams also get an Annex B filter.
    pub fn open(library: &L, locator: &str) -> Result<Self> {
        if locator.is_empty() {
            return Err(Error::Open {
                locator: String::new(),
                source: LibError::failed(AVERROR_EINVAL, "empty locator"),
            });
        }

        let demuxer = library.open_input(locator)?;
        let stream = first_video_stream(&demuxer.streams()).ok_or(Error::StreamNotFound)?;
        info!(
            "video stream #{}: {} {}x{}",
            stream.index,
            stream.codec.name(),
            stream.width,
            stream.height
        );

        let decoder = library.open_decoder(&demuxer, &stream)?;

        let filter = match (stream.framing, stream.codec.annexb_filter()) {
            (Framing::LengthPrefixed, Some(name)) => {
                debug!("stream #{} is length-prefixed, using {}", stream.index, name);
                let filter = library
                    .open_filter(&demuxer, &stream, name)
                    .map_err(Error::Filter)?;
                Some(filter)
            }
            _ => None,
        };

        Ok(Self {
            filter,
            decoder,
            demuxer,
            stream,
        })
    }

    pub fn stream(&self) -> &StreamInfo {
        &self.stream
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Scaler from the decoder's native layout to `target`, same dimensions.
    pub fn scaler(&self, library: &L, target: TargetFormat) -> Result<L::Scaler> {
        library
            .open_scaler(&self.decoder, target)
            .map_err(Error::Scale)
    }
}

fn first_video_stream(streams: &[StreamInfo]) -> Option<StreamInfo> {
    let mut streams: Vec<&StreamInfo> = streams.iter().collect();
    streams.sort_by_key(|s| s.index);
    streams
        .into_iter()
        .find(|s| s.kind == MediaKind::Video)
        .cloned()
}
