//! Stream metadata shared between the media library and the pipeline.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Unknown,
}

/// Codecs the pipeline needs to tell apart; everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecKind {
    H264,
    Hevc,
    Other(String),
}

impl CodecKind {
    /// Name of the bitstream filter that rewrites length-prefixed NAL units
    /// into start-code delimited Annex B.
    pub fn annexb_filter(&self) -> Option<&'static str> {
        match self {
            Self::H264 => Some("h264_mp4toannexb"),
            Self::Hevc => Some("hevc_mp4toannexb"),
            Self::Other(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Other(name) => name,
        }
    }
}

/// How NAL units are framed in the container's elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Not a NAL based codec.
    Raw,
    /// Start-code delimited, what decoders and raw streams expect.
    AnnexB,
    /// avcC/hvcC style: every NAL unit carries a length prefix.
    LengthPrefixed,
}

/// Works out the NAL framing from the codec parameters' extradata.
///
/// MP4-family containers store an avcC/hvcC configuration record whose first
/// byte (configurationVersion) is 1. Annex B extradata starts with a start
/// code, and streams without extradata carry their parameter sets in-band.
pub fn detect_framing(codec: &CodecKind, extradata: &[u8]) -> Framing {
    if codec.annexb_filter().is_none() {
        return Framing::Raw;
    }
    match extradata {
        [0, 0, 1, ..] | [0, 0, 0, 1, ..] => Framing::AnnexB,
        [1, ..] => Framing::LengthPrefixed,
        _ => Framing::AnnexB,
    }
}

/// Frames per second as a rational, like the container reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: i32,
    pub den: i32,
}

impl FrameRate {
    pub fn new(num: i32, den: i32) -> Option<Self> {
        (num > 0 && den > 0).then_some(Self { num, den })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.den) / f64::from(self.num))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: MediaKind,
    pub codec: CodecKind,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<FrameRate>,
    pub framing: Framing,
}

/// Destination layout of a scaling conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// Interleaved 8-bit RGB, one plane.
    Rgb24,
    /// Planar 4:2:0, chroma halved in both dimensions.
    Yuv420p,
}

impl TargetFormat {
    pub fn planes(&self) -> usize {
        match self {
            Self::Rgb24 => 1,
            Self::Yuv420p => 3,
        }
    }

    /// Width in pixels and height in rows of `plane` for a `width`x`height`
    /// picture.
    pub fn plane_size(&self, plane: usize, width: u32, height: u32) -> (u32, u32) {
        match (self, plane) {
            (Self::Yuv420p, 1 | 2) => ((width + 1) / 2, (height + 1) / 2),
            _ => (width, height),
        }
    }

    /// Meaningful bytes per row of `plane`.
    pub fn row_bytes(&self, plane: usize, width: u32) -> usize {
        match self {
            Self::Rgb24 => width as usize * 3,
            Self::Yuv420p => self.plane_size(plane, width, 0).0 as usize,
        }
    }
}
