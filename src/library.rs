//! The seam between the pipeline and the native media library.
//!
//! The pipeline only ever talks to these traits. `crate::libav` implements
//! them on top of FFmpeg; tests drive the same pipeline with scripted stubs.

use crate::error::{Error, LibError};
use crate::media::{StreamInfo, TargetFormat};
use crate::picture::Picture;

pub trait StreamPacket {
    fn stream_index(&self) -> usize;
}

/// An opened and probed container.
pub trait Demuxer {
    type Packet: StreamPacket;

    /// Streams in index order.
    fn streams(&self) -> Vec<StreamInfo>;

    /// Next packet, `Ok(None)` at end of stream.
    fn read_packet(&mut self) -> Result<Option<Self::Packet>, LibError>;
}

/// An opened decoder.
///
/// `send_packet` may answer `LibError::Again` when the decoder wants its
/// pending output drained first; `receive_frame` answers `Again` when it
/// needs more input and `Eof` once fully flushed.
pub trait Decoder {
    type Packet;
    type Frame;

    fn alloc_frame(&self) -> Self::Frame;
    fn send_packet(&mut self, packet: &Self::Packet) -> Result<(), LibError>;
    fn receive_frame(&mut self, frame: &mut Self::Frame) -> Result<(), LibError>;
    fn send_eof(&mut self) -> Result<(), LibError>;
}

/// Packet-in, packets-out transform applied before decoding.
pub trait BitstreamFilter {
    type Packet;

    fn send_packet(&mut self, packet: Self::Packet) -> Result<(), LibError>;

    /// `LibError::Again` when no output is available yet.
    fn receive_packet(&mut self) -> Result<Self::Packet, LibError>;
}

/// Fixed-destination pixel format conversion.
pub trait Scaler {
    type Frame;
    type Output: Picture;

    fn target(&self) -> TargetFormat;
    fn alloc_output(&self) -> Result<Self::Output, LibError>;
    fn run(&mut self, frame: &Self::Frame, output: &mut Self::Output) -> Result<(), LibError>;
}

pub trait MediaLibrary {
    type Packet: StreamPacket;
    type Frame;
    type Demuxer: Demuxer<Packet = Self::Packet>;
    type Decoder: Decoder<Packet = Self::Packet, Frame = Self::Frame>;
    type Filter: BitstreamFilter<Packet = Self::Packet>;
    type Scaler: Scaler<Frame = Self::Frame>;

    /// Opens and probes `locator`: `Error::Open` if it cannot be opened,
    /// `Error::Probe` if its stream information cannot be read.
    fn open_input(&self, locator: &str) -> Result<Self::Demuxer, Error>;

    /// `Error::CodecUnsupported` when no decoder exists for the stream's
    /// codec, `Error::DecoderInit` when one exists but cannot be opened.
    fn open_decoder(
        &self,
        demuxer: &Self::Demuxer,
        stream: &StreamInfo,
    ) -> Result<Self::Decoder, Error>;

    fn open_filter(
        &self,
        demuxer: &Self::Demuxer,
        stream: &StreamInfo,
        name: &str,
    ) -> Result<Self::Filter, LibError>;

    fn open_scaler(
        &self,
        decoder: &Self::Decoder,
        target: TargetFormat,
    ) -> Result<Self::Scaler, LibError>;
}
