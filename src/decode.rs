//! The packet loop: read, filter, decode, hand frames to a sink.

use log::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, LibError, Result};
use crate::library::{BitstreamFilter, Decoder, Demuxer, MediaLibrary, StreamPacket};
use crate::session::MediaSession;
use crate::sink::FrameSink;

/// Counters for one run of the decode loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub packets_read: usize,
    /// Packets of other streams, dropped without decoding.
    pub packets_skipped: usize,
    pub frames_decoded: usize,
    /// Packets or drains the filter or decoder rejected; the loop carried on.
    pub decode_warnings: usize,
    /// The container reported a read error, which ended the loop early.
    pub read_error: bool,
    pub cancelled: bool,
}

impl<L: MediaLibrary> MediaSession<L> {
    /// Runs the session to the end of its input, handing every decoded frame
    /// to `sink`.
    ///
    /// Read errors end the loop like end of stream does. Decoder errors are
    /// logged and the packet is skipped. Only bitstream filter send failures
    /// and sink errors abort.
    pub fn run<S>(&mut self, sink: &mut S, cancel: &CancelToken) -> Result<DecodeStats>
    where
        S: FrameSink<L::Frame>,
    {
        let Self {
            filter,
            decoder,
            demuxer,
            stream,
        } = self;

        let mut frame = decoder.alloc_frame();
        let mut stats = DecodeStats::default();

        loop {
            if cancel.is_cancelled() {
                info!("decode loop cancelled after {} packets", stats.packets_read);
                stats.cancelled = true;
                return Ok(stats);
            }

            // av_read_frame()
            let packet = match demuxer.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(e) => {
                    warn!("read error, stopping: {}", e);
                    stats.read_error = true;
                    break;
                }
            };
            stats.packets_read += 1;

            if packet.stream_index() != stream.index {
                stats.packets_skipped += 1;
                continue;
            }

            match filter.as_mut() {
                Some(filter) => {
                    // av_bsf_send_packet(), then av_bsf_receive_packet() until
                    // it has nothing more for this input
                    filter.send_packet(packet).map_err(Error::Filter)?;
                    loop {
                        match filter.receive_packet() {
                            Ok(filtered) => {
                                decode_packet(decoder, &filtered, &mut frame, sink, &mut stats)?
                            }
                            Err(e) if e.is_flow() => break,
                            Err(e) => {
                                stats.decode_warnings += 1;
                                warn!("bitstream filter receive failed: {}", e);
                                break;
                            }
                        }
                    }
                }
                None => decode_packet(decoder, &packet, &mut frame, sink, &mut stats)?,
            }
        }

        // a null packet puts the decoder in draining mode and hands back
        // whatever it was still holding
        match decoder.send_eof() {
            Ok(()) => drain(decoder, &mut frame, sink, &mut stats)?,
            Err(e) if e.is_flow() => {}
            Err(e) => warn!("couldn't flush decoder: {}", e),
        }

        debug!("decode loop finished: {:?}", stats);
        Ok(stats)
    }
}

fn decode_packet<D, S>(
    decoder: &mut D,
    packet: &D::Packet,
    frame: &mut D::Frame,
    sink: &mut S,
    stats: &mut DecodeStats,
) -> Result<()>
where
    D: Decoder,
    S: FrameSink<D::Frame>,
{
    // avcodec_send_packet()
    let sent = match decoder.send_packet(packet) {
        // the packet was not taken: drain pending output, then offer it again
        Err(LibError::Again) => {
            drain(decoder, frame, sink, stats)?;
            decoder.send_packet(packet)
        }
        sent => sent,
    };
    if let Err(e) = sent {
        stats.decode_warnings += 1;
        warn!("decode error, skipping packet: {}", e);
        return Ok(());
    }
    drain(decoder, frame, sink, stats)
}

fn drain<D, S>(
    decoder: &mut D,
    frame: &mut D::Frame,
    sink: &mut S,
    stats: &mut DecodeStats,
) -> Result<()>
where
    D: Decoder,
    S: FrameSink<D::Frame>,
{
    loop {
        // avcodec_receive_frame() overwrites the same frame slot each time
        match decoder.receive_frame(frame) {
            Ok(()) => {
                stats.frames_decoded += 1;
                sink.consume(frame)?;
            }
            Err(e) if e.is_flow() => return Ok(()),
            Err(e) => {
                stats.decode_warnings += 1;
                warn!("decode error while receiving frame: {}", e);
                return Ok(());
            }
        }
    }
}
