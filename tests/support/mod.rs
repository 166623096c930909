//! Scripted stand-in for the media library, recording what the pipeline
//! asks of it.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use framegrab::error::{Error, LibError};
use framegrab::library::{BitstreamFilter, Decoder, Demuxer, MediaLibrary, Scaler, StreamPacket};
use framegrab::media::{CodecKind, Framing, MediaKind, StreamInfo, TargetFormat};
use framegrab::picture::Picture;

pub const PAD: u8 = 0xee;

pub type Events = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Clone)]
pub struct StubPacket {
    pub stream: usize,
    pub seq: usize,
}

impl StreamPacket for StubPacket {
    fn stream_index(&self) -> usize {
        self.stream
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubFrame {
    pub seq: usize,
    pub width: u32,
    pub height: u32,
}

/// What the decoder does with a given packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnSend {
    /// Accepts it and produces one frame.
    Frame,
    /// Accepts it but needs more input before producing anything.
    NoOutput,
    /// Answers `Again` the first time without taking it, accepts it when
    /// offered again.
    Again,
    /// Answers `Again` every time.
    Busy,
    /// Rejects it with a decode error.
    Fail,
    /// Accepts it, then fails when its frame is received.
    ReceiveFails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOpen {
    Ok,
    OpenFails,
    ProbeFails,
    CodecUnsupported,
    DecoderInitFails,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub streams: Vec<StreamInfo>,
    pub packets: Vec<StubPacket>,
    pub on_open: OnOpen,
    /// Packet sequence numbers with non-default decoder behaviour.
    pub on_send: HashMap<usize, OnSend>,
    /// Fail the read after this many packets.
    pub read_error_after: Option<usize>,
    /// Frames the decoder holds back; the newest this many only come out
    /// once it is flushed.
    pub delayed_frames: usize,
    pub filter_send_fails: bool,
    /// Packet sequence numbers the filter fails to hand back.
    pub filter_receive_fails: HashSet<usize>,
    pub width: u32,
    pub height: u32,
}

pub fn video_stream(index: usize) -> StreamInfo {
    StreamInfo {
        index,
        kind: MediaKind::Video,
        codec: CodecKind::H264,
        width: 4,
        height: 3,
        frame_rate: None,
        framing: Framing::AnnexB,
    }
}

pub fn audio_stream(index: usize) -> StreamInfo {
    StreamInfo {
        kind: MediaKind::Audio,
        codec: CodecKind::Other("aac".into()),
        framing: Framing::Raw,
        width: 0,
        height: 0,
        ..video_stream(index)
    }
}

impl Script {
    /// One video stream with `count` packets.
    pub fn video(count: usize) -> Self {
        Self {
            streams: vec![video_stream(0)],
            packets: (0..count).map(|seq| StubPacket { stream: 0, seq }).collect(),
            on_open: OnOpen::Ok,
            on_send: HashMap::new(),
            read_error_after: None,
            delayed_frames: 0,
            filter_send_fails: false,
            filter_receive_fails: HashSet::new(),
            width: 4,
            height: 3,
        }
    }
}

pub struct StubLibrary {
    pub script: Script,
    pub events: Events,
    /// Conversions performed by every scaler this library opened.
    pub scaler_runs: Rc<Cell<usize>>,
    /// Extra bytes at the end of each converted row.
    pub stride_padding: usize,
}

impl StubLibrary {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            events: Rc::default(),
            scaler_runs: Rc::default(),
            stride_padding: 5,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Sequence numbers the decoder was sent, in order.
    pub fn sent(&self) -> Vec<usize> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("send ").map(|n| n.parse().unwrap()))
            .collect()
    }
}

fn log(events: &Events, event: impl Into<String>) {
    events.borrow_mut().push(event.into());
}

pub struct StubDemuxer {
    streams: Vec<StreamInfo>,
    packets: VecDeque<StubPacket>,
    read: usize,
    read_error_after: Option<usize>,
    events: Events,
}

impl Demuxer for StubDemuxer {
    type Packet = StubPacket;

    fn streams(&self) -> Vec<StreamInfo> {
        self.streams.clone()
    }

    fn read_packet(&mut self) -> Result<Option<StubPacket>, LibError> {
        if self.read_error_after == Some(self.read) {
            return Err(LibError::failed(-5, "Input/output error"));
        }
        let packet = self.packets.pop_front();
        if let Some(packet) = &packet {
            self.read += 1;
            log(&self.events, format!("read {}", packet.seq));
        }
        Ok(packet)
    }
}

impl Drop for StubDemuxer {
    fn drop(&mut self) {
        log(&self.events, "demuxer dropped");
    }
}

/// Decoder output slot; `None` stands for a frame that fails to decode.
type Output = Option<StubFrame>;

pub struct StubDecoder {
    on_send: HashMap<usize, OnSend>,
    refused: HashSet<usize>,
    held: VecDeque<Output>,
    pending: VecDeque<Output>,
    delayed: usize,
    eof: bool,
    width: u32,
    height: u32,
    events: Events,
}

impl StubDecoder {
    fn frame(&self, seq: usize) -> StubFrame {
        StubFrame {
            seq,
            width: self.width,
            height: self.height,
        }
    }

    fn hold(&mut self, output: Output) {
        self.held.push_back(output);
        while self.held.len() > self.delayed {
            if let Some(ready) = self.held.pop_front() {
                self.pending.push_back(ready);
            }
        }
    }
}

impl Decoder for StubDecoder {
    type Packet = StubPacket;
    type Frame = StubFrame;

    fn alloc_frame(&self) -> StubFrame {
        StubFrame::default()
    }

    fn send_packet(&mut self, packet: &StubPacket) -> Result<(), LibError> {
        log(&self.events, format!("send {}", packet.seq));
        match self.on_send.get(&packet.seq).copied().unwrap_or(OnSend::Frame) {
            OnSend::Again if self.refused.insert(packet.seq) => Err(LibError::Again),
            OnSend::Frame | OnSend::Again => {
                let frame = self.frame(packet.seq);
                self.hold(Some(frame));
                Ok(())
            }
            OnSend::ReceiveFails => {
                self.hold(None);
                Ok(())
            }
            OnSend::NoOutput => Ok(()),
            OnSend::Busy => Err(LibError::Again),
            OnSend::Fail => Err(LibError::failed(-1094995529, "Invalid data found when processing input")),
        }
    }

    fn receive_frame(&mut self, frame: &mut StubFrame) -> Result<(), LibError> {
        match self.pending.pop_front() {
            Some(Some(next)) => {
                *frame = next;
                Ok(())
            }
            Some(None) => Err(LibError::failed(-1094995529, "Invalid data found when processing input")),
            None if self.eof => Err(LibError::Eof),
            None => Err(LibError::Again),
        }
    }

    fn send_eof(&mut self) -> Result<(), LibError> {
        log(&self.events, "eof");
        self.eof = true;
        self.pending.extend(self.held.drain(..));
        Ok(())
    }
}

impl Drop for StubDecoder {
    fn drop(&mut self) {
        log(&self.events, "decoder dropped");
    }
}

pub struct StubFilter {
    queue: VecDeque<StubPacket>,
    send_fails: bool,
    receive_fails: HashSet<usize>,
    events: Events,
}

impl BitstreamFilter for StubFilter {
    type Packet = StubPacket;

    fn send_packet(&mut self, packet: StubPacket) -> Result<(), LibError> {
        if self.send_fails {
            return Err(LibError::failed(-22, "Invalid argument"));
        }
        log(&self.events, format!("filter {}", packet.seq));
        self.queue.push_back(packet);
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<StubPacket, LibError> {
        match self.queue.pop_front() {
            Some(packet) if self.receive_fails.contains(&packet.seq) => {
                Err(LibError::failed(-1094995529, "Invalid data found when processing input"))
            }
            Some(packet) => Ok(packet),
            None => Err(LibError::Again),
        }
    }
}

impl Drop for StubFilter {
    fn drop(&mut self) {
        log(&self.events, "filter dropped");
    }
}

/// Converted picture with padded rows; visible bytes hold the frame's
/// sequence number, padding holds `PAD`.
#[derive(Debug, Clone)]
pub struct StubPicture {
    pub width: u32,
    pub height: u32,
    pub planes: Vec<(Vec<u8>, usize)>,
}

impl Picture for StubPicture {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn planes(&self) -> usize {
        self.planes.len()
    }
    fn data(&self, plane: usize) -> &[u8] {
        &self.planes[plane].0
    }
    fn stride(&self, plane: usize) -> usize {
        self.planes[plane].1
    }
}

pub struct StubScaler {
    target: TargetFormat,
    width: u32,
    height: u32,
    padding: usize,
    runs: Rc<Cell<usize>>,
}

impl Scaler for StubScaler {
    type Frame = StubFrame;
    type Output = StubPicture;

    fn target(&self) -> TargetFormat {
        self.target
    }

    fn alloc_output(&self) -> Result<StubPicture, LibError> {
        let planes = (0..self.target.planes())
            .map(|plane| {
                let (_, rows) = self.target.plane_size(plane, self.width, self.height);
                let stride = self.target.row_bytes(plane, self.width) + self.padding;
                (vec![PAD; stride * rows as usize], stride)
            })
            .collect();
        Ok(StubPicture {
            width: self.width,
            height: self.height,
            planes,
        })
    }

    fn run(&mut self, frame: &StubFrame, output: &mut StubPicture) -> Result<(), LibError> {
        if (frame.width, frame.height) != (self.width, self.height) {
            return Err(LibError::failed(-22, "frame size changed"));
        }
        self.runs.set(self.runs.get() + 1);
        for (plane, (data, stride)) in output.planes.iter_mut().enumerate() {
            let row_bytes = self.target.row_bytes(plane, self.width);
            for row in data.chunks_mut(*stride) {
                row[..row_bytes].fill(frame.seq as u8);
            }
        }
        Ok(())
    }
}

impl MediaLibrary for StubLibrary {
    type Packet = StubPacket;
    type Frame = StubFrame;
    type Demuxer = StubDemuxer;
    type Decoder = StubDecoder;
    type Filter = StubFilter;
    type Scaler = StubScaler;

    fn open_input(&self, locator: &str) -> Result<StubDemuxer, Error> {
        match self.script.on_open {
            OnOpen::OpenFails => {
                return Err(Error::Open {
                    locator: locator.to_owned(),
                    source: LibError::failed(-2, "No such file or directory"),
                })
            }
            OnOpen::ProbeFails => {
                return Err(Error::Probe {
                    locator: locator.to_owned(),
                    source: LibError::failed(-1094995529, "Invalid data found when processing input"),
                })
            }
            _ => {}
        }
        log(&self.events, "demuxer opened");
        Ok(StubDemuxer {
            streams: self.script.streams.clone(),
            packets: self.script.packets.iter().cloned().collect(),
            read: 0,
            read_error_after: self.script.read_error_after,
            events: self.events.clone(),
        })
    }

    fn open_decoder(&self, _demuxer: &StubDemuxer, stream: &StreamInfo) -> Result<StubDecoder, Error> {
        match self.script.on_open {
            OnOpen::CodecUnsupported => {
                return Err(Error::CodecUnsupported {
                    codec: stream.codec.name().to_owned(),
                })
            }
            OnOpen::DecoderInitFails => {
                return Err(Error::DecoderInit(LibError::failed(-22, "Invalid argument")))
            }
            _ => {}
        }
        log(&self.events, format!("decoder opened for #{}", stream.index));
        Ok(StubDecoder {
            on_send: self.script.on_send.clone(),
            refused: HashSet::new(),
            held: VecDeque::new(),
            pending: VecDeque::new(),
            delayed: self.script.delayed_frames,
            eof: false,
            width: self.script.width,
            height: self.script.height,
            events: self.events.clone(),
        })
    }

    fn open_filter(
        &self,
        _demuxer: &StubDemuxer,
        _stream: &StreamInfo,
        name: &str,
    ) -> Result<StubFilter, LibError> {
        log(&self.events, format!("filter opened: {}", name));
        Ok(StubFilter {
            queue: VecDeque::new(),
            send_fails: self.script.filter_send_fails,
            receive_fails: self.script.filter_receive_fails.clone(),
            events: self.events.clone(),
        })
    }

    fn open_scaler(&self, decoder: &StubDecoder, target: TargetFormat) -> Result<StubScaler, LibError> {
        Ok(StubScaler {
            target,
            width: decoder.width,
            height: decoder.height,
            padding: self.stride_padding,
            runs: self.scaler_runs.clone(),
        })
    }
}
