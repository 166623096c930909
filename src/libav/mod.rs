//! `MediaLibrary` on top of FFmpeg, through `ffmpeg-next`.

mod bsf;

use std::ffi::{c_int, CString};
use std::{ptr, slice};

use ffmpeg_next as ffmpeg;
use ffmpeg::codec::{self, Id};
use ffmpeg::format::context::Input;
use ffmpeg::format::stream::Stream;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context, flag::Flags};
use ffmpeg::util::frame::video::Video;
use ffmpeg::{decoder, ffi, media, Packet};
use log::{debug, log_enabled, Level, LevelFilter};

pub use bsf::AnnexBFilter;

use crate::error::{Error, LibError, AVERROR_EINVAL};
use crate::library::{Decoder, Demuxer, MediaLibrary, Scaler, StreamPacket};
use crate::media::{detect_framing, CodecKind, FrameRate, MediaKind, StreamInfo, TargetFormat};
use crate::picture::Picture;

impl From<ffmpeg::Error> for LibError {
    fn from(e: ffmpeg::Error) -> Self {
        match e {
            ffmpeg::Error::Eof => Self::Eof,
            ffmpeg::Error::Other { errno } if errno == ffmpeg::util::error::EAGAIN => Self::Again,
            e => {
                let message = e.to_string();
                Self::failed(c_int::from(e), message)
            }
        }
    }
}

pub(crate) fn check(code: c_int) -> Result<(), LibError> {
    if code < 0 {
        Err(ffmpeg::Error::from(code).into())
    } else {
        Ok(())
    }
}

fn ffmpeg_log_level(filter: LevelFilter) -> ffmpeg::util::log::Level {
    use ffmpeg::util::log::Level as Av;
    match filter {
        LevelFilter::Off => Av::Quiet,
        LevelFilter::Error => Av::Error,
        LevelFilter::Warn | LevelFilter::Info => Av::Warning,
        LevelFilter::Debug => Av::Debug,
        LevelFilter::Trace => Av::Trace,
    }
}

/// Handle proving FFmpeg has been initialised.
pub struct Libav {
    _private: (),
}

impl Libav {
    /// Registers formats and codecs, brings up networking for URL inputs and
    /// points FFmpeg's own logging at the current `log` level.
    pub fn init() -> Result<Self, Error> {
        ffmpeg::init().map_err(|e| Error::Init(e.into()))?;
        ffmpeg::format::network::init();
        ffmpeg::util::log::set_level(ffmpeg_log_level(log::max_level()));
        Ok(Self { _private: () })
    }
}

pub struct Container {
    input: Input,
}

impl StreamPacket for Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }
}

impl Demuxer for Container {
    type Packet = Packet;

    fn streams(&self) -> Vec<StreamInfo> {
        self.input.streams().map(|stream| stream_info(&stream)).collect()
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, LibError> {
        // av_read_frame(); AVERROR_EOF once the container is exhausted
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn media_kind(medium: media::Type) -> MediaKind {
    match medium {
        media::Type::Video => MediaKind::Video,
        media::Type::Audio => MediaKind::Audio,
        media::Type::Subtitle => MediaKind::Subtitle,
        media::Type::Data | media::Type::Attachment => MediaKind::Data,
        media::Type::Unknown => MediaKind::Unknown,
    }
}

fn codec_kind(id: Id) -> CodecKind {
    match id {
        Id::H264 => CodecKind::H264,
        Id::HEVC => CodecKind::Hevc,
        other => CodecKind::Other(other.name().to_owned()),
    }
}

fn stream_info(stream: &Stream) -> StreamInfo {
    let parameters = stream.parameters();
    let codec = codec_kind(parameters.id());
    let rate = stream.avg_frame_rate();

    // AVCodecParameters: size and extradata have no safe accessors; the
    // extradata is avcC/hvcC for MP4-style streams, start codes otherwise
    let (width, height, framing) = unsafe {
        let par = &*parameters.as_ptr();
        let extradata = if par.extradata.is_null() || par.extradata_size <= 0 {
            &[][..]
        } else {
            slice::from_raw_parts(par.extradata, par.extradata_size as usize)
        };
        (
            par.width.max(0) as u32,
            par.height.max(0) as u32,
            detect_framing(&codec, extradata),
        )
    };

    StreamInfo {
        index: stream.index(),
        kind: media_kind(parameters.medium()),
        codec,
        width,
        height,
        frame_rate: FrameRate::new(rate.numerator(), rate.denominator()),
        framing,
    }
}

pub struct VideoDecoder(decoder::Video);

impl Decoder for VideoDecoder {
    type Packet = Packet;
    type Frame = Video;

    fn alloc_frame(&self) -> Video {
        Video::empty()
    }

    // avcodec_send_packet()
    fn send_packet(&mut self, packet: &Packet) -> Result<(), LibError> {
        self.0.send_packet(packet).map_err(LibError::from)
    }

    fn receive_frame(&mut self, frame: &mut Video) -> Result<(), LibError> {
        self.0.receive_frame(frame).map_err(LibError::from)
    }

    // avcodec_send_packet(NULL)
    fn send_eof(&mut self) -> Result<(), LibError> {
        self.0.send_eof().map_err(LibError::from)
    }
}

pub struct FrameScaler {
    context: Context,
    target: TargetFormat,
}

impl Scaler for FrameScaler {
    type Frame = Video;
    type Output = Video;

    fn target(&self) -> TargetFormat {
        self.target
    }

    fn alloc_output(&self) -> Result<Video, LibError> {
        let output = self.context.output();
        Ok(Video::new(output.format, output.width, output.height))
    }

    // sws_scale()
    fn run(&mut self, frame: &Video, output: &mut Video) -> Result<(), LibError> {
        self.context.run(frame, output).map_err(LibError::from)
    }
}

impl Picture for Video {
    fn width(&self) -> u32 {
        Video::width(self)
    }

    fn height(&self) -> u32 {
        Video::height(self)
    }

    fn planes(&self) -> usize {
        Video::planes(self)
    }

    fn data(&self, plane: usize) -> &[u8] {
        Video::data(self, plane)
    }

    fn stride(&self, plane: usize) -> usize {
        Video::stride(self, plane)
    }
}

impl MediaLibrary for Libav {
    type Packet = Packet;
    type Frame = Video;
    type Demuxer = Container;
    type Decoder = VideoDecoder;
    type Filter = AnnexBFilter;
    type Scaler = FrameScaler;

    fn open_input(&self, locator: &str) -> Result<Container, Error> {
        let path = CString::new(locator).map_err(|_| Error::Open {
            locator: locator.to_owned(),
            source: LibError::failed(AVERROR_EINVAL, "locator contains a NUL byte"),
        })?;

        let input = unsafe {
            let mut ctx = ptr::null_mut();
            check(ffi::avformat_open_input(
                &mut ctx,
                path.as_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
            ))
            .map_err(|source| Error::Open {
                locator: locator.to_owned(),
                source,
            })?;

            if let Err(source) = check(ffi::avformat_find_stream_info(ctx, ptr::null_mut())) {
                ffi::avformat_close_input(&mut ctx);
                return Err(Error::Probe {
                    locator: locator.to_owned(),
                    source,
                });
            }
            Input::wrap(ctx)
        };

        // av_dump_format()
        if log_enabled!(Level::Debug) {
            ffmpeg::format::context::input::dump(&input, 0, Some(locator));
        }
        debug!("opened {} with {} streams", locator, input.nb_streams());
        Ok(Container { input })
    }

    fn open_decoder(&self, container: &Container, stream: &StreamInfo) -> Result<VideoDecoder, Error> {
        let input = container
            .input
            .stream(stream.index)
            .ok_or(Error::StreamNotFound)?;
        let parameters = input.parameters();

        // avcodec_find_decoder(), then avcodec_parameters_to_context() and
        // avcodec_open2()
        let codec = decoder::find(parameters.id()).ok_or_else(|| Error::CodecUnsupported {
            codec: stream.codec.name().to_owned(),
        })?;
        let context = codec::Context::from_parameters(parameters)
            .map_err(|e| Error::DecoderInit(e.into()))?;
        let video = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|e| Error::DecoderInit(e.into()))?;

        debug!(
            "decoder {} opened: {:?} {}x{}",
            codec.name(),
            video.format(),
            video.width(),
            video.height()
        );
        Ok(VideoDecoder(video))
    }

    fn open_filter(
        &self,
        container: &Container,
        stream: &StreamInfo,
        name: &str,
    ) -> Result<AnnexBFilter, LibError> {
        let input = container.input.stream(stream.index).ok_or_else(|| {
            LibError::failed(AVERROR_EINVAL, format!("no stream #{}", stream.index))
        })?;
        AnnexBFilter::new(name, &input.parameters(), input.time_base())
    }

    fn open_scaler(&self, decoder: &VideoDecoder, target: TargetFormat) -> Result<FrameScaler, LibError> {
        let decoder = &decoder.0;
        let pixel = match target {
            TargetFormat::Rgb24 => Pixel::RGB24,
            TargetFormat::Yuv420p => Pixel::YUV420P,
        };
        let context = Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            pixel,
            decoder.width(),
            decoder.height(),
            Flags::BILINEAR,
        )?;
        Ok(FrameScaler { context, target })
    }
}
