use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use framegrab::config::{
    init_logging, ImageFormat, SaveConfig, DEFAULT_FRAME_LIMIT, DEFAULT_IMAGE_DIR,
};
use framegrab::libav::Libav;
use framegrab::media::TargetFormat;
use framegrab::sink::{FileSink, FrameStore};
use framegrab::{CancelToken, MediaSession};

#[derive(Parser, Debug)]
#[command(name = "tut1")]
#[command(about = "Decode a video and save its first frames as images")]
struct Args {
    /// Input file path or network URL
    input: String,

    /// Directory the frames are written to
    #[arg(short, long, default_value = DEFAULT_IMAGE_DIR)]
    out_dir: PathBuf,

    /// Number of frames to save
    #[arg(short = 'n', long, default_value_t = DEFAULT_FRAME_LIMIT)]
    max_frames: usize,

    /// Image file format
    #[arg(short, long, value_enum, default_value_t = ImageFormat::Ppm)]
    format: ImageFormat,
}

impl From<&Args> for SaveConfig {
    fn from(args: &Args) -> Self {
        Self {
            out_dir: args.out_dir.clone(),
            limit: args.max_frames,
            format: args.format,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    let config = SaveConfig::from(&args);

    // registers formats and codecs, av_register_all() and friends
    let library = Libav::init()?;

    // avformat_open_input(), avformat_find_stream_info(), then the first
    // video stream and its decoder
    let mut session = MediaSession::open(&library, &args.input).map_err(|e| {
        let stage = if e.is_open_failure() {
            "couldn't open"
        } else {
            "couldn't start decoding"
        };
        anyhow::Error::new(e).context(format!("{} {}", stage, args.input))
    })?;

    // sws_getContext() from the decoder's pixel format to RGB24, same size
    let scaler = session.scaler(&library, TargetFormat::Rgb24)?;
    let store = FrameStore::new(&config.out_dir, config.format, config.limit);
    let mut sink = FileSink::new(scaler, store)?;

    let stats = session.run(&mut sink, &CancelToken::new())?;
    info!(
        "decoded {} frames from {} packets ({} decode warnings), saved {} to {}",
        stats.frames_decoded,
        stats.packets_read,
        stats.decode_warnings,
        sink.store().saved(),
        sink.store().dir().display()
    );

    Ok(())
}
