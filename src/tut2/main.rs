use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context as ErrorContext, Result};
use clap::Parser;
use log::info;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Texture, TextureCreator, WindowCanvas};
use sdl2::video::WindowContext;

use framegrab::config::init_logging;
use framegrab::libav::Libav;
use framegrab::media::{StreamInfo, TargetFormat};
use framegrab::pacing::FramePacer;
use framegrab::sink::{ChannelSurface, DisplaySink, YuvImage};
use framegrab::{CancelToken, DecodeStats, MediaSession};

#[derive(Parser, Debug)]
#[command(name = "tut2")]
#[command(about = "Decode a video and play it in a window")]
struct Args {
    /// Input file path or network URL
    input: String,

    /// Playback rate, instead of the rate the container reports
    #[arg(long)]
    fps: Option<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    if let Some(fps) = args.fps {
        ensure!(fps.is_finite() && fps > 0.0, "--fps must be a positive number");
    }

    let cancel = CancelToken::new();
    let (info_tx, info_rx) = mpsc::channel();
    // one picture in flight; the decoder drops frames rather than queue them
    let (frame_tx, frame_rx) = mpsc::sync_channel(1);
    let mut decoder = Some(spawn_decoder(
        args.input.clone(),
        args.fps,
        info_tx,
        frame_tx,
        cancel.clone(),
    ));

    let stream = match info_rx.recv() {
        Ok(stream) => stream,
        // the decode thread gave up before opening a stream
        Err(_) => return finish(&mut decoder),
    };

    let sdl_context = sdl2::init().map_err(|e| anyhow!(e))?;
    let video_subsystem = sdl_context.video().map_err(|e| anyhow!(e))?;

    let window = video_subsystem
        .window("framegrab: tut2", stream.width, stream.height)
        .position_centered()
        .opengl()
        .build()
        .context("couldn't create window")?;

    // SDL_CreateRenderer()
    let mut canvas = window
        .into_canvas()
        .build()
        .context("couldn't create canvas")?;
    let texture_creator = canvas.texture_creator();
    let mut texture = create_texture(&texture_creator, stream.width, stream.height)?;

    let mut event_pump = sdl_context.event_pump().map_err(|e| anyhow!(e))?;
    // kept on screen after the stream ends, until the window is closed
    let mut last: Option<YuvImage> = None;

    'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => {
                    cancel.cancel();
                    break 'running;
                }
                Event::Window {
                    win_event: WindowEvent::Exposed | WindowEvent::SizeChanged(..),
                    ..
                } => {
                    if let Some(image) = &last {
                        draw_frame(image, &mut texture, &texture_creator, &mut canvas)?;
                    }
                }
                _ => {}
            }
        }

        if decoder.is_none() {
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        match frame_rx.recv_timeout(Duration::from_millis(10)) {
            Ok(image) => {
                draw_frame(&image, &mut texture, &texture_creator, &mut canvas)?;
                last = Some(image);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => finish(&mut decoder)?,
        }
    }

    drop(frame_rx);
    finish(&mut decoder)
}

/// Joins the decode thread, if still running, and reports how it went.
fn finish(decoder: &mut Option<thread::JoinHandle<framegrab::Result<DecodeStats>>>) -> Result<()> {
    let Some(handle) = decoder.take() else {
        return Ok(());
    };
    let stats = join(handle)?;
    info!(
        "played {} frames from {} packets ({} decode warnings){}",
        stats.frames_decoded,
        stats.packets_read,
        stats.decode_warnings,
        if stats.cancelled { ", stopped early" } else { "" }
    );
    Ok(())
}

/// Opens the input and runs the decode loop on its own thread. The stream
/// description goes back once over `info_tx`, then pictures over `frame_tx`.
fn spawn_decoder(
    input: String,
    fps: Option<f64>,
    info_tx: mpsc::Sender<StreamInfo>,
    frame_tx: SyncSender<YuvImage>,
    cancel: CancelToken,
) -> thread::JoinHandle<framegrab::Result<DecodeStats>> {
    thread::spawn(move || {
        let library = Libav::init()?;
        let mut session = MediaSession::open(&library, &input)?;

        // sws_getContext() to YUV420P, the layout of the IYUV texture
        let scaler = session.scaler(&library, TargetFormat::Yuv420p)?;
        let pacer = match fps {
            Some(fps) => FramePacer::new(Duration::from_secs_f64(1.0 / fps)),
            None => FramePacer::from_frame_rate(session.stream().frame_rate),
        };
        let mut sink = DisplaySink::new(scaler, ChannelSurface::new(frame_tx), pacer)?;

        // the window may already be gone, in which case cancel is set too
        let _ = info_tx.send(session.stream().clone());
        drop(info_tx);

        session.run(&mut sink, &cancel)
    })
}

fn join(handle: thread::JoinHandle<framegrab::Result<DecodeStats>>) -> Result<DecodeStats> {
    let result = handle
        .join()
        .map_err(|_| anyhow!("decode thread panicked"))?;
    result.map_err(|e| {
        let stage = if e.is_open_failure() {
            "couldn't open input"
        } else {
            "decoding stopped"
        };
        anyhow::Error::new(e).context(stage)
    })
}

/// IYUV texture for a `width`x`height` picture, cropped to even dimensions
/// like the pictures uploaded into it.
fn create_texture(
    texture_creator: &TextureCreator<WindowContext>,
    width: u32,
    height: u32,
) -> Result<Texture<'_>> {
    texture_creator
        .create_texture_streaming(PixelFormatEnum::IYUV, (width & !1).max(2), (height & !1).max(2))
        .context("couldn't create texture")
}

fn draw_frame<'a>(
    image: &YuvImage,
    texture: &mut Texture<'a>,
    texture_creator: &'a TextureCreator<WindowContext>,
    canvas: &mut WindowCanvas,
) -> Result<()> {
    let image = image.even_crop();
    if image.width == 0 || image.height == 0 {
        return Ok(());
    }
    let query = texture.query();
    if (query.width, query.height) != (image.width, image.height) {
        *texture = create_texture(texture_creator, image.width, image.height)?;
    }

    // three single-channel uploads, one per plane
    texture
        .update_yuv(
            None,
            &image.planes[0],
            image.pitch(0),
            &image.planes[1],
            image.pitch(1),
            &image.planes[2],
            image.pitch(2),
        )
        .map_err(|e| anyhow!("couldn't upload planes: {}", e))?;

    canvas.clear();
    canvas.copy(texture, None, None).map_err(|e| anyhow!(e))?;
    canvas.present();
    Ok(())
}
