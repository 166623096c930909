use std::borrow::Cow;
use std::sync::mpsc::{SyncSender, TrySendError};

use log::{trace, warn};

use super::FrameSink;
use crate::error::{Error, LibError, Result, AVERROR_EINVAL};
use crate::library::Scaler;
use crate::media::TargetFormat;
use crate::pacing::FramePacer;
use crate::picture::{Picture, PlaneView};

/// Where the display sink puts converted planes.
pub trait Surface {
    /// Uploads one single-channel plane: 0 is luma, 1 and 2 are chroma.
    fn upload_plane(&mut self, plane: usize, view: PlaneView<'_>) -> Result<()>;

    /// Asks the render side to draw what was uploaded. Fire and forget.
    fn request_redraw(&mut self);
}

/// Converts every frame to planar YUV 4:2:0 and pushes it to a `Surface`.
///
/// A fresh destination buffer is allocated per frame and dropped as soon as
/// its planes are uploaded. The pacer then holds the loop to the stream's
/// frame rate.
pub struct DisplaySink<S: Scaler, R: Surface> {
    scaler: S,
    surface: R,
    pacer: FramePacer,
}

impl<S: Scaler, R: Surface> DisplaySink<S, R> {
    pub fn new(scaler: S, surface: R, pacer: FramePacer) -> Result<Self> {
        if scaler.target() != TargetFormat::Yuv420p {
            return Err(Error::Scale(LibError::failed(
                AVERROR_EINVAL,
                "display sink needs a YUV420P scaler",
            )));
        }
        Ok(Self {
            scaler,
            surface,
            pacer,
        })
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    fn upload(&mut self, yuv: &S::Output) -> Result<()> {
        let format = TargetFormat::Yuv420p;
        let (width, height) = (yuv.width(), yuv.height());
        for plane in 0..format.planes() {
            let (_, rows) = format.plane_size(plane, width, height);
            let row_bytes = format.row_bytes(plane, width);
            let view = PlaneView::of(yuv, plane, row_bytes, rows as usize).ok_or_else(|| {
                Error::Display(format!("plane {} is smaller than {}x{}", plane, width, height))
            })?;
            self.surface.upload_plane(plane, view)?;
        }
        Ok(())
    }
}

impl<S: Scaler, R: Surface> FrameSink<S::Frame> for DisplaySink<S, R> {
    fn consume(&mut self, frame: &S::Frame) -> Result<()> {
        let mut yuv = match self.scaler.alloc_output() {
            Ok(yuv) => yuv,
            Err(e) => {
                warn!("couldn't allocate YUV buffer: {}", e);
                return Ok(());
            }
        };
        if let Err(e) = self.scaler.run(frame, &mut yuv) {
            warn!("couldn't convert frame to YUV: {}", e);
            return Ok(());
        }
        self.upload(&yuv)?;
        drop(yuv);

        self.surface.request_redraw();
        self.pacer.wait();
        Ok(())
    }
}

/// Tightly packed YUV 4:2:0 picture, owned so it can cross threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YuvImage {
    pub width: u32,
    pub height: u32,
    pub planes: [Vec<u8>; 3],
}

impl YuvImage {
    /// Row length in bytes of `plane`, which is its width since there is no
    /// padding.
    pub fn pitch(&self, plane: usize) -> usize {
        TargetFormat::Yuv420p.row_bytes(plane, self.width)
    }

    /// The picture cropped to even dimensions, dropping the last column or
    /// row when odd. Planar texture uploads expect chroma planes of exactly
    /// `pitch * height / 2` bytes, which only holds for even heights.
    pub fn even_crop(&self) -> Cow<'_, YuvImage> {
        let (width, height) = (self.width & !1, self.height & !1);
        if (width, height) == (self.width, self.height) {
            return Cow::Borrowed(self);
        }

        let format = TargetFormat::Yuv420p;
        let mut planes: [Vec<u8>; 3] = Default::default();
        for (plane, out) in planes.iter_mut().enumerate() {
            let pitch = self.pitch(plane);
            let (w, h) = format.plane_size(plane, width, height);
            *out = self.planes[plane]
                .chunks(pitch.max(1))
                .take(h as usize)
                .flat_map(|row| &row[..w as usize])
                .copied()
                .collect();
        }
        Cow::Owned(YuvImage {
            width,
            height,
            planes,
        })
    }

    fn is_complete(&self) -> bool {
        let format = TargetFormat::Yuv420p;
        (0..3).all(|plane| {
            let (w, h) = format.plane_size(plane, self.width, self.height);
            self.planes[plane].len() == w as usize * h as usize
        })
    }
}

/// Surface that hands finished pictures to a render thread.
///
/// Redraw requests are posted with `try_send` on a bounded channel: when the
/// renderer still has a picture pending, the new one is dropped, and a
/// renderer that went away is ignored.
pub struct ChannelSurface {
    tx: SyncSender<YuvImage>,
    pending: YuvImage,
    dropped: usize,
}

impl ChannelSurface {
    pub fn new(tx: SyncSender<YuvImage>) -> Self {
        Self {
            tx,
            pending: YuvImage::default(),
            dropped: 0,
        }
    }

    /// Pictures that were never delivered.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Surface for ChannelSurface {
    fn upload_plane(&mut self, plane: usize, view: PlaneView<'_>) -> Result<()> {
        if plane >= 3 {
            return Err(Error::Display(format!("no YUV plane {}", plane)));
        }
        if plane == 0 {
            self.pending.width = view.row_bytes() as u32;
            self.pending.height = view.height() as u32;
        }
        self.pending.planes[plane] = view.packed();
        Ok(())
    }

    fn request_redraw(&mut self) {
        if !self.pending.is_complete() {
            warn!("redraw requested before all planes were uploaded");
            return;
        }
        let image = std::mem::take(&mut self.pending);
        match self.tx.try_send(image) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                trace!("renderer busy, dropping stale frame");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}
