use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::FrameSink;
use crate::config::ImageFormat;
use crate::error::{Error, LibError, Result, AVERROR_EINVAL};
use crate::library::Scaler;
use crate::media::TargetFormat;
use crate::picture::{Picture, PlaneView};

/// Writes `picture` (one RGB24 plane) as a binary PPM: a three line header
/// followed by `height` rows of exactly `width * 3` bytes. Row padding in
/// the source plane is not written.
pub fn write_ppm<W, P>(out: &mut W, picture: &P) -> io::Result<()>
where
    W: Write,
    P: Picture + ?Sized,
{
    let view = rgb_rows(picture)?;
    write!(out, "P6\n{} {}\n255\n", picture.width(), picture.height())?;
    for row in view.rows() {
        out.write_all(row)?;
    }
    Ok(())
}

fn rgb_rows<P: Picture + ?Sized>(picture: &P) -> io::Result<PlaneView<'_>> {
    let row_bytes = TargetFormat::Rgb24.row_bytes(0, picture.width());
    PlaneView::of(picture, 0, row_bytes, picture.height() as usize).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "picture plane is smaller than its dimensions",
        )
    })
}

/// Numbered image files in one directory, capped at `limit` frames.
#[derive(Debug)]
pub struct FrameStore {
    dir: PathBuf,
    format: ImageFormat,
    limit: usize,
    seen: usize,
    saved: usize,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>, format: ImageFormat, limit: usize) -> Self {
        Self {
            dir: dir.into(),
            format,
            limit,
            seen: 0,
            saved: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_full(&self) -> bool {
        self.seen >= self.limit
    }

    /// Files written successfully so far.
    pub fn saved(&self) -> usize {
        self.saved
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("frame{}.{}", index, self.format.extension()))
    }

    /// Saves the next frame as `frame<N>`, numbering from 1. Returns
    /// `Ok(None)` without touching the disk once the limit is reached.
    pub fn save<P: Picture + ?Sized>(&mut self, picture: &P) -> Result<Option<PathBuf>> {
        if self.is_full() {
            return Ok(None);
        }
        self.seen += 1;
        let path = self.path_for(self.seen);

        fs::create_dir_all(&self.dir).map_err(|source| Error::Io {
            path: self.dir.clone(),
            source,
        })?;
        match self.format {
            ImageFormat::Ppm => save_ppm(&path, picture)?,
            ImageFormat::Png => save_png(&path, picture)?,
        }

        self.saved += 1;
        Ok(Some(path))
    }
}

fn save_ppm<P: Picture + ?Sized>(path: &Path, picture: &P) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    let written = write_ppm(&mut writer, picture);
    // flush and sync even when the write failed; the file closes on drop
    let flushed = writer.flush().and_then(|()| writer.get_ref().sync_all());
    written.and(flushed).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn save_png<P: Picture + ?Sized>(path: &Path, picture: &P) -> Result<()> {
    let packed = rgb_rows(picture)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?
        .packed();
    image::save_buffer(
        path,
        &packed,
        picture.width(),
        picture.height(),
        image::ColorType::Rgb8,
    )?;
    Ok(())
}

/// Converts frames to RGB24 and saves the first few to a `FrameStore`.
///
/// The RGB buffer is allocated once and reused for every frame. Once the
/// store is full the sink does nothing; frames are still decoded upstream.
pub struct FileSink<S: Scaler> {
    scaler: S,
    rgb: S::Output,
    store: FrameStore,
}

impl<S: Scaler> FileSink<S> {
    pub fn new(scaler: S, store: FrameStore) -> Result<Self> {
        if scaler.target() != TargetFormat::Rgb24 {
            return Err(Error::Scale(LibError::failed(
                AVERROR_EINVAL,
                "file sink needs an RGB24 scaler",
            )));
        }
        let rgb = scaler.alloc_output().map_err(Error::Scale)?;
        Ok(Self { scaler, rgb, store })
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }
}

impl<S: Scaler> FrameSink<S::Frame> for FileSink<S> {
    fn consume(&mut self, frame: &S::Frame) -> Result<()> {
        if self.store.is_full() {
            return Ok(());
        }
        if let Err(e) = self.scaler.run(frame, &mut self.rgb) {
            warn!("couldn't convert frame to RGB: {}", e);
            return Ok(());
        }
        match self.store.save(&self.rgb) {
            Ok(Some(path)) => info!("saved {}", path.display()),
            Ok(None) => debug!("frame limit reached, not saving"),
            Err(e) => warn!("{}", e),
        }
        Ok(())
    }
}
