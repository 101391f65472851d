use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::color::{Color, COLOR_SIZE};

/// A stack of same-sized RGBA frames held in one contiguous allocation.
///
/// Binary container format (input and output):
///   [0..4]   n  (i32 little-endian, frame count)
///   [4..8]   h  (i32 little-endian, rows per frame)
///   [8..12]  w  (i32 little-endian, columns per frame)
///   [12..]   n*h*w pixel records of 4 bytes each (r, g, b, a),
///            x fastest, then y, then t.
///
/// Trailing bytes after the last pixel record are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    frames: usize,
    height: usize,
    width: usize,
    pixels: Vec<Color>,
}

pub const HEADER_SIZE: usize = 12;
/// Default cap on the declared pixel payload, in bytes.
pub const DEFAULT_MAX_BYTES: u64 = 1_000_000_000;

const READ_CHUNK_PIXELS: usize = 64 * 1024;

impl FrameBuffer {
    /// Allocate `n` frames of `h` x `w` pixels, all set to `fill`.
    ///
    /// The payload is held to [`DEFAULT_MAX_BYTES`], the same cap `load` uses
    /// by default.
    pub fn filled(n: usize, h: usize, w: usize, fill: Color) -> Result<Self, FrameError> {
        let total = pixel_count(n as i64, h as i64, w as i64)?;
        if (total * COLOR_SIZE) as u64 > DEFAULT_MAX_BYTES {
            return Err(FrameError::Oversized {
                n: n as i32,
                h: h as i32,
                w: w as i32,
                bytes: (total * COLOR_SIZE) as u128,
                cap: DEFAULT_MAX_BYTES,
            });
        }
        Ok(Self {
            frames: n,
            height: h,
            width: w,
            pixels: vec![fill; total],
        })
    }

    /// Wrap an existing pixel vector laid out in container order.
    pub fn from_pixels(n: usize, h: usize, w: usize, pixels: Vec<Color>) -> Result<Self, FrameError> {
        let total = pixel_count(n as i64, h as i64, w as i64)?;
        if pixels.len() != total {
            return Err(FrameError::Truncated {
                expected: total,
                got: pixels.len(),
            });
        }
        Ok(Self {
            frames: n,
            height: h,
            width: w,
            pixels,
        })
    }

    /// Build a buffer from decoded RGBA frames. All frames must share one size.
    ///
    /// This and [`FrameBuffer::frame_image`] are the bridge for library callers
    /// that hold decoded images, for example a frontend that extracts frames
    /// from an animated image, writes the container for the `cutout` binary and
    /// turns the processed container back into images.
    pub fn from_frames(images: &[RgbaImage]) -> Result<Self, FrameError> {
        let first = images.first().ok_or(FrameError::NoFrames)?;
        let (width, height) = first.dimensions();
        let total = pixel_count(images.len() as i64, height as i64, width as i64)?;

        let mut pixels = Vec::with_capacity(total);
        for (index, img) in images.iter().enumerate() {
            if img.dimensions() != (width, height) {
                return Err(FrameError::FrameMismatch {
                    index,
                    expected: (width, height),
                    got: img.dimensions(),
                });
            }
            pixels.extend(img.pixels().map(|p| Color::from_bytes(p.0)));
        }

        Ok(Self {
            frames: images.len(),
            height: height as usize,
            width: width as usize,
            pixels,
        })
    }

    // -- Accessors ---------------------------------------------------------------

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Payload size in bytes, excluding the header.
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * COLOR_SIZE
    }

    #[inline]
    fn index(&self, t: usize, y: usize, x: usize) -> usize {
        (t * self.height + y) * self.width + x
    }

    /// Pixel at `(t, y, x)`. Panics when out of range.
    #[inline]
    pub fn get(&self, t: usize, y: usize, x: usize) -> Color {
        self.pixels[self.index(t, y, x)]
    }

    #[inline]
    pub fn set(&mut self, t: usize, y: usize, x: usize, color: Color) {
        let i = self.index(t, y, x);
        self.pixels[i] = color;
    }

    /// Pixels of frame `t`, row-major.
    pub fn frame(&self, t: usize) -> &[Color] {
        let len = self.height * self.width;
        &self.pixels[t * len..(t + 1) * len]
    }

    pub fn frame_mut(&mut self, t: usize) -> &mut [Color] {
        let len = self.height * self.width;
        &mut self.pixels[t * len..(t + 1) * len]
    }

    /// Copy frame `t` out as an RGBA image, or `None` when `t` is out of range.
    /// See [`FrameBuffer::from_frames`] for the intended callers.
    pub fn frame_image(&self, t: usize) -> Option<RgbaImage> {
        if t >= self.frames {
            return None;
        }
        let frame = self.frame(t);
        let width = self.width;
        Some(RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Rgba(frame[y as usize * width + x as usize].to_bytes())
        }))
    }

    // -- Serialization -------------------------------------------------------------

    /// Decode a container from `reader`.
    ///
    /// The declared payload is checked against `max_bytes` before anything is
    /// allocated for it.
    pub fn read_from<R: Read>(mut reader: R, max_bytes: u64) -> Result<Self, FrameError> {
        let mut header = [0u8; HEADER_SIZE];
        let got = read_full(&mut reader, &mut header)?;
        if got < HEADER_SIZE {
            return Err(FrameError::TooShort {
                got,
                expected: HEADER_SIZE,
            });
        }

        let field = |i: usize| i32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);
        let (n, h, w) = (field(0), field(4), field(8));
        check_dims(n as i64, h as i64, w as i64)?;

        let bytes = n as u128 * h as u128 * w as u128 * COLOR_SIZE as u128;
        if bytes > max_bytes as u128 {
            return Err(FrameError::Oversized {
                n,
                h,
                w,
                bytes,
                cap: max_bytes,
            });
        }

        let (frames, height, width) = (n as usize, h as usize, w as usize);
        let total = frames * height * width;
        debug!(n, h, w, bytes = bytes as u64, "reading pixel payload");

        let mut pixels = Vec::with_capacity(total);
        let mut chunk = vec![0u8; total.min(READ_CHUNK_PIXELS) * COLOR_SIZE];
        while pixels.len() < total {
            let want = (total - pixels.len()).min(READ_CHUNK_PIXELS) * COLOR_SIZE;
            let filled = read_full(&mut reader, &mut chunk[..want])?;
            pixels.extend(
                chunk[..filled]
                    .chunks_exact(COLOR_SIZE)
                    .map(|c| Color::new(c[0], c[1], c[2], c[3])),
            );
            if filled < want {
                return Err(FrameError::Truncated {
                    expected: total,
                    got: pixels.len(),
                });
            }
        }

        Ok(Self {
            frames,
            height,
            width,
            pixels,
        })
    }

    /// Encode the container to `writer`. With `write_header == false` only the
    /// pixel records are emitted.
    pub fn write_to<W: Write>(&self, mut writer: W, write_header: bool) -> Result<(), FrameError> {
        if write_header {
            let mut header = [0u8; HEADER_SIZE];
            for (slot, dim) in header
                .chunks_exact_mut(4)
                .zip([self.frames, self.height, self.width])
            {
                let dim = i32::try_from(dim).map_err(|_| FrameError::InvalidDimensions {
                    n: self.frames as i64,
                    h: self.height as i64,
                    w: self.width as i64,
                })?;
                slot.copy_from_slice(&dim.to_le_bytes());
            }
            writer.write_all(&header)?;
        }

        let mut chunk = Vec::with_capacity(READ_CHUNK_PIXELS.min(self.pixels.len()) * COLOR_SIZE);
        for pixels in self.pixels.chunks(READ_CHUNK_PIXELS) {
            chunk.clear();
            for p in pixels {
                chunk.extend_from_slice(&p.to_bytes());
            }
            writer.write_all(&chunk)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a container file.
    pub fn load(path: &Path, max_bytes: u64) -> Result<Self, FrameError> {
        let file = File::open(path).map_err(|source| FrameError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::read_from(BufReader::new(file), max_bytes)
    }

    /// Write a container file, replacing any existing one.
    pub fn store(&self, path: &Path, write_header: bool) -> Result<(), FrameError> {
        let file = File::create(path).map_err(|source| FrameError::Create {
            path: path.display().to_string(),
            source,
        })?;
        self.write_to(BufWriter::new(file), write_header)
    }
}

fn check_dims(n: i64, h: i64, w: i64) -> Result<(), FrameError> {
    if n <= 0 || h <= 0 || w <= 0 || n > i32::MAX as i64 || h > i32::MAX as i64 || w > i32::MAX as i64 {
        return Err(FrameError::InvalidDimensions { n, h, w });
    }
    Ok(())
}

/// Validate the dimensions and return `n * h * w`. Products whose byte size
/// does not fit in memory addressing are rejected as invalid.
fn pixel_count(n: i64, h: i64, w: i64) -> Result<usize, FrameError> {
    check_dims(n, h, w)?;
    (n as usize)
        .checked_mul(h as usize)
        .and_then(|v| v.checked_mul(w as usize))
        .filter(|&v| v.checked_mul(COLOR_SIZE).is_some_and(|bytes| bytes <= isize::MAX as usize))
        .ok_or(FrameError::InvalidDimensions { n, h, w })
}

/// Read until `buf` is full or the reader hits EOF. Returns the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(filled)
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("error opening file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("error opening output file {path}: {source}")]
    Create {
        path: String,
        source: std::io::Error,
    },
    #[error("image size too large: {n}x{h}x{w} needs {bytes} bytes, cap is {cap}")]
    Oversized {
        n: i32,
        h: i32,
        w: i32,
        bytes: u128,
        cap: u64,
    },
    #[error("invalid dimensions {n}x{h}x{w}")]
    InvalidDimensions { n: i64, h: i64, w: i64 },
    #[error("header too short: got {got} bytes, expected {expected}")]
    TooShort { got: usize, expected: usize },
    #[error("truncated input: got {got} pixels, expected {expected}")]
    Truncated { expected: usize, got: usize },
    #[error("no frames given")]
    NoFrames,
    #[error("frame {index} is {got:?}, expected {expected:?}")]
    FrameMismatch {
        index: usize,
        expected: (u32, u32),
        got: (u32, u32),
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
