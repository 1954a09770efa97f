use anyhow::{Result, ensure};
use ffmpeg::Rational;

/// Number of bytes per packed BGR pixel.
pub const CHANNELS: usize = 3;

/// A decoded video frame stored as packed 8-bit BGR.
///
/// Rows are tightly packed: there is no padding between the end of one row
/// and the start of the next, so `data.len() == width * height * 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "Frame dimensions must be nonzero, got {}x{}",
            width,
            height
        );
        ensure!(
            data.len() == width * height * CHANNELS,
            "Frame of {}x{} needs {} bytes of BGR data, got {}",
            width,
            height,
            width * height * CHANNELS,
            data.len()
        );
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Raw packed BGR bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterates over pixels in raster order as `[b, g, r]`.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; CHANNELS]> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Iterates over rows of packed BGR bytes, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(self.width * CHANNELS)
    }
}

/// Contains important video details
#[derive(Debug, Clone, Copy)]
pub struct VideoDetails {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Frame rate of the Video.
    pub frame_rate: Rational,
    /// Number of frames the container claims to hold, if it says anything at
    /// all. Streams routinely deliver fewer or more frames than this.
    pub total_frames: Option<usize>,
}

impl VideoDetails {
    /// Frame rate as frames per second.
    #[must_use]
    pub fn fps(&self) -> f64 {
        f64::from(self.frame_rate)
    }
}
