use std::fmt;

use crate::{chunk::Chunk, config::FilterConfig, frame::Frame, metrics::FrameMetrics};

/// What the classifier found in one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    /// At least one frame passed the steel heuristic.
    pub has_steel: bool,
    /// Frames that were blurry, blacked out, or both.
    pub bad_frames: usize,
    pub frames: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    NoSteel,
    PoorQuality,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Verdict::Keep => "kept",
            Verdict::NoSteel => "discarded, no steel parts",
            Verdict::PoorQuality => "discarded, too many blurry or dark frames",
        })
    }
}

impl ChunkReport {
    /// More than half the frames are bad. Exactly half still passes.
    #[must_use]
    pub const fn fails_quality(&self) -> bool {
        self.bad_frames * 2 > self.frames
    }

    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        if self.fails_quality() {
            Verdict::PoorQuality
        } else if !self.has_steel {
            Verdict::NoSteel
        } else {
            Verdict::Keep
        }
    }

    #[must_use]
    pub const fn keep(&self) -> bool {
        matches!(self.verdict(), Verdict::Keep)
    }
}

/// Scores every frame of a chunk.
#[must_use]
pub fn classify(chunk: &Chunk, config: &FilterConfig) -> ChunkReport {
    classify_frames(&chunk.frames, config)
}

#[must_use]
pub fn classify_frames(frames: &[Frame], config: &FilterConfig) -> ChunkReport {
    let mut has_steel = false;
    let mut bad_frames = 0;
    for frame in frames {
        let metrics = FrameMetrics::measure(frame, &config.steel);
        has_steel |= metrics.steel_present;
        if metrics.is_bad(config.blur_threshold, config.blackout_threshold) {
            bad_frames += 1;
        }
    }

    ChunkReport {
        has_steel,
        bad_frames,
        frames: frames.len(),
    }
}
