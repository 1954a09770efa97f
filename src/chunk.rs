use std::time::Duration;

use anyhow::{Result, ensure};

use crate::frame::Frame;

/// A contiguous run of frames that is kept or dropped as a whole.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based position of this chunk in the stream.
    pub index: usize,
    /// Stream index of the first frame in the chunk.
    pub first_frame: usize,
    pub frames: Vec<Frame>,
}

impl Chunk {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Number of frames that make up one chunk of `duration` at `fps`.
pub fn chunk_frame_count(fps: f64, duration: Duration) -> Result<usize> {
    ensure!(
        fps.is_finite() && fps > 0.0,
        "Cannot size chunks for a frame rate of {}",
        fps
    );
    ensure!(!duration.is_zero(), "Chunk duration must be nonzero");

    let frames = (fps * duration.as_secs_f64()).round();
    Ok((frames as usize).max(1))
}

/// Groups a frame stream into chunks of a fixed size.
///
/// A chunk is emitted as soon as it is full, or when the frame counter
/// reaches the total the container announced. Whatever is left when the
/// stream actually ends comes out of [`ChunkAccumulator::finish`].
#[derive(Debug)]
pub struct ChunkAccumulator {
    chunk_frames: usize,
    total_frames: Option<usize>,
    frames_seen: usize,
    chunks_emitted: usize,
    buffer: Vec<Frame>,
}

impl ChunkAccumulator {
    pub fn new(chunk_frames: usize, total_frames: Option<usize>) -> Result<Self> {
        ensure!(chunk_frames > 0, "Chunks must hold at least one frame");
        Ok(Self {
            chunk_frames,
            total_frames,
            frames_seen: 0,
            chunks_emitted: 0,
            buffer: Vec::with_capacity(chunk_frames),
        })
    }

    /// Appends a frame, returning a chunk if this frame completed one.
    pub fn push(&mut self, frame: Frame) -> Option<Chunk> {
        self.buffer.push(frame);
        self.frames_seen += 1;

        let full = self.buffer.len() == self.chunk_frames;
        let last = self.total_frames == Some(self.frames_seen);
        (full || last).then(|| self.flush())
    }

    /// Flushes the trailing partial chunk, if any.
    pub fn finish(&mut self) -> Option<Chunk> {
        (!self.buffer.is_empty()).then(|| self.flush())
    }

    #[must_use]
    pub const fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    #[must_use]
    pub const fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    fn flush(&mut self) -> Chunk {
        let frames = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk_frames));
        let chunk = Chunk {
            index: self.chunks_emitted,
            first_frame: self.frames_seen - frames.len(),
            frames,
        };
        self.chunks_emitted += 1;
        chunk
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::frame::test_frames::solid;

    fn tagged(i: usize) -> Frame {
        solid(1, 1, [i as u8, (i >> 8) as u8, 0])
    }

    fn drain(acc: &mut ChunkAccumulator, frames: usize) -> Vec<Chunk> {
        let mut chunks: Vec<_> = (0..frames).filter_map(|i| acc.push(tagged(i))).collect();
        chunks.extend(acc.finish());
        chunks
    }

    #[test]
    fn chunk_size_rounds_fps_times_duration() {
        let ten = Duration::from_secs(10);
        assert_eq!(chunk_frame_count(25.0, ten).unwrap(), 250);
        assert_eq!(chunk_frame_count(29.97, ten).unwrap(), 300);
        assert_eq!(chunk_frame_count(23.976, ten).unwrap(), 240);
        assert_eq!(chunk_frame_count(0.01, Duration::from_secs(1)).unwrap(), 1);
    }

    #[test]
    fn chunk_size_rejects_degenerate_rates() {
        let ten = Duration::from_secs(10);
        assert!(chunk_frame_count(0.0, ten).is_err());
        assert!(chunk_frame_count(-25.0, ten).is_err());
        assert!(chunk_frame_count(f64::NAN, ten).is_err());
        assert!(chunk_frame_count(25.0, Duration::ZERO).is_err());
    }

    #[test]
    fn splits_300_frames_at_25_fps_into_250_and_50() {
        let mut acc = ChunkAccumulator::new(250, Some(300)).unwrap();
        let chunks = drain(&mut acc, 300);

        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].index, chunks[0].first_frame, chunks[0].len()), (0, 0, 250));
        assert_eq!((chunks[1].index, chunks[1].first_frame, chunks[1].len()), (1, 250, 50));
    }

    #[test]
    fn flushes_on_announced_total() {
        let mut acc = ChunkAccumulator::new(4, Some(6)).unwrap();
        assert!((0..5).all(|i| acc.push(tagged(i)).is_none() || i == 3));
        let last = acc.push(tagged(5)).unwrap();
        assert_eq!(last.len(), 2);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn flushes_leftovers_when_stream_ends_early() {
        // The container promised 10 frames but only 6 arrive.
        let mut acc = ChunkAccumulator::new(4, Some(10)).unwrap();
        let chunks = drain(&mut acc, 6);
        assert_eq!(chunks.iter().map(Chunk::len).collect::<Vec<_>>(), vec![4, 2]);
    }

    #[test]
    fn overlong_stream_keeps_chunking_past_total() {
        let mut acc = ChunkAccumulator::new(4, Some(5)).unwrap();
        let chunks = drain(&mut acc, 11);
        assert_eq!(chunks.iter().map(Chunk::len).collect::<Vec<_>>(), vec![4, 1, 4, 2]);
    }

    #[test]
    fn zero_sized_chunks_are_rejected() {
        assert!(ChunkAccumulator::new(0, Some(10)).is_err());
        assert!(ChunkAccumulator::new(0, None).is_err());
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut acc = ChunkAccumulator::new(4, None).unwrap();
        assert!(acc.finish().is_none());
        assert_eq!(acc.frames_seen(), 0);
    }

    #[quickcheck]
    fn chunking_partitions_stream(total: u16, chunk_frames: u8, announce_total: bool) -> TestResult {
        if chunk_frames == 0 {
            return TestResult::discard();
        }
        let (total, chunk_frames) = (usize::from(total % 2000), usize::from(chunk_frames));
        let mut acc = ChunkAccumulator::new(chunk_frames, announce_total.then_some(total)).unwrap();
        let chunks = drain(&mut acc, total);

        let full = chunks.iter().filter(|c| c.len() == chunk_frames).count();
        let expected_chunks = total / chunk_frames + usize::from(total % chunk_frames != 0);
        let contiguous = chunks
            .iter()
            .flat_map(|c| (c.first_frame..).take(c.len()))
            .eq(0..total);

        TestResult::from_bool(
            full == total / chunk_frames
                && chunks.len() == expected_chunks
                && chunks.iter().enumerate().all(|(i, c)| c.index == i && !c.is_empty())
                && contiguous,
        )
    }
}
