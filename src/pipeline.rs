use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::{
    chunk::{Chunk, ChunkAccumulator, chunk_frame_count},
    classify::classify,
    config::FilterConfig,
    frame::{Frame, VideoDetails},
    reader::VideoReader,
    writer::VideoWriter,
};

/// Anything that yields decoded frames in stream order.
pub trait FrameSource {
    fn details(&self) -> &VideoDetails;

    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Anything that accepts frames in output order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flushes anything buffered and closes the output. Called exactly once,
    /// also after a failed run, so that what was written stays usable.
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

/// Totals for one filtering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks: usize,
    pub chunks_kept: usize,
    pub frames_read: usize,
    pub frames_written: usize,
}

/// Filters `input` into `output` with the given configuration.
///
/// The input is opened before the output is created, so a missing or
/// unreadable input never leaves an empty output file behind.
pub fn run(input: &Path, output: &Path, config: &FilterConfig) -> Result<RunSummary> {
    let mut reader = VideoReader::open(input)
        .with_context(|| format!("Could not open input video {}", input.display()))?;
    let details = *reader.get_video_details();

    info!("Video opened: {}", input.display());
    info!(
        "Resolution: {}x{}, FPS: {:.3}, Total frames: {}",
        details.width,
        details.height,
        details.fps(),
        details
            .total_frames
            .map_or_else(|| "unknown".to_owned(), |n| n.to_string())
    );

    let writer = VideoWriter::create(output, &details)
        .with_context(|| format!("Could not create output video {}", output.display()))?;

    let progress = progress_bar(details.total_frames)?;
    let result = filter_into(&mut reader, writer, config, &progress);
    progress.finish_and_clear();

    result.with_context(|| format!("Failed to filter into {}", output.display()))
}

/// Runs [`filter_video`] and then finishes `sink`, whether or not the run
/// succeeded. A run error takes precedence over a finish error.
pub fn filter_into<S: FrameSource, W: FrameSink>(
    source: &mut S,
    mut sink: W,
    config: &FilterConfig,
    progress: &ProgressBar,
) -> Result<RunSummary> {
    let result = filter_video(source, &mut sink, config, progress);
    let finished = sink.finish().context("Could not finalize output");
    let summary = result?;
    finished?;
    Ok(summary)
}

/// Drives the read, chunk, classify, write loop.
///
/// Kept chunks go to `sink` as soon as they are classified, so at most one
/// chunk of frames is held in memory.
pub fn filter_video<S: FrameSource, W: FrameSink>(
    source: &mut S,
    sink: &mut W,
    config: &FilterConfig,
    progress: &ProgressBar,
) -> Result<RunSummary> {
    let details = *source.details();
    let chunk_frames = chunk_frame_count(details.fps(), config.chunk_duration)?;
    let mut accumulator = ChunkAccumulator::new(chunk_frames, details.total_frames)?;
    let mut summary = RunSummary::default();

    while let Some(frame) = source
        .next_frame()
        .with_context(|| format!("Failed to read frame {}", accumulator.frames_seen()))?
    {
        progress.inc(1);
        if let Some(chunk) = accumulator.push(frame) {
            process_chunk(chunk, sink, config, progress, &mut summary)?;
        }
    }
    if let Some(chunk) = accumulator.finish() {
        process_chunk(chunk, sink, config, progress, &mut summary)?;
    }

    summary.frames_read = accumulator.frames_seen();
    Ok(summary)
}

fn process_chunk<W: FrameSink>(
    chunk: Chunk,
    sink: &mut W,
    config: &FilterConfig,
    progress: &ProgressBar,
    summary: &mut RunSummary,
) -> Result<()> {
    let report = classify(&chunk, config);
    summary.chunks += 1;

    let last_frame = chunk.first_frame + chunk.len() - 1;
    progress.suspend(|| {
        info!(
            "Chunk {} (frames {}-{}) {}: {} frames, {} bad",
            chunk.index,
            chunk.first_frame,
            last_frame,
            report.verdict(),
            report.frames,
            report.bad_frames
        );
    });
    if !report.keep() {
        return Ok(());
    }

    for frame in &chunk.frames {
        sink.write_frame(frame).with_context(|| {
            format!(
                "Failed to write frame {} of chunk {}",
                summary.frames_written, chunk.index
            )
        })?;
        summary.frames_written += 1;
    }
    summary.chunks_kept += 1;
    Ok(())
}

fn progress_bar(total_frames: Option<usize>) -> Result<ProgressBar> {
    Ok(match total_frames {
        Some(total) => ProgressBar::new(total as u64).with_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] [{wide_bar}] {pos}/{len} frames ({eta})",
            )?
            .progress_chars("#>-"),
        ),
        None => ProgressBar::new_spinner().with_style(ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {pos} frames",
        )?),
    })
}
