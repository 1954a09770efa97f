use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ffmpeg::{
    Packet, Rational,
    codec::decoder,
    format::{self, Pixel, context::Input},
    frame, media,
    software::scaling,
};
use log::debug;

use crate::{
    frame::{CHANNELS, Frame, VideoDetails},
    pipeline::FrameSource,
};

/// Container durations are expressed in microseconds.
const CONTAINER_TIME_BASE: f64 = 1_000_000.0;

/// Decodes the best video stream of a file into packed BGR frames.
pub struct VideoReader {
    input_ctx: Input,
    decoder: decoder::Video,
    scaler: Option<Scaler>,
    stream_index: usize,
    video_details: VideoDetails,
    frameno: usize,
    eof_sent: bool,
}

/// Converts whatever the decoder emits into BGR24 at the output size. Rebuilt
/// if the decoded format or size changes mid-stream.
struct Scaler {
    context: scaling::Context,
    source: (Pixel, u32, u32),
}

impl VideoReader {
    pub fn open<P: AsRef<Path>>(input: P) -> Result<Self> {
        ffmpeg::init()?;

        let input_ctx = format::input(&input)?;
        let stream = input_ctx
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| anyhow!("Could not find video stream"))?;
        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let frame_rate = if stream.avg_frame_rate().numerator() > 0 {
            stream.avg_frame_rate()
        } else {
            stream.rate()
        };
        let reported = usize::try_from(stream.frames()).unwrap_or(0);
        let total_frames = if reported > 0 {
            Some(reported)
        } else {
            estimate_frame_count(
                stream.duration(),
                stream.time_base(),
                input_ctx.duration(),
                frame_rate,
            )
        };
        debug!(
            "stream {} codec {:?}, {} frames reported",
            stream.index(),
            decoder.id(),
            reported
        );

        let video_details = VideoDetails {
            width: decoder.width() as usize,
            height: decoder.height() as usize,
            frame_rate,
            total_frames,
        };
        let stream_index = stream.index();

        Ok(Self {
            input_ctx,
            decoder,
            scaler: None,
            stream_index,
            video_details,
            frameno: 0usize,
            eof_sent: false,
        })
    }

    #[must_use]
    pub const fn get_video_details(&self) -> &VideoDetails {
        &self.video_details
    }

    /// Decodes the next frame, or `None` once the decoder is fully drained.
    pub fn get_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = frame::Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    let frame = self
                        .convert(&decoded)
                        .with_context(|| format!("Failed to convert frame {}", self.frameno))?;
                    self.frameno += 1;
                    return Ok(Some(frame));
                }
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to decode frame {}", self.frameno));
                }
            }

            // The decoder wants input but we have none left to give.
            if self.eof_sent {
                return Ok(None);
            }

            if let Some(packet) = self.next_packet()? {
                self.decoder
                    .send_packet(&packet)
                    .with_context(|| format!("Failed to decode frame {}", self.frameno))?;
            } else {
                self.decoder.send_eof()?;
                self.eof_sent = true;
            }
        }
    }

    /// Next packet belonging to our video stream.
    fn next_packet(&mut self) -> Result<Option<Packet>> {
        for item in self.input_ctx.packets() {
            let (stream, packet) = item.context("Failed to demux input")?;
            if stream.index() == self.stream_index {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    fn convert(&mut self, decoded: &frame::Video) -> Result<Frame> {
        let (width, height) = (self.video_details.width, self.video_details.height);
        let source = (decoded.format(), decoded.width(), decoded.height());
        if self.scaler.as_ref().is_none_or(|s| s.source != source) {
            if self.scaler.is_some() {
                debug!(
                    "decoded format changed to {:?} {}x{} at frame {}",
                    source.0, source.1, source.2, self.frameno
                );
            }
            self.scaler = Some(Scaler {
                context: scaling::Context::get(
                    source.0,
                    source.1,
                    source.2,
                    Pixel::BGR24,
                    width as u32,
                    height as u32,
                    scaling::Flags::BILINEAR,
                )?,
                source,
            });
        }
        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| anyhow!("Scaler was not initialized"))?;

        let mut bgr = frame::Video::empty();
        scaler.context.run(decoded, &mut bgr)?;

        let row_bytes = width * CHANNELS;
        let stride = bgr.stride(0);
        let mut packed = Vec::with_capacity(row_bytes * height);
        for row in bgr.data(0).chunks(stride).take(height) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
        Frame::new(width, height, packed)
    }
}

impl FrameSource for VideoReader {
    fn details(&self) -> &VideoDetails {
        self.get_video_details()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.get_frame()
    }
}

/// Guesses a frame count from whichever duration is available, preferring
/// the stream's own. Non-positive durations mean "not reported".
fn estimate_frame_count(
    stream_duration: i64,
    stream_time_base: Rational,
    container_duration: i64,
    frame_rate: Rational,
) -> Option<usize> {
    let fps = f64::from(frame_rate);
    if !(fps.is_finite() && fps > 0.0) {
        return None;
    }

    let seconds = if stream_duration > 0 && stream_time_base.denominator() > 0 {
        stream_duration as f64 * f64::from(stream_time_base)
    } else if container_duration > 0 {
        container_duration as f64 / CONTAINER_TIME_BASE
    } else {
        return None;
    };

    let frames = (seconds * fps).round();
    (frames >= 1.0).then_some(frames as usize)
}
