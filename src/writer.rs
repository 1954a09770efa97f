use std::path::Path;

use anyhow::{Context, Result, anyhow, ensure};
use ffmpeg::{
    Packet, Rational, codec, encoder,
    format::{self, Pixel, context::Output},
    frame,
    software::scaling,
};
use log::debug;

use crate::{
    frame::{CHANNELS, Frame, VideoDetails},
    pipeline::FrameSink,
};

/// MPEG-4 Part 2, the codec behind the XVID/DivX tags. Every player handles
/// it and it fits in every common container.
pub const OUTPUT_CODEC: codec::Id = codec::Id::MPEG4;
const OUTPUT_PIXEL_FORMAT: Pixel = Pixel::YUV420P;

/// Encodes packed BGR frames into a new video file.
///
/// The container is picked from the output path's extension. Any existing
/// file at that path is truncated.
pub struct VideoWriter {
    output: Output,
    encoder: encoder::video::Encoder,
    scaler: scaling::Context,
    staging: frame::Video,
    width: usize,
    height: usize,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    frameno: i64,
}

impl VideoWriter {
    pub fn create<P: AsRef<Path>>(output: P, details: &VideoDetails) -> Result<Self> {
        ffmpeg::init()?;

        let mut output = format::output(&output)?;
        let codec = encoder::find(OUTPUT_CODEC)
            .ok_or_else(|| anyhow!("FFmpeg was built without an {:?} encoder", OUTPUT_CODEC))?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let (width, height) = (details.width as u32, details.height as u32);
        let encoder_time_base = details.frame_rate.invert();
        let mut encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(OUTPUT_PIXEL_FORMAT);
        encoder.set_frame_rate(Some(details.frame_rate));
        encoder.set_time_base(encoder_time_base);
        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder
            .open_as(codec)
            .with_context(|| format!("Failed to open {:?} encoder", OUTPUT_CODEC))?;

        let stream_index = {
            let mut ost = output.add_stream(codec)?;
            ost.set_parameters(&encoder);
            ost.set_time_base(encoder_time_base);
            ost.index()
        };
        output.write_header()?;

        // The muxer is free to pick its own time base in `write_header`.
        let stream_time_base = output
            .stream(stream_index)
            .ok_or(ffmpeg::Error::StreamNotFound)?
            .time_base();
        debug!(
            "encoding {}x{} {:?}, time base {:?} -> {:?}",
            width, height, OUTPUT_CODEC, encoder_time_base, stream_time_base
        );

        let scaler = scaling::Context::get(
            Pixel::BGR24,
            width,
            height,
            OUTPUT_PIXEL_FORMAT,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            output,
            encoder,
            scaler,
            staging: frame::Video::new(Pixel::BGR24, width, height),
            width: details.width,
            height: details.height,
            stream_index,
            encoder_time_base,
            stream_time_base,
            frameno: 0,
        })
    }

    pub fn encode_frame(&mut self, frame: &Frame) -> Result<()> {
        ensure!(
            frame.width() == self.width && frame.height() == self.height,
            "Frame is {}x{} but the output is {}x{}",
            frame.width(),
            frame.height(),
            self.width,
            self.height
        );

        let row_bytes = self.width * CHANNELS;
        let stride = self.staging.stride(0);
        for (dst, src) in self
            .staging
            .data_mut(0)
            .chunks_mut(stride)
            .zip(frame.rows())
        {
            dst[..row_bytes].copy_from_slice(src);
        }

        // A fresh frame each time: the encoder may still hold a reference to
        // the previous one.
        let mut yuv = frame::Video::empty();
        self.scaler.run(&self.staging, &mut yuv)?;
        yuv.set_pts(Some(self.frameno));

        self.encoder
            .send_frame(&yuv)
            .with_context(|| format!("Failed to encode frame {}", self.frameno))?;
        self.frameno += 1;
        self.write_packets()
    }

    fn write_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();
        while packet_ready(self.encoder.receive_packet(&mut packet))
            .with_context(|| format!("Failed to encode frame {}", self.frameno))?
        {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.set_position(-1);
            packet.write_interleaved(&mut self.output)?;
        }
        Ok(())
    }
}

impl FrameSink for VideoWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.encode_frame(frame)
    }

    /// Flushes the encoder and writes the container trailer.
    fn finish(mut self) -> Result<()> {
        self.encoder.send_eof()?;
        self.write_packets()?;
        self.output.write_trailer()?;
        debug!("wrote {} frames", self.frameno);
        Ok(())
    }
}

/// Interprets the result of `receive_packet`: `true` if a packet is ready,
/// `false` if the encoder needs more input or is drained. Anything else is
/// a real encoder failure.
fn packet_ready(received: Result<(), ffmpeg::Error>) -> Result<bool, ffmpeg::Error> {
    match received {
        Ok(()) => Ok(true),
        Err(ffmpeg::Error::Eof) => Ok(false),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(false),
        Err(e) => Err(e),
    }
}
