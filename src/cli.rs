use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::{config::FilterConfig, pipeline};

/// Keeps the parts of a video that show steel parts in focus, in
/// ten-second chunks, and drops the rest.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// The video to filter.
    #[clap(value_parser)]
    pub input: PathBuf,
    /// The path to write the kept chunks to. Overwritten if it exists.
    #[clap(value_parser)]
    pub output: PathBuf,
}

pub fn run(args: &Args) -> Result<()> {
    let summary = pipeline::run(&args.input, &args.output, &FilterConfig::default())?;

    info!(
        "Kept {} of {} chunks, {} of {} frames",
        summary.chunks_kept, summary.chunks, summary.frames_written, summary.frames_read
    );
    eprintln!(
        "Done, wrote {} frames to {}",
        summary.frames_written,
        args.output.to_string_lossy()
    );

    Ok(())
}
