use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use remux_engine::{ContainerFormat, PipelineConfig};

/**
    Remux a video-only FLV stream into a playable container by pairing
    every video packet with a synthetic audio packet.
*/
#[derive(Parser, Debug)]
#[command(name = "vidremux")]
#[command(about = "Remux a video-only FLV stream into MP4 with a placeholder audio track")]
struct Args {
    /// Input FLV file.
    input: PathBuf,

    /// Output container file. The format is guessed from the extension
    /// unless --format is given.
    output: PathBuf,

    /// Force an output container format by FFmpeg short name.
    #[arg(long)]
    format: Option<String>,

    /// Synthetic audio sample rate in Hz.
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Synthetic audio channel count.
    #[arg(long, default_value = "2")]
    channels: u16,

    /// Synthetic audio bitrate in bits per second.
    #[arg(long, default_value = "64000")]
    bit_rate: u64,

    /// Video frame rate used only when the source carries no usable
    /// time base.
    #[arg(long, default_value = "25")]
    frame_rate: u32,

    /// Synthetic audio offset after each video packet, in input ticks.
    #[arg(long, default_value = "20")]
    audio_offset: i64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::new(args.input, args.output);
    config.audio_sample_rate = args.sample_rate;
    config.audio_channels = args.channels;
    config.audio_bit_rate = args.bit_rate;
    config.fallback_frame_rate = args.frame_rate;
    config.audio_pts_offset = args.audio_offset;
    if let Some(name) = args.format {
        config.container = ContainerFormat::Named(name);
    }

    let stats = remux_engine::run(&config).context("remux failed")?;

    println!(
        "Wrote {} video and {} audio packets to {}",
        stats.video_packets,
        stats.audio_packets,
        config.output.display()
    );
    if stats.dropped_writes > 0 {
        eprintln!(
            "Warning: {} packets could not be muxed and were dropped",
            stats.dropped_writes
        );
    }

    Ok(())
}
