use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use remux_encode::{AudioEncoder, AudioEncoderConfig, ChannelLayout};
use remux_sink::{ContainerFormat, OutputContainer};

/**
    Fabricate an audio-only container file by encoding silence.

    Useful when a fixture needs a real, decodable audio track of a known
    length and shape but no actual audio content exists.
*/
#[derive(Parser, Debug)]
#[command(name = "faketrack")]
#[command(about = "Generate a standalone container holding silent AAC audio")]
struct Args {
    /// Sample rate in Hz.
    #[arg(short = 'f', long)]
    frequency: u32,

    /// Channel count.
    #[arg(short, long)]
    channels: u16,

    /// Length of the generated track in seconds.
    #[arg(short = 't', long)]
    seconds: u32,

    /// Output file path; the container format is guessed from the
    /// extension.
    #[arg(short, long)]
    output: PathBuf,

    /// Target bitrate in bits per second.
    #[arg(long, default_value = "96000")]
    bit_rate: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut sink = OutputContainer::create(&args.output, &ContainerFormat::Guess)
        .context("creating output container")?;

    let mut config =
        AudioEncoderConfig::aac(args.frequency, ChannelLayout::from_count(args.channels))
            .with_bit_rate(args.bit_rate);
    if sink.requires_global_header() {
        config = config.with_global_header();
    }

    let mut encoder = AudioEncoder::new(config).context("opening AAC encoder")?;
    sink.add_audio_track(&encoder.audio_params())
        .context("binding audio track")?;
    sink.write_header().context("writing container header")?;

    let total_samples = args.frequency as u64 * args.seconds as u64;
    let frames = total_samples / encoder.frame_size() as u64;

    let mut written = 0u64;
    for _ in 0..frames {
        for packet in encoder.encode_silence().context("encoding silence")? {
            sink.write(&packet).context("muxing packet")?;
            written += 1;
        }
    }
    for packet in encoder.flush().context("flushing encoder")? {
        sink.write(&packet).context("muxing packet")?;
        written += 1;
    }

    sink.finish().context("finalizing container")?;

    println!(
        "Wrote {written} packets of silence to {}",
        args.output.display()
    );
    Ok(())
}
