/*!
    Pipeline lifecycle: opening order, track binding, and teardown.
*/

use std::path::PathBuf;

use tracing::debug;

use remux_encode::{AudioEncoder, AudioEncoderConfig};
use remux_sink::{ContainerFormat, OutputContainer};
use remux_source::{InputFormat, InputSource};
use remux_types::{
    ChannelLayout, DemuxedPacket, Packet, Rational, RemuxError, RemuxResult,
};

use crate::interleave::{Interleaver, PacketSink, PacketSource, RemuxStats};
use crate::synth::FillerAudio;

/**
    Everything a remux run needs to know, assembled by the caller.
*/
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Input file, demuxed as FLV framing.
    pub input: PathBuf,
    /// Output container file.
    pub output: PathBuf,
    /// Output container format; guessed from the extension by default.
    pub container: ContainerFormat,
    /// Synthetic audio sample rate in Hz.
    pub audio_sample_rate: u32,
    /// Synthetic audio channel count.
    pub audio_channels: u16,
    /// Synthetic audio target bitrate in bits per second.
    pub audio_bit_rate: u64,
    /// Frame rate used to derive the output video time base when the
    /// source stream does not carry a usable one.
    pub fallback_frame_rate: u32,
    /// Synthetic audio presentation offset, in input video ticks.
    pub audio_pts_offset: i64,
}

impl PipelineConfig {
    /**
        Create a configuration with the conventional defaults: 44.1kHz
        stereo AAC at 64 kbit/s, 25fps fallback.
    */
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            container: ContainerFormat::Guess,
            audio_sample_rate: 44100,
            audio_channels: 2,
            audio_bit_rate: 64_000,
            fallback_frame_rate: 25,
            audio_pts_offset: FillerAudio::DEFAULT_PTS_OFFSET,
        }
    }
}

impl PacketSource for InputSource {
    fn video_stream_index(&self) -> usize {
        InputSource::video_stream_index(self)
    }

    fn read_packet(&mut self) -> RemuxResult<Option<DemuxedPacket>> {
        InputSource::read_packet(self)
    }
}

impl PacketSink for OutputContainer {
    fn write_header(&mut self) -> RemuxResult<()> {
        OutputContainer::write_header(self)
    }

    fn write(&mut self, packet: &Packet) -> RemuxResult<()> {
        OutputContainer::write(self, packet)
    }

    fn finish(self) -> RemuxResult<()> {
        OutputContainer::finish(self)
    }
}

/**
    Run the whole pipeline: open the input, map the output tracks,
    stream until exhaustion, finalize.

    Opening order matters: the output depends on the input's video
    parameters, so the input is bound first. Both the input and the
    (possibly partially constructed) output release their resources on
    every exit path, success or failure.
*/
pub fn run(config: &PipelineConfig) -> RemuxResult<RemuxStats> {
    let input = InputSource::open_file(&config.input, &InputFormat::Flv)?;

    let mut video = input.video_params().clone();
    if !video.time_base.is_valid() {
        video.time_base = Rational::new(1, config.fallback_frame_rate.max(1) as i32);
    }
    debug!(
        codec = ?video.codec_id,
        width = video.width,
        height = video.height,
        time_base = %video.time_base,
        "video stream bound"
    );

    let mut sink = OutputContainer::create(&config.output, &config.container)?;

    let mut encoder_config = AudioEncoderConfig::aac(
        config.audio_sample_rate,
        ChannelLayout::from_count(config.audio_channels),
    )
    .with_bit_rate(config.audio_bit_rate);
    if sink.requires_global_header() {
        encoder_config = encoder_config.with_global_header();
    }

    // The encoder is only opened to negotiate what the synthetic track
    // must advertise (extradata, frame size); it never encodes here.
    let audio = AudioEncoder::new(encoder_config)?.audio_params();

    sink.add_video_track(&video)?;
    sink.add_audio_track(&audio)?;
    if sink.video_track().is_none() || sink.audio_track().is_none() {
        return Err(RemuxError::NoVideoOrAudioTrack);
    }

    let synth = FillerAudio::new(&audio).with_pts_offset(config.audio_pts_offset);

    Interleaver::new(input, sink, synth).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_conventional_audio_shape() {
        let config = PipelineConfig::new("in.flv".into(), "out.mp4".into());
        assert_eq!(config.audio_sample_rate, 44100);
        assert_eq!(config.audio_channels, 2);
        assert_eq!(config.audio_bit_rate, 64_000);
        assert_eq!(config.container, ContainerFormat::Guess);
    }
}
