/*!
    Track parameter types.
*/

use crate::{ChannelLayout, CodecId, Rational};

/**
    Codec parameters of a video stream, as discovered by a demuxer.

    These carry everything an output container needs to bind a
    passthrough track: no decoder is ever opened for the video path.
*/
#[derive(Clone, Debug)]
pub struct VideoParams {
    /// Codec used.
    pub codec_id: CodecId,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate (may be unavailable for elementary streams).
    pub frame_rate: Option<Rational>,
    /// Time base the source stream stamps its packets in.
    pub time_base: Rational,
    /// Codec extradata (SPS/PPS for H.264, etc.). Required by formats
    /// that store decoder configuration out of band, like MP4.
    pub extradata: Option<Vec<u8>>,
    /// Bitrate in bits per second, if known.
    pub bit_rate: Option<u64>,
    /// Codec profile, if known.
    pub profile: Option<i32>,
    /// Codec level, if known.
    pub level: Option<i32>,
}

/**
    Codec parameters of an audio track.

    For a synthetic track these come from a briefly-opened encoder, so
    the extradata and frame size describe what a real encoder of that
    configuration would produce.
*/
#[derive(Clone, Debug)]
pub struct AudioParams {
    /// Codec used.
    pub codec_id: CodecId,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Time base for the track; `1/sample_rate` by construction.
    pub time_base: Rational,
    /// Codec extradata (AudioSpecificConfig for AAC, etc.).
    pub extradata: Option<Vec<u8>>,
    /// Target bitrate in bits per second, if configured.
    pub bit_rate: Option<u64>,
    /// Samples per coded frame (1024 for AAC).
    pub frame_size: u32,
}

impl AudioParams {
    /**
        Duration of one coded frame, in ticks of the track time base.
    */
    pub fn frame_duration(&self) -> i64 {
        self.frame_size as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_track_time_base_follows_sample_rate() {
        let params = AudioParams {
            codec_id: CodecId::Aac,
            sample_rate: 44100,
            channels: ChannelLayout::Stereo,
            time_base: Rational::new(1, 44100),
            extradata: None,
            bit_rate: Some(64_000),
            frame_size: 1024,
        };
        assert_eq!(params.time_base, Rational::new(1, 44100));
        assert_eq!(params.frame_duration(), 1024);
    }
}
