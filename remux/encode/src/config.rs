/*!
    Encoder configuration.
*/

use remux_types::{ChannelLayout, CodecId};

/**
    Configuration for audio encoding.
*/
#[derive(Clone, Debug)]
pub struct AudioEncoderConfig {
    /// Codec to use.
    pub codec: CodecId,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: ChannelLayout,
    /// Target bitrate in bits per second (None = codec default).
    pub bit_rate: Option<u64>,
    /// Ask the encoder for out-of-band decoder configuration. Required
    /// by container formats that store global headers, like MP4.
    pub global_header: bool,
}

impl AudioEncoderConfig {
    /**
        Create a new audio encoder configuration.
    */
    pub fn new(codec: CodecId, sample_rate: u32, channels: ChannelLayout) -> Self {
        Self {
            codec,
            sample_rate,
            channels,
            bit_rate: None,
            global_header: false,
        }
    }

    /**
        Create configuration for AAC encoding.
    */
    pub fn aac(sample_rate: u32, channels: ChannelLayout) -> Self {
        Self::new(CodecId::Aac, sample_rate, channels)
    }

    /**
        Set the target bitrate in bits per second.
    */
    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.bit_rate = Some(bit_rate);
        self
    }

    /**
        Request out-of-band decoder configuration (global header).
    */
    pub fn with_global_header(mut self) -> Self {
        self.global_header = true;
        self
    }
}
