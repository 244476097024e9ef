/*!
    Codec identifiers and channel layouts.
*/

/**
    Codec identifiers.

    This is the subset of codecs the remux pipeline can carry: video is
    passed through unchanged, audio is limited to codecs we can open an
    encoder for.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    // Video
    H264,
    H265,
    Vp8,
    Vp9,
    Av1,
    // Audio
    Aac,
    Mp3,
    Opus,
    /// Anything the pipeline has no name for. Passthrough still works as
    /// long as the container accepts the raw codec tag.
    Unknown,
}

impl CodecId {
    /**
        Returns true if this is a video codec.
    */
    pub const fn is_video(self) -> bool {
        matches!(
            self,
            Self::H264 | Self::H265 | Self::Vp8 | Self::Vp9 | Self::Av1
        )
    }

    /**
        Returns true if this is an audio codec.
    */
    pub const fn is_audio(self) -> bool {
        matches!(self, Self::Aac | Self::Mp3 | Self::Opus)
    }
}

/**
    Audio channel layout.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChannelLayout {
    /// Single channel.
    Mono,
    /// Left and right channels.
    Stereo,
}

impl ChannelLayout {
    /**
        Returns the number of channels.
    */
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /**
        Create a channel layout from a channel count.

        Falls back to stereo for anything above one channel.
    */
    pub const fn from_count(count: u16) -> Self {
        match count {
            1 => Self::Mono,
            _ => Self::Stereo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_kind() {
        assert!(CodecId::H264.is_video());
        assert!(!CodecId::H264.is_audio());
        assert!(CodecId::Aac.is_audio());
        assert!(!CodecId::Unknown.is_video());
    }

    #[test]
    fn channel_layout_channels() {
        assert_eq!(ChannelLayout::Mono.channels(), 1);
        assert_eq!(ChannelLayout::Stereo.channels(), 2);
        assert_eq!(ChannelLayout::from_count(1), ChannelLayout::Mono);
        assert_eq!(ChannelLayout::from_count(2), ChannelLayout::Stereo);
        assert_eq!(ChannelLayout::from_count(6), ChannelLayout::Stereo);
    }
}
