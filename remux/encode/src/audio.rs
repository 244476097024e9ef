/*!
    Audio encoder implementation.
*/

use ffmpeg_next::{
    ChannelLayout as FFmpegChannelLayout,
    codec::{self, Id as CodecIdFFmpeg, encoder::Audio as AudioEncoderFFmpeg},
    ffi,
    util::frame::audio::Audio as AudioFrameFFmpeg,
};

use remux_types::{
    AudioParams, ChannelLayout, CodecId, MediaDuration, Packet, Pts, Rational, RemuxError,
    RemuxResult, StreamKind,
};

use crate::config::AudioEncoderConfig;

/**
    Audio encoder.

    Opened from an [`AudioEncoderConfig`]; exposes the negotiated track
    parameters and encodes frames of silence.
*/
pub struct AudioEncoder {
    encoder: AudioEncoderFFmpeg,
    config: AudioEncoderConfig,
    time_base: Rational,
    frame_size: u32,
    next_pts: i64,
}

impl AudioEncoder {
    /**
        Find and open an encoder for the given configuration.

        Fails with [`RemuxError::EncoderUnavailable`] when the runtime's
        FFmpeg build carries no encoder for the codec, or when the
        encoder rejects the configuration.
    */
    pub fn new(config: AudioEncoderConfig) -> RemuxResult<Self> {
        ffmpeg_next::init().map_err(|e| RemuxError::EncoderUnavailable(e.to_string()))?;

        let codec_id = codec_id_to_ffmpeg(config.codec)?;
        let codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            RemuxError::EncoderUnavailable(format!("{:?} (codec not in this build)", config.codec))
        })?;

        let encoder_ctx = codec::context::Context::new_with_codec(codec);
        let mut encoder = encoder_ctx
            .encoder()
            .audio()
            .map_err(|e| RemuxError::EncoderUnavailable(e.to_string()))?;

        encoder.set_format(sample_format_for(config.codec));
        encoder.set_rate(config.sample_rate as i32);
        encoder.set_channel_layout(channel_layout_to_ffmpeg(config.channels));

        // 1/sample_rate is the standard audio time base.
        let time_base = ffmpeg_next::Rational::new(1, config.sample_rate as i32);
        encoder.set_time_base(time_base);

        if let Some(bit_rate) = config.bit_rate {
            encoder.set_bit_rate(bit_rate as usize);
        }

        if config.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open()
            .map_err(|e| RemuxError::EncoderUnavailable(format!("failed to open: {e}")))?;

        let frame_size = match encoder.frame_size() as i64 {
            n if n > 0 => n as u32,
            // Codecs with no fixed frame size; one AAC-frame worth of
            // samples keeps packet cadence predictable.
            _ => 1024,
        };

        Ok(Self {
            encoder,
            time_base: Rational::new(1, config.sample_rate as i32),
            frame_size,
            next_pts: 0,
            config,
        })
    }

    /**
        Time base of the packets this encoder produces.
    */
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /**
        Samples per coded frame.
    */
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /**
        The negotiated track parameters, for binding an output track.
    */
    pub fn audio_params(&self) -> AudioParams {
        // SAFETY: reading from the opened encoder context FFmpeg owns.
        let (extradata, bit_rate) = unsafe {
            let ctx_ptr = self.encoder.as_ptr();
            let extradata = if (*ctx_ptr).extradata_size > 0 && !(*ctx_ptr).extradata.is_null() {
                let slice = std::slice::from_raw_parts(
                    (*ctx_ptr).extradata,
                    (*ctx_ptr).extradata_size as usize,
                );
                Some(slice.to_vec())
            } else {
                None
            };
            let bit_rate = if (*ctx_ptr).bit_rate > 0 {
                Some((*ctx_ptr).bit_rate as u64)
            } else {
                self.config.bit_rate
            };
            (extradata, bit_rate)
        };

        AudioParams {
            codec_id: self.config.codec,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            time_base: self.time_base,
            extradata,
            bit_rate,
            frame_size: self.frame_size,
        }
    }

    /**
        Encode one frame of silence.

        May return zero, one, or multiple packets depending on encoder
        buffering; PTS advances by one frame of samples per call.
    */
    pub fn encode_silence(&mut self) -> RemuxResult<Vec<Packet>> {
        let mut frame = AudioFrameFFmpeg::new(
            self.encoder.format(),
            self.frame_size as usize,
            self.encoder.channel_layout(),
        );
        frame.set_rate(self.config.sample_rate);

        // Freshly allocated frame buffers are not guaranteed to be
        // zeroed; silence means every plane is.
        for plane in 0..frame.planes() {
            frame.data_mut(plane).fill(0);
        }

        frame.set_pts(Some(self.next_pts));
        self.next_pts += self.frame_size as i64;

        self.encoder
            .send_frame(&frame)
            .map_err(|e| RemuxError::Encode(e.to_string()))?;

        self.receive_packets()
    }

    /**
        Flush the encoder to get any remaining buffered packets.

        Call this once, after the last frame.
    */
    pub fn flush(&mut self) -> RemuxResult<Vec<Packet>> {
        self.encoder
            .send_eof()
            .map_err(|e| RemuxError::Encode(e.to_string()))?;

        self.receive_packets()
    }

    fn receive_packets(&mut self) -> RemuxResult<Vec<Packet>> {
        let mut packets = Vec::new();
        let mut encoded = ffmpeg_next::Packet::empty();

        loop {
            match self.encoder.receive_packet(&mut encoded) {
                Ok(()) => {
                    let data = encoded.data().map(|d| d.to_vec()).unwrap_or_default();
                    packets.push(Packet::new(
                        data,
                        encoded.pts().map(Pts),
                        encoded.dts().map(Pts),
                        MediaDuration(encoded.duration()),
                        self.time_base,
                        encoded.is_key(),
                        StreamKind::Audio,
                    ));
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::AVERROR(ffi::EAGAIN) => {
                    break;
                }
                Err(ffmpeg_next::Error::Eof) => {
                    break;
                }
                Err(e) => {
                    return Err(RemuxError::Encode(e.to_string()));
                }
            }
        }

        Ok(packets)
    }
}

fn codec_id_to_ffmpeg(codec: CodecId) -> RemuxResult<CodecIdFFmpeg> {
    match codec {
        CodecId::Aac => Ok(CodecIdFFmpeg::AAC),
        CodecId::Mp3 => Ok(CodecIdFFmpeg::MP3),
        CodecId::Opus => Ok(CodecIdFFmpeg::OPUS),
        _ => Err(RemuxError::EncoderUnavailable(format!(
            "{codec:?} is not an encodable audio codec"
        ))),
    }
}

/// The sample format each supported encoder expects as input.
fn sample_format_for(codec: CodecId) -> ffmpeg_next::format::Sample {
    use ffmpeg_next::format::Sample;
    use ffmpeg_next::format::sample::Type;

    match codec {
        // FFmpeg's native AAC encoder only takes planar float.
        CodecId::Aac => Sample::F32(Type::Planar),
        _ => Sample::F32(Type::Packed),
    }
}

fn channel_layout_to_ffmpeg(layout: ChannelLayout) -> FFmpegChannelLayout {
    match layout {
        ChannelLayout::Mono => FFmpegChannelLayout::MONO,
        ChannelLayout::Stereo => FFmpegChannelLayout::STEREO,
    }
}

impl std::fmt::Debug for AudioEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEncoder")
            .field("codec", &self.config.codec)
            .field("sample_rate", &self.config.sample_rate)
            .field("frame_size", &self.frame_size)
            .finish_non_exhaustive()
    }
}
