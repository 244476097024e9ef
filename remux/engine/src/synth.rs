/*!
    Synthetic audio packet generation.
*/

use remux_types::{AudioParams, MediaDuration, Packet, Pts, Rational, StreamKind, rescale_dur};

/**
    Produces one synthetic packet per call, keyed to the video packet
    that drove it.

    The sequence has no end condition of its own — it keeps pace with
    however many video packets the loop reads. Implementations other
    than [`FillerAudio`] exist mainly so tests can substitute
    deterministic generators.
*/
pub trait SyntheticSource {
    /**
        Produce the synthetic packet paired with `video`.
    */
    fn next_packet(&mut self, video: &Packet) -> Packet;
}

/**
    The default synthetic audio source: a fixed-size filler payload
    timestamped a fixed offset after the paired video packet.

    Timestamps are expressed in the video packet's own time base — the
    muxer rescales them into the audio track's — and the offset is kept
    non-negative so audio never precedes the video packet that
    triggered it. Duration is one codec frame of samples converted from
    the audio clock into the same time base.
*/
#[derive(Clone, Debug)]
pub struct FillerAudio {
    payload: Vec<u8>,
    pts_offset: i64,
    frame_size: u32,
    sample_rate: u32,
}

impl FillerAudio {
    /// Filler payload size, in bytes.
    pub const DEFAULT_PAYLOAD_LEN: usize = 100;
    /// Presentation offset after the paired video packet, in ticks of
    /// the video time base.
    pub const DEFAULT_PTS_OFFSET: i64 = 20;

    /**
        Create a filler source for an audio track with the given
        negotiated parameters.
    */
    pub fn new(params: &AudioParams) -> Self {
        Self {
            payload: vec![0; Self::DEFAULT_PAYLOAD_LEN],
            pts_offset: Self::DEFAULT_PTS_OFFSET,
            frame_size: params.frame_size,
            sample_rate: params.sample_rate,
        }
    }

    /**
        Set the presentation offset. Negative offsets are clamped to
        zero; synthetic audio may never lead its video packet.
    */
    pub fn with_pts_offset(mut self, offset: i64) -> Self {
        self.pts_offset = offset.max(0);
        self
    }

    /**
        Set the filler payload size in bytes.
    */
    pub fn with_payload_len(mut self, len: usize) -> Self {
        self.payload = vec![0; len];
        self
    }
}

impl SyntheticSource for FillerAudio {
    fn next_packet(&mut self, video: &Packet) -> Packet {
        let offset = self.pts_offset;
        let pts = video.pts.map(|Pts(p)| Pts(p.saturating_add(offset)));
        let dts = video.dts.map(|Pts(d)| Pts(d.saturating_add(offset)));

        let duration = rescale_dur(
            self.frame_size as i64,
            Rational::new(1, self.sample_rate as i32),
            video.time_base,
        );

        Packet::new(
            self.payload.clone(),
            pts,
            dts,
            MediaDuration(duration),
            video.time_base,
            true,
            StreamKind::Audio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remux_types::{ChannelLayout, CodecId};

    fn aac_params() -> AudioParams {
        AudioParams {
            codec_id: CodecId::Aac,
            sample_rate: 44100,
            channels: ChannelLayout::Stereo,
            time_base: Rational::new(1, 44100),
            extradata: None,
            bit_rate: Some(64_000),
            frame_size: 1024,
        }
    }

    fn video_packet(pts: i64) -> Packet {
        Packet::new(
            vec![1, 2, 3],
            Some(Pts(pts)),
            Some(Pts(pts)),
            MediaDuration(40),
            Rational::new(1, 1000),
            true,
            StreamKind::Video,
        )
    }

    #[test]
    fn derives_timestamps_from_video() {
        let mut synth = FillerAudio::new(&aac_params());
        let audio = synth.next_packet(&video_packet(500));
        assert_eq!(audio.pts, Some(Pts(520)));
        assert_eq!(audio.dts, Some(Pts(520)));
        assert_eq!(audio.time_base, Rational::new(1, 1000));
        assert_eq!(audio.kind, StreamKind::Audio);
        assert_eq!(audio.size(), FillerAudio::DEFAULT_PAYLOAD_LEN);
    }

    #[test]
    fn audio_never_precedes_video() {
        let mut synth = FillerAudio::new(&aac_params()).with_pts_offset(-100);
        for pts in [0, 40, 80, 3000] {
            let video = video_packet(pts);
            let audio = synth.next_packet(&video);
            assert!(audio.pts >= video.pts);
        }
    }

    #[test]
    fn duration_is_one_codec_frame() {
        // 1024 samples at 44.1kHz is 23ms, expressed in the 1/1000
        // video time base.
        let mut synth = FillerAudio::new(&aac_params());
        let audio = synth.next_packet(&video_packet(0));
        assert_eq!(audio.duration, MediaDuration(23));
    }

    #[test]
    fn missing_video_timestamps_stay_missing() {
        let mut synth = FillerAudio::new(&aac_params());
        let mut video = video_packet(0);
        video.pts = None;
        video.dts = None;
        let audio = synth.next_packet(&video);
        assert_eq!(audio.pts, None);
        assert_eq!(audio.dts, None);
    }
}
