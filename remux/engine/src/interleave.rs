/*!
    The packet interleaver: the single-pass remux loop.
*/

use tracing::{debug, warn};

use remux_types::{DemuxedPacket, Packet, RemuxResult, StreamKind};

use crate::synth::SyntheticSource;

/**
    The input seam of the interleaver: something that yields demuxed
    packets and knows which stream index carries the bound video.
*/
pub trait PacketSource {
    /// Index of the bound video stream.
    fn video_stream_index(&self) -> usize;

    /// Next demuxed packet, or `None` at end of data.
    fn read_packet(&mut self) -> RemuxResult<Option<DemuxedPacket>>;
}

/**
    The output seam of the interleaver: a container accepting packets
    between one header and one trailer.
*/
pub trait PacketSink {
    /// Write the container header. Called exactly once, first.
    fn write_header(&mut self) -> RemuxResult<()>;

    /// Write one packet to its track.
    fn write(&mut self, packet: &Packet) -> RemuxResult<()>;

    /// Write the trailer and close the container.
    fn finish(self) -> RemuxResult<()>;
}

/**
    Lifecycle states of the remux loop.

    `Failed` is reachable from any non-terminal state; it short-circuits
    to resource release without attempting the trailer.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemuxState {
    Initializing,
    HeaderWritten,
    Streaming,
    TrailerWritten,
    Closed,
    Failed,
}

/**
    Counters reported by a completed remux run.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemuxStats {
    /// Video packets written to the container.
    pub video_packets: u64,
    /// Synthetic audio packets written to the container.
    pub audio_packets: u64,
    /// Packets dropped because their write failed.
    pub dropped_writes: u64,
}

/**
    The remux loop: reads one demuxed packet at a time, pairs it with
    one synthetic audio packet, and writes both — video first — until
    the source is exhausted.

    Policies, in order of appearance:
    - packets from stream indices other than the bound video stream are
      skipped, since a container may multiplex streams the engine does
      not consume;
    - a failed packet write is logged and counted, never fatal: one
      malformed packet must not abort an otherwise recoverable remux,
      and no cap is placed on consecutive failures;
    - the trailer is written unconditionally once input is exhausted.

    Fatal errors (header write, source read) skip the trailer; the
    source and sink still release their resources through `Drop`.
*/
pub struct Interleaver<Src, Snk, Syn> {
    source: Src,
    sink: Snk,
    synth: Syn,
    state: RemuxState,
    stats: RemuxStats,
}

impl<Src, Snk, Syn> Interleaver<Src, Snk, Syn>
where
    Src: PacketSource,
    Snk: PacketSink,
    Syn: SyntheticSource,
{
    /**
        Create an interleaver over an opened source and a sink with its
        tracks already bound.
    */
    pub fn new(source: Src, sink: Snk, synth: Syn) -> Self {
        Self {
            source,
            sink,
            synth,
            state: RemuxState::Initializing,
            stats: RemuxStats::default(),
        }
    }

    /**
        Current lifecycle state.
    */
    pub fn state(&self) -> RemuxState {
        self.state
    }

    /**
        Drive the loop to completion.
    */
    pub fn run(mut self) -> RemuxResult<RemuxStats> {
        if let Err(e) = self.sink.write_header() {
            self.state = RemuxState::Failed;
            return Err(e);
        }
        self.state = RemuxState::HeaderWritten;
        debug!("header written, streaming");

        self.state = RemuxState::Streaming;
        let video_index = self.source.video_stream_index();
        loop {
            let demuxed = match self.source.read_packet() {
                Ok(Some(demuxed)) => demuxed,
                Ok(None) => break,
                Err(e) => {
                    self.state = RemuxState::Failed;
                    return Err(e);
                }
            };

            if demuxed.stream_index != video_index {
                continue;
            }

            let audio = self.synth.next_packet(&demuxed.packet);
            self.write_tolerant(&demuxed.packet);
            self.write_tolerant(&audio);
        }

        // Input exhausted: the trailer is written unconditionally, even
        // if every single packet write failed.
        let Self { source, sink, stats, .. } = self;
        sink.finish()?;
        debug!(?stats, "trailer written");
        drop(source);

        Ok(stats)
    }

    fn write_tolerant(&mut self, packet: &Packet) {
        match self.sink.write(packet) {
            Ok(()) => match packet.kind {
                StreamKind::Video => self.stats.video_packets += 1,
                StreamKind::Audio => self.stats.audio_packets += 1,
            },
            Err(e) => {
                warn!(error = %e, kind = ?packet.kind, "dropping packet");
                self.stats.dropped_writes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{FillerAudio, SyntheticSource};
    use remux_types::{
        AudioParams, ChannelLayout, CodecId, MediaDuration, Pts, Rational, RemuxError,
    };
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const VIDEO_INDEX: usize = 0;

    fn video_packet(pts: i64) -> Packet {
        Packet::new(
            vec![0xAB; 16],
            Some(Pts(pts)),
            Some(Pts(pts)),
            MediaDuration(40),
            Rational::new(1, 1000),
            false,
            StreamKind::Video,
        )
    }

    fn filler() -> FillerAudio {
        FillerAudio::new(&AudioParams {
            codec_id: CodecId::Aac,
            sample_rate: 44100,
            channels: ChannelLayout::Stereo,
            time_base: Rational::new(1, 44100),
            extradata: None,
            bit_rate: None,
            frame_size: 1024,
        })
    }

    struct VecSource {
        packets: VecDeque<DemuxedPacket>,
    }

    impl VecSource {
        fn of(packets: Vec<DemuxedPacket>) -> Self {
            Self {
                packets: packets.into(),
            }
        }

        fn video(count: usize) -> Self {
            Self::of(
                (0..count)
                    .map(|i| DemuxedPacket {
                        stream_index: VIDEO_INDEX,
                        packet: video_packet(i as i64 * 40),
                    })
                    .collect(),
            )
        }
    }

    impl PacketSource for VecSource {
        fn video_stream_index(&self) -> usize {
            VIDEO_INDEX
        }

        fn read_packet(&mut self) -> RemuxResult<Option<DemuxedPacket>> {
            Ok(self.packets.pop_front())
        }
    }

    #[derive(Clone, Default)]
    struct SinkLog {
        written: Rc<RefCell<Vec<(StreamKind, Option<Pts>)>>>,
        finished: Rc<RefCell<bool>>,
    }

    struct MockSink {
        log: SinkLog,
        header_fails: bool,
        trailer_fails: bool,
        /// 1-based write call numbers that fail.
        failing_writes: Vec<usize>,
        write_calls: usize,
    }

    impl MockSink {
        fn new(log: &SinkLog) -> Self {
            Self {
                log: log.clone(),
                header_fails: false,
                trailer_fails: false,
                failing_writes: Vec::new(),
                write_calls: 0,
            }
        }
    }

    impl PacketSink for MockSink {
        fn write_header(&mut self) -> RemuxResult<()> {
            if self.header_fails {
                return Err(RemuxError::MuxHeader("mock".into()));
            }
            Ok(())
        }

        fn write(&mut self, packet: &Packet) -> RemuxResult<()> {
            self.write_calls += 1;
            if self.failing_writes.contains(&self.write_calls) {
                return Err(RemuxError::MuxWrite("mock".into()));
            }
            self.log
                .written
                .borrow_mut()
                .push((packet.kind, packet.pts));
            Ok(())
        }

        fn finish(self) -> RemuxResult<()> {
            if self.trailer_fails {
                return Err(RemuxError::MuxWrite("mock trailer".into()));
            }
            *self.log.finished.borrow_mut() = true;
            Ok(())
        }
    }

    #[test]
    fn pairs_every_video_packet_with_audio() {
        let log = SinkLog::default();
        let stats = Interleaver::new(VecSource::video(3), MockSink::new(&log), filler())
            .run()
            .unwrap();

        assert_eq!(stats.video_packets, 3);
        assert_eq!(stats.audio_packets, 3);
        assert_eq!(stats.dropped_writes, 0);

        let written = log.written.borrow();
        let kinds: Vec<StreamKind> = written.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                StreamKind::Video,
                StreamKind::Audio,
                StreamKind::Video,
                StreamKind::Audio,
                StreamKind::Video,
                StreamKind::Audio,
            ]
        );
        assert!(*log.finished.borrow());
    }

    #[test]
    fn audio_follows_its_video_packet() {
        let log = SinkLog::default();
        Interleaver::new(VecSource::video(2), MockSink::new(&log), filler())
            .run()
            .unwrap();

        let written = log.written.borrow();
        for pair in written.chunks(2) {
            let (video_kind, video_pts) = pair[0];
            let (audio_kind, audio_pts) = pair[1];
            assert_eq!(video_kind, StreamKind::Video);
            assert_eq!(audio_kind, StreamKind::Audio);
            assert!(audio_pts >= video_pts);
        }
    }

    #[test]
    fn skips_streams_it_does_not_consume() {
        let log = SinkLog::default();
        let source = VecSource::of(vec![
            DemuxedPacket {
                stream_index: VIDEO_INDEX,
                packet: video_packet(0),
            },
            DemuxedPacket {
                stream_index: 7,
                packet: video_packet(10),
            },
            DemuxedPacket {
                stream_index: VIDEO_INDEX,
                packet: video_packet(40),
            },
        ]);

        let stats = Interleaver::new(source, MockSink::new(&log), filler())
            .run()
            .unwrap();

        assert_eq!(stats.video_packets, 2);
        assert_eq!(stats.audio_packets, 2);
        assert_eq!(log.written.borrow().len(), 4);
    }

    #[test]
    fn one_failed_write_does_not_abort_the_loop() {
        let log = SinkLog::default();
        let mut sink = MockSink::new(&log);
        sink.failing_writes = vec![3]; // the second video packet

        let stats = Interleaver::new(VecSource::video(3), sink, filler())
            .run()
            .unwrap();

        assert_eq!(stats.dropped_writes, 1);
        assert_eq!(stats.video_packets, 2);
        assert_eq!(stats.audio_packets, 3);
        assert!(*log.finished.borrow(), "trailer must still be written");
    }

    #[test]
    fn tolerates_unbounded_consecutive_failures() {
        let log = SinkLog::default();
        let mut sink = MockSink::new(&log);
        sink.failing_writes = (1..=8).collect();

        let stats = Interleaver::new(VecSource::video(4), sink, filler())
            .run()
            .unwrap();

        assert_eq!(stats.dropped_writes, 8);
        assert_eq!(stats.video_packets, 0);
        assert_eq!(stats.audio_packets, 0);
        assert!(*log.finished.borrow());
    }

    #[test]
    fn header_failure_is_fatal_and_writes_nothing() {
        let log = SinkLog::default();
        let mut sink = MockSink::new(&log);
        sink.header_fails = true;

        let err = Interleaver::new(VecSource::video(2), sink, filler())
            .run()
            .unwrap_err();

        assert!(matches!(err, RemuxError::MuxHeader(_)));
        assert!(log.written.borrow().is_empty());
        assert!(!*log.finished.borrow(), "trailer must be skipped on failure");
    }

    #[test]
    fn trailer_failure_propagates() {
        let log = SinkLog::default();
        let mut sink = MockSink::new(&log);
        sink.trailer_fails = true;

        let err = Interleaver::new(VecSource::video(1), sink, filler())
            .run()
            .unwrap_err();
        assert!(matches!(err, RemuxError::MuxWrite(_)));
    }

    #[test]
    fn empty_input_still_finalizes_the_container() {
        let log = SinkLog::default();
        let stats = Interleaver::new(VecSource::video(0), MockSink::new(&log), filler())
            .run()
            .unwrap();

        assert_eq!(stats, RemuxStats::default());
        assert!(*log.finished.borrow());
    }

    /// A generator that ignores the video packet entirely; the seam the
    /// interleaver asks for is just "one packet per call".
    struct ConstantSource;

    impl SyntheticSource for ConstantSource {
        fn next_packet(&mut self, video: &Packet) -> Packet {
            Packet::new(
                vec![0; 4],
                Some(Pts(0)),
                Some(Pts(0)),
                MediaDuration(1),
                video.time_base,
                true,
                StreamKind::Audio,
            )
        }
    }

    #[test]
    fn synthetic_source_is_pluggable() {
        let log = SinkLog::default();
        let stats = Interleaver::new(VecSource::video(2), MockSink::new(&log), ConstantSource)
            .run()
            .unwrap();
        assert_eq!(stats.audio_packets, 2);
    }
}
