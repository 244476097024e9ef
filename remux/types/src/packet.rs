/*!
    Packet types.
*/

use crate::Rational;

/**
    A presentation or decode timestamp, in ticks of some time base.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

/**
    A duration, in ticks of some time base.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(pub i64);

/**
    The kind of stream a packet belongs to.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

/**
    A unit of coded data.

    The timestamps and duration are expressed in `time_base`; a muxer
    rescales them into its own track time base before writing.
*/
#[derive(Clone, Debug)]
pub struct Packet {
    /// Coded payload bytes.
    pub data: Vec<u8>,
    /// Presentation timestamp, if known.
    pub pts: Option<Pts>,
    /// Decode timestamp, if known.
    pub dts: Option<Pts>,
    /// Duration of the packet's content.
    pub duration: MediaDuration,
    /// Time base the stamps above are expressed in.
    pub time_base: Rational,
    /// Whether this packet starts at a keyframe.
    pub is_keyframe: bool,
    /// Which kind of track this packet targets.
    pub kind: StreamKind,
}

impl Packet {
    /**
        Create a new packet.
    */
    pub fn new(
        data: Vec<u8>,
        pts: Option<Pts>,
        dts: Option<Pts>,
        duration: MediaDuration,
        time_base: Rational,
        is_keyframe: bool,
        kind: StreamKind,
    ) -> Self {
        Self {
            data,
            pts,
            dts,
            duration,
            time_base,
            is_keyframe,
            kind,
        }
    }

    /**
        Payload size in bytes.
    */
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/**
    A packet as it came out of a demuxer, tagged with the index of the
    input stream that produced it.

    Containers may multiplex streams a consumer does not care about; the
    index lets the consumer filter without the demuxer deciding for it.
*/
#[derive(Clone, Debug)]
pub struct DemuxedPacket {
    /// Index of the originating input stream.
    pub stream_index: usize,
    /// The packet itself.
    pub packet: Packet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_size() {
        let packet = Packet::new(
            vec![0u8; 64],
            Some(Pts(0)),
            Some(Pts(0)),
            MediaDuration(40),
            Rational::new(1, 1000),
            true,
            StreamKind::Video,
        );
        assert_eq!(packet.size(), 64);
    }
}
