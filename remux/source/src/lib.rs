/*!
    Media source and demuxing for the remux crate ecosystem.

    This crate handles the input side of the pipeline. It attaches a
    pull-based byte source to a demuxer, identifies the video elementary
    stream, and produces encoded packets for the interleaver to remux.
*/

pub use remux_types::{DemuxedPacket, Packet, RemuxError, RemuxResult, VideoParams};

mod byte_source;
mod input;

pub use byte_source::ByteSource;
pub use input::{InputFormat, InputSource};
