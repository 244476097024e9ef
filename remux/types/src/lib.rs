/*!
    Shared types for the remux crate ecosystem.

    This crate defines the vocabulary of the ecosystem — the types that cross crate
    boundaries. It has no dependency on FFmpeg, making it lightweight and enabling
    consumers to depend on it without pulling in FFmpeg bindings.
*/

mod codec;
mod error;
mod packet;
mod params;
mod rational;

pub use codec::{ChannelLayout, CodecId};
pub use error::{RemuxError, RemuxResult};
pub use packet::{DemuxedPacket, MediaDuration, Packet, Pts, StreamKind};
pub use params::{AudioParams, VideoParams};
pub use rational::{Rational, rescale_dur, rescale_ts};
