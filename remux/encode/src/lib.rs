/*!
    Audio encoder setup for the remux crate ecosystem.

    Serves two callers: the remux engine, which opens an encoder only to
    learn the parameters (extradata, frame size) its synthetic audio
    track must advertise, and the silence generator, which feeds the
    encoder real — if entirely silent — frames.
*/

pub use remux_types::{AudioParams, ChannelLayout, CodecId, Packet, RemuxError, RemuxResult};

mod audio;
mod config;

pub use audio::AudioEncoder;
pub use config::AudioEncoderConfig;
