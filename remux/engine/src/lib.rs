/*!
    The remux engine: pairs every demuxed video packet with one
    synthetic audio packet and interleaves both into the output
    container in a single pass.

    The interleaver is generic over its source and sink seams so the
    loop's policies (foreign-stream skipping, per-packet write
    tolerance, unconditional trailer) are testable without FFmpeg;
    [`run`] wires the seams to the real demuxer and muxer.
*/

pub use remux_sink::ContainerFormat;
pub use remux_types::{Packet, RemuxError, RemuxResult};

mod interleave;
mod pipeline;
mod synth;

pub use interleave::{Interleaver, PacketSink, PacketSource, RemuxState, RemuxStats};
pub use pipeline::{PipelineConfig, run};
pub use synth::{FillerAudio, SyntheticSource};
