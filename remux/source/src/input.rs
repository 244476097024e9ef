/*!
    Input binding: a byte source attached to a demuxer.
*/

use std::ffi::{CString, c_int, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use ffmpeg_next::{ffi, packet::Mut as PacketMut};
use tracing::warn;

use remux_types::{
    CodecId, DemuxedPacket, MediaDuration, Packet, Pts, Rational, RemuxError, RemuxResult,
    StreamKind, VideoParams,
};

use crate::byte_source::ByteSource;

/// Size of the buffer the demuxer reads the byte source through.
const IO_BUFFER_SIZE: usize = 32 * 1024;

/**
    The container or framing format a byte source is demuxed as.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// FLV framing, the usual wrapper for video-only captures.
    Flv,
    /// Any other demuxer FFmpeg knows by short name.
    Named(String),
}

impl InputFormat {
    /**
        The FFmpeg short name for this format.
    */
    pub fn name(&self) -> &str {
        match self {
            Self::Flv => "flv",
            Self::Named(name) => name,
        }
    }
}

/// Read callback handed to the demuxer's I/O context. `opaque` is the
/// boxed byte source owned by [`RawInput`].
unsafe extern "C" fn read_byte_source(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
    // SAFETY: `opaque` outlives the AVIO context (both are owned by the
    // same RawInput) and FFmpeg hands us a writable buffer of `buf_size`.
    let result = catch_unwind(AssertUnwindSafe(|| {
        let source = unsafe { &mut *(opaque as *mut Box<dyn ByteSource>) };
        let dst = unsafe { std::slice::from_raw_parts_mut(buf, buf_size as usize) };
        source.read(dst)
    }));

    match result {
        Ok(Ok(0)) => ffi::AVERROR_EOF,
        Ok(Ok(n)) => n as c_int,
        Ok(Err(_)) | Err(_) => ffi::AVERROR(ffi::EIO),
    }
}

/// Owner of the raw demuxer state. Kept separate from [`InputSource`] so
/// a failure halfway through `open` still releases whatever was
/// allocated, in close-then-free order, exactly once.
struct RawInput {
    ctx: *mut ffi::AVFormatContext,
    avio: *mut ffi::AVIOContext,
    source: *mut Box<dyn ByteSource>,
}

impl Drop for RawInput {
    fn drop(&mut self) {
        // SAFETY: every pointer here was allocated in `open` and is
        // released only from this Drop. `avformat_close_input` does not
        // touch a caller-supplied AVIO context, so the buffer and the
        // context itself are freed separately.
        unsafe {
            if !self.ctx.is_null() {
                ffi::avformat_close_input(&mut self.ctx);
            }
            if !self.avio.is_null() {
                ffi::av_freep(&mut (*self.avio).buffer as *mut _ as *mut c_void);
                ffi::avio_context_free(&mut self.avio);
            }
            if !self.source.is_null() {
                drop(Box::from_raw(self.source));
            }
        }
    }
}

/**
    One demuxed elementary stream with an identified video track.

    Owns its demuxer context, I/O buffer, and byte source; all three are
    released when the `InputSource` goes out of scope, on success and
    failure paths alike.
*/
pub struct InputSource {
    raw: RawInput,
    video_stream_index: usize,
    video_params: VideoParams,
}

impl InputSource {
    /**
        Attach a byte source to a demuxer for the given format.

        Fails with [`RemuxError::Open`] if the demuxer cannot be set up
        or the byte stream is not openable as `format`, with
        [`RemuxError::FormatProbe`] if stream parameters cannot be
        determined from the probing window, and with
        [`RemuxError::NoVideoStream`] if probing succeeds but no
        video-type stream exists.
    */
    pub fn open(source: Box<dyn ByteSource>, format: &InputFormat) -> RemuxResult<Self> {
        ffmpeg_next::init().map_err(|e| RemuxError::Open(e.to_string()))?;

        let mut raw = RawInput {
            ctx: std::ptr::null_mut(),
            avio: std::ptr::null_mut(),
            source: Box::into_raw(Box::new(source)),
        };

        // SAFETY: allocation failures are checked before use, and `raw`
        // releases everything allocated so far if we bail out early.
        unsafe {
            let buffer = ffi::av_malloc(IO_BUFFER_SIZE) as *mut u8;
            if buffer.is_null() {
                return Err(RemuxError::Open("could not allocate I/O buffer".into()));
            }

            raw.avio = ffi::avio_alloc_context(
                buffer,
                IO_BUFFER_SIZE as c_int,
                0,
                raw.source as *mut c_void,
                Some(read_byte_source),
                None,
                None,
            );
            if raw.avio.is_null() {
                ffi::av_free(buffer as *mut c_void);
                return Err(RemuxError::Open("could not allocate I/O context".into()));
            }

            raw.ctx = ffi::avformat_alloc_context();
            if raw.ctx.is_null() {
                return Err(RemuxError::Open("could not allocate demuxer context".into()));
            }
            (*raw.ctx).pb = raw.avio;

            let format_name = CString::new(format.name())
                .map_err(|_| RemuxError::Open(format!("bad format name '{}'", format.name())))?;
            let ifmt = ffi::av_find_input_format(format_name.as_ptr());
            if ifmt.is_null() {
                return Err(RemuxError::Open(format!(
                    "no demuxer for format '{}'",
                    format.name()
                )));
            }

            let ret = ffi::avformat_open_input(
                &mut raw.ctx,
                c"".as_ptr(),
                ifmt,
                std::ptr::null_mut(),
            );
            // On failure the context has already been freed and nulled
            // for us; RawInput's Drop skips it and still frees the rest.
            if ret < 0 {
                return Err(RemuxError::Open(format!(
                    "byte source is not valid '{}' data: {}",
                    format.name(),
                    ffmpeg_next::Error::from(ret)
                )));
            }

            let ret = ffi::avformat_find_stream_info(raw.ctx, std::ptr::null_mut());
            if ret < 0 {
                return Err(RemuxError::FormatProbe(
                    ffmpeg_next::Error::from(ret).to_string(),
                ));
            }

            let video_stream_index = locate_video_stream(raw.ctx)?;
            let video_params = extract_video_params(raw.ctx, video_stream_index);

            Ok(Self {
                raw,
                video_stream_index,
                video_params,
            })
        }
    }

    /**
        Open a file on disk as the byte source.
    */
    pub fn open_file<P: AsRef<Path>>(path: P, format: &InputFormat) -> RemuxResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| RemuxError::Open(format!("{}: {e}", path.display())))?;
        Self::open(Box::new(file), format)
    }

    /**
        Index of the bound video stream inside the input container.
    */
    pub fn video_stream_index(&self) -> usize {
        self.video_stream_index
    }

    /**
        Codec parameters of the bound video stream.
    */
    pub fn video_params(&self) -> &VideoParams {
        &self.video_params
    }

    /**
        Read the next demuxed packet.

        Returns `Ok(None)` once the byte source is exhausted. Packets
        from any audio or video stream in the container are surfaced
        with their stream index so the caller decides what to keep;
        other stream types (data, subtitles) are skipped here.
    */
    pub fn read_packet(&mut self) -> RemuxResult<Option<DemuxedPacket>> {
        loop {
            let mut pkt = ffmpeg_next::Packet::empty();
            // SAFETY: the context stays valid for as long as `self` is
            // alive, and the packet owns its own buffers.
            let ret = unsafe { ffi::av_read_frame(self.raw.ctx, pkt.as_mut_ptr()) };
            if ret < 0 {
                if ret != ffi::AVERROR_EOF {
                    warn!(
                        error = %ffmpeg_next::Error::from(ret),
                        "input ended before end-of-stream marker"
                    );
                }
                return Ok(None);
            }

            let stream_index = pkt.stream();
            let Some((kind, time_base)) = self.stream_kind(stream_index) else {
                continue;
            };

            let data = pkt.data().map(|d| d.to_vec()).unwrap_or_default();
            let packet = Packet::new(
                data,
                pkt.pts().map(Pts),
                pkt.dts().map(Pts),
                MediaDuration(pkt.duration()),
                time_base,
                pkt.is_key(),
                kind,
            );

            return Ok(Some(DemuxedPacket {
                stream_index,
                packet,
            }));
        }
    }

    /// Kind and time base of a container stream, or `None` for stream
    /// types the pipeline never consumes.
    fn stream_kind(&self, index: usize) -> Option<(StreamKind, Rational)> {
        // SAFETY: indices handed out by av_read_frame are within
        // nb_streams, and stream entries live as long as the context.
        unsafe {
            if index >= (*self.raw.ctx).nb_streams as usize {
                return None;
            }
            let stream = *(*self.raw.ctx).streams.add(index);
            let kind = match (*(*stream).codecpar).codec_type {
                ffi::AVMediaType::AVMEDIA_TYPE_VIDEO => StreamKind::Video,
                ffi::AVMediaType::AVMEDIA_TYPE_AUDIO => StreamKind::Audio,
                _ => return None,
            };
            Some((kind, rational_from_raw((*stream).time_base)))
        }
    }
}

/// Scan the demuxed stream list for the first video-type stream.
fn locate_video_stream(ctx: *mut ffi::AVFormatContext) -> RemuxResult<usize> {
    // SAFETY: the context was successfully opened and probed.
    unsafe {
        for i in 0..(*ctx).nb_streams as usize {
            let stream = *(*ctx).streams.add(i);
            if (*(*stream).codecpar).codec_type == ffi::AVMediaType::AVMEDIA_TYPE_VIDEO {
                return Ok(i);
            }
        }
    }
    Err(RemuxError::NoVideoStream)
}

/// Copy the codec parameters of a video stream out of the demuxer.
fn extract_video_params(ctx: *mut ffi::AVFormatContext, index: usize) -> VideoParams {
    // SAFETY: `index` was returned by locate_video_stream on this
    // context; parameter structs are read-only here and owned by FFmpeg.
    unsafe {
        let stream = *(*ctx).streams.add(index);
        let par = (*stream).codecpar;

        let extradata = if (*par).extradata_size > 0 && !(*par).extradata.is_null() {
            let slice = std::slice::from_raw_parts((*par).extradata, (*par).extradata_size as usize);
            Some(slice.to_vec())
        } else {
            None
        };

        let frame_rate = [(*stream).avg_frame_rate, (*stream).r_frame_rate]
            .into_iter()
            .find(|r| r.num > 0 && r.den > 0)
            .map(rational_from_raw);

        VideoParams {
            codec_id: codec_id_from_raw((*par).codec_id),
            width: (*par).width.max(0) as u32,
            height: (*par).height.max(0) as u32,
            frame_rate,
            time_base: rational_from_raw((*stream).time_base),
            extradata,
            bit_rate: ((*par).bit_rate > 0).then(|| (*par).bit_rate as u64),
            profile: ((*par).profile != ffi::FF_PROFILE_UNKNOWN).then_some((*par).profile),
            level: ((*par).level != ffi::AV_LEVEL_UNKNOWN).then_some((*par).level),
        }
    }
}

fn rational_from_raw(r: ffi::AVRational) -> Rational {
    Rational::new(r.num, r.den)
}

fn codec_id_from_raw(id: ffi::AVCodecID) -> CodecId {
    use ffi::AVCodecID::*;

    match id {
        AV_CODEC_ID_H264 => CodecId::H264,
        AV_CODEC_ID_HEVC => CodecId::H265,
        AV_CODEC_ID_VP8 => CodecId::Vp8,
        AV_CODEC_ID_VP9 => CodecId::Vp9,
        AV_CODEC_ID_AV1 => CodecId::Av1,
        AV_CODEC_ID_AAC => CodecId::Aac,
        AV_CODEC_ID_MP3 => CodecId::Mp3,
        AV_CODEC_ID_OPUS => CodecId::Opus,
        _ => CodecId::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(InputFormat::Flv.name(), "flv");
        assert_eq!(InputFormat::Named("mpegts".into()).name(), "mpegts");
    }
}
