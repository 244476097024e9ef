/*!
    Output container implementation.
*/

use std::ffi::{CString, c_int};
use std::path::Path;

use ffmpeg_next::{ffi, format::context::Output as OutputContext, packet::Mut as PacketMut};
use tracing::debug;

use remux_types::{
    AudioParams, CodecId, Packet, Pts, Rational, RemuxError, RemuxResult, StreamKind, VideoParams,
    rescale_dur, rescale_ts,
};

use crate::config::ContainerFormat;

/**
    The destination container file.

    Holds exactly two tracks for the remux pipeline: a passthrough video
    track bound to the source codec parameters and an audio track bound
    to negotiated synthetic parameters. Track indices are fixed at
    creation and never renumbered once the header is written.
*/
pub struct OutputContainer {
    output: OutputContext,
    video_stream_index: Option<usize>,
    audio_stream_index: Option<usize>,
    video_time_base: Option<Rational>,
    audio_time_base: Option<Rational>,
    header_written: bool,
}

impl OutputContainer {
    /**
        Allocate a destination container at `path`.

        The muxer is taken from the format hint, or guessed from the
        path's extension; [`RemuxError::UnsupportedContainer`] if no
        muxer matches, [`RemuxError::Open`] if the file cannot be
        created.
    */
    pub fn create<P: AsRef<Path>>(path: P, format: &ContainerFormat) -> RemuxResult<Self> {
        ffmpeg_next::init().map_err(|e| RemuxError::Open(e.to_string()))?;

        let path = path.as_ref();

        // Resolve the muxer up front so "no such format" is reported as
        // what it is rather than as a file-open failure.
        let guessed = match format.name() {
            Some(name) => {
                let name_c = CString::new(name)
                    .map_err(|_| RemuxError::UnsupportedContainer(name.to_string()))?;
                // SAFETY: valid NUL-terminated name, null filename/mime.
                unsafe {
                    ffi::av_guess_format(name_c.as_ptr(), std::ptr::null(), std::ptr::null())
                }
            }
            None => {
                let path_c = CString::new(path.to_string_lossy().as_bytes())
                    .map_err(|_| RemuxError::Open(format!("{}: bad path", path.display())))?;
                // SAFETY: valid NUL-terminated filename.
                unsafe { ffi::av_guess_format(std::ptr::null(), path_c.as_ptr(), std::ptr::null()) }
            }
        };
        if guessed.is_null() {
            let wanted = format
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| path.display().to_string());
            return Err(RemuxError::UnsupportedContainer(wanted));
        }

        let output = match format.name() {
            Some(name) => ffmpeg_next::format::output_as(path, name),
            None => ffmpeg_next::format::output(path),
        }
        .map_err(|e| RemuxError::Open(format!("{}: {e}", path.display())))?;

        Ok(Self {
            output,
            video_stream_index: None,
            audio_stream_index: None,
            video_time_base: None,
            audio_time_base: None,
            header_written: false,
        })
    }

    /**
        Returns true if the container format stores decoder
        configuration out of band (global headers), like MP4.
    */
    pub fn requires_global_header(&self) -> bool {
        // SAFETY: oformat is set for the lifetime of the context.
        unsafe {
            let ctx = self.output.as_ptr();
            ((*(*ctx).oformat).flags & ffi::AVFMT_GLOBALHEADER as c_int) != 0
        }
    }

    /**
        Bind a passthrough video track.

        Codec parameters are copied verbatim from the source — no
        re-encoding; the container-specific codec tag is reset so the
        destination format picks its own. Returns the new track index.
    */
    pub fn add_video_track(&mut self, params: &VideoParams) -> RemuxResult<usize> {
        debug_assert!(!self.header_written);

        let codec_id = video_codec_to_raw(params.codec_id)?;

        // SAFETY: the stream and its parameter struct are owned by the
        // output context; extradata is duplicated into FFmpeg-owned
        // memory so the context can free it on its own terms.
        let index = unsafe {
            let stream = ffi::avformat_new_stream(self.output.as_mut_ptr(), std::ptr::null());
            if stream.is_null() {
                return Err(RemuxError::NoVideoOrAudioTrack);
            }

            let par = (*stream).codecpar;
            (*par).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
            (*par).codec_id = codec_id;
            (*par).codec_tag = 0;
            (*par).width = params.width as i32;
            (*par).height = params.height as i32;

            if let Some(ref extradata) = params.extradata {
                copy_extradata(par, extradata);
            }
            if let Some(bit_rate) = params.bit_rate {
                (*par).bit_rate = bit_rate as i64;
            }
            if let Some(profile) = params.profile {
                (*par).profile = profile;
            }
            if let Some(level) = params.level {
                (*par).level = level;
            }

            (*stream).time_base = rational_to_raw(params.time_base);
            if let Some(frame_rate) = params.frame_rate {
                (*stream).avg_frame_rate = rational_to_raw(frame_rate);
            }

            (*stream).index as usize
        };

        self.video_stream_index = Some(index);
        self.video_time_base = Some(params.time_base);
        Ok(index)
    }

    /**
        Bind an audio track from negotiated parameters.

        The track time base is the parameter set's `1/sample_rate`.
        Returns the new track index.
    */
    pub fn add_audio_track(&mut self, params: &AudioParams) -> RemuxResult<usize> {
        debug_assert!(!self.header_written);

        let codec_id = audio_codec_to_raw(params.codec_id)?;

        // SAFETY: as in add_video_track.
        let index = unsafe {
            let stream = ffi::avformat_new_stream(self.output.as_mut_ptr(), std::ptr::null());
            if stream.is_null() {
                return Err(RemuxError::NoVideoOrAudioTrack);
            }

            let par = (*stream).codecpar;
            (*par).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_AUDIO;
            (*par).codec_id = codec_id;
            (*par).codec_tag = 0;
            (*par).sample_rate = params.sample_rate as i32;
            (*par).format = ffi::AVSampleFormat::AV_SAMPLE_FMT_FLTP as c_int;
            (*par).frame_size = params.frame_size as i32;
            ffi::av_channel_layout_default(&mut (*par).ch_layout, params.channels.channels() as c_int);

            if let Some(ref extradata) = params.extradata {
                copy_extradata(par, extradata);
            }
            if let Some(bit_rate) = params.bit_rate {
                (*par).bit_rate = bit_rate as i64;
            }

            (*stream).time_base = rational_to_raw(params.time_base);

            (*stream).index as usize
        };

        self.audio_stream_index = Some(index);
        self.audio_time_base = Some(params.time_base);
        Ok(index)
    }

    /**
        Index of the bound video track, if one was created.
    */
    pub fn video_track(&self) -> Option<usize> {
        self.video_stream_index
    }

    /**
        Index of the bound audio track, if one was created.
    */
    pub fn audio_track(&self) -> Option<usize> {
        self.audio_stream_index
    }

    /**
        Time base packets on the video track are written in.
    */
    pub fn video_time_base(&self) -> Option<Rational> {
        self.video_time_base
    }

    /**
        Time base packets on the audio track are written in.
    */
    pub fn audio_time_base(&self) -> Option<Rational> {
        self.audio_time_base
    }

    /**
        Write the container header. Must be called exactly once, after
        all tracks are bound and before the first packet.
    */
    pub fn write_header(&mut self) -> RemuxResult<()> {
        if self.header_written {
            return Err(RemuxError::MuxHeader("header already written".into()));
        }

        self.output
            .write_header()
            .map_err(|e| RemuxError::MuxHeader(e.to_string()))?;
        self.header_written = true;

        // The muxer may adjust track time bases while writing the
        // header; refresh the cached ones so packet rescaling targets
        // what the container actually uses.
        if let Some(index) = self.video_stream_index {
            self.video_time_base = Some(self.stream_time_base(index));
        }
        if let Some(index) = self.audio_stream_index {
            self.audio_time_base = Some(self.stream_time_base(index));
        }

        debug!(
            video = ?self.video_time_base,
            audio = ?self.audio_time_base,
            "container header written"
        );
        Ok(())
    }

    /**
        Write one packet to its track.

        The packet's PTS/DTS/duration are rescaled from its own time
        base into the track's. Packets reach the container byte stream
        in exactly the order `write` is called — the caller's
        interleaving is preserved, not re-sorted.
    */
    pub fn write(&mut self, packet: &Packet) -> RemuxResult<()> {
        if !self.header_written {
            return Err(RemuxError::MuxWrite("container header not written".into()));
        }

        let (stream_index, track_tb) = match packet.kind {
            StreamKind::Video => self.video_stream_index.zip(self.video_time_base),
            StreamKind::Audio => self.audio_stream_index.zip(self.audio_time_base),
        }
        .ok_or(RemuxError::NoVideoOrAudioTrack)?;

        let mut ffmpeg_pkt = if packet.data.is_empty() {
            ffmpeg_next::Packet::empty()
        } else {
            ffmpeg_next::Packet::copy(&packet.data)
        };

        ffmpeg_pkt.set_stream(stream_index);

        // SAFETY: the packet was just allocated and is exclusively ours.
        unsafe {
            let pkt_ptr = ffmpeg_pkt.as_mut_ptr();
            if let Some(Pts(pts)) = packet.pts {
                (*pkt_ptr).pts = rescale_ts(pts, packet.time_base, track_tb);
            }
            if let Some(Pts(dts)) = packet.dts {
                (*pkt_ptr).dts = rescale_ts(dts, packet.time_base, track_tb);
            }
            (*pkt_ptr).duration = rescale_dur(packet.duration.0, packet.time_base, track_tb);
            (*pkt_ptr).pos = -1;
        }

        if packet.is_keyframe {
            ffmpeg_pkt.set_flags(ffmpeg_next::packet::Flags::KEY);
        }

        ffmpeg_pkt
            .write(&mut self.output)
            .map(|_| ())
            .map_err(|e| RemuxError::MuxWrite(e.to_string()))
    }

    /**
        Write the trailer and close the container.

        Consuming `self` makes a second trailer write unrepresentable;
        the underlying file is closed when the context drops, on this
        path and on every failure path alike.
    */
    pub fn finish(mut self) -> RemuxResult<()> {
        if !self.header_written {
            return Err(RemuxError::MuxWrite(
                "cannot write trailer before header".into(),
            ));
        }

        self.output
            .write_trailer()
            .map_err(|e| RemuxError::MuxWrite(format!("trailer: {e}")))?;

        debug!("container trailer written");
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Rational {
        // SAFETY: `index` was handed out by avformat_new_stream on this
        // context and streams are never removed.
        unsafe {
            let ctx = self.output.as_ptr();
            let stream = *(*ctx).streams.add(index);
            Rational::new((*stream).time_base.num, (*stream).time_base.den)
        }
    }
}

/// Duplicate extradata into FFmpeg-owned, padded memory.
///
/// # Safety
/// `par` must point to a live AVCodecParameters with no extradata set.
unsafe fn copy_extradata(par: *mut ffi::AVCodecParameters, extradata: &[u8]) {
    if extradata.is_empty() {
        return;
    }
    // SAFETY: FFmpeg requires AV_INPUT_BUFFER_PADDING_SIZE of zeroed
    // slack after extradata; av_mallocz provides it.
    unsafe {
        let alloc_size = extradata.len() + ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
        let buf = ffi::av_mallocz(alloc_size) as *mut u8;
        if !buf.is_null() {
            std::ptr::copy_nonoverlapping(extradata.as_ptr(), buf, extradata.len());
            (*par).extradata = buf;
            (*par).extradata_size = extradata.len() as c_int;
        }
    }
}

fn rational_to_raw(r: Rational) -> ffi::AVRational {
    ffi::AVRational { num: r.num, den: r.den }
}

fn video_codec_to_raw(codec: CodecId) -> RemuxResult<ffi::AVCodecID> {
    use ffi::AVCodecID::*;

    match codec {
        CodecId::H264 => Ok(AV_CODEC_ID_H264),
        CodecId::H265 => Ok(AV_CODEC_ID_HEVC),
        CodecId::Vp8 => Ok(AV_CODEC_ID_VP8),
        CodecId::Vp9 => Ok(AV_CODEC_ID_VP9),
        CodecId::Av1 => Ok(AV_CODEC_ID_AV1),
        _ => Err(RemuxError::UnsupportedContainer(format!(
            "video codec {codec:?} cannot be muxed"
        ))),
    }
}

fn audio_codec_to_raw(codec: CodecId) -> RemuxResult<ffi::AVCodecID> {
    use ffi::AVCodecID::*;

    match codec {
        CodecId::Aac => Ok(AV_CODEC_ID_AAC),
        CodecId::Mp3 => Ok(AV_CODEC_ID_MP3),
        CodecId::Opus => Ok(AV_CODEC_ID_OPUS),
        _ => Err(RemuxError::UnsupportedContainer(format!(
            "audio codec {codec:?} cannot be muxed"
        ))),
    }
}

impl std::fmt::Debug for OutputContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputContainer")
            .field("video_stream", &self.video_stream_index)
            .field("audio_stream", &self.audio_stream_index)
            .field("header_written", &self.header_written)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_codecs_are_rejected() {
        assert!(video_codec_to_raw(CodecId::H264).is_ok());
        assert!(video_codec_to_raw(CodecId::Unknown).is_err());
        assert!(video_codec_to_raw(CodecId::Aac).is_err());
        assert!(audio_codec_to_raw(CodecId::Aac).is_ok());
        assert!(audio_codec_to_raw(CodecId::H264).is_err());
    }
}
