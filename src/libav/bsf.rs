//! Bitstream filter bindings: the subset of `libavcodec/bsf.h` used here,
//! declared by hand.

use std::ffi::{c_char, c_int, c_void, CString};
use std::ptr;

use ffmpeg_next as ffmpeg;
use ffmpeg::ffi::{avcodec_parameters_copy, AVCodecParameters, AVPacket, AVRational};
use ffmpeg::{codec, Packet, Rational};

use super::check;
use crate::error::{LibError, AVERROR_EINVAL};
use crate::library::BitstreamFilter;

#[repr(C)]
struct AVBitStreamFilter {
    _opaque: [u8; 0],
}

/// Layout mirrors `libavcodec/bsf.h`.
#[repr(C)]
#[allow(dead_code)]
struct AVBSFContext {
    av_class: *const c_void,
    filter: *const AVBitStreamFilter,
    priv_data: *mut c_void,
    par_in: *mut AVCodecParameters,
    par_out: *mut AVCodecParameters,
    time_base_in: AVRational,
    time_base_out: AVRational,
}

extern "C" {
    fn av_bsf_get_by_name(name: *const c_char) -> *const AVBitStreamFilter;
    fn av_bsf_alloc(filter: *const AVBitStreamFilter, ctx: *mut *mut AVBSFContext) -> c_int;
    fn av_bsf_init(ctx: *mut AVBSFContext) -> c_int;
    fn av_bsf_send_packet(ctx: *mut AVBSFContext, pkt: *mut AVPacket) -> c_int;
    fn av_bsf_receive_packet(ctx: *mut AVBSFContext, pkt: *mut AVPacket) -> c_int;
    fn av_bsf_free(ctx: *mut *mut AVBSFContext);
}

/// An initialised bitstream filter such as `h264_mp4toannexb`.
pub struct AnnexBFilter {
    ctx: *mut AVBSFContext,
}

impl AnnexBFilter {
    pub fn new(
        name: &str,
        parameters: &codec::Parameters,
        time_base: Rational,
    ) -> Result<Self, LibError> {
        let cname = CString::new(name)
            .map_err(|_| LibError::failed(AVERROR_EINVAL, "filter name contains a NUL byte"))?;

        unsafe {
            let filter = av_bsf_get_by_name(cname.as_ptr());
            if filter.is_null() {
                return Err(ffmpeg::Error::BsfNotFound.into());
            }

            let mut ctx = ptr::null_mut();
            check(av_bsf_alloc(filter, &mut ctx))?;
            // from here on Drop frees the context on every error path
            let this = Self { ctx };

            check(avcodec_parameters_copy((*ctx).par_in, parameters.as_ptr()))?;
            (*ctx).time_base_in = time_base.into();
            check(av_bsf_init(ctx))?;

            Ok(this)
        }
    }
}

impl BitstreamFilter for AnnexBFilter {
    type Packet = Packet;

    fn send_packet(&mut self, mut packet: Packet) -> Result<(), LibError> {
        // takes over the packet's data reference and leaves it blank
        check(unsafe { av_bsf_send_packet(self.ctx, packet.as_mut_ptr()) })
    }

    fn receive_packet(&mut self) -> Result<Packet, LibError> {
        let mut packet = Packet::empty();
        check(unsafe { av_bsf_receive_packet(self.ctx, packet.as_mut_ptr()) })?;
        Ok(packet)
    }
}

impl Drop for AnnexBFilter {
    fn drop(&mut self) {
        unsafe { av_bsf_free(&mut self.ctx) }
    }
}
