// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// C ABI for camera hosts (Android NDK, iOS, Flutter FFI).
//
// ## Ownership
//
// - `docucap_engine_create` returns an engine released by
//   `docucap_engine_destroy`.
// - `docucap_analyze_frame` returns a JSON string released by
//   `docucap_free_string`.
// - Both enhance calls return a handle released by
//   `docucap_free_enhancement_result`. Pixel pointers obtained from a handle
//   are valid until it is freed.
//
// An engine must not be used from two threads at once. Errors and panics are
// reported through the return values and never unwind into the host.

use std::ffi::{CStr, CString, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use docucap_core::error::{CaptureError, Result};
use docucap_core::geometry::Point2;
use docucap_core::types::{
    EnhanceMode, EnhancedFrame, EnhancementOptions, FrameRef, GuideRect, PixelFormat, PixelRect,
    Rotation,
};
use docucap_vision::CaptureEngine;
use tracing::warn;

use crate::handle::EnhancementHandle;
use crate::wire::encode_analysis;

const VERSION: &CStr = match CStr::from_bytes_with_nul(
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes(),
) {
    Ok(version) => version,
    Err(_) => c"unknown",
};

// ---------------------------------------------------------------------------
// Argument decoding
// ---------------------------------------------------------------------------

/// Borrow a raw host frame.
///
/// # Safety
///
/// When non-null, `data` must point to at least
/// `width * height * bytes_per_pixel(format)` readable bytes that outlive `'a`.
unsafe fn raw_frame<'a>(
    data: *const u8,
    width: c_int,
    height: c_int,
    format: c_int,
) -> Result<FrameRef<'a>> {
    if data.is_null() {
        return Err(CaptureError::InvalidInput("image data is null".into()));
    }
    if width <= 0 || height <= 0 {
        return Err(CaptureError::InvalidInput(format!(
            "invalid frame size {width}x{height}"
        )));
    }
    let format = pixel_format(format);
    let len = width as usize * height as usize * format.bytes_per_pixel();
    // SAFETY: non-null and sized per the caller contract above.
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    Ok(FrameRef::new(bytes, width as u32, height as u32, format))
}

fn pixel_format(code: c_int) -> PixelFormat {
    PixelFormat::from_code(code).unwrap_or_else(|| {
        warn!(code, "Unknown pixel format; assuming BGR");
        PixelFormat::Bgr
    })
}

fn rotation(degrees: c_int) -> Rotation {
    Rotation::from_degrees(degrees).unwrap_or_else(|| {
        warn!(degrees, "Unsupported rotation; frame left upright");
        Rotation::None
    })
}

fn enhance_mode(code: c_int) -> EnhanceMode {
    EnhanceMode::from_code(code).unwrap_or_else(|| {
        warn!(code, "Unknown enhance mode; none applied");
        EnhanceMode::None
    })
}

fn crop_rect(x: c_int, y: c_int, width: c_int, height: c_int) -> Option<PixelRect> {
    (width > 0 && height > 0)
        .then(|| PixelRect::new(x.max(0) as u32, y.max(0) as u32, width as u32, height as u32))
}

/// Run `f`, turning a panic into an error.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(CaptureError::Image("internal panic during processing".into())))
}

fn into_handle(result: Result<EnhancedFrame>) -> *mut EnhancementHandle {
    Box::into_raw(Box::new(EnhancementHandle::from_result(result)))
}

// ---------------------------------------------------------------------------
// Engine lifecycle
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn docucap_engine_create() -> *mut CaptureEngine {
    Box::into_raw(Box::new(CaptureEngine::new()))
}

/// # Safety
///
/// `engine` must be null or a pointer from `docucap_engine_create` that has
/// not been destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_engine_destroy(engine: *mut CaptureEngine) {
    if !engine.is_null() {
        // SAFETY: ownership returns from the host exactly once.
        drop(unsafe { Box::from_raw(engine) });
    }
}

/// Clear the stability history and start a new session.
///
/// # Safety
///
/// `engine` must be null or a live engine pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_engine_reset(engine: *mut CaptureEngine) {
    // SAFETY: live or null per the contract.
    if let Some(engine) = unsafe { engine.as_mut() } {
        engine.reset();
    }
}

// ---------------------------------------------------------------------------
// Stage 1: analyze
// ---------------------------------------------------------------------------

/// Analyze one preview frame and return the result as JSON.
///
/// `rotation` is 0, 90, 180 or 270 degrees clockwise. A crop with a
/// non-positive width or height is ignored. On failure the JSON object has
/// `error` and `kind` keys instead of the analysis fields.
///
/// # Safety
///
/// `engine` must be null or a live engine pointer; `data` must satisfy the
/// frame contract of this module.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn docucap_analyze_frame(
    engine: *mut CaptureEngine,
    data: *const u8,
    width: c_int,
    height: c_int,
    format: c_int,
    rotation_degrees: c_int,
    crop_x: c_int,
    crop_y: c_int,
    crop_w: c_int,
    crop_h: c_int,
) -> *mut c_char {
    // SAFETY: live or null per the contract.
    let outcome = match unsafe { engine.as_mut() } {
        None => Err(CaptureError::InvalidInput("engine is null".into())),
        Some(engine) => guarded(|| {
            // SAFETY: forwarded caller contract.
            let frame = unsafe { raw_frame(data, width, height, format) }?;
            engine.analyze(
                &frame,
                rotation(rotation_degrees),
                crop_rect(crop_x, crop_y, crop_w, crop_h),
            )
        }),
    };

    CString::new(encode_analysis(&outcome))
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Stage 2: enhance
// ---------------------------------------------------------------------------

/// Rectify and enhance a captured frame.
///
/// `corners` holds 8 floats (`x0,y0,..,x3,y3`); null is rejected. When
/// `apply_perspective` is 0 the frame is cropped to the corners' bounding box
/// instead. Never returns null.
///
/// # Safety
///
/// `engine` must be null or a live engine pointer; `data` must satisfy the
/// frame contract of this module; `corners` must be null or point to 8 floats.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn docucap_enhance_image(
    engine: *mut CaptureEngine,
    data: *const u8,
    width: c_int,
    height: c_int,
    format: c_int,
    corners: *const f32,
    apply_perspective: c_int,
    apply_auto_enhance: c_int,
    apply_sharpening: c_int,
    sharpening_strength: f32,
    mode: c_int,
    output_width: c_int,
    output_height: c_int,
) -> *mut EnhancementHandle {
    // SAFETY: live or null per the contract.
    let Some(engine) = (unsafe { engine.as_ref() }) else {
        return Box::into_raw(Box::new(EnhancementHandle::failure("engine is null")));
    };

    let points: Vec<Point2> = if corners.is_null() {
        Vec::new()
    } else {
        // SAFETY: 8 readable floats per the contract.
        unsafe { std::slice::from_raw_parts(corners, 8) }
            .chunks_exact(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect()
    };

    let options = EnhancementOptions {
        apply_crop: apply_perspective == 0,
        apply_perspective_correction: apply_perspective != 0,
        apply_auto_enhance: apply_auto_enhance != 0,
        apply_sharpening: apply_sharpening != 0,
        sharpening_strength,
        enhance_mode: enhance_mode(mode),
        output_width: output_width.max(0) as u32,
        output_height: output_height.max(0) as u32,
    };

    into_handle(guarded(|| {
        // SAFETY: forwarded caller contract.
        let frame = unsafe { raw_frame(data, width, height, format) }?;
        engine.enhance(&frame, &points, &options)
    }))
}

/// Enhance a captured frame using the on-screen guide box.
///
/// Perspective correction is chosen from the engine's last analysis. Never
/// returns null.
///
/// # Safety
///
/// `engine` must be null or a live engine pointer; `data` must satisfy the
/// frame contract of this module.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn docucap_enhance_image_with_guide_frame(
    engine: *mut CaptureEngine,
    data: *const u8,
    width: c_int,
    height: c_int,
    format: c_int,
    guide_left: f32,
    guide_top: f32,
    guide_right: f32,
    guide_bottom: f32,
    apply_sharpening: c_int,
    sharpening_strength: f32,
    mode: c_int,
    rotation_degrees: c_int,
) -> *mut EnhancementHandle {
    // SAFETY: live or null per the contract.
    let Some(engine) = (unsafe { engine.as_ref() }) else {
        return Box::into_raw(Box::new(EnhancementHandle::failure("engine is null")));
    };

    let guide = GuideRect::new(guide_left, guide_top, guide_right, guide_bottom);
    let options = EnhancementOptions {
        apply_sharpening: apply_sharpening != 0,
        sharpening_strength,
        enhance_mode: enhance_mode(mode),
        ..EnhancementOptions::default()
    };

    into_handle(guarded(|| {
        // SAFETY: forwarded caller contract.
        let frame = unsafe { raw_frame(data, width, height, format) }?;
        engine.enhance_with_guide_frame(&frame, &guide, &options, rotation(rotation_degrees))
    }))
}

// ---------------------------------------------------------------------------
// Enhancement handle accessors
// ---------------------------------------------------------------------------

/// # Safety
///
/// `handle` must be null or a live handle from an enhance call.
unsafe fn frame_field(
    handle: *const EnhancementHandle,
    field: impl Fn(&EnhancedFrame) -> usize,
) -> c_int {
    // SAFETY: live or null per the contract.
    unsafe { handle.as_ref() }
        .and_then(EnhancementHandle::frame)
        .map_or(0, |frame| c_int::try_from(field(frame)).unwrap_or(c_int::MAX))
}

/// 1 when the handle holds pixels, 0 otherwise (including null).
///
/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_success(handle: *const EnhancementHandle) -> c_int {
    // SAFETY: live or null per the contract.
    unsafe { handle.as_ref() }.map_or(0, |h| c_int::from(h.is_success()))
}

/// Pointer to `stride * height` bytes, or null on failure.
///
/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_image_data(
    handle: *const EnhancementHandle,
) -> *const u8 {
    // SAFETY: live or null per the contract.
    unsafe { handle.as_ref() }
        .and_then(EnhancementHandle::frame)
        .map_or(ptr::null(), |frame| frame.pixels.as_ptr())
}

/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_width(handle: *const EnhancementHandle) -> c_int {
    unsafe { frame_field(handle, |f| f.width as usize) }
}

/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_height(handle: *const EnhancementHandle) -> c_int {
    unsafe { frame_field(handle, |f| f.height as usize) }
}

/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_channels(handle: *const EnhancementHandle) -> c_int {
    unsafe { frame_field(handle, |f| f.channels as usize) }
}

/// # Safety
///
/// `handle` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_stride(handle: *const EnhancementHandle) -> c_int {
    unsafe { frame_field(handle, |f| f.stride) }
}

/// Error message of a failed handle; empty on success.
///
/// # Safety
///
/// `handle` must be null or a live handle. The string lives as long as the
/// handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_enhancement_error(
    handle: *const EnhancementHandle,
) -> *const c_char {
    // SAFETY: live or null per the contract.
    match unsafe { handle.as_ref() } {
        None => c"invalid result pointer".as_ptr(),
        Some(handle) => handle.error().unwrap_or(c"").as_ptr(),
    }
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

/// # Safety
///
/// `handle` must be null or a handle from an enhance call, freed only once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_free_enhancement_result(handle: *mut EnhancementHandle) {
    if !handle.is_null() {
        // SAFETY: ownership returns from the host exactly once.
        drop(unsafe { Box::from_raw(handle) });
    }
}

/// # Safety
///
/// `text` must be null or a string from `docucap_analyze_frame`, freed only
/// once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn docucap_free_string(text: *mut c_char) {
    if !text.is_null() {
        // SAFETY: allocated by `CString::into_raw` in this module.
        drop(unsafe { CString::from_raw(text) });
    }
}

/// Library version as a static NUL-terminated string.
#[unsafe(no_mangle)]
pub extern "C" fn docucap_version() -> *const c_char {
    VERSION.as_ptr()
}
