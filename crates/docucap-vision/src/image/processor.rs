// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame processor — decode raw camera buffers, rotate, crop, grayscale and
// pack back into a host-ordered output buffer.

use docucap_core::error::{CaptureError, Result};
use docucap_core::types::{EnhancedFrame, FrameRef, PixelFormat, PixelRect, Rotation};
use image::{GrayImage, Rgb, RgbImage, imageops};
use tracing::{debug, instrument};

/// Working copy of one camera frame.
///
/// Pixels are held as true RGB whatever the source layout; the source format
/// is remembered so the output can be packed back in the host's channel
/// order. Transformations consume `self` and return the transformed frame,
/// enabling method chaining:
///
/// ```ignore
/// let gray = FrameProcessor::from_frame(&frame)?
///     .rotate(Rotation::Cw90)
///     .crop(PixelRect::new(0, 0, 640, 480))
///     .grayscale();
/// ```
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    image: RgbImage,
    source_format: PixelFormat,
}

impl FrameProcessor {
    // -- Construction ---------------------------------------------------------

    /// Validate and decode a packed camera buffer.
    #[instrument(skip(frame), fields(width = frame.width, height = frame.height, format = ?frame.format))]
    pub fn from_frame(frame: &FrameRef<'_>) -> Result<Self> {
        frame.validate()?;

        let bpp = frame.format.bytes_per_pixel();
        let pixels = &frame.data[..frame.expected_len()];
        let image = RgbImage::from_fn(frame.width, frame.height, |x, y| {
            let i = (y as usize * frame.width as usize + x as usize) * bpp;
            match frame.format {
                PixelFormat::Bgra | PixelFormat::Bgr => {
                    Rgb([pixels[i + 2], pixels[i + 1], pixels[i]])
                }
                PixelFormat::Rgb => Rgb([pixels[i], pixels[i + 1], pixels[i + 2]]),
                PixelFormat::Gray => Rgb([pixels[i]; 3]),
            }
        });

        debug!("Frame decoded");
        Ok(Self {
            image,
            source_format: frame.format,
        })
    }

    /// Wrap an already-decoded RGB image.
    pub fn from_rgb(image: RgbImage, source_format: PixelFormat) -> Self {
        Self {
            image,
            source_format,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn source_format(&self) -> PixelFormat {
        self.source_format
    }

    /// Borrow the RGB working image.
    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_rgb(self) -> RgbImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Rotate clockwise by a quarter-turn multiple (lossless).
    pub fn rotate(self, rotation: Rotation) -> Self {
        let image = match rotation {
            Rotation::None => return self,
            Rotation::Cw90 => imageops::rotate90(&self.image),
            Rotation::Cw180 => imageops::rotate180(&self.image),
            Rotation::Cw270 => imageops::rotate270(&self.image),
        };
        debug!(degrees = rotation.degrees(), "Frame rotated");
        Self { image, ..self }
    }

    /// Crop to `rect` clamped to the image. An empty intersection leaves the
    /// frame unchanged.
    pub fn crop(self, rect: PixelRect) -> Self {
        let safe = rect.clip_to(self.image.width(), self.image.height());
        if safe.is_empty() {
            debug!(?rect, "Crop outside frame; skipped");
            return self;
        }
        let image =
            imageops::crop_imm(&self.image, safe.x, safe.y, safe.width, safe.height).to_image();
        Self { image, ..self }
    }

    /// Replace the working image (after a warp or filter).
    pub fn map_image(self, f: impl FnOnce(RgbImage) -> RgbImage) -> Self {
        Self {
            image: f(self.image),
            source_format: self.source_format,
        }
    }

    /// Luminance view of the current image.
    pub fn grayscale(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    // -- Output ---------------------------------------------------------------

    /// Pack into a 3-channel buffer: blue-first for BGR/BGRA sources,
    /// red-first otherwise.
    pub fn into_enhanced(self) -> Result<EnhancedFrame> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::Image("enhanced frame is empty".into()));
        }

        let bgr = self.source_format.is_bgr_order();
        let mut pixels = self.image.into_raw();
        if bgr {
            for px in pixels.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }

        Ok(EnhancedFrame {
            pixels,
            width,
            height,
            channels: 3,
            stride: width as usize * 3,
            format: if bgr { PixelFormat::Bgr } else { PixelFormat::Rgb },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra_frame() -> Vec<u8> {
        // 2x1: pure blue then pure red, BGRA layout.
        vec![255, 0, 0, 255, 0, 0, 255, 255]
    }

    #[test]
    fn decodes_bgra_into_rgb() {
        let data = bgra_frame();
        let frame = FrameRef::new(&data, 2, 1, PixelFormat::Bgra);
        let proc = FrameProcessor::from_frame(&frame).unwrap();
        assert_eq!(proc.as_rgb().get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(proc.as_rgb().get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn output_restores_bgr_order() {
        let data = bgra_frame();
        let frame = FrameRef::new(&data, 2, 1, PixelFormat::Bgra);
        let out = FrameProcessor::from_frame(&frame)
            .unwrap()
            .into_enhanced()
            .unwrap();
        assert_eq!(out.format, PixelFormat::Bgr);
        assert_eq!(out.pixels, vec![255, 0, 0, 0, 0, 255]);
        assert_eq!(out.stride, 6);
    }

    #[test]
    fn gray_input_expands_to_rgb_output() {
        let data = vec![10u8, 20, 30, 40];
        let frame = FrameRef::new(&data, 2, 2, PixelFormat::Gray);
        let out = FrameProcessor::from_frame(&frame)
            .unwrap()
            .into_enhanced()
            .unwrap();
        assert_eq!(out.format, PixelFormat::Rgb);
        assert_eq!(&out.pixels[..6], &[10, 10, 10, 20, 20, 20]);
    }

    #[test]
    fn rotate_90_swaps_dimensions() {
        let proc = FrameProcessor::from_rgb(RgbImage::new(40, 30), PixelFormat::Rgb)
            .rotate(Rotation::Cw90);
        assert_eq!((proc.width(), proc.height()), (30, 40));
    }

    #[test]
    fn rotate_90_moves_top_left_to_top_right() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(0, 0, Rgb([9, 9, 9]));
        let proc = FrameProcessor::from_rgb(img, PixelFormat::Rgb).rotate(Rotation::Cw90);
        assert_eq!(proc.as_rgb().get_pixel(1, 0), &Rgb([9, 9, 9]));
    }

    #[test]
    fn crop_is_clamped_and_skipped_when_empty() {
        let proc = FrameProcessor::from_rgb(RgbImage::new(100, 80), PixelFormat::Rgb);
        let cropped = proc.clone().crop(PixelRect::new(60, 50, 100, 100));
        assert_eq!((cropped.width(), cropped.height()), (40, 30));

        let untouched = proc.crop(PixelRect::new(200, 200, 10, 10));
        assert_eq!((untouched.width(), untouched.height()), (100, 80));
    }
}
