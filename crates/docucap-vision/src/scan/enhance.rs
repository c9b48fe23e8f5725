// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline — contrast equalisation, brightness
// normalisation, background whitening, binarization and sharpening of
// rectified document images ahead of text recognition.

use docucap_core::config::EnhanceConfig;
use docucap_core::types::EnhanceMode;
use image::{GrayImage, Rgb, RgbImage, imageops};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, info, instrument};

use crate::image::primitives;
use crate::scan::sauvola::{SauvolaParams, sauvola_binarize};

/// Tile grid used by auto-enhance equalisation.
const CLAHE_GRID: u32 = 8;
/// Exposure auto-enhance steers towards.
const TARGET_BRIGHTNESS: f32 = 0.5;
/// Brightness errors smaller than this are left alone.
const BRIGHTNESS_TOLERANCE: f32 = 0.05;
/// Largest brightness shift auto-enhance applies.
const MAX_BRIGHTNESS_SHIFT: f32 = 50.0;

/// Enhances a rectified 3-channel document image for OCR.
///
/// Each method consumes `self` and returns the transformed enhancer, so a
/// pipeline reads top to bottom:
///
/// ```ignore
/// let out = ScanEnhancer::new(rgb, &config)
///     .auto_enhance()
///     .apply_mode(EnhanceMode::Sauvola)
///     .sharpen(0.5)
///     .into_rgb();
/// ```
pub struct ScanEnhancer {
    /// The working image.
    image: RgbImage,
    config: EnhanceConfig,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn new(image: RgbImage, config: &EnhanceConfig) -> Self {
        Self {
            image,
            config: config.clone(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_rgb(self) -> RgbImage {
        self.image
    }

    fn with_image(self, image: RgbImage) -> Self {
        Self {
            image,
            config: self.config,
        }
    }

    // -- Auto enhancement -----------------------------------------------------

    /// CLAHE on luminance followed by a brightness nudge towards mid-gray.
    #[instrument(skip(self))]
    pub fn auto_enhance(self) -> Self {
        info!("Running auto-enhance");
        let luma = imageops::grayscale(&self.image);
        let equalised = primitives::clahe(&luma, self.config.clahe_clip_limit, CLAHE_GRID);
        let image = shift_luma(&self.image, &luma, &equalised);
        self.with_image(image).normalise_brightness(TARGET_BRIGHTNESS)
    }

    /// Shift every channel so mean brightness moves towards `target` (0-1).
    ///
    /// Differences under 5 % are ignored; the shift is capped at 50 levels.
    pub fn normalise_brightness(self, target: f32) -> Self {
        let current = primitives::mean_intensity(&imageops::grayscale(&self.image)) as f32 / 255.0;
        let diff = target - current;
        if diff.abs() < BRIGHTNESS_TOLERANCE {
            debug!(current, "Brightness within tolerance");
            return self;
        }

        let beta = (diff * 100.0)
            .clamp(-MAX_BRIGHTNESS_SHIFT, MAX_BRIGHTNESS_SHIFT)
            .round() as i32;
        debug!(current, beta, "Adjusting brightness");

        let mut image = self.image;
        for pixel in image.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as i32 + beta).clamp(0, 255) as u8;
            }
        }
        Self {
            image,
            config: self.config,
        }
    }

    // -- OCR modes ------------------------------------------------------------

    /// Dispatch one OCR-oriented enhancement mode.
    #[instrument(skip(self))]
    pub fn apply_mode(self, mode: EnhanceMode) -> Self {
        match mode {
            EnhanceMode::None => self,
            EnhanceMode::WhitenBackground => {
                let threshold = self.config.whiten_threshold;
                self.whiten_background(threshold)
            }
            EnhanceMode::ContrastStretch => self.stretch_contrast(),
            EnhanceMode::AdaptiveBinarize => {
                let (block, offset) = (self.config.adaptive_block_size, self.config.adaptive_offset);
                self.binarize_adaptive(block, offset)
            }
            EnhanceMode::Sauvola => {
                let params = SauvolaParams {
                    window: self.config.sauvola_window,
                    k: self.config.sauvola_k as f64,
                    dynamic_range: self.config.sauvola_dynamic_range as f64,
                };
                self.binarize_sauvola(params)
            }
        }
    }

    /// Turn every pixel whose luminance exceeds `threshold` pure white.
    pub fn whiten_background(self, threshold: u8) -> Self {
        let luma = imageops::grayscale(&self.image);
        let mut image = self.image;
        let mut whitened = 0usize;
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            if luma.get_pixel(x, y).0[0] > threshold {
                *pixel = Rgb([255, 255, 255]);
                whitened += 1;
            }
        }
        debug!(threshold, whitened, "Background whitened");
        Self {
            image,
            config: self.config,
        }
    }

    /// Stretch the luminance range to 0-255, keeping chroma.
    pub fn stretch_contrast(self) -> Self {
        let luma = imageops::grayscale(&self.image);
        let (lo, hi) = luma
            .pixels()
            .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
        if hi <= lo {
            debug!("Flat luminance; contrast stretch skipped");
            return self;
        }

        let range = (hi - lo) as f32;
        let stretched = GrayImage::from_fn(luma.width(), luma.height(), |x, y| {
            let v = luma.get_pixel(x, y).0[0];
            image::Luma([(((v - lo) as f32) * 255.0 / range).round() as u8])
        });
        debug!(lo, hi, "Contrast stretched");
        let image = shift_luma(&self.image, &luma, &stretched);
        self.with_image(image)
    }

    /// Gaussian adaptive threshold; dark strokes stay black.
    pub fn binarize_adaptive(self, block_size: u32, offset: f32) -> Self {
        let luma = imageops::grayscale(&self.image);
        let binary = primitives::adaptive_threshold_gaussian(&luma, block_size, offset, false);
        debug!(block_size, offset, "Adaptive binarization complete");
        self.with_image(gray_to_rgb(&binary))
    }

    /// Sauvola binarization of the luminance.
    pub fn binarize_sauvola(self, params: SauvolaParams) -> Self {
        let luma = imageops::grayscale(&self.image);
        let binary = sauvola_binarize(&luma, params);
        self.with_image(gray_to_rgb(&binary))
    }

    // -- Sharpening -----------------------------------------------------------

    /// Unsharp mask: `(1 + strength) * image - strength * blurred`.
    ///
    /// Non-positive strengths leave the image untouched.
    #[instrument(skip(self), fields(strength))]
    pub fn sharpen(self, strength: f32) -> Self {
        if strength <= 0.0 {
            return self;
        }
        let blurred = gaussian_blur_f32(&self.image, self.config.sharpen_sigma);

        let mut image = self.image;
        for (pixel, soft) in image.pixels_mut().zip(blurred.pixels()) {
            for (channel, &b) in pixel.0.iter_mut().zip(soft.0.iter()) {
                let v = (1.0 + strength) * *channel as f32 - strength * b as f32;
                *channel = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        debug!("Sharpening applied");
        Self {
            image,
            config: self.config,
        }
    }
}

/// Add the per-pixel change between `before` and `after` luminance to every
/// channel of `image`.
fn shift_luma(image: &RgbImage, before: &GrayImage, after: &GrayImage) -> RgbImage {
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let delta = after.get_pixel(x, y).0[0] as i32 - before.get_pixel(x, y).0[0] as i32;
        if delta == 0 {
            continue;
        }
        for channel in pixel.0.iter_mut() {
            *channel = (*channel as i32 + delta).clamp(0, 255) as u8;
        }
    }
    out
}

fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        Rgb([gray.get_pixel(x, y).0[0]; 3])
    })
}

// -- Tests --------------------------------------------------------------------
