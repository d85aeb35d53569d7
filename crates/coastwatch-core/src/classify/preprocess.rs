//! Input tensors for the classification backends.
//!
//! Each recipe is tied to the statistics the model was trained with, so the
//! target size, resampling filter and scale factor must not drift.
//!
//! - Grid model: NHWC `[1, size, size, 3]`, bicubic resize, pixels / 255 in [0, 1]
//! - Zero-shot visual encoder: NCHW `[1, 3, size, size]`, Lanczos3 resize,
//!   `(pixel / 255 - 0.5) / 0.5` in [-1, 1]

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Zero-shot encoder normalization mean (per-channel).
const NORM_MEAN: f32 = 0.5;

/// Zero-shot encoder normalization std (per-channel).
const NORM_STD: f32 = 0.5;

/// Build the grid model's input: RGB scaled to [0, 1], channels last.
pub fn grid_tensor(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let rgb = image
        .resize_exact(image_size, image_size, FilterType::CatmullRom)
        .to_rgb8();
    let size = image_size as usize;

    let data: Vec<f32> = rgb.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    // `as_raw` is already row-major HWC, so it maps straight onto [1, H, W, C].
    Array4::from_shape_vec((1, size, size, CHANNELS), data)
        .unwrap_or_else(|_| Array4::zeros((1, size, size, CHANNELS)))
}

/// Build the zero-shot visual encoder's input: RGB in [-1, 1], channels first.
pub fn semantic_tensor(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let rgb = image
        .resize_exact(image_size, image_size, FilterType::Lanczos3)
        .to_rgb8();
    let size = image_size as usize;
    let plane = size * size;

    let mut data = vec![0.0f32; CHANNELS * plane];
    for (i, pixel) in rgb.as_raw().chunks_exact(CHANNELS).enumerate() {
        for (c, &val) in pixel.iter().enumerate() {
            data[c * plane + i] = (val as f32 / 255.0 - NORM_MEAN) / NORM_STD;
        }
    }

    Array4::from_shape_vec((1, CHANNELS, size, size), data)
        .unwrap_or_else(|_| Array4::zeros((1, CHANNELS, size, size)))
}
