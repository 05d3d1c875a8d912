//! Image decoding and the fixed training-time transform.
//!
//! The transform must stay identical to the one used when the weights were
//! produced: exact 224x224 resize, scale to [0,1], ImageNet normalization,
//! NCHW layout.

use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;

use crate::error::PredictError;

/// Side length of the square network input.
pub const INPUT_SIZE: u32 = 224;

/// ImageNet per-channel mean (RGB)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet per-channel std (RGB)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode uploaded bytes in any supported format and force 8-bit RGB,
/// whatever the source color mode (grayscale, RGBA, palette, 16-bit).
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, PredictError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Build the `[1, 3, 224, 224]` input tensor for one image.
pub fn to_input_tensor(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}
