//! Luminance conversion and Gaussian adaptive thresholding.

use crate::model::{BinaryMask, RasterImage};

/// Convert an RGB image to a single-channel luminance buffer.
///
/// Integer BT.601 weights (77/150/29 out of 256), the usual fixed-point
/// approximation of 0.299/0.587/0.114.
pub fn luminance(image: &RasterImage) -> Vec<u8> {
    image
        .data()
        .chunks_exact(3)
        .map(|px| {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((r * 77 + g * 150 + b * 29) >> 8) as u8
        })
        .collect()
}

/// Adaptive binary threshold against a Gaussian-weighted local mean.
///
/// A pixel is foreground when it is darker than its neighborhood mean by
/// more than `bias`: `gray < mean - bias`. The mean is a Gaussian blur of
/// the luminance with a `block_size` x `block_size` kernel, computed
/// separably with edge clamping. Matches the inverted Gaussian adaptive
/// threshold the scanning pipeline was tuned with (block 21, bias 10).
pub fn adaptive_threshold(
    gray: &[u8],
    width: u32,
    height: u32,
    block_size: u32,
    bias: f32,
) -> BinaryMask {
    let means = gaussian_blur(gray, width, height, block_size);
    let mut mask = BinaryMask::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) as usize;
            if (gray[i] as f32) < means[i] - bias {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

/// Separable Gaussian blur returning f32 values.
///
/// Sigma follows the OpenCV convention for an unspecified sigma:
/// `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_blur(gray: &[u8], width: u32, height: u32, ksize: u32) -> Vec<f32> {
    let kernel = gaussian_kernel(ksize);
    let radius = (ksize / 2) as i64;
    let (w, h) = (width as i64, height as i64);

    // Horizontal pass
    let mut tmp = vec![0f32; gray.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i64 - radius).clamp(0, w - 1);
                acc += weight * gray[(y * w + sx) as usize] as f32;
            }
            tmp[(y * w + x) as usize] = acc;
        }
    }

    // Vertical pass
    let mut out = vec![0f32; gray.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y + k as i64 - radius).clamp(0, h - 1);
                acc += weight * tmp[(sy * w + x) as usize];
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}

fn gaussian_kernel(ksize: u32) -> Vec<f32> {
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (ksize / 2) as i64;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i as f32).powi(2) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}
