//! Fluid-propagation inpainting of masked regions.
//!
//! A Telea-style scheme: masked pixels are reconstructed in order of their
//! distance from the mask boundary, each as a distance-weighted average of
//! the already-known pixels inside the search radius. Known values
//! propagate inward layer by layer, so thin gaps (the ruled lines this
//! crate removes) are filled from the strokes and paper surrounding them.
//! Traversal order is fixed (distance, then pixel index), which keeps the
//! result deterministic for identical inputs.

use crate::model::{BinaryMask, RasterImage};
use std::collections::VecDeque;

/// Reconstruct the pixels under `mask` from their surroundings.
///
/// `radius` is the neighborhood searched for known pixels, in pixels.
/// Pixels outside the mask are returned untouched. A mask covering the
/// whole image has no information to propagate; those pixels are left as
/// they are.
pub fn inpaint(image: &RasterImage, mask: &BinaryMask, radius: u32) -> RasterImage {
    let (w, h) = image.dimensions();
    let mut out = image.clone();
    if mask.is_empty() {
        return out;
    }

    let distances = distance_from_boundary(mask);
    let mut order: Vec<usize> = (0..(w as usize * h as usize))
        .filter(|&i| mask.data()[i])
        .collect();
    order.sort_by_key(|&i| (distances[i], i));

    // known[i] flips to true once a pixel holds a usable value
    let mut known: Vec<bool> = mask.data().iter().map(|&m| !m).collect();
    let r = radius as i64;

    for i in order {
        let x = (i % w as usize) as i64;
        let y = (i / w as usize) as i64;

        let mut acc = [0f64; 3];
        let mut weight_sum = 0f64;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let sx = x + dx;
                let sy = y + dy;
                if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                    continue;
                }
                let si = sy as usize * w as usize + sx as usize;
                if !known[si] {
                    continue;
                }
                let dist_sq = (dx * dx + dy * dy) as f64;
                if dist_sq > (r * r) as f64 {
                    continue;
                }
                // Closer samples dominate; the level-set factor favors
                // pixels that were known before this layer.
                let level = 1.0 / (1.0 + (distances[i] as f64 - distances[si] as f64).abs());
                let weight = level / dist_sq;
                let px = out.pixel(sx as u32, sy as u32);
                for c in 0..3 {
                    acc[c] += weight * px[c] as f64;
                }
                weight_sum += weight;
            }
        }

        if weight_sum > 0.0 {
            let rgb = [
                (acc[0] / weight_sum).round().clamp(0.0, 255.0) as u8,
                (acc[1] / weight_sum).round().clamp(0.0, 255.0) as u8,
                (acc[2] / weight_sum).round().clamp(0.0, 255.0) as u8,
            ];
            out.set_pixel(x as u32, y as u32, rgb);
            known[i] = true;
        }
    }

    out
}

/// 4-neighbor BFS distance of each masked pixel from the nearest unmasked
/// pixel. Unmasked pixels have distance 0; unreachable pixels (a mask with
/// no boundary at all) keep `u32::MAX`.
fn distance_from_boundary(mask: &BinaryMask) -> Vec<u32> {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let mut dist = vec![u32::MAX; w * h];
    let mut queue = VecDeque::new();

    for i in 0..w * h {
        if !mask.data()[i] {
            dist[i] = 0;
            queue.push_back(i);
        }
    }

    while let Some(i) = queue.pop_front() {
        let x = i % w;
        let y = i / w;
        let next = dist[i] + 1;
        let mut visit = |nx: usize, ny: usize| {
            let ni = ny * w + nx;
            if dist[ni] > next {
                dist[ni] = next;
                queue.push_back(ni);
            }
        };
        if x > 0 {
            visit(x - 1, y);
        }
        if x + 1 < w {
            visit(x + 1, y);
        }
        if y > 0 {
            visit(x, y - 1);
        }
        if y + 1 < h {
            visit(x, y + 1);
        }
    }

    dist
}
