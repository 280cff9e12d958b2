//! Binary morphology with rectangular structuring elements.
//!
//! Erosion and dilation are all the filter needs: opening with a wide flat
//! element isolates ruled lines, and a small square dilation widens the
//! mask before inpainting. Border handling matches what the detection
//! parameters were tuned with: erosion treats out-of-bounds neighbors as
//! foreground (rules running to the image edge stay detected), dilation
//! treats them as background.

use crate::model::BinaryMask;

/// Erode with a `se_width` x `se_height` rectangular structuring element.
///
/// A pixel survives only if every pixel under the element is set.
pub fn erode(mask: &BinaryMask, se_width: u32, se_height: u32) -> BinaryMask {
    let (w, h) = (mask.width(), mask.height());
    let (rx, ry) = (se_width as i64 / 2, se_height as i64 / 2);
    let mut out = BinaryMask::new(w, h);

    for y in 0..h {
        'pixel: for x in 0..w {
            for dy in -ry..=(se_height as i64 - 1 - ry) {
                for dx in -rx..=(se_width as i64 - 1 - rx) {
                    let sx = x as i64 + dx;
                    let sy = y as i64 + dy;
                    if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                        continue;
                    }
                    if !mask.get(sx as u32, sy as u32) {
                        continue 'pixel;
                    }
                }
            }
            out.set(x, y, true);
        }
    }
    out
}

/// Dilate with a `se_width` x `se_height` rectangular structuring element.
///
/// A pixel is set if any pixel under the element is set.
pub fn dilate(mask: &BinaryMask, se_width: u32, se_height: u32) -> BinaryMask {
    let (w, h) = (mask.width(), mask.height());
    let (rx, ry) = (se_width as i64 / 2, se_height as i64 / 2);
    let mut out = BinaryMask::new(w, h);

    for y in 0..h {
        for x in 0..w {
            if !mask.get(x, y) {
                continue;
            }
            // Reflect the element around the set pixel
            for dy in -(se_height as i64 - 1 - ry)..=ry {
                for dx in -(se_width as i64 - 1 - rx)..=rx {
                    let sx = x as i64 + dx;
                    let sy = y as i64 + dy;
                    if sx >= 0 && sy >= 0 && sx < w as i64 && sy < h as i64 {
                        out.set(sx as u32, sy as u32, true);
                    }
                }
            }
        }
    }
    out
}

/// Morphological opening: `iterations` erosions followed by the same
/// number of dilations, all with the same element.
pub fn open(mask: &BinaryMask, se_width: u32, se_height: u32, iterations: u32) -> BinaryMask {
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = erode(&current, se_width, se_height);
    }
    for _ in 0..iterations {
        current = dilate(&current, se_width, se_height);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_row(w: u32, h: u32, y: u32, x0: u32, x1: u32) -> BinaryMask {
        let mut mask = BinaryMask::new(w, h);
        for x in x0..x1 {
            mask.set(x, y, true);
        }
        mask
    }

    #[test]
    fn test_erode_removes_short_runs() {
        // 10px run cannot survive a 40px-wide element
        let mask = mask_with_row(100, 5, 2, 10, 20);
        let eroded = erode(&mask, 40, 1);
        assert!(eroded.is_empty());
    }

    #[test]
    fn test_open_keeps_long_runs() {
        // 80px run survives opening with a 40x1 element
        let mask = mask_with_row(100, 5, 2, 10, 90);
        let opened = open(&mask, 40, 1, 1);
        assert!(!opened.is_empty());
        assert!(opened.get(50, 2));
        // Nothing leaks to other rows
        assert!(!opened.get(50, 1));
        assert!(!opened.get(50, 3));
    }

    #[test]
    fn test_open_discards_text_sized_marks() {
        // A 12x3 blob (a fat character stroke) disappears entirely
        let mut mask = BinaryMask::new(100, 20);
        for y in 8..11 {
            for x in 40..52 {
                mask.set(x, y, true);
            }
        }
        let opened = open(&mask, 40, 1, 2);
        assert!(opened.is_empty());
    }

    #[test]
    fn test_dilate_3x3_widens_by_one() {
        let mut mask = BinaryMask::new(9, 9);
        mask.set(4, 4, true);
        let dilated = dilate(&mask, 3, 3);
        assert_eq!(dilated.count_set(), 9);
        assert!(dilated.get(3, 3));
        assert!(dilated.get(5, 5));
        assert!(!dilated.get(2, 4));
    }

    #[test]
    fn test_erode_then_dilate_is_stable_for_wide_bars() {
        // A full-width bar is unchanged by opening
        let mask = mask_with_row(200, 3, 1, 0, 200);
        let opened = open(&mask, 40, 1, 2);
        assert_eq!(opened, mask);
    }
}
