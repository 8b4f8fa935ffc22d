//! Image preparation ahead of text recognition.
//!
//! Frames are reduced to 8-bit grayscale and binarized with a global
//! threshold chosen by Otsu's method, which maximizes the between-class
//! variance of the dark and light pixel populations.

use image::{GrayImage, Luma};
use std::path::Path;

use crate::error::Result;

/// Decode an image file as 8-bit grayscale
pub fn load_grayscale(path: &Path) -> Result<GrayImage> {
    Ok(image::open(path)?.to_luma8())
}

/// Global threshold maximizing between-class variance; pixels `<= t` form the background class
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut weighted_bg = 0.0;
    let mut best_threshold = 0u8;
    let mut best_variance = 0.0;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        weighted_bg += level as f64 * count as f64;
        let mean_bg = weighted_bg / weight_bg as f64;
        let mean_fg = (weighted_total - weighted_bg) / weight_fg as f64;
        let variance = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }

    best_threshold
}

/// Pixels above `threshold` become white, the rest black
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Grayscale load followed by Otsu binarization
pub fn prepare_for_ocr(path: &Path) -> Result<GrayImage> {
    let gray = load_grayscale(path)?;
    let threshold = otsu_threshold(&gray);
    Ok(binarize(&gray, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(dark: u8, light: u8) -> GrayImage {
        GrayImage::from_fn(20, 10, |x, _| if x < 5 { Luma([dark]) } else { Luma([light]) })
    }

    #[test]
    fn test_otsu_separates_two_levels() {
        let image = two_tone(20, 200);
        let threshold = otsu_threshold(&image);
        assert!((20..200).contains(&threshold));

        let binary = binarize(&image, threshold);
        assert_eq!(binary.get_pixel(0, 0).0[0], 0);
        assert_eq!(binary.get_pixel(19, 9).0[0], 255);
    }

    #[test]
    fn test_otsu_favors_dominant_split() {
        // dark text strokes (30, 40) over a light page (210, 220)
        let image = GrayImage::from_fn(40, 1, |x, _| {
            Luma([match x % 4 {
                0 => 30,
                1 => 40,
                2 => 210,
                _ => 220,
            }])
        });
        let threshold = otsu_threshold(&image);
        assert!((40..210).contains(&threshold));
    }

    #[test]
    fn test_uniform_image_has_no_split() {
        let image = GrayImage::from_pixel(8, 8, Luma([128]));
        assert_eq!(otsu_threshold(&image), 0);
        assert!(binarize(&image, 0).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_prepare_for_ocr_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0001.png");
        two_tone(10, 240).save(&path).unwrap();

        let prepared = prepare_for_ocr(&path).unwrap();

        assert_eq!(prepared.dimensions(), (20, 10));
        assert!(prepared.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_unreadable_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(load_grayscale(&path).is_err());
    }
}
