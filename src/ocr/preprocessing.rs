//! Image preprocessing for OCR
//!
//! Game tooltips put light text on dark, textured backgrounds. Tesseract
//! does best on black text over a white page, so every capture goes through
//! grayscale, binarization and (optionally) a small noise filter first.

use image::{GrayImage, Luma, RgbaImage};
use rayon::prelude::*;

/// Image preprocessor for OCR
pub struct ImagePreprocessor {
    manual_threshold: Option<u8>,
    enable_morph_open: bool,
}

impl ImagePreprocessor {
    /// Create a new preprocessor
    ///
    /// # Arguments
    /// * `threshold` - Manual threshold (0 = automatic Otsu thresholding)
    /// * `enable_morph_open` - Enable morphological opening for noise reduction
    pub fn new(threshold: u8, enable_morph_open: bool) -> Self {
        Self {
            manual_threshold: (threshold != 0).then_some(threshold),
            enable_morph_open,
        }
    }

    /// Convert a capture into a binary image with dark text on white
    pub fn preprocess(&self, image: &RgbaImage) -> GrayImage {
        let gray = to_grayscale(image);
        let threshold = self
            .manual_threshold
            .unwrap_or_else(|| otsu_threshold(&gray));

        let mut binary = binarize(&gray, threshold);
        if self.enable_morph_open {
            binary = morphological_opening(&binary);
        }
        invert_if_light_text(&mut binary);
        binary
    }

    /// Single-channel binarizations, tried when the main pass reads nothing
    ///
    /// Affix text in Diablo IV is colored (blue magic, yellow rare, orange
    /// legendary), which a plain luminance threshold can wash out.
    pub fn alternatives(&self, image: &RgbaImage) -> Vec<GrayImage> {
        (0..3)
            .map(|channel| {
                let (width, height) = image.dimensions();
                let plane = GrayImage::from_fn(width, height, |x, y| {
                    Luma([image.get_pixel(x, y)[channel]])
                });
                let mut binary = binarize(&plane, otsu_threshold(&plane));
                if self.enable_morph_open {
                    binary = morphological_opening(&binary);
                }
                invert_if_light_text(&mut binary);
                binary
            })
            .collect()
    }
}

/// Grayscale with a boost for saturated (colored) pixels
fn to_grayscale(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        let (r, g, b) = (p[0] as u32, p[1] as u32, p[2] as u32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        // (max - min) / max > 0.3 without the division
        let saturated = max > 0 && (max - min) * 10 > max * 3;
        let value = if saturated {
            max
        } else {
            (77 * r + 150 * g + 29 * b) >> 8
        };
        Luma([value as u8])
    })
}

/// Otsu's method over the 256-bin histogram
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    let sum: u64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as u64 * count)
        .sum();

    let mut sum_background = 0u64;
    let mut weight_background = 0u64;
    let mut best_variance = 0.0f64;
    let mut threshold = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += level as u64 * count;
        let mean_background = sum_background as f64 / weight_background as f64;
        let mean_foreground = (sum - sum_background) as f64 / weight_foreground as f64;
        let variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if variance > best_variance {
            best_variance = variance;
            threshold = level as u8;
        }
    }

    threshold
}

fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary = gray.clone();
    binary
        .par_iter_mut()
        .for_each(|v| *v = if *v > threshold { 255 } else { 0 });
    binary
}

/// Tesseract wants dark text: flip when white pixels are the minority
fn invert_if_light_text(binary: &mut GrayImage) {
    let white = binary.pixels().filter(|p| p[0] > 127).count();
    let total = (binary.width() * binary.height()) as usize;
    if white < total / 2 {
        image::imageops::invert(binary);
    }
}

/// Erosion followed by dilation with a 4-neighbour cross
fn morphological_opening(binary: &GrayImage) -> GrayImage {
    let eroded = cross_filter(binary, |values| values.iter().all(|&v| v > 127));
    cross_filter(&eroded, |values| values.iter().any(|&v| v > 127))
}

/// Apply `keep` to each interior pixel's cross neighbourhood, row-parallel.
/// Border pixels are left black.
fn cross_filter(image: &GrayImage, keep: impl Fn(&[u8; 5]) -> bool + Sync) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    out.par_chunks_mut(width as usize)
        .enumerate()
        .skip(1)
        .take(height as usize - 2)
        .for_each(|(y, row)| {
            let y = y as u32;
            for x in 1..width - 1 {
                let values = [
                    image.get_pixel(x, y)[0],
                    image.get_pixel(x, y - 1)[0],
                    image.get_pixel(x, y + 1)[0],
                    image.get_pixel(x - 1, y)[0],
                    image.get_pixel(x + 1, y)[0],
                ];
                row[x as usize] = if keep(&values) { 255 } else { 0 };
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_preprocessor_creation() {
        let preprocessor = ImagePreprocessor::new(0, false);
        assert!(preprocessor.manual_threshold.is_none());

        let preprocessor = ImagePreprocessor::new(150, true);
        assert_eq!(preprocessor.manual_threshold, Some(150));
        assert!(preprocessor.enable_morph_open);
    }

    #[test]
    fn test_grayscale_extremes() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));

        let gray = to_grayscale(&img);
        assert!(gray.get_pixel(0, 0)[0] >= 254);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_saturated_pixels_use_max_channel() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 200, 255]));
        assert_eq!(to_grayscale(&img).get_pixel(0, 0)[0], 200);
    }

    #[test]
    fn test_otsu_splits_bimodal_image() {
        let gray = GrayImage::from_fn(100, 100, |x, _| Luma([if x < 50 { 50 } else { 200 }]));
        let threshold = otsu_threshold(&gray);
        assert!((50..200).contains(&threshold));
    }

    #[test]
    fn test_light_text_is_inverted() {
        // Mostly dark background with a small light "glyph"
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([10, 10, 10, 255]));
        for x in 5..10 {
            img.put_pixel(x, 10, Rgba([240, 240, 240, 255]));
        }

        let binary = ImagePreprocessor::new(128, false).preprocess(&img);
        // Background became white, glyph became black
        assert_eq!(binary.get_pixel(0, 0)[0], 255);
        assert_eq!(binary.get_pixel(6, 10)[0], 0);
    }

    #[test]
    fn test_opening_removes_speckles() {
        let mut binary = GrayImage::new(9, 9);
        binary.put_pixel(4, 4, Luma([255]));
        let opened = morphological_opening(&binary);
        assert!(opened.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_alternatives_one_per_channel() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([100, 150, 200, 255]));
        let alts = ImagePreprocessor::new(0, false).alternatives(&img);
        assert_eq!(alts.len(), 3);
        assert!(alts.iter().all(|a| a.dimensions() == (10, 10)));
    }
}
