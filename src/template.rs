//! Image template search inside a screen region.

use std::path::Path;

use image::GrayImage;
use imageproc::integral_image::{integral_image, integral_squared_image, sum_image_pixels};
use rayon::prelude::*;

use crate::capture::{CaptureRegion, ScreenSource};
use crate::error::TemplateError;

/// Below this the window or template has no texture to correlate
const FLAT: f64 = 1e-6;

/// Best placement of a template inside a haystack image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateHit {
    /// Top-left corner of the match, haystack coordinates
    pub x: u32,
    pub y: u32,
    /// Correlation coefficient in [-1, 1]; 1.0 = same pattern
    pub score: f32,
}

/// Find where `template` fits best inside `haystack`.
///
/// Scores are mean-subtracted normalized correlation, so brightness offsets
/// do not matter and a featureless window scores 0 instead of close to 1.
/// `None` when the template does not fit inside the haystack.
pub fn best_match(haystack: &GrayImage, template: &GrayImage) -> Option<TemplateHit> {
    let (hw, hh) = haystack.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > hw || th > hh {
        return None;
    }

    let n = f64::from(tw * th);
    let t_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let t_zero: Vec<f64> = template.pixels().map(|p| f64::from(p[0]) - t_mean).collect();
    let t_norm = t_zero.iter().map(|v| v * v).sum::<f64>().sqrt();

    let sums = integral_image::<_, u64>(haystack);
    let squares = integral_squared_image::<_, u64>(haystack);
    let pixels = haystack.as_raw();

    let score_at = |x: u32, y: u32| -> f32 {
        let (right, bottom) = (x + tw - 1, y + th - 1);
        let sum = sum_image_pixels(&sums, x, y, right, bottom)[0] as f64;
        let sum_sq = sum_image_pixels(&squares, x, y, right, bottom)[0] as f64;
        let denom = (sum_sq - sum * sum / n).max(0.0).sqrt() * t_norm;
        if denom < FLAT {
            return 0.0;
        }

        // The window mean drops out because the template is zero-mean
        let mut cross = 0.0;
        for ty in 0..th {
            let row = ((y + ty) * hw + x) as usize;
            let t_row = (ty * tw) as usize;
            for tx in 0..tw as usize {
                cross += f64::from(pixels[row + tx]) * t_zero[t_row + tx];
            }
        }
        (cross / denom).clamp(-1.0, 1.0) as f32
    };

    (0..=hh - th)
        .into_par_iter()
        .map(|y| {
            (0..=hw - tw)
                .map(|x| TemplateHit {
                    x,
                    y,
                    score: score_at(x, y),
                })
                .fold(None::<TemplateHit>, |best, hit| match best {
                    Some(b) if b.score >= hit.score => Some(b),
                    _ => Some(hit),
                })
        })
        .reduce(|| None, |a, b| match (a, b) {
            (Some(a), Some(b)) if b.score > a.score => Some(b),
            (Some(a), _) => Some(a),
            (None, b) => b,
        })
}

/// Locates a target image on screen
pub trait TemplateFinder {
    /// Screen coordinates of the match center, if the best score reaches `confidence`
    fn find(
        &mut self,
        region: CaptureRegion,
        confidence: f32,
    ) -> Result<Option<(i32, i32)>, TemplateError>;
}

/// Template loaded once from disk, matched against live captures
pub struct ScreenTemplateFinder<S> {
    screen: S,
    template: GrayImage,
}

impl<S: ScreenSource> ScreenTemplateFinder<S> {
    pub fn open(path: &Path, screen: S) -> Result<Self, TemplateError> {
        let template = image::open(path)
            .map_err(|source| TemplateError::LoadFailed {
                path: path.display().to_string(),
                source,
            })?
            .to_luma8();

        if template.width() == 0 || template.height() == 0 {
            return Err(TemplateError::EmptyTemplate(path.display().to_string()));
        }

        tracing::info!(
            "Loaded template {} ({}x{})",
            path.display(),
            template.width(),
            template.height()
        );
        Ok(Self::new(template, screen))
    }

    pub fn new(template: GrayImage, screen: S) -> Self {
        Self { screen, template }
    }
}

impl<S: ScreenSource> TemplateFinder for ScreenTemplateFinder<S> {
    fn find(
        &mut self,
        region: CaptureRegion,
        confidence: f32,
    ) -> Result<Option<(i32, i32)>, TemplateError> {
        let capture = image::DynamicImage::ImageRgba8(self.screen.capture(region)?).to_luma8();

        let Some(hit) = best_match(&capture, &self.template) else {
            tracing::warn!(
                "Template ({}x{}) is larger than scan region {:?}",
                self.template.width(),
                self.template.height(),
                region.to_array()
            );
            return Ok(None);
        };

        tracing::debug!("Best template score {:.3} at ({}, {})", hit.score, hit.x, hit.y);
        if hit.score < confidence {
            return Ok(None);
        }

        let x = region.x + hit.x + self.template.width() / 2;
        let y = region.y + hit.y + self.template.height() / 2;
        Ok(Some((x as i32, y as i32)))
    }
}
