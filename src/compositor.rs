//! Blends label planes onto grayscale image planes.

use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::enums::Colormap;
use crate::error::{Result, ScreenshotError};

#[derive(Debug, Clone, Copy)]
pub struct SliceCompositor {
    alpha: f32,
    colormap: Colormap,
    max_label: u32,
}

pub fn validate_opacity(opacity: f64) -> Result<()> {
    if opacity.is_finite() && (0.0..=100.0).contains(&opacity) {
        Ok(())
    } else {
        Err(ScreenshotError::InvalidOpacity(opacity))
    }
}

impl SliceCompositor {
    /// `opacity` is a percentage in `[0, 100]`; `max_label` is the largest
    /// label across all masks, so continuous colormaps stay consistent
    /// between tiles.
    pub fn new(opacity: f64, colormap: Colormap, max_label: u32) -> Result<Self> {
        validate_opacity(opacity)?;
        Ok(Self {
            alpha: (opacity / 100.0) as f32,
            colormap,
            max_label,
        })
    }

    /// Renders `image` (intensities in `[0, 1]`) as grayscale and, where
    /// `mask` is non-zero, mixes in the label colour:
    /// `out = (1 - alpha) * gray + alpha * colour`.
    ///
    /// # Errors
    ///
    /// [`ScreenshotError::ShapeMismatch`] when the planes differ in shape.
    pub fn blend(
        &self,
        image: &ArrayView2<'_, f32>,
        mask: Option<&ArrayView2<'_, u32>>,
    ) -> Result<RgbImage> {
        let (height, width) = image.dim();
        if let Some(mask) = mask {
            if mask.dim() != image.dim() {
                return Err(ScreenshotError::ShapeMismatch {
                    expected: image.shape().to_vec(),
                    actual: mask.shape().to_vec(),
                });
            }
        }

        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).flat_map(move |x| {
                    let gray = normalize_to_u8(image[[y, x]]);
                    let color =
                        mask.and_then(|mask| self.colormap.color(mask[[y, x]], self.max_label));
                    match color {
                        Some(color) => self.mix(gray, color).0,
                        None => [gray; 3],
                    }
                })
            })
            .collect();

        RgbImage::from_raw(width as u32, height as u32, pixel_data).ok_or_else(|| {
            ScreenshotError::ShapeMismatch {
                expected: vec![height, width, 3],
                actual: image.shape().to_vec(),
            }
        })
    }

    #[inline]
    fn mix(&self, gray: u8, color: Rgb<u8>) -> Rgb<u8> {
        let base = gray as f32;
        Rgb(color
            .0
            .map(|c| ((1.0 - self.alpha) * base + self.alpha * c as f32).round() as u8))
    }
}

#[inline]
fn normalize_to_u8(value: f32) -> u8 {
    if value.is_finite() {
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    } else {
        0
    }
}
