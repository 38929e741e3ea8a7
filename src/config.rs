//! Screenshot request configuration.
//!
//! A [`ScreenshotConfig`] can be built in code, read from a JSON file, or
//! filled from command line flags by the binary. Missing JSON fields take
//! their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bounding_box::validate_border;
use crate::compositor::validate_opacity;
use crate::enums::{Colormap, SortBy};
use crate::error::{Result, ScreenshotError};

pub const DEFAULT_BORDER_PC: f64 = 0.05;
pub const DEFAULT_MASK_OPACITY: f64 = 50.0;
pub const DEFAULT_OUTPUT: &str = "screenshot.png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Co-registered intensity images; the first is the geometric reference.
    pub images: Vec<PathBuf>,
    /// Label masks, either one for all images or one per image.
    pub masks: Vec<PathBuf>,
    pub output: PathBuf,
    /// Fraction of each axis added around the mask extent.
    pub border_pc: f64,
    /// Mask opacity in percent.
    pub mask_opacity: f64,
    pub colormap: Colormap,
    /// One row per anatomical axis instead of one row per image.
    pub axis_row: bool,
    /// Crop to the masks (plus border) instead of using the full volume.
    pub bounded: bool,
    pub sort_by: SortBy,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            masks: Vec::new(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            border_pc: DEFAULT_BORDER_PC,
            mask_opacity: DEFAULT_MASK_OPACITY,
            colormap: Colormap::default(),
            axis_row: false,
            bounded: false,
            sort_by: SortBy::default(),
        }
    }
}

impl ScreenshotConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|source| ScreenshotError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Splits a comma-separated path list, dropping empty entries.
    pub fn parse_path_list(list: &str) -> Vec<PathBuf> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    /// Checks everything that can be checked before reading any file.
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(ScreenshotError::MissingInput);
        }
        if !self.masks.is_empty() && self.masks.len() != 1 && self.masks.len() != self.images.len()
        {
            return Err(ScreenshotError::MaskCountMismatch {
                images: self.images.len(),
                masks: self.masks.len(),
            });
        }
        validate_border(self.border_pc)?;
        validate_opacity(self.mask_opacity)
    }

    /// Border used by the bounding box estimator, `None` when cropping is
    /// disabled.
    pub(crate) fn effective_border(&self) -> Option<f64> {
        self.bounded.then_some(self.border_pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(images: &str, masks: &str) -> ScreenshotConfig {
        ScreenshotConfig {
            images: ScreenshotConfig::parse_path_list(images),
            masks: ScreenshotConfig::parse_path_list(masks),
            ..Default::default()
        }
    }

    #[test]
    fn path_list_is_split_and_trimmed() {
        assert_eq!(
            ScreenshotConfig::parse_path_list("t1.nii.gz, t2.nii.gz,,flair.nii.gz"),
            vec![
                PathBuf::from("t1.nii.gz"),
                PathBuf::from("t2.nii.gz"),
                PathBuf::from("flair.nii.gz")
            ]
        );
    }

    #[test]
    fn missing_images_fail() {
        assert!(matches!(
            config_with("", "").validate(),
            Err(ScreenshotError::MissingInput)
        ));
    }

    #[test]
    fn mask_count_must_be_one_or_per_image() {
        assert!(config_with("a.nii,b.nii", "m.nii").validate().is_ok());
        assert!(config_with("a.nii,b.nii", "m.nii,n.nii").validate().is_ok());
        assert!(matches!(
            config_with("a.nii,b.nii,c.nii", "m.nii,n.nii").validate(),
            Err(ScreenshotError::MaskCountMismatch { images: 3, masks: 2 })
        ));
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let mut config = config_with("a.nii", "");
        config.border_pc = 1.0;
        assert!(matches!(config.validate(), Err(ScreenshotError::InvalidBorder(_))));

        config.border_pc = 0.1;
        config.mask_opacity = 120.0;
        assert!(matches!(config.validate(), Err(ScreenshotError::InvalidOpacity(_))));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config: ScreenshotConfig = serde_json::from_str(
            r#"{ "images": ["t1.nii.gz"], "colormap": "Hot", "bounded": true }"#,
        )
        .unwrap();
        assert_eq!(config.images, vec![PathBuf::from("t1.nii.gz")]);
        assert_eq!(config.colormap, Colormap::Hot);
        assert_eq!(config.border_pc, DEFAULT_BORDER_PC);
        assert_eq!(config.effective_border(), Some(DEFAULT_BORDER_PC));
        assert_eq!(config.sort_by, SortBy::ImagePositionPatient);
    }

    #[test]
    fn unbounded_config_has_no_border() {
        let config = config_with("a.nii", "");
        assert_eq!(config.effective_border(), None);
    }
}
