//! Request-level errors.
//!
//! Every error is fatal to the screenshot request that raised it: nothing is
//! retried and no partial output is written.

use std::path::PathBuf;

use thiserror::Error;

use crate::enums::Orientation;
use crate::geometry::GeometryProperty;
use crate::volume_loader::VolumeLoaderError;

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("No input images supplied")]
    MissingInput,

    #[error("{input} does not match the reference image: {property} differs")]
    AlignmentMismatch {
        input: String,
        property: GeometryProperty,
    },

    #[error("Mask {input} has no non-zero voxels")]
    EmptyMask { input: String },

    #[error("Border fraction must lie in [0, 1), got {0}")]
    InvalidBorder(f64),

    #[error("Mask opacity must lie in [0, 100], got {0}")]
    InvalidOpacity(f64),

    #[error("Got {masks} masks for {images} images, expected 1 or {images}")]
    MaskCountMismatch { images: usize, masks: usize },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Slice {index} lies outside the volume along the {orientation:?} axis")]
    SliceOutOfRange {
        orientation: Orientation,
        index: usize,
    },

    #[error("Could not read config {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Loader error: {0}")]
    Loader(#[from] VolumeLoaderError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScreenshotError>;
