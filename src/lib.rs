//! # medvol-screenshot
//!
//! This crate turns co-registered medical volumes and optional segmentation
//! masks into a single preview image, ready for manuscripts and
//! presentations.
//!
//! Volumes are read from NIfTI-1 files (`.nii`, `.nii.gz`) or from DICOM
//! series (a directory of `.dcm` files). Before any pixel data is read, the
//! headers of all inputs are compared against the first image: size,
//! spacing, origin and direction have to agree.
//!
//! The screenshot is built in these steps:
//!  - Crop region: the union of the non-zero extents of all masks, padded
//!    by a fraction of each axis (or the full volume).
//!  - Representative slices: along every axis the index whose plane holds
//!    the most mask voxels, or the center of the crop without masks.
//!  - Slices in the three medical planes (sagittal, coronal and axial),
//!    resampled to square pixels so the physical aspect ratio is kept.
//!  - Blending of the mask labels over the grayscale slices with a
//!    configurable opacity and colormap.
//!  - A grid of all tiles, one row per image (or one row per axis).
//!
//! 2D inputs produce a single axial column.
//!
//! # Examples
//!
//! ## Screenshot of a T1 image with a tumor segmentation
//!
//! ```no_run
//! # use medvol_screenshot::{ScreenshotConfig, ScreenshotMaker};
//! let config = ScreenshotConfig {
//!     images: vec!["t1.nii.gz".into()],
//!     masks: vec!["tumor.nii.gz".into()],
//!     output: "t1_tumor.png".into(),
//!     bounded: true,
//!     border_pc: 0.1,
//!     ..Default::default()
//! };
//! let screenshot = ScreenshotMaker::new(config)
//!     .and_then(|maker| maker.run())
//!     .expect("should have written the screenshot");
//! println!("slices at {:?}", screenshot.slice_indices);
//! ```

pub mod alignment;
pub mod bounding_box;
pub mod compositor;
pub mod config;
pub mod enums;
pub mod error;
pub mod geometry;
mod interpolator;
pub mod montage;
mod nifti_reader;
pub mod screenshot;
pub mod slice_selector;
pub mod volume;
pub mod volume_loader;

pub use bounding_box::BoundingBox;
pub use config::ScreenshotConfig;
pub use enums::{Colormap, Orientation, SortBy};
pub use error::ScreenshotError;
pub use geometry::Geometry;
pub use screenshot::{Screenshot, ScreenshotMaker};
pub use slice_selector::SliceIndexTriple;
pub use volume::{Mask, Volume};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
