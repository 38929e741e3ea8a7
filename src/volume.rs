use crate::bounding_box::BoundingBox;
use crate::enums::Orientation;
use crate::geometry::Geometry;

use log::warn;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use std::path::{Path, PathBuf};

/// Scalar volume with its spatial metadata. Voxels are indexed
/// `[z, y, x]` (depth, height, width).
#[derive(Debug, Clone)]
pub struct Volume<T = f32> {
    pub data: Array3<T>,
    pub geometry: Geometry,
    pub source: Option<PathBuf>,
}

/// Label volume registered to an image.
pub type Mask = Volume<u32>;

impl<T> Volume<T> {
    /// Wraps `data` with `geometry`. The geometry's size is taken from the
    /// array so the two can never disagree.
    pub fn new(data: Array3<T>, geometry: Geometry) -> Self {
        let (depth, height, width) = data.dim();
        Self {
            data,
            geometry: Geometry {
                size: [width, height, depth],
                ..geometry
            },
            source: None,
        }
    }

    /// Volume with unit spacing, zero origin and identity direction.
    pub fn from_array(data: Array3<T>) -> Self {
        let (depth, height, width) = data.dim();
        Self::new(data, Geometry::with_size([width, height, depth]))
    }

    pub fn with_source(mut self, source: impl AsRef<Path>) -> Self {
        self.source = Some(source.as_ref().to_path_buf());
        self
    }

    /// Name used in error messages.
    pub fn label(&self) -> String {
        self.source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<in-memory volume>".to_string())
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn is_2d(&self) -> bool {
        self.geometry.is_2d()
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, T>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice_result = match orientation {
            Orientation::Axial => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
            Orientation::Sagittal => self.data.slice(s![.., .., index]),
        };
        Some(slice_result)
    }

    /// Physical (row, column) spacing of a plane taken along `orientation`.
    pub fn plane_spacing(&self, orientation: Orientation) -> (f64, f64) {
        let [x, y, z] = self.geometry.spacing;
        match orientation {
            Orientation::Axial => (y, x),
            Orientation::Coronal => (z, x),
            Orientation::Sagittal => (z, y),
        }
    }

    fn is_valid_index(&self, index: usize, orientation: Orientation) -> bool {
        let dim = self.data.dim();
        let max_index = match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        };
        index < max_index
    }
}

impl<T: Clone> Volume<T> {
    /// Copies out the voxels covered by `bbox`.
    ///
    /// # Panics
    ///
    /// If `bbox` reaches outside the volume.
    pub fn crop(&self, bbox: &BoundingBox) -> Volume<T> {
        let data = self
            .data
            .slice(s![
                bbox.min[2]..=bbox.max[2],
                bbox.min[1]..=bbox.max[1],
                bbox.min[0]..=bbox.max[0]
            ])
            .to_owned();
        Volume {
            data,
            geometry: self.geometry.cropped(bbox),
            source: self.source.clone(),
        }
    }
}

impl Volume<f32> {
    /// Linear min-max rescale to `[0, 1]`. Non-finite voxels map to 0. A
    /// constant volume rescales to all zeros.
    pub fn rescale_intensity(&self) -> Volume<f32> {
        let (min, max) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            });
        let range = max - min;

        let mut data = self.data.clone();
        if range.is_finite() && range > 0.0 {
            data.par_mapv_inplace(|v| {
                if v.is_finite() {
                    ((v - min) / range).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            });
        } else {
            warn!("{} has a constant intensity, rescaling to zero", self.label());
            data.fill(0.0);
        }

        Volume {
            data,
            geometry: self.geometry.clone(),
            source: self.source.clone(),
        }
    }

    /// Rounds every voxel to the nearest non-negative integer label.
    pub fn to_labels(&self) -> Mask {
        Volume {
            data: self.data.mapv(|v| {
                if v.is_finite() && v > 0.0 {
                    v.round() as u32
                } else {
                    0
                }
            }),
            geometry: self.geometry.clone(),
            source: self.source.clone(),
        }
    }
}

impl Mask {
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }
}
