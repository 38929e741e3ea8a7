use std::fmt;

use crate::bounding_box::BoundingBox;

/// Absolute tolerance for spacing, origin and direction comparisons. Header
/// values are stored in single precision by both NIfTI and most DICOM writers.
pub const GEOMETRY_TOLERANCE: f64 = 1e-4;

pub const IDENTITY_DIRECTION: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Spatial metadata of a volume. All per-axis arrays are ordered `[x, y, z]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub size: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    /// Row-major 3x3 matrix whose columns are the x, y and z axis directions.
    pub direction: [f64; 9],
    /// 2 for planar images (size\[2\] is then 1), 3 otherwise.
    pub ndim: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryProperty {
    Dimension,
    Size,
    Spacing,
    Origin,
    Direction,
}

impl fmt::Display for GeometryProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryProperty::Dimension => "dimension",
            GeometryProperty::Size => "size",
            GeometryProperty::Spacing => "spacing",
            GeometryProperty::Origin => "origin",
            GeometryProperty::Direction => "direction",
        };
        f.write_str(name)
    }
}

impl Geometry {
    /// Unit spacing, zero origin and identity direction.
    pub fn with_size(size: [usize; 3]) -> Self {
        Self {
            size,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            direction: IDENTITY_DIRECTION,
            ndim: if size[2] == 1 { 2 } else { 3 },
        }
    }

    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_direction(mut self, direction: [f64; 9]) -> Self {
        self.direction = direction;
        self
    }

    pub fn is_2d(&self) -> bool {
        self.ndim == 2
    }

    /// First property, in the order dimension, size, spacing, origin,
    /// direction, on which `other` disagrees with `self`.
    pub fn first_mismatch(&self, other: &Geometry) -> Option<GeometryProperty> {
        if self.ndim != other.ndim {
            Some(GeometryProperty::Dimension)
        } else if self.size != other.size {
            Some(GeometryProperty::Size)
        } else if !approx_eq(&self.spacing, &other.spacing) {
            Some(GeometryProperty::Spacing)
        } else if !approx_eq(&self.origin, &other.origin) {
            Some(GeometryProperty::Origin)
        } else if !approx_eq(&self.direction, &other.direction) {
            Some(GeometryProperty::Direction)
        } else {
            None
        }
    }

    /// Geometry of the sub-volume covered by `bbox`. The origin moves to the
    /// physical position of the box's first voxel.
    pub fn cropped(&self, bbox: &BoundingBox) -> Geometry {
        let mut origin = self.origin;
        for (row, value) in origin.iter_mut().enumerate() {
            for axis in 0..3 {
                *value += self.direction[row * 3 + axis]
                    * self.spacing[axis]
                    * bbox.min[axis] as f64;
            }
        }
        Geometry {
            size: bbox.extent(),
            origin,
            ..self.clone()
        }
    }
}

fn approx_eq(a: &[f64], b: &[f64]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| (x - y).abs() <= GEOMETRY_TOLERANCE)
}
