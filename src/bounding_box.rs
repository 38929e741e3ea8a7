//! Crop region estimation over a stack of registered masks.

use log::debug;

use crate::error::{Result, ScreenshotError};
use crate::geometry::Geometry;
use crate::volume::Mask;

/// Inclusive voxel index range per axis, ordered `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: [usize; 3],
    pub max: [usize; 3],
}

impl BoundingBox {
    /// The whole volume: `[0, size - 1]` on every axis.
    pub fn full(size: [usize; 3]) -> Self {
        Self {
            min: [0; 3],
            max: size.map(|s| s.saturating_sub(1)),
        }
    }

    /// Builds a box from `[xmin, xmax, ymin, ymax, zmin, zmax]`.
    pub fn from_array(bounds: [usize; 6]) -> Self {
        Self {
            min: [bounds[0], bounds[2], bounds[4]],
            max: [bounds[1], bounds[3], bounds[5]],
        }
    }

    /// `[xmin, xmax, ymin, ymax, zmin, zmax]`
    pub fn to_array(&self) -> [usize; 6] {
        [
            self.min[0],
            self.max[0],
            self.min[1],
            self.max[1],
            self.min[2],
            self.max[2],
        ]
    }

    /// Number of voxels covered along each axis.
    pub fn extent(&self) -> [usize; 3] {
        [0, 1, 2].map(|axis| self.max[axis] - self.min[axis] + 1)
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
    }

    fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: [0, 1, 2].map(|axis| self.min[axis].min(other.min[axis])),
            max: [0, 1, 2].map(|axis| self.max[axis].max(other.max[axis])),
        }
    }

    /// Pads every axis by `round(border_pc * size)` voxels on both sides and
    /// clamps the result to `[0, size - 1]`.
    pub fn expanded(&self, border_pc: f64, size: [usize; 3]) -> BoundingBox {
        let mut expanded = *self;
        for axis in 0..3 {
            let pad = (border_pc * size[axis] as f64).round() as usize;
            expanded.min[axis] = self.min[axis].saturating_sub(pad);
            expanded.max[axis] = (self.max[axis] + pad).min(size[axis].saturating_sub(1));
        }
        expanded
    }
}

pub fn validate_border(border_pc: f64) -> Result<()> {
    if border_pc.is_finite() && (0.0..1.0).contains(&border_pc) {
        Ok(())
    } else {
        Err(ScreenshotError::InvalidBorder(border_pc))
    }
}

/// Smallest box holding every non-zero voxel of `mask`, or `None` when the
/// mask is empty.
pub fn nonzero_extent(mask: &Mask) -> Option<BoundingBox> {
    mask.data
        .indexed_iter()
        .filter(|&(_, &label)| label != 0)
        .map(|((z, y, x), _)| BoundingBox {
            min: [x, y, z],
            max: [x, y, z],
        })
        .reduce(|acc, voxel| acc.union(&voxel))
}

/// Computes the crop region for a screenshot.
///
/// Without masks the full extent of `geometry` is the starting range;
/// otherwise the union of the masks' non-zero extents is. The range is then
/// padded by `border_pc` when one is given.
///
/// # Errors
///
/// [`ScreenshotError::InvalidBorder`] for a border outside `[0, 1)` and
/// [`ScreenshotError::EmptyMask`] when any mask has no non-zero voxel.
pub fn estimate_bounding_box(
    geometry: &Geometry,
    masks: &[Mask],
    border_pc: Option<f64>,
) -> Result<BoundingBox> {
    if let Some(border_pc) = border_pc {
        validate_border(border_pc)?;
    }

    let mut bbox: Option<BoundingBox> = None;
    for mask in masks {
        let extent = nonzero_extent(mask).ok_or_else(|| ScreenshotError::EmptyMask {
            input: mask.label(),
        })?;
        bbox = Some(match bbox {
            Some(current) => current.union(&extent),
            None => extent,
        });
    }
    let bbox = bbox.unwrap_or_else(|| BoundingBox::full(geometry.size));

    let bbox = match border_pc {
        Some(border_pc) => bbox.expanded(border_pc, geometry.size),
        None => bbox,
    };
    debug!("Bounding box: {:?}", bbox.to_array());
    Ok(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;
    use ndarray::{Array3, s};

    fn mask_with_block(
        dim: (usize, usize, usize),
        z: (usize, usize),
        y: (usize, usize),
        x: (usize, usize),
    ) -> Mask {
        let mut data = Array3::<u32>::zeros(dim);
        data.slice_mut(s![z.0..=z.1, y.0..=y.1, x.0..=x.1]).fill(1);
        Volume::from_array(data)
    }

    #[test]
    fn no_mask_and_no_border_uses_full_extent() {
        let geometry = Geometry::with_size([7, 8, 9]);
        let bbox = estimate_bounding_box(&geometry, &[], None).unwrap();
        assert_eq!(bbox.to_array(), [0, 6, 0, 7, 0, 8]);
    }

    #[test]
    fn mask_extent_is_tight() {
        let mask = mask_with_block((10, 10, 10), (1, 3), (4, 6), (2, 5));
        let bbox = estimate_bounding_box(&mask.geometry, &[mask.clone()], Some(0.0)).unwrap();
        assert_eq!(bbox.to_array(), [2, 5, 4, 6, 1, 3]);
    }

    #[test]
    fn union_of_masks_covers_all_of_them() {
        let first = mask_with_block((10, 10, 10), (1, 1), (1, 1), (1, 1));
        let second = mask_with_block((10, 10, 10), (8, 8), (5, 5), (7, 7));
        let bbox = estimate_bounding_box(&first.geometry, &[first.clone(), second], None).unwrap();
        assert_eq!(bbox.to_array(), [1, 7, 1, 5, 1, 8]);
    }

    #[test]
    fn single_voxel_collapses_to_single_voxel_box() {
        let mask = mask_with_block((10, 10, 10), (5, 5), (5, 5), (5, 5));
        let bbox = estimate_bounding_box(&mask.geometry, &[mask.clone()], Some(0.0)).unwrap();
        assert_eq!(bbox.to_array(), [5, 5, 5, 5, 5, 5]);
    }

    #[test]
    fn empty_mask_fails() {
        let mask =
            Volume::from_array(Array3::<u32>::zeros((4, 4, 4))).with_source("empty.nii.gz");
        let result = estimate_bounding_box(&mask.geometry, &[mask.clone()], None);
        match result {
            Err(ScreenshotError::EmptyMask { input }) => assert_eq!(input, "empty.nii.gz"),
            other => panic!("expected EmptyMask, got {other:?}"),
        }
    }

    #[test]
    fn border_out_of_range_fails() {
        let geometry = Geometry::with_size([4, 4, 4]);
        for border in [-0.1, 1.0, 2.5, f64::NAN] {
            assert!(matches!(
                estimate_bounding_box(&geometry, &[], Some(border)),
                Err(ScreenshotError::InvalidBorder(_))
            ));
        }
    }

    #[test]
    fn border_expands_symmetrically_and_clamps() {
        let mask = mask_with_block((10, 20, 10), (0, 1), (8, 9), (4, 5));
        let bbox = estimate_bounding_box(&mask.geometry, &[mask.clone()], Some(0.1)).unwrap();
        // x pads 1, y pads 2, z pads 1 and hits the lower edge
        assert_eq!(bbox.to_array(), [3, 6, 6, 11, 0, 2]);
    }

    #[test]
    fn expanded_box_is_superset_within_bounds() {
        let mask = mask_with_block((12, 9, 15), (3, 8), (0, 4), (6, 14));
        let tight = estimate_bounding_box(&mask.geometry, &[mask.clone()], None).unwrap();
        let full = BoundingBox::full(mask.geometry.size);
        for step in 0..20 {
            let border = step as f64 * 0.05;
            let expanded =
                estimate_bounding_box(&mask.geometry, &[mask.clone()], Some(border)).unwrap();
            assert!(expanded.contains(&tight), "border {border}");
            assert!(full.contains(&expanded), "border {border}");
        }
    }
}
