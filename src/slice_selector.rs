//! Picks the slice along each axis that best shows the content.

use log::debug;
use ndarray::{Array3, ArrayView1, Axis, Zip};

use crate::bounding_box::BoundingBox;
use crate::enums::Orientation;
use crate::error::{Result, ScreenshotError};
use crate::volume::Mask;

/// One representative index per axis. In 2D mode `z` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceIndexTriple {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl SliceIndexTriple {
    /// Index of the fixed axis for a plane with the given orientation.
    pub fn along(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Sagittal => self.x,
            Orientation::Coronal => self.y,
            Orientation::Axial => self.z,
        }
    }

    /// Converts indices relative to `bbox` back to source volume indices.
    pub fn offset_by(&self, bbox: &BoundingBox) -> SliceIndexTriple {
        SliceIndexTriple {
            x: self.x + bbox.min[0],
            y: self.y + bbox.min[1],
            z: self.z + bbox.min[2],
        }
    }
}

/// Center of a volume with the given `[x, y, z]` extent: `round(extent / 2)`
/// with ties to even, clamped to the last valid index.
pub fn select_center(extent: [usize; 3], is_2d: bool) -> SliceIndexTriple {
    let center = |len: usize| {
        let rounded = (len as f64 / 2.0).round_ties_even() as usize;
        rounded.min(len.saturating_sub(1))
    };
    SliceIndexTriple {
        x: center(extent[0]),
        y: center(extent[1]),
        z: if is_2d { 0 } else { center(extent[2]) },
    }
}

/// For every axis, the index whose orthogonal plane holds the most voxels
/// that are non-zero in at least one of `masks`. Ties go to the lowest index.
///
/// # Errors
///
/// [`ScreenshotError::EmptyMask`] when no mask has a non-zero voxel and
/// [`ScreenshotError::ShapeMismatch`] when the masks differ in shape.
pub fn select_by_coverage(masks: &[Mask], is_2d: bool) -> Result<SliceIndexTriple> {
    let first = masks.first().ok_or(ScreenshotError::MissingInput)?;
    let mut occupied = Array3::<u32>::zeros(first.dim());
    for mask in masks {
        if mask.dim() != first.dim() {
            return Err(ScreenshotError::ShapeMismatch {
                expected: first.data.shape().to_vec(),
                actual: mask.data.shape().to_vec(),
            });
        }
        Zip::from(&mut occupied)
            .and(&mask.data)
            .par_for_each(|occupied, &label| {
                if label != 0 {
                    *occupied = 1;
                }
            });
    }

    if occupied.iter().all(|&v| v == 0) {
        return Err(ScreenshotError::EmptyMask {
            input: first.label(),
        });
    }

    // occupied is indexed [z, y, x]
    let per_x = occupied.sum_axis(Axis(0)).sum_axis(Axis(0));
    let per_y = occupied.sum_axis(Axis(2)).sum_axis(Axis(0));
    let per_z = occupied.sum_axis(Axis(2)).sum_axis(Axis(1));

    let indices = SliceIndexTriple {
        x: first_max_index(per_x.view()),
        y: first_max_index(per_y.view()),
        z: if is_2d { 0 } else { first_max_index(per_z.view()) },
    };
    debug!("Representative slices by coverage: {indices:?}");
    Ok(indices)
}

fn first_max_index(counts: ArrayView1<'_, u32>) -> usize {
    let mut max_count = 0;
    let mut max_index = 0;
    for (index, &count) in counts.iter().enumerate() {
        if count > max_count {
            max_count = count;
            max_index = index;
        }
    }
    max_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;
    use ndarray::s;

    #[test]
    fn center_rounds_half_to_even() {
        assert_eq!(
            select_center([10, 5, 7], false),
            SliceIndexTriple { x: 5, y: 2, z: 4 }
        );
    }

    #[test]
    fn center_is_clamped_for_single_voxel_axes() {
        assert_eq!(
            select_center([1, 2, 1], false),
            SliceIndexTriple { x: 0, y: 1, z: 0 }
        );
    }

    #[test]
    fn center_ignores_z_in_2d() {
        assert_eq!(select_center([4, 6, 1], true).z, 0);
    }

    #[test]
    fn rectangular_region_selects_index_inside_it() {
        let mut data = Array3::<u32>::zeros((10, 10, 10));
        data.slice_mut(s![3..7, 1..9, 2..=5]).fill(1);
        let indices = select_by_coverage(&[Volume::from_array(data)], false).unwrap();
        assert!((2..=5).contains(&indices.x));
        // equal area on every covered index, so the lowest wins
        assert_eq!(indices, SliceIndexTriple { x: 2, y: 1, z: 3 });
    }

    #[test]
    fn largest_plane_wins_on_every_axis() {
        let mut data = Array3::<u32>::zeros((6, 6, 6));
        data[[0, 0, 0]] = 1;
        data.slice_mut(s![4, 2..6, 1..5]).fill(2);
        data.slice_mut(s![1..5, 3, 3]).fill(2);
        let indices = select_by_coverage(&[Volume::from_array(data)], false).unwrap();
        assert_eq!(indices, SliceIndexTriple { x: 3, y: 3, z: 4 });
    }

    #[test]
    fn coverage_uses_union_of_masks() {
        let mut first = Array3::<u32>::zeros((1, 4, 4));
        first[[0, 0, 0]] = 1;
        let mut second = Array3::<u32>::zeros((1, 4, 4));
        second.slice_mut(s![0, 2, ..]).fill(1);
        let masks = [Volume::from_array(first), Volume::from_array(second)];
        let indices = select_by_coverage(&masks, true).unwrap();
        assert_eq!(indices, SliceIndexTriple { x: 0, y: 2, z: 0 });
    }

    #[test]
    fn empty_stack_fails() {
        let mask = Volume::from_array(Array3::<u32>::zeros((3, 3, 3)));
        assert!(matches!(
            select_by_coverage(&[mask], false),
            Err(ScreenshotError::EmptyMask { .. })
        ));
    }

    #[test]
    fn mismatched_shapes_fail() {
        let masks = [
            Volume::from_array(Array3::<u32>::ones((3, 3, 3))),
            Volume::from_array(Array3::<u32>::ones((3, 3, 4))),
        ];
        assert!(matches!(
            select_by_coverage(&masks, false),
            Err(ScreenshotError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn offset_restores_source_indices() {
        let local = SliceIndexTriple { x: 0, y: 1, z: 2 };
        let bbox = BoundingBox::from_array([5, 5, 3, 9, 0, 4]);
        assert_eq!(local.offset_by(&bbox), SliceIndexTriple { x: 5, y: 4, z: 2 });
    }
}
