//! Geometry agreement checks between a reference image and the other inputs.

use log::debug;

use crate::error::{Result, ScreenshotError};
use crate::geometry::Geometry;

/// Fails with [`ScreenshotError::AlignmentMismatch`] on the first candidate
/// whose size, spacing, origin or direction differs from `reference`.
pub fn check_alignment(reference: &Geometry, candidates: &[(String, Geometry)]) -> Result<()> {
    for (input, geometry) in candidates {
        if let Some(property) = reference.first_mismatch(geometry) {
            return Err(ScreenshotError::AlignmentMismatch {
                input: input.clone(),
                property,
            });
        }
        debug!("{input} is aligned with the reference image");
    }
    Ok(())
}

/// Checks the images first; masks are only looked at once every image
/// passed.
pub fn check_images_and_masks(
    reference: &Geometry,
    images: &[(String, Geometry)],
    masks: &[(String, Geometry)],
) -> Result<()> {
    check_alignment(reference, images)?;
    check_alignment(reference, masks)
}
