//! End-to-end screenshot pipeline.

use std::path::PathBuf;

use image::RgbImage;
use log::{debug, info};
use ndarray::Array2;

use crate::alignment::check_images_and_masks;
use crate::bounding_box::{BoundingBox, estimate_bounding_box};
use crate::compositor::SliceCompositor;
use crate::config::ScreenshotConfig;
use crate::enums::Orientation;
use crate::error::{Result, ScreenshotError};
use crate::geometry::Geometry;
use crate::interpolator::Interpolator;
use crate::montage;
use crate::slice_selector::{SliceIndexTriple, select_by_coverage, select_center};
use crate::volume::{Mask, Volume};
use crate::volume_loader::VolumeLoader;

/// Result of one screenshot request.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub bounding_box: BoundingBox,
    /// Representative slice per axis, in source volume indices.
    pub slice_indices: SliceIndexTriple,
    pub image: RgbImage,
}

pub struct ScreenshotMaker {
    config: ScreenshotConfig,
}

impl ScreenshotMaker {
    pub fn new(config: ScreenshotConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Loads the inputs, renders the montage and writes it to the configured
    /// output path.
    pub fn run(&self) -> Result<Screenshot> {
        let (images, masks) = self.load_inputs()?;
        let screenshot = self.render(&images, &masks)?;
        screenshot.image.save(&self.config.output)?;
        info!(
            "Wrote {}x{} screenshot to {}",
            screenshot.image.width(),
            screenshot.image.height(),
            self.config.output.display()
        );
        Ok(screenshot)
    }

    /// Checks alignment from the file headers, then loads every image
    /// (rescaled to `[0, 1]`) and every mask.
    pub fn load_inputs(&self) -> Result<(Vec<Volume<f32>>, Vec<Mask>)> {
        let sort_by = self.config.sort_by;
        let (reference_path, other_paths) = self
            .config
            .images
            .split_first()
            .ok_or(ScreenshotError::MissingInput)?;

        let reference = VolumeLoader::read_geometry(reference_path, sort_by)?;
        let read_geometries = |paths: &[PathBuf]| -> Result<Vec<(String, Geometry)>> {
            paths
                .iter()
                .map(|path| {
                    let geometry = VolumeLoader::read_geometry(path, sort_by)?;
                    Ok((path.display().to_string(), geometry))
                })
                .collect()
        };
        check_images_and_masks(
            &reference,
            &read_geometries(other_paths)?,
            &read_geometries(self.config.masks.as_slice())?,
        )?;

        let images = self
            .config
            .images
            .iter()
            .map(|path| Ok(VolumeLoader::load_image(path, sort_by)?.rescale_intensity()))
            .collect::<Result<Vec<_>>>()?;
        let masks = self
            .config
            .masks
            .iter()
            .map(|path| Ok(VolumeLoader::load_mask(path, sort_by)?))
            .collect::<Result<Vec<_>>>()?;
        Ok((images, masks))
    }

    /// Renders already loaded volumes. Images are expected to be rescaled to
    /// `[0, 1]`.
    ///
    /// Rows hold the plain images first and, when masks are given, the
    /// images blended with their masks afterwards. Columns are the sagittal,
    /// coronal and axial planes (only axial for 2D inputs).
    pub fn render(&self, images: &[Volume<f32>], masks: &[Mask]) -> Result<Screenshot> {
        let (reference, others) = images.split_first().ok_or(ScreenshotError::MissingInput)?;
        if masks.len() > 1 && masks.len() != images.len() {
            return Err(ScreenshotError::MaskCountMismatch {
                images: images.len(),
                masks: masks.len(),
            });
        }
        check_images_and_masks(&reference.geometry, &describe(others), &describe(masks))?;

        let bounding_masks: &[Mask] = if self.config.bounded { masks } else { &[] };
        let bbox = estimate_bounding_box(
            &reference.geometry,
            bounding_masks,
            self.config.effective_border(),
        )?;

        let cropped_images: Vec<_> = images.iter().map(|image| image.crop(&bbox)).collect();
        let cropped_masks: Vec<_> = masks.iter().map(|mask| mask.crop(&bbox)).collect();

        let is_2d = reference.is_2d();
        let local_indices = if cropped_masks.is_empty() {
            select_center(bbox.extent(), is_2d)
        } else {
            select_by_coverage(&cropped_masks, is_2d)?
        };
        let slice_indices = local_indices.offset_by(&bbox);
        debug!(
            "Representative slices: {:?} (bounding box {:?})",
            slice_indices,
            bbox.to_array()
        );

        let max_label = masks.iter().map(Mask::max_label).max().unwrap_or(0);
        let compositor =
            SliceCompositor::new(self.config.mask_opacity, self.config.colormap, max_label)?;
        let orientations: &[Orientation] = if is_2d {
            &[Orientation::Axial]
        } else {
            &Orientation::ALL
        };

        let mut rows = Vec::with_capacity(images.len() * 2);
        for image in &cropped_images {
            rows.push(render_row(image, None, &local_indices, orientations, &compositor)?);
        }
        for (index, image) in cropped_images.iter().enumerate() {
            let Some(mask) = cropped_masks.get(index).or(cropped_masks.first()) else {
                break;
            };
            rows.push(render_row(image, Some(mask), &local_indices, orientations, &compositor)?);
        }

        Ok(Screenshot {
            bounding_box: bbox,
            slice_indices,
            image: montage::assemble(rows, self.config.axis_row),
        })
    }
}

fn describe<T>(volumes: &[Volume<T>]) -> Vec<(String, Geometry)> {
    volumes
        .iter()
        .map(|volume| (volume.label(), volume.geometry.clone()))
        .collect()
}

fn render_row(
    image: &Volume<f32>,
    mask: Option<&Mask>,
    indices: &SliceIndexTriple,
    orientations: &[Orientation],
    compositor: &SliceCompositor,
) -> Result<Vec<RgbImage>> {
    orientations
        .iter()
        .map(|&orientation| {
            let index = indices.along(orientation);
            let out_of_range = || ScreenshotError::SliceOutOfRange { orientation, index };
            let spacing = image.plane_spacing(orientation);

            let plane = image
                .get_slice_from_axis(index, orientation)
                .ok_or_else(out_of_range)?;
            let plane = Interpolator::resample_image(&plane, spacing);

            let mask_plane = match mask {
                Some(mask) => {
                    let plane = mask
                        .get_slice_from_axis(index, orientation)
                        .ok_or_else(out_of_range)?;
                    Some(Interpolator::resample_labels(&plane, spacing))
                }
                None => None,
            };
            let mask_view = mask_plane.as_ref().map(Array2::view);

            compositor.blend(&plane.view(), mask_view.as_ref())
        })
        .collect()
}
