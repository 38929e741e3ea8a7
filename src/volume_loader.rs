use crate::{
    enums::SortBy,
    geometry::Geometry,
    nifti_reader,
    volume::{Mask, Volume},
};

use dicom::{
    core::Tag,
    object::{FileDicomObject, InMemDicomObject, OpenFileOptions, open_file},
    pixeldata::{ConvertOptions, PixelDecoder},
};
use dicom_dictionary_std::tags;
use log::{debug, info};
use ndarray::{Array2, Array3, s};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("Unsupported input {0}: expected a .nii/.nii.gz file, a .dcm file or a DICOM directory")]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Could not decode pixel data: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeFormat {
    Nifti,
    Dicom,
}

impl VolumeFormat {
    fn detect(path: &Path) -> Result<Self, VolumeLoaderError> {
        if path.is_dir() {
            return Ok(VolumeFormat::Dicom);
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Ok(VolumeFormat::Nifti)
        } else if name.ends_with(".dcm") {
            Ok(VolumeFormat::Dicom)
        } else {
            Err(VolumeLoaderError::UnsupportedFormat(path.to_path_buf()))
        }
    }
}

/// Per-slice attributes needed to order a series and derive its geometry.
#[derive(Debug, Clone)]
struct SliceHeader {
    order: Option<f64>,
    position: Option<[f64; 3]>,
    orientation: Option<[f64; 6]>,
    pixel_spacing: Option<[f64; 2]>,
    spacing_between_slices: Option<f64>,
    slice_thickness: Option<f64>,
    rows: usize,
    columns: usize,
}

impl SliceHeader {
    fn from_object(dicom_object: &InMemDicomObject, sort_by: SortBy) -> Option<Self> {
        let rows = dicom_object.element(tags::ROWS).ok()?.to_int::<u16>().ok()? as usize;
        let columns = dicom_object.element(tags::COLUMNS).ok()?.to_int::<u16>().ok()? as usize;
        let position = multi_float::<3>(dicom_object, tags::IMAGE_POSITION_PATIENT);
        let orientation = multi_float::<6>(dicom_object, tags::IMAGE_ORIENTATION_PATIENT);

        let order = match sort_by {
            SortBy::ImagePositionPatient => position.map(|position| match orientation {
                Some(orientation) => dot(&position, &slice_normal(&orientation)),
                None => position[2],
            }),
            SortBy::TablePosition => single_float(dicom_object, tags::TABLE_POSITION),
            SortBy::InstanceNumber => dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()
                .and_then(|element| element.to_int::<i32>().ok())
                .map(f64::from),
            SortBy::None => None,
        };

        Some(Self {
            order,
            position,
            orientation,
            pixel_spacing: multi_float::<2>(dicom_object, tags::PIXEL_SPACING),
            spacing_between_slices: single_float(dicom_object, tags::SPACING_BETWEEN_SLICES),
            slice_thickness: single_float(dicom_object, tags::SLICE_THICKNESS),
            rows,
            columns,
        })
    }
}

fn multi_float<const N: usize>(dicom_object: &InMemDicomObject, tag: Tag) -> Option<[f64; N]> {
    let values = dicom_object.element(tag).ok()?.to_multi_float64().ok()?;
    values.get(..N)?.try_into().ok()
}

fn single_float(dicom_object: &InMemDicomObject, tag: Tag) -> Option<f64> {
    dicom_object.element(tag).ok()?.to_float64().ok()
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn slice_normal(orientation: &[f64; 6]) -> [f64; 3] {
    let (r, c) = (&orientation[..3], &orientation[3..]);
    [
        r[1] * c[2] - r[2] * c[1],
        r[2] * c[0] - r[0] * c[2],
        r[0] * c[1] - r[1] * c[0],
    ]
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Read only the spatial metadata of an image or mask. NIfTI files are
    /// read up to the end of the header, DICOM files up to the pixel data.
    pub fn read_geometry(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Geometry, VolumeLoaderError> {
        let path = path.as_ref();
        match VolumeFormat::detect(path)? {
            VolumeFormat::Nifti => nifti_reader::read_geometry(path),
            VolumeFormat::Dicom => {
                let mut headers = Vec::new();
                for file in Self::dicom_paths(path)? {
                    let dicom_object = OpenFileOptions::new()
                        .read_until(tags::PIXEL_DATA)
                        .open_file(&file)?;
                    headers.extend(SliceHeader::from_object(&dicom_object, sort_by));
                }
                if headers.is_empty() {
                    return Err(VolumeLoaderError::NoValidImages);
                }
                Self::sort_slices(&mut headers, |header| header, sort_by);
                let headers: Vec<_> = headers.iter().collect();
                Self::validate_dimensions(&headers)?;
                Self::series_geometry(&headers)
            }
        }
    }

    /// Load an intensity image from a NIfTI file, a DICOM file or a DICOM
    /// directory.
    pub fn load_image(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume<f32>, VolumeLoaderError> {
        let path = path.as_ref();
        let volume = match VolumeFormat::detect(path)? {
            VolumeFormat::Nifti => nifti_reader::load(path)?,
            VolumeFormat::Dicom => Self::load_from_directory(path, sort_by)?,
        };
        info!(
            "Loaded {} with size {:?} and spacing {:?}",
            path.display(),
            volume.geometry.size,
            volume.geometry.spacing
        );
        Ok(volume.with_source(path))
    }

    /// Load a label volume. Voxel values are rounded to non-negative integers.
    pub fn load_mask(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Mask, VolumeLoaderError> {
        Ok(Self::load_image(path, sort_by)?.to_labels())
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent or
    /// no pixel spacing is present
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume<f32>, VolumeLoaderError> {
        let mut images_with_header = dicom_objects
            .iter()
            .filter_map(|dicom_object| {
                Self::extract_image_with_header(dicom_object, sort_by).transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        if images_with_header.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut images_with_header, |(header, _)| header, sort_by);

        let headers: Vec<_> = images_with_header.iter().map(|(header, _)| header).collect();
        Self::validate_dimensions(&headers)?;
        let geometry = Self::series_geometry(&headers)?;

        let images: Vec<_> = images_with_header
            .into_iter()
            .map(|(_, image)| image)
            .collect();
        let volume_array = Self::build_volume_array(&images)?;

        Ok(Volume::new(volume_array, geometry))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Volume<f32>, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files, or from a single
    /// .dcm file
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume<f32>, VolumeLoaderError> {
        Self::load_from_file_paths(&Self::dicom_paths(path.as_ref())?, sort_by)
    }

    fn dicom_paths(path: &Path) -> Result<Vec<PathBuf>, VolumeLoaderError> {
        if !path.is_dir() {
            return Ok(vec![path.to_path_buf()]);
        }
        let mut paths: Vec<_> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        paths.sort();
        debug!("Found {} DICOM files in {}", paths.len(), path.display());
        Ok(paths)
    }

    /// `Ok(None)` for objects without an image (no Rows or Columns). Objects
    /// that do describe an image must decode, or the whole series fails.
    fn extract_image_with_header(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Result<Option<(SliceHeader, Array2<f32>)>, VolumeLoaderError> {
        let Some(header) = SliceHeader::from_object(dicom_object, sort_by) else {
            debug!("Skipping DICOM object without image dimensions");
            return Ok(None);
        };
        let image_2d = Self::decode_image(dicom_object)?;
        Ok(Some((header, image_2d)))
    }

    fn decode_image(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Array2<f32>, VolumeLoaderError> {
        let pixel_data = dicom_object.decode_pixel_data()?;
        let options = ConvertOptions::new();
        let frames = pixel_data.to_ndarray_with_options::<f32>(&options)?;
        Ok(frames.slice_move(s![0, .., .., 0]))
    }

    fn sort_slices<T>(slices: &mut [T], header: impl Fn(&T) -> &SliceHeader, sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                header(a)
                    .order
                    .partial_cmp(&header(b).order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    fn validate_dimensions(headers: &[&SliceHeader]) -> Result<(), VolumeLoaderError> {
        let first = headers.first().ok_or(VolumeLoaderError::NoValidImages)?;
        if headers
            .iter()
            .any(|header| (header.rows, header.columns) != (first.rows, first.columns))
        {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<f32>]) -> Result<Array3<f32>, VolumeLoaderError> {
        let (height, width) = images
            .first()
            .ok_or(VolumeLoaderError::NoValidImages)?
            .dim();
        if images.iter().any(|image| image.dim() != (height, width)) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        Ok(volume)
    }

    /// Geometry of a sorted series. The slice spacing comes from the distance
    /// between the first two slice positions along the slice normal, falling
    /// back to Spacing Between Slices and then Slice Thickness.
    fn series_geometry(headers: &[&SliceHeader]) -> Result<Geometry, VolumeLoaderError> {
        let first = headers.first().ok_or(VolumeLoaderError::NoValidImages)?;
        let [row_spacing, column_spacing] = headers
            .iter()
            .find_map(|header| header.pixel_spacing)
            .ok_or(VolumeLoaderError::MissingSpacing)?;

        let orientation = first
            .orientation
            .unwrap_or([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let normal = slice_normal(&orientation);

        let position_spacing = match (headers.first(), headers.get(1)) {
            (Some(a), Some(b)) => match (a.position, b.position) {
                (Some(p0), Some(p1)) => {
                    let delta = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
                    Some(dot(&delta, &normal).abs()).filter(|spacing| *spacing > 1e-6)
                }
                _ => None,
            },
            _ => None,
        };
        let slice_spacing = position_spacing
            .or(first.spacing_between_slices)
            .or(first.slice_thickness)
            .filter(|spacing| *spacing > 0.0);
        let slice_spacing = match slice_spacing {
            Some(spacing) => spacing,
            None if headers.len() == 1 => 1.0,
            None => return Err(VolumeLoaderError::MissingSpacing),
        };

        let (row, column) = (&orientation[..3], &orientation[3..]);
        let direction = [
            row[0], column[0], normal[0], //
            row[1], column[1], normal[1], //
            row[2], column[2], normal[2],
        ];

        Ok(
            Geometry::with_size([first.columns, first.rows, headers.len()])
                .with_spacing([column_spacing, row_spacing, slice_spacing])
                .with_origin(first.position.unwrap_or([0.0; 3]))
                .with_direction(direction),
        )
    }
}
