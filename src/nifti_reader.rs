//! NIfTI-1 reading (`.nii` and `.nii.gz`).

use std::path::Path;

use ndarray::Array3;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{NiftiHeader, NiftiObject, ReaderOptions};

use crate::geometry::{Geometry, IDENTITY_DIRECTION};
use crate::volume::Volume;
use crate::volume_loader::VolumeLoaderError;

pub(crate) fn read_geometry(path: &Path) -> Result<Geometry, VolumeLoaderError> {
    let header = NiftiHeader::from_file(path)?;
    Ok(geometry_from_header(&header))
}

/// Reads the first volume of `path`. Higher dimensions (time, echoes) are
/// dropped.
pub(crate) fn load(path: &Path) -> Result<Volume<f32>, VolumeLoaderError> {
    let object = ReaderOptions::new().read_file(path)?;
    let geometry = geometry_from_header(object.header());
    let array = object.into_volume().into_ndarray::<f32>()?;

    let [nx, ny, nz] = geometry.size;
    let spatial = nx * ny * nz;
    if spatial == 0 || array.len() % spatial != 0 {
        return Err(VolumeLoaderError::InconsistentDimensions);
    }
    // The array is indexed [x, y, z, t, ...] in logical order, so trailing
    // axes vary fastest when iterating.
    let step = array.len() / spatial;
    let values: Vec<f32> = array.iter().step_by(step).copied().collect();

    let data = Array3::from_shape_vec((nx, ny, nz), values)?
        .permuted_axes([2, 1, 0])
        .as_standard_layout()
        .into_owned();

    Ok(Volume::new(data, geometry))
}

fn geometry_from_header(header: &NiftiHeader) -> Geometry {
    let ndim = header.dim[0] as usize;
    let extent = |axis: usize| {
        if axis <= ndim {
            (header.dim[axis] as usize).max(1)
        } else {
            1
        }
    };
    let size = [extent(1), extent(2), extent(3)];

    let spacing = [1, 2, 3].map(|axis| {
        let spacing = (header.pixdim[axis] as f64).abs();
        if spacing.is_finite() && spacing > 0.0 {
            spacing
        } else {
            1.0
        }
    });

    let (origin, direction) = if header.sform_code > 0 {
        sform_orientation(header)
    } else if header.qform_code > 0 {
        qform_orientation(header)
    } else {
        ([0.0; 3], IDENTITY_DIRECTION)
    };

    Geometry::with_size(size)
        .with_spacing(spacing)
        .with_origin(origin)
        .with_direction(direction)
}

/// Origin and normalised axis directions from the sform affine rows.
fn sform_orientation(header: &NiftiHeader) -> ([f64; 3], [f64; 9]) {
    let rows = [header.srow_x, header.srow_y, header.srow_z].map(|row| row.map(f64::from));
    let mut direction = [0.0; 9];
    for column in 0..3 {
        let norm = rows.iter().map(|row| row[column].powi(2)).sum::<f64>().sqrt();
        let norm = if norm > 0.0 { norm } else { 1.0 };
        for (r, row) in rows.iter().enumerate() {
            direction[r * 3 + column] = row[column] / norm;
        }
    }
    ([rows[0][3], rows[1][3], rows[2][3]], direction)
}

/// Origin and rotation from the quaternion form. A negative `pixdim[0]`
/// flips the slice axis.
fn qform_orientation(header: &NiftiHeader) -> ([f64; 3], [f64; 9]) {
    let (b, c, d) = (
        f64::from(header.quatern_b),
        f64::from(header.quatern_c),
        f64::from(header.quatern_d),
    );
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };

    let direction = [
        a * a + b * b - c * c - d * d,
        2.0 * (b * c - a * d),
        2.0 * (b * d + a * c) * qfac,
        2.0 * (b * c + a * d),
        a * a + c * c - b * b - d * d,
        2.0 * (c * d - a * b) * qfac,
        2.0 * (b * d - a * c),
        2.0 * (c * d + a * b),
        (a * a + d * d - c * c - b * b) * qfac,
    ];
    let origin = [
        f64::from(header.quatern_x),
        f64::from(header.quatern_y),
        f64::from(header.quatern_z),
    ];
    (origin, direction)
}
