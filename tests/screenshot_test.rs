use std::fs;
use std::path::Path;

use medvol_screenshot::geometry::GeometryProperty;
use medvol_screenshot::{
    Colormap, ScreenshotConfig, ScreenshotError, ScreenshotMaker, SliceIndexTriple, SortBy,
    VolumeLoader, VolumeLoaderError,
};
use ndarray::{Array3, s};
use nifti::NiftiHeader;
use nifti::writer::WriterOptions;
use tempfile::tempdir;

/// Writes `data` ([z, y, x]) as a float32 NIfTI-1 file with the given voxel
/// spacing and an axis-aligned sform.
fn write_nifti(path: &Path, data: &Array3<f32>, spacing: [f32; 3]) {
    let (nz, ny, nx) = data.dim();
    // the writer expects [x, y, z]
    let volume =
        nifti_ndarray::Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| data[[z, y, x]]);
    let header = NiftiHeader {
        pixdim: [1.0, spacing[0], spacing[1], spacing[2], 1.0, 1.0, 1.0, 1.0],
        srow_x: [spacing[0], 0.0, 0.0, 0.0],
        srow_y: [0.0, spacing[1], 0.0, 0.0],
        srow_z: [0.0, 0.0, spacing[2], 0.0],
        ..NiftiHeader::default()
    };
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&volume)
        .unwrap();
}

fn ramp(dim: (usize, usize, usize)) -> Array3<f32> {
    Array3::from_shape_fn(dim, |(z, y, x)| (x + 2 * y + 3 * z) as f32)
}

#[test]
fn single_voxel_mask_end_to_end() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("image.nii");
    let mask_path = dir.path().join("mask.nii");
    let output = dir.path().join("screenshot.png");

    write_nifti(&image_path, &ramp((10, 10, 10)), [1.0, 1.0, 1.0]);
    let mut mask = Array3::<f32>::zeros((10, 10, 10));
    mask[[5, 5, 5]] = 1.0;
    write_nifti(&mask_path, &mask, [1.0, 1.0, 1.0]);

    let config = ScreenshotConfig {
        images: vec![image_path],
        masks: vec![mask_path],
        output: output.clone(),
        border_pc: 0.0,
        bounded: true,
        ..Default::default()
    };
    let screenshot = ScreenshotMaker::new(config).unwrap().run().unwrap();

    assert_eq!(screenshot.bounding_box.to_array(), [5, 5, 5, 5, 5, 5]);
    assert_eq!(
        screenshot.slice_indices,
        SliceIndexTriple { x: 5, y: 5, z: 5 }
    );
    let written = image::open(&output).unwrap();
    assert_eq!((written.width(), written.height()), (3, 2));
}

#[test]
fn mask_region_drives_crop_and_slices() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("t1.nii");
    let mask_path = dir.path().join("seg.nii");

    write_nifti(&image_path, &ramp((8, 12, 10)), [1.0, 1.0, 1.0]);
    let mut mask = Array3::<f32>::zeros((8, 12, 10));
    mask.slice_mut(s![2..5, 3..9, 2..=5]).fill(1.0);
    mask.slice_mut(s![3, 3..9, 4]).fill(2.0);
    write_nifti(&mask_path, &mask, [1.0, 1.0, 1.0]);

    let config = ScreenshotConfig {
        images: vec![image_path],
        masks: vec![mask_path],
        output: dir.path().join("unused.png"),
        border_pc: 0.0,
        bounded: true,
        colormap: Colormap::Jet,
        ..Default::default()
    };
    let maker = ScreenshotMaker::new(config).unwrap();
    let (images, masks) = maker.load_inputs().unwrap();
    let screenshot = maker.render(&images, &masks).unwrap();

    assert_eq!(screenshot.bounding_box.to_array(), [2, 5, 3, 8, 2, 4]);
    assert!((2..=5).contains(&screenshot.slice_indices.x));
    assert_eq!(
        screenshot.slice_indices,
        SliceIndexTriple { x: 2, y: 3, z: 2 }
    );
    assert_eq!(masks[0].max_label(), 2);
    assert!(images[0].data.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn header_geometry_is_read_without_pixel_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("aniso.nii");
    write_nifti(&path, &ramp((3, 4, 5)), [0.5, 0.75, 2.0]);

    let geometry = VolumeLoader::read_geometry(&path, SortBy::default()).unwrap();

    assert_eq!(geometry.size, [5, 4, 3]);
    assert_eq!(geometry.spacing, [0.5, 0.75, 2.0]);
    assert!(!geometry.is_2d());

    let volume = VolumeLoader::load_image(&path, SortBy::default()).unwrap();
    assert_eq!(volume.dim(), (3, 4, 5));
    assert_eq!(volume.data[[2, 1, 4]], 4.0 + 2.0 + 6.0);
}

#[test]
fn spacing_mismatch_names_offending_file() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("t1.nii");
    let other = dir.path().join("t2.nii");
    write_nifti(&reference, &ramp((4, 4, 4)), [1.0, 1.0, 1.0]);
    write_nifti(&other, &ramp((4, 4, 4)), [1.0, 1.0, 3.0]);

    let config = ScreenshotConfig {
        images: vec![reference, other.clone()],
        output: dir.path().join("unused.png"),
        ..Default::default()
    };
    match ScreenshotMaker::new(config).unwrap().run() {
        Err(ScreenshotError::AlignmentMismatch { input, property }) => {
            assert_eq!(input, other.display().to_string());
            assert_eq!(property, GeometryProperty::Spacing);
        }
        other => panic!("expected AlignmentMismatch, got {other:?}"),
    }
    assert!(!dir.path().join("unused.png").exists());
}

#[test]
fn masks_are_not_checked_when_images_are_misaligned() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("t1.nii");
    let other = dir.path().join("t2.nii");
    let mask = dir.path().join("seg.nii");
    write_nifti(&reference, &ramp((4, 4, 4)), [1.0, 1.0, 1.0]);
    write_nifti(&other, &ramp((4, 4, 5)), [1.0, 1.0, 1.0]);
    write_nifti(&mask, &ramp((2, 2, 2)), [1.0, 1.0, 1.0]);

    let config = ScreenshotConfig {
        images: vec![reference, other.clone()],
        masks: vec![mask],
        output: dir.path().join("unused.png"),
        ..Default::default()
    };
    match ScreenshotMaker::new(config).unwrap().run() {
        Err(ScreenshotError::AlignmentMismatch { input, property }) => {
            assert_eq!(input, other.display().to_string());
            assert_eq!(property, GeometryProperty::Size);
        }
        other => panic!("expected AlignmentMismatch, got {other:?}"),
    }
}

#[test]
fn unsupported_input_is_reported() {
    let config = ScreenshotConfig {
        images: vec!["scan.mha".into()],
        ..Default::default()
    };
    assert!(matches!(
        ScreenshotMaker::new(config).unwrap().run(),
        Err(ScreenshotError::Loader(VolumeLoaderError::UnsupportedFormat(_)))
    ));
}

#[test]
fn config_file_is_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("screenshot.json");
    fs::write(
        &path,
        r#"{
            "images": ["t1.nii.gz", "t2.nii.gz"],
            "masks": ["seg.nii.gz"],
            "mask_opacity": 30,
            "axis_row": true,
            "sort_by": "instance-number"
        }"#,
    )
    .unwrap();

    let config = ScreenshotConfig::from_json_file(&path).unwrap();

    assert_eq!(config.images.len(), 2);
    assert_eq!(config.mask_opacity, 30.0);
    assert!(config.axis_row);
    assert_eq!(config.sort_by, SortBy::InstanceNumber);
    assert!(config.validate().is_ok());

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        ScreenshotConfig::from_json_file(&path),
        Err(ScreenshotError::Config { .. })
    ));
}
