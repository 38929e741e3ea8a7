use ndarray::{Array2, ArrayView2, Zip};

/// Largest factor by which one axis of a plane is stretched. Past it the finer
/// axis is shrunk instead, so the physical aspect ratio still holds.
pub(crate) const MAX_UPSAMPLING: f64 = 16.0;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Output (rows, columns) for a plane whose pixels should become square.
    /// The smaller of the two spacings is the target pixel size, unless that
    /// would stretch the coarser axis by more than [`MAX_UPSAMPLING`].
    pub(crate) fn get_isotropic_dimensions(
        spacing: (f64, f64),
        original_dim: (usize, usize),
    ) -> (usize, usize) {
        let (row_spacing, col_spacing) = spacing;
        if !(row_spacing.is_finite() && col_spacing.is_finite()) {
            return original_dim;
        }
        let min_spacing = row_spacing.min(col_spacing);
        let max_spacing = row_spacing.max(col_spacing);
        if min_spacing <= 0.0 {
            return original_dim;
        }
        let target_spacing = min_spacing.max(max_spacing / MAX_UPSAMPLING);
        let inv_target_spacing = 1.0 / target_spacing;

        let rows = (original_dim.0 as f64 * row_spacing * inv_target_spacing).round() as usize;
        let cols = (original_dim.1 as f64 * col_spacing * inv_target_spacing).round() as usize;
        (rows.max(1), cols.max(1))
    }

    /// Resamples `plane` onto a square pixel grid with bilinear
    /// interpolation. Planes that are already square are copied unchanged.
    pub(crate) fn resample_image(plane: &ArrayView2<'_, f32>, spacing: (f64, f64)) -> Array2<f32> {
        let output_dim = Self::get_isotropic_dimensions(spacing, plane.dim());
        if output_dim == plane.dim() {
            return plane.to_owned();
        }
        let mut output = Array2::<f32>::zeros(output_dim);
        Zip::indexed(&mut output).par_for_each(|(y, x), value| {
            let (src_y, src_x) = Self::source_position(plane.dim(), output_dim, y, x);
            *value = Self::bilinear_interpolate(plane, src_y, src_x);
        });
        output
    }

    /// Resamples a label plane with nearest neighbour lookup so that labels
    /// are never mixed.
    pub(crate) fn resample_labels(plane: &ArrayView2<'_, u32>, spacing: (f64, f64)) -> Array2<u32> {
        let output_dim = Self::get_isotropic_dimensions(spacing, plane.dim());
        if output_dim == plane.dim() {
            return plane.to_owned();
        }
        Self::resample_nearest(plane, output_dim)
    }

    fn resample_nearest<T>(plane: &ArrayView2<'_, T>, output_dim: (usize, usize)) -> Array2<T>
    where
        T: Copy + Default + Send + Sync,
    {
        let mut output = Array2::<T>::default(output_dim);
        Zip::indexed(&mut output).par_for_each(|(y, x), value| {
            let (src_y, src_x) = Self::source_position(plane.dim(), output_dim, y, x);
            *value = plane[[src_y.round() as usize, src_x.round() as usize]];
        });
        output
    }

    /// Source coordinates of output pixel `(y, x)` using pixel-centre
    /// alignment, clamped to the valid range.
    #[inline]
    fn source_position(
        source_dim: (usize, usize),
        output_dim: (usize, usize),
        y: usize,
        x: usize,
    ) -> (f32, f32) {
        let (slice_height, slice_width) = source_dim;
        let (height, width) = output_dim;

        let norm_x = (x as f32 + 0.5) / width as f32;
        let norm_y = (y as f32 + 0.5) / height as f32;

        let src_x = norm_x * slice_width as f32 - 0.5;
        let src_y = norm_y * slice_height as f32 - 0.5;

        (
            src_y.clamp(0.0, (slice_height - 1) as f32),
            src_x.clamp(0.0, (slice_width - 1) as f32),
        )
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }
}
