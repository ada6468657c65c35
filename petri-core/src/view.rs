//! The 2D view transform.
//!
//! A single affine matrix maps the simulation quad ([-1,1] on both axes)
//! into normalized device coordinates. Panning and zooming mutate it in
//! place; the inverse maps a screen point back into the quad so the brush
//! can be placed in texture space. All inputs and outputs here are NDC —
//! the `((x+1)/2, (y+1)/2)` texture-space conversion belongs to the caller.

use glam::{Mat3, Vec2};
use thiserror::Error;

/// Determinants below this are treated as singular.
const MIN_DETERMINANT: f32 = 1e-12;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// The matrix degenerated and cannot map screen points back to the
    /// simulation. Zoom factors are always positive, so reaching this is a
    /// bug in the caller, not a runtime condition.
    #[error("view transform is singular and cannot be inverted")]
    Singular,
}

/// Affine view matrix over 2D homogeneous coordinates.
///
/// The matrix never rotates: it is built exclusively from uniform scales
/// and translations, so the y scale stays a fixed multiple of the x scale
/// and [`set_aspect_ratio`](Self::set_aspect_ratio) can pin that multiple
/// directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    m: Mat3,
}

impl ViewTransform {
    /// Uniform scale constructor. The canvas sizes this so the on-screen
    /// cell width matches the configured pixel size:
    /// `cell_size * grid_width / surface_width`.
    pub fn scaling(factor: f32) -> Self {
        Self {
            m: Mat3::from_scale(Vec2::splat(factor)),
        }
    }

    /// Corrects for non-square pixel mapping between the cell grid and the
    /// drawable surface by pinning `sy = sx * ratio`.
    ///
    /// Pinning (rather than accumulating a correction factor) makes the
    /// call idempotent: repeated calls with unchanged grid/surface sizes
    /// leave the matrix untouched.
    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        self.m.y_axis.y = self.m.x_axis.x * ratio;
    }

    /// Translates the view by `delta`, given in NDC. The gesture tracker
    /// hands over movement already normalized to [-1,1]-space.
    pub fn translate(&mut self, delta: Vec2) {
        self.m = Mat3::from_translation(delta) * self.m;
    }

    /// Scales the view by `factor` about `pivot` (NDC, typically the
    /// cursor). The pivot's mapped location is invariant: whatever sits
    /// under the cursor stays under the cursor.
    ///
    /// `factor` must be positive; the invertibility invariant depends on
    /// it.
    pub fn zoom_into(&mut self, factor: f32, pivot: Vec2) {
        debug_assert!(factor > 0.0, "zoom factor must be positive");
        self.m = Mat3::from_translation(pivot)
            * Mat3::from_scale(Vec2::splat(factor))
            * Mat3::from_translation(-pivot)
            * self.m;
    }

    /// Maps a quad-space point forward into NDC.
    pub fn apply(&self, p: Vec2) -> Vec2 {
        self.m.transform_point2(p)
    }

    /// Maps a screen-space (NDC) point back into quad space. Used for
    /// brush placement only.
    pub fn unproject(&self, p: Vec2) -> Result<Vec2, TransformError> {
        Ok(self.inverse()?.transform_point2(p))
    }

    /// The matrix inverse. Errors instead of returning garbage if the
    /// transform degenerated.
    pub fn inverse(&self) -> Result<Mat3, TransformError> {
        if self.m.determinant().abs() < MIN_DETERMINANT {
            return Err(TransformError::Singular);
        }
        Ok(self.m.inverse())
    }

    pub fn matrix(&self) -> Mat3 {
        self.m
    }

    /// Column-major layout with each column padded to 16 bytes, matching
    /// the uniform-buffer layout of `mat3x3<f32>` in WGSL.
    pub fn gpu_columns(&self) -> [[f32; 4]; 3] {
        let [x, y, z] = [self.m.x_axis, self.m.y_axis, self.m.z_axis];
        [
            [x.x, x.y, x.z, 0.0],
            [y.x, y.y, y.z, 0.0],
            [z.x, z.y, z.z, 0.0],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < EPS, "{a:?} != {b:?}");
    }

    #[test]
    fn test_scaling_maps_uniformly() {
        let vt = ViewTransform::scaling(2.0);
        assert_close(vt.apply(Vec2::new(0.5, -0.25)), Vec2::new(1.0, -0.5));
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut vt = ViewTransform::scaling(1.5);
        vt.translate(Vec2::new(0.3, -0.2));
        vt.zoom_into(1.8, Vec2::new(0.4, 0.4));
        vt.translate(Vec2::new(-0.1, 0.7));
        vt.zoom_into(0.6, Vec2::new(-0.9, 0.2));

        let inv = vt.inverse().unwrap();
        for p in [
            Vec2::ZERO,
            Vec2::new(1.0, 1.0),
            Vec2::new(-0.7, 0.3),
            Vec2::new(0.01, -0.99),
        ] {
            assert_close(inv.transform_point2(vt.apply(p)), p);
        }
    }

    #[test]
    fn test_zoom_keeps_pivot_fixed() {
        let mut vt = ViewTransform::scaling(0.8);
        vt.translate(Vec2::new(0.2, 0.1));

        let pivot = Vec2::new(0.25, -0.5);
        // The pivot is a screen point: find what maps onto it first.
        let under_pivot = vt.inverse().unwrap().transform_point2(pivot);

        vt.zoom_into(2.5, pivot);
        assert_close(vt.apply(under_pivot), pivot);

        vt.zoom_into(0.3, pivot);
        assert_close(vt.apply(under_pivot), pivot);
    }

    #[test]
    fn test_set_aspect_ratio_is_idempotent() {
        let mut vt = ViewTransform::scaling(1.2);
        vt.zoom_into(1.4, Vec2::new(0.1, 0.9));
        vt.set_aspect_ratio(0.75);
        let once = vt.matrix();
        vt.set_aspect_ratio(0.75);
        assert_eq!(once, vt.matrix());
    }

    #[test]
    fn test_aspect_ratio_pins_y_scale() {
        let mut vt = ViewTransform::scaling(2.0);
        vt.set_aspect_ratio(0.5);
        let m = vt.matrix();
        assert!((m.y_axis.y - m.x_axis.x * 0.5).abs() < EPS);
    }

    #[test]
    fn test_singular_transform_errors() {
        let vt = ViewTransform::scaling(0.0);
        assert_eq!(vt.inverse(), Err(TransformError::Singular));
        assert_eq!(
            vt.unproject(Vec2::ZERO),
            Err(TransformError::Singular)
        );
    }

    #[test]
    fn test_gpu_columns_layout() {
        let mut vt = ViewTransform::scaling(3.0);
        vt.translate(Vec2::new(0.5, -0.5));
        let cols = vt.gpu_columns();
        assert_eq!(cols[0][0], 3.0);
        assert_eq!(cols[1][1], 3.0);
        assert_eq!(cols[2][0], 0.5);
        assert_eq!(cols[2][1], -0.5);
        // Homogeneous row and padding lanes
        assert_eq!(cols[2][2], 1.0);
        assert_eq!(cols[0][3], 0.0);
    }
}
