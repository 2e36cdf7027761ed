//! Camera settings and the projection matrix builder.

use std::f32::consts::PI;

/// Camera used to build the `projection` uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Width over height; updated on every resize.
    pub aspect: f32,
    /// Distance from the camera to the origin along the view axis (perspective only).
    pub z: f32,
    /// Perspective when true, pixel-space orthographic otherwise.
    pub perspective: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 60.0,
            near: 1.0,
            far: 10000.0,
            aspect: 1.0,
            z: 100.0,
            perspective: true,
        }
    }
}

impl Camera {
    /// Builds the column-major projection for a `width` x `height` logical viewport and
    /// stores the resulting aspect ratio.
    pub fn projection(&mut self, width: f32, height: f32) -> [f32; 16] {
        if self.perspective {
            self.aspect = width / height;
            perspective(self.fov, self.aspect, self.near, self.far, self.z)
        } else {
            orthographic(width, height)
        }
    }
}

/// Perspective projection with depth mapped to `[0, 1]`, looking down -Z from `z`
/// units away from the origin.
#[rustfmt::skip]
pub fn perspective(fov_deg: f32, aspect: f32, near: f32, far: f32, z: f32) -> [f32; 16] {
    let fov = fov_deg.to_radians();
    let f = (0.5 * PI - 0.5 * fov).tan();
    let range_inv = 1.0 / (near - far);

    [
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, far * range_inv, -1.0,
        0.0, 0.0, far * range_inv * (near - z), z,
    ]
}

/// Maps logical pixels (top-left origin, +Y down) to clip space.
#[rustfmt::skip]
pub fn orthographic(width: f32, height: f32) -> [f32; 16] {
    [
        2.0 / width, 0.0, 0.0, 0.0,
        0.0, -2.0 / height, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        -1.0, 1.0, 0.0, 1.0,
    ]
}
