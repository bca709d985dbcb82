//! Per-frame camera parameters
//!
//! Projection math lives in the driving application; the renderer consumes
//! the finished projection-view matrix together with the clip planes and
//! camera position it needs for depth reconstruction.

use glam::{Mat4, Vec3, Vec4};

use crate::backend::types::FrameUniforms;

#[derive(Debug, Clone, Copy)]
pub struct CameraParams {
    pub projection_view: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            projection_view: Mat4::IDENTITY,
            position: Vec3::ZERO,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraParams {
    /// Pack camera and ambient data into the shared per-frame constant block
    pub fn frame_uniforms(&self, ambient_color: Vec3, ambient_intensity: f32) -> FrameUniforms {
        FrameUniforms {
            projection_view: self.projection_view,
            inv_projection_view: self.projection_view.inverse(),
            camera_position: self.position.extend(0.0),
            ambient: ambient_color.extend(ambient_intensity),
            near_far: Vec4::new(self.near, self.far, 1.0 / self.near, 1.0 / self.far),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniforms_carry_near_far_reciprocals() {
        let camera = CameraParams {
            near: 0.5,
            far: 100.0,
            ..Default::default()
        };
        let uniforms = camera.frame_uniforms(Vec3::ZERO, 0.0);
        assert_eq!(uniforms.near_far.x, 0.5);
        assert_eq!(uniforms.near_far.y, 100.0);
        assert_eq!(uniforms.near_far.z, 2.0);
        assert_eq!(uniforms.near_far.w, 0.01);
    }
}
