//! Material definitions for the deferred pipeline

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::backend::types::ObjectUniforms;
use crate::resources::texture::GpuTexture;

/// Surface material for a draw slice
///
/// Texture slots are optional; absent slots are substituted with the
/// geometry pass's white fallback at draw time. The boosted highlight is an
/// artistic extension layered on top of the ordinary specular term; a
/// negative power disables it.
#[derive(Debug, Clone)]
pub struct Material {
    pub diffuse_texture: Option<Arc<GpuTexture>>,
    pub specular_texture: Option<Arc<GpuTexture>>,

    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub shininess: f32,
    pub highlight_color: Vec3,
    pub highlight_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse_texture: None,
            specular_texture: None,
            diffuse_color: Vec3::ONE,
            specular_color: Vec3::ONE,
            shininess: 32.0,
            highlight_color: Vec3::ONE,
            highlight_power: -1.0,
        }
    }
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diffuse_texture(mut self, texture: Arc<GpuTexture>) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }

    pub fn with_specular_texture(mut self, texture: Arc<GpuTexture>) -> Self {
        self.specular_texture = Some(texture);
        self
    }

    pub fn with_diffuse_color(mut self, color: Vec3) -> Self {
        self.diffuse_color = color;
        self
    }

    pub fn with_specular(mut self, color: Vec3, shininess: f32) -> Self {
        self.specular_color = color;
        self.shininess = shininess;
        self
    }

    pub fn with_highlight(mut self, color: Vec3, power: f32) -> Self {
        self.highlight_color = color;
        self.highlight_power = power;
        self
    }

    /// Pack this material with a model matrix into the per-draw constant
    /// block
    pub fn uniform_data(&self, model: Mat4) -> ObjectUniforms {
        ObjectUniforms {
            model,
            diffuse_color: self.diffuse_color.extend(0.0),
            specular_shininess: self.specular_color.extend(self.shininess),
            highlight: self.highlight_color.extend(self.highlight_power),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn uniform_data_packs_material_parameters() {
        let material = Material::new()
            .with_diffuse_color(Vec3::new(0.5, 0.25, 0.125))
            .with_specular(Vec3::new(1.0, 0.0, 0.0), 64.0)
            .with_highlight(Vec3::Y, 8.0);

        let data = material.uniform_data(Mat4::IDENTITY);

        assert_eq!(data.diffuse_color, Vec4::new(0.5, 0.25, 0.125, 0.0));
        assert_eq!(data.specular_shininess, Vec4::new(1.0, 0.0, 0.0, 64.0));
        assert_eq!(data.highlight, Vec4::new(0.0, 1.0, 0.0, 8.0));
    }

    #[test]
    fn default_highlight_is_disabled() {
        let material = Material::default();
        assert!(material.highlight_power < 0.0);
        assert!(material.diffuse_texture.is_none());
    }
}
