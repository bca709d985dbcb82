//! Light types for the scene

use glam::Vec3;

use crate::backend::types::{DirectionalLightUniforms, PointLightUniforms};

/// Directional light (like the sun)
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub power: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-1.0, -1.0, 0.0).normalize(),
            color: Vec3::ONE,
            power: 1.0,
        }
    }
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, power: f32) -> Self {
        Self {
            direction: direction.normalize(),
            color,
            power,
        }
    }

    pub fn to_uniforms(&self) -> DirectionalLightUniforms {
        DirectionalLightUniforms {
            direction: self.direction.extend(0.0),
            color_power: self.color.extend(self.power),
        }
    }
}

/// Point light
///
/// Radius parameterizes distance falloff only; every point light is drawn
/// full-screen regardless of its true footprint.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub radius: f32,
    pub color: Vec3,
    pub power: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            radius: 10.0,
            color: Vec3::ONE,
            power: 1.0,
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3, radius: f32, color: Vec3, power: f32) -> Self {
        Self {
            position,
            radius,
            color,
            power,
        }
    }

    pub fn to_uniforms(&self) -> PointLightUniforms {
        PointLightUniforms {
            position_radius: self.position.extend(self.radius),
            color_power: self.color.extend(self.power),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn point_light_packs_radius_and_power() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), 5.0, Vec3::X, 2.0);
        let uniforms = light.to_uniforms();
        assert_eq!(uniforms.position_radius, Vec4::new(1.0, 2.0, 3.0, 5.0));
        assert_eq!(uniforms.color_power, Vec4::new(1.0, 0.0, 0.0, 2.0));
    }

    #[test]
    fn directional_light_direction_is_normalized() {
        let light = DirectionalLight::new(Vec3::new(0.0, -2.0, 0.0), Vec3::ONE, 1.0);
        assert!((light.direction.length() - 1.0).abs() < 1e-6);
    }
}
