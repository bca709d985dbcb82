//! Scene data consumed by the renderer

mod camera;
mod light;
mod transform;

pub use camera::CameraParams;
pub use light::{DirectionalLight, PointLight};
pub use transform::Transform;

use std::sync::Arc;

use crate::resources::{Mesh, ShaderProgram};

/// A renderable object pushed into the geometry pass
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub mesh: Arc<Mesh>,
    pub shader: Arc<ShaderProgram>,
}

impl SceneObject {
    pub fn new(name: &str, mesh: Arc<Mesh>, shader: Arc<ShaderProgram>) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
            mesh,
            shader,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}
