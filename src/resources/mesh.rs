//! Mesh data structures and procedural primitives

use glam::{Vec2, Vec3, Vec4};

use crate::backend::types::FullVertex;
use crate::resources::material::Material;

/// One indexed draw range within a mesh, with its material
#[derive(Debug, Clone)]
pub struct DrawSlice {
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    pub material: Material,
}

/// A mesh as delivered by the asset importer: flat full-vertex array, flat
/// 32-bit index array and a list of draw slices
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<FullVertex>,
    pub indices: Vec<u32>,
    pub draw_slices: Vec<DrawSlice>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Cover the whole index range with a single slice
    pub fn with_single_slice(mut self, material: Material) -> Self {
        self.draw_slices = vec![DrawSlice {
            index_count: self.indices.len() as u32,
            start_index: 0,
            base_vertex: 0,
            material,
        }];
        self
    }

    /// Unit cube centered at the origin, 4 vertices per face
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        let faces: [(Vec3, Vec3, Vec3); 6] = [
            // (normal, right, up) per face
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
            (Vec3::X, -Vec3::Z, Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, -Vec3::Z),
            (-Vec3::Y, Vec3::X, Vec3::Z),
        ];

        for (face, (normal, right, up)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            let center = *normal * 0.5;
            let corners = [
                (center - *right * 0.5 - *up * 0.5, Vec2::new(0.0, 1.0)),
                (center + *right * 0.5 - *up * 0.5, Vec2::new(1.0, 1.0)),
                (center + *right * 0.5 + *up * 0.5, Vec2::new(1.0, 0.0)),
                (center - *right * 0.5 + *up * 0.5, Vec2::new(0.0, 0.0)),
            ];

            for (position, uv) in corners {
                mesh.vertices.push(FullVertex {
                    position,
                    normal: *normal,
                    color: Vec4::ONE,
                    uv0: uv,
                    ..Default::default()
                });
            }

            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh.with_single_slice(Material::default())
    }

    /// Flat plane on the XZ axis
    pub fn plane(width: f32, depth: f32) -> Self {
        let mut mesh = Mesh::new("plane");
        let half_width = width / 2.0;
        let half_depth = depth / 2.0;

        let corners = [
            (Vec3::new(-half_width, 0.0, -half_depth), Vec2::new(0.0, 0.0)),
            (Vec3::new(half_width, 0.0, -half_depth), Vec2::new(1.0, 0.0)),
            (Vec3::new(half_width, 0.0, half_depth), Vec2::new(1.0, 1.0)),
            (Vec3::new(-half_width, 0.0, half_depth), Vec2::new(0.0, 1.0)),
        ];

        for (position, uv) in corners {
            mesh.vertices.push(FullVertex {
                position,
                normal: Vec3::Y,
                color: Vec4::ONE,
                uv0: uv,
                ..Default::default()
            });
        }
        mesh.indices.extend_from_slice(&[0, 2, 1, 0, 3, 2]);

        mesh.with_single_slice(Material::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_one_slice_covering_all_indices() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.draw_slices.len(), 1);
        assert_eq!(cube.draw_slices[0].index_count, 36);
        assert_eq!(cube.draw_slices[0].base_vertex, 0);
    }

    #[test]
    fn vertex_bytes_match_stride() {
        let plane = Mesh::plane(2.0, 2.0);
        assert_eq!(plane.vertex_bytes().len(), plane.vertex_count() * 64);
        assert_eq!(plane.index_bytes().len(), plane.index_count() * 4);
    }
}
