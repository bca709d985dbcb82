//! CPU-side resource data: meshes, materials, textures, shader programs and
//! the per-frame constant-data ring

pub mod material;
pub mod mesh;
pub mod ring_buffer;
pub mod shader;
pub mod texture;

pub use material::Material;
pub use mesh::{DrawSlice, Mesh};
pub use ring_buffer::{RingAllocation, RingBuffer};
pub use shader::{ShaderProgram, VertexSemantic};
pub use texture::{GpuTexture, TextureData};
