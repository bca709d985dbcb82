//! The fixed deferred pipeline: geometry, lighting accumulation and
//! composition, plus the generic full-screen effect extension pass
//!
//! Resource names are the contract between passes; the graph wires
//! producer/consumer edges from the same names.

mod composition_pass;
mod directional_light_pass;
mod fullscreen_effect_pass;
mod geometry_pass;
mod point_light_pass;

pub use composition_pass::CompositionPass;
pub use directional_light_pass::DirectionalLightPass;
pub use fullscreen_effect_pass::FullscreenEffectPass;
pub use geometry_pass::{standard_geometry_shader, GeometryPass, STANDARD_GEOMETRY_SHADER};
pub use point_light_pass::PointLightPass;

use crate::backend::traits::*;
use crate::backend::types::TextureFormat;
use crate::render_graph::PassExecuteContext;

/// G-buffer attribute targets written by the geometry pass
pub const ALBEDO_TARGET: &str = "albedo";
pub const NORMAL_TARGET: &str = "normal";
pub const SPECULAR_TARGET: &str = "specular";
pub const DEPTH_TARGET: &str = "depth";
/// Lighting accumulation target shared by the lighting passes
pub const LIGHTING_TARGET: &str = "lighting_buffer";
/// Shared per-frame constant block, owned by the geometry pass
pub const FRAME_UNIFORMS: &str = "frame_uniforms";

pub(crate) const ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub(crate) const NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
pub(crate) const SPECULAR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::R32Typeless;
pub(crate) const LIGHTING_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Vertex stage generating a screen-covering strip from the vertex index
/// alone: 4 vertices, no vertex buffer.
pub(crate) const FULLSCREEN_VERTEX_STAGE: &str = r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    var output: FullscreenOutput;
    let x = f32(vertex_index & 1u);
    let y = f32(vertex_index >> 1u);
    output.position = vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(x, 1.0 - y);
    return output;
}
"#;

/// Assemble a complete fullscreen program from a fragment stage
pub(crate) fn fullscreen_source(fragment_stage: &str) -> String {
    format!("{FULLSCREEN_VERTEX_STAGE}\n{fragment_stage}")
}

/// Bind group layout entries for reading the G-buffer: depth plus the three
/// attribute targets, read with `textureLoad` so no sampler is involved.
pub(crate) fn gbuffer_layout_entries() -> Vec<BindGroupLayoutEntry> {
    let float = BindingType::Texture {
        sample_type: TextureSampleType::Float { filterable: false },
    };
    vec![
        BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Depth,
            },
        },
        BindGroupLayoutEntry {
            binding: 1,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: float.clone(),
        },
        BindGroupLayoutEntry {
            binding: 2,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: float.clone(),
        },
        BindGroupLayoutEntry {
            binding: 3,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: float,
        },
    ]
}

/// Resolve the G-buffer shader views as bind entries, in the fixed
/// depth/albedo/normal/specular slot order. `None` when any input is absent.
pub(crate) fn gbuffer_bind_entries(ctx: &PassExecuteContext) -> Option<Vec<(u32, BindGroupEntry)>> {
    let depth = ctx.resource(DEPTH_TARGET)?.srv?;
    let albedo = ctx.resource(ALBEDO_TARGET)?.srv?;
    let normal = ctx.resource(NORMAL_TARGET)?.srv?;
    let specular = ctx.resource(SPECULAR_TARGET)?.srv?;

    Some(vec![
        (0, BindGroupEntry::Texture(depth)),
        (1, BindGroupEntry::Texture(albedo)),
        (2, BindGroupEntry::Texture(normal)),
        (3, BindGroupEntry::Texture(specular)),
    ])
}

/// WGSL snippet shared by the lighting and composition fragments for
/// reconstructing a world-space position from the depth target.
pub(crate) const RECONSTRUCT_WORLD_POSITION: &str = r#"
fn reconstruct_world_position(uv: vec2<f32>, depth: f32) -> vec3<f32> {
    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, (1.0 - uv.y) * 2.0 - 1.0, depth, 1.0);
    let world = frame.inv_projection_view * ndc;
    return world.xyz / world.w;
}
"#;

/// WGSL declaration of the shared per-frame constant block
pub(crate) const FRAME_UNIFORMS_WGSL: &str = r#"
struct FrameUniforms {
    projection_view: mat4x4<f32>,
    inv_projection_view: mat4x4<f32>,
    camera_position: vec4<f32>,
    ambient: vec4<f32>,
    near_far: vec4<f32>,
}
"#;
