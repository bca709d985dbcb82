//! Geometry pass: rasterizes every scene object once into the G-buffer
//!
//! All meshes are merged into one shared vertex/index buffer at setup, with
//! draw slices rebased onto the merged ranges, so the whole scene renders
//! without per-object buffer rebinding. Per-draw constants go through a
//! dynamic-offset ring that is reset every frame.

use std::any::Any;
use std::collections::HashMap;

use glam::Vec3;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::{
    BindFlags, PassExecuteContext, PassSetupContext, RenderPass, ResourceDescriptor,
};
use crate::resources::{GpuTexture, Material, RingBuffer, TextureData};
use crate::scene::{CameraParams, SceneObject};

use super::{
    ALBEDO_FORMAT, ALBEDO_TARGET, DEPTH_FORMAT, DEPTH_TARGET, FRAME_UNIFORMS, NORMAL_FORMAT,
    NORMAL_TARGET, SPECULAR_FORMAT, SPECULAR_TARGET,
};

/// Default program rendering the full vertex into the attribute targets
pub const STANDARD_GEOMETRY_SHADER: &str = r#"
struct FrameUniforms {
    projection_view: mat4x4<f32>,
    inv_projection_view: mat4x4<f32>,
    camera_position: vec4<f32>,
    ambient: vec4<f32>,
    near_far: vec4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    diffuse_color: vec4<f32>,
    specular_shininess: vec4<f32>,
    highlight: vec4<f32>,
}

@group(0) @binding(0) var<uniform> frame: FrameUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;
@group(2) @binding(0) var diffuse_texture: texture_2d<f32>;
@group(2) @binding(1) var specular_texture: texture_2d<f32>;
@group(2) @binding(2) var material_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) uv0: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv0: vec2<f32>,
}

struct GBufferOutput {
    @location(0) albedo: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) specular: vec4<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    output.clip_position = frame.projection_view * world_position;
    output.world_normal = normalize((object.model * vec4<f32>(input.normal, 0.0)).xyz);
    output.color = input.color;
    output.uv0 = input.uv0;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> GBufferOutput {
    var output: GBufferOutput;

    let diffuse_sample = textureSample(diffuse_texture, material_sampler, input.uv0);
    output.albedo = vec4<f32>(diffuse_sample.rgb * object.diffuse_color.rgb * input.color.rgb, 1.0);

    output.normal = vec4<f32>(input.world_normal * 0.5 + 0.5, 1.0);

    let specular_sample = textureSample(specular_texture, material_sampler, input.uv0);
    var specular_color = specular_sample.rgb * object.specular_shininess.rgb;
    // Boosted highlight, an artistic extension; negative power disables it
    if (object.highlight.w > 0.0) {
        specular_color = specular_color * object.highlight.rgb * object.highlight.w;
    }
    output.specular = vec4<f32>(specular_color, object.specular_shininess.w / 256.0);

    return output;
}
"#;

/// The standard geometry program over the full-vertex layout
pub fn standard_geometry_shader() -> crate::resources::ShaderProgram {
    use crate::resources::VertexSemantic;
    crate::resources::ShaderProgram::new(
        "standard_geometry",
        STANDARD_GEOMETRY_SHADER,
        vec![
            VertexSemantic::Position,
            VertexSemantic::Normal,
            VertexSemantic::Color4,
            VertexSemantic::TexCoord0,
        ],
    )
}

/// One rebased indexed draw within the shared buffers
struct DrawEntry {
    object_index: usize,
    index_count: u32,
    start_index: u32,
    base_vertex: i32,
    material: Material,
    pipeline: RenderPipelineHandle,
    textures: BindGroupHandle,
}

/// Geometry pass producing the G-buffer
pub struct GeometryPass {
    name: String,
    objects: Vec<SceneObject>,

    // Per-frame inputs pushed by the driver
    camera: CameraParams,
    ambient_color: Vec3,
    ambient_intensity: f32,

    // Device objects, created in setup
    frame_uniform_buffer: Option<BufferHandle>,
    object_ring: Option<RingBuffer>,
    frame_bind_group: Option<BindGroupHandle>,
    object_bind_group: Option<BindGroupHandle>,
    shared_vertex_buffer: Option<BufferHandle>,
    shared_index_buffer: Option<BufferHandle>,
    white_fallback: Option<GpuTexture>,
    pipelines: HashMap<String, RenderPipelineHandle>,
    draws: Vec<DrawEntry>,
}

impl GeometryPass {
    pub fn new() -> Self {
        Self {
            name: "GeometryPass".to_string(),
            objects: Vec::new(),
            camera: CameraParams::default(),
            ambient_color: Vec3::ZERO,
            ambient_intensity: 0.5,
            frame_uniform_buffer: None,
            object_ring: None,
            frame_bind_group: None,
            object_bind_group: None,
            shared_vertex_buffer: None,
            shared_index_buffer: None,
            white_fallback: None,
            pipelines: HashMap::new(),
            draws: Vec::new(),
        }
    }

    /// Set the scene objects. The merged vertex/index buffer is baked from
    /// these at build time, so push the object list before the graph builds;
    /// transforms stay live and are re-read every frame.
    pub fn set_objects(&mut self, objects: Vec<SceneObject>) {
        if self.shared_vertex_buffer.is_some() {
            log::warn!("GeometryPass: object list changed after build; geometry stays as baked");
        }
        self.objects = objects;
    }

    /// Mutable access to the objects for per-frame transform updates
    pub fn objects_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects
    }

    /// Push this frame's camera and ambient term
    pub fn set_frame_data(&mut self, camera: CameraParams, ambient_color: Vec3, ambient_intensity: f32) {
        self.camera = camera;
        self.ambient_color = ambient_color;
        self.ambient_intensity = ambient_intensity;
    }

    /// The white fallback bound into empty material slots
    pub fn white_fallback(&self) -> Option<&GpuTexture> {
        self.white_fallback.as_ref()
    }
}

impl Default for GeometryPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for GeometryPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        let (width, height) = ctx.screen_size();

        // Declare the attribute targets this pass owns
        ctx.get_or_create_resource(
            ALBEDO_TARGET,
            &ResourceDescriptor::texture_2d(
                width,
                height,
                ALBEDO_FORMAT,
                BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE,
            ),
        );
        ctx.get_or_create_resource(
            NORMAL_TARGET,
            &ResourceDescriptor::texture_2d(
                width,
                height,
                NORMAL_FORMAT,
                BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE,
            ),
        );
        ctx.get_or_create_resource(
            SPECULAR_TARGET,
            &ResourceDescriptor::texture_2d(
                width,
                height,
                SPECULAR_FORMAT,
                BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE,
            ),
        );
        ctx.get_or_create_resource(
            DEPTH_TARGET,
            &ResourceDescriptor::texture_2d(
                width,
                height,
                DEPTH_FORMAT,
                BindFlags::DEPTH_STENCIL | BindFlags::SHADER_RESOURCE,
            ),
        );

        // The shared per-frame constant block is a Buffer-kind graph
        // resource; this pass owns its backing, the later passes read it
        // through the resource's buffer handle.
        ctx.get_or_create_resource(FRAME_UNIFORMS, &ResourceDescriptor::buffer());

        let frame_uniform_buffer = ctx.backend().create_buffer(
            &BufferDescriptor::new(
                std::mem::size_of::<FrameUniforms>() as u64,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            )
            .with_label("frame_uniforms"),
        )?;
        self.frame_uniform_buffer = Some(frame_uniform_buffer);
        if let Some(resource) = ctx.get_resource_mut(FRAME_UNIFORMS) {
            resource.buffer = Some(frame_uniform_buffer);
        }

        let backend = ctx.backend();

        let draw_count: usize = self
            .objects
            .iter()
            .map(|o| o.mesh.draw_slices.len())
            .sum::<usize>()
            .max(1);
        let ring = RingBuffer::new(
            backend,
            (draw_count as u64) * RingBuffer::DEFAULT_ALIGNMENT,
            BufferUsage::UNIFORM,
            "object_uniforms",
        )?;

        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("material_sampler".to_string()),
            ..SamplerDescriptor::point()
        })?;

        let white_fallback = GpuTexture::create(backend, &TextureData::white())?;

        // Bind group layouts: frame constants, per-draw constants (dynamic
        // ring offsets), material textures
        let frame_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::VERTEX_FRAGMENT,
            ty: BindingType::UniformBuffer { dynamic: false },
        }])?;
        let object_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::VERTEX_FRAGMENT,
            ty: BindingType::UniformBuffer { dynamic: true },
        }])?;
        let texture_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                },
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                },
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Sampler { comparison: false },
            },
        ])?;

        self.frame_bind_group = Some(backend.create_bind_group(
            frame_layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: frame_uniform_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?);
        self.object_bind_group = Some(backend.create_bind_group(
            object_layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: ring.buffer(),
                    offset: 0,
                    size: Some(std::mem::size_of::<ObjectUniforms>() as u64),
                },
            )],
        )?);

        // Merge every mesh into one vertex/index buffer, rebasing each draw
        // slice onto the merged ranges.
        let mut vertices: Vec<FullVertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut draws: Vec<DrawEntry> = Vec::new();

        for (object_index, object) in self.objects.iter().enumerate() {
            let base_vertex = vertices.len() as i32;
            let start_index = indices.len() as u32;
            vertices.extend_from_slice(&object.mesh.vertices);
            indices.extend_from_slice(&object.mesh.indices);

            let pipeline = match self.pipelines.get(&object.shader.name) {
                Some(&pipeline) => pipeline,
                None => {
                    let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
                        label: Some(format!("geometry_{}", object.shader.name)),
                        shader_source: object.shader.source.clone(),
                        vertex_layouts: vec![object.shader.input_layout()],
                        bind_group_layouts: vec![frame_layout, object_layout, texture_layout],
                        primitive_topology: PrimitiveTopology::TriangleList,
                        front_face: FrontFace::Ccw,
                        cull_mode: CullMode::Back,
                        depth_stencil: Some(DepthStencilState {
                            format: TextureFormat::Depth32Float,
                            depth_write_enabled: true,
                            depth_compare: CompareFunction::Less,
                        }),
                        color_targets: vec![
                            ColorTargetState {
                                format: ALBEDO_FORMAT,
                                blend: None,
                            },
                            ColorTargetState {
                                format: NORMAL_FORMAT,
                                blend: None,
                            },
                            ColorTargetState {
                                format: SPECULAR_FORMAT,
                                blend: None,
                            },
                        ],
                    })?;
                    self.pipelines.insert(object.shader.name.clone(), pipeline);
                    pipeline
                }
            };

            for slice in &object.mesh.draw_slices {
                // Absent texture slots get the white fallback so no
                // shader-resource slot is left empty during the draw.
                let diffuse_view = slice
                    .material
                    .diffuse_texture
                    .as_ref()
                    .map(|t| t.view)
                    .unwrap_or(white_fallback.view);
                let specular_view = slice
                    .material
                    .specular_texture
                    .as_ref()
                    .map(|t| t.view)
                    .unwrap_or(white_fallback.view);

                let textures = backend.create_bind_group(
                    texture_layout,
                    &[
                        (0, BindGroupEntry::Texture(diffuse_view)),
                        (1, BindGroupEntry::Texture(specular_view)),
                        (2, BindGroupEntry::Sampler(sampler)),
                    ],
                )?;

                draws.push(DrawEntry {
                    object_index,
                    index_count: slice.index_count,
                    start_index: start_index + slice.start_index,
                    base_vertex: base_vertex + slice.base_vertex,
                    material: slice.material.clone(),
                    pipeline,
                    textures,
                });
            }
        }

        if !vertices.is_empty() {
            self.shared_vertex_buffer = Some(backend.create_buffer_init(
                &BufferDescriptor::new(
                    (vertices.len() as u64) * FullVertex::STRIDE,
                    BufferUsage::VERTEX,
                )
                .with_label("shared_vertices"),
                bytemuck::cast_slice(&vertices),
            )?);
            self.shared_index_buffer = Some(backend.create_buffer_init(
                &BufferDescriptor::new((indices.len() as u64) * 4, BufferUsage::INDEX)
                    .with_label("shared_indices"),
                bytemuck::cast_slice(&indices),
            )?);
        }

        self.object_ring = Some(ring);
        self.white_fallback = Some(white_fallback);
        self.draws = draws;

        log::info!(
            "GeometryPass: merged {} objects into {} draws ({} vertices, {} indices)",
            self.objects.len(),
            self.draws.len(),
            vertices.len(),
            indices.len()
        );

        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) {
        let (Some(albedo), Some(normal), Some(specular), Some(depth)) = (
            ctx.resource(ALBEDO_TARGET).and_then(|r| r.rtv),
            ctx.resource(NORMAL_TARGET).and_then(|r| r.rtv),
            ctx.resource(SPECULAR_TARGET).and_then(|r| r.rtv),
            ctx.resource(DEPTH_TARGET).and_then(|r| r.dsv),
        ) else {
            return;
        };

        let (Some(frame_buffer), Some(frame_bind_group), Some(object_bind_group)) = (
            self.frame_uniform_buffer,
            self.frame_bind_group,
            self.object_bind_group,
        ) else {
            return;
        };

        let (width, height) = ctx.screen_size();
        let backend = ctx.backend();

        // Camera and ambient data upload once per frame, shared with the
        // later passes through the frame_uniforms resource.
        let frame_uniforms = self
            .camera
            .frame_uniforms(self.ambient_color, self.ambient_intensity);
        backend.write_buffer(frame_buffer, 0, bytemuck::bytes_of(&frame_uniforms));

        // Stage this frame's per-draw constants at ring offsets
        let Some(ring) = self.object_ring.as_mut() else {
            return;
        };
        ring.reset();

        let mut draw_offsets: Vec<u32> = Vec::with_capacity(self.draws.len());
        for draw in &self.draws {
            let Some(allocation) = ring.allocate(std::mem::size_of::<ObjectUniforms>() as u64)
            else {
                log::warn!("GeometryPass: per-draw ring exhausted, dropping remaining draws");
                break;
            };
            let model = self.objects[draw.object_index].transform.matrix();
            let uniforms = draw.material.uniform_data(model);
            backend.write_buffer(ring.buffer(), allocation.offset, bytemuck::bytes_of(&uniforms));
            draw_offsets.push(allocation.offset as u32);
        }

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("GeometryPass".to_string()),
            color_attachments: vec![
                ColorAttachment {
                    view: albedo,
                    load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                    store_op: StoreOp::Store,
                },
                ColorAttachment {
                    view: normal,
                    load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                    store_op: StoreOp::Store,
                },
                ColorAttachment {
                    view: specular,
                    load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                    store_op: StoreOp::Store,
                },
            ],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: depth,
                depth_load_op: LoadOp::Clear([1.0, 0.0, 0.0, 0.0]),
                depth_store_op: StoreOp::Store,
                depth_clear_value: 1.0,
            }),
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32);

        if let (Some(vertex_buffer), Some(index_buffer)) =
            (self.shared_vertex_buffer, self.shared_index_buffer)
        {
            backend.set_vertex_buffer(0, vertex_buffer, 0);
            backend.set_index_buffer(index_buffer, 0, IndexFormat::Uint32);

            let mut bound_pipeline = None;
            for (draw, &offset) in self.draws.iter().zip(draw_offsets.iter()) {
                if bound_pipeline != Some(draw.pipeline) {
                    backend.set_render_pipeline(draw.pipeline);
                    backend.set_bind_group(0, frame_bind_group, &[]);
                    bound_pipeline = Some(draw.pipeline);
                }
                backend.set_bind_group(1, object_bind_group, &[offset]);
                backend.set_bind_group(2, draw.textures, &[]);
                backend.draw_indexed(
                    draw.start_index..draw.start_index + draw.index_count,
                    draw.base_vertex,
                    0..1,
                );
            }
        }

        // Ending the pass retires every transient binding with it
        backend.end_render_pass();
    }

    fn input_resources(&self) -> Vec<String> {
        Vec::new()
    }

    fn output_resources(&self) -> Vec<String> {
        vec![
            ALBEDO_TARGET.to_string(),
            NORMAL_TARGET.to_string(),
            SPECULAR_TARGET.to_string(),
            DEPTH_TARGET.to_string(),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
