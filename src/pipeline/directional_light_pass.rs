//! Directional lighting pass
//!
//! First of the lighting passes: clears the accumulation target to black and
//! adds the directional contribution with additive blending. Lighting is
//! computed per output pixel from the rasterized G-buffer attributes, never
//! by re-rasterizing scene geometry.

use std::any::Any;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::{
    BindFlags, PassExecuteContext, PassSetupContext, RenderPass, ResourceDescriptor,
};
use crate::scene::DirectionalLight;

use super::{
    fullscreen_source, gbuffer_bind_entries, gbuffer_layout_entries, ALBEDO_TARGET, DEPTH_TARGET,
    FRAME_UNIFORMS, FRAME_UNIFORMS_WGSL, LIGHTING_FORMAT, LIGHTING_TARGET, NORMAL_TARGET,
    RECONSTRUCT_WORLD_POSITION, SPECULAR_TARGET,
};

const DIRECTIONAL_LIGHT_FRAGMENT: &str = r#"
struct DirectionalLight {
    direction: vec4<f32>,
    color_power: vec4<f32>,
}

@group(0) @binding(0) var depth_texture: texture_depth_2d;
@group(0) @binding(1) var albedo_texture: texture_2d<f32>;
@group(0) @binding(2) var normal_texture: texture_2d<f32>;
@group(0) @binding(3) var specular_texture: texture_2d<f32>;
@group(1) @binding(0) var<uniform> light: DirectionalLight;
@group(2) @binding(0) var<uniform> frame: FrameUniforms;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(input.position.xy);
    let depth = textureLoad(depth_texture, pixel, 0);
    if (depth >= 1.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    let albedo = textureLoad(albedo_texture, pixel, 0).rgb;
    let normal = normalize(textureLoad(normal_texture, pixel, 0).xyz * 2.0 - 1.0);
    let specular_sample = textureLoad(specular_texture, pixel, 0);
    let shininess = max(specular_sample.a * 256.0, 1.0);

    let world_position = reconstruct_world_position(input.uv, depth);
    let view_direction = normalize(frame.camera_position.xyz - world_position);

    let light_direction = -normalize(light.direction.xyz);
    let n_dot_l = max(dot(normal, light_direction), 0.0);

    let half_vector = normalize(light_direction + view_direction);
    let specular_term = pow(max(dot(normal, half_vector), 0.0), shininess);

    let radiance = light.color_power.rgb * light.color_power.a;
    let color = (albedo * n_dot_l + specular_sample.rgb * specular_term) * radiance;
    return vec4<f32>(color, 1.0);
}
"#;

/// Render pass that applies directional lighting
pub struct DirectionalLightPass {
    name: String,
    light: DirectionalLight,

    light_buffer: Option<BufferHandle>,
    light_bind_group: Option<BindGroupHandle>,
    gbuffer_layout: Option<BindGroupLayoutHandle>,
    gbuffer_bind_group: Option<BindGroupHandle>,
    frame_layout: Option<BindGroupLayoutHandle>,
    frame_bind_group: Option<BindGroupHandle>,
    pipeline: Option<RenderPipelineHandle>,
}

impl DirectionalLightPass {
    pub fn new() -> Self {
        Self {
            name: "DirectionalLightPass".to_string(),
            light: DirectionalLight::default(),
            light_buffer: None,
            light_bind_group: None,
            gbuffer_layout: None,
            gbuffer_bind_group: None,
            frame_layout: None,
            frame_bind_group: None,
            pipeline: None,
        }
    }

    /// Push this frame's directional light
    pub fn set_light(&mut self, light: DirectionalLight) {
        self.light = light;
    }
}

impl Default for DirectionalLightPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for DirectionalLightPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        let (width, height) = ctx.screen_size();

        ctx.get_or_create_resource(
            LIGHTING_TARGET,
            &ResourceDescriptor::texture_2d(
                width,
                height,
                LIGHTING_FORMAT,
                BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE,
            ),
        );

        let backend = ctx.backend();

        let light_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                std::mem::size_of::<DirectionalLightUniforms>() as u64,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            )
            .with_label("directional_light"),
        )?;
        self.light_buffer = Some(light_buffer);

        let gbuffer_layout = backend.create_bind_group_layout(&gbuffer_layout_entries())?;
        let light_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::UniformBuffer { dynamic: false },
        }])?;
        let frame_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::UniformBuffer { dynamic: false },
        }])?;

        self.light_bind_group = Some(backend.create_bind_group(
            light_layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: light_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?);

        let source = format!(
            "{FRAME_UNIFORMS_WGSL}\n{}",
            fullscreen_source(&format!(
                "{RECONSTRUCT_WORLD_POSITION}\n{DIRECTIONAL_LIGHT_FRAGMENT}"
            ))
        );
        self.pipeline = Some(backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("directional_light".to_string()),
            shader_source: source,
            vertex_layouts: Vec::new(),
            bind_group_layouts: vec![gbuffer_layout, light_layout, frame_layout],
            primitive_topology: PrimitiveTopology::TriangleStrip,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets: vec![ColorTargetState {
                format: LIGHTING_FORMAT,
                blend: Some(BlendState::additive()),
            }],
        })?);

        self.gbuffer_layout = Some(gbuffer_layout);
        self.frame_layout = Some(frame_layout);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) {
        let Some(lighting) = ctx.resource(LIGHTING_TARGET).and_then(|r| r.rtv) else {
            return;
        };
        let Some(entries) = gbuffer_bind_entries(ctx) else {
            return;
        };
        let Some(frame_buffer) = ctx.resource(FRAME_UNIFORMS).and_then(|r| r.buffer) else {
            return;
        };
        let (Some(pipeline), Some(light_buffer), Some(light_bind_group)) =
            (self.pipeline, self.light_buffer, self.light_bind_group)
        else {
            return;
        };

        let (width, height) = ctx.screen_size();
        let backend = ctx.backend();

        // The G-buffer views only exist after the graph allocated them, so
        // the read bind group is created on first execute.
        if self.gbuffer_bind_group.is_none() {
            if let Some(layout) = self.gbuffer_layout {
                self.gbuffer_bind_group = backend.create_bind_group(layout, &entries).ok();
            }
        }
        if self.frame_bind_group.is_none() {
            if let Some(layout) = self.frame_layout {
                self.frame_bind_group = backend
                    .create_bind_group(
                        layout,
                        &[(
                            0,
                            BindGroupEntry::Buffer {
                                buffer: frame_buffer,
                                offset: 0,
                                size: None,
                            },
                        )],
                    )
                    .ok();
            }
        }
        let (Some(gbuffer_bind_group), Some(frame_bind_group)) =
            (self.gbuffer_bind_group, self.frame_bind_group)
        else {
            return;
        };

        let uniforms = self.light.to_uniforms();
        backend.write_buffer(light_buffer, 0, bytemuck::bytes_of(&uniforms));

        // This pass runs first on the accumulation target and owns its clear
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("DirectionalLightPass".to_string()),
            color_attachments: vec![ColorAttachment {
                view: lighting,
                load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32);
        backend.set_render_pipeline(pipeline);
        backend.set_bind_group(0, gbuffer_bind_group, &[]);
        backend.set_bind_group(1, light_bind_group, &[]);
        backend.set_bind_group(2, frame_bind_group, &[]);
        backend.draw(0..4, 0..1);

        backend.end_render_pass();
    }

    fn input_resources(&self) -> Vec<String> {
        vec![
            DEPTH_TARGET.to_string(),
            ALBEDO_TARGET.to_string(),
            NORMAL_TARGET.to_string(),
            SPECULAR_TARGET.to_string(),
        ]
    }

    fn output_resources(&self) -> Vec<String> {
        vec![LIGHTING_TARGET.to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
