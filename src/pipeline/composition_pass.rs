//! Composition pass: resolves the G-buffer and accumulated lighting into the
//! externally-owned presentation target
//!
//! The presentation target comes from the frame context, not from the
//! resource table; the graph never tracks it.

use std::any::Any;

use glam::Vec3;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::{PassExecuteContext, PassSetupContext, RenderPass};

use super::{
    fullscreen_source, gbuffer_layout_entries, ALBEDO_TARGET, DEPTH_TARGET, FRAME_UNIFORMS,
    FRAME_UNIFORMS_WGSL, LIGHTING_TARGET, NORMAL_TARGET, RECONSTRUCT_WORLD_POSITION,
    SPECULAR_TARGET,
};

const COMPOSITION_FRAGMENT: &str = r#"
@group(0) @binding(0) var depth_texture: texture_depth_2d;
@group(0) @binding(1) var albedo_texture: texture_2d<f32>;
@group(0) @binding(2) var normal_texture: texture_2d<f32>;
@group(0) @binding(3) var specular_texture: texture_2d<f32>;
@group(0) @binding(4) var lighting_texture: texture_2d<f32>;
@group(1) @binding(0) var<uniform> frame: FrameUniforms;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(input.position.xy);
    let depth = textureLoad(depth_texture, pixel, 0);
    if (depth >= 1.0) {
        // Background keeps the clear color
        discard;
    }

    let albedo = textureLoad(albedo_texture, pixel, 0).rgb;
    let lighting = textureLoad(lighting_texture, pixel, 0).rgb;

    let ambient = frame.ambient.rgb * frame.ambient.a;
    let color = albedo * ambient + lighting;
    return vec4<f32>(color, 1.0);
}
"#;

/// Render pass writing the final resolved color
pub struct CompositionPass {
    name: String,
    clear_color: Vec3,

    input_layout_handle: Option<BindGroupLayoutHandle>,
    input_bind_group: Option<BindGroupHandle>,
    frame_layout: Option<BindGroupLayoutHandle>,
    frame_bind_group: Option<BindGroupHandle>,
    pipeline: Option<RenderPipelineHandle>,
}

impl CompositionPass {
    pub fn new() -> Self {
        Self {
            name: "CompositionPass".to_string(),
            clear_color: Vec3::ZERO,
            input_layout_handle: None,
            input_bind_group: None,
            frame_layout: None,
            frame_bind_group: None,
            pipeline: None,
        }
    }

    /// Push this frame's clear color
    pub fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color;
    }
}

impl Default for CompositionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for CompositionPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        let backend = ctx.backend();

        // G-buffer inputs plus the lighting accumulation target
        let mut entries = gbuffer_layout_entries();
        entries.push(BindGroupLayoutEntry {
            binding: 4,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: false },
            },
        });
        let input_layout = backend.create_bind_group_layout(&entries)?;

        let frame_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::UniformBuffer { dynamic: false },
        }])?;

        let source = format!(
            "{FRAME_UNIFORMS_WGSL}\n{}",
            fullscreen_source(&format!("{RECONSTRUCT_WORLD_POSITION}\n{COMPOSITION_FRAGMENT}"))
        );
        self.pipeline = Some(backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("composition".to_string()),
            shader_source: source,
            vertex_layouts: Vec::new(),
            bind_group_layouts: vec![input_layout, frame_layout],
            primitive_topology: PrimitiveTopology::TriangleStrip,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets: vec![ColorTargetState {
                format: backend.swapchain_format(),
                blend: None,
            }],
        })?);

        self.input_layout_handle = Some(input_layout);
        self.frame_layout = Some(frame_layout);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) {
        // Presentation target is only available inside a frame
        let Some(backbuffer) = ctx.backbuffer() else {
            return;
        };

        let Some(mut entries) = super::gbuffer_bind_entries(ctx) else {
            return;
        };
        let Some(lighting) = ctx.resource(LIGHTING_TARGET).and_then(|r| r.srv) else {
            return;
        };
        entries.push((4, BindGroupEntry::Texture(lighting)));

        let Some(frame_buffer) = ctx.resource(FRAME_UNIFORMS).and_then(|r| r.buffer) else {
            return;
        };
        let Some(pipeline) = self.pipeline else {
            return;
        };

        let (width, height) = ctx.screen_size();
        let backend = ctx.backend();

        if self.input_bind_group.is_none() {
            if let Some(layout) = self.input_layout_handle {
                self.input_bind_group = backend.create_bind_group(layout, &entries).ok();
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
        let (Some(input_bind_group), Some(frame_bind_group)) =
            (self.input_bind_group, self.frame_bind_group)
        else {
            return;
        };

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("CompositionPass".to_string()),
            color_attachments: vec![ColorAttachment {
                view: backbuffer,
                load_op: LoadOp::Clear([
                    self.clear_color.x,
                    self.clear_color.y,
                    self.clear_color.z,
                    1.0,
                ]),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32);
        backend.set_render_pipeline(pipeline);
        backend.set_bind_group(0, input_bind_group, &[]);
        backend.set_bind_group(1, frame_bind_group, &[]);
        backend.draw(0..4, 0..1);

        backend.end_render_pass();
    }

    fn input_resources(&self) -> Vec<String> {
        vec![
            DEPTH_TARGET.to_string(),
            ALBEDO_TARGET.to_string(),
            NORMAL_TARGET.to_string(),
            SPECULAR_TARGET.to_string(),
            LIGHTING_TARGET.to_string(),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
