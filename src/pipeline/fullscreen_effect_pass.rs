//! Generic full-screen effect pass
//!
//! Carries an arbitrary list of input resource names, output resource
//! descriptors and a pluggable fragment program, and draws the standard
//! full-screen quad. This is the extension point beyond the fixed
//! geometry/lighting/composition triple.
//!
//! The fragment program's `@group(0)` bindings follow the input list order,
//! with a point sampler at the binding index after the last input.

use std::any::Any;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::{
    BindFlags, PassExecuteContext, PassSetupContext, RenderPass, ResourceDescriptor,
};

use super::fullscreen_source;

/// A configurable full-screen effect
pub struct FullscreenEffectPass {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<(String, ResourceDescriptor)>,
    fragment_source: String,

    sampler: Option<SamplerHandle>,
    input_layout_handle: Option<BindGroupLayoutHandle>,
    input_bind_group: Option<BindGroupHandle>,
    pipeline: Option<RenderPipelineHandle>,
}

impl FullscreenEffectPass {
    pub fn new(name: &str, fragment_source: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            fragment_source: fragment_source.to_string(),
            sampler: None,
            input_layout_handle: None,
            input_bind_group: None,
            pipeline: None,
        }
    }

    /// Read the named resource, bound in declaration order
    pub fn with_input(mut self, name: &str) -> Self {
        self.inputs.push(name.to_string());
        self
    }

    /// Write the named resource, declared with the given descriptor
    pub fn with_output(mut self, name: &str, descriptor: ResourceDescriptor) -> Self {
        self.outputs.push((name.to_string(), descriptor));
        self
    }
}

impl RenderPass for FullscreenEffectPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        for (name, descriptor) in &self.outputs {
            ctx.get_or_create_resource(name, descriptor);
        }

        // Depth inputs bind as depth textures; everything else binds as an
        // unfilterable float texture read with textureLoad.
        let input_types: Vec<BindingType> = self
            .inputs
            .iter()
            .map(|name| {
                let is_depth = ctx
                    .get_resource(name)
                    .map(|r| r.descriptor.bind_flags.contains(BindFlags::DEPTH_STENCIL))
                    .unwrap_or(false);
                if is_depth {
                    BindingType::Texture {
                        sample_type: TextureSampleType::Depth,
                    }
                } else {
                    BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: false },
                    }
                }
            })
            .collect();

        let backend = ctx.backend();

        let mut entries: Vec<BindGroupLayoutEntry> = input_types
            .into_iter()
            .enumerate()
            .map(|(binding, ty)| BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: ShaderStageFlags::FRAGMENT,
                ty,
            })
            .collect();
        entries.push(BindGroupLayoutEntry {
            binding: self.inputs.len() as u32,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Sampler { comparison: false },
        });
        let input_layout = backend.create_bind_group_layout(&entries)?;

        self.sampler = Some(backend.create_sampler(&SamplerDescriptor {
            label: Some(format!("{}_sampler", self.name)),
            ..SamplerDescriptor::point()
        })?);

        let color_targets: Vec<ColorTargetState> = self
            .outputs
            .iter()
            .map(|(_, descriptor)| ColorTargetState {
                format: descriptor.format,
                blend: None,
            })
            .collect();

        self.pipeline = Some(backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(self.name.clone()),
            shader_source: fullscreen_source(&self.fragment_source),
            vertex_layouts: Vec::new(),
            bind_group_layouts: vec![input_layout],
            primitive_topology: PrimitiveTopology::TriangleStrip,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets,
        })?);

        self.input_layout_handle = Some(input_layout);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) {
        let Some(pipeline) = self.pipeline else {
            return;
        };
        let Some(sampler) = self.sampler else {
            return;
        };

        // Resolve declared outputs; any absent target aborts the pass
        let mut color_attachments = Vec::with_capacity(self.outputs.len());
        for (name, _) in &self.outputs {
            let Some(rtv) = ctx.resource(name).and_then(|r| r.rtv) else {
                return;
            };
            color_attachments.push(ColorAttachment {
                view: rtv,
                load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                store_op: StoreOp::Store,
            });
        }

        // Resolve declared inputs
        let mut entries: Vec<(u32, BindGroupEntry)> = Vec::with_capacity(self.inputs.len() + 1);
        for (binding, name) in self.inputs.iter().enumerate() {
            let Some(srv) = ctx.resource(name).and_then(|r| r.srv) else {
                return;
            };
            entries.push((binding as u32, BindGroupEntry::Texture(srv)));
        }
        entries.push((self.inputs.len() as u32, BindGroupEntry::Sampler(sampler)));

        let (width, height) = ctx.screen_size();
        let backend = ctx.backend();

        if self.input_bind_group.is_none() {
            if let Some(layout) = self.input_layout_handle {
                self.input_bind_group = backend.create_bind_group(layout, &entries).ok();
            }
        }
        let Some(input_bind_group) = self.input_bind_group else {
            return;
        };

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(self.name.clone()),
            color_attachments,
            depth_stencil_attachment: None,
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32);
        backend.set_render_pipeline(pipeline);
        backend.set_bind_group(0, input_bind_group, &[]);
        backend.draw(0..4, 0..1);

        backend.end_render_pass();
    }

    fn input_resources(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_resources(&self) -> Vec<String> {
        self.outputs.iter().map(|(name, _)| name.clone()).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{Command, DummyBackend};
    use crate::backend::types::TextureFormat;
    use crate::render_graph::RenderGraph;

    const INVERT_FRAGMENT: &str = r#"
@group(0) @binding(0) var source_texture: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let color = textureLoad(source_texture, vec2<i32>(input.position.xy), 0);
    return vec4<f32>(1.0 - color.rgb, color.a);
}
"#;

    #[test]
    fn effect_pass_draws_into_its_declared_output() {
        let mut backend = DummyBackend::new();
        let log = backend.command_log();
        let (width, height) = backend.surface_size();

        let mut graph = RenderGraph::new(width, height);
        let source = FullscreenEffectPass::new("source", INVERT_FRAGMENT).with_output(
            "scratch",
            ResourceDescriptor::texture_2d(
                width,
                height,
                TextureFormat::Rgba8Unorm,
                BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE,
            ),
        );
        let invert = FullscreenEffectPass::new("invert", INVERT_FRAGMENT)
            .with_input("scratch")
            .with_output(
                "inverted",
                ResourceDescriptor::texture_2d(
                    width,
                    height,
                    TextureFormat::Rgba8Unorm,
                    BindFlags::RENDER_TARGET | BindFlags::SHADER_RESOURCE,
                ),
            );

        let source_id = graph.add_pass(source);
        let invert_id = graph.add_pass(invert);

        graph.execute(&mut backend, None).unwrap();

        // Dependency bookkeeping follows the declared names
        let scratch = graph.get_resource("scratch").unwrap();
        assert_eq!(scratch.producer, Some(source_id));
        assert!(scratch.consumers.contains(&invert_id));

        // Both effects drew the full-screen quad
        let quad_draws = log
            .lock()
            .iter()
            .filter(|command| matches!(command, Command::Draw { vertices } if *vertices == (0..4)))
            .count();
        assert_eq!(quad_draws, 2);
    }
}
