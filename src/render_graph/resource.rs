//! Named GPU resources tracked by the render graph

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::pass::PassId;

/// Kind of graph resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceKind {
    #[default]
    Texture2d,
    /// Buffer resources are owned and created by the pass that needs them;
    /// the graph only tracks the name and dependency edges.
    Buffer,
}

/// How a resource may be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindFlags(u32);

impl BindFlags {
    pub const RENDER_TARGET: Self = Self(1 << 0);
    pub const SHADER_RESOURCE: Self = Self(1 << 1);
    pub const DEPTH_STENCIL: Self = Self(1 << 2);
    pub const CONSTANT_BUFFER: Self = Self(1 << 3);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for BindFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl Default for BindFlags {
    fn default() -> Self {
        Self::RENDER_TARGET | Self::SHADER_RESOURCE
    }
}

/// Describes a graph resource
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub bind_flags: BindFlags,
    /// Whether this resource may share memory with another (aliasing hook)
    pub allow_aliasing: bool,
}

impl Default for ResourceDescriptor {
    fn default() -> Self {
        Self {
            kind: ResourceKind::Texture2d,
            format: TextureFormat::Rgba8Unorm,
            width: 0,
            height: 0,
            bind_flags: BindFlags::default(),
            allow_aliasing: true,
        }
    }
}

impl ResourceDescriptor {
    pub fn texture_2d(width: u32, height: u32, format: TextureFormat, bind_flags: BindFlags) -> Self {
        Self {
            kind: ResourceKind::Texture2d,
            format,
            width,
            height,
            bind_flags,
            allow_aliasing: true,
        }
    }

    pub fn buffer() -> Self {
        Self {
            kind: ResourceKind::Buffer,
            bind_flags: BindFlags::CONSTANT_BUFFER,
            ..Default::default()
        }
    }
}

/// Maps a depth-capable typeless storage format to its depth-view format and
/// its shader-view format. Plain depth formats view as themselves.
pub fn depth_view_formats(format: TextureFormat) -> Option<(TextureFormat, TextureFormat)> {
    match format {
        TextureFormat::R32Typeless => Some((TextureFormat::Depth32Float, TextureFormat::R32Float)),
        TextureFormat::R24G8Typeless => {
            Some((TextureFormat::Depth24PlusStencil8, TextureFormat::Depth24Plus))
        }
        TextureFormat::R16Typeless => Some((TextureFormat::Depth16Unorm, TextureFormat::R16Unorm)),
        f if f.is_depth() => Some((f, f)),
        _ => None,
    }
}

/// A named GPU resource in the render graph
///
/// Owns the backing allocation and the views derived from the bind flags,
/// and records which pass produces it and which passes consume it. Producer
/// and consumers are indices into the graph's pass arena, never pointers.
#[derive(Debug)]
pub struct RenderResource {
    pub name: String,
    pub descriptor: ResourceDescriptor,

    pub texture: Option<TextureHandle>,
    /// Render-target view, present iff RENDER_TARGET is set
    pub rtv: Option<TextureViewHandle>,
    /// Shader-readable view, present iff SHADER_RESOURCE is set
    pub srv: Option<TextureViewHandle>,
    /// Depth/stencil write view, present iff DEPTH_STENCIL is set
    pub dsv: Option<TextureViewHandle>,

    /// Pass-owned buffer backing for Buffer-kind resources
    pub buffer: Option<BufferHandle>,

    /// Last pass that declared this resource as an output
    pub producer: Option<PassId>,
    /// Every pass that declared this resource as an input, in declaration
    /// order; duplicates permitted
    pub consumers: Vec<PassId>,
}

impl RenderResource {
    pub fn new(name: impl Into<String>, descriptor: ResourceDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            texture: None,
            rtv: None,
            srv: None,
            dsv: None,
            buffer: None,
            producer: None,
            consumers: Vec::new(),
        }
    }

    /// Allocate the GPU texture and derive exactly the views implied by the
    /// bind flags. Buffer-kind resources are skipped; the pass that declared
    /// them owns their backing.
    pub fn create_gpu_resources(&mut self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        if self.descriptor.kind == ResourceKind::Buffer {
            log::trace!("resource '{}': buffer kind, backing owned by pass", self.name);
            return Ok(());
        }

        let flags = self.descriptor.bind_flags;
        let mut usage = TextureUsage::empty();
        if flags.contains(BindFlags::SHADER_RESOURCE) {
            usage = usage | TextureUsage::TEXTURE_BINDING;
        }
        if flags.contains(BindFlags::RENDER_TARGET) || flags.contains(BindFlags::DEPTH_STENCIL) {
            usage = usage | TextureUsage::RENDER_ATTACHMENT;
        }

        let texture = backend.create_texture(&TextureDescriptor {
            label: Some(self.name.clone()),
            width: self.descriptor.width,
            height: self.descriptor.height,
            mip_levels: 1,
            format: self.descriptor.format,
            usage,
        })?;
        self.texture = Some(texture);

        // Depth resources derive their views through the format-substitution
        // table and never carry a color render-target view.
        if flags.contains(BindFlags::DEPTH_STENCIL) {
            let Some((dsv_format, srv_format)) = depth_view_formats(self.descriptor.format) else {
                return Err(BackendError::TextureCreationFailed(format!(
                    "resource '{}': format {:?} cannot back a depth/stencil view",
                    self.name, self.descriptor.format
                )));
            };

            self.dsv = Some(backend.create_texture_view(
                texture,
                &TextureViewDescriptor {
                    label: Some(format!("{}_dsv", self.name)),
                    format: Some(dsv_format),
                    aspect: TextureAspect::DepthOnly,
                },
            )?);

            if flags.contains(BindFlags::SHADER_RESOURCE) {
                self.srv = Some(backend.create_texture_view(
                    texture,
                    &TextureViewDescriptor {
                        label: Some(format!("{}_srv", self.name)),
                        format: Some(srv_format),
                        aspect: TextureAspect::DepthOnly,
                    },
                )?);
            }

            return Ok(());
        }

        if flags.contains(BindFlags::RENDER_TARGET) {
            self.rtv = Some(backend.create_texture_view(
                texture,
                &TextureViewDescriptor {
                    label: Some(format!("{}_rtv", self.name)),
                    ..Default::default()
                },
            )?);
        }

        if flags.contains(BindFlags::SHADER_RESOURCE) {
            self.srv = Some(backend.create_texture_view(
                texture,
                &TextureViewDescriptor {
                    label: Some(format!("{}_srv", self.name)),
                    ..Default::default()
                },
            )?);
        }

        Ok(())
    }

    /// Drop all owned GPU handles (teardown/resize path). A subsequent
    /// `create_gpu_resources` reproduces the same view set from the same
    /// descriptor.
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        for view in [self.rtv.take(), self.srv.take(), self.dsv.take()].into_iter().flatten() {
            backend.destroy_texture_view(view);
        }
        if let Some(texture) = self.texture.take() {
            backend.destroy_texture(texture);
        }
    }

    /// Record a consuming pass; duplicates permitted
    pub fn register_consumer(&mut self, pass: PassId) {
        self.consumers.push(pass);
    }

    /// Whether this resource may share memory with another
    pub fn can_alias(&self) -> bool {
        self.descriptor.allow_aliasing
    }

    /// Estimated memory footprint: width x height x bytes-per-texel, where
    /// wide floating formats count 8 bytes and everything else 4. Only the
    /// aliasing hook consumes this.
    pub fn memory_size(&self) -> u64 {
        let bytes_per_texel: u64 = match self.descriptor.format {
            TextureFormat::Rgba16Float | TextureFormat::Rg32Float | TextureFormat::Rgba32Float => 8,
            _ => 4,
        };
        u64::from(self.descriptor.width) * u64::from(self.descriptor.height) * bytes_per_texel
    }
}

/// Name-keyed resource storage shared by setup and execute contexts
#[derive(Default)]
pub struct ResourceTable {
    resources: Vec<RenderResource>,
    by_name: HashMap<String, usize>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent by name: a second request for an existing name returns the
    /// existing instance and ignores the descriptor argument.
    pub fn get_or_create(&mut self, name: &str, descriptor: &ResourceDescriptor) -> &mut RenderResource {
        if let Some(&index) = self.by_name.get(name) {
            return &mut self.resources[index];
        }

        let index = self.resources.len();
        self.resources.push(RenderResource::new(name, descriptor.clone()));
        self.by_name.insert(name.to_string(), index);
        &mut self.resources[index]
    }

    pub fn get(&self, name: &str) -> Option<&RenderResource> {
        self.by_name.get(name).map(|&index| &self.resources[index])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RenderResource> {
        self.by_name
            .get(name)
            .copied()
            .map(move |index| &mut self.resources[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderResource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RenderResource> {
        self.resources.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn depth_descriptor(format: TextureFormat) -> ResourceDescriptor {
        ResourceDescriptor::texture_2d(
            64,
            64,
            format,
            BindFlags::DEPTH_STENCIL | BindFlags::SHADER_RESOURCE,
        )
    }

    #[test]
    fn depth_substitution_table() {
        assert_eq!(
            depth_view_formats(TextureFormat::R32Typeless),
            Some((TextureFormat::Depth32Float, TextureFormat::R32Float))
        );
        assert_eq!(
            depth_view_formats(TextureFormat::R24G8Typeless),
            Some((TextureFormat::Depth24PlusStencil8, TextureFormat::Depth24Plus))
        );
        assert_eq!(
            depth_view_formats(TextureFormat::R16Typeless),
            Some((TextureFormat::Depth16Unorm, TextureFormat::R16Unorm))
        );
        assert_eq!(depth_view_formats(TextureFormat::Rgba8Unorm), None);
    }

    #[test]
    fn depth_stencil_with_shader_resource_yields_both_views() {
        let mut backend = DummyBackend::new();
        let mut resource = RenderResource::new("depth", depth_descriptor(TextureFormat::R32Typeless));

        resource.create_gpu_resources(&mut backend).unwrap();

        let dsv = resource.dsv.expect("depth view");
        let srv = resource.srv.expect("paired shader view");
        assert!(resource.rtv.is_none());

        let dsv_desc = backend.view_descriptor(dsv).unwrap();
        assert_eq!(dsv_desc.format, Some(TextureFormat::Depth32Float));
        let srv_desc = backend.view_descriptor(srv).unwrap();
        assert_eq!(srv_desc.format, Some(TextureFormat::R32Float));
    }

    #[test]
    fn depth_stencil_without_shader_resource_has_no_srv() {
        let mut backend = DummyBackend::new();
        let mut resource = RenderResource::new(
            "depth",
            ResourceDescriptor::texture_2d(64, 64, TextureFormat::R32Typeless, BindFlags::DEPTH_STENCIL),
        );

        resource.create_gpu_resources(&mut backend).unwrap();

        assert!(resource.dsv.is_some());
        assert!(resource.srv.is_none());
    }

    #[test]
    fn release_then_recreate_reproduces_view_set() {
        let mut backend = DummyBackend::new();
        let mut resource = RenderResource::new("depth", depth_descriptor(TextureFormat::R32Typeless));

        resource.create_gpu_resources(&mut backend).unwrap();
        let had = (
            resource.rtv.is_some(),
            resource.srv.is_some(),
            resource.dsv.is_some(),
        );
        assert_eq!(backend.view_count(), 2);

        resource.release(&mut backend);
        assert!(resource.texture.is_none());
        assert!(resource.srv.is_none() && resource.dsv.is_none());
        assert_eq!(backend.view_count(), 0);

        resource.create_gpu_resources(&mut backend).unwrap();
        let again = (
            resource.rtv.is_some(),
            resource.srv.is_some(),
            resource.dsv.is_some(),
        );
        assert_eq!(had, again);
        assert_eq!(backend.view_count(), 2);
    }

    #[test]
    fn buffer_kind_is_skipped() {
        let mut backend = DummyBackend::new();
        let mut resource = RenderResource::new("frame_uniforms", ResourceDescriptor::buffer());

        resource.create_gpu_resources(&mut backend).unwrap();

        assert_eq!(backend.texture_count(), 0);
        assert!(resource.texture.is_none());
    }

    #[test]
    fn memory_size_estimate() {
        let narrow = RenderResource::new(
            "albedo",
            ResourceDescriptor::texture_2d(100, 50, TextureFormat::Rgba8Unorm, BindFlags::default()),
        );
        assert_eq!(narrow.memory_size(), 100 * 50 * 4);

        let wide = RenderResource::new(
            "normal",
            ResourceDescriptor::texture_2d(100, 50, TextureFormat::Rgba16Float, BindFlags::default()),
        );
        assert_eq!(wide.memory_size(), 100 * 50 * 8);
    }

    #[test]
    fn table_get_or_create_is_idempotent() {
        let mut table = ResourceTable::new();
        let first = ResourceDescriptor::texture_2d(128, 128, TextureFormat::Rgba8Unorm, BindFlags::default());
        let second = ResourceDescriptor::texture_2d(9, 9, TextureFormat::Rgba32Float, BindFlags::default());

        table.get_or_create("albedo", &first);
        let resource = table.get_or_create("albedo", &second);

        // First descriptor wins
        assert_eq!(resource.descriptor.width, 128);
        assert_eq!(resource.descriptor.format, TextureFormat::Rgba8Unorm);
        assert_eq!(table.len(), 1);
    }
}
