//! Dummy backend for testing and development
//!
//! Performs no GPU work but hands out valid handles and records every
//! recorded command, so graph construction, pass ordering and binding
//! behavior can be verified without GPU hardware.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::traits::*;
use crate::backend::types::*;

/// A recorded backend command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginRenderPass {
        label: Option<String>,
        color_attachments: Vec<ColorAttachment>,
        depth_stencil_attachment: Option<DepthStencilAttachment>,
    },
    EndRenderPass,
    SetPipeline(RenderPipelineHandle),
    SetBindGroup {
        index: u32,
        bind_group: BindGroupHandle,
        offsets: Vec<u32>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    SetIndexBuffer {
        buffer: BufferHandle,
    },
    SetViewport,
    Draw {
        vertices: std::ops::Range<u32>,
    },
    DrawIndexed {
        indices: std::ops::Range<u32>,
        base_vertex: i32,
    },
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        len: usize,
    },
}

/// Shared command log, cloneable before the backend is moved into a renderer
pub type CommandLog = Arc<Mutex<Vec<Command>>>;

/// Dummy backend
pub struct DummyBackend {
    width: u32,
    height: u32,
    next_id: u64,
    texture_count: usize,
    buffer_count: usize,
    view_count: usize,
    view_descriptors: Vec<(TextureViewHandle, TextureHandle, TextureViewDescriptor)>,
    bind_groups: Vec<(BindGroupHandle, Vec<(u32, BindGroupEntry)>)>,
    pipelines: Vec<(RenderPipelineHandle, RenderPipelineDescriptor)>,
    log: CommandLog,
}

impl DummyBackend {
    pub fn new() -> Self {
        Self::with_size(1280, 720)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_id: 1,
            texture_count: 0,
            buffer_count: 0,
            view_count: 0,
            view_descriptors: Vec::new(),
            bind_groups: Vec::new(),
            pipelines: Vec::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Clone the shared command log handle
    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.texture_count
    }

    /// Number of live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Number of live texture views
    pub fn view_count(&self) -> usize {
        self.view_count
    }

    /// Descriptor a view was created with
    pub fn view_descriptor(&self, view: TextureViewHandle) -> Option<&TextureViewDescriptor> {
        self.view_descriptors
            .iter()
            .find(|(v, _, _)| *v == view)
            .map(|(_, _, desc)| desc)
    }

    /// Entries a bind group was created with
    pub fn bind_group_entries(&self, bind_group: BindGroupHandle) -> Option<&[(u32, BindGroupEntry)]> {
        self.bind_groups
            .iter()
            .find(|(h, _)| *h == bind_group)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Descriptor a render pipeline was created with
    pub fn pipeline_descriptor(
        &self,
        pipeline: RenderPipelineHandle,
    ) -> Option<&RenderPipelineDescriptor> {
        self.pipelines
            .iter()
            .find(|(h, _)| *h == pipeline)
            .map(|(_, desc)| desc)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        let view = TextureViewHandle(self.next_id());
        Ok(FrameContext {
            swapchain_view: view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!("DummyBackend: create_buffer {:?} size={}", desc.label, desc.size);
        self.buffer_count += 1;
        Ok(BufferHandle(self.next_id()))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: create_buffer_init {:?} len={}",
            desc.label,
            data.len()
        );
        self.buffer_count += 1;
        Ok(BufferHandle(self.next_id()))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        self.log.lock().push(Command::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "DummyBackend: create_texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        self.texture_count += 1;
        Ok(TextureHandle(self.next_id()))
    }

    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
        desc: &TextureViewDescriptor,
    ) -> BackendResult<TextureViewHandle> {
        self.view_count += 1;
        let view = TextureViewHandle(self.next_id());
        self.view_descriptors.push((view, texture, desc.clone()));
        Ok(view)
    }

    fn write_texture(&mut self, _texture: TextureHandle, data: &[u8], width: u32, height: u32) {
        log::trace!("DummyBackend: write_texture {}x{} len={}", width, height, data.len());
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("DummyBackend: create_sampler {:?}", desc.label);
        Ok(SamplerHandle(self.next_id()))
    }

    fn create_bind_group_layout(
        &mut self,
        _entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        Ok(BindGroupLayoutHandle(self.next_id()))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let handle = BindGroupHandle(self.next_id());
        self.bind_groups.push((handle, entries.to_vec()));
        Ok(handle)
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        let handle = RenderPipelineHandle(self.next_id());
        self.pipelines.push((handle, desc.clone()));
        Ok(handle)
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.log.lock().push(Command::BeginRenderPass {
            label: desc.label.clone(),
            color_attachments: desc.color_attachments.clone(),
            depth_stencil_attachment: desc.depth_stencil_attachment.clone(),
        });
    }

    fn end_render_pass(&mut self) {
        self.log.lock().push(Command::EndRenderPass);
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.log.lock().push(Command::SetPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle, offsets: &[u32]) {
        self.log.lock().push(Command::SetBindGroup {
            index,
            bind_group,
            offsets: offsets.to_vec(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, _offset: u64) {
        self.log.lock().push(Command::SetVertexBuffer { slot, buffer });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, _format: IndexFormat) {
        self.log.lock().push(Command::SetIndexBuffer { buffer });
    }

    fn set_viewport(&mut self, _x: f32, _y: f32, _width: f32, _height: f32) {
        self.log.lock().push(Command::SetViewport);
    }

    fn draw(&mut self, vertices: std::ops::Range<u32>, _instances: std::ops::Range<u32>) {
        self.log.lock().push(Command::Draw { vertices });
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        _instances: std::ops::Range<u32>,
    ) {
        self.log.lock().push(Command::DrawIndexed { indices, base_vertex });
    }

    fn destroy_buffer(&mut self, _buffer: BufferHandle) {
        self.buffer_count = self.buffer_count.saturating_sub(1);
    }

    fn destroy_texture(&mut self, _texture: TextureHandle) {
        self.texture_count = self.texture_count.saturating_sub(1);
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        self.view_count = self.view_count.saturating_sub(1);
        self.view_descriptors.retain(|(v, _, _)| *v != view);
    }
}
