//! Render pass definitions for the render graph

use std::any::Any;

use crate::backend::traits::*;
use crate::render_graph::resource::{RenderResource, ResourceDescriptor, ResourceTable};

/// Unique identifier for a render pass, an index into the graph's pass arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Context handed to each pass during graph build
///
/// Setup is where a pass creates its constant buffers, samplers and pipelines
/// on the device and declares the graph resources it owns through
/// [`get_or_create_resource`](Self::get_or_create_resource).
pub struct PassSetupContext<'a> {
    pub(crate) backend: &'a mut dyn GraphicsBackend,
    pub(crate) resources: &'a mut ResourceTable,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl<'a> PassSetupContext<'a> {
    /// Get or create a named graph resource; idempotent by name, the first
    /// call's descriptor wins.
    pub fn get_or_create_resource(
        &mut self,
        name: &str,
        descriptor: &ResourceDescriptor,
    ) -> &mut RenderResource {
        self.resources.get_or_create(name, descriptor)
    }

    /// Look up an existing resource by name
    pub fn get_resource(&self, name: &str) -> Option<&RenderResource> {
        self.resources.get(name)
    }

    /// Look up an existing resource by name, mutably
    pub fn get_resource_mut(&mut self, name: &str) -> Option<&mut RenderResource> {
        self.resources.get_mut(name)
    }

    /// The injected device
    pub fn backend(&mut self) -> &mut dyn GraphicsBackend {
        &mut *self.backend
    }

    /// Screen dimensions
    pub fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Context handed to each pass during execution
pub struct PassExecuteContext<'a> {
    pub(crate) backend: &'a mut dyn GraphicsBackend,
    pub(crate) resources: &'a ResourceTable,
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// View of the externally-owned presentation target, when executing
    /// inside a frame. Not tracked as a graph resource.
    pub(crate) backbuffer: Option<TextureViewHandle>,
}

impl<'a> PassExecuteContext<'a> {
    /// Look up a resource by name. Passes null-check their inputs and early
    /// return when a declared dependency is absent.
    pub fn resource(&self, name: &str) -> Option<&RenderResource> {
        self.resources.get(name)
    }

    /// The command-recording device context
    pub fn backend(&mut self) -> &mut dyn GraphicsBackend {
        &mut *self.backend
    }

    /// Presentation target view for this frame
    pub fn backbuffer(&self) -> Option<TextureViewHandle> {
        self.backbuffer
    }

    /// Screen dimensions
    pub fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for render passes
///
/// A pass is set up exactly once during graph build and executed every
/// frame. Input/output declarations are resource names; the graph uses them
/// to record producer/consumer edges but does not reorder execution.
pub trait RenderPass: Send + Sync {
    /// Human-readable name for diagnostics
    fn name(&self) -> &str;

    /// One-time setup: create device objects, declare owned resources
    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()>;

    /// Per-frame execution
    fn execute(&mut self, ctx: &mut PassExecuteContext);

    /// Names of resources this pass reads
    fn input_resources(&self) -> Vec<String> {
        Vec::new()
    }

    /// Names of resources this pass writes
    fn output_resources(&self) -> Vec<String> {
        Vec::new()
    }

    /// Allow downcasting so the driver can push per-frame data
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
