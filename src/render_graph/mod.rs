//! Render graph infrastructure
//!
//! A declarative structure of named GPU resources and ordered passes. Passes
//! declare the resource names they read and write; the graph allocates the
//! backing textures and views at build time and records producer/consumer
//! edges for validation. Execution is strictly insertion-ordered on a single
//! command stream; correctness depends on producers being added before their
//! consumers.

mod graph;
mod pass;
mod resource;

pub use graph::RenderGraph;
pub use pass::{PassExecuteContext, PassId, PassSetupContext, RenderPass};
pub use resource::{
    depth_view_formats, BindFlags, RenderResource, ResourceDescriptor, ResourceKind, ResourceTable,
};
