//! GPU backend abstraction
//!
//! Two implementations of [`GraphicsBackend`](traits::GraphicsBackend):
//!
//! - `wgpu_backend`: the hardware path (surface + swapchain over wgpu)
//! - `dummy`: a no-op recording backend for tests and development
//!
//! The render graph and every pass talk only to the trait; the device is
//! created by the embedding application and injected, never by the graph.

pub mod dummy;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use dummy::DummyBackend;
pub use traits::*;
pub use types::*;
pub use wgpu_backend::WgpuBackend;
