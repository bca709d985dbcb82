//! Renderer driver wiring the standard deferred graph
//!
//! The embedding application creates the backend (device + presentation
//! surface), hands it to [`Renderer`], pushes scene objects once and
//! per-frame camera/light/clear data every frame, then calls
//! [`render`](Renderer::render).

use glam::Vec3;

use crate::backend::traits::*;
use crate::pipeline::{CompositionPass, DirectionalLightPass, GeometryPass, PointLightPass};
use crate::render_graph::{PassId, RenderGraph, RenderPass};
use crate::scene::{CameraParams, DirectionalLight, PointLight, SceneObject};

/// High-level deferred renderer
pub struct Renderer {
    backend: Box<dyn GraphicsBackend>,
    graph: RenderGraph,

    geometry_pass: PassId,
    directional_light_pass: PassId,
    point_light_pass: PassId,
    composition_pass: PassId,

    /// Per-frame inputs, pushed into the passes before each execute
    pub camera: CameraParams,
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub directional_light: DirectionalLight,
    pub point_lights: Vec<PointLight>,
    pub clear_color: Vec3,
}

impl Renderer {
    /// Create a renderer over an injected backend. The standard pass chain
    /// (geometry, directional light, point lights, composition) is added in
    /// dependency order; the graph executes it in exactly this order.
    pub fn new(backend: Box<dyn GraphicsBackend>) -> Self {
        let (width, height) = backend.surface_size();
        let mut graph = RenderGraph::new(width, height);

        let geometry_pass = graph.add_pass(GeometryPass::new());
        let directional_light_pass = graph.add_pass(DirectionalLightPass::new());
        let point_light_pass = graph.add_pass(PointLightPass::new());
        let composition_pass = graph.add_pass(CompositionPass::new());

        Self {
            backend,
            graph,
            geometry_pass,
            directional_light_pass,
            point_light_pass,
            composition_pass,
            camera: CameraParams::default(),
            ambient_color: Vec3::splat(0.1),
            ambient_intensity: 1.0,
            directional_light: DirectionalLight::default(),
            point_lights: Vec::new(),
            clear_color: Vec3::ZERO,
        }
    }

    /// Push the scene objects rendered by the geometry pass. Must happen
    /// before the first frame; the shared vertex/index buffer is baked at
    /// graph build.
    pub fn push_objects(&mut self, objects: Vec<SceneObject>) {
        if let Some(pass) = self
            .graph
            .pass_downcast_mut::<GeometryPass>(self.geometry_pass)
        {
            pass.set_objects(objects);
        }
    }

    /// Add an extension pass after the standard chain
    pub fn add_pass<P: RenderPass + 'static>(&mut self, pass: P) -> PassId {
        self.graph.add_pass(pass)
    }

    /// Build the graph up front. Otherwise the first frame builds lazily.
    pub fn build(&mut self) -> BackendResult<()> {
        self.graph.build(self.backend.as_mut())
    }

    /// The render graph, for introspection
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut RenderGraph {
        &mut self.graph
    }

    /// The injected backend
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// Mutable access to the geometry pass objects, for per-frame transform
    /// animation
    pub fn objects_mut(&mut self) -> &mut [SceneObject] {
        self.graph
            .pass_downcast_mut::<GeometryPass>(self.geometry_pass)
            .map(|pass| pass.objects_mut())
            .unwrap_or(&mut [])
    }

    /// Render one frame: push the per-frame data into each pass, then run
    /// every pass in insertion order on the frame's command stream.
    pub fn render(&mut self) -> BackendResult<()> {
        let camera = self.camera;
        let ambient_color = self.ambient_color;
        let ambient_intensity = self.ambient_intensity;
        if let Some(pass) = self
            .graph
            .pass_downcast_mut::<GeometryPass>(self.geometry_pass)
        {
            pass.set_frame_data(camera, ambient_color, ambient_intensity);
        }

        let directional = self.directional_light.clone();
        if let Some(pass) = self
            .graph
            .pass_downcast_mut::<DirectionalLightPass>(self.directional_light_pass)
        {
            pass.set_light(directional);
        }

        let point_lights = self.point_lights.clone();
        if let Some(pass) = self
            .graph
            .pass_downcast_mut::<PointLightPass>(self.point_light_pass)
        {
            pass.set_lights(point_lights);
        }

        let clear_color = self.clear_color;
        if let Some(pass) = self
            .graph
            .pass_downcast_mut::<CompositionPass>(self.composition_pass)
        {
            pass.set_clear_color(clear_color);
        }

        let frame = self.backend.begin_frame()?;
        let result = self
            .graph
            .execute(self.backend.as_mut(), Some(frame.swapchain_view));
        self.backend.end_frame()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::pipeline::{ALBEDO_TARGET, LIGHTING_TARGET};

    #[test]
    fn renderer_wires_the_standard_chain() {
        let mut renderer = Renderer::new(Box::new(DummyBackend::new()));
        renderer.build().unwrap();

        assert_eq!(renderer.graph().pass_count(), 4);
        assert!(renderer.graph().get_resource(LIGHTING_TARGET).is_some());
        assert!(renderer.graph().get_resource(ALBEDO_TARGET).is_some());
    }

    #[test]
    fn render_without_objects_completes() {
        let mut renderer = Renderer::new(Box::new(DummyBackend::new()));
        renderer.render().unwrap();
    }
}
