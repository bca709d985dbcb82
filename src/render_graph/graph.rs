//! Render graph definition, build and execution

use crate::backend::traits::*;
use crate::render_graph::pass::{PassExecuteContext, PassId, PassSetupContext, RenderPass};
use crate::render_graph::resource::{RenderResource, ResourceDescriptor, ResourceTable};

/// Orchestrates render pass execution and resource lifetime
///
/// Passes live in an arena in insertion order and are executed in exactly
/// that order every frame; the producer/consumer edges recorded at build time
/// exist for introspection and validation, not for scheduling.
pub struct RenderGraph {
    passes: Vec<Box<dyn RenderPass>>,
    resources: ResourceTable,
    width: u32,
    height: u32,
    is_built: bool,
}

impl RenderGraph {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            passes: Vec::new(),
            resources: ResourceTable::new(),
            width,
            height,
            is_built: false,
        }
    }

    /// Screen dimensions the graph was created for
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Add a render pass. Setup is deferred until [`build`](Self::build).
    pub fn add_pass<P: RenderPass + 'static>(&mut self, pass: P) -> PassId {
        let id = PassId(self.passes.len() as u32);
        self.passes.push(Box::new(pass));
        id
    }

    /// Get a pass by id
    pub fn pass(&self, id: PassId) -> Option<&dyn RenderPass> {
        self.passes.get(id.index()).map(|p| p.as_ref())
    }

    /// Get a pass downcast to its concrete type
    pub fn pass_downcast<P: RenderPass + 'static>(&self, id: PassId) -> Option<&P> {
        self.passes
            .get(id.index())
            .and_then(|p| p.as_any().downcast_ref::<P>())
    }

    /// Get a pass downcast to its concrete type, mutably. This is how the
    /// driver pushes per-frame scene/light/camera data into passes.
    pub fn pass_downcast_mut<P: RenderPass + 'static>(&mut self, id: PassId) -> Option<&mut P> {
        self.passes
            .get_mut(id.index())
            .and_then(|p| p.as_any_mut().downcast_mut::<P>())
    }

    /// Number of passes
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Get or create a named resource; idempotent by name, first descriptor
    /// wins.
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

    /// All tracked resources
    pub fn resources(&self) -> impl Iterator<Item = &RenderResource> {
        self.resources.iter()
    }

    /// Build the graph: set up every pass in insertion order, allocate GPU
    /// backing for declared resources, record dependency edges and validate
    /// them. Idempotent; a second call performs no work.
    pub fn build(&mut self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        if self.is_built {
            return Ok(());
        }

        log::info!(
            "building render graph: {} passes, {}x{}",
            self.passes.len(),
            self.width,
            self.height
        );

        // Setup lets each pass create device objects and declare the
        // resources it owns.
        let Self {
            passes,
            resources,
            width,
            height,
            ..
        } = self;
        for pass in passes.iter_mut() {
            let mut ctx = PassSetupContext {
                backend: &mut *backend,
                resources: &mut *resources,
                width: *width,
                height: *height,
            };
            pass.setup(&mut ctx)?;
        }

        // Allocate GPU backing and derived views for every declared resource
        for resource in resources.iter_mut() {
            resource.create_gpu_resources(backend)?;
        }

        // Record dependency edges from the declared name lists
        for (index, pass) in passes.iter().enumerate() {
            let id = PassId(index as u32);

            for input in pass.input_resources() {
                if let Some(resource) = resources.get_mut(&input) {
                    resource.register_consumer(id);
                }
            }

            for output in pass.output_resources() {
                if let Some(resource) = resources.get_mut(&output) {
                    // Last writer wins, by design: the stock pipeline has two
                    // lighting passes accumulating into one target.
                    if let Some(previous) = resource.producer {
                        log::debug!(
                            "resource '{}': producer overwritten, pass #{} replaces pass #{}",
                            output,
                            index,
                            previous.0
                        );
                    }
                    resource.producer = Some(id);
                }
            }
        }

        self.validate();
        self.apply_resource_aliasing();

        self.is_built = true;
        Ok(())
    }

    /// Execute every pass in insertion order against the given context.
    /// Builds lazily if [`build`](Self::build) has not run yet.
    pub fn execute(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        backbuffer: Option<TextureViewHandle>,
    ) -> BackendResult<()> {
        if !self.is_built {
            self.build(backend)?;
        }

        let Self {
            passes,
            resources,
            width,
            height,
            ..
        } = self;
        for pass in passes.iter_mut() {
            log::trace!("executing pass '{}'", pass.name());
            let mut ctx = PassExecuteContext {
                backend: &mut *backend,
                resources: &*resources,
                width: *width,
                height: *height,
                backbuffer,
            };
            pass.execute(&mut ctx);
        }

        Ok(())
    }

    /// Warn about declared inputs that resolve to no known resource. The
    /// offending pass still executes; it is the pass's own responsibility to
    /// null-check absent resources.
    fn validate(&self) {
        for pass in &self.passes {
            for input in pass.input_resources() {
                if !self.resources.contains(&input) {
                    log::warn!(
                        "pass '{}' requires input '{}' which doesn't exist",
                        pass.name(),
                        input
                    );
                }
            }
        }
    }

    /// Resource aliasing hook. Sequential execution keeps every resource
    /// live for the whole frame, so nothing is aliased yet; the descriptors
    /// carry `allow_aliasing` and `memory_size` for when this lands.
    fn apply_resource_aliasing(&mut self) {}
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::backend::types::TextureFormat;
    use crate::backend::DummyBackend;
    use crate::render_graph::pass::{PassExecuteContext, PassSetupContext};
    use crate::render_graph::resource::BindFlags;

    /// Minimal pass declaring arbitrary inputs/outputs and logging execution
    struct ProbePass {
        name: String,
        inputs: Vec<String>,
        outputs: Vec<String>,
        setup_count: Arc<AtomicUsize>,
        executed: Arc<Mutex<Vec<String>>>,
    }

    impl ProbePass {
        fn new(
            name: &str,
            inputs: &[&str],
            outputs: &[&str],
            executed: Arc<Mutex<Vec<String>>>,
        ) -> Self {
            Self {
                name: name.to_string(),
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                setup_count: Arc::new(AtomicUsize::new(0)),
                executed,
            }
        }
    }

    impl RenderPass for ProbePass {
        fn name(&self) -> &str {
            &self.name
        }

        fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
            self.setup_count.fetch_add(1, Ordering::SeqCst);
            for output in &self.outputs {
                ctx.get_or_create_resource(
                    output,
                    &ResourceDescriptor::texture_2d(
                        8,
                        8,
                        TextureFormat::Rgba8Unorm,
                        BindFlags::default(),
                    ),
                );
            }
            Ok(())
        }

        fn execute(&mut self, _ctx: &mut PassExecuteContext) {
            self.executed.lock().push(self.name.clone());
        }

        fn input_resources(&self) -> Vec<String> {
            self.inputs.clone()
        }

        fn output_resources(&self) -> Vec<String> {
            self.outputs.clone()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn execution_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn add_pass_does_not_invoke_setup() {
        let log = execution_log();
        let pass = ProbePass::new("geometry", &[], &["albedo"], log);
        let setup_count = Arc::clone(&pass.setup_count);

        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(pass);

        assert_eq!(setup_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn get_or_create_resource_returns_same_instance() {
        let mut graph = RenderGraph::new(64, 64);
        let first = ResourceDescriptor::texture_2d(64, 64, TextureFormat::Rgba8Unorm, BindFlags::default());
        let second = ResourceDescriptor::texture_2d(4, 4, TextureFormat::Rgba16Float, BindFlags::default());

        graph.get_or_create_resource("albedo", &first);
        graph.get_or_create_resource("albedo", &second);

        let resource = graph.get_resource("albedo").unwrap();
        assert_eq!(resource.descriptor.width, 64);
        assert_eq!(resource.descriptor.format, TextureFormat::Rgba8Unorm);
        assert_eq!(graph.resources().count(), 1);
    }

    #[test]
    fn build_is_idempotent() {
        let log = execution_log();
        let pass = ProbePass::new("geometry", &[], &["albedo", "depth"], log);
        let setup_count = Arc::clone(&pass.setup_count);

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(pass);

        graph.build(&mut backend).unwrap();
        let textures_after_first = backend.texture_count();

        graph.build(&mut backend).unwrap();

        assert_eq!(setup_count.load(Ordering::SeqCst), 1);
        assert_eq!(backend.texture_count(), textures_after_first);
    }

    #[test]
    fn execute_runs_passes_in_insertion_order() {
        let log = execution_log();
        // Declared data flow points backwards on purpose; insertion order
        // must still win.
        let consumer = ProbePass::new("consumer", &["data"], &[], Arc::clone(&log));
        let producer = ProbePass::new("producer", &[], &["data"], Arc::clone(&log));

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(consumer);
        graph.add_pass(producer);

        graph.execute(&mut backend, None).unwrap();

        assert_eq!(*log.lock(), vec!["consumer".to_string(), "producer".to_string()]);
    }

    #[test]
    fn execute_builds_lazily() {
        let log = execution_log();
        let pass = ProbePass::new("geometry", &[], &["albedo"], Arc::clone(&log));
        let setup_count = Arc::clone(&pass.setup_count);

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(pass);

        graph.execute(&mut backend, None).unwrap();

        assert_eq!(setup_count.load(Ordering::SeqCst), 1);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn build_records_producers_and_consumers() {
        let log = execution_log();
        let geometry = ProbePass::new(
            "geometry",
            &[],
            &["albedo", "normal", "specular", "depth"],
            Arc::clone(&log),
        );
        let lighting = ProbePass::new(
            "lighting",
            &["albedo", "normal", "specular", "depth"],
            &["lighting_buffer"],
            Arc::clone(&log),
        );
        let composition = ProbePass::new(
            "composition",
            &["depth", "albedo", "normal", "specular", "lighting_buffer"],
            &[],
            Arc::clone(&log),
        );

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        let _geometry_id = graph.add_pass(geometry);
        let lighting_id = graph.add_pass(lighting);
        let composition_id = graph.add_pass(composition);

        graph.build(&mut backend).unwrap();

        let lighting_buffer = graph.get_resource("lighting_buffer").unwrap();
        assert_eq!(lighting_buffer.producer, Some(lighting_id));

        let albedo = graph.get_resource("albedo").unwrap();
        assert!(albedo.consumers.contains(&lighting_id));
        assert!(albedo.consumers.contains(&composition_id));
    }

    #[test]
    fn missing_input_is_non_fatal() {
        let log = execution_log();
        let pass = ProbePass::new("broken", &["does_not_exist"], &[], Arc::clone(&log));

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(pass);

        graph.build(&mut backend).unwrap();
        graph.execute(&mut backend, None).unwrap();

        // The offending pass still executed
        assert_eq!(log.lock().len(), 1);
        assert!(graph.get_resource("does_not_exist").is_none());
    }

    #[test]
    fn duplicate_output_declaration_takes_last_writer() {
        let log = execution_log();
        let first = ProbePass::new("first", &[], &["shared"], Arc::clone(&log));
        let second = ProbePass::new("second", &[], &["shared"], Arc::clone(&log));

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(first);
        let second_id = graph.add_pass(second);

        graph.build(&mut backend).unwrap();

        let shared = graph.get_resource("shared").unwrap();
        assert_eq!(shared.producer, Some(second_id));
    }

    #[test]
    fn duplicate_consumers_are_permitted() {
        let log = execution_log();
        let producer = ProbePass::new("producer", &[], &["data"], Arc::clone(&log));
        let consumer = ProbePass::new("consumer", &["data", "data"], &[], Arc::clone(&log));

        let mut backend = DummyBackend::new();
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(producer);
        let consumer_id = graph.add_pass(consumer);

        graph.build(&mut backend).unwrap();

        let data = graph.get_resource("data").unwrap();
        assert_eq!(
            data.consumers.iter().filter(|&&c| c == consumer_id).count(),
            2
        );
    }
}
