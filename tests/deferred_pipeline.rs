//! Integration tests for the deferred pipeline over the dummy backend

use std::sync::Arc;

use deferred_engine::backend::dummy::{Command, DummyBackend};
use deferred_engine::backend::{BindGroupEntry, BlendFactor, GraphicsBackend, LoadOp};
use deferred_engine::pipeline::{
    standard_geometry_shader, CompositionPass, DirectionalLightPass, GeometryPass, PointLightPass,
    ALBEDO_TARGET, LIGHTING_TARGET,
};
use deferred_engine::render_graph::RenderGraph;
use deferred_engine::resources::Mesh;
use deferred_engine::scene::{PointLight, SceneObject};
use deferred_engine::Renderer;
use glam::Vec3;

fn test_object(name: &str) -> SceneObject {
    SceneObject::new(
        name,
        Arc::new(Mesh::cube()),
        Arc::new(standard_geometry_shader()),
    )
}

/// Graph with the full deferred chain, returning the pass ids
fn deferred_graph(
    backend: &mut DummyBackend,
) -> (
    RenderGraph,
    deferred_engine::PassId,
    deferred_engine::PassId,
    deferred_engine::PassId,
    deferred_engine::PassId,
) {
    let (width, height) = backend.surface_size();
    let mut graph = RenderGraph::new(width, height);
    let geometry = graph.add_pass(GeometryPass::new());
    let directional = graph.add_pass(DirectionalLightPass::new());
    let point = graph.add_pass(PointLightPass::new());
    let composition = graph.add_pass(CompositionPass::new());
    (graph, geometry, directional, point, composition)
}

#[test]
fn build_wires_the_deferred_dependencies() {
    let mut backend = DummyBackend::new();
    let (mut graph, _geometry, directional, point, composition) = deferred_graph(&mut backend);

    graph.build(&mut backend).unwrap();

    // Both lighting passes declare the accumulation target; the last writer
    // is recorded as producer.
    let lighting = graph.get_resource(LIGHTING_TARGET).unwrap();
    assert_eq!(lighting.producer, Some(point));
    assert!(lighting.consumers.contains(&composition));

    let albedo = graph.get_resource(ALBEDO_TARGET).unwrap();
    assert!(albedo.consumers.contains(&directional));
    assert!(albedo.consumers.contains(&point));
    assert!(albedo.consumers.contains(&composition));
}

#[test]
fn build_is_idempotent_with_the_real_passes() {
    let mut backend = DummyBackend::new();
    let (mut graph, geometry, ..) = deferred_graph(&mut backend);
    graph
        .pass_downcast_mut::<GeometryPass>(geometry)
        .unwrap()
        .set_objects(vec![test_object("cube")]);

    graph.build(&mut backend).unwrap();
    let textures = backend.texture_count();
    let buffers = backend.buffer_count();

    graph.build(&mut backend).unwrap();

    assert_eq!(backend.texture_count(), textures);
    assert_eq!(backend.buffer_count(), buffers);
}

#[test]
fn passes_execute_in_insertion_order() {
    let mut backend = DummyBackend::new();
    let log = backend.command_log();
    let (mut graph, geometry, _directional, point, _composition) = deferred_graph(&mut backend);
    graph
        .pass_downcast_mut::<GeometryPass>(geometry)
        .unwrap()
        .set_objects(vec![test_object("cube")]);
    graph
        .pass_downcast_mut::<PointLightPass>(point)
        .unwrap()
        .set_lights(vec![PointLight::default()]);

    let frame = backend.begin_frame().unwrap();
    graph
        .execute(&mut backend, Some(frame.swapchain_view))
        .unwrap();
    backend.end_frame().unwrap();

    let labels: Vec<String> = log
        .lock()
        .iter()
        .filter_map(|command| match command {
            Command::BeginRenderPass { label, .. } => label.clone(),
            _ => None,
        })
        .collect();

    assert_eq!(
        labels,
        vec![
            "GeometryPass".to_string(),
            "DirectionalLightPass".to_string(),
            "PointLightPass".to_string(),
            "CompositionPass".to_string(),
        ]
    );
}

#[test]
fn missing_textures_bind_the_white_fallback() {
    let mut backend = DummyBackend::new();
    let log = backend.command_log();
    let (width, height) = backend.surface_size();
    let mut graph = RenderGraph::new(width, height);
    let geometry = graph.add_pass(GeometryPass::new());

    // Cube carries the default material: no diffuse, no specular texture
    graph
        .pass_downcast_mut::<GeometryPass>(geometry)
        .unwrap()
        .set_objects(vec![test_object("cube")]);

    graph.build(&mut backend).unwrap();
    let white_view = graph
        .pass_downcast::<GeometryPass>(geometry)
        .unwrap()
        .white_fallback()
        .unwrap()
        .view;

    graph.execute(&mut backend, None).unwrap();

    // Every material bind group (group 2) must carry real texture views
    let texture_groups: Vec<_> = log
        .lock()
        .iter()
        .filter_map(|command| match command {
            Command::SetBindGroup {
                index: 2,
                bind_group,
                ..
            } => Some(*bind_group),
            _ => None,
        })
        .collect();
    assert!(!texture_groups.is_empty());

    for group in texture_groups {
        let entries = backend.bind_group_entries(group).unwrap();
        let diffuse = entries.iter().find(|(binding, _)| *binding == 0).unwrap();
        let specular = entries.iter().find(|(binding, _)| *binding == 1).unwrap();
        assert!(matches!(diffuse.1, BindGroupEntry::Texture(view) if view == white_view));
        assert!(matches!(specular.1, BindGroupEntry::Texture(view) if view == white_view));
    }
}

/// Commands recorded inside the point-light render pass of one execution
fn point_pass_commands(backend: &mut DummyBackend, lights: Vec<PointLight>) -> Vec<Command> {
    let log = backend.command_log();
    let (mut graph, geometry, _directional, point, _composition) = deferred_graph(backend);
    graph
        .pass_downcast_mut::<GeometryPass>(geometry)
        .unwrap()
        .set_objects(vec![test_object("cube")]);
    graph
        .pass_downcast_mut::<PointLightPass>(point)
        .unwrap()
        .set_lights(lights);

    let frame = backend.begin_frame().unwrap();
    graph.execute(backend, Some(frame.swapchain_view)).unwrap();
    backend.end_frame().unwrap();

    let commands = log.lock().clone();
    let start = commands
        .iter()
        .position(|command| {
            matches!(
                command,
                Command::BeginRenderPass { label: Some(label), .. } if label == "PointLightPass"
            )
        })
        .expect("point light pass recorded");
    let end = commands[start..]
        .iter()
        .position(|command| matches!(command, Command::EndRenderPass))
        .unwrap()
        + start;
    commands[start..=end].to_vec()
}

#[test]
fn point_lights_accumulate_additively() {
    let light_a = PointLight::new(Vec3::new(1.0, 0.0, 0.0), 5.0, Vec3::X, 2.0);
    let light_b = PointLight::new(Vec3::new(0.0, 1.0, 0.0), 3.0, Vec3::Y, 1.0);

    let mut backend_both = DummyBackend::new();
    let both = point_pass_commands(&mut backend_both, vec![light_a.clone(), light_b.clone()]);
    let mut backend_a = DummyBackend::new();
    let only_a = point_pass_commands(&mut backend_a, vec![light_a]);
    let mut backend_b = DummyBackend::new();
    let only_b = point_pass_commands(&mut backend_b, vec![light_b]);

    let draws = |commands: &[Command]| {
        commands
            .iter()
            .filter(|command| matches!(command, Command::Draw { .. }))
            .count()
    };

    // Two lights draw exactly the union of each light drawn alone
    assert_eq!(draws(&both), draws(&only_a) + draws(&only_b));

    // The accumulation target is loaded, never cleared, by the point pass
    for commands in [&both, &only_a, &only_b] {
        let Command::BeginRenderPass {
            color_attachments, ..
        } = &commands[0]
        else {
            panic!("first command is the pass begin");
        };
        assert_eq!(color_attachments[0].load_op, LoadOp::Load);
    }

    // And the pipeline sums contributions: ONE/ONE additive blending
    let Some(Command::SetPipeline(pipeline)) = both
        .iter()
        .find(|command| matches!(command, Command::SetPipeline(_)))
    else {
        panic!("point pass sets a pipeline");
    };
    let descriptor = backend_both.pipeline_descriptor(*pipeline).unwrap();
    let blend = descriptor.color_targets[0].blend.expect("blend enabled");
    assert_eq!(blend.color.src_factor, BlendFactor::One);
    assert_eq!(blend.color.dst_factor, BlendFactor::One);
    assert_eq!(blend.alpha.src_factor, BlendFactor::One);
    assert_eq!(blend.alpha.dst_factor, BlendFactor::One);
}

#[test]
fn frames_create_no_new_gpu_allocations() {
    let mut backend = DummyBackend::new();
    let (mut graph, geometry, _directional, point, _composition) = deferred_graph(&mut backend);
    graph
        .pass_downcast_mut::<GeometryPass>(geometry)
        .unwrap()
        .set_objects(vec![
            test_object("cube"),
            SceneObject::new(
                "floor",
                Arc::new(Mesh::plane(10.0, 10.0)),
                Arc::new(standard_geometry_shader()),
            ),
        ]);
    graph
        .pass_downcast_mut::<PointLightPass>(point)
        .unwrap()
        .set_lights(vec![PointLight::default()]);

    let run_frame = |graph: &mut RenderGraph, backend: &mut DummyBackend| {
        let frame = backend.begin_frame().unwrap();
        graph.execute(backend, Some(frame.swapchain_view)).unwrap();
        backend.end_frame().unwrap();
    };

    run_frame(&mut graph, &mut backend);
    let textures = backend.texture_count();
    let buffers = backend.buffer_count();

    run_frame(&mut graph, &mut backend);
    run_frame(&mut graph, &mut backend);

    assert_eq!(backend.texture_count(), textures);
    assert_eq!(backend.buffer_count(), buffers);
}

#[test]
fn renderer_drives_the_standard_chain() {
    let mut renderer = Renderer::new(Box::new(DummyBackend::new()));
    renderer.push_objects(vec![test_object("cube")]);
    renderer.point_lights = vec![PointLight::default()];
    renderer.clear_color = Vec3::new(0.1, 0.2, 0.3);

    renderer.render().unwrap();
    renderer.render().unwrap();

    assert!(renderer.graph().get_resource(LIGHTING_TARGET).is_some());
}
