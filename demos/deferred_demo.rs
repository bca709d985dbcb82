//! Windowed demo: a few objects lit by a directional light and a pair of
//! orbiting point lights.
//!
//! Run with `cargo run --example deferred_demo`.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::{Mat4, Quat, Vec3};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use deferred_engine::pipeline::standard_geometry_shader;
use deferred_engine::resources::{Material, Mesh};
use deferred_engine::scene::{CameraParams, DirectionalLight, PointLight, SceneObject, Transform};
use deferred_engine::{EngineConfig, Renderer, WgpuBackend};

#[derive(Parser)]
#[command(about = "Deferred engine demo")]
struct Args {
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    #[arg(long)]
    no_vsync: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let config = EngineConfig {
        title: "Deferred Engine Demo".to_string(),
        width: args.width,
        height: args.height,
        vsync: !args.no_vsync,
    };

    let event_loop = EventLoop::new().expect("event loop");
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .build(&event_loop)
            .expect("window"),
    );

    let backend = WgpuBackend::new(window.clone(), config.vsync).expect("graphics backend");
    let mut renderer = Renderer::new(Box::new(backend));

    let shader = Arc::new(standard_geometry_shader());

    let cube = Arc::new(
        Mesh::cube().with_single_slice(
            Material::new()
                .with_diffuse_color(Vec3::new(0.8, 0.3, 0.2))
                .with_specular(Vec3::ONE, 64.0),
        ),
    );
    let shiny_cube = Arc::new(
        Mesh::cube().with_single_slice(
            Material::new()
                .with_diffuse_color(Vec3::new(0.2, 0.4, 0.9))
                .with_specular(Vec3::ONE, 128.0)
                .with_highlight(Vec3::new(1.0, 0.9, 0.6), 2.0),
        ),
    );
    let floor = Arc::new(
        Mesh::plane(12.0, 12.0).with_single_slice(
            Material::new()
                .with_diffuse_color(Vec3::splat(0.6))
                .with_specular(Vec3::splat(0.2), 16.0),
        ),
    );

    renderer.push_objects(vec![
        SceneObject::new("cube", cube, shader.clone())
            .with_transform(Transform::from_position(Vec3::new(-1.2, 0.5, 0.0))),
        SceneObject::new("shiny_cube", shiny_cube, shader.clone())
            .with_transform(Transform::from_position(Vec3::new(1.2, 0.5, 0.0))),
        SceneObject::new("floor", floor, shader),
    ]);

    renderer.directional_light = DirectionalLight::new(Vec3::new(-1.0, -1.5, -0.5), Vec3::ONE, 1.2);
    renderer.ambient_color = Vec3::splat(0.15);
    renderer.ambient_intensity = 1.0;
    renderer.clear_color = Vec3::new(0.02, 0.02, 0.05);

    let aspect = config.width as f32 / config.height as f32;
    let start = Instant::now();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::RedrawRequested => {
                    let time = start.elapsed().as_secs_f32();

                    for object in renderer.objects_mut() {
                        if object.name != "floor" {
                            object.transform.rotation = Quat::from_rotation_y(time * 0.7);
                        }
                    }

                    renderer.point_lights = vec![
                        PointLight::new(
                            Vec3::new(time.cos() * 3.0, 1.5, time.sin() * 3.0),
                            8.0,
                            Vec3::new(1.0, 0.4, 0.2),
                            3.0,
                        ),
                        PointLight::new(
                            Vec3::new((time * 1.3).sin() * 2.5, 2.0, (time * 1.3).cos() * 2.5),
                            6.0,
                            Vec3::new(0.2, 0.5, 1.0),
                            2.5,
                        ),
                    ];

                    let eye = Vec3::new(5.0, 4.0, 5.0);
                    let projection = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
                    let view = Mat4::look_at_rh(eye, Vec3::new(0.0, 0.5, 0.0), Vec3::Y);
                    renderer.camera = CameraParams {
                        projection_view: projection * view,
                        position: eye,
                        near: 0.1,
                        far: 100.0,
                    };

                    if let Err(error) = renderer.render() {
                        log::error!("frame failed: {error}");
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        })
        .expect("event loop run");
}
