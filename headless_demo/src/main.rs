//! Headless demo application
//!
//! Builds a small scene of spinning cubes, loads a forward render graph and
//! runs a fixed number of frames against the in-memory backend. Pass a TOML
//! or RON engine config as the first argument to override the defaults.

use framegraph_engine::ecs::EcsError;
use framegraph_engine::foundation::logging;
use framegraph_engine::prelude::*;
use framegraph_engine::render::{RecordedCommand, RenderBackend};

const FORWARD_GRAPH: &str = include_str!("../resources/forward.ron");
const CUBES: usize = 5;

/// Spin speed in radians per second around the Y axis
struct Spin(f32);

impl Component for Spin {}

/// Rotates every entity with a [`Spin`]
struct SpinSystem {
    entities: Lazy<EntityManager>,
}

impl Resource for SpinSystem {
    const GROUP: ResourceGroup = ResourceGroup::ECSSystem;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn System>(|this| this);
    }
}

impl FromResources for SpinSystem {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            entities: resources.get_lazy(),
        }
    }
}

impl System for SpinSystem {
    fn name(&self) -> &str {
        "spin"
    }

    fn update(&self, delta_time: f32) -> Result<(), SystemError> {
        let mut store = self.entities.write();
        let spinning: Vec<_> = store
            .query()
            .fetch::<Spin>()
            .map(|(entity, spin)| (entity, spin.0))
            .collect();
        for (entity, speed) in spinning {
            if let Some(transform) = store.get_mut::<TransformComponent>(entity) {
                let step = Quat::from_axis_angle(&Vec3::y_axis(), speed * delta_time);
                transform.rotation = step * transform.rotation;
            }
        }
        Ok(())
    }
}

struct CubesDemo;

impl CubesDemo {
    fn spawn_cube(engine: &Engine, world: framegraph_engine::scene::NodeId, index: usize) -> Result<(), EcsError> {
        let entities = engine.entities();
        let cube = entities.create_entity()?;
        #[allow(clippy::cast_precision_loss)]
        let (slot, count) = (index as f32, CUBES as f32);
        let x = (slot - (count - 1.0) / 2.0) * 2.0;
        entities.add_component(cube, TransformComponent::from_position(Vec3::new(x, 0.0, 0.0)))?;
        entities.add_component(
            cube,
            MeshRenderer::new("cube", "checker").with_color(Vec4::new(0.8, 0.7, 0.5, 1.0)),
        )?;
        entities.add_component(cube, Spin(0.5 + slot * 0.25))?;
        if let Err(error) = engine.scenes().write().insert_entity_node(world, cube) {
            log::error!("Could not place {cube}: {error}");
        }
        Ok(())
    }
}

impl Application for CubesDemo {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        engine.resources().add::<SpinSystem>()?;

        let world = engine.scenes().write().add_root("world")?;
        let entities = engine.entities();
        let surface = engine.config().surface;

        let camera = entities.create_entity()?;
        entities.add_component(camera, RenderSource::new("main"))?;
        #[allow(clippy::cast_precision_loss)]
        let aspect = surface.width as f32 / surface.height.max(1) as f32;
        entities.add_component(camera, Camera::perspective(45.0, aspect, 0.1, 100.0))?;
        entities.add_component(camera, TransformComponent::from_position(Vec3::new(0.0, 2.0, 12.0)))?;
        engine.scenes().write().insert_entity_node(world, camera)?;

        for index in 0..CUBES {
            Self::spawn_cube(engine, world, index)?;
        }

        engine.set_render_graph(Some(RenderGraphInfo::from_ron_str(FORWARD_GRAPH)?))?;
        log::info!("Scene ready: camera plus {CUBES} cubes");
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        if engine.frame_count() % 30 == 0 {
            log::debug!("Frame {}", engine.frame_count());
        }
        Ok(())
    }
}

fn load_config() -> Result<EngineConfig, LoadConfigError> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(&path).map_err(|source| LoadConfigError { path, source })?,
        None => EngineConfig::default(),
    };
    config.max_frames.get_or_insert(120);
    Ok(config)
}

/// Config file could not be used
#[derive(Debug, thiserror::Error)]
#[error("Could not load config `{path}`")]
struct LoadConfigError {
    path: String,
    #[source]
    source: framegraph_engine::config::ConfigError,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting headless demo for {:?} frames", config.max_frames);

    let mut backend = HeadlessBackend::new(Extent2D::new(config.surface.width, config.surface.height));
    let mut engine = Engine::new(config)?;
    engine.run(&mut CubesDemo, &mut backend)?;

    let draws = backend
        .last_frame()
        .iter()
        .filter(|command| matches!(command, RecordedCommand::Draw { .. }))
        .count();
    log::info!(
        "Rendered {} frames at {}x{}, {draws} draws in the last one",
        backend.frame_count(),
        backend.surface_extent().width,
        backend.surface_extent().height
    );
    Ok(())
}
