//! Core engine implementation

use std::sync::Arc;

use thiserror::Error;

use crate::application::{AppError, Application};
use crate::assets::{AssetManager, BytesLoader};
use crate::config::{ConfigError, EngineConfig};
use crate::ecs::components::{CameraProvider, MeshRendererProvider};
use crate::ecs::{EcsError, EntityManager, SystemRunner};
use crate::events::{EventError, EventQueue};
use crate::foundation::logging::log_error_chain;
use crate::foundation::time::Timer;
use crate::render::{
    Extent2D, RenderBackend, RenderError, RenderGraphError, RenderGraphExecutor, RenderGraphInfo,
    RenderListBuilder, RenderListOperator, SurfaceHook,
};
use crate::resources::{ResourceError, ResourceSet};
use crate::scene::SceneManager;

/// Main engine struct
///
/// The engine owns the [`ResourceSet`] and drives the frame loop. Each frame
/// runs the application update, the ECS systems, an event flush, and finally
/// the render graph against the backend's recorder.
pub struct Engine {
    resources: ResourceSet,
    config: EngineConfig,
    events: Arc<EventQueue>,
    entities: Arc<EntityManager>,
    systems: Arc<SystemRunner>,
    scenes: Arc<SceneManager>,
    assets: Arc<AssetManager>,
    render_lists: Arc<RenderListBuilder>,
    executor: Arc<RenderGraphExecutor>,
    timer: Timer,
    surface: Extent2D,
    running: bool,
}

impl Engine {
    /// Create a new engine instance with the built-in resources registered
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");

        let resources = ResourceSet::new();
        resources.insert(config.clone())?;
        let events = resources.insert(EventQueue::with_policy(config.events.error_policy))?;
        let entities = resources.add::<EntityManager>()?;
        let systems = resources.add::<SystemRunner>()?;
        let scenes = resources.add::<SceneManager>()?;
        resources.add::<BytesLoader>()?;
        let assets = resources.add::<AssetManager>()?;
        let render_lists = resources.add::<RenderListBuilder>()?;
        let executor = resources.add::<RenderGraphExecutor>()?;
        resources.add::<RenderListOperator>()?;
        resources.add::<CameraProvider>()?;
        resources.add::<MeshRendererProvider>()?;

        let surface = Extent2D::new(config.surface.width, config.surface.height);
        Ok(Self {
            resources,
            config,
            events,
            entities,
            systems,
            scenes,
            assets,
            render_lists,
            executor,
            timer: Timer::new(),
            surface,
            running: true,
        })
    }

    /// Run the engine main loop until the application quits or the frame
    /// limit is reached.
    ///
    /// Resources are destroyed on every exit path. A fatal error is logged
    /// with its full cause chain before being returned.
    pub fn run<A: Application>(&mut self, app: &mut A, backend: &mut dyn RenderBackend) -> Result<(), EngineError> {
        let result = self.run_loop(app, backend);

        app.cleanup(self);
        self.resources.destroy_all();

        match &result {
            Ok(()) => log::info!("Engine shutdown complete after {} frames", self.timer.frame_count()),
            Err(error) => log_error_chain(error),
        }
        result
    }

    fn run_loop<A: Application>(&mut self, app: &mut A, backend: &mut dyn RenderBackend) -> Result<(), EngineError> {
        app.initialize(self).map_err(EngineError::Application)?;
        self.resources.init_all()?;

        log::info!("Starting main loop...");
        while self.running {
            if self
                .config
                .max_frames
                .is_some_and(|max| self.timer.frame_count() >= max)
            {
                log::info!("Frame limit reached");
                break;
            }
            let delta_time = self.timer.tick();
            self.frame(app, backend, delta_time)?;
        }
        Ok(())
    }

    fn frame<A: Application>(
        &mut self,
        app: &mut A,
        backend: &mut dyn RenderBackend,
        delta_time: f32,
    ) -> Result<(), EngineError> {
        app.update(self, delta_time).map_err(EngineError::Application)?;
        self.systems.update(delta_time)?;
        self.events.process()?;

        let extent = backend.surface_extent();
        if extent != self.surface {
            self.surface = extent;
            for hook in self.resources.get_all::<dyn SurfaceHook>() {
                hook.on_surface_resized(extent);
            }
        }

        backend.begin_frame()?;
        self.executor.execute(backend.recorder())?;
        backend.end_frame()?;
        Ok(())
    }

    /// Replace the active render graph; see [`RenderGraphExecutor::set_render_graph`]
    pub fn set_render_graph(&self, graph: Option<RenderGraphInfo>) -> Result<bool, RenderGraphError> {
        self.executor.set_render_graph(graph)
    }

    /// Request engine shutdown at the end of the current frame
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// The resource registry, for registering and looking up resources
    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Event queue
    pub fn events(&self) -> &Arc<EventQueue> {
        &self.events
    }

    /// Entity manager
    pub fn entities(&self) -> &Arc<EntityManager> {
        &self.entities
    }

    /// System runner
    pub fn systems(&self) -> &Arc<SystemRunner> {
        &self.systems
    }

    /// Scene manager
    pub fn scenes(&self) -> &Arc<SceneManager> {
        &self.scenes
    }

    /// Asset manager
    pub fn assets(&self) -> &Arc<AssetManager> {
        &self.assets
    }

    /// Render list builder
    pub fn render_lists(&self) -> &Arc<RenderListBuilder> {
        &self.render_lists
    }

    /// Render graph executor
    pub fn executor(&self) -> &Arc<RenderGraphExecutor> {
        &self.executor
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }

    /// Frames started so far
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Resource wiring or initialization failed
    #[error("Resource error")]
    Resource(#[from] ResourceError),

    /// Configuration could not be loaded
    #[error("Configuration error")]
    Config(#[from] ConfigError),

    /// A system failed
    #[error("ECS error")]
    Ecs(#[from] EcsError),

    /// An event handler failed
    #[error("Event processing failed")]
    Events(#[from] EventError),

    /// The render graph was rejected
    #[error("Render graph error")]
    RenderGraph(#[from] RenderGraphError),

    /// Recording or presenting a frame failed
    #[error("Render error")]
    Render(#[from] RenderError),

    /// The application failed
    #[error("Application error")]
    Application(#[source] AppError),
}
