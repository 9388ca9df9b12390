//! Application trait and lifecycle management

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::ecs::EcsError;
use crate::engine::Engine;
use crate::render::RenderGraphError;
use crate::resources::ResourceError;
use crate::scene::SceneError;

/// Application lifecycle trait
///
/// Implement this trait to drive the engine from your own code.
pub trait Application {
    /// Initialize the application
    ///
    /// Called once before the engine resources are initialized. Register
    /// custom resources, build the scene and set the render graph here.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Update the application
    ///
    /// Called every frame before systems run and events are flushed.
    ///
    /// # Arguments
    /// * `engine` - Mutable reference to the engine
    /// * `delta_time` - Time since last frame in seconds
    fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError>;

    /// Cleanup the application
    ///
    /// Called once when the loop ends, successfully or not, before the
    /// engine resources are destroyed.
    fn cleanup(&mut self, _engine: &mut Engine) {}
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource registration or lookup failed
    #[error("Resource error")]
    Resource(#[from] ResourceError),

    /// Entity or component operation failed
    #[error("ECS error")]
    Ecs(#[from] EcsError),

    /// Scene graph operation failed
    #[error("Scene error")]
    Scene(#[from] SceneError),

    /// Render graph was rejected
    #[error("Render graph error")]
    RenderGraph(#[from] RenderGraphError),

    /// Asset operation failed
    #[error("Asset error")]
    Asset(#[from] AssetError),

    /// Configuration error
    #[error("Config error")]
    Config(#[from] ConfigError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
