//! # Framegraph Engine
//!
//! A modular engine core: a typed resource registry, an event-driven ECS
//! with a scene forest, and a data-driven render graph executor.
//!
//! ## Features
//!
//! - **Resource registry**: tiered initialization and capability lookup
//! - **Event queue**: typed, double-buffered publish/subscribe
//! - **ECS**: entities, components and systems announcing every change
//! - **Scene graph**: named roots over an arena of generational nodes
//! - **Render graph**: validated, dependency-ordered passes bound to operators
//! - **Asset management**: name-keyed background loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use framegraph_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let camera = engine.entities().create_entity()?;
//!         engine.entities().add_component(camera, RenderSource::new("main"))?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), EngineError> {
//!     let config = EngineConfig::default();
//!     let mut backend = HeadlessBackend::new(Extent2D::new(1280, 720));
//!     Engine::new(config)?.run(&mut MyApp, &mut backend)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod render;
pub mod resources;
pub mod scene;

mod application;
mod engine;

#[cfg(test)]
mod tests;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetId, AssetManager, AssetState},
        config::{Config, EngineConfig},
        ecs::{
            components::{Camera, MeshRenderer, RenderSource, TransformComponent},
            Component, Entity, EntityManager, System, SystemError,
        },
        events::EventQueue,
        foundation::math::{Mat4, Quat, Transform, Vec3, Vec4},
        render::{
            graph::{RenderAttachmentInfo, RenderSubgraphInfo, RenderSubgraphPassInfo, RenderTargetInfo},
            Extent2D, HeadlessBackend, RenderGraphInfo,
        },
        resources::{Capabilities, FromResources, Initializable, Lazy, LazyCollection, Resource, ResourceGroup, ResourceSet},
        scene::SceneManager,
        AppError, Application, Engine, EngineError,
    };
}
