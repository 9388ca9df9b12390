//! Typed resource registry
//!
//! A [`ResourceSet`] owns every long-lived subsystem of the engine. Resources
//! are registered once per concrete type into a [`ResourceGroup`] tier, may
//! expose any number of capabilities (trait objects such as
//! `dyn Initializable` or `dyn DrawableProvider`), and are initialized in tier
//! order and destroyed in the exact reverse order.
//!
//! ```rust,ignore
//! struct Renderer { assets: Lazy<AssetManager> }
//!
//! impl Resource for Renderer {
//!     const GROUP: ResourceGroup = ResourceGroup::Rendering;
//!
//!     fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
//!         capabilities.provide::<dyn Initializable>(|this| this);
//!     }
//! }
//!
//! let resources = ResourceSet::new();
//! resources.add::<Renderer>()?;
//! resources.init_all()?;
//! ```

mod group;
mod lazy;
mod set;

pub use group::ResourceGroup;
pub use lazy::{Lazy, LazyCollection};
pub use set::{Capabilities, FromResources, ResourceSet};

use std::any::Any;
use thiserror::Error;

/// Error type returned by [`Initializable::init`]
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// A long-lived instance owned by a [`ResourceSet`]
pub trait Resource: Any + Send + Sync {
    /// Tier controlling init/destroy ordering
    const GROUP: ResourceGroup = ResourceGroup::Custom;

    /// Declare the capabilities this resource implements
    fn register_capabilities(_capabilities: &mut Capabilities<'_, Self>)
    where
        Self: Sized,
    {
    }
}

/// Capability for resources with a startup and shutdown phase
pub trait Initializable: Send + Sync {
    /// Called once, in tier order, after every resource has been constructed
    fn init(&self) -> Result<(), InitError>;

    /// Called once, in reverse tier order, during shutdown
    fn destroy(&self) {}
}

/// Resource registry errors
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A concrete type was registered twice
    #[error("Resource `{0}` is already registered")]
    AlreadyRegistered(&'static str),

    /// No resource provides the requested type or capability
    #[error("No resource provides `{0}`")]
    NotRegistered(&'static str),

    /// More than one resource provides a capability requested as unique
    #[error("{count} resources provide `{type_name}`, expected exactly one")]
    Ambiguous {
        /// Requested type or capability
        type_name: &'static str,
        /// Number of providers found
        count: usize,
    },

    /// The registry behind a lazy handle was dropped
    #[error("Resource set was dropped before `{0}` could be resolved")]
    RegistryDropped(&'static str),

    /// A resource failed to initialize
    #[error("Failed to initialize resource `{resource}`")]
    InitFailed {
        /// Concrete type name of the failing resource
        resource: &'static str,
        /// Underlying failure
        #[source]
        source: InitError,
    },
}
