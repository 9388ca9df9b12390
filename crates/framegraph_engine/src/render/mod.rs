//! Rendering
//!
//! The render graph ([`graph`]) describes targets, attachments and passes as
//! data. The [`RenderGraphExecutor`] validates and orders it, then walks it
//! every frame, handing each pass to the [`RenderOperator`] it is bound to.
//! Operators pull [`RenderList`]s from the [`RenderListBuilder`] and record
//! through an abstract [`CommandRecorder`]; the graphics API lives behind a
//! [`RenderBackend`].

mod backend;
mod commands;
mod executor;
pub mod graph;
pub mod list;
mod operator;

pub use backend::{HeadlessBackend, RenderBackend};
pub use commands::{CommandRecorder, RecordedCommand, RecordingCommandBuffer};
pub use executor::{RenderContext, RenderGraphExecutor};
pub use graph::{RenderGraphError, RenderGraphInfo};
pub use list::{
    Drawable, DrawableProvider, Projection, RenderList, RenderListBuilder, View, ViewProvider,
};
pub use operator::{OperatorError, RenderListOperator, RenderOperator};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of a surface or render area in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent2D {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent2D {
    /// Create an extent
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; 1.0 for degenerate extents
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Notified when the presentation surface changes size
pub trait SurfaceHook: Send + Sync {
    /// The surface now measures `extent`
    fn on_surface_resized(&self, extent: Extent2D);
}

/// Notified when the active render graph changes
pub trait RenderGraphHook: Send + Sync {
    /// `None` means the graph was torn down
    fn on_render_graph_changed(&self, graph: Option<&RenderGraphInfo>);
}

/// Frame-time rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// A pass refers to an operator that is not registered
    #[error("Render operator `{0}` is not registered")]
    UnknownOperator(String),

    /// An operator failed while recording
    #[error("Render operator `{operator}` failed in subgraph `{subgraph}` pass {pass}")]
    OperatorFailed {
        /// Operator name
        operator: String,
        /// Subgraph name
        subgraph: String,
        /// Pass index
        pass: usize,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend could not begin or finish a frame
    #[error("Render backend error: {0}")]
    Backend(String),
}
