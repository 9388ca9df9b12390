//! Command recording interface

use super::{Extent2D, View, Drawable};
use super::graph::{LoadOp, RenderAttachmentInfo, RenderSubgraphPassInfo, StoreOp};
use crate::assets::AssetId;
use crate::foundation::math::{Mat4, Vec4};

/// Sink for the commands of one frame.
///
/// Implemented by graphics backends. Calls arrive properly nested:
/// subgraph, then passes, then view bindings and draws.
pub trait CommandRecorder {
    /// Start a subgraph; attachment load operations apply here
    fn begin_subgraph(&mut self, name: &str, attachments: &[RenderAttachmentInfo], render_area: Extent2D);

    /// Finish the current subgraph; attachment store operations apply here
    fn end_subgraph(&mut self);

    /// Start a pass of the current subgraph
    fn begin_pass(&mut self, pass_index: usize, pass: &RenderSubgraphPassInfo);

    /// Finish the current pass
    fn end_pass(&mut self);

    /// Set the camera for subsequent draws
    fn bind_view(&mut self, view: &View);

    /// Draw one object
    fn draw(&mut self, drawable: &Drawable);
}

/// A command captured by [`RecordingCommandBuffer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// See [`CommandRecorder::begin_subgraph`]
    BeginSubgraph {
        /// Subgraph name
        name: String,
        /// Target name with its load and store operations
        attachments: Vec<(String, LoadOp, StoreOp)>,
        /// Render area
        render_area: Extent2D,
    },
    /// See [`CommandRecorder::end_subgraph`]
    EndSubgraph,
    /// See [`CommandRecorder::begin_pass`]
    BeginPass {
        /// Pass index within the subgraph
        pass_index: usize,
    },
    /// See [`CommandRecorder::end_pass`]
    EndPass,
    /// See [`CommandRecorder::bind_view`]
    BindView {
        /// View matrix
        view: Mat4,
        /// Projection matrix
        projection: Mat4,
    },
    /// See [`CommandRecorder::draw`]
    Draw {
        /// Mesh asset
        mesh: AssetId,
        /// Albedo texture asset
        albedo: AssetId,
        /// Model matrix
        model: Mat4,
        /// Tint color
        color: Vec4,
    },
}

/// In-memory [`CommandRecorder`] for headless runs and tests
#[derive(Debug, Default)]
pub struct RecordingCommandBuffer {
    commands: Vec<RecordedCommand>,
}

impl RecordingCommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands in call order
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the buffer empty
    pub fn take(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drop every recorded command
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of draw commands
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RecordedCommand::Draw { .. }))
            .count()
    }
}

impl CommandRecorder for RecordingCommandBuffer {
    fn begin_subgraph(&mut self, name: &str, attachments: &[RenderAttachmentInfo], render_area: Extent2D) {
        self.commands.push(RecordedCommand::BeginSubgraph {
            name: name.to_string(),
            attachments: attachments
                .iter()
                .map(|a| (a.target.clone(), a.load_op, a.store_op))
                .collect(),
            render_area,
        });
    }

    fn end_subgraph(&mut self) {
        self.commands.push(RecordedCommand::EndSubgraph);
    }

    fn begin_pass(&mut self, pass_index: usize, _pass: &RenderSubgraphPassInfo) {
        self.commands.push(RecordedCommand::BeginPass { pass_index });
    }

    fn end_pass(&mut self) {
        self.commands.push(RecordedCommand::EndPass);
    }

    fn bind_view(&mut self, view: &View) {
        self.commands.push(RecordedCommand::BindView {
            view: view.view,
            projection: view.projection.to_matrix(),
        });
    }

    fn draw(&mut self, drawable: &Drawable) {
        self.commands.push(RecordedCommand::Draw {
            mesh: drawable.mesh.clone(),
            albedo: drawable.albedo.clone(),
            model: drawable.model,
            color: drawable.color,
        });
    }
}
