//! Render graph model and compilation

mod compile;
mod model;

pub use compile::{compile, CompiledRenderGraph, CompiledSubgraph};
pub use model::{
    ClearValue, ImageLayout, LoadOp, OperatorBinding, OperatorParams, ParamValue,
    RenderAttachmentInfo, RenderGraphInfo, RenderSubgraphInfo, RenderSubgraphPassInfo,
    RenderTargetInfo, StoreOp, TargetFormat, TargetSource, TargetUsage,
};

use thiserror::Error;

/// Render graph configuration errors.
///
/// Raised when a graph is set, never while it executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderGraphError {
    /// An attachment names a target that does not exist
    #[error("Subgraph `{subgraph}` attachment {attachment} refers to unknown target `{target}`")]
    UnknownTarget {
        /// Subgraph name
        subgraph: String,
        /// Attachment index
        attachment: usize,
        /// Missing target name
        target: String,
    },

    /// A pass refers to an attachment index past the end of the list
    #[error("Subgraph `{subgraph}` pass {pass} refers to missing attachment {index}")]
    AttachmentOutOfRange {
        /// Subgraph name
        subgraph: String,
        /// Pass index
        pass: usize,
        /// Offending attachment index
        index: usize,
    },

    /// A pass depends on a pass index past the end of the list
    #[error("Subgraph `{subgraph}` pass {pass} depends on missing pass {index}")]
    PassOutOfRange {
        /// Subgraph name
        subgraph: String,
        /// Pass index
        pass: usize,
        /// Offending dependency index
        index: usize,
    },

    /// An attachment is used in a way its target does not allow
    #[error("Subgraph `{subgraph}` pass {pass} uses target `{target}` as {required:?}, which its usage does not allow")]
    UsageMismatch {
        /// Subgraph name
        subgraph: String,
        /// Pass index
        pass: usize,
        /// Target name
        target: String,
        /// Usage the pass needs
        required: TargetUsage,
    },

    /// `Load` from an undefined layout reads garbage
    #[error("Subgraph `{subgraph}` attachment {attachment} loads contents from an undefined layout")]
    LoadFromUndefined {
        /// Subgraph name
        subgraph: String,
        /// Attachment index
        attachment: usize,
    },

    /// Only swapchain images can be presented
    #[error("Subgraph `{subgraph}` attachment {attachment} uses the present layout on non-swapchain target `{target}`")]
    PresentOnImage {
        /// Subgraph name
        subgraph: String,
        /// Attachment index
        attachment: usize,
        /// Target name
        target: String,
    },

    /// Fixed-size attachments of one subgraph disagree
    #[error("Subgraph `{subgraph}` mixes attachments of different sizes")]
    SizeMismatch {
        /// Subgraph name
        subgraph: String,
    },

    /// A pass is bound to an operator nobody registered
    #[error("Subgraph `{subgraph}` pass {pass} uses unknown render operator `{operator}`")]
    UnknownOperator {
        /// Subgraph name
        subgraph: String,
        /// Pass index
        pass: usize,
        /// Operator name
        operator: String,
    },

    /// A subgraph depends on a subgraph that does not exist
    #[error("Subgraph `{subgraph}` depends on unknown subgraph `{dependency}`")]
    UnknownSubgraph {
        /// Subgraph name
        subgraph: String,
        /// Missing dependency
        dependency: String,
    },

    /// The passes of a subgraph depend on each other in a cycle
    #[error("Passes of subgraph `{0}` have cyclic dependencies")]
    PassCycle(String),

    /// Subgraphs depend on each other in a cycle
    #[error("Subgraphs have cyclic dependencies")]
    SubgraphCycle,

    /// RON parsing failed
    #[error("Failed to parse render graph: {0}")]
    Parse(String),

    /// RON serialization failed
    #[error("Failed to serialize render graph: {0}")]
    Serialize(String),
}
