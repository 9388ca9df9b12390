//! Declarative render graph description
//!
//! Plain data, compared by value and loadable from RON. Nothing here talks to
//! a graphics API; the executor validates and orders it, and the backend
//! honours the load/store operations and layouts as declared.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::RenderGraphError;
use crate::render::Extent2D;

bitflags! {
    /// Ways a render target may be attached to a pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TargetUsage: u32 {
        /// Read as an input attachment
        const INPUT = 1;
        /// Written as a color attachment
        const COLOR = 1 << 1;
        /// Used as the depth-stencil attachment
        const DEPTH_STENCIL = 1 << 2;
    }
}

/// Where a render target's image comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSource {
    /// Image owned by the backend for this graph
    #[default]
    Image,
    /// The presentation surface's current image
    Swapchain,
}

/// Pixel format of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetFormat {
    /// 8-bit RGBA, linear
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB
    Rgba8Srgb,
    /// 8-bit BGRA, sRGB
    Bgra8Srgb,
    /// 16-bit float RGBA
    Rgba16Float,
    /// 32-bit float depth
    Depth32Float,
    /// 24-bit depth with 8-bit stencil
    Depth24Stencil8,
}

impl TargetFormat {
    /// Whether the format holds depth data
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float | Self::Depth24Stencil8)
    }
}

/// A named image that attachments refer to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderTargetInfo {
    /// Backing image
    #[serde(default)]
    pub source: TargetSource,
    /// Allowed attachment kinds
    pub usage: TargetUsage,
    /// Pixel format; `None` lets the backend choose (surface format for swapchains)
    #[serde(default)]
    pub format: Option<TargetFormat>,
    /// Fixed size; `None` follows the surface
    #[serde(default)]
    pub size: Option<Extent2D>,
}

impl RenderTargetInfo {
    /// The presentation surface, usable as a color attachment
    pub const fn swapchain() -> Self {
        Self {
            source: TargetSource::Swapchain,
            usage: TargetUsage::COLOR,
            format: None,
            size: None,
        }
    }

    /// A surface-sized image
    pub const fn image(usage: TargetUsage, format: TargetFormat) -> Self {
        Self {
            source: TargetSource::Image,
            usage,
            format: Some(format),
            size: None,
        }
    }

    /// Give the target a fixed size
    #[must_use]
    pub const fn with_size(mut self, size: Extent2D) -> Self {
        self.size = Some(size);
        self
    }
}

/// What happens to an attachment's contents when a subgraph starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadOp {
    /// Fill with the clear value
    Clear,
    /// Keep the previous contents
    Load,
    /// Contents are undefined
    #[default]
    DontCare,
}

/// What happens to an attachment's contents when a subgraph ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreOp {
    /// Write the results back
    #[default]
    Store,
    /// Results may be discarded
    DontCare,
}

/// Image layout at a subgraph boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageLayout {
    /// Contents are not preserved
    #[default]
    Undefined,
    /// Optimal for color attachment writes
    ColorAttachment,
    /// Optimal for depth-stencil use
    DepthStencilAttachment,
    /// Ready for presentation
    Present,
}

/// Clear value for [`LoadOp::Clear`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ClearValue {
    /// RGBA color
    Color([f32; 4]),
    /// Depth and stencil
    DepthStencil {
        /// Depth value
        depth: f32,
        /// Stencil value
        stencil: u32,
    },
}

// Graphs are compared by value; floats compare by bit pattern.
impl PartialEq for ClearValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Color(a), Self::Color(b)) => bits(a) == bits(b),
            (
                Self::DepthStencil { depth, stencil },
                Self::DepthStencil {
                    depth: other_depth,
                    stencil: other_stencil,
                },
            ) => depth.to_bits() == other_depth.to_bits() && stencil == other_stencil,
            _ => false,
        }
    }
}

impl Eq for ClearValue {}

impl Hash for ClearValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Color(rgba) => bits(rgba).hash(state),
            Self::DepthStencil { depth, stencil } => {
                depth.to_bits().hash(state);
                stencil.hash(state);
            }
        }
    }
}

/// A use of a render target inside a subgraph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderAttachmentInfo {
    /// Name of the target in [`RenderGraphInfo::targets`]
    pub target: String,
    /// Operation at subgraph start
    #[serde(default)]
    pub load_op: LoadOp,
    /// Operation at subgraph end
    #[serde(default)]
    pub store_op: StoreOp,
    /// Layout the image is in before the subgraph
    #[serde(default)]
    pub initial_layout: ImageLayout,
    /// Layout the image is left in after the subgraph
    #[serde(default)]
    pub final_layout: ImageLayout,
    /// Value used by [`LoadOp::Clear`]
    #[serde(default)]
    pub clear_value: Option<ClearValue>,
}

impl RenderAttachmentInfo {
    /// Attachment of `target` with undefined contents, stored at the end
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            load_op: LoadOp::DontCare,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::Undefined,
            clear_value: None,
        }
    }

    /// Clear to `value` on load
    #[must_use]
    pub fn cleared(mut self, value: ClearValue) -> Self {
        self.load_op = LoadOp::Clear;
        self.clear_value = Some(value);
        self
    }

    /// Set the load and store operations
    #[must_use]
    pub fn with_ops(mut self, load_op: LoadOp, store_op: StoreOp) -> Self {
        self.load_op = load_op;
        self.store_op = store_op;
        self
    }

    /// Set the boundary layouts
    #[must_use]
    pub fn with_layouts(mut self, initial: ImageLayout, final_layout: ImageLayout) -> Self {
        self.initial_layout = initial;
        self.final_layout = final_layout;
        self
    }
}

fn bits(values: &[f32; 4]) -> [u32; 4] {
    values.map(f32::to_bits)
}

/// Value of an operator parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Free-form text, e.g. a render source name
    Text(String),
    /// Four floats, e.g. a color
    Vec4([f32; 4]),
}

impl ParamValue {
    /// The text, if this is a `Text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The number, if this is a `Float` or `Int`
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// The flag, if this is a `Bool`
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Vec4(a), Self::Vec4(b)) => bits(a) == bits(b),
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(value) => value.hash(state),
            Self::Int(value) => value.hash(state),
            Self::Float(value) => value.to_bits().hash(state),
            Self::Text(value) => value.hash(state),
            Self::Vec4(values) => bits(values).hash(state),
        }
    }
}

/// Named operator parameters
pub type OperatorParams = BTreeMap<String, ParamValue>;

/// Binds a pass to a render operator by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorBinding {
    /// Operator name as reported by `RenderOperator::name`
    pub name: String,
    /// Overrides for the operator's default parameters
    #[serde(default)]
    pub params: OperatorParams,
}

/// One pass of a subgraph
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderSubgraphPassInfo {
    /// Indices into the subgraph attachments read as inputs
    #[serde(default)]
    pub input_attachments: Vec<usize>,
    /// Indices into the subgraph attachments written as colors
    #[serde(default)]
    pub color_attachments: Vec<usize>,
    /// Index into the subgraph attachments used for depth-stencil
    #[serde(default)]
    pub depth_stencil_attachment: Option<usize>,
    /// Indices of passes in the same subgraph that must run first
    #[serde(default)]
    pub depends_on: Vec<usize>,
    /// Operator doing the drawing; a pass without one only transitions attachments
    #[serde(default)]
    pub operator: Option<OperatorBinding>,
}

impl RenderSubgraphPassInfo {
    /// Empty pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a color attachment
    #[must_use]
    pub fn with_color(mut self, attachment: usize) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    /// Add an input attachment
    #[must_use]
    pub fn with_input(mut self, attachment: usize) -> Self {
        self.input_attachments.push(attachment);
        self
    }

    /// Set the depth-stencil attachment
    #[must_use]
    pub fn with_depth_stencil(mut self, attachment: usize) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self
    }

    /// Run after pass `pass`
    #[must_use]
    pub fn after(mut self, pass: usize) -> Self {
        self.depends_on.push(pass);
        self
    }

    /// Bind an operator with its default parameters
    #[must_use]
    pub fn with_operator(mut self, name: impl Into<String>) -> Self {
        self.operator = Some(OperatorBinding {
            name: name.into(),
            params: OperatorParams::new(),
        });
        self
    }

    /// Override an operator parameter; requires an operator binding
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        if let Some(binding) = &mut self.operator {
            binding.params.insert(key.into(), value.into());
        }
        self
    }
}

/// A group of passes sharing one set of attachments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderSubgraphInfo {
    /// Attachments in declaration order
    #[serde(default)]
    pub attachments: Vec<RenderAttachmentInfo>,
    /// Passes; indices are positions in this list
    #[serde(default)]
    pub passes: Vec<RenderSubgraphPassInfo>,
    /// Names of subgraphs that must run first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl RenderSubgraphInfo {
    /// Empty subgraph
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attachment
    #[must_use]
    pub fn with_attachment(mut self, attachment: RenderAttachmentInfo) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Append a pass
    #[must_use]
    pub fn with_pass(mut self, pass: RenderSubgraphPassInfo) -> Self {
        self.passes.push(pass);
        self
    }

    /// Run after subgraph `name`
    #[must_use]
    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }
}

/// Complete render graph: targets plus the subgraphs that draw into them
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderGraphInfo {
    /// Render targets by name
    #[serde(default)]
    pub targets: BTreeMap<String, RenderTargetInfo>,
    /// Subgraphs by name
    #[serde(default)]
    pub subgraphs: BTreeMap<String, RenderSubgraphInfo>,
}

impl RenderGraphInfo {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a target
    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>, target: RenderTargetInfo) -> Self {
        self.targets.insert(name.into(), target);
        self
    }

    /// Add or replace a subgraph
    #[must_use]
    pub fn with_subgraph(mut self, name: impl Into<String>, subgraph: RenderSubgraphInfo) -> Self {
        self.subgraphs.insert(name.into(), subgraph);
        self
    }

    /// Parse a graph from RON
    pub fn from_ron_str(source: &str) -> Result<Self, RenderGraphError> {
        ron::from_str(source).map_err(|e| RenderGraphError::Parse(e.to_string()))
    }

    /// Serialize the graph as pretty-printed RON
    pub fn to_ron_string(&self) -> Result<String, RenderGraphError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| RenderGraphError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORWARD: &str = r#"(
        targets: {
            "backbuffer": (source: Swapchain, usage: "COLOR"),
            "depth": (usage: "DEPTH_STENCIL", format: Some(Depth32Float)),
        },
        subgraphs: {
            "main": (
                attachments: [
                    (target: "backbuffer", load_op: Clear, final_layout: Present,
                     clear_value: Some(Color((0.0, 0.0, 0.0, 1.0)))),
                    (target: "depth", load_op: Clear, store_op: DontCare,
                     clear_value: Some(DepthStencil(depth: 1.0, stencil: 0))),
                ],
                passes: [
                    (color_attachments: [0], depth_stencil_attachment: Some(1),
                     operator: Some((name: "render_list", params: {"source": Text("main_camera")}))),
                ],
            ),
        },
    )"#;

    #[test]
    fn test_parse_ron_graph() {
        let graph = RenderGraphInfo::from_ron_str(FORWARD).unwrap();
        assert_eq!(graph.targets["backbuffer"].source, TargetSource::Swapchain);
        assert_eq!(graph.targets["depth"].usage, TargetUsage::DEPTH_STENCIL);

        let main = &graph.subgraphs["main"];
        assert_eq!(main.attachments[0].final_layout, ImageLayout::Present);
        assert_eq!(main.attachments[1].store_op, StoreOp::DontCare);
        let binding = main.passes[0].operator.as_ref().unwrap();
        assert_eq!(binding.params["source"].as_text(), Some("main_camera"));
    }

    #[test]
    fn test_ron_output_parses_back_equal() {
        let graph = RenderGraphInfo::from_ron_str(FORWARD).unwrap();
        let text = graph.to_ron_string().unwrap();
        assert_eq!(RenderGraphInfo::from_ron_str(&text).unwrap(), graph);
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            RenderGraphInfo::from_ron_str("(targets: 3)"),
            Err(RenderGraphError::Parse(_))
        ));
    }
}
