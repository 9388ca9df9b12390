//! Render graph validation and ordering
//!
//! Passes are ordered per subgraph from their `depends_on` indices and
//! subgraphs from their `depends_on` names, both with Kahn's algorithm. Ties
//! keep declaration order (name order for subgraphs), so compilation is
//! deterministic.

use std::collections::{HashMap, VecDeque};

use super::{
    ImageLayout, LoadOp, RenderGraphError, RenderGraphInfo, RenderSubgraphInfo, RenderTargetInfo,
    TargetSource, TargetUsage,
};
use crate::render::Extent2D;

/// Execution plan of one subgraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSubgraph {
    name: String,
    pass_order: Vec<usize>,
    fixed_extent: Option<Extent2D>,
}

impl CompiledSubgraph {
    /// Subgraph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pass indices in execution order
    pub fn pass_order(&self) -> &[usize] {
        &self.pass_order
    }

    /// Size shared by all attachments, if none of them follows the surface
    pub const fn fixed_extent(&self) -> Option<Extent2D> {
        self.fixed_extent
    }

    /// Render area given the current surface size
    pub fn render_area(&self, surface: Extent2D) -> Extent2D {
        self.fixed_extent.unwrap_or(surface)
    }
}

/// Execution plan of a whole graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledRenderGraph {
    subgraphs: Vec<CompiledSubgraph>,
}

impl CompiledRenderGraph {
    /// Subgraphs in execution order
    pub fn subgraphs(&self) -> &[CompiledSubgraph] {
        &self.subgraphs
    }

    /// Total number of passes
    pub fn pass_count(&self) -> usize {
        self.subgraphs.iter().map(|s| s.pass_order.len()).sum()
    }

    /// Whether there is nothing to execute
    pub fn is_empty(&self) -> bool {
        self.subgraphs.is_empty()
    }
}

/// Validate `graph` and compute its execution order.
///
/// `is_known_operator` decides whether an operator binding can be resolved.
pub fn compile(
    graph: &RenderGraphInfo,
    is_known_operator: impl Fn(&str) -> bool,
) -> Result<CompiledRenderGraph, RenderGraphError> {
    let names: Vec<&String> = graph.subgraphs.keys().collect();
    let index_of: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect();

    let mut compiled = Vec::with_capacity(names.len());
    let mut dependencies = Vec::with_capacity(names.len());
    for (name, subgraph) in &graph.subgraphs {
        let fixed_extent = validate_subgraph(graph, name, subgraph, &is_known_operator)?;

        let pass_dependencies: Vec<&[usize]> = subgraph
            .passes
            .iter()
            .map(|pass| pass.depends_on.as_slice())
            .collect();
        let pass_order = topological_order(&pass_dependencies)
            .ok_or_else(|| RenderGraphError::PassCycle(name.clone()))?;

        let subgraph_dependencies = subgraph
            .depends_on
            .iter()
            .map(|dependency| {
                index_of
                    .get(dependency.as_str())
                    .copied()
                    .ok_or_else(|| RenderGraphError::UnknownSubgraph {
                        subgraph: name.clone(),
                        dependency: dependency.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        dependencies.push(subgraph_dependencies);

        compiled.push(Some(CompiledSubgraph {
            name: name.clone(),
            pass_order,
            fixed_extent,
        }));
    }

    let order = topological_order(&dependencies).ok_or(RenderGraphError::SubgraphCycle)?;
    let subgraphs = order
        .into_iter()
        .filter_map(|index| compiled[index].take())
        .collect();
    Ok(CompiledRenderGraph { subgraphs })
}

/// Check one subgraph and return its fixed extent, if any
fn validate_subgraph(
    graph: &RenderGraphInfo,
    name: &str,
    subgraph: &RenderSubgraphInfo,
    is_known_operator: &impl Fn(&str) -> bool,
) -> Result<Option<Extent2D>, RenderGraphError> {
    let mut targets: Vec<&RenderTargetInfo> = Vec::with_capacity(subgraph.attachments.len());
    for (index, attachment) in subgraph.attachments.iter().enumerate() {
        let target = graph
            .targets
            .get(&attachment.target)
            .ok_or_else(|| RenderGraphError::UnknownTarget {
                subgraph: name.to_string(),
                attachment: index,
                target: attachment.target.clone(),
            })?;

        if attachment.load_op == LoadOp::Load && attachment.initial_layout == ImageLayout::Undefined {
            return Err(RenderGraphError::LoadFromUndefined {
                subgraph: name.to_string(),
                attachment: index,
            });
        }
        let presents = attachment.initial_layout == ImageLayout::Present
            || attachment.final_layout == ImageLayout::Present;
        if presents && target.source != TargetSource::Swapchain {
            return Err(RenderGraphError::PresentOnImage {
                subgraph: name.to_string(),
                attachment: index,
                target: attachment.target.clone(),
            });
        }
        targets.push(target);
    }

    for (pass_index, pass) in subgraph.passes.iter().enumerate() {
        let uses = pass
            .input_attachments
            .iter()
            .map(|&index| (index, TargetUsage::INPUT))
            .chain(pass.color_attachments.iter().map(|&index| (index, TargetUsage::COLOR)))
            .chain(pass.depth_stencil_attachment.map(|index| (index, TargetUsage::DEPTH_STENCIL)));

        for (index, required) in uses {
            let target = targets
                .get(index)
                .ok_or_else(|| RenderGraphError::AttachmentOutOfRange {
                    subgraph: name.to_string(),
                    pass: pass_index,
                    index,
                })?;
            let format_ok = required != TargetUsage::DEPTH_STENCIL
                || target.format.map_or(true, |format| format.is_depth());
            if !target.usage.contains(required) || !format_ok {
                return Err(RenderGraphError::UsageMismatch {
                    subgraph: name.to_string(),
                    pass: pass_index,
                    target: subgraph.attachments[index].target.clone(),
                    required,
                });
            }
        }

        if let Some(&index) = pass.depends_on.iter().find(|&&index| index >= subgraph.passes.len()) {
            return Err(RenderGraphError::PassOutOfRange {
                subgraph: name.to_string(),
                pass: pass_index,
                index,
            });
        }

        if let Some(binding) = &pass.operator {
            if !is_known_operator(&binding.name) {
                return Err(RenderGraphError::UnknownOperator {
                    subgraph: name.to_string(),
                    pass: pass_index,
                    operator: binding.name.clone(),
                });
            }
        }
    }

    fixed_extent(name, &targets)
}

/// Common size of the targets; `None` when they all follow the surface
fn fixed_extent(name: &str, targets: &[&RenderTargetInfo]) -> Result<Option<Extent2D>, RenderGraphError> {
    let sizes: Vec<Option<Extent2D>> = targets
        .iter()
        .map(|target| match target.source {
            TargetSource::Swapchain => None,
            TargetSource::Image => target.size,
        })
        .collect();

    match sizes.first() {
        None => Ok(None),
        Some(first) if sizes.iter().all(|size| size == first) => Ok(*first),
        Some(_) => Err(RenderGraphError::SizeMismatch {
            subgraph: name.to_string(),
        }),
    }
}

/// Kahn's algorithm over `dependencies[node] = nodes that must come first`.
///
/// Returns `None` on a cycle.
fn topological_order<D: AsRef<[usize]>>(dependencies: &[D]) -> Option<Vec<usize>> {
    let count = dependencies.len();
    let mut in_degree = vec![0usize; count];
    let mut dependents = vec![Vec::new(); count];
    for (node, node_dependencies) in dependencies.iter().enumerate() {
        for &dependency in node_dependencies.as_ref() {
            in_degree[node] += 1;
            dependents[dependency].push(node);
        }
    }

    let mut ready: VecDeque<usize> = (0..count).filter(|&node| in_degree[node] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(node) = ready.pop_front() {
        order.push(node);
        for &dependent in &dependents[node] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    (order.len() == count).then_some(order)
}
