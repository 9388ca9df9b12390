//! Render graph executor resource

use parking_lot::Mutex;

use super::graph::{compile, CompiledRenderGraph, OperatorParams, RenderGraphError, RenderGraphInfo, RenderSubgraphInfo};
use super::{CommandRecorder, Extent2D, RenderError, RenderGraphHook, RenderOperator, SurfaceHook};
use crate::config::EngineConfig;
use crate::resources::{Capabilities, FromResources, LazyCollection, Resource, ResourceGroup, ResourceSet};

/// What a [`RenderOperator`] gets to know about the pass it records
#[derive(Debug)]
pub struct RenderContext<'a> {
    /// Owning subgraph name
    pub subgraph: &'a str,
    /// Owning subgraph description
    pub subgraph_info: &'a RenderSubgraphInfo,
    /// Index of the pass within the subgraph
    pub pass_index: usize,
    /// Resolved render area
    pub render_area: Extent2D,
    /// Operator defaults overridden by the pass parameters
    pub params: &'a OperatorParams,
}

#[derive(Default)]
struct ExecutorState {
    graph: Option<RenderGraphInfo>,
    compiled: CompiledRenderGraph,
    surface: Extent2D,
}

/// Holds the active render graph and records it every frame.
///
/// A new graph is validated and ordered when it is set; if that fails the
/// previous graph stays active. Surface resizes only change the render area
/// of surface-sized subgraphs.
pub struct RenderGraphExecutor {
    operators: LazyCollection<dyn RenderOperator>,
    hooks: LazyCollection<dyn RenderGraphHook>,
    state: Mutex<ExecutorState>,
}

impl Resource for RenderGraphExecutor {
    const GROUP: ResourceGroup = ResourceGroup::Rendering;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn SurfaceHook>(|this| this);
    }
}

impl FromResources for RenderGraphExecutor {
    fn from_resources(resources: &ResourceSet) -> Self {
        let surface = resources
            .try_get::<EngineConfig>()
            .map(|config| Extent2D::new(config.surface.width, config.surface.height))
            .unwrap_or_default();
        Self {
            operators: resources.get_lazy_all(),
            hooks: resources.get_lazy_all(),
            state: Mutex::new(ExecutorState {
                surface,
                ..ExecutorState::default()
            }),
        }
    }
}

impl SurfaceHook for RenderGraphExecutor {
    fn on_surface_resized(&self, extent: Extent2D) {
        log::debug!("Surface resized to {}x{}", extent.width, extent.height);
        self.state.lock().surface = extent;
    }
}

impl RenderGraphExecutor {
    fn operator(&self, name: &str) -> Option<&dyn RenderOperator> {
        self.operators
            .iter()
            .find(|operator| operator.name() == name)
            .map(AsRef::as_ref)
    }

    /// Replace the active graph; `None` tears it down.
    ///
    /// Returns `Ok(false)` when `graph` equals the active graph. On success
    /// every [`RenderGraphHook`] is notified; on error nothing changes.
    pub fn set_render_graph(&self, graph: Option<RenderGraphInfo>) -> Result<bool, RenderGraphError> {
        let mut state = self.state.lock();
        if state.graph == graph {
            return Ok(false);
        }

        let compiled = match &graph {
            Some(graph) => compile(graph, |name| self.operator(name).is_some()).map_err(|error| {
                log::error!("Rejected render graph: {error}");
                error
            })?,
            None => CompiledRenderGraph::default(),
        };
        log::info!(
            "Render graph set: {} subgraphs, {} passes",
            compiled.subgraphs().len(),
            compiled.pass_count()
        );
        state.graph = graph;
        state.compiled = compiled;
        let active = state.graph.clone();
        drop(state);

        for hook in self.hooks.iter() {
            hook.on_render_graph_changed(active.as_ref());
        }
        Ok(true)
    }

    /// Copy of the active graph
    pub fn render_graph(&self) -> Option<RenderGraphInfo> {
        self.state.lock().graph.clone()
    }

    /// Subgraph names with their pass order, in execution order
    pub fn execution_order(&self) -> Vec<(String, Vec<usize>)> {
        self.state
            .lock()
            .compiled
            .subgraphs()
            .iter()
            .map(|subgraph| (subgraph.name().to_string(), subgraph.pass_order().to_vec()))
            .collect()
    }

    /// Surface size used for surface-sized subgraphs
    pub fn surface_extent(&self) -> Extent2D {
        self.state.lock().surface
    }

    /// Record the active graph
    pub fn execute(&self, recorder: &mut dyn CommandRecorder) -> Result<(), RenderError> {
        let state = self.state.lock();
        let Some(graph) = &state.graph else {
            return Ok(());
        };

        for compiled in state.compiled.subgraphs() {
            let name = compiled.name();
            let info = &graph.subgraphs[name];
            let render_area = compiled.render_area(state.surface);
            recorder.begin_subgraph(name, &info.attachments, render_area);

            for &pass_index in compiled.pass_order() {
                let pass = &info.passes[pass_index];
                recorder.begin_pass(pass_index, pass);
                if let Some(binding) = &pass.operator {
                    let operator = self
                        .operator(&binding.name)
                        .ok_or_else(|| RenderError::UnknownOperator(binding.name.clone()))?;
                    let mut params = operator.default_params();
                    params.extend(binding.params.iter().map(|(key, value)| (key.clone(), value.clone())));

                    let context = RenderContext {
                        subgraph: name,
                        subgraph_info: info,
                        pass_index,
                        render_area,
                        params: &params,
                    };
                    operator
                        .execute(recorder, &context)
                        .map_err(|source| RenderError::OperatorFailed {
                            operator: binding.name.clone(),
                            subgraph: name.to_string(),
                            pass: pass_index,
                            source,
                        })?;
                }
                recorder.end_pass();
            }
            recorder.end_subgraph();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::graph::{
        ParamValue, RenderAttachmentInfo, RenderSubgraphPassInfo, RenderTargetInfo,
    };
    use crate::render::OperatorError;
    use crate::render::{RecordedCommand, RecordingCommandBuffer};
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Probe {
        seen: PlMutex<Vec<(String, usize, Extent2D, OperatorParams)>>,
    }

    impl Resource for Probe {
        const GROUP: ResourceGroup = ResourceGroup::RenderOperator;

        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn RenderOperator>(|this| this);
        }
    }

    impl RenderOperator for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn default_params(&self) -> OperatorParams {
            OperatorParams::from([
                ("strength".to_string(), ParamValue::Float(1.0)),
                ("label".to_string(), ParamValue::from("default")),
            ])
        }

        fn execute(&self, _recorder: &mut dyn CommandRecorder, context: &RenderContext<'_>) -> Result<(), OperatorError> {
            self.seen.lock().push((
                context.subgraph.to_string(),
                context.pass_index,
                context.render_area,
                context.params.clone(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    struct HookCounter {
        calls: PlMutex<Vec<bool>>,
    }

    impl Resource for HookCounter {
        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn RenderGraphHook>(|this| this);
        }
    }

    impl RenderGraphHook for HookCounter {
        fn on_render_graph_changed(&self, graph: Option<&RenderGraphInfo>) {
            self.calls.lock().push(graph.is_some());
        }
    }

    fn setup() -> (ResourceSet, Arc<RenderGraphExecutor>, Arc<Probe>, Arc<HookCounter>) {
        let resources = ResourceSet::new();
        let executor = resources.add::<RenderGraphExecutor>().unwrap();
        let probe = resources.add::<Probe>().unwrap();
        let hooks = resources.add::<HookCounter>().unwrap();
        (resources, executor, probe, hooks)
    }

    fn graph() -> RenderGraphInfo {
        RenderGraphInfo::new()
            .with_target("backbuffer", RenderTargetInfo::swapchain())
            .with_subgraph(
                "main",
                RenderSubgraphInfo::new()
                    .with_attachment(RenderAttachmentInfo::new("backbuffer"))
                    .with_pass(
                        RenderSubgraphPassInfo::new()
                            .with_color(0)
                            .with_operator("probe")
                            .with_param("label", "pass")
                            .after(1),
                    )
                    .with_pass(RenderSubgraphPassInfo::new().with_color(0)),
            )
    }

    #[test]
    fn test_equal_graph_notifies_once() {
        let (_resources, executor, _probe, hooks) = setup();
        assert!(executor.set_render_graph(Some(graph())).unwrap());
        assert!(!executor.set_render_graph(Some(graph())).unwrap());
        assert!(executor.set_render_graph(None).unwrap());
        assert!(!executor.set_render_graph(None).unwrap());
        assert_eq!(*hooks.calls.lock(), vec![true, false]);
    }

    #[test]
    fn test_rejected_graph_keeps_previous() {
        let (_resources, executor, _probe, hooks) = setup();
        executor.set_render_graph(Some(graph())).unwrap();

        let mut cyclic = graph();
        cyclic.subgraphs.get_mut("main").unwrap().passes[1].depends_on.push(0);
        assert!(matches!(
            executor.set_render_graph(Some(cyclic)),
            Err(RenderGraphError::PassCycle(_))
        ));

        let unknown = graph().with_subgraph(
            "extra",
            RenderSubgraphInfo::new().with_pass(RenderSubgraphPassInfo::new().with_operator("bloom")),
        );
        assert!(executor.set_render_graph(Some(unknown)).is_err());

        assert_eq!(executor.render_graph(), Some(graph()));
        assert_eq!(executor.execution_order(), vec![("main".to_string(), vec![1, 0])]);
        assert_eq!(hooks.calls.lock().len(), 1);
    }

    #[test]
    fn test_execute_merges_params_and_follows_order() {
        let (_resources, executor, probe, _hooks) = setup();
        executor.set_render_graph(Some(graph())).unwrap();

        let mut recorder = RecordingCommandBuffer::new();
        executor.execute(&mut recorder).unwrap();

        assert_eq!(
            recorder.commands(),
            &[
                RecordedCommand::BeginSubgraph {
                    name: "main".to_string(),
                    attachments: vec![(
                        "backbuffer".to_string(),
                        crate::render::graph::LoadOp::DontCare,
                        crate::render::graph::StoreOp::Store
                    )],
                    render_area: Extent2D::default(),
                },
                RecordedCommand::BeginPass { pass_index: 1 },
                RecordedCommand::EndPass,
                RecordedCommand::BeginPass { pass_index: 0 },
                RecordedCommand::EndPass,
                RecordedCommand::EndSubgraph,
            ]
        );

        let seen = probe.seen.lock();
        assert_eq!(seen.len(), 1);
        let (subgraph, pass_index, _, params) = &seen[0];
        assert_eq!((subgraph.as_str(), *pass_index), ("main", 0));
        assert_eq!(params["label"], ParamValue::from("pass"));
        assert_eq!(params["strength"], ParamValue::Float(1.0));
    }

    #[test]
    fn test_resize_keeps_graph() {
        let (_resources, executor, probe, _hooks) = setup();
        executor.set_render_graph(Some(graph())).unwrap();
        executor.on_surface_resized(Extent2D::new(640, 480));

        executor.execute(&mut RecordingCommandBuffer::new()).unwrap();
        assert_eq!(probe.seen.lock()[0].2, Extent2D::new(640, 480));
        assert_eq!(executor.render_graph(), Some(graph()));
    }
}
