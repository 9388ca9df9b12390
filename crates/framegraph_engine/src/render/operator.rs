//! Render operators

use std::error::Error;

use super::graph::{OperatorParams, ParamValue};
use super::{CommandRecorder, RenderContext, RenderListBuilder};
use crate::resources::{Capabilities, FromResources, Lazy, Resource, ResourceGroup, ResourceSet};

/// Error type returned by [`RenderOperator::execute`]
pub type OperatorError = Box<dyn Error + Send + Sync>;

/// Per-pass drawing logic, bound to passes by name.
///
/// Register implementations in [`ResourceGroup::RenderOperator`] and expose
/// them as `dyn RenderOperator`. Operators are called once per bound pass
/// per frame and must not call back into the executor.
pub trait RenderOperator: Send + Sync {
    /// Name used by [`OperatorBinding`](super::graph::OperatorBinding)
    fn name(&self) -> &str;

    /// Parameters used when a pass does not override them
    fn default_params(&self) -> OperatorParams {
        OperatorParams::new()
    }

    /// Record the pass
    fn execute(&self, recorder: &mut dyn CommandRecorder, context: &RenderContext<'_>) -> Result<(), OperatorError>;
}

/// Draws the render list of the source named by the `source` parameter
pub struct RenderListOperator {
    builder: Lazy<RenderListBuilder>,
}

impl RenderListOperator {
    /// Name to bind passes to
    pub const NAME: &'static str = "render_list";

    /// Parameter holding the render source name
    pub const SOURCE_PARAM: &'static str = "source";

    /// Source used when a pass does not name one
    pub const DEFAULT_SOURCE: &'static str = "main";
}

impl Resource for RenderListOperator {
    const GROUP: ResourceGroup = ResourceGroup::RenderOperator;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn RenderOperator>(|this| this);
    }
}

impl FromResources for RenderListOperator {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            builder: resources.get_lazy(),
        }
    }
}

impl RenderOperator for RenderListOperator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_params(&self) -> OperatorParams {
        OperatorParams::from([(Self::SOURCE_PARAM.to_string(), ParamValue::from(Self::DEFAULT_SOURCE))])
    }

    fn execute(&self, recorder: &mut dyn CommandRecorder, context: &RenderContext<'_>) -> Result<(), OperatorError> {
        let source = context
            .params
            .get(Self::SOURCE_PARAM)
            .and_then(ParamValue::as_text)
            .ok_or("`source` parameter must be text")?;

        let drawn = self.builder.with_render_list(source, |list| {
            recorder.bind_view(list.view());
            for (_, drawable) in list.drawables() {
                recorder.draw(drawable);
            }
            list.len()
        });
        match drawn {
            Some(count) => log::trace!("Pass {} drew {count} objects from `{source}`", context.pass_index),
            None => log::debug!("No render list for `{source}`, pass {} skipped", context.pass_index),
        }
        Ok(())
    }
}
