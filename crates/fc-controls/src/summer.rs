//! Sum of any number of inputs plus a constant bias.

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::error::ControlResult;

#[derive(Debug, Clone)]
pub struct Summer {
    base: ComponentBase,
    bias: f64,
}

impl Summer {
    pub fn new(base: ComponentBase, bias: f64) -> ControlResult<Self> {
        base.require_inputs(1, None)?;
        Ok(Self { base, bias })
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl FcsComponent for Summer {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let props = &*ctx.props;
        let sum: f64 = self.base.inputs().iter().map(|p| p.value(props)).sum();
        self.base.publish(sum + self.bias, ctx)
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
    }
}
