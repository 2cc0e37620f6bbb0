//! Selects among value sources by the first passing condition.

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::condition::Condition;
use crate::error::ControlResult;
use crate::value::Parameter;

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchTest {
    pub condition: Condition,
    pub value: Parameter,
}

/// Ordered `(condition, value)` pairs plus a default.
///
/// Selection is stateless: the first test whose condition holds wins, else the
/// default (or `0.0` when none is configured).
#[derive(Debug, Clone)]
pub struct Switch {
    base: ComponentBase,
    tests: Vec<SwitchTest>,
    default: Option<Parameter>,
}

impl Switch {
    pub fn new(base: ComponentBase, tests: Vec<SwitchTest>, default: Option<Parameter>) -> Self {
        Self {
            base,
            tests,
            default,
        }
    }

    pub fn tests(&self) -> &[SwitchTest] {
        &self.tests
    }

    /// Index of the selected test, `None` for the default.
    pub fn selected(&self, props: &fc_props::PropertyManager) -> Option<usize> {
        self.tests.iter().position(|t| t.condition.evaluate(props))
    }
}

impl FcsComponent for Switch {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let source = match self.selected(ctx.props) {
            Some(i) => Some(&self.tests[i].value),
            None => self.default.as_ref(),
        };
        let raw = source.map_or(0.0, |p| p.value(ctx.props));
        self.base.publish(raw, ctx)
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
    }
}
