//! Boolean gates over inputs read as truth values (non-zero is true).

use std::fmt;

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::error::ControlResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Not,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogicGate {
    base: ComponentBase,
    op: LogicOp,
}

impl LogicGate {
    pub fn new(base: ComponentBase, op: LogicOp) -> ControlResult<Self> {
        match op {
            LogicOp::Not => base.require_inputs(1, Some(1))?,
            LogicOp::And | LogicOp::Or => base.require_inputs(1, None)?,
        }
        Ok(Self { base, op })
    }

    pub fn op(&self) -> LogicOp {
        self.op
    }
}

impl FcsComponent for LogicGate {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let props = &*ctx.props;
        let mut truths = self.base.inputs().iter().map(|p| p.value(props) != 0.0);
        let result = match self.op {
            LogicOp::And => truths.all(|t| t),
            LogicOp::Or => truths.any(|t| t),
            LogicOp::Not => !truths.next().unwrap_or(false),
        };
        self.base.publish(if result { 1.0 } else { 0.0 }, ctx)
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
    }
}
