//! Zero output inside a band around zero, offset linear response outside it.

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::error::ControlResult;
use crate::value::Parameter;

#[derive(Debug, Clone)]
pub struct Deadband {
    base: ComponentBase,
    width: Parameter,
    gain: f64,
}

impl Deadband {
    pub fn new(base: ComponentBase, width: Parameter, gain: f64) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        Ok(Self { base, width, gain })
    }

    /// Apply a band of total `width` to `input`.
    pub fn band(input: f64, width: f64, gain: f64) -> f64 {
        let half = width / 2.0;
        if input < -half {
            (input + half) * gain
        } else if input > half {
            (input - half) * gain
        } else {
            0.0
        }
    }
}

impl FcsComponent for Deadband {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let input = self.base.input(0, ctx.props);
        let width = self.width.value(ctx.props);
        self.base.publish(Self::band(input, width, self.gain), ctx)
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_is_symmetric() {
        assert_eq!(Deadband::band(0.05, 0.2, 1.0), 0.0);
        assert_eq!(Deadband::band(-0.1, 0.2, 1.0), 0.0);
        assert!((Deadband::band(0.5, 0.2, 2.0) - 0.8).abs() < 1e-12);
        assert!((Deadband::band(-0.5, 0.2, 2.0) + 0.8).abs() < 1e-12);
    }
}
