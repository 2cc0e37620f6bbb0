//! Gain family: pure, table-scheduled, and aerosurface scaling.

use fc_core::constrain;

use crate::component::{ComponentBase, ComponentKind, FcsComponent, FrameContext};
use crate::error::{ControlError, ControlResult};
use crate::table::Table;
use crate::value::Parameter;

/// Maps a normalised command domain onto a surface deflection range.
///
/// Zero-centred scaling maps the positive and negative halves of the domain
/// separately, so `0` always maps to `0` even for asymmetric ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AerosurfaceScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
    pub zero_centered: bool,
}

impl Default for AerosurfaceScale {
    fn default() -> Self {
        Self {
            domain: (-1.0, 1.0),
            range: (0.0, 0.0),
            zero_centered: true,
        }
    }
}

impl AerosurfaceScale {
    pub fn map(&self, input: f64) -> f64 {
        let (in_min, in_max) = self.domain;
        let (out_min, out_max) = self.range;
        let input = constrain(in_min, input, in_max);
        if self.zero_centered {
            if input == 0.0 {
                0.0
            } else if input > 0.0 {
                input / in_max * out_max
            } else {
                input / in_min * out_min
            }
        } else {
            out_min + (input - in_min) / (in_max - in_min) * (out_max - out_min)
        }
    }

    fn validate(&self, component: &str) -> ControlResult<()> {
        let (in_min, in_max) = self.domain;
        if !(in_min < in_max) {
            return Err(ControlError::InvalidConfig {
                component: component.to_string(),
                what: format!("domain [{in_min}, {in_max}] is empty"),
            });
        }
        if self.zero_centered && !(in_min < 0.0 && in_max > 0.0) {
            return Err(ControlError::InvalidConfig {
                component: component.to_string(),
                what: "zero-centred domain must straddle zero".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum GainLaw {
    Pure,
    Scheduled(Table),
    Aerosurface(AerosurfaceScale),
}

#[derive(Debug, Clone)]
pub struct Gain {
    base: ComponentBase,
    gain: Parameter,
    law: GainLaw,
}

impl Gain {
    /// `gain * input`.
    pub fn pure(base: ComponentBase, gain: Parameter) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        Ok(Self {
            base,
            gain,
            law: GainLaw::Pure,
        })
    }

    /// `gain * table(...) * input`.
    pub fn scheduled(base: ComponentBase, gain: Parameter, table: Table) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        Ok(Self {
            base,
            gain,
            law: GainLaw::Scheduled(table),
        })
    }

    /// `gain * scale.map(input)`.
    pub fn aerosurface_scale(
        base: ComponentBase,
        gain: Parameter,
        scale: AerosurfaceScale,
    ) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        scale.validate(base.name())?;
        Ok(Self {
            base,
            gain,
            law: GainLaw::Aerosurface(scale),
        })
    }

    pub fn gain(&self) -> &Parameter {
        &self.gain
    }
}

impl FcsComponent for Gain {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let input = self.base.input(0, ctx.props);
        let gain = self.gain.value(ctx.props);
        let raw = match &self.law {
            GainLaw::Pure => gain * input,
            GainLaw::Scheduled(table) => gain * table.value(ctx.props) * input,
            GainLaw::Aerosurface(scale) => gain * scale.map(input),
        };
        self.base.publish(raw, ctx)
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
    }
}
