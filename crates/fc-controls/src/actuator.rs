//! Actuator dynamics between the FCS command and the surface position.
//!
//! Processing order each frame:
//! 1. malfunctions (`fail_zero`, `fail_hardover`, `fail_stuck`)
//! 2. first-order lag
//! 3. increment/decrement rate limits
//! 4. deadband
//! 5. hysteresis
//! 6. bias
//! 7. clipping and transport delay (common to every component)
//!
//! The lag, rate limit and hysteresis stages pass their input straight
//! through on the first frame after construction, reset, or while trimming.

use fc_core::PropertyId;

use crate::component::{ComponentBase, FcsComponent, FrameContext, output_property_name};
use crate::deadband::Deadband;
use crate::error::{ControlError, ControlResult};
use crate::value::Parameter;

/// Actuator configuration. Zero (or `None`) disables a stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActuatorConfig {
    /// Lag break frequency `C1` (rad/s) of `C1 / (s + C1)`.
    pub lag: Option<Parameter>,
    /// Maximum increasing rate (units/s).
    pub rate_limit_incr: Option<Parameter>,
    /// Maximum decreasing rate magnitude (units/s).
    pub rate_limit_decr: Option<Parameter>,
    pub deadband_width: f64,
    pub hysteresis_width: f64,
    pub bias: f64,
}

impl ActuatorConfig {
    /// Check the fixed widths.
    ///
    /// # Errors
    ///
    /// Returns error if a width is negative or non-finite.
    pub fn validate(&self) -> ControlResult<()> {
        if !(self.deadband_width >= 0.0) || !self.deadband_width.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "deadband_width must be non-negative",
            });
        }
        if !(self.hysteresis_width >= 0.0) || !self.hysteresis_width.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "hysteresis_width must be non-negative",
            });
        }
        if !self.bias.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "bias must be finite",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct ActuatorState {
    initialized: bool,
    lag_input: f64,
    lag_output: f64,
    rate_output: f64,
    hysteresis_output: f64,
    previous: f64,
}

/// Malfunction and status properties under `<name>/`.
#[derive(Clone, Copy, Debug)]
struct Malfunctions {
    fail_zero: PropertyId,
    fail_hardover: PropertyId,
    fail_stuck: PropertyId,
    saturated: PropertyId,
}

#[derive(Clone, Debug)]
pub struct Actuator {
    base: ComponentBase,
    config: ActuatorConfig,
    flags: Malfunctions,
    state: ActuatorState,
}

impl Actuator {
    /// Create the actuator and publish its malfunction properties.
    pub fn new(
        base: ComponentBase,
        config: ActuatorConfig,
        props: &mut fc_props::PropertyManager,
    ) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        config.validate()?;
        let root = output_property_name(base.name());
        let flags = Malfunctions {
            fail_zero: props.get_or_create(&format!("{root}/malfunction/fail_zero"))?,
            fail_hardover: props.get_or_create(&format!("{root}/malfunction/fail_hardover"))?,
            fail_stuck: props.get_or_create(&format!("{root}/malfunction/fail_stuck"))?,
            saturated: props.get_or_create(&format!("{root}/saturated"))?,
        };
        Ok(Self {
            base,
            config,
            flags,
            state: ActuatorState::default(),
        })
    }

    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    fn lag(&mut self, input: f64, c1: f64, dt: f64) -> f64 {
        let denom = 2.0 + dt * c1;
        let out = if self.state.initialized && denom != 0.0 {
            let ca = dt * c1 / denom;
            let cb = (2.0 - dt * c1) / denom;
            ca * (input + self.state.lag_input) + self.state.lag_output * cb
        } else {
            input
        };
        self.state.lag_input = input;
        self.state.lag_output = out;
        out
    }

    fn rate_limit(&mut self, input: f64, incr: Option<f64>, decr: Option<f64>, dt: f64) -> f64 {
        let mut out = input;
        if self.state.initialized {
            let prev = self.state.rate_output;
            let delta = input - prev;
            if let Some(r) = incr
                && delta > dt * r
            {
                out = prev + r * dt;
            }
            if let Some(r) = decr
                && delta < -dt * r
            {
                out = prev - r * dt;
            }
        }
        self.state.rate_output = out;
        out
    }

    fn hysteresis(&mut self, input: f64) -> f64 {
        let half = 0.5 * self.config.hysteresis_width;
        let prev = self.state.hysteresis_output;
        let out = if !self.state.initialized {
            input
        } else if input > prev {
            prev.max(input - half)
        } else if input < prev {
            prev.min(input + half)
        } else {
            input
        };
        self.state.hysteresis_output = out;
        out
    }
}

impl FcsComponent for Actuator {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        if ctx.trimming {
            self.state.initialized = false;
        }
        let props = &*ctx.props;
        let mut input = self.base.input(0, props);
        let bounds = self.base.clip().map(|c| c.bounds(props));

        if props.get_bool(self.flags.fail_zero) {
            input = 0.0;
        }
        if props.get_bool(self.flags.fail_hardover)
            && let Some((min, max)) = bounds
        {
            input = if input < 0.0 { min } else { max };
        }

        let out = if props.get_bool(self.flags.fail_stuck) {
            self.state.previous
        } else {
            let lag = self.config.lag.as_ref().map(|p| p.value(props));
            let incr = self.config.rate_limit_incr.as_ref().map(|p| p.value(props));
            let decr = self.config.rate_limit_decr.as_ref().map(|p| p.value(props));
            let dt = ctx.dt;

            let mut out = input;
            if let Some(c1) = lag.filter(|c| *c != 0.0) {
                out = self.lag(out, c1, dt);
            }
            if incr.is_some_and(|r| r != 0.0) || decr.is_some_and(|r| r != 0.0) {
                out = self.rate_limit(out, incr, decr, dt);
            }
            if self.config.deadband_width != 0.0 {
                out = Deadband::band(out, self.config.deadband_width, 1.0);
            }
            if self.config.hysteresis_width != 0.0 {
                out = self.hysteresis(out);
            }
            out + self.config.bias
        };

        self.base.publish(out, ctx)?;
        self.state.previous = out;
        self.state.initialized = true;

        let saturated = match bounds {
            Some((min, max)) => {
                let v = self.base.output();
                (v >= max && max != 0.0) || (v <= min && min != 0.0)
            }
            None => false,
        };
        ctx.props
            .set(self.flags.saturated, if saturated { 1.0 } else { 0.0 })?;
        if saturated && ctx.log.sanity() {
            tracing::warn!(component = %self.base.name(), output = self.base.output(), "actuator saturated");
        }
        Ok(())
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
        self.state = ActuatorState::default();
    }
}
