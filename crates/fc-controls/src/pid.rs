//! PID controller component.
//!
//! Supports:
//! - parallel (`Kp·e + I + Kd·ė`) and standard (`Kp·(e + I + Kd·ė)`) forms
//! - selectable integration scheme for the integral term
//! - an externally supplied derivative (`pvdot`) instead of differencing
//! - a trigger input that holds (non-zero) or resets (negative) the integrator
//! - an optional integral windup limit

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::error::{ControlError, ControlResult};
use crate::value::{Parameter, PropertyRef};

const TRIGGER_EPS: f64 = 1e-6;

/// Integration scheme for the integral term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationScheme {
    /// No integral action.
    None,
    /// Rectangular (Euler).
    Rect,
    /// Trapezoidal.
    Trap,
    /// 2nd order Adams-Bashforth.
    #[default]
    Ab2,
    /// 3rd order Adams-Bashforth.
    Ab3,
}

impl IntegrationScheme {
    /// Integrand increment for the current and past inputs.
    pub fn delta(self, input: f64, prev: f64, prev2: f64) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Rect => input,
            Self::Trap => 0.5 * (input + prev),
            Self::Ab2 => 1.5 * input - 0.5 * prev,
            Self::Ab3 => (23.0 * input - 16.0 * prev + 5.0 * prev2) / 12.0,
        }
    }
}

impl FromStr for IntegrationScheme {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "rect" => Ok(Self::Rect),
            "trap" => Ok(Self::Trap),
            "ab2" => Ok(Self::Ab2),
            "ab3" => Ok(Self::Ab3),
            _ => Err(ControlError::InvalidArg {
                what: "integration scheme must be one of none, rect, trap, ab2, ab3",
            }),
        }
    }
}

impl fmt::Display for IntegrationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Rect => "rect",
            Self::Trap => "trap",
            Self::Ab2 => "ab2",
            Self::Ab3 => "ab3",
        })
    }
}

/// PID controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidState {
    /// Integral accumulator.
    pub integral: f64,
    /// Input one run ago.
    pub input_prev: f64,
    /// Input two runs ago.
    pub input_prev2: f64,
}

/// Gains resolved for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Clone)]
pub struct Pid {
    base: ComponentBase,
    kp: Parameter,
    ki: Parameter,
    kd: Parameter,
    standard: bool,
    scheme: IntegrationScheme,
    pvdot: Option<PropertyRef>,
    trigger: Option<PropertyRef>,
    integral_limit: Option<f64>,
    initial_integral: f64,
    state: PidState,
}

impl Pid {
    pub fn new(base: ComponentBase, kp: Parameter, ki: Parameter, kd: Parameter) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        Ok(Self {
            base,
            kp,
            ki,
            kd,
            standard: false,
            scheme: IntegrationScheme::default(),
            pvdot: None,
            trigger: None,
            integral_limit: None,
            initial_integral: 0.0,
            state: PidState::default(),
        })
    }

    pub fn standard_form(mut self, standard: bool) -> Self {
        self.standard = standard;
        self
    }

    pub fn with_scheme(mut self, scheme: IntegrationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_pvdot(mut self, pvdot: PropertyRef) -> Self {
        self.pvdot = Some(pvdot);
        self
    }

    pub fn with_trigger(mut self, trigger: PropertyRef) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Set integral windup limit.
    pub fn with_integral_limit(mut self, limit: f64) -> ControlResult<Self> {
        if !(limit > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "integral_limit must be positive",
            });
        }
        self.integral_limit = Some(limit);
        Ok(self)
    }

    /// Integrator value after construction and reset.
    pub fn with_initial_integral(mut self, value: f64) -> Self {
        self.initial_integral = value;
        self.state.integral = value;
        self
    }

    pub fn state(&self) -> &PidState {
        &self.state
    }

    pub fn scheme(&self) -> IntegrationScheme {
        self.scheme
    }

    /// Compute the next state and raw output.
    ///
    /// # Arguments
    ///
    /// * `state` - State after the previous run
    /// * `gains` - Gains for this frame
    /// * `input` - Error signal
    /// * `dval` - Derivative of the input
    /// * `trigger` - Hold/reset signal, `0.0` to integrate
    /// * `dt` - Sample time (seconds)
    pub fn update(
        &self,
        state: &PidState,
        gains: PidGains,
        input: f64,
        dval: f64,
        trigger: f64,
        dt: f64,
    ) -> (PidState, f64) {
        let delta = if trigger.abs() < TRIGGER_EPS {
            self.scheme.delta(input, state.input_prev, state.input_prev2)
        } else {
            0.0
        };
        let mut integral = if trigger < 0.0 { 0.0 } else { state.integral };
        integral += gains.ki * dt * delta;
        if let Some(limit) = self.integral_limit {
            integral = integral.clamp(-limit, limit);
        }

        let output = if self.standard {
            gains.kp * (input + integral + gains.kd * dval)
        } else {
            gains.kp * input + integral + gains.kd * dval
        };

        let next = PidState {
            integral,
            input_prev: input,
            input_prev2: if trigger < 0.0 { 0.0 } else { state.input_prev },
        };
        (next, output)
    }
}

impl FcsComponent for Pid {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let props = &*ctx.props;
        let input = self.base.input(0, props);
        let dval = match &self.pvdot {
            Some(p) => p.value(props),
            None if ctx.dt > 0.0 => (input - self.state.input_prev) / ctx.dt,
            None => 0.0,
        };
        let trigger = self.trigger.as_ref().map_or(0.0, |t| t.value(props));
        let gains = PidGains {
            kp: self.kp.value(props),
            ki: self.ki.value(props),
            kd: self.kd.value(props),
        };
        let (next, output) = self.update(&self.state, gains, input, dval, trigger, ctx.dt);
        self.base.publish(output, ctx)?;
        self.state = next;
        Ok(())
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
        self.state = PidState {
            integral: self.initial_integral,
            ..PidState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::component::test_support::run_once;
    use fc_core::{Tolerances, nearly_equal};
    use fc_props::PropertyManager;

    const TOL: Tolerances = Tolerances {
        abs: 1e-9,
        rel: 1e-9,
    };

    fn pid(props: &mut PropertyManager, kp: f64, ki: f64, kd: f64) -> Pid {
        props.set_value("ap/error", 0.0).unwrap();
        let input = Parameter::resolve("ap/error", props).unwrap();
        let base = ComponentBase::new("ap/pid", ComponentKind::Pid, props)
            .unwrap()
            .with_input(input);
        Pid::new(base, kp.into(), ki.into(), kd.into()).unwrap()
    }

    #[test]
    fn proportional_only() {
        let mut props = PropertyManager::new();
        let mut c = pid(&mut props, 2.0, 0.0, 0.0);
        props.set_value("ap/error", 0.5).unwrap();
        assert_eq!(run_once(&mut c, &mut props, 0.1).unwrap(), 1.0);
    }

    #[test]
    fn rectangular_integral_action() {
        let mut props = PropertyManager::new();
        let mut c = pid(&mut props, 0.0, 1.0, 0.0).with_scheme(IntegrationScheme::Rect);
        props.set_value("ap/error", 1.0).unwrap();
        for _ in 0..10 {
            run_once(&mut c, &mut props, 0.1).unwrap();
        }
        assert!(nearly_equal(c.state().integral, 1.0, TOL));
        assert!(nearly_equal(c.output(), 1.0, TOL));
    }

    #[test]
    fn trigger_holds_then_resets() {
        let mut props = PropertyManager::new();
        props.set_value("ap/windup", 0.0).unwrap();
        let trigger = PropertyRef::resolve("ap/windup", &props).unwrap();
        let mut c = pid(&mut props, 0.0, 1.0, 0.0)
            .with_scheme(IntegrationScheme::Rect)
            .with_trigger(trigger);
        props.set_value("ap/error", 1.0).unwrap();
        run_once(&mut c, &mut props, 0.5).unwrap();
        assert!(nearly_equal(c.output(), 0.5, TOL));

        props.set_value("ap/windup", 1.0).unwrap();
        run_once(&mut c, &mut props, 0.5).unwrap();
        assert!(nearly_equal(c.output(), 0.5, TOL));

        props.set_value("ap/windup", -1.0).unwrap();
        run_once(&mut c, &mut props, 0.5).unwrap();
        assert_eq!(c.output(), 0.0);
    }

    #[test]
    fn standard_form_scales_all_terms() {
        let mut props = PropertyManager::new();
        props.set_value("ap/rate", 2.0).unwrap();
        let pvdot = PropertyRef::resolve("ap/rate", &props).unwrap();
        let mut c = pid(&mut props, 2.0, 0.0, 0.5)
            .standard_form(true)
            .with_pvdot(pvdot);
        props.set_value("ap/error", 1.0).unwrap();
        // 2 * (1 + 0 + 0.5 * 2)
        assert_eq!(run_once(&mut c, &mut props, 0.1).unwrap(), 4.0);
    }

    #[test]
    fn derivative_from_differencing() {
        let mut props = PropertyManager::new();
        let mut c = pid(&mut props, 0.0, 0.0, 1.0);
        props.set_value("ap/error", 0.2).unwrap();
        assert!(nearly_equal(run_once(&mut c, &mut props, 0.1).unwrap(), 2.0, TOL));
        assert_eq!(run_once(&mut c, &mut props, 0.1).unwrap(), 0.0);
        // steady mode has no derivative
        props.set_value("ap/error", 5.0).unwrap();
        assert_eq!(run_once(&mut c, &mut props, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn integral_limit_clamps() {
        let mut props = PropertyManager::new();
        let mut c = pid(&mut props, 0.0, 1.0, 0.0)
            .with_scheme(IntegrationScheme::Rect)
            .with_integral_limit(0.3)
            .unwrap();
        props.set_value("ap/error", 1.0).unwrap();
        for _ in 0..10 {
            run_once(&mut c, &mut props, 0.1).unwrap();
        }
        assert_eq!(c.output(), 0.3);
    }

    #[test]
    fn reset_restores_initial_integral() {
        let mut props = PropertyManager::new();
        let mut c = pid(&mut props, 0.0, 1.0, 0.0).with_initial_integral(0.25);
        props.set_value("ap/error", 1.0).unwrap();
        run_once(&mut c, &mut props, 0.1).unwrap();
        c.reset_past_states();
        assert_eq!(*c.state(), PidState {
            integral: 0.25,
            input_prev: 0.0,
            input_prev2: 0.0,
        });
    }

    #[test]
    fn schemes_parse() {
        assert_eq!("AB3".parse::<IntegrationScheme>().unwrap(), IntegrationScheme::Ab3);
        assert!("euler".parse::<IntegrationScheme>().is_err());
        assert_eq!(IntegrationScheme::default(), IntegrationScheme::Ab2);
    }
}
