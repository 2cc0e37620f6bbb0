//! Discrete filters derived from analog prototypes by the Tustin transform.
//!
//! | kind | prototype |
//! |------|-----------|
//! | lag | `C1 / (s + C1)` |
//! | lead-lag | `(C1 s + C2) / (C3 s + C4)` |
//! | washout | `s / (s + C1)` |
//! | second order | `(C1 s² + C2 s + C3) / (C4 s² + C5 s + C6)` |
//! | integrator | `C1 / s` |
//!
//! Coefficients are re-derived whenever the sample time changes, and every
//! frame when any coefficient is a property.

use crate::component::{ComponentBase, ComponentKind, FcsComponent, FrameContext};
use crate::error::{ControlError, ControlResult};
use crate::value::{Parameter, PropertyRef};

/// Trigger threshold below which an integrator integrates normally.
const TRIGGER_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Lag,
    LeadLag,
    Washout,
    SecondOrder,
    Integrator,
}

impl FilterKind {
    /// Number of analog coefficients (`C1..Cn`) the kind reads.
    pub fn coefficient_count(self) -> usize {
        match self {
            Self::Lag | Self::Washout | Self::Integrator => 1,
            Self::LeadLag => 4,
            Self::SecondOrder => 6,
        }
    }

    pub fn component_kind(self) -> ComponentKind {
        match self {
            Self::Lag => ComponentKind::LagFilter,
            Self::LeadLag => ComponentKind::LeadLagFilter,
            Self::Washout => ComponentKind::WashoutFilter,
            Self::SecondOrder => ComponentKind::SecondOrderFilter,
            Self::Integrator => ComponentKind::Integrator,
        }
    }
}

/// Discrete difference-equation coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Discrete {
    ca: f64,
    cb: f64,
    cc: f64,
    cd: f64,
    ce: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct History {
    in1: f64,
    in2: f64,
    out1: f64,
    out2: f64,
}

#[derive(Debug, Clone)]
pub struct Filter {
    base: ComponentBase,
    kind: FilterKind,
    c: Vec<Parameter>,
    trigger: Option<PropertyRef>,
    initial: f64,
    dynamic: bool,
    discrete: Discrete,
    derived_for: Option<f64>,
    history: History,
    initialize: bool,
}

impl Filter {
    /// `coefficients` holds `C1..Cn` in order; missing trailing terms are zero.
    pub fn new(
        base: ComponentBase,
        kind: FilterKind,
        coefficients: Vec<Parameter>,
    ) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        let n = kind.coefficient_count();
        if coefficients.is_empty() {
            return Err(ControlError::MissingElement {
                component: base.name().to_string(),
                what: "c1",
            });
        }
        if coefficients.len() > n {
            return Err(ControlError::InvalidConfig {
                component: base.name().to_string(),
                what: format!("{} coefficients given, kind takes {n}", coefficients.len()),
            });
        }
        let mut c = coefficients;
        c.resize(n, Parameter::Constant(0.0));
        let dynamic = c.iter().any(Parameter::is_dynamic);
        Ok(Self {
            base,
            kind,
            c,
            trigger: None,
            initial: 0.0,
            dynamic,
            discrete: Discrete::default(),
            derived_for: None,
            history: History::default(),
            initialize: true,
        })
    }

    /// Integrator hold/reset input: non-zero holds, negative resets.
    pub fn with_trigger(mut self, trigger: PropertyRef) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Integrator value after construction and reset.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = initial;
        self
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn derive(&mut self, dt: f64, props: &fc_props::PropertyManager) -> ControlResult<()> {
        let c: Vec<f64> = self.c.iter().map(|p| p.value(props)).collect();
        let d = match self.kind {
            FilterKind::Lag => {
                let denom = 2.0 + dt * c[0];
                Discrete {
                    ca: dt * c[0] / denom,
                    cb: (2.0 - dt * c[0]) / denom,
                    ..Default::default()
                }
            }
            FilterKind::LeadLag => {
                let denom = 2.0 * c[2] + dt * c[3];
                Discrete {
                    ca: (2.0 * c[0] + dt * c[1]) / denom,
                    cb: (dt * c[1] - 2.0 * c[0]) / denom,
                    cc: (2.0 * c[2] - dt * c[3]) / denom,
                    ..Default::default()
                }
            }
            FilterKind::Washout => {
                let denom = 2.0 + dt * c[0];
                Discrete {
                    ca: 2.0 / denom,
                    cb: (2.0 - dt * c[0]) / denom,
                    ..Default::default()
                }
            }
            FilterKind::SecondOrder => {
                let dt2 = dt * dt;
                let denom = 4.0 * c[3] + 2.0 * c[4] * dt + c[5] * dt2;
                Discrete {
                    ca: (4.0 * c[0] + 2.0 * c[1] * dt + c[2] * dt2) / denom,
                    cb: (2.0 * c[2] * dt2 - 8.0 * c[0]) / denom,
                    cc: (4.0 * c[0] - 2.0 * c[1] * dt + c[2] * dt2) / denom,
                    cd: (2.0 * c[5] * dt2 - 8.0 * c[3]) / denom,
                    ce: (4.0 * c[3] - 2.0 * c[4] * dt + c[5] * dt2) / denom,
                }
            }
            FilterKind::Integrator => Discrete {
                ca: dt * c[0] / 2.0,
                ..Default::default()
            },
        };
        if [d.ca, d.cb, d.cc, d.cd, d.ce].iter().any(|v| !v.is_finite()) {
            return Err(self
                .base
                .runtime_error(format!("degenerate filter coefficients {c:?} at dt={dt}")));
        }
        self.discrete = d;
        self.derived_for = Some(dt);
        Ok(())
    }
}

impl FcsComponent for Filter {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let mut input = self.base.input(0, ctx.props);

        if self.initialize {
            self.history = History {
                in1: input,
                in2: input,
                out1: input,
                out2: input,
            };
            let out = match self.kind {
                FilterKind::Integrator => self.initial,
                _ => input,
            };
            self.history.out1 = out;
            self.history.out2 = out;
            self.base.publish(out, ctx)?;
            self.initialize = false;
            return Ok(());
        }

        if self.dynamic || self.derived_for != Some(ctx.dt) {
            self.derive(ctx.dt, ctx.props)?;
        }

        let h = self.history;
        let d = self.discrete;
        let out = match self.kind {
            FilterKind::Lag => (input + h.in1) * d.ca + h.out1 * d.cb,
            FilterKind::LeadLag => input * d.ca + h.in1 * d.cb + h.out1 * d.cc,
            FilterKind::Washout => input * d.ca - h.in1 * d.ca + h.out1 * d.cb,
            FilterKind::SecondOrder => {
                input * d.ca + h.in1 * d.cb + h.in2 * d.cc - h.out1 * d.cd - h.out2 * d.ce
            }
            FilterKind::Integrator => {
                let trigger = self.trigger.as_ref().map_or(0.0, |t| t.value(ctx.props));
                if trigger.abs() < TRIGGER_EPS {
                    (input + h.in1) * d.ca + h.out1
                } else {
                    input = 0.0;
                    if trigger < 0.0 { 0.0 } else { h.out1 }
                }
            }
        };

        self.base.publish(out, ctx)?;
        self.history = History {
            in1: input,
            in2: h.in1,
            out1: out,
            out2: h.out1,
        };
        Ok(())
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
        self.history = History::default();
        self.initialize = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::test_support::run_once;
    use crate::value::PropertyRef;
    use fc_core::{Tolerances, nearly_equal};
    use fc_props::PropertyManager;

    const TOL: Tolerances = Tolerances {
        abs: 1e-9,
        rel: 1e-9,
    };

    fn build(
        props: &mut PropertyManager,
        kind: FilterKind,
        c: &[f64],
    ) -> Filter {
        let input = Parameter::resolve("fcs/cmd", props).unwrap();
        let base = ComponentBase::new(format!("{kind:?}"), kind.component_kind(), props)
            .unwrap()
            .with_input(input);
        let c = c.iter().map(|v| Parameter::Constant(*v)).collect();
        Filter::new(base, kind, c).unwrap()
    }

    fn store() -> PropertyManager {
        let mut props = PropertyManager::new();
        props.set_value("fcs/cmd", 0.0).unwrap();
        props
    }

    #[test]
    fn first_run_initialises_to_input() {
        let mut props = store();
        props.set_value("fcs/cmd", 3.0).unwrap();
        let mut f = build(&mut props, FilterKind::Lag, &[10.0]);
        assert_eq!(run_once(&mut f, &mut props, 0.01).unwrap(), 3.0);
        // steady input stays put
        assert!(nearly_equal(run_once(&mut f, &mut props, 0.01).unwrap(), 3.0, TOL));
    }

    #[test]
    fn lag_step_response_approaches_input() {
        let mut props = store();
        let mut f = build(&mut props, FilterKind::Lag, &[5.0]);
        run_once(&mut f, &mut props, 0.01).unwrap();
        props.set_value("fcs/cmd", 1.0).unwrap();
        let mut out = 0.0;
        for _ in 0..200 {
            out = run_once(&mut f, &mut props, 0.01).unwrap();
        }
        // 2 s = 10 time constants
        assert!((out - 1.0).abs() < 1e-3, "{out}");
        assert!(out <= 1.0 + 1e-12);
    }

    #[test]
    fn washout_decays_to_zero() {
        let mut props = store();
        let mut f = build(&mut props, FilterKind::Washout, &[2.0]);
        run_once(&mut f, &mut props, 0.01).unwrap();
        props.set_value("fcs/cmd", 1.0).unwrap();
        let first = run_once(&mut f, &mut props, 0.01).unwrap();
        assert!(first > 0.9);
        let mut out = first;
        for _ in 0..1000 {
            out = run_once(&mut f, &mut props, 0.01).unwrap();
        }
        assert!(out.abs() < 1e-6);
    }

    #[test]
    fn integrator_accumulates_holds_and_resets() {
        let mut props = store();
        props.set_value("ap/hold", 0.0).unwrap();
        let trigger = PropertyRef::resolve("ap/hold", &props).unwrap();
        let mut f = build(&mut props, FilterKind::Integrator, &[1.0]).with_trigger(trigger);
        props.set_value("fcs/cmd", 1.0).unwrap();
        assert_eq!(run_once(&mut f, &mut props, 0.1).unwrap(), 0.0);
        let mut out = 0.0;
        for _ in 0..10 {
            out = run_once(&mut f, &mut props, 0.1).unwrap();
        }
        assert!(nearly_equal(out, 1.0, TOL), "{out}");

        props.set_value("ap/hold", 1.0).unwrap();
        assert!(nearly_equal(run_once(&mut f, &mut props, 0.1).unwrap(), 1.0, TOL));

        props.set_value("ap/hold", -1.0).unwrap();
        assert_eq!(run_once(&mut f, &mut props, 0.1).unwrap(), 0.0);
    }

    #[test]
    fn coefficients_follow_dt_changes() {
        let mut props = store();
        let mut f = build(&mut props, FilterKind::Integrator, &[1.0]);
        props.set_value("fcs/cmd", 1.0).unwrap();
        run_once(&mut f, &mut props, 0.1).unwrap();
        let a = run_once(&mut f, &mut props, 0.1).unwrap();
        let b = run_once(&mut f, &mut props, 0.2).unwrap();
        assert!(nearly_equal(a, 0.1, TOL));
        assert!(nearly_equal(b - a, 0.2, TOL));
    }

    #[test]
    fn degenerate_coefficients_fail_and_keep_output() {
        let mut props = store();
        props.set_value("fcs/cmd", 1.0).unwrap();
        let mut f = build(&mut props, FilterKind::LeadLag, &[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(run_once(&mut f, &mut props, 0.01).unwrap(), 1.0);
        let err = run_once(&mut f, &mut props, 0.01).unwrap_err();
        assert!(matches!(err, ControlError::Runtime { .. }));
        assert_eq!(f.output(), 1.0);
    }

    #[test]
    fn second_order_unity_passes_through() {
        let mut props = store();
        let mut f = build(&mut props, FilterKind::SecondOrder, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        run_once(&mut f, &mut props, 0.01).unwrap();
        props.set_value("fcs/cmd", 2.0).unwrap();
        for _ in 0..5 {
            run_once(&mut f, &mut props, 0.01).unwrap();
        }
        assert!(nearly_equal(f.output(), 2.0, TOL), "{}", f.output());
    }

    #[test]
    fn dynamic_coefficient_is_detected() {
        let mut props = store();
        props.set_value("fcs/lag-rate", 4.0).unwrap();
        let input = Parameter::resolve("fcs/cmd", &props).unwrap();
        let base = ComponentBase::new("dyn", ComponentKind::LagFilter, &mut props)
            .unwrap()
            .with_input(input);
        let c1 = Parameter::resolve("fcs/lag-rate", &props).unwrap();
        let f = Filter::new(base, FilterKind::Lag, vec![c1]).unwrap();
        assert!(f.is_dynamic());
    }

    #[test]
    fn missing_c1_is_config_error() {
        let mut props = store();
        let input = Parameter::resolve("fcs/cmd", &props).unwrap();
        let base = ComponentBase::new("bad", ComponentKind::LagFilter, &mut props)
            .unwrap()
            .with_input(input);
        let err = Filter::new(base, FilterKind::Lag, vec![]).unwrap_err();
        assert!(matches!(err, ControlError::MissingElement { what: "c1", .. }));
    }
}
