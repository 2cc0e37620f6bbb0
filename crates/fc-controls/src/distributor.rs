//! Condition-driven property writer.
//!
//! Each case carries an optional test and a list of property assignments.
//! Cases are visited in order every run; a case without a test always fires.
//! In exclusive mode only the first case whose test passes fires, while
//! untested cases still fire.

use std::fmt;

use fc_core::PropertyId;
use fc_props::PropertyManager;

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::condition::Condition;
use crate::error::ControlResult;
use crate::value::Parameter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributorMode {
    /// Every passing case fires.
    #[default]
    Inclusive,
    /// Only the first passing case fires.
    Exclusive,
}

impl fmt::Display for DistributorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inclusive => "inclusive",
            Self::Exclusive => "exclusive",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: PropertyId,
    pub value: Parameter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub test: Option<Condition>,
    pub assignments: Vec<Assignment>,
}

impl Case {
    fn apply(&self, props: &mut PropertyManager) -> ControlResult<()> {
        for a in &self.assignments {
            let v = a.value.value(props);
            props.set(a.target, v)?;
        }
        Ok(())
    }
}

/// Writes property/value pairs selected by conditions. It has no signal
/// output of its own.
#[derive(Debug, Clone)]
pub struct Distributor {
    base: ComponentBase,
    mode: DistributorMode,
    cases: Vec<Case>,
}

impl Distributor {
    pub fn new(base: ComponentBase, mode: DistributorMode, cases: Vec<Case>) -> ControlResult<Self> {
        base.require_inputs(0, Some(0))?;
        Ok(Self { base, mode, cases })
    }

    pub fn mode(&self) -> DistributorMode {
        self.mode
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    fn fires(&self, case: &Case, matched: bool, props: &PropertyManager) -> bool {
        match &case.test {
            Some(test) => {
                !(self.mode == DistributorMode::Exclusive && matched) && test.evaluate(props)
            }
            None => true,
        }
    }

    /// Indices of the cases that would fire against the current values.
    pub fn firing(&self, props: &PropertyManager) -> Vec<usize> {
        let mut matched = false;
        let mut out = Vec::new();
        for (i, case) in self.cases.iter().enumerate() {
            if self.fires(case, matched, props) {
                matched |= case.test.is_some();
                out.push(i);
            }
        }
        out
    }
}

impl FcsComponent for Distributor {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        // a case sees the assignments of the cases before it
        let mut matched = false;
        for case in &self.cases {
            if self.fires(case, matched, ctx.props) {
                matched |= case.test.is_some();
                case.apply(ctx.props)?;
            }
        }
        if ctx.log.runtime_state() {
            tracing::trace!(component = %self.base.name(), mode = %self.mode, "cases distributed");
        }
        Ok(())
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::component::test_support::run_once;

    fn store() -> PropertyManager {
        let mut props = PropertyManager::new();
        props.set_value("fcs/flap-handle", 0.0).unwrap();
        props.set_value("fcs/flap-cmd", -1.0).unwrap();
        props.set_value("fcs/flap-light", -1.0).unwrap();
        props.set_value("fcs/source", 7.0).unwrap();
        props
    }

    fn assign(props: &PropertyManager, path: &str, value: Parameter) -> Assignment {
        Assignment {
            target: props.lookup(path).unwrap(),
            value,
        }
    }

    fn distributor(props: &mut PropertyManager, mode: DistributorMode) -> Distributor {
        let cases = vec![
            Case {
                test: Some(Condition::parse("fcs/flap-handle ge 1", props).unwrap()),
                assignments: vec![assign(props, "fcs/flap-cmd", Parameter::Constant(10.0))],
            },
            Case {
                test: Some(Condition::parse("fcs/flap-handle ge 0", props).unwrap()),
                assignments: vec![assign(
                    props,
                    "fcs/flap-cmd",
                    Parameter::resolve("-fcs/source", props).unwrap(),
                )],
            },
            Case {
                test: None,
                assignments: vec![assign(props, "fcs/flap-light", Parameter::Constant(1.0))],
            },
        ];
        let base = ComponentBase::new("Flap Logic", ComponentKind::Distributor, props).unwrap();
        Distributor::new(base, mode, cases).unwrap()
    }

    #[test]
    fn exclusive_fires_first_passing_case_only() {
        let mut props = store();
        let mut d = distributor(&mut props, DistributorMode::Exclusive);
        props.set_value("fcs/flap-handle", 2.0).unwrap();
        assert_eq!(d.firing(&props), vec![0, 2]);
        run_once(&mut d, &mut props, 0.01).unwrap();
        assert_eq!(props.value("fcs/flap-cmd"), Some(10.0));
        assert_eq!(props.value("fcs/flap-light"), Some(1.0));
    }

    #[test]
    fn inclusive_fires_every_passing_case_in_order() {
        let mut props = store();
        let mut d = distributor(&mut props, DistributorMode::Inclusive);
        props.set_value("fcs/flap-handle", 2.0).unwrap();
        assert_eq!(d.firing(&props), vec![0, 1, 2]);
        run_once(&mut d, &mut props, 0.01).unwrap();
        // the later case overwrites the earlier one
        assert_eq!(props.value("fcs/flap-cmd"), Some(-7.0));
    }

    #[test]
    fn untested_case_fires_when_nothing_passes() {
        let mut props = store();
        let mut d = distributor(&mut props, DistributorMode::Exclusive);
        props.set_value("fcs/flap-handle", -1.0).unwrap();
        run_once(&mut d, &mut props, 0.01).unwrap();
        assert_eq!(props.value("fcs/flap-cmd"), Some(-1.0));
        assert_eq!(props.value("fcs/flap-light"), Some(1.0));
    }

    #[test]
    fn inputs_are_rejected() {
        let mut props = store();
        let base = ComponentBase::new("d", ComponentKind::Distributor, &mut props)
            .unwrap()
            .with_input(Parameter::Constant(1.0));
        assert!(Distributor::new(base, DistributorMode::Inclusive, Vec::new()).is_err());
    }
}
