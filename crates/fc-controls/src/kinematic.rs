//! Finite-rate travel through a table of detents (gear, flaps).
//!
//! Each segment between two detents has its own transition time, so the
//! travel rate is `(detent[i] - detent[i-1]) / time[i]`. Motion may cross
//! several segments in one frame and always lands exactly on the command.

use fc_core::{constrain, equal_to_roundoff};

use crate::component::{ComponentBase, FcsComponent, FrameContext};
use crate::error::{ControlError, ControlResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detent {
    pub position: f64,
    /// Seconds to travel from the previous detent; `0` is instantaneous.
    pub time: f64,
}

#[derive(Debug, Clone)]
pub struct Kinematic {
    base: ComponentBase,
    detents: Vec<Detent>,
    scale: bool,
    position: f64,
}

impl Kinematic {
    /// `scale` multiplies the input by the last detent (normalised commands).
    pub fn new(base: ComponentBase, detents: Vec<Detent>, scale: bool) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        if detents.len() < 2 {
            return Err(ControlError::InvalidConfig {
                component: base.name().to_string(),
                what: "kinematic needs at least 2 detents".into(),
            });
        }
        if detents.windows(2).any(|w| !(w[1].position > w[0].position)) {
            return Err(ControlError::InvalidConfig {
                component: base.name().to_string(),
                what: "detent positions must be strictly increasing".into(),
            });
        }
        if detents.iter().any(|d| !(d.time >= 0.0)) {
            return Err(ControlError::InvalidConfig {
                component: base.name().to_string(),
                what: "detent times must be non-negative".into(),
            });
        }
        let position = Self::rest(&detents);
        Ok(Self {
            base,
            detents,
            scale,
            position,
        })
    }

    fn rest(detents: &[Detent]) -> f64 {
        let (lo, hi) = Self::span(detents);
        constrain(lo, 0.0, hi)
    }

    fn span(detents: &[Detent]) -> (f64, f64) {
        let lo = detents.first().map_or(0.0, |d| d.position);
        let hi = detents.last().map_or(0.0, |d| d.position);
        (lo, hi)
    }

    pub fn detents(&self) -> &[Detent] {
        &self.detents
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Move from `from` toward `target` for `dt` seconds.
    pub fn travel(&self, from: f64, target: f64, dt: f64) -> f64 {
        let d = &self.detents;
        let n = d.len();
        let mut out = from;
        let mut remaining = dt;
        while remaining > 0.0 && !equal_to_roundoff(target, out) {
            // segment [ind-1, ind] containing `out` in the direction of travel
            let behind = |p: f64| if target < out { p < out } else { p <= out };
            let mut ind = 1;
            while ind < n - 1 && behind(d[ind].position) {
                ind += 1;
            }
            let (lo, hi) = (d[ind - 1].position, d[ind].position);
            let time = d[ind].time;
            let seg_target = constrain(lo, target, hi);
            if time <= 0.0 {
                out = seg_target;
                continue;
            }
            let rate = (hi - lo) / time;
            let seg_dt = ((seg_target - out) / rate).abs();
            if remaining < seg_dt {
                if out < target {
                    out += remaining * rate;
                } else {
                    out -= remaining * rate;
                }
                remaining = 0.0;
            } else {
                out = seg_target;
                remaining -= seg_dt;
            }
        }
        out
    }
}

impl FcsComponent for Kinematic {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        let (lo, hi) = Self::span(&self.detents);
        let mut input = self.base.input(0, ctx.props);
        if self.scale {
            input *= hi;
        }
        let target = constrain(lo, input, hi);

        // the first output node is the position's source of truth
        let current = match self.base.outputs().first() {
            Some(id) => ctx.props.get(*id),
            None => self.position,
        };

        let out = if ctx.trimming {
            target
        } else {
            self.travel(current, target, ctx.dt)
        };
        self.base.publish(out, ctx)?;
        self.position = out;
        Ok(())
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
        self.position = Self::rest(&self.detents);
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::value::Parameter;
    use fc_props::PropertyManager;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn reachable_target_is_hit_exactly(
            from in 0.0f64..30.0,
            target in 0.0f64..30.0,
            slack in 0.0f64..2.0,
        ) {
            let mut props = PropertyManager::new();
            let base = ComponentBase::new("k", ComponentKind::Kinematic, &mut props)
                .unwrap()
                .with_input(Parameter::Constant(0.0));
            let detents = vec![
                Detent { position: 0.0, time: 0.0 },
                Detent { position: 30.0, time: 6.0 },
            ];
            let k = Kinematic::new(base, detents, false).unwrap();
            // 5 units/s; give the frame enough time to cover the gap plus slack
            let dt = (target - from).abs() / 5.0 + slack + 1e-9;
            prop_assert_eq!(k.travel(from, target, dt), target);
        }
    }
}
