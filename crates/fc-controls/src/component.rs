//! Shared component contract and the common base every kind embeds.
//!
//! A component reads its inputs from the property store, computes a transfer
//! function, and hands the raw result to [`ComponentBase::publish`], which
//! applies clipping and then the transport delay, then writes the final output to
//! the component's own property (`fcs/<name>`) and every configured output.

use std::fmt;
use std::str::FromStr;

use fc_core::{PropertyId, constrain};
use fc_props::PropertyManager;

use crate::error::{ControlError, ControlResult};
use crate::log::LogConfig;
use crate::value::Parameter;

/// Everything a component may touch while running one frame.
pub struct FrameContext<'a> {
    pub props: &'a mut PropertyManager,
    /// Channel sample time: frame dt times the channel rate, `0.0` in steady mode.
    pub dt: f64,
    pub trimming: bool,
    pub log: &'a LogConfig,
}

/// Declared component kind, keyed by its configuration type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    PureGain,
    ScheduledGain,
    AerosurfaceScale,
    Summer,
    Switch,
    LagFilter,
    LeadLagFilter,
    WashoutFilter,
    SecondOrderFilter,
    Integrator,
    Deadband,
    Pid,
    Kinematic,
    Actuator,
    Sensor,
    Distributor,
    And,
    Or,
    Not,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 19] = [
        Self::PureGain,
        Self::ScheduledGain,
        Self::AerosurfaceScale,
        Self::Summer,
        Self::Switch,
        Self::LagFilter,
        Self::LeadLagFilter,
        Self::WashoutFilter,
        Self::SecondOrderFilter,
        Self::Integrator,
        Self::Deadband,
        Self::Pid,
        Self::Kinematic,
        Self::Actuator,
        Self::Sensor,
        Self::Distributor,
        Self::And,
        Self::Or,
        Self::Not,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PureGain => "pure_gain",
            Self::ScheduledGain => "scheduled_gain",
            Self::AerosurfaceScale => "aerosurface_scale",
            Self::Summer => "summer",
            Self::Switch => "switch",
            Self::LagFilter => "lag_filter",
            Self::LeadLagFilter => "lead_lag_filter",
            Self::WashoutFilter => "washout_filter",
            Self::SecondOrderFilter => "second_order_filter",
            Self::Integrator => "integrator",
            Self::Deadband => "deadband",
            Self::Pid => "pid",
            Self::Kinematic => "kinematic",
            Self::Actuator => "actuator",
            Self::Sensor => "sensor",
            Self::Distributor => "distributor",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ControlError::UnknownComponentKind {
                kind: s.to_string(),
            })
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property path a component publishes under.
///
/// Names already containing `/` are used as-is; otherwise the name is
/// lower-cased, whitespace becomes `-`, and it is placed under `fcs/`.
pub fn output_property_name(name: &str) -> String {
    let name = name.trim();
    if name.contains('/') {
        return name.trim_start_matches('/').to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    out.push_str("fcs/");
    let mut last_dash = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !last_dash {
                out.push('-');
            }
            last_dash = true;
        } else {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        }
    }
    out
}

/// Output bounds; each bound a literal or a property.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub min: Parameter,
    pub max: Parameter,
    /// Wrap into `[min, max)` instead of saturating.
    pub cyclic: bool,
}

impl Clip {
    pub fn new(min: Parameter, max: Parameter) -> Self {
        Self {
            min,
            max,
            cyclic: false,
        }
    }

    pub fn cyclic(min: Parameter, max: Parameter) -> Self {
        Self {
            min,
            max,
            cyclic: true,
        }
    }

    pub fn bounds(&self, props: &PropertyManager) -> (f64, f64) {
        (self.min.value(props), self.max.value(props))
    }

    pub fn apply(&self, value: f64, props: &PropertyManager) -> f64 {
        let (min, max) = self.bounds(props);
        let range = max - min;
        if self.cyclic && range > 0.0 {
            min + (value - min).rem_euclid(range)
        } else {
            constrain(min, value, max)
        }
    }
}

/// Fixed-length transport delay.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayLine {
    buffer: Vec<f64>,
    head: usize,
    initial: f64,
}

impl DelayLine {
    /// Delay by `frames` executions; `0` passes values straight through.
    pub fn new(frames: usize, initial: f64) -> Self {
        Self {
            buffer: vec![initial; frames],
            head: 0,
            initial,
        }
    }

    pub fn frames(&self) -> usize {
        self.buffer.len()
    }

    /// Push the newest sample and return the one from `frames` runs ago.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.buffer.is_empty() {
            return value;
        }
        let oldest = std::mem::replace(&mut self.buffer[self.head], value);
        self.head = (self.head + 1) % self.buffer.len();
        oldest
    }

    pub fn reset(&mut self) {
        self.buffer.fill(self.initial);
        self.head = 0;
    }
}

/// Configuration and bookkeeping common to every component kind.
#[derive(Debug, Clone)]
pub struct ComponentBase {
    name: String,
    kind: ComponentKind,
    inputs: Vec<Parameter>,
    own_output: PropertyId,
    outputs: Vec<PropertyId>,
    clip: Option<Clip>,
    delay: Option<DelayLine>,
    output: f64,
}

impl ComponentBase {
    /// Create the base and register the component's own output property.
    pub fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        props: &mut PropertyManager,
    ) -> ControlResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ControlError::InvalidArg {
                what: "component name must not be empty",
            });
        }
        let own_output = props.get_or_create(&output_property_name(&name))?;
        Ok(Self {
            name,
            kind,
            inputs: Vec::new(),
            own_output,
            outputs: Vec::new(),
            clip: None,
            delay: None,
            output: 0.0,
        })
    }

    pub fn with_input(mut self, input: Parameter) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = Parameter>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_output(mut self, id: PropertyId) -> Self {
        if id != self.own_output && !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        self
    }

    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_delay(mut self, frames: usize, initial: f64) -> Self {
        self.delay = (frames > 0).then(|| DelayLine::new(frames, initial));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn inputs(&self) -> &[Parameter] {
        &self.inputs
    }

    pub fn own_output(&self) -> PropertyId {
        self.own_output
    }

    pub fn outputs(&self) -> &[PropertyId] {
        &self.outputs
    }

    pub fn clip(&self) -> Option<&Clip> {
        self.clip.as_ref()
    }

    pub fn delay_frames(&self) -> usize {
        self.delay.as_ref().map_or(0, DelayLine::frames)
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Value of input `i`, or `0.0` if absent.
    pub fn input(&self, i: usize, props: &PropertyManager) -> f64 {
        self.inputs.get(i).map_or(0.0, |p| p.value(props))
    }

    /// Fail unless the input count lies in `min..=max`.
    pub fn require_inputs(&self, min: usize, max: Option<usize>) -> ControlResult<()> {
        let n = self.inputs.len();
        if n < min {
            return Err(ControlError::MissingElement {
                component: self.name.clone(),
                what: "input",
            });
        }
        match max {
            Some(max) if n > max => Err(ControlError::InvalidConfig {
                component: self.name.clone(),
                what: format!("expects at most {max} input(s), got {n}"),
            }),
            _ => Ok(()),
        }
    }

    pub fn runtime_error(&self, what: impl Into<String>) -> ControlError {
        ControlError::Runtime {
            component: self.name.clone(),
            what: what.into(),
        }
    }

    /// Clip, delay and write the result of this frame.
    ///
    /// Clipping uses this frame's bounds; the delay line then holds the
    /// clipped value. A non-finite raw value is rejected before any state
    /// changes, so the previous output is kept.
    pub fn publish(&mut self, raw: f64, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        if !raw.is_finite() {
            return Err(self.runtime_error(format!("non-finite output {raw}")));
        }
        let clipped = match &self.clip {
            Some(clip) => {
                let clipped = clip.apply(raw, ctx.props);
                if ctx.log.sanity() && clipped != raw && !clip.cyclic {
                    tracing::debug!(component = %self.name, raw, clipped, "output saturated");
                }
                clipped
            }
            None => raw,
        };
        let value = match self.delay.as_mut() {
            Some(line) => line.push(clipped),
            None => clipped,
        };
        self.output = value;
        ctx.props.set(self.own_output, value)?;
        for id in &self.outputs {
            ctx.props.set(*id, value)?;
        }
        if ctx.log.runtime_state() {
            tracing::trace!(component = %self.name, kind = %self.kind, output = value);
        }
        Ok(())
    }

    /// Refill the delay line with its initial value.
    pub fn reset(&mut self) {
        if let Some(line) = self.delay.as_mut() {
            line.reset();
        }
    }
}

/// Behaviour shared by every FCS component kind.
pub trait FcsComponent: fmt::Debug {
    fn base(&self) -> &ComponentBase;

    /// Run one frame. On `Err` the previous output is kept.
    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()>;

    /// Clear history and integrator state without touching configuration.
    fn reset_past_states(&mut self);

    fn name(&self) -> &str {
        self.base().name()
    }

    fn kind(&self) -> ComponentKind {
        self.base().kind()
    }

    fn output(&self) -> f64 {
        self.base().output()
    }
}
