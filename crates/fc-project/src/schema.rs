//! Control document schema definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlProject {
    pub version: u32,
    pub name: String,
    /// Number of engines with throttle/mixture/advance channels.
    #[serde(default)]
    pub engines: usize,
    /// Interface properties the FCS reads, declared up front.
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub systems: Vec<SystemDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDef {
    pub path: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemKindDef {
    #[default]
    System,
    Autopilot,
    FlightControl,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemDef {
    pub name: String,
    #[serde(default)]
    pub kind: SystemKindDef,
    #[serde(default)]
    pub channels: Vec<ChannelDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelDef {
    pub name: String,
    /// Run every `execrate` frames; values below 1 mean every frame.
    #[serde(default = "default_execrate")]
    pub execrate: i64,
    /// Enable gate: a property name or an `"a op b"` test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    pub kind: ComponentKindDef,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipto: Option<ClipDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayDef>,
}

/// A literal or a (possibly `-`-negated) property name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValueDef {
    Number(f64),
    Property(String),
}

impl Default for ValueDef {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl From<f64> for ValueDef {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipDef {
    pub min: ValueDef,
    pub max: ValueDef,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cyclic: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnitDef {
    #[default]
    Frames,
    Seconds,
}

/// Longest transport delay a component may carry, in channel frames.
pub const MAX_DELAY_FRAMES: u32 = 1 << 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelayDef {
    pub value: f64,
    #[serde(default)]
    pub unit: DelayUnitDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConditionDef {
    /// `AND` (default) or `OR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchTestDef {
    pub value: ValueDef,
    #[serde(default)]
    pub condition: ConditionDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDef {
    /// Property selecting the row.
    pub row: String,
    /// Property selecting the column; absent for a 1-D table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Column breakpoints (2-D tables only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<f64>,
    /// Each row is `[key, value...]`.
    pub rows: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub extrapolate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeDef {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetentDef {
    pub position: f64,
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationDef {
    None,
    Rect,
    Trap,
    #[default]
    Ab2,
    Ab3,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseVariationDef {
    #[default]
    Percent,
    Absolute,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseDistributionDef {
    #[default]
    Uniform,
    Gaussian,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoiseDef {
    pub variance: f64,
    #[serde(default)]
    pub variation: NoiseVariationDef,
    #[serde(default)]
    pub distribution: NoiseDistributionDef,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuantizationDef {
    pub bits: u32,
    pub min: f64,
    pub max: f64,
    /// Property publishing the step count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistributorModeDef {
    #[default]
    Inclusive,
    Exclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentDef {
    pub property: String,
    pub value: ValueDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDef {
    /// Absent: the case always fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<ConditionDef>,
    #[serde(default)]
    pub assignments: Vec<AssignmentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKindDef {
    PureGain {
        #[serde(default = "one")]
        gain: ValueDef,
    },
    ScheduledGain {
        #[serde(default = "one")]
        gain: ValueDef,
        table: TableDef,
    },
    AerosurfaceScale {
        #[serde(default = "one")]
        gain: ValueDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<RangeDef>,
        range: RangeDef,
        #[serde(default = "default_true")]
        zero_centered: bool,
    },
    Summer {
        #[serde(default)]
        bias: f64,
    },
    Switch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<ValueDef>,
        #[serde(default)]
        tests: Vec<SwitchTestDef>,
    },
    LagFilter {
        c1: ValueDef,
    },
    LeadLagFilter {
        c1: ValueDef,
        #[serde(default)]
        c2: ValueDef,
        #[serde(default)]
        c3: ValueDef,
        #[serde(default)]
        c4: ValueDef,
    },
    WashoutFilter {
        c1: ValueDef,
    },
    SecondOrderFilter {
        c1: ValueDef,
        #[serde(default)]
        c2: ValueDef,
        #[serde(default)]
        c3: ValueDef,
        #[serde(default)]
        c4: ValueDef,
        #[serde(default)]
        c5: ValueDef,
        #[serde(default)]
        c6: ValueDef,
    },
    Integrator {
        #[serde(default = "one")]
        c1: ValueDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<String>,
        #[serde(default)]
        initial: f64,
    },
    Deadband {
        #[serde(default)]
        width: ValueDef,
        #[serde(default = "default_gain")]
        gain: f64,
    },
    Pid {
        #[serde(default)]
        kp: ValueDef,
        #[serde(default)]
        ki: ValueDef,
        #[serde(default)]
        kd: ValueDef,
        #[serde(default, skip_serializing_if = "is_false")]
        standard: bool,
        #[serde(default)]
        integration: IntegrationDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pvdot: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<String>,
        #[serde(default)]
        initial_integral: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        integral_limit: Option<f64>,
    },
    Kinematic {
        settings: Vec<DetentDef>,
        #[serde(default, skip_serializing_if = "is_false")]
        noscale: bool,
    },
    Actuator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lag: Option<ValueDef>,
        /// Symmetric limit; overridden per direction by the fields below.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate_limit: Option<ValueDef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate_limit_incr: Option<ValueDef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate_limit_decr: Option<ValueDef>,
        #[serde(default)]
        deadband_width: f64,
        #[serde(default)]
        hysteresis_width: f64,
        #[serde(default)]
        bias: f64,
    },
    Sensor {
        #[serde(default)]
        lag: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        noise: Option<NoiseDef>,
        #[serde(default)]
        drift_rate: f64,
        #[serde(default = "default_gain")]
        gain: f64,
        #[serde(default)]
        bias: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantization: Option<QuantizationDef>,
    },
    Distributor {
        mode: DistributorModeDef,
        #[serde(default)]
        cases: Vec<CaseDef>,
    },
    And,
    Or,
    Not,
}

impl ComponentKindDef {
    /// The `type` tag as written in documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PureGain { .. } => "pure_gain",
            Self::ScheduledGain { .. } => "scheduled_gain",
            Self::AerosurfaceScale { .. } => "aerosurface_scale",
            Self::Summer { .. } => "summer",
            Self::Switch { .. } => "switch",
            Self::LagFilter { .. } => "lag_filter",
            Self::LeadLagFilter { .. } => "lead_lag_filter",
            Self::WashoutFilter { .. } => "washout_filter",
            Self::SecondOrderFilter { .. } => "second_order_filter",
            Self::Integrator { .. } => "integrator",
            Self::Deadband { .. } => "deadband",
            Self::Pid { .. } => "pid",
            Self::Kinematic { .. } => "kinematic",
            Self::Actuator { .. } => "actuator",
            Self::Sensor { .. } => "sensor",
            Self::Distributor { .. } => "distributor",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

fn default_execrate() -> i64 {
    1
}

fn one() -> ValueDef {
    ValueDef::Number(1.0)
}

fn default_gain() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}
