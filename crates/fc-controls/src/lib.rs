//! Flight control system evaluation engine.
//!
//! The FCS is a small interpreted dataflow engine:
//! - **Components** are signal-processing units (gains, filters, switches, PID,
//!   kinematics, actuators, sensors, logic gates) that read inputs from the property store
//!   and publish their output back to it.
//! - **Channels** own an ordered list of components, gated by an optional enable
//!   condition and decimated by an execution-rate divider.
//! - The **engine** owns channel groups (systems, autopilot, flight control),
//!   runs them in fixed order once per frame, and carries the trim flag.
//! - **Conditions** are boolean test trees evaluated against live property values;
//!   they gate channels and drive switches and distributors.
//!
//! # Design Principles
//!
//! - **Resolve once**: every property name is resolved to a handle at load time;
//!   an unknown name is a configuration error, never a NaN at run time.
//! - **Fail soft at run time**: a component failure is logged and contained by its
//!   channel; the frame always completes.
//! - **Deterministic**: execution order, gating and decimation depend only on the
//!   configuration and the sequence of frames.

pub mod actuator;
pub mod channel;
pub mod component;
pub mod condition;
pub mod deadband;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod filter;
pub mod gain;
pub mod kinematic;
pub mod log;
pub mod logic;
pub mod pid;
pub mod sensor;
pub mod summer;
pub mod switch;
pub mod table;
pub mod value;

pub use actuator::{Actuator, ActuatorConfig};
pub use channel::{Channel, ChannelGate, RateDivider};
pub use component::{
    Clip, ComponentBase, ComponentKind, DelayLine, FcsComponent, FrameContext,
    output_property_name,
};
pub use condition::{Comparator, Condition, Logic};
pub use deadband::Deadband;
pub use distributor::{Assignment, Case, Distributor, DistributorMode};
pub use engine::{
    CHANNEL_DT, ChannelGroup, FcsEngine, FcsOutputs, GEAR_CMD, GEAR_POS, GroupKind, Step,
    SurfacePosition,
};
pub use error::{ControlError, ControlResult};
pub use filter::{Filter, FilterKind};
pub use gain::{AerosurfaceScale, Gain};
pub use kinematic::{Detent, Kinematic};
pub use log::LogConfig;
pub use logic::{LogicGate, LogicOp};
pub use pid::{IntegrationScheme, Pid, PidGains, PidState};
pub use sensor::{
    NoiseDistribution, NoiseVariation, Quantization, Sensor, SensorConfig, SensorNoise,
};
pub use summer::Summer;
pub use switch::{Switch, SwitchTest};
pub use table::{Extrapolation, Table};
pub use value::{Parameter, PropertyRef, is_number};
