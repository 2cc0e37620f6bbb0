//! FCS engine: channel groups, per-frame orchestration and standard bindings.

use std::fmt;
use std::str::FromStr;

use fc_core::{PropertyId, deg_per_rad};
use fc_props::{AliasMap, PropertyManager, indexed_name};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::component::FcsComponent;
use crate::error::{ControlError, ControlResult};
use crate::log::LogConfig;

/// How far a frame advances time.
///
/// `Steady` is the zero-length step used while trimming or computing an
/// equilibrium: every channel runs once, regardless of its rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Timed(f64),
    Steady,
}

impl Step {
    /// `0.0` maps to [`Step::Steady`].
    pub fn from_dt(dt: f64) -> Self {
        if dt == 0.0 {
            Self::Steady
        } else {
            Self::Timed(dt)
        }
    }

    pub fn dt(self) -> f64 {
        match self {
            Self::Timed(dt) => dt,
            Self::Steady => 0.0,
        }
    }

    pub fn is_steady(self) -> bool {
        matches!(self, Self::Steady)
    }
}

/// Channel group, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    System,
    Autopilot,
    FlightControl,
}

impl GroupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Autopilot => "autopilot",
            Self::FlightControl => "flight_control",
        }
    }
}

impl FromStr for GroupKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "autopilot" => Ok(Self::Autopilot),
            "flight_control" => Ok(Self::FlightControl),
            _ => Err(ControlError::InvalidArg {
                what: "group kind must be system, autopilot or flight_control",
            }),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ChannelGroup {
    name: String,
    kind: GroupKind,
    channels: Vec<Channel>,
}

impl ChannelGroup {
    pub fn new(name: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            name: name.into(),
            kind,
            channels: Vec::new(),
        }
    }

    pub fn push(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }
}

/// One surface position in every published unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfacePosition {
    pub rad: f64,
    pub deg: f64,
    pub norm: f64,
}

/// Snapshot of the standard outputs after a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FcsOutputs {
    pub left_aileron: SurfacePosition,
    pub right_aileron: SurfacePosition,
    pub elevator: SurfacePosition,
    pub rudder: SurfacePosition,
    pub flap: SurfacePosition,
    pub speedbrake: SurfacePosition,
    pub spoiler: SurfacePosition,
    pub throttle: Vec<f64>,
    pub mixture: Vec<f64>,
    pub advance: Vec<f64>,
    pub gear: f64,
}

const SURFACES: [&str; 7] = [
    "left-aileron",
    "right-aileron",
    "elevator",
    "rudder",
    "flap",
    "speedbrake",
    "spoiler",
];

const COMMANDS: [&str; 13] = [
    "fcs/aileron-cmd-norm",
    "fcs/elevator-cmd-norm",
    "fcs/rudder-cmd-norm",
    "fcs/flap-cmd-norm",
    "fcs/speedbrake-cmd-norm",
    "fcs/spoiler-cmd-norm",
    "fcs/pitch-trim-cmd-norm",
    "fcs/roll-trim-cmd-norm",
    "fcs/yaw-trim-cmd-norm",
    "fcs/steer-cmd-norm",
    "fcs/left-brake-cmd-norm",
    "fcs/right-brake-cmd-norm",
    "fcs/center-brake-cmd-norm",
];

pub const CHANNEL_DT: &str = "simulation/channel-dt";
pub const GEAR_CMD: &str = "gear/gear-cmd-norm";
pub const GEAR_POS: &str = "gear/gear-pos-norm";

#[derive(Debug, Clone, Copy)]
struct SurfaceBinding {
    rad: PropertyId,
    deg: PropertyId,
    norm: PropertyId,
}

impl SurfaceBinding {
    fn bind(props: &mut PropertyManager, surface: &str) -> ControlResult<Self> {
        let rad = props.get_or_create(&format!("fcs/{surface}-pos-rad"))?;
        let deg = props.alias(
            &format!("fcs/{surface}-pos-deg"),
            rad,
            AliasMap::Scale(deg_per_rad()),
        )?;
        props.alias(&format!("fcs/mag-{surface}-pos-rad"), rad, AliasMap::Magnitude)?;
        let norm = props.get_or_create(&format!("fcs/{surface}-pos-norm"))?;
        Ok(Self { rad, deg, norm })
    }

    fn read(&self, props: &PropertyManager) -> SurfacePosition {
        SurfacePosition {
            rad: props.get(self.rad),
            deg: props.get(self.deg),
            norm: props.get(self.norm),
        }
    }
}

/// Command/position pair published per engine.
#[derive(Debug, Clone, Copy)]
struct EngineBinding {
    throttle: (PropertyId, PropertyId),
    mixture: (PropertyId, PropertyId),
    advance: (PropertyId, PropertyId),
}

impl EngineBinding {
    fn bind(props: &mut PropertyManager, n: usize) -> ControlResult<Self> {
        let mut pair = |what: &str| -> ControlResult<(PropertyId, PropertyId)> {
            let cmd = props.get_or_create(&indexed_name(&format!("fcs/{what}-cmd-norm"), n))?;
            let pos = props.get_or_create(&indexed_name(&format!("fcs/{what}-pos-norm"), n))?;
            Ok((cmd, pos))
        };
        Ok(Self {
            throttle: pair("throttle")?,
            mixture: pair("mixture")?,
            advance: pair("advance")?,
        })
    }

    fn pairs(&self) -> [(PropertyId, PropertyId); 3] {
        [self.throttle, self.mixture, self.advance]
    }
}

#[derive(Debug)]
struct StandardBindings {
    commands: Vec<PropertyId>,
    surfaces: Vec<SurfaceBinding>,
    engines: Vec<EngineBinding>,
    gear_cmd: PropertyId,
    gear_pos: PropertyId,
    channel_dt: PropertyId,
}

impl StandardBindings {
    fn bind(props: &mut PropertyManager, engines: usize) -> ControlResult<Self> {
        let commands = COMMANDS
            .iter()
            .map(|path| props.get_or_create(path))
            .collect::<Result<Vec<_>, _>>()?;
        let surfaces = SURFACES
            .iter()
            .map(|s| SurfaceBinding::bind(props, s))
            .collect::<ControlResult<Vec<_>>>()?;
        let engines = (0..engines)
            .map(|n| EngineBinding::bind(props, n))
            .collect::<ControlResult<Vec<_>>>()?;
        Ok(Self {
            commands,
            surfaces,
            engines,
            gear_cmd: props.get_or_create(GEAR_CMD)?,
            gear_pos: props.get_or_create(GEAR_POS)?,
            channel_dt: props.get_or_create(CHANNEL_DT)?,
        })
    }
}

/// Owns every channel and runs them once per frame in group order.
#[derive(Debug)]
pub struct FcsEngine {
    groups: Vec<ChannelGroup>,
    bindings: StandardBindings,
    log: LogConfig,
    step: Step,
    trimming: bool,
    frames: u64,
}

impl FcsEngine {
    /// Create an engine with no channels and publish the standard properties.
    pub fn new(props: &mut PropertyManager, engines: usize, log: LogConfig) -> ControlResult<Self> {
        let bindings = StandardBindings::bind(props, engines)?;
        let mut engine = Self {
            groups: Vec::new(),
            bindings,
            log,
            step: Step::Steady,
            trimming: false,
            frames: 0,
        };
        engine.init_model(props)?;
        Ok(engine)
    }

    /// Add a group, keeping systems before autopilot before flight control.
    /// Groups of the same kind run in insertion order.
    pub fn add_group(&mut self, group: ChannelGroup) {
        let at = self.groups.partition_point(|g| g.kind <= group.kind);
        if self.log.startup() {
            tracing::info!(
                group = %group.name,
                kind = %group.kind,
                channels = group.channels.len(),
                "channel group loaded"
            );
        }
        self.groups.insert(at, group);
    }

    pub fn groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.groups.iter().flat_map(|g| g.channels.iter())
    }

    pub fn channel_count(&self) -> usize {
        self.groups.iter().map(|g| g.channels.len()).sum()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels().find(|c| c.name() == name)
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn FcsComponent> {
        self.channels().flat_map(|c| c.components())
    }

    pub fn component(&self, name: &str) -> Option<&dyn FcsComponent> {
        self.components().find(|c| c.name() == name)
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }

    /// Frame dt of the last step; `0.0` in steady mode.
    pub fn dt(&self) -> f64 {
        self.step.dt()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_trimming(&self) -> bool {
        self.trimming
    }

    pub fn set_trimming(&mut self, trimming: bool) {
        self.trimming = trimming;
    }

    /// Run one frame through every channel.
    ///
    /// # Errors
    ///
    /// Returns error if a timed step is not finite and positive. Component
    /// failures are contained by their channel and never returned here.
    pub fn run(&mut self, props: &mut PropertyManager, step: Step) -> ControlResult<()> {
        if let Step::Timed(dt) = step
            && !(dt.is_finite() && dt > 0.0)
        {
            return Err(ControlError::InvalidArg {
                what: "frame dt must be finite and positive (use Step::Steady for zero)",
            });
        }
        self.step = step;

        // safe-mode defaults; channels may override below
        for engine in &self.bindings.engines {
            for (cmd, pos) in engine.pairs() {
                props.set(pos, props.get(cmd))?;
            }
        }

        for group in &mut self.groups {
            for channel in &mut group.channels {
                let rate = f64::from(channel.rate());
                props.set(self.bindings.channel_dt, step.dt() * rate)?;
                channel.execute(props, step, self.trimming, &self.log);
            }
        }
        self.frames += 1;
        Ok(())
    }

    /// Reset every channel: clear component history and re-arm dividers.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            for channel in &mut group.channels {
                channel.reset();
            }
        }
    }

    /// Zero commands and positions (gear down) and reset every channel.
    pub fn init_model(&mut self, props: &mut PropertyManager) -> ControlResult<()> {
        let b = &self.bindings;
        for id in &b.commands {
            props.set(*id, 0.0)?;
        }
        for s in &b.surfaces {
            props.set(s.rad, 0.0)?;
            props.set(s.norm, 0.0)?;
        }
        for engine in &b.engines {
            for (cmd, pos) in engine.pairs() {
                props.set(cmd, 0.0)?;
                props.set(pos, 0.0)?;
            }
        }
        props.set(b.gear_cmd, 1.0)?;
        props.set(b.gear_pos, 1.0)?;
        self.reset();
        Ok(())
    }

    /// Names of every component, joined with `delimiter`.
    pub fn component_names(&self, delimiter: &str) -> String {
        self.components()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
            .join(delimiter)
    }

    /// Current outputs of every component, joined with `delimiter`.
    pub fn component_values(&self, delimiter: &str) -> String {
        self.components()
            .map(|c| format!("{:.6}", c.output()))
            .collect::<Vec<_>>()
            .join(delimiter)
    }

    /// Read the standard surface, engine and gear outputs.
    pub fn outputs(&self, props: &PropertyManager) -> FcsOutputs {
        let b = &self.bindings;
        let s: Vec<SurfacePosition> = b.surfaces.iter().map(|s| s.read(props)).collect();
        // 0 throttle, 1 mixture, 2 advance
        let positions = |which: usize| -> Vec<f64> {
            b.engines
                .iter()
                .map(|e| props.get(e.pairs()[which].1))
                .collect()
        };
        FcsOutputs {
            left_aileron: s[0],
            right_aileron: s[1],
            elevator: s[2],
            rudder: s[3],
            flap: s[4],
            speedbrake: s[5],
            spoiler: s[6],
            throttle: positions(0),
            mixture: positions(1),
            advance: positions(2),
            gear: props.get(b.gear_pos),
        }
    }
}
