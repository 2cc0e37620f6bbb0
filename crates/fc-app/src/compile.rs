//! Compilation of a `ControlProject` into a runnable `FcsEngine`.
//!
//! Compilation happens in three passes so components may read outputs of
//! components declared later in the document:
//!
//! 1. declare interface properties and the engine's standard bindings;
//! 2. register every component output property, distributor target and
//!    sensor step-count property;
//! 3. resolve names and build channels, gates and components.

use std::collections::HashSet;

use fc_controls::{
    Actuator, ActuatorConfig, AerosurfaceScale, Assignment, Case, Channel, ChannelGate,
    ChannelGroup, Clip, ComponentBase, ComponentKind, Condition, ControlError, Deadband, Detent,
    Distributor, DistributorMode, Extrapolation, FcsComponent, FcsEngine, Filter, FilterKind, Gain,
    GroupKind, IntegrationScheme, Kinematic, LogConfig, Logic, LogicGate, LogicOp,
    NoiseDistribution, NoiseVariation, Parameter, Pid, PropertyRef, Quantization, Sensor,
    SensorConfig, SensorNoise, Summer, Switch, SwitchTest, Table, output_property_name,
};
use fc_project::schema::{
    CaseDef, ChannelDef, ComponentDef, ComponentKindDef, ConditionDef, ControlProject,
    DelayUnitDef, DistributorModeDef, IntegrationDef, MAX_DELAY_FRAMES, NoiseDef,
    NoiseDistributionDef, NoiseVariationDef, SystemKindDef, TableDef, ValueDef,
};
use fc_props::PropertyManager;

use crate::error::{AppError, AppResult};

/// Settings that affect how a document is turned into runtime objects.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Frame period used to convert delays given in seconds into frames.
    pub dt: f64,
    pub log: LogConfig,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dt: 1.0 / 120.0,
            log: LogConfig::default(),
        }
    }
}

/// Build the engine described by `project` against `props`.
pub fn compile_project(
    project: &ControlProject,
    props: &mut PropertyManager,
    options: CompileOptions,
) -> AppResult<FcsEngine> {
    let mut engine = FcsEngine::new(props, project.engines, options.log)?;

    for property in &project.properties {
        let id = props.set_value(&property.path, property.value)?;
        if property.read_only {
            props.set_read_only(id, true);
        }
    }

    register_outputs(project, props)?;

    for system in &project.systems {
        let mut group = ChannelGroup::new(&system.name, group_kind(system.kind));
        for channel in &system.channels {
            group.push(compile_channel(channel, props, &options)?);
        }
        engine.add_group(group);
    }

    if options.log.startup() {
        tracing::info!(
            project = %project.name,
            channels = engine.channel_count(),
            properties = props.len(),
            "flight control system compiled"
        );
    }
    Ok(engine)
}

fn group_kind(kind: SystemKindDef) -> GroupKind {
    match kind {
        SystemKindDef::System => GroupKind::System,
        SystemKindDef::Autopilot => GroupKind::Autopilot,
        SystemKindDef::FlightControl => GroupKind::FlightControl,
    }
}

/// Pass 2: every component output exists before any name is resolved.
fn register_outputs(project: &ControlProject, props: &mut PropertyManager) -> AppResult<()> {
    let mut seen = HashSet::new();
    let components = project
        .systems
        .iter()
        .flat_map(|s| s.channels.iter())
        .flat_map(|c| c.components.iter());
    for component in components {
        let own = output_property_name(&component.name);
        if !seen.insert(own.clone()) {
            return Err(ControlError::DuplicateComponent {
                name: component.name.clone(),
            }
            .into());
        }
        props.get_or_create(&own)?;
        for output in &component.outputs {
            props.get_or_create(output)?;
        }
        match &component.kind {
            ComponentKindDef::Distributor { cases, .. } => {
                for assignment in cases.iter().flat_map(|c| c.assignments.iter()) {
                    props.get_or_create(&assignment.property)?;
                }
            }
            ComponentKindDef::Sensor {
                quantization: Some(q),
                ..
            } => {
                if let Some(name) = &q.name {
                    props.get_or_create(&output_property_name(name))?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn compile_channel(
    def: &ChannelDef,
    props: &mut PropertyManager,
    options: &CompileOptions,
) -> AppResult<Channel> {
    let mut channel = Channel::new(&def.name, def.execrate);
    if let Some(gate) = &def.execute {
        channel = channel.with_gate(compile_gate(gate, props)?);
    }
    for component in &def.components {
        let built = compile_component(component, channel.rate(), props, options)?;
        if options.log.instantiation() {
            tracing::debug!(
                channel = %def.name,
                component = %component.name,
                kind = %built.kind(),
                inputs = built.base().inputs().len(),
                "component instantiated"
            );
        }
        channel.push(built);
    }
    Ok(channel)
}

/// A lone token is a property read as a truth value; three tokens are a test.
fn compile_gate(text: &str, props: &PropertyManager) -> AppResult<ChannelGate> {
    let tokens = text.split_whitespace().count();
    match tokens {
        1 => Ok(ChannelGate::Property(PropertyRef::resolve(text, props)?)),
        3 => Ok(ChannelGate::Condition(Condition::parse(text, props)?)),
        _ => Err(ControlError::MalformedCondition {
            text: text.to_string(),
            tokens,
        }
        .into()),
    }
}

fn compile_condition(def: &ConditionDef, props: &PropertyManager) -> AppResult<Condition> {
    let logic = Logic::parse(def.logic.as_deref())?;
    let mut children = def
        .tests
        .iter()
        .map(|t| Condition::parse(t, props))
        .collect::<Result<Vec<_>, _>>()?;
    for nested in &def.conditions {
        children.push(compile_condition(nested, props)?);
    }
    Ok(Condition::group(logic, children))
}

fn parameter(value: &ValueDef, props: &PropertyManager) -> AppResult<Parameter> {
    match value {
        ValueDef::Number(v) => Ok(Parameter::Constant(*v)),
        ValueDef::Property(token) => Ok(Parameter::resolve(token, props)?),
    }
}

fn property(token: &str, props: &PropertyManager) -> AppResult<PropertyRef> {
    Ok(PropertyRef::resolve(token, props)?)
}

fn component_kind(kind: &ComponentKindDef) -> ComponentKind {
    match kind {
        ComponentKindDef::PureGain { .. } => ComponentKind::PureGain,
        ComponentKindDef::ScheduledGain { .. } => ComponentKind::ScheduledGain,
        ComponentKindDef::AerosurfaceScale { .. } => ComponentKind::AerosurfaceScale,
        ComponentKindDef::Summer { .. } => ComponentKind::Summer,
        ComponentKindDef::Switch { .. } => ComponentKind::Switch,
        ComponentKindDef::LagFilter { .. } => ComponentKind::LagFilter,
        ComponentKindDef::LeadLagFilter { .. } => ComponentKind::LeadLagFilter,
        ComponentKindDef::WashoutFilter { .. } => ComponentKind::WashoutFilter,
        ComponentKindDef::SecondOrderFilter { .. } => ComponentKind::SecondOrderFilter,
        ComponentKindDef::Integrator { .. } => ComponentKind::Integrator,
        ComponentKindDef::Deadband { .. } => ComponentKind::Deadband,
        ComponentKindDef::Pid { .. } => ComponentKind::Pid,
        ComponentKindDef::Kinematic { .. } => ComponentKind::Kinematic,
        ComponentKindDef::Actuator { .. } => ComponentKind::Actuator,
        ComponentKindDef::Sensor { .. } => ComponentKind::Sensor,
        ComponentKindDef::Distributor { .. } => ComponentKind::Distributor,
        ComponentKindDef::And => ComponentKind::And,
        ComponentKindDef::Or => ComponentKind::Or,
        ComponentKindDef::Not => ComponentKind::Not,
    }
}

/// Delay length in frames of the owning channel.
fn delay_frames(def: &ComponentDef, rate: u32, dt: f64) -> AppResult<usize> {
    let Some(delay) = &def.delay else {
        return Ok(0);
    };
    let frames = match delay.unit {
        DelayUnitDef::Frames => delay.value,
        DelayUnitDef::Seconds => {
            let period = dt * f64::from(rate);
            if !(period > 0.0) {
                return Err(AppError::InvalidInput(format!(
                    "component '{}': delay in seconds needs a positive frame dt",
                    def.name
                )));
            }
            (delay.value / period).round()
        }
    };
    if !(frames >= 0.0) || !frames.is_finite() {
        return Err(AppError::InvalidInput(format!(
            "component '{}': invalid delay {}",
            def.name, delay.value
        )));
    }
    if frames > f64::from(MAX_DELAY_FRAMES) {
        return Err(AppError::InvalidInput(format!(
            "component '{}': delay of {frames} frames exceeds {MAX_DELAY_FRAMES}",
            def.name
        )));
    }
    Ok(frames as usize)
}

fn compile_base(
    def: &ComponentDef,
    rate: u32,
    props: &mut PropertyManager,
    options: &CompileOptions,
) -> AppResult<ComponentBase> {
    let mut base = ComponentBase::new(&def.name, component_kind(&def.kind), props)?;
    let inputs = def
        .inputs
        .iter()
        .map(|i| Parameter::resolve(i, props))
        .collect::<Result<Vec<_>, _>>()?;
    base = base.with_inputs(inputs);
    for output in &def.outputs {
        base = base.with_output(props.get_or_create(output)?);
    }
    if let Some(clip) = &def.clipto {
        let (min, max) = (parameter(&clip.min, props)?, parameter(&clip.max, props)?);
        base = base.with_clip(if clip.cyclic {
            Clip::cyclic(min, max)
        } else {
            Clip::new(min, max)
        });
    }
    let frames = delay_frames(def, rate, options.dt)?;
    if frames > 0 {
        base = base.with_delay(frames, 0.0);
    }
    Ok(base)
}

fn compile_table(def: &TableDef, props: &PropertyManager) -> AppResult<Table> {
    let extrapolation = if def.extrapolate {
        Extrapolation::Linear
    } else {
        Extrapolation::Clamp
    };
    let row = Parameter::resolve(&def.row, props)?;
    let keys: Vec<f64> = def.rows.iter().filter_map(|r| r.first().copied()).collect();
    let table = match &def.column {
        None => {
            let values = def.rows.iter().filter_map(|r| r.get(1).copied()).collect();
            Table::one_d(row, keys, values, extrapolation)?
        }
        Some(column) => {
            let column = Parameter::resolve(column, props)?;
            let data = def
                .rows
                .iter()
                .map(|r| r.iter().skip(1).copied().collect())
                .collect();
            Table::two_d(row, column, keys, def.columns.clone(), data, extrapolation)?
        }
    };
    Ok(table)
}

fn compile_case(def: &CaseDef, props: &PropertyManager) -> AppResult<Case> {
    let test = def
        .test
        .as_ref()
        .map(|t| compile_condition(t, props))
        .transpose()?;
    let assignments = def
        .assignments
        .iter()
        .map(|a| -> AppResult<Assignment> {
            let target = props
                .lookup(&a.property)
                .ok_or_else(|| ControlError::UnresolvedProperty {
                    name: a.property.clone(),
                })?;
            Ok(Assignment {
                target,
                value: parameter(&a.value, props)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Case { test, assignments })
}

fn sensor_noise(def: &NoiseDef) -> SensorNoise {
    SensorNoise {
        variance: def.variance,
        variation: match def.variation {
            NoiseVariationDef::Percent => NoiseVariation::Percent,
            NoiseVariationDef::Absolute => NoiseVariation::Absolute,
        },
        distribution: match def.distribution {
            NoiseDistributionDef::Uniform => NoiseDistribution::Uniform,
            NoiseDistributionDef::Gaussian => NoiseDistribution::Gaussian,
        },
        seed: def.seed,
    }
}

fn optional(value: &Option<ValueDef>, props: &PropertyManager) -> AppResult<Option<Parameter>> {
    value.as_ref().map(|v| parameter(v, props)).transpose()
}

/// Build one component from its definition.
pub fn compile_component(
    def: &ComponentDef,
    rate: u32,
    props: &mut PropertyManager,
    options: &CompileOptions,
) -> AppResult<Box<dyn FcsComponent>> {
    let base = compile_base(def, rate, props, options)?;

    let component: Box<dyn FcsComponent> = match &def.kind {
        ComponentKindDef::PureGain { gain } => {
            Box::new(Gain::pure(base, parameter(gain, props)?)?)
        }
        ComponentKindDef::ScheduledGain { gain, table } => Box::new(Gain::scheduled(
            base,
            parameter(gain, props)?,
            compile_table(table, props)?,
        )?),
        ComponentKindDef::AerosurfaceScale {
            gain,
            domain,
            range,
            zero_centered,
        } => {
            let scale = AerosurfaceScale {
                domain: domain.as_ref().map_or((-1.0, 1.0), |d| (d.min, d.max)),
                range: (range.min, range.max),
                zero_centered: *zero_centered,
            };
            Box::new(Gain::aerosurface_scale(base, parameter(gain, props)?, scale)?)
        }
        ComponentKindDef::Summer { bias } => Box::new(Summer::new(base, *bias)?),
        ComponentKindDef::Switch { default, tests } => {
            let tests = tests
                .iter()
                .map(|t| -> AppResult<SwitchTest> {
                    Ok(SwitchTest {
                        condition: compile_condition(&t.condition, props)?,
                        value: parameter(&t.value, props)?,
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;
            Box::new(Switch::new(base, tests, optional(default, props)?))
        }
        ComponentKindDef::LagFilter { c1 } | ComponentKindDef::WashoutFilter { c1 } => {
            let kind = match def.kind {
                ComponentKindDef::LagFilter { .. } => FilterKind::Lag,
                _ => FilterKind::Washout,
            };
            Box::new(Filter::new(base, kind, vec![parameter(c1, props)?])?)
        }
        ComponentKindDef::LeadLagFilter { c1, c2, c3, c4 } => {
            let c = [c1, c2, c3, c4]
                .into_iter()
                .map(|c| parameter(c, props))
                .collect::<AppResult<Vec<_>>>()?;
            Box::new(Filter::new(base, FilterKind::LeadLag, c)?)
        }
        ComponentKindDef::SecondOrderFilter {
            c1,
            c2,
            c3,
            c4,
            c5,
            c6,
        } => {
            let c = [c1, c2, c3, c4, c5, c6]
                .into_iter()
                .map(|c| parameter(c, props))
                .collect::<AppResult<Vec<_>>>()?;
            Box::new(Filter::new(base, FilterKind::SecondOrder, c)?)
        }
        ComponentKindDef::Integrator {
            c1,
            trigger,
            initial,
        } => {
            let mut filter = Filter::new(base, FilterKind::Integrator, vec![parameter(c1, props)?])?
                .with_initial(*initial);
            if let Some(trigger) = trigger {
                filter = filter.with_trigger(property(trigger, props)?);
            }
            Box::new(filter)
        }
        ComponentKindDef::Deadband { width, gain } => {
            Box::new(Deadband::new(base, parameter(width, props)?, *gain)?)
        }
        ComponentKindDef::Pid {
            kp,
            ki,
            kd,
            standard,
            integration,
            pvdot,
            trigger,
            initial_integral,
            integral_limit,
        } => {
            let scheme = match integration {
                IntegrationDef::None => IntegrationScheme::None,
                IntegrationDef::Rect => IntegrationScheme::Rect,
                IntegrationDef::Trap => IntegrationScheme::Trap,
                IntegrationDef::Ab2 => IntegrationScheme::Ab2,
                IntegrationDef::Ab3 => IntegrationScheme::Ab3,
            };
            let mut pid = Pid::new(
                base,
                parameter(kp, props)?,
                parameter(ki, props)?,
                parameter(kd, props)?,
            )?
            .standard_form(*standard)
            .with_scheme(scheme)
            .with_initial_integral(*initial_integral);
            if let Some(pvdot) = pvdot {
                pid = pid.with_pvdot(property(pvdot, props)?);
            }
            if let Some(trigger) = trigger {
                pid = pid.with_trigger(property(trigger, props)?);
            }
            if let Some(limit) = integral_limit {
                pid = pid.with_integral_limit(*limit)?;
            }
            Box::new(pid)
        }
        ComponentKindDef::Kinematic { settings, noscale } => {
            let detents = settings
                .iter()
                .map(|s| Detent {
                    position: s.position,
                    time: s.time,
                })
                .collect();
            Box::new(Kinematic::new(base, detents, !noscale)?)
        }
        ComponentKindDef::Actuator {
            lag,
            rate_limit,
            rate_limit_incr,
            rate_limit_decr,
            deadband_width,
            hysteresis_width,
            bias,
        } => {
            // per-direction limits override the symmetric one
            let incr = rate_limit_incr.clone().or_else(|| rate_limit.clone());
            let decr = rate_limit_decr.clone().or_else(|| rate_limit.clone());
            let config = ActuatorConfig {
                lag: optional(lag, props)?,
                rate_limit_incr: optional(&incr, props)?,
                rate_limit_decr: optional(&decr, props)?,
                deadband_width: *deadband_width,
                hysteresis_width: *hysteresis_width,
                bias: *bias,
            };
            Box::new(Actuator::new(base, config, props)?)
        }
        ComponentKindDef::Sensor {
            lag,
            noise,
            drift_rate,
            gain,
            bias,
            quantization,
        } => {
            let config = SensorConfig {
                lag: *lag,
                noise: noise.as_ref().map(sensor_noise),
                drift_rate: *drift_rate,
                gain: *gain,
                bias: *bias,
                quantization: quantization.as_ref().map(|q| Quantization {
                    bits: q.bits,
                    min: q.min,
                    max: q.max,
                    property: q.name.clone(),
                }),
            };
            Box::new(Sensor::new(base, config, props)?)
        }
        ComponentKindDef::Distributor { mode, cases } => {
            let mode = match mode {
                DistributorModeDef::Inclusive => DistributorMode::Inclusive,
                DistributorModeDef::Exclusive => DistributorMode::Exclusive,
            };
            let cases = cases
                .iter()
                .map(|c| compile_case(c, props))
                .collect::<AppResult<Vec<_>>>()?;
            Box::new(Distributor::new(base, mode, cases)?)
        }
        ComponentKindDef::And => Box::new(LogicGate::new(base, LogicOp::And)?),
        ComponentKindDef::Or => Box::new(LogicGate::new(base, LogicOp::Or)?),
        ComponentKindDef::Not => Box::new(LogicGate::new(base, LogicOp::Not)?),
    };
    Ok(component)
}
