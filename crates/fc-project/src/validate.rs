//! Structural validation of control documents.
//!
//! Checks here need no property store; name resolution happens when the
//! document is compiled.

use crate::schema::{
    ChannelDef, ComponentDef, ComponentKindDef, ConditionDef, ControlProject, DelayUnitDef,
    MAX_DELAY_FRAMES, TableDef,
};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing value: {field} in {context}")]
    Missing { field: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_project(project: &ControlProject) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let mut paths = HashSet::new();
    for property in &project.properties {
        if property.path.trim().is_empty() {
            return Err(ValidationError::Missing {
                field: "path".into(),
                context: "properties".into(),
            });
        }
        if !paths.insert(property.path.trim_start_matches('/')) {
            return Err(ValidationError::DuplicateId {
                id: property.path.clone(),
                context: "properties".into(),
            });
        }
        if !property.value.is_finite() {
            return Err(invalid(&property.path, property.value, "must be finite"));
        }
    }

    let mut systems = HashSet::new();
    let mut channels = HashSet::new();
    let mut components = HashSet::new();
    for system in &project.systems {
        if system.name.trim().is_empty() {
            return Err(ValidationError::Missing {
                field: "name".into(),
                context: "systems".into(),
            });
        }
        if !systems.insert(&system.name) {
            return Err(ValidationError::DuplicateId {
                id: system.name.clone(),
                context: "systems".into(),
            });
        }
        for channel in &system.channels {
            if !channels.insert(&channel.name) {
                return Err(ValidationError::DuplicateId {
                    id: channel.name.clone(),
                    context: format!("system '{}' channels", system.name),
                });
            }
            validate_channel(channel)?;
            for component in &channel.components {
                if !components.insert(component.name.trim().to_ascii_lowercase()) {
                    return Err(ValidationError::DuplicateId {
                        id: component.name.clone(),
                        context: format!("channel '{}' components", channel.name),
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate_channel(channel: &ChannelDef) -> Result<(), ValidationError> {
    if channel.name.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "name".into(),
            context: "channels".into(),
        });
    }
    if channel.execrate > i64::from(u32::MAX) {
        return Err(invalid(
            format!("channel '{}' execrate", channel.name),
            channel.execrate,
            "too large",
        ));
    }
    if let Some(gate) = &channel.execute {
        let tokens = gate.split_whitespace().count();
        if tokens != 1 && tokens != 3 {
            return Err(invalid(
                format!("channel '{}' execute", channel.name),
                gate,
                "expected a property name or an 'a op b' test",
            ));
        }
    }
    for component in &channel.components {
        validate_component(component)?;
    }
    Ok(())
}

fn validate_component(component: &ComponentDef) -> Result<(), ValidationError> {
    let name = &component.name;
    if name.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "name".into(),
            context: "components".into(),
        });
    }

    let inputs = component.inputs.len();
    let (min_inputs, max_inputs) = match &component.kind {
        ComponentKindDef::Switch { .. } | ComponentKindDef::Distributor { .. } => (0, Some(0)),
        ComponentKindDef::Summer { .. } | ComponentKindDef::And | ComponentKindDef::Or => {
            (1, None)
        }
        _ => (1, Some(1)),
    };
    if inputs < min_inputs || max_inputs.is_some_and(|m| inputs > m) {
        return Err(invalid(
            format!("component '{name}' inputs"),
            inputs,
            "wrong number of inputs for component type",
        ));
    }

    if let Some(delay) = &component.delay {
        let whole = delay.value.fract() == 0.0;
        if !(delay.value >= 0.0) || (delay.unit == DelayUnitDef::Frames && !whole) {
            return Err(invalid(
                format!("component '{name}' delay"),
                delay.value,
                "must be non-negative (whole frames)",
            ));
        }
        if !delay.value.is_finite()
            || (delay.unit == DelayUnitDef::Frames && delay.value > f64::from(MAX_DELAY_FRAMES))
        {
            return Err(invalid(
                format!("component '{name}' delay"),
                delay.value,
                "exceeds the longest supported delay",
            ));
        }
    }

    match &component.kind {
        ComponentKindDef::ScheduledGain { table, .. } => validate_table(name, table)?,
        ComponentKindDef::AerosurfaceScale { domain, range, .. } => {
            if let Some(d) = domain
                && !(d.min < d.max)
            {
                return Err(invalid(format!("component '{name}' domain"), d.min, "min must be below max"));
            }
            if !(range.min.is_finite() && range.max.is_finite()) {
                return Err(invalid(format!("component '{name}' range"), range.min, "must be finite"));
            }
        }
        ComponentKindDef::Switch { tests, .. } => {
            for test in tests {
                if test.condition.tests.is_empty() && test.condition.conditions.is_empty() {
                    return Err(ValidationError::Missing {
                        field: "condition".into(),
                        context: format!("switch '{name}' test"),
                    });
                }
                validate_condition(name, &test.condition)?;
            }
        }
        ComponentKindDef::Kinematic { settings, .. } => {
            if settings.len() < 2 {
                return Err(invalid(
                    format!("component '{name}' settings"),
                    settings.len(),
                    "kinematic needs at least 2 settings",
                ));
            }
            if settings.windows(2).any(|w| !(w[1].position > w[0].position)) {
                return Err(invalid(
                    format!("component '{name}' settings"),
                    "positions",
                    "must be strictly increasing",
                ));
            }
            if settings.iter().any(|s| !(s.time >= 0.0)) {
                return Err(invalid(format!("component '{name}' settings"), "time", "must be non-negative"));
            }
        }
        ComponentKindDef::Actuator {
            deadband_width,
            hysteresis_width,
            ..
        } => {
            if !(*deadband_width >= 0.0) || !(*hysteresis_width >= 0.0) {
                return Err(invalid(
                    format!("component '{name}' widths"),
                    format!("{deadband_width}/{hysteresis_width}"),
                    "must be non-negative",
                ));
            }
        }
        ComponentKindDef::Distributor { cases, .. } => {
            for case in cases {
                if let Some(test) = &case.test {
                    if test.tests.is_empty() && test.conditions.is_empty() {
                        return Err(ValidationError::Missing {
                            field: "test".into(),
                            context: format!("distributor '{name}' case"),
                        });
                    }
                    validate_condition(name, test)?;
                }
                if case.assignments.iter().any(|a| a.property.trim().is_empty()) {
                    return Err(ValidationError::Missing {
                        field: "property".into(),
                        context: format!("distributor '{name}' case"),
                    });
                }
            }
        }
        ComponentKindDef::Sensor {
            lag,
            noise,
            quantization,
            ..
        } => {
            if !(*lag >= 0.0) || !lag.is_finite() {
                return Err(invalid(format!("component '{name}' lag"), lag, "must be non-negative"));
            }
            if let Some(noise) = noise
                && (!(noise.variance >= 0.0) || !noise.variance.is_finite())
            {
                return Err(invalid(
                    format!("component '{name}' noise"),
                    noise.variance,
                    "must be non-negative",
                ));
            }
            if let Some(q) = quantization {
                if !(1..=32).contains(&q.bits) {
                    return Err(invalid(format!("component '{name}' quantization"), q.bits, "bits must be within 1..=32"));
                }
                if !(q.min < q.max) {
                    return Err(invalid(format!("component '{name}' quantization"), q.min, "min must be below max"));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_table(name: &str, table: &TableDef) -> Result<(), ValidationError> {
    let field = format!("component '{name}' table");
    if table.rows.is_empty() {
        return Err(invalid(field, 0, "table needs at least one row"));
    }
    let width = match table.column {
        Some(_) => {
            if table.columns.is_empty() {
                return Err(invalid(field, 0, "2-D table needs column breakpoints"));
            }
            if table.columns.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(invalid(field, "columns", "keys must be strictly increasing"));
            }
            table.columns.len() + 1
        }
        None => 2,
    };
    if let Some(row) = table.rows.iter().find(|r| r.len() != width) {
        return Err(invalid(field, row.len(), "row length does not match the table shape"));
    }
    if table.rows.windows(2).any(|w| !(w[1][0] > w[0][0])) {
        return Err(invalid(field, "rows", "keys must be strictly increasing"));
    }
    Ok(())
}

fn validate_condition(name: &str, condition: &ConditionDef) -> Result<(), ValidationError> {
    if let Some(logic) = &condition.logic
        && !matches!(logic.trim().to_ascii_uppercase().as_str(), "AND" | "OR")
    {
        return Err(invalid(format!("switch '{name}' logic"), logic, "must be AND or OR"));
    }
    for test in &condition.tests {
        if test.split_whitespace().count() != 3 {
            return Err(invalid(format!("component '{name}' test"), test, "expected 'a op b'"));
        }
    }
    for nested in &condition.conditions {
        validate_condition(name, nested)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        AssignmentDef, CaseDef, DelayDef, DetentDef, DistributorModeDef, QuantizationDef,
        SwitchTestDef, SystemDef, SystemKindDef, ValueDef,
    };

    fn project(components: Vec<ComponentDef>) -> ControlProject {
        ControlProject {
            version: crate::LATEST_VERSION,
            name: "test".into(),
            engines: 0,
            properties: vec![],
            systems: vec![SystemDef {
                name: "fcs".into(),
                kind: SystemKindDef::FlightControl,
                channels: vec![ChannelDef {
                    name: "pitch".into(),
                    execrate: 1,
                    execute: None,
                    components,
                }],
            }],
        }
    }

    fn component(name: &str, kind: ComponentKindDef, inputs: &[&str]) -> ComponentDef {
        ComponentDef {
            name: name.into(),
            kind,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: vec![],
            clipto: None,
            delay: None,
        }
    }

    #[test]
    fn valid_project_passes() {
        let p = project(vec![component(
            "sum",
            ComponentKindDef::Summer { bias: 0.0 },
            &["fcs/a", "fcs/b"],
        )]);
        assert!(validate_project(&p).is_ok());
    }

    #[test]
    fn duplicate_component_names_fail() {
        let p = project(vec![
            component("Gain", ComponentKindDef::Summer { bias: 0.0 }, &["a"]),
            component("gain", ComponentKindDef::Summer { bias: 0.0 }, &["a"]),
        ]);
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn kinematic_needs_two_settings() {
        let kind = ComponentKindDef::Kinematic {
            settings: vec![DetentDef {
                position: 0.0,
                time: 0.0,
            }],
            noscale: false,
        };
        let p = project(vec![component("gear", kind, &["gear/cmd"])]);
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn gain_with_two_inputs_fails() {
        let kind = ComponentKindDef::PureGain {
            gain: ValueDef::Number(1.0),
        };
        let p = project(vec![component("g", kind, &["a", "b"])]);
        assert!(validate_project(&p).is_err());
    }

    #[test]
    fn bad_switch_test_fails() {
        let kind = ComponentKindDef::Switch {
            default: None,
            tests: vec![SwitchTestDef {
                value: ValueDef::Number(1.0),
                condition: ConditionDef {
                    logic: Some("XOR".into()),
                    tests: vec!["a == 1".into()],
                    conditions: vec![],
                },
            }],
        };
        let p = project(vec![component("sw", kind, &[])]);
        assert!(validate_project(&p).is_err());
    }

    #[test]
    fn delay_length_is_bounded() {
        let mut c = component("late", ComponentKindDef::Summer { bias: 0.0 }, &["a"]);
        c.delay = Some(DelayDef {
            value: f64::from(MAX_DELAY_FRAMES),
            unit: DelayUnitDef::Frames,
        });
        assert!(validate_project(&project(vec![c.clone()])).is_ok());

        c.delay = Some(DelayDef {
            value: 1e300,
            unit: DelayUnitDef::Frames,
        });
        assert!(matches!(
            validate_project(&project(vec![c.clone()])),
            Err(ValidationError::InvalidValue { .. })
        ));

        c.delay = Some(DelayDef {
            value: f64::INFINITY,
            unit: DelayUnitDef::Seconds,
        });
        assert!(validate_project(&project(vec![c])).is_err());
    }

    #[test]
    fn distributor_cases_are_checked() {
        let case = |test: Option<ConditionDef>, property: &str| CaseDef {
            test,
            assignments: vec![AssignmentDef {
                property: property.into(),
                value: ValueDef::Number(1.0),
            }],
        };
        let kind = |cases| ComponentKindDef::Distributor {
            mode: DistributorModeDef::Exclusive,
            cases,
        };
        let ok = kind(vec![
            case(
                Some(ConditionDef {
                    tests: vec!["fcs/handle ge 1".into()],
                    ..Default::default()
                }),
                "fcs/cmd",
            ),
            case(None, "fcs/light"),
        ]);
        assert!(validate_project(&project(vec![component("d", ok, &[])])).is_ok());

        let empty_test = kind(vec![case(Some(ConditionDef::default()), "fcs/cmd")]);
        assert!(matches!(
            validate_project(&project(vec![component("d", empty_test, &[])])),
            Err(ValidationError::Missing { .. })
        ));

        let with_input = kind(vec![case(None, "fcs/cmd")]);
        assert!(validate_project(&project(vec![component("d", with_input, &["a"])])).is_err());
    }

    #[test]
    fn sensor_quantization_is_checked() {
        let kind = ComponentKindDef::Sensor {
            lag: 0.0,
            noise: None,
            drift_rate: 0.0,
            gain: 1.0,
            bias: 0.0,
            quantization: Some(QuantizationDef {
                bits: 40,
                min: 0.0,
                max: 1.0,
                name: None,
            }),
        };
        assert!(matches!(
            validate_project(&project(vec![component("s", kind, &["a"])])),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let mut p = project(vec![]);
        p.version = crate::LATEST_VERSION + 1;
        assert_eq!(
            validate_project(&p),
            Err(ValidationError::UnsupportedVersion {
                version: crate::LATEST_VERSION + 1
            })
        );
    }

    #[test]
    fn gate_token_count_is_checked() {
        let mut p = project(vec![]);
        p.systems[0].channels[0].execute = Some("a gt".into());
        assert!(validate_project(&p).is_err());
        p.systems[0].channels[0].execute = Some("ap/enabled".into());
        assert!(validate_project(&p).is_ok());
    }
}
