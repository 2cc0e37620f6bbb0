//! End-to-end behaviour of channels inside an engine.

use fc_controls::{
    Channel, ChannelGate, ChannelGroup, ComponentBase, ComponentKind, Condition, Detent,
    FcsEngine, Filter, FilterKind, GroupKind, Kinematic, LogConfig, Parameter, Step, Summer,
    Switch, SwitchTest,
};
use fc_core::{Tolerances, nearly_equal};
use fc_props::PropertyManager;

const TOL: Tolerances = Tolerances {
    abs: 1e-12,
    rel: 1e-12,
};

fn new_engine(props: &mut PropertyManager) -> FcsEngine {
    FcsEngine::new(props, 1, LogConfig::silent()).unwrap()
}

/// A summer that adds 1 to its own output every time it runs.
fn counter(props: &mut PropertyManager, path: &str) -> Box<Summer> {
    props.set_value(path, 0.0).unwrap();
    let input = Parameter::resolve(path, props).unwrap();
    let base = ComponentBase::new(path, ComponentKind::Summer, props)
        .unwrap()
        .with_input(input);
    Box::new(Summer::new(base, 1.0).unwrap())
}

#[test]
fn rate_four_channel_runs_on_calls_one_and_five() {
    let mut props = PropertyManager::new();
    let mut engine = new_engine(&mut props);
    let mut group = ChannelGroup::new("systems", GroupKind::System);
    let mut ch = Channel::new("slow", 4);
    ch.push(counter(&mut props, "sys/count"));
    group.push(ch);
    engine.add_group(group);

    let mut seen = Vec::new();
    for _ in 0..5 {
        engine.run(&mut props, Step::Timed(0.01)).unwrap();
        seen.push(props.value("sys/count").unwrap());
    }
    // first call executes; calls 2-4 hold; call 5 executes again
    assert_eq!(seen, vec![1.0, 1.0, 1.0, 1.0, 2.0]);
}

#[test]
fn channel_dt_is_frame_dt_times_rate() {
    let mut props = PropertyManager::new();
    let mut engine = new_engine(&mut props);
    let mut group = ChannelGroup::new("systems", GroupKind::System);
    let mut ch = Channel::new("slow", 4);
    let input = Parameter::resolve("simulation/channel-dt", &props).unwrap();
    let base = ComponentBase::new("sys/seen-dt", ComponentKind::Summer, &mut props)
        .unwrap()
        .with_input(input);
    ch.push(Box::new(Summer::new(base, 0.0).unwrap()));
    group.push(ch);
    engine.add_group(group);

    engine.run(&mut props, Step::Timed(0.01)).unwrap();
    assert!(nearly_equal(props.value("sys/seen-dt").unwrap(), 0.04, TOL));
    engine.run(&mut props, Step::Steady).unwrap();
    assert_eq!(props.value("sys/seen-dt"), Some(0.0));
}

#[test]
fn trimming_forces_every_frame() {
    let mut props = PropertyManager::new();
    let mut engine = new_engine(&mut props);
    let mut group = ChannelGroup::new("fcs", GroupKind::FlightControl);
    let mut ch = Channel::new("slow", 3);
    ch.push(counter(&mut props, "fcs/count"));
    group.push(ch);
    engine.add_group(group);

    engine.set_trimming(true);
    for _ in 0..4 {
        engine.run(&mut props, Step::Timed(0.01)).unwrap();
    }
    assert_eq!(props.value("fcs/count"), Some(4.0));
    engine.set_trimming(false);
    assert!(!engine.is_trimming());
}

#[test]
fn gated_channel_follows_condition() {
    let mut props = PropertyManager::new();
    props.set_value("aero/qbar-psf", 50.0).unwrap();
    let mut engine = new_engine(&mut props);
    let gate = ChannelGate::Condition(Condition::parse("aero/qbar-psf gt 100", &props).unwrap());
    let mut ch = Channel::new("high-q", 1).with_gate(gate);
    ch.push(counter(&mut props, "ap/count"));
    let mut group = ChannelGroup::new("ap", GroupKind::Autopilot);
    group.push(ch);
    engine.add_group(group);

    engine.run(&mut props, Step::Timed(0.01)).unwrap();
    assert_eq!(props.value("ap/count"), Some(0.0));
    props.set_value("aero/qbar-psf", 150.0).unwrap();
    engine.run(&mut props, Step::Timed(0.01)).unwrap();
    assert_eq!(props.value("ap/count"), Some(1.0));
}

#[test]
fn reset_makes_filters_reproducible() {
    let mut props = PropertyManager::new();
    props.set_value("fcs/stick", 0.0).unwrap();
    let mut engine = new_engine(&mut props);
    let input = Parameter::resolve("fcs/stick", &props).unwrap();
    let base = ComponentBase::new("stick lag", ComponentKind::LagFilter, &mut props)
        .unwrap()
        .with_input(input);
    let lag = Filter::new(base, FilterKind::Lag, vec![Parameter::Constant(8.0)]).unwrap();
    let mut ch = Channel::new("pitch", 2);
    ch.push(Box::new(lag));
    let mut group = ChannelGroup::new("fcs", GroupKind::FlightControl);
    group.push(ch);
    engine.add_group(group);

    let inputs = [0.0, 0.5, 1.0, 1.0, -0.25, 0.75, 0.0, 0.3];
    let record = |engine: &mut FcsEngine, props: &mut PropertyManager| -> Vec<f64> {
        inputs
            .iter()
            .map(|v| {
                props.set_value("fcs/stick", *v).unwrap();
                engine.run(props, Step::Timed(0.0125)).unwrap();
                props.value("fcs/stick-lag").unwrap()
            })
            .collect()
    };
    let first = record(&mut engine, &mut props);
    engine.reset();
    let second = record(&mut engine, &mut props);
    assert_eq!(first, second);
}

#[test]
fn switch_priority_through_engine() {
    let mut props = PropertyManager::new();
    props.set_value("ap/mode", 0.0).unwrap();
    let mut engine = new_engine(&mut props);
    let tests = vec![
        SwitchTest {
            condition: Condition::parse("ap/mode == 1", &props).unwrap(),
            value: Parameter::Constant(10.0),
        },
        SwitchTest {
            condition: Condition::parse("ap/mode ge 1", &props).unwrap(),
            value: Parameter::Constant(20.0),
        },
    ];
    let base = ComponentBase::new("ap/target", ComponentKind::Switch, &mut props).unwrap();
    let mut ch = Channel::new("modes", 1);
    ch.push(Box::new(Switch::new(base, tests, Some(Parameter::Constant(-1.0)))));
    let mut group = ChannelGroup::new("ap", GroupKind::Autopilot);
    group.push(ch);
    engine.add_group(group);

    let mut at = |mode: f64| {
        props.set_value("ap/mode", mode).unwrap();
        engine.run(&mut props, Step::Timed(0.01)).unwrap();
        props.value("ap/target").unwrap()
    };
    assert_eq!(at(1.0), 10.0);
    assert_eq!(at(2.0), 20.0);
    assert_eq!(at(0.0), -1.0);
}

#[test]
fn gear_reaches_command_exactly() {
    let mut props = PropertyManager::new();
    let mut engine = new_engine(&mut props);
    let input = Parameter::resolve("gear/gear-cmd-norm", &props).unwrap();
    let out = props.lookup("gear/gear-pos-norm").unwrap();
    let base = ComponentBase::new("Gear Control", ComponentKind::Kinematic, &mut props)
        .unwrap()
        .with_input(input)
        .with_output(out);
    let detents = vec![
        Detent {
            position: 0.0,
            time: 0.0,
        },
        Detent {
            position: 1.0,
            time: 5.0,
        },
    ];
    let mut ch = Channel::new("gear", 1);
    ch.push(Box::new(Kinematic::new(base, detents, false).unwrap()));
    let mut group = ChannelGroup::new("fcs", GroupKind::FlightControl);
    group.push(ch);
    engine.add_group(group);

    // gear starts down
    engine.run(&mut props, Step::Timed(0.1)).unwrap();
    assert_eq!(engine.outputs(&props).gear, 1.0);

    props.set_value("gear/gear-cmd-norm", 0.0).unwrap();
    let mut frames = 0;
    while engine.outputs(&props).gear > 0.0 {
        engine.run(&mut props, Step::Timed(0.1)).unwrap();
        frames += 1;
        assert!(engine.outputs(&props).gear >= 0.0);
        assert!(frames <= 51, "gear never arrived");
    }
    assert_eq!(engine.outputs(&props).gear, 0.0);
}

#[test]
fn failing_component_does_not_stop_the_frame() {
    let mut props = PropertyManager::new();
    props.set_value("fcs/in", 1.0).unwrap();
    let mut engine = new_engine(&mut props);
    let input = Parameter::resolve("fcs/in", &props).unwrap();
    let base = ComponentBase::new("broken", ComponentKind::LeadLagFilter, &mut props)
        .unwrap()
        .with_input(input);
    // C3 = C4 = 0 makes the denominator vanish after the first frame
    let coefficients = [1.0, 1.0, 0.0, 0.0].map(Parameter::Constant).to_vec();
    let broken = Filter::new(base, FilterKind::LeadLag, coefficients).unwrap();

    let mut ch = Channel::new("mixed", 1);
    ch.push(Box::new(broken));
    ch.push(counter(&mut props, "fcs/after"));
    let mut group = ChannelGroup::new("fcs", GroupKind::FlightControl);
    group.push(ch);
    engine.add_group(group);

    for _ in 0..3 {
        engine.run(&mut props, Step::Timed(0.01)).unwrap();
    }
    assert_eq!(props.value("fcs/after"), Some(3.0));
    assert_eq!(engine.component("broken").unwrap().output(), 1.0);
}
