//! Sensor model: a measured copy of a signal with realistic degradation.
//!
//! Processing order each frame:
//! 1. first-order lag
//! 2. noise (percent of signal or absolute)
//! 3. drift accumulated over time
//! 4. gain and bias
//! 5. `fail_low` / `fail_high` malfunctions
//! 6. quantization into `2^bits` steps
//! 7. clipping and transport delay (common to every component)
//!
//! While `fail_stuck` is set the sensor does not run and its outputs keep
//! their last value.

use fc_core::PropertyId;
use fc_props::PropertyManager;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::component::{ComponentBase, FcsComponent, FrameContext, output_property_name};
use crate::error::{ControlError, ControlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseVariation {
    /// `out *= 1 + variance * r`.
    #[default]
    Percent,
    /// `out += variance * r`.
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseDistribution {
    /// `r` uniform in `[-1, 1]`.
    #[default]
    Uniform,
    /// `r` standard normal.
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorNoise {
    pub variance: f64,
    pub variation: NoiseVariation,
    pub distribution: NoiseDistribution,
    /// Seed of the sensor's private generator; a reset restarts the sequence.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantization {
    pub bits: u32,
    pub min: f64,
    pub max: f64,
    /// Property receiving the integer step count.
    pub property: Option<String>,
}

impl Quantization {
    pub fn granularity(&self) -> f64 {
        (self.max - self.min) / 2f64.powi(self.bits as i32)
    }

    /// Step index and quantized value of `v`.
    pub fn apply(&self, v: f64) -> (f64, f64) {
        let v = v.clamp(self.min, self.max);
        let g = self.granularity();
        let steps = ((v - self.min) / g).trunc();
        (steps, steps * g + self.min)
    }
}

/// Sensor configuration. Zero (or `None`) disables a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// Lag break frequency (rad/s).
    pub lag: f64,
    pub noise: Option<SensorNoise>,
    /// Drift rate (units/s).
    pub drift_rate: f64,
    pub gain: f64,
    pub bias: f64,
    pub quantization: Option<Quantization>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            lag: 0.0,
            noise: None,
            drift_rate: 0.0,
            gain: 1.0,
            bias: 0.0,
            quantization: None,
        }
    }
}

impl SensorConfig {
    /// # Errors
    ///
    /// Returns error if a coefficient is negative or non-finite, or if the
    /// quantization span is empty or `bits` is outside `1..=32`.
    pub fn validate(&self, component: &str) -> ControlResult<()> {
        let invalid = |what: &str| ControlError::InvalidConfig {
            component: component.to_string(),
            what: what.to_string(),
        };
        if !(self.lag >= 0.0) || !self.lag.is_finite() {
            return Err(invalid("lag must be non-negative"));
        }
        if let Some(noise) = &self.noise
            && (!(noise.variance >= 0.0) || !noise.variance.is_finite())
        {
            return Err(invalid("noise variance must be non-negative"));
        }
        if ![self.drift_rate, self.gain, self.bias].iter().all(|v| v.is_finite()) {
            return Err(invalid("drift rate, gain and bias must be finite"));
        }
        if let Some(q) = &self.quantization {
            if !(1..=32).contains(&q.bits) {
                return Err(invalid("quantization bits must be within 1..=32"));
            }
            if !(q.min < q.max) || !q.min.is_finite() || !q.max.is_finite() {
                return Err(invalid("quantization min must be below max"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Malfunctions {
    fail_low: PropertyId,
    fail_high: PropertyId,
    fail_stuck: PropertyId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct SensorState {
    initialized: bool,
    lag_input: f64,
    lag_output: f64,
    drift: f64,
}

#[derive(Debug, Clone)]
pub struct Sensor {
    base: ComponentBase,
    config: SensorConfig,
    flags: Malfunctions,
    quantized: Option<PropertyId>,
    rng: SmallRng,
    state: SensorState,
}

impl Sensor {
    /// Create the sensor and publish its malfunction properties.
    pub fn new(
        base: ComponentBase,
        config: SensorConfig,
        props: &mut PropertyManager,
    ) -> ControlResult<Self> {
        base.require_inputs(1, Some(1))?;
        config.validate(base.name())?;
        let root = output_property_name(base.name());
        let flags = Malfunctions {
            fail_low: props.get_or_create(&format!("{root}/malfunction/fail_low"))?,
            fail_high: props.get_or_create(&format!("{root}/malfunction/fail_high"))?,
            fail_stuck: props.get_or_create(&format!("{root}/malfunction/fail_stuck"))?,
        };
        let quantized = match config.quantization.as_ref().and_then(|q| q.property.as_deref()) {
            Some(name) => Some(props.get_or_create(&output_property_name(name))?),
            None => None,
        };
        let rng = SmallRng::seed_from_u64(config.noise.map_or(0, |n| n.seed));
        Ok(Self {
            base,
            config,
            flags,
            quantized,
            rng,
            state: SensorState::default(),
        })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn drift(&self) -> f64 {
        self.state.drift
    }

    fn lag(&mut self, input: f64, dt: f64) -> f64 {
        let c1 = self.config.lag;
        let out = if self.state.initialized && dt > 0.0 {
            let denom = 2.0 + dt * c1;
            let ca = dt * c1 / denom;
            let cb = (2.0 - dt * c1) / denom;
            ca * (input + self.state.lag_input) + self.state.lag_output * cb
        } else {
            input
        };
        self.state.lag_input = input;
        self.state.lag_output = out;
        out
    }

    fn noise(&mut self, v: f64, noise: SensorNoise) -> f64 {
        let r: f64 = match noise.distribution {
            NoiseDistribution::Uniform => self.rng.random_range(-1.0..=1.0),
            NoiseDistribution::Gaussian => self.rng.sample(StandardNormal),
        };
        match noise.variation {
            NoiseVariation::Percent => v * (1.0 + noise.variance * r),
            NoiseVariation::Absolute => v + noise.variance * r,
        }
    }
}

impl FcsComponent for Sensor {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> ControlResult<()> {
        if ctx.props.get_bool(self.flags.fail_stuck) {
            return Ok(());
        }
        if ctx.trimming {
            self.state.initialized = false;
        }
        let dt = ctx.dt;
        let mut out = self.base.input(0, ctx.props);

        if self.config.lag != 0.0 {
            out = self.lag(out, dt);
        }
        if let Some(noise) = self.config.noise.filter(|n| n.variance != 0.0) {
            out = self.noise(out, noise);
        }
        if self.config.drift_rate != 0.0 {
            self.state.drift += self.config.drift_rate * dt;
            out += self.state.drift;
        }
        out = out * self.config.gain + self.config.bias;

        // stand-ins for an infinite reading; quantization and clipping bound them
        if ctx.props.get_bool(self.flags.fail_low) {
            out = f64::MIN;
        }
        if ctx.props.get_bool(self.flags.fail_high) {
            out = f64::MAX;
        }
        let mut steps = None;
        if let Some(q) = &self.config.quantization {
            let (n, v) = q.apply(out);
            steps = Some(n);
            out = v;
        }

        self.base.publish(out, ctx)?;
        self.state.initialized = true;
        if let (Some(id), Some(n)) = (self.quantized, steps) {
            ctx.props.set(id, n)?;
        }
        Ok(())
    }

    fn reset_past_states(&mut self) {
        self.base.reset();
        self.state = SensorState::default();
        self.rng = SmallRng::seed_from_u64(self.config.noise.map_or(0, |n| n.seed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::test_support::run_once;
    use crate::component::{Clip, ComponentKind};
    use crate::value::Parameter;

    fn sensor(props: &mut PropertyManager, config: SensorConfig) -> Sensor {
        props.set_value("velocities/q-rad_sec", 0.0).unwrap();
        let input = Parameter::resolve("velocities/q-rad_sec", props).unwrap();
        let base = ComponentBase::new("Pitch Rate Sensor", ComponentKind::Sensor, props)
            .unwrap()
            .with_input(input);
        Sensor::new(base, config, props).unwrap()
    }

    fn feed(s: &mut Sensor, props: &mut PropertyManager, inputs: &[f64]) -> Vec<f64> {
        inputs
            .iter()
            .map(|v| {
                props.set_value("velocities/q-rad_sec", *v).unwrap();
                run_once(s, props, 0.1).unwrap()
            })
            .collect()
    }

    #[test]
    fn perfect_sensor_passes_input() {
        let mut props = PropertyManager::new();
        let mut s = sensor(&mut props, SensorConfig::default());
        assert_eq!(feed(&mut s, &mut props, &[0.25, -1.5]), vec![0.25, -1.5]);
    }

    #[test]
    fn gain_bias_and_drift() {
        let mut props = PropertyManager::new();
        let config = SensorConfig {
            gain: 2.0,
            bias: 0.5,
            drift_rate: 1.0,
            ..Default::default()
        };
        let mut s = sensor(&mut props, config);
        let out = feed(&mut s, &mut props, &[1.0, 1.0]);
        assert!((out[0] - 2.7).abs() < 1e-12, "{out:?}");
        assert!((out[1] - 2.9).abs() < 1e-12, "{out:?}");
        s.reset_past_states();
        assert_eq!(s.drift(), 0.0);
    }

    #[test]
    fn quantization_steps_and_count_property() {
        let mut props = PropertyManager::new();
        let config = SensorConfig {
            quantization: Some(Quantization {
                bits: 2,
                min: 0.0,
                max: 1.0,
                property: Some("q-counts".into()),
            }),
            ..Default::default()
        };
        let mut s = sensor(&mut props, config);
        assert_eq!(feed(&mut s, &mut props, &[0.6]), vec![0.5]);
        assert_eq!(props.value("fcs/q-counts"), Some(2.0));
        assert_eq!(feed(&mut s, &mut props, &[-3.0]), vec![0.0]);
    }

    #[test]
    fn failures_saturate_and_stick() {
        let mut props = PropertyManager::new();
        let mut s = sensor(&mut props, SensorConfig::default());
        let root = "fcs/pitch-rate-sensor/malfunction";
        let clip = Clip::new(Parameter::Constant(-2.0), Parameter::Constant(2.0));
        s.base = s.base.clone().with_clip(clip);

        props.set_value(&format!("{root}/fail_high"), 1.0).unwrap();
        assert_eq!(feed(&mut s, &mut props, &[0.1]), vec![2.0]);
        props.set_value(&format!("{root}/fail_high"), 0.0).unwrap();
        props.set_value(&format!("{root}/fail_low"), 1.0).unwrap();
        assert_eq!(feed(&mut s, &mut props, &[0.1]), vec![-2.0]);

        props.set_value(&format!("{root}/fail_low"), 0.0).unwrap();
        assert_eq!(feed(&mut s, &mut props, &[0.3]), vec![0.3]);
        props.set_value(&format!("{root}/fail_stuck"), 1.0).unwrap();
        assert_eq!(feed(&mut s, &mut props, &[1.0]), vec![0.3]);
        assert_eq!(props.value("fcs/pitch-rate-sensor"), Some(0.3));
    }

    #[test]
    fn lag_smooths_a_step() {
        let mut props = PropertyManager::new();
        let config = SensorConfig {
            lag: 5.0,
            ..Default::default()
        };
        let mut s = sensor(&mut props, config);
        let out = feed(&mut s, &mut props, &[0.0, 1.0, 1.0]);
        assert_eq!(out[0], 0.0);
        assert!(out[1] > 0.0 && out[1] < out[2] && out[2] < 1.0, "{out:?}");
    }

    #[test]
    fn seeded_noise_repeats_after_reset() {
        let mut props = PropertyManager::new();
        for distribution in [NoiseDistribution::Uniform, NoiseDistribution::Gaussian] {
            let config = SensorConfig {
                noise: Some(SensorNoise {
                    variance: 0.1,
                    variation: NoiseVariation::Absolute,
                    distribution,
                    seed: 42,
                }),
                ..Default::default()
            };
            let mut s = sensor(&mut props, config);
            let first = feed(&mut s, &mut props, &[1.0; 8]);
            s.reset_past_states();
            let again = feed(&mut s, &mut props, &[1.0; 8]);
            assert_eq!(first, again);
            assert!(first.iter().any(|v| *v != 1.0));
            if distribution == NoiseDistribution::Uniform {
                assert!(first.iter().all(|v| (v - 1.0).abs() <= 0.1));
            }
        }
    }

    #[test]
    fn invalid_quantization_is_rejected() {
        let config = SensorConfig {
            quantization: Some(Quantization {
                bits: 0,
                min: 0.0,
                max: 1.0,
                property: None,
            }),
            ..Default::default()
        };
        assert!(config.validate("s").is_err());
        let config = SensorConfig {
            lag: -1.0,
            ..Default::default()
        };
        assert!(config.validate("s").is_err());
    }
}
