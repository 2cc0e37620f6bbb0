//! Channels: ordered component lists under one gate and one rate divider.

use std::fmt;

use fc_props::PropertyManager;

use crate::component::{FcsComponent, FrameContext};
use crate::condition::Condition;
use crate::engine::Step;
use crate::log::LogConfig;
use crate::value::PropertyRef;

/// Enable gate of a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelGate {
    /// Non-zero property value enables the channel.
    Property(PropertyRef),
    Condition(Condition),
}

impl ChannelGate {
    pub fn is_open(&self, props: &PropertyManager) -> bool {
        match self {
            Self::Property(p) => p.value(props) != 0.0,
            Self::Condition(c) => c.evaluate(props),
        }
    }
}

impl fmt::Display for ChannelGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(p) => write!(f, "{p}"),
            Self::Condition(c) => write!(f, "{c}"),
        }
    }
}

/// Decimation counter: due on the first call and every `rate`th call after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDivider {
    rate: u32,
    since_last_run: u32,
}

impl RateDivider {
    /// Rates below 1 are clamped to 1.
    pub fn new(rate: i64) -> Self {
        let rate = rate.clamp(1, i64::from(u32::MAX)) as u32;
        Self {
            rate,
            since_last_run: rate,
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Advance one frame; true when this frame is a rate boundary.
    pub fn tick(&mut self) -> bool {
        let due = self.since_last_run >= self.rate;
        if due {
            self.since_last_run = 0;
        }
        self.since_last_run += 1;
        due
    }

    /// Make the next tick due.
    pub fn rearm(&mut self) {
        self.since_last_run = self.rate;
    }
}

pub struct Channel {
    name: String,
    divider: RateDivider,
    gate: Option<ChannelGate>,
    components: Vec<Box<dyn FcsComponent>>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("rate", &self.divider.rate())
            .field("gate", &self.gate)
            .field("components", &self.components.len())
            .finish()
    }
}

impl Channel {
    pub fn new(name: impl Into<String>, rate: i64) -> Self {
        Self {
            name: name.into(),
            divider: RateDivider::new(rate),
            gate: None,
            components: Vec::new(),
        }
    }

    pub fn with_gate(mut self, gate: ChannelGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push(&mut self, component: Box<dyn FcsComponent>) {
        self.components.push(component);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rate(&self) -> u32 {
        self.divider.rate()
    }

    pub fn gate(&self) -> Option<&ChannelGate> {
        self.gate.as_ref()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn FcsComponent> {
        self.components.iter().map(|c| &**c)
    }

    /// Component at `index`; out of range is logged and yields `None`.
    pub fn component(&self, index: usize) -> Option<&dyn FcsComponent> {
        let found = self.components.get(index).map(|c| &**c);
        if found.is_none() {
            tracing::error!(
                channel = %self.name,
                index,
                len = self.components.len(),
                "component index out of range"
            );
        }
        found
    }

    pub fn component_by_name(&self, name: &str) -> Option<&dyn FcsComponent> {
        self.components().find(|c| c.name() == name)
    }

    /// Run one frame. Returns whether the components ran.
    ///
    /// A closed gate skips the frame without advancing the divider. Steady
    /// mode and trimming run every call; otherwise only rate boundaries run.
    /// Component failures are logged and the remaining components still run.
    pub fn execute(
        &mut self,
        props: &mut PropertyManager,
        step: Step,
        trimming: bool,
        log: &LogConfig,
    ) -> bool {
        if let Some(gate) = &self.gate
            && !gate.is_open(props)
        {
            if log.run_entry() {
                tracing::trace!(channel = %self.name, "gate closed");
            }
            return false;
        }

        let run = match step {
            Step::Steady => true,
            Step::Timed(_) => {
                let due = self.divider.tick();
                due || trimming
            }
        };
        if !run {
            return false;
        }
        if log.run_entry() {
            tracing::trace!(channel = %self.name, rate = self.divider.rate(), "execute");
        }

        let mut ctx = FrameContext {
            props,
            dt: step.dt() * f64::from(self.divider.rate()),
            trimming,
            log,
        };
        for component in &mut self.components {
            if let Err(error) = component.run(&mut ctx) {
                tracing::warn!(
                    channel = %self.name,
                    component = %component.name(),
                    %error,
                    "component run failed; keeping previous output"
                );
            }
        }
        true
    }

    /// Clear every component's history and make the next execute run.
    pub fn reset(&mut self) {
        for component in &mut self.components {
            component.reset_past_states();
        }
        self.divider.rearm();
    }
}
