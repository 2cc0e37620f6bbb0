//! Logging configuration handed to the engine and every channel.
//!
//! The verbosity bits follow the classic debug-level mask:
//!
//! | bit | meaning |
//! |-----|---------|
//! | 1   | startup echo of the loaded configuration |
//! | 2   | instantiation notices |
//! | 4   | run-entry trace per channel |
//! | 8   | runtime state of components |
//! | 16  | sanity checks (saturation, degenerate values) |

const STARTUP: u32 = 1;
const INSTANTIATION: u32 = 2;
const RUN_ENTRY: u32 = 4;
const RUNTIME_STATE: u32 = 8;
const SANITY: u32 = 16;

/// Environment variable consulted by [`LogConfig::from_env`].
pub const DEBUG_LEVEL_ENV: &str = "FC_DEBUG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    level: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: STARTUP }
    }
}

impl LogConfig {
    pub fn from_debug_level(level: u32) -> Self {
        Self { level }
    }

    /// Read the mask from `FC_DEBUG_LEVEL`; unset or unparsable means the default.
    pub fn from_env() -> Self {
        match std::env::var(DEBUG_LEVEL_ENV) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Self::from_debug_level)
                .unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn silent() -> Self {
        Self { level: 0 }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn startup(&self) -> bool {
        self.level & STARTUP != 0
    }

    pub fn instantiation(&self) -> bool {
        self.level & INSTANTIATION != 0
    }

    pub fn run_entry(&self) -> bool {
        self.level & RUN_ENTRY != 0
    }

    pub fn runtime_state(&self) -> bool {
        self.level & RUNTIME_STATE != 0
    }

    pub fn sanity(&self) -> bool {
        self.level & SANITY != 0
    }
}
