//! Shared application service layer for the flight control engine.
//!
//! Turns control documents into runnable engines and drives scripted runs,
//! so the CLI and tests share one code path.

pub mod compile;
pub mod error;
pub mod project_service;
pub mod run_service;

pub use compile::{CompileOptions, compile_component, compile_project};
pub use error::{AppError, AppResult};
pub use project_service::{ChannelSummary, get_channel, list_channels, load_project, save_project};
pub use run_service::{RunOptions, RunRecord, RunResponse, ScriptEvent, run_frames, run_project};
