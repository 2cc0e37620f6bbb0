//! Project loading and introspection.

use std::path::Path;

use fc_project::schema::{ChannelDef, ControlProject};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Summary of a channel for listing.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub name: String,
    pub system: String,
    pub rate: i64,
    pub gate: Option<String>,
    /// `(name, type)` in execution order.
    pub components: Vec<(String, &'static str)>,
}

/// Load, migrate and validate a project, by file extension.
pub fn load_project(path: &Path) -> AppResult<ControlProject> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }
    Ok(fc_project::load(path)?)
}

/// Save a project as YAML.
pub fn save_project(path: &Path, project: &ControlProject) -> AppResult<()> {
    Ok(fc_project::save_yaml(path, project)?)
}

/// List all channels with their system, in document order.
pub fn list_channels(project: &ControlProject) -> Vec<ChannelSummary> {
    project
        .systems
        .iter()
        .flat_map(|system| {
            system.channels.iter().map(move |channel| ChannelSummary {
                name: channel.name.clone(),
                system: system.name.clone(),
                rate: channel.execrate,
                gate: channel.execute.clone(),
                components: channel
                    .components
                    .iter()
                    .map(|c| (c.name.clone(), c.kind.type_name()))
                    .collect(),
            })
        })
        .collect()
}

/// Get a channel definition by name.
pub fn get_channel<'a>(project: &'a ControlProject, name: &str) -> AppResult<&'a ChannelDef> {
    project
        .systems
        .iter()
        .flat_map(|s| s.channels.iter())
        .find(|c| c.name == name)
        .ok_or_else(|| AppError::ChannelNotFound(name.to_string()))
}
