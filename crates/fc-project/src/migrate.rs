//! Schema migration framework.

use crate::ProjectError;
use crate::schema::ControlProject;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut project: ControlProject) -> Result<ControlProject, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(project: ControlProject) -> Result<ControlProject, ProjectError> {
    match project.version {
        0 => migrate_v0_to_v1(project),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 documents wrote negative rates for "every frame".
fn migrate_v0_to_v1(mut project: ControlProject) -> Result<ControlProject, ProjectError> {
    for channel in project.systems.iter_mut().flat_map(|s| s.channels.iter_mut()) {
        channel.execrate = channel.execrate.max(1);
    }
    project.version = 1;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChannelDef, SystemDef, SystemKindDef};

    fn project(version: u32, execrate: i64) -> ControlProject {
        ControlProject {
            version,
            name: "test".to_string(),
            engines: 0,
            properties: vec![],
            systems: vec![SystemDef {
                name: "s".into(),
                kind: SystemKindDef::System,
                channels: vec![ChannelDef {
                    name: "c".into(),
                    execrate,
                    execute: None,
                    components: vec![],
                }],
            }],
        }
    }

    #[test]
    fn migrate_latest_is_noop() {
        let p = project(LATEST_VERSION, 4);
        assert_eq!(migrate_to_latest(p.clone()).unwrap(), p);
    }

    #[test]
    fn migrate_v0_normalises_rates() {
        let migrated = migrate_to_latest(project(0, -1)).unwrap();
        assert_eq!(migrated.version, 1);
        assert_eq!(migrated.systems[0].channels[0].execrate, 1);
    }
}
