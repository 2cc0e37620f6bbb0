//! Property tree storage and path resolution.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use fc_core::{Id, PropertyId};

use crate::error::{PropError, PropResult};

/// External variable bound two-way to a property node.
pub type TiedCell = Rc<Cell<f64>>;

/// What happens when a write hits a write-protected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Drop the write and keep the stored value.
    #[default]
    Ignore,
    /// Report `PropError::ReadOnly`.
    Error,
}

/// Mapping applied by an alias node on top of its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AliasMap {
    /// `alias = target * k`; writes are mapped back with `target = alias / k`.
    Scale(f64),
    /// `alias = |target|`; read-only.
    Magnitude,
}

#[derive(Debug, Clone)]
enum Storage {
    Value(f64),
    Tied(TiedCell),
    Alias { target: PropertyId, map: AliasMap },
}

#[derive(Debug, Clone)]
struct Node {
    path: String,
    storage: Storage,
    writable: bool,
}

/// String-addressed store of `f64` cells.
#[derive(Debug, Default)]
pub struct PropertyManager {
    nodes: Vec<Node>,
    index: HashMap<String, PropertyId>,
    write_policy: WritePolicy,
}

/// Build the conventional indexed name `base[n]`.
pub fn indexed_name(base: &str, n: usize) -> String {
    format!("{base}[{n}]")
}

fn normalize(path: &str) -> PropResult<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let invalid = trimmed.is_empty()
        || trimmed.chars().any(char::is_whitespace)
        || trimmed.split('/').any(str::is_empty);
    if invalid {
        return Err(PropError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(trimmed)
}

impl PropertyManager {
    /// Create an empty store with the default (`Ignore`) write policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with an explicit read-only write policy.
    pub fn with_write_policy(write_policy: WritePolicy) -> Self {
        Self {
            write_policy,
            ..Self::default()
        }
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Number of nodes in the store.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all paths in creation order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.path.as_str())
    }

    /// Resolve a path without creating it.
    pub fn lookup(&self, path: &str) -> Option<PropertyId> {
        let path = normalize(path).ok()?;
        self.index.get(path).copied()
    }

    /// Check whether a node exists at `path`.
    pub fn has(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Resolve a path, creating a zero-valued writable node if it is missing.
    pub fn get_or_create(&mut self, path: &str) -> PropResult<PropertyId> {
        let path = normalize(path)?;
        if let Some(id) = self.index.get(path) {
            return Ok(*id);
        }
        let id = Id::from_slot(self.nodes.len())?;
        self.nodes.push(Node {
            path: path.to_string(),
            storage: Storage::Value(0.0),
            writable: true,
        });
        self.index.insert(path.to_string(), id);
        Ok(id)
    }

    /// Resolve a path, optionally creating it.
    ///
    /// Returns `Ok(None)` when the node is missing and `create` is false.
    pub fn get_node(&mut self, path: &str, create: bool) -> PropResult<Option<PropertyId>> {
        if create {
            self.get_or_create(path).map(Some)
        } else {
            normalize(path)?;
            Ok(self.lookup(path))
        }
    }

    /// Path of a node.
    pub fn path(&self, id: PropertyId) -> &str {
        &self.nodes[id.slot()].path
    }

    /// Current value of a node. Tied and aliased nodes read through.
    pub fn get(&self, id: PropertyId) -> f64 {
        match &self.nodes[id.slot()].storage {
            Storage::Value(v) => *v,
            Storage::Tied(cell) => cell.get(),
            Storage::Alias { target, map } => {
                let v = self.get(*target);
                match map {
                    AliasMap::Scale(k) => v * k,
                    AliasMap::Magnitude => v.abs(),
                }
            }
        }
    }

    /// Current value of a node interpreted as a boolean (non-zero is true).
    pub fn get_bool(&self, id: PropertyId) -> bool {
        self.get(id) != 0.0
    }

    /// Write a node, honouring the write-protect attribute and bindings.
    pub fn set(&mut self, id: PropertyId, value: f64) -> PropResult<()> {
        let node = &self.nodes[id.slot()];
        let read_only = !node.writable || matches!(
            node.storage,
            Storage::Alias {
                map: AliasMap::Magnitude,
                ..
            }
        );
        if read_only {
            return match self.write_policy {
                WritePolicy::Ignore => {
                    tracing::debug!(path = %node.path, value, "write to read-only property dropped");
                    Ok(())
                }
                WritePolicy::Error => Err(PropError::ReadOnly {
                    path: node.path.clone(),
                }),
            };
        }
        match &node.storage {
            Storage::Tied(cell) => {
                cell.set(value);
                Ok(())
            }
            Storage::Alias { target, map } => {
                let target = *target;
                match *map {
                    AliasMap::Scale(k) => self.set(target, value / k),
                    // filtered out by the read-only check above
                    AliasMap::Magnitude => Ok(()),
                }
            }
            Storage::Value(_) => {
                self.nodes[id.slot()].storage = Storage::Value(value);
                Ok(())
            }
        }
    }

    /// Read by path.
    pub fn value(&self, path: &str) -> Option<f64> {
        self.lookup(path).map(|id| self.get(id))
    }

    /// Write by path, creating the node if it is missing.
    pub fn set_value(&mut self, path: &str, value: f64) -> PropResult<PropertyId> {
        let id = self.get_or_create(path)?;
        self.set(id, value)?;
        Ok(id)
    }

    /// Bind a node to an external cell. The cell's current value wins.
    pub fn tie(&mut self, path: &str, cell: TiedCell) -> PropResult<PropertyId> {
        let id = self.get_or_create(path)?;
        let node = &mut self.nodes[id.slot()];
        if !matches!(node.storage, Storage::Value(_)) {
            return Err(PropError::AlreadyTied {
                path: node.path.clone(),
            });
        }
        node.storage = Storage::Tied(cell);
        Ok(id)
    }

    /// Make `path` a view of `target` through `map`.
    pub fn alias(&mut self, path: &str, target: PropertyId, map: AliasMap) -> PropResult<PropertyId> {
        if let Storage::Alias { .. } = self.nodes[target.slot()].storage {
            return Err(PropError::AlreadyTied {
                path: self.nodes[target.slot()].path.clone(),
            });
        }
        let id = self.get_or_create(path)?;
        if id == target {
            return Err(PropError::InvalidPath {
                path: path.to_string(),
            });
        }
        let node = &mut self.nodes[id.slot()];
        if !matches!(node.storage, Storage::Value(_)) {
            return Err(PropError::AlreadyTied {
                path: node.path.clone(),
            });
        }
        node.storage = Storage::Alias { target, map };
        Ok(id)
    }

    /// Release a tie or alias. The node keeps the value it last exposed.
    pub fn untie(&mut self, path: &str) -> PropResult<()> {
        let id = self.lookup(path).ok_or_else(|| PropError::NotFound {
            path: path.to_string(),
        })?;
        if matches!(self.nodes[id.slot()].storage, Storage::Value(_)) {
            return Err(PropError::NotTied {
                path: path.to_string(),
            });
        }
        let current = self.get(id);
        self.nodes[id.slot()].storage = Storage::Value(current);
        Ok(())
    }

    pub fn is_tied(&self, id: PropertyId) -> bool {
        matches!(self.nodes[id.slot()].storage, Storage::Tied(_))
    }

    pub fn is_writable(&self, id: PropertyId) -> bool {
        let node = &self.nodes[id.slot()];
        node.writable
            && !matches!(
                node.storage,
                Storage::Alias {
                    map: AliasMap::Magnitude,
                    ..
                }
            )
    }

    /// Set or clear the write-protect attribute.
    pub fn set_read_only(&mut self, id: PropertyId, read_only: bool) {
        self.nodes[id.slot()].writable = !read_only;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup() {
        let mut pm = PropertyManager::new();
        let id = pm.get_or_create("velocities/qbar").unwrap();
        assert_eq!(pm.lookup("/velocities/qbar"), Some(id));
        assert_eq!(pm.path(id), "velocities/qbar");
        assert_eq!(pm.get(id), 0.0);
        assert_eq!(pm.get_node("missing/node", false).unwrap(), None);
        assert!(pm.get_node("missing/node", true).unwrap().is_some());
    }

    #[test]
    fn invalid_paths_rejected() {
        let mut pm = PropertyManager::new();
        assert!(pm.get_or_create("").is_err());
        assert!(pm.get_or_create("a//b").is_err());
        assert!(pm.get_or_create("a b").is_err());
        assert!(pm.get_or_create("a/").is_err());
    }

    #[test]
    fn tied_property_reads_external_value() {
        let mut pm = PropertyManager::new();
        pm.set_value("aero/alpha-rad", 5.0).unwrap();
        let cell: TiedCell = Rc::new(Cell::new(0.1));
        let id = pm.tie("aero/alpha-rad", cell.clone()).unwrap();
        assert_eq!(pm.get(id), 0.1);

        cell.set(0.2);
        assert_eq!(pm.get(id), 0.2);

        pm.set(id, 0.3).unwrap();
        assert_eq!(cell.get(), 0.3);

        pm.untie("aero/alpha-rad").unwrap();
        cell.set(9.0);
        assert_eq!(pm.get(id), 0.3);
    }

    #[test]
    fn double_tie_rejected() {
        let mut pm = PropertyManager::new();
        pm.tie("a", Rc::new(Cell::new(1.0))).unwrap();
        let err = pm.tie("a", Rc::new(Cell::new(2.0))).unwrap_err();
        assert!(matches!(err, PropError::AlreadyTied { .. }));
    }

    #[test]
    fn read_only_policy() {
        let mut pm = PropertyManager::new();
        let id = pm.set_value("metrics/Sw-sqft", 174.0).unwrap();
        pm.set_read_only(id, true);
        pm.set(id, 1.0).unwrap();
        assert_eq!(pm.get(id), 174.0);

        let mut strict = PropertyManager::with_write_policy(WritePolicy::Error);
        let id = strict.set_value("metrics/Sw-sqft", 174.0).unwrap();
        strict.set_read_only(id, true);
        assert!(matches!(
            strict.set(id, 1.0),
            Err(PropError::ReadOnly { .. })
        ));
    }

    #[test]
    fn scaled_alias_is_two_way() {
        let mut pm = PropertyManager::new();
        let rad = pm.get_or_create("fcs/elevator-pos-rad").unwrap();
        let deg = pm
            .alias("fcs/elevator-pos-deg", rad, AliasMap::Scale(2.0))
            .unwrap();
        pm.set(rad, 1.5).unwrap();
        assert_eq!(pm.get(deg), 3.0);
        pm.set(deg, 1.0).unwrap();
        assert_eq!(pm.get(rad), 0.5);
    }

    #[test]
    fn magnitude_alias_is_read_only() {
        let mut pm = PropertyManager::with_write_policy(WritePolicy::Error);
        let rad = pm.set_value("fcs/rudder-pos-rad", -0.25).unwrap();
        let mag = pm
            .alias("fcs/mag-rudder-pos-rad", rad, AliasMap::Magnitude)
            .unwrap();
        assert_eq!(pm.get(mag), 0.25);
        assert!(!pm.is_writable(mag));
        assert!(pm.set(mag, 1.0).is_err());
    }

    #[test]
    fn alias_of_alias_rejected() {
        let mut pm = PropertyManager::new();
        let a = pm.get_or_create("a").unwrap();
        let b = pm.alias("b", a, AliasMap::Scale(1.0)).unwrap();
        assert!(pm.alias("c", b, AliasMap::Scale(1.0)).is_err());
    }

    #[test]
    fn indexed_names() {
        assert_eq!(indexed_name("fcs/throttle-cmd-norm", 1), "fcs/throttle-cmd-norm[1]");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn tie_always_reflects_external(values in prop::collection::vec(-1e6_f64..1e6_f64, 1..20)) {
            let mut pm = PropertyManager::new();
            let cell: TiedCell = Rc::new(Cell::new(0.0));
            let id = pm.tie("sim/tied", cell.clone()).unwrap();
            for v in values {
                cell.set(v);
                prop_assert_eq!(pm.get(id), v);
            }
        }
    }
}
