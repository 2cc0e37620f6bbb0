//! Named property store for the flight control system.
//!
//! Every value the FCS reads or writes lives in a [`PropertyManager`] under a
//! slash-separated path such as `fcs/elevator-cmd-norm`. Paths are resolved to
//! compact [`PropertyId`] handles once, at configuration time; per-frame access
//! goes through the handle.
//!
//! A node's storage is one of:
//! - an internal `f64` cell,
//! - a **tied** cell shared with native code (`Rc<Cell<f64>>`), which always
//!   takes precedence over internal storage,
//! - an **alias** of another node (unit conversion or magnitude).
//!
//! The store is single-threaded by construction (`Rc`); every FDM instance owns
//! its own store.

pub mod error;
pub mod store;

pub use error::{PropError, PropResult};
pub use fc_core::PropertyId;
pub use store::{AliasMap, PropertyManager, TiedCell, WritePolicy, indexed_name};
