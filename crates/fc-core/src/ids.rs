//! Compact handles into arena-backed registries.

use core::fmt;
use core::num::NonZeroU32;

use crate::error::{FcError, FcResult};

/// Handle to a slot of an arena such as the property store's node list.
///
/// Stored as `slot + 1` so `Option<Id>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Handle for a 0-based slot. Fails once the arena outgrows `u32`.
    pub fn from_slot(slot: usize) -> FcResult<Self> {
        u32::try_from(slot)
            .ok()
            .and_then(|i| i.checked_add(1))
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(FcError::IdOverflow { slot })
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub type PropertyId = Id;
