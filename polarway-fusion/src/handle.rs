//! Opaque handles naming native-side allocations

use std::fmt;

/// Opaque identifier of one native object.
///
/// The host never dereferences a handle; it only forwards it to native calls.
/// Handles are allocated from a monotonic counter and never reused, so a stale
/// handle can only ever name nothing.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw integer value, as it crosses the boundary
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
