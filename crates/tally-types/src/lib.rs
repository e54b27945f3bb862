//! Core nomenclature shared across the tally registry.
//!
//! - `ObjectId`: stable opaque identity handle for a tracked object.
//! - `LiveObject`: point-in-time snapshot of one live object.
//! - `LeakRecord`: one object still alive when the registry shut down.
//! - `ShutdownReport`: everything the shutdown sweep found and destroyed.
//!
//! In short: objects are addressed by identity, enumerated as snapshots,
//! and whatever outlives the application shows up in the shutdown report.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use facet::Facet;

////////////////////////////////////////////////////////////////////////////////////
// Identities
////////////////////////////////////////////////////////////////////////////////////

/// Global identity counter. Identities are never reused within a process.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable opaque identity of a tracked object, independent of its concrete
/// type.
///
/// Allocated once at construction from a monotonic counter, so comparing
/// identities compares creation order. This is what the registry keys and
/// sorts on; it is a handle, never a pointer, and stays meaningful after
/// the object it named is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Facet)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate the next unused identity.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for the extension boundary.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Rebuild an identity from its raw value.
    ///
    /// Only meant for round-tripping through the extension boundary; there
    /// is no guarantee the identity names a live object.
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////
// Snapshots
////////////////////////////////////////////////////////////////////////////////////

/// Snapshot of a single live object, captured under the registry lock.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct LiveObject {
    /// Identity of the object.
    pub id: ObjectId,
    /// Human-readable type name (e.g. "device", "context", "buffer").
    pub type_name: String,
    /// External reference count at the moment of capture.
    pub ref_count: u32,
}

/// One object that was still alive when the shutdown sweep ran.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct LeakRecord {
    /// Human-readable type name of the leaked object.
    pub type_name: String,
    /// External reference count it still carried.
    pub ref_count: u32,
}

/// Outcome of the shutdown sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct ShutdownReport {
    /// Objects still live when the sweep started, in identity order.
    /// All of them have been destroyed by the time the report is returned.
    pub leaked: Vec<LeakRecord>,
}

impl ShutdownReport {
    /// True when nothing was left to destroy.
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty()
    }
}
