//! Capability contract implemented by every tracked resource type.

use tally_types::ObjectId;

/// A reference-counted driver resource whose lifetime the registry tracks.
///
/// Pure data contract: the registry reads identity, type name, and the
/// externally-maintained reference count; it never mutates the count and
/// never decides what depends on what. `Send` because the registry is
/// shared across threads and an object is destroyed on whichever thread
/// removes it.
pub trait Tracked: Send {
    /// Stable identity, assigned once at construction
    /// (see [`ObjectId::next`]).
    fn id(&self) -> ObjectId;

    /// Human-readable type name, stable for logging. Not required to be
    /// globally unique.
    fn type_name(&self) -> &'static str;

    /// Number of outstanding external holders. Mutated by the object's
    /// owners, only observed here.
    fn ref_count(&self) -> u32;
}
