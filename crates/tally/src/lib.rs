//! Live-object tracking and leak diagnostics for accelerator driver
//! runtimes.
//!
//! Every reference-counted resource the driver constructs registers itself
//! here; its release path removes it again. Whatever is still registered
//! when the process shuts down is a leak: it is reported (when verbose
//! diagnostics are on) and then force-destroyed, most recently created
//! first, tolerating objects whose destructors release their siblings.
//!
//! The process-wide registry behind [`register`]/[`release`] is created
//! lazily on first use. Tests construct their own [`Registry`] instances
//! instead and tear them down deterministically.

use std::sync::OnceLock;

pub mod diagnostics;
pub mod ffi;
mod registry;
mod tracked;


pub use registry::Registry;
pub use tally_types::{LeakRecord, LiveObject, ObjectId, ShutdownReport};
pub use tracked::Tracked;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry, created on first use.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}

/// Called by a resource's constructor: start tracking `object`.
///
/// Ownership transfers to the registry; the caller keeps the object's
/// [`ObjectId`] and releases through it.
pub fn register(object: Box<dyn Tracked>) {
    global().add(object);
}

/// Called by a resource's destructor or explicit release path: stop
/// tracking, and destroy, the object with this identity.
///
/// Releasing an identity that is no longer tracked is not an error; a
/// cascading teardown elsewhere may already have destroyed it.
pub fn release(id: ObjectId) -> bool {
    global().remove(id)
}

/// Compatibility entry point for the caller-facing tracking toggle.
///
/// Tracking is unconditionally active, so this does nothing.
pub fn enable_tracking() {}

/// Walk every live object in identity order.
///
/// Purely informational, no ownership transfer. The visitor runs under
/// the registry lock: it must not call back into the registry and must
/// not retain the identity beyond the call.
pub fn report_live_objects(visit: impl FnMut(ObjectId, &str, u32)) {
    global().for_each(visit);
}

/// Run the process-wide registry's shutdown sweep.
///
/// Call exactly once during process teardown, after no further code can
/// register or release tracked objects. Subsequent calls return an empty
/// report.
pub fn shutdown_global() -> ShutdownReport {
    global().shutdown()
}
