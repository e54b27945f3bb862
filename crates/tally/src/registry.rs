//! Registry of every live tracked object.
//!
//! Membership is the sole authority on liveness: an object can be queried,
//! reported, and destroyed exactly while its entry is present, and each
//! live object has exactly one entry. The registry exclusively owns every
//! entry: registering transfers teardown responsibility here, even though
//! the resource keeps being used elsewhere until it is released.
//!
//! Lock discipline: the table mutex is never held while a tracked object
//! is dropped. Destructors may call back into [`Registry::remove`] for
//! sibling objects (cascading release), and those calls must find the
//! lock free. Visitors are the one exception: they run under the lock
//! and must not call back in.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tally_types::{LeakRecord, LiveObject, ObjectId, ShutdownReport};

use crate::diagnostics::Diagnostics;
use crate::tracked::Tracked;

/// Ordered collection of exclusively-owned tracked objects, keyed by
/// identity.
///
/// Identity order is creation order (identities are allocated from a
/// monotonic counter), which is what the shutdown sweep's
/// newest-first teardown relies on.
pub struct Registry {
    objects: Mutex<BTreeMap<ObjectId, Box<dyn Tracked>>>,
    diag: Diagnostics,
    shut_down: AtomicBool,
}

impl Registry {
    /// New registry with verbosity read from the environment and the leak
    /// report going to stderr.
    pub fn new() -> Self {
        Self::with_diagnostics(Diagnostics::from_env())
    }

    /// New registry with explicit diagnostics state. Tests use this to
    /// capture the leak stream and to pin verbosity.
    pub fn with_diagnostics(diag: Diagnostics) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            diag,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Diagnostics state of this registry.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    // ── Core operations ──────────────────────────────────────

    /// Insert a newly-constructed object under exclusive ownership.
    ///
    /// The object becomes visible to all subsequent lookups, walks, and
    /// removals. Registering an identity twice is a programming error in
    /// the resource layer and panics.
    pub fn add(&self, object: Box<dyn Tracked>) {
        let id = object.id();
        if self.diag.verbose() {
            tracing::trace!(%id, type_name = object.type_name(), "tracking live object");
        }
        let mut objects = self.objects.lock();
        assert!(
            !objects.contains_key(&id),
            "object {id} is already tracked"
        );
        objects.insert(id, object);
    }

    /// Destroy the object with this identity, synchronously, before
    /// returning.
    ///
    /// Returns `false` when the identity is not tracked. Not an error: a
    /// cascading teardown elsewhere may already have destroyed the object,
    /// so a second release of the same identity must stay a harmless
    /// no-op. Logged only when verbose diagnostics are on.
    pub fn remove(&self, id: ObjectId) -> bool {
        // The entry leaves the table under the lock; the object is dropped
        // after the guard is gone, so its destructor can re-enter `remove`
        // for siblings without deadlocking.
        let removed = self.objects.lock().remove(&id);
        match removed {
            Some(object) => {
                if self.diag.verbose() {
                    tracing::trace!(%id, type_name = object.type_name(), "releasing live object");
                }
                drop(object);
                true
            }
            None => {
                if self.diag.verbose() {
                    tracing::debug!(%id, "releasing object not previously tracked");
                }
                false
            }
        }
    }

    /// Visit every live object in identity order.
    ///
    /// The visitor receives `(identity, type_name, ref_count)` as they
    /// exist at the moment of the call. It runs under the registry lock:
    /// it must not call back into this registry and must not retain the
    /// identity beyond the call.
    pub fn for_each(&self, mut visit: impl FnMut(ObjectId, &str, u32)) {
        let objects = self.objects.lock();
        for (id, object) in objects.iter() {
            visit(*id, object.type_name(), object.ref_count());
        }
    }

    /// First live object, in identity order, for which `predicate` holds.
    ///
    /// Read-only; the returned snapshot does not keep the object alive.
    pub fn find_first(&self, predicate: impl Fn(&dyn Tracked) -> bool) -> Option<LiveObject> {
        let objects = self.objects.lock();
        objects
            .values()
            .find(|object| predicate(object.as_ref()))
            .map(|object| LiveObject {
                id: object.id(),
                type_name: object.type_name().to_string(),
                ref_count: object.ref_count(),
            })
    }

    /// Snapshot of every live object, in identity order.
    pub fn snapshot(&self) -> Vec<LiveObject> {
        let objects = self.objects.lock();
        objects
            .values()
            .map(|object| LiveObject {
                id: object.id(),
                type_name: object.type_name().to_string(),
                ref_count: object.ref_count(),
            })
            .collect()
    }

    /// Number of currently-live objects.
    pub fn live_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    // ── Shutdown ─────────────────────────────────────────────

    /// Report and destroy everything still tracked.
    ///
    /// Call once at process teardown, after no further code can register
    /// or release objects; anything still present is a leak. When verbose
    /// diagnostics are on, one leak line per object is written to the
    /// diagnostic stream (in identity order) followed by a blank flush
    /// line; either way, every remaining object is destroyed newest-first.
    ///
    /// A second call returns an empty report and does nothing. No other
    /// registry operation is valid after this returns.
    pub fn shutdown(&self) -> ShutdownReport {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return ShutdownReport::default();
        }

        let leaked: Vec<LeakRecord> = {
            let objects = self.objects.lock();
            objects
                .values()
                .map(|object| LeakRecord {
                    type_name: object.type_name().to_string(),
                    ref_count: object.ref_count(),
                })
                .collect()
        };

        if !leaked.is_empty() {
            self.diag.write_leak_report(&leaked);
            tracing::warn!(leaked = leaked.len(), "live objects remained at shutdown");
        }

        self.sweep();
        ShutdownReport { leaked }
    }

    /// Destroy every remaining object, most recently created first.
    ///
    /// Earlier-created objects (device, context, ...) are the ones most
    /// likely still referenced by later ones, so tearing down from the
    /// newest end reduces the chance of destroying something that is still
    /// depended upon. This is a heuristic, not a dependency-graph
    /// solution: with no dependency information available it is the best
    /// default order, nothing stronger.
    ///
    /// The table is re-read on every iteration. Dropping one object may
    /// release siblings through `remove`, so a precomputed iteration plan
    /// would try to destroy entries that no longer exist.
    fn sweep(&self) {
        loop {
            let Some((_, object)) = self.objects.lock().pop_last() else {
                break;
            };
            // Dropped with the lock released, so cascading releases from
            // the destructor can re-acquire it.
            drop(object);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        // Same newest-first, re-read-every-iteration teardown as
        // `shutdown`, minus the leak report. Abandoned registry instances
        // (tests, mostly) tear down deterministically without process-exit
        // semantics.
        let objects = self.objects.get_mut();
        while let Some((_, object)) = objects.pop_last() {
            drop(object);
        }
    }
}
