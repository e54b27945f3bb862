//! Leak-scenario walkthrough for the tally registry.
//!
//! Builds a miniature accelerator runtime (platform, device, context,
//! buffers, each child holding a counted back-reference to its parent),
//! releases part of it properly, leaks the rest, and runs the shutdown
//! sweep. The leaked buffer is the newest object, so the sweep destroys it
//! first and its back-references unwind the entire chain while the sweep
//! is still running.
//!
//! Run with `TALLY_LOG=1` to see the leak report on stderr.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tally::Tracked;
use tally_types::ObjectId;

/// A counted reference to a registered object.
///
/// `release` drops one reference; the last reference out releases the
/// object from the registry, which is how teardown cascades from buffers
/// all the way up to the platform.
#[derive(Clone)]
struct Handle {
    id: ObjectId,
    refs: Arc<AtomicU32>,
}

impl Handle {
    /// Fresh identity with one reference, held by the creator.
    fn new() -> Handle {
        Handle {
            id: ObjectId::next(),
            refs: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Take an additional reference.
    fn retain(&self) -> Handle {
        self.refs.fetch_add(1, Ordering::SeqCst);
        self.clone()
    }

    /// Drop one reference; destroys the object when it was the last.
    fn release(&self) {
        if self.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            tally::release(self.id);
        }
    }

    fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::SeqCst)
    }
}

struct Platform {
    handle: Handle,
}

impl Platform {
    fn create() -> Handle {
        let handle = Handle::new();
        tally::register(Box::new(Platform {
            handle: handle.clone(),
        }));
        handle
    }
}

impl Tracked for Platform {
    fn id(&self) -> ObjectId {
        self.handle.id
    }

    fn type_name(&self) -> &'static str {
        "platform"
    }

    fn ref_count(&self) -> u32 {
        self.handle.ref_count()
    }
}

struct Device {
    handle: Handle,
    platform: Handle,
}

impl Device {
    fn create(platform: &Handle) -> Handle {
        let handle = Handle::new();
        tally::register(Box::new(Device {
            handle: handle.clone(),
            platform: platform.retain(),
        }));
        handle
    }
}

impl Tracked for Device {
    fn id(&self) -> ObjectId {
        self.handle.id
    }

    fn type_name(&self) -> &'static str {
        "device"
    }

    fn ref_count(&self) -> u32 {
        self.handle.ref_count()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.platform.release();
    }
}

struct Context {
    handle: Handle,
    device: Handle,
}

impl Context {
    fn create(device: &Handle) -> Handle {
        let handle = Handle::new();
        tally::register(Box::new(Context {
            handle: handle.clone(),
            device: device.retain(),
        }));
        handle
    }
}

impl Tracked for Context {
    fn id(&self) -> ObjectId {
        self.handle.id
    }

    fn type_name(&self) -> &'static str {
        "context"
    }

    fn ref_count(&self) -> u32 {
        self.handle.ref_count()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.device.release();
    }
}

struct Buffer {
    handle: Handle,
    context: Handle,
    size: usize,
}

impl Buffer {
    fn create(context: &Handle, size: usize) -> Handle {
        let handle = Handle::new();
        tally::register(Box::new(Buffer {
            handle: handle.clone(),
            context: context.retain(),
            size,
        }));
        handle
    }
}

impl Tracked for Buffer {
    fn id(&self) -> ObjectId {
        self.handle.id
    }

    fn type_name(&self) -> &'static str {
        "buffer"
    }

    fn ref_count(&self) -> u32 {
        self.handle.ref_count()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        tracing::debug!(size = self.size, "buffer storage reclaimed");
        self.context.release();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tally::enable_tracking();

    let platform = Platform::create();
    let device = Device::create(&platform);
    let context = Context::create(&device);
    let small = Buffer::create(&context, 4 << 10);
    let _large = Buffer::create(&context, 64 << 20);

    // The host releases everything it holds except the large buffer,
    // which it leaks outright. Each remaining object now lives only as
    // long as its children need it.
    platform.release();
    device.release();
    context.release();
    small.release();

    println!("live objects before shutdown:");
    tally::report_live_objects(|id, type_name, ref_count| {
        println!("  {id} {type_name} ({ref_count} refs)");
    });

    // The leaked buffer is the newest entry, so the sweep pops it first;
    // its destructor releases the context, the context the device, the
    // device the platform: the whole chain unwinds under the sweep.
    let report = tally::shutdown_global();
    println!("shutdown swept {} leaked object(s):", report.leaked.len());
    for leak in &report.leaked {
        println!("  {} ({} refs)", leak.type_name, leak.ref_count);
    }
}
