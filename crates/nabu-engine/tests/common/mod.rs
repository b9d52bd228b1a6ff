#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use nabu_engine::lifecycle::{DeviceError, GpuResource, Handle, ObjectKey, Producer};
use parking_lot::Mutex;

/// One device call observed by the mock context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Init(u32),
    Update(u32),
    Release(u32),
}

/// Counters shared between the test thread and the render thread.
#[derive(Debug, Default)]
pub struct Tally {
    pub calls: Mutex<Vec<Call>>,
    pub off_thread: AtomicUsize,
    pub drops: AtomicUsize,
}

impl Tally {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn off_thread(&self) -> usize {
        self.off_thread.load(Ordering::SeqCst)
    }
}

/// Render-thread context that records device calls and the thread they ran on.
///
/// With a producer attached, device operations can issue requests of their
/// own mid-drain; objects created that way are kept in `spawned`.
pub struct MockCtx {
    owner: ThreadId,
    tally: Arc<Tally>,
    producer: Option<Producer<MockCtx>>,
    pub spawned: Vec<Handle<Tracked, MockCtx>>,
}

impl MockCtx {
    /// Binds the context to the calling thread.
    pub fn new(tally: Arc<Tally>) -> Self {
        Self {
            owner: thread::current().id(),
            tally,
            producer: None,
            spawned: Vec::new(),
        }
    }

    pub fn with_producer(mut self, producer: Producer<MockCtx>) -> Self {
        self.producer = Some(producer);
        self
    }

    fn record(&mut self, call: Call) {
        if thread::current().id() != self.owner {
            self.tally.off_thread.fetch_add(1, Ordering::SeqCst);
        }
        self.tally.calls.lock().push(call);
    }
}

#[derive(Debug, Clone)]
pub struct TrackedFormat {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub tally: Arc<Tally>,
}

impl TrackedFormat {
    pub fn new(id: u32, tally: &Arc<Tally>) -> Self {
        Self {
            id,
            width: 1,
            height: 1,
            tally: Arc::clone(tally),
        }
    }
}

/// Resource kind standing in for a texture: an extent and a counter of
/// CPU-side edits.
pub struct Tracked {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub edits: u32,
    tally: Arc<Tally>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.tally.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Native value: the extent and edit count the device last saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedNative {
    pub width: u32,
    pub height: u32,
    pub edits: u32,
}

impl GpuResource<MockCtx> for Tracked {
    type Format = TrackedFormat;
    type Native = TrackedNative;
    const KIND: &'static str = "tracked";

    fn consume(format: TrackedFormat) -> Self {
        Self {
            id: format.id,
            width: format.width,
            height: format.height,
            edits: 0,
            tally: format.tally,
        }
    }

    fn device_init(&mut self, ctx: &mut MockCtx) -> Result<TrackedNative, DeviceError> {
        ctx.record(Call::Init(self.id));
        Ok(TrackedNative {
            width: self.width,
            height: self.height,
            edits: self.edits,
        })
    }

    fn device_update(&mut self, native: &mut TrackedNative, ctx: &mut MockCtx) -> Result<(), DeviceError> {
        ctx.record(Call::Update(self.id));
        *native = TrackedNative {
            width: self.width,
            height: self.height,
            edits: self.edits,
        };
        Ok(())
    }

    fn device_release(&mut self, _native: TrackedNative, ctx: &mut MockCtx) -> Result<(), DeviceError> {
        ctx.record(Call::Release(self.id));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FaultyFormat {
    pub id: u32,
    pub fail_update: bool,
    pub fail_release: bool,
    /// During `device_init`: request an update of this object and create a
    /// `Tracked` child through the context's producer.
    pub poke: Option<ObjectKey>,
    pub tally: Arc<Tally>,
}

impl FaultyFormat {
    pub fn new(id: u32, tally: &Arc<Tally>) -> Self {
        Self {
            id,
            fail_update: false,
            fail_release: false,
            poke: None,
            tally: Arc::clone(tally),
        }
    }
}

/// Resource kind whose update and release can be made to fail. The native
/// value is the `value` seen by the last successful device call.
pub struct Faulty {
    pub id: u32,
    pub value: u32,
    pub fail_update: bool,
    fail_release: bool,
    poke: Option<ObjectKey>,
    tally: Arc<Tally>,
}

impl Drop for Faulty {
    fn drop(&mut self) {
        self.tally.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl GpuResource<MockCtx> for Faulty {
    type Format = FaultyFormat;
    type Native = u32;
    const KIND: &'static str = "faulty";

    fn consume(format: FaultyFormat) -> Self {
        Self {
            id: format.id,
            value: 0,
            fail_update: format.fail_update,
            fail_release: format.fail_release,
            poke: format.poke,
            tally: format.tally,
        }
    }

    fn device_init(&mut self, ctx: &mut MockCtx) -> Result<u32, DeviceError> {
        ctx.record(Call::Init(self.id));
        if let (Some(key), Some(producer)) = (self.poke, ctx.producer.clone()) {
            producer.enqueue_update(key);
            let child = producer.create::<Tracked>(TrackedFormat::new(self.id + 100, &ctx.tally));
            ctx.spawned.push(child);
        }
        Ok(self.value)
    }

    fn device_update(&mut self, native: &mut u32, ctx: &mut MockCtx) -> Result<(), DeviceError> {
        ctx.record(Call::Update(self.id));
        if self.fail_update {
            return Err(DeviceError::Validation("rejected write".to_string()));
        }
        *native = self.value;
        Ok(())
    }

    fn device_release(&mut self, _native: u32, ctx: &mut MockCtx) -> Result<(), DeviceError> {
        ctx.record(Call::Release(self.id));
        if self.fail_release {
            return Err(DeviceError::Lost("device removed".to_string()));
        }
        Ok(())
    }
}

pub fn is_init(call: &Call) -> bool {
    matches!(call, Call::Init(_))
}

pub fn is_update(call: &Call) -> bool {
    matches!(call, Call::Update(_))
}

pub fn is_release(call: &Call) -> bool {
    matches!(call, Call::Release(_))
}
