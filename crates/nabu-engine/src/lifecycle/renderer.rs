use std::ops::AddAssign;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::cell::{Managed, ObjectCell};
use super::diagnostics::{DeviceFailure, DiagnosticsHook, LogDiagnostics};
use super::handle::{Handle, ObjectKey};
use super::queues::{Queues, Request};
use super::resource::{DeviceError, GpuResource};
use super::state::{ObjectState, Stage};

type Object<C> = Arc<dyn Managed<C>>;

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Name used in logs and diagnostics.
    pub label: String,

    /// Arena/queue capacity reserved up front.
    pub initial_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            label: "nabu".to_string(),
            initial_capacity: 256,
        }
    }
}

/// Counts produced by one `process_queues` call.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct DrainReport {
    /// Successful `device_init` calls.
    pub initialized: usize,
    /// Successful `device_update` calls.
    pub updated: usize,
    /// Objects deallocated (with or without a native value to release).
    pub released: usize,
    /// Device calls that reported an error.
    pub failed: usize,
    /// Updates pushed to the next drain because their init ran in this one.
    pub deferred: usize,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.initialized == 0 && self.updated == 0 && self.released == 0 && self.failed == 0
    }
}

impl AddAssign for DrainReport {
    fn add_assign(&mut self, rhs: Self) {
        self.initialized += rhs.initialized;
        self.updated += rhs.updated;
        self.released += rhs.released;
        self.failed += rhs.failed;
        self.deferred += rhs.deferred;
    }
}

/// State shared between the renderer and every producer, handle and object.
pub(crate) struct Shared<C: 'static> {
    label: String,
    queues: Mutex<Queues<Object<C>>>,
    hook: Box<dyn DiagnosticsHook>,
}

impl<C: 'static> Shared<C> {
    fn create<R>(self: &Arc<Self>, format: R::Format) -> Handle<R, C>
    where
        R: GpuResource<C>,
    {
        let cell = Arc::new(ObjectCell::<R, C>::new(R::consume(format), Arc::downgrade(self)));
        let weak = Arc::downgrade(&cell);

        let key = self.queues.lock().insert(cell);
        match key {
            Some(key) => {
                log::trace!("[{}] created {} {:?}", self.label, R::KIND, key);
                Handle::new(key, weak)
            }
            None => {
                // The cell was dropped with the rejected insert; the handle never resolves.
                log::warn!("[{}] {} created after shutdown; ignoring", self.label, R::KIND);
                Handle::new(ObjectKey::default(), weak)
            }
        }
    }

    pub(crate) fn enqueue_init(&self, key: ObjectKey) {
        let outcome = self.queues.lock().enqueue_init(key);
        self.trace_request(Stage::Init, key, outcome);
    }

    pub(crate) fn enqueue_update(&self, key: ObjectKey) {
        let outcome = self.queues.lock().enqueue_update(key);
        self.trace_request(Stage::Update, key, outcome);
    }

    pub(crate) fn enqueue_release(&self, key: ObjectKey) {
        let outcome = self.queues.lock().enqueue_release(key);
        self.trace_request(Stage::Release, key, outcome);
    }

    pub(crate) fn state(&self, key: ObjectKey) -> ObjectState {
        self.queues.lock().state(key)
    }

    fn trace_request(&self, stage: Stage, key: ObjectKey, outcome: Request) {
        match outcome {
            Request::Stale => {
                log::warn!("[{}] {stage} request for released object {key:?}", self.label);
            }
            Request::Ignored(state) => {
                log::debug!("[{}] {stage} request ignored for {key:?} in state {state}", self.label);
            }
            other => log::trace!("[{}] {stage} request for {key:?}: {other:?}", self.label),
        }
    }

    fn report(&self, key: ObjectKey, stage: Stage, object: &dyn Managed<C>, error: DeviceError) {
        let failure = DeviceFailure {
            renderer: self.label.clone(),
            key,
            kind: object.kind(),
            label: object.label(),
            stage,
            error,
        };
        self.hook.report(&failure);
    }
}

/// Owner of the init/update/release queues for one rendering context.
///
/// The renderer lives on the context-owning thread: only it can drain the
/// queues, and draining requires the context `C` itself. Other threads get a
/// [`Producer`] to create objects and request transitions.
///
/// Creating objects does not need the context, so producers may start
/// queuing work before the context exists.
pub struct Renderer<C: 'static> {
    shared: Arc<Shared<C>>,
    owner: Option<ThreadId>,
    drains: u64,
}

impl<C: 'static> Renderer<C> {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_diagnostics(config, LogDiagnostics)
    }

    /// Creates a renderer that reports device failures to `hook`.
    pub fn with_diagnostics(config: RendererConfig, hook: impl DiagnosticsHook + 'static) -> Self {
        let RendererConfig {
            label,
            initial_capacity,
        } = config;

        Self {
            shared: Arc::new(Shared {
                label,
                queues: Mutex::new(Queues::with_capacity(initial_capacity)),
                hook: Box::new(hook),
            }),
            owner: None,
            drains: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Returns a thread-safe producer facade.
    pub fn producer(&self) -> Producer<C> {
        Producer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Allocates an object from `format` and queues it for init.
    pub fn create<R: GpuResource<C>>(&self, format: R::Format) -> Handle<R, C> {
        self.shared.create(format)
    }

    pub fn enqueue_init(&self, key: ObjectKey) {
        self.shared.enqueue_init(key);
    }

    pub fn enqueue_update(&self, key: ObjectKey) {
        self.shared.enqueue_update(key);
    }

    pub fn enqueue_release(&self, key: ObjectKey) {
        self.shared.enqueue_release(key);
    }

    pub fn state(&self, key: ObjectKey) -> ObjectState {
        self.shared.state(key)
    }

    /// Number of objects not yet released.
    pub fn live_objects(&self) -> usize {
        self.shared.queues.lock().live()
    }

    /// Number of queued entries across all three stages.
    pub fn pending(&self) -> usize {
        self.shared.queues.lock().pending()
    }

    /// Number of `process_queues` calls so far.
    pub fn drains(&self) -> u64 {
        self.drains
    }

    /// Drains the init, update and release queues, in that order.
    ///
    /// The lock is held only to take the queued entries; device calls run
    /// after it is released, so producers never wait on native API latency.
    /// Entries queued while this runs are handled by the next call.
    ///
    /// Must be called on the thread that owns `ctx`. The first call binds the
    /// owner thread; debug builds assert it on every later call.
    pub fn process_queues(&mut self, ctx: &mut C) -> DrainReport {
        self.bind_owner();
        self.drains += 1;

        let batch = self.shared.queues.lock().take();
        let mut report = DrainReport {
            deferred: batch.deferred,
            ..DrainReport::default()
        };

        let mut failed_inits = Vec::new();
        for (key, object) in &batch.init {
            match object.init(ctx) {
                Ok(()) => report.initialized += 1,
                Err(error) => {
                    report.failed += 1;
                    failed_inits.push(*key);
                    self.shared.report(*key, Stage::Init, object.as_ref(), error);
                }
            }
        }

        for (key, object) in &batch.update {
            match object.update(ctx) {
                Ok(()) => report.updated += 1,
                Err(error) => {
                    report.failed += 1;
                    self.shared.report(*key, Stage::Update, object.as_ref(), error);
                }
            }
        }

        for (key, object) in &batch.release {
            if let Err(error) = object.release(ctx) {
                report.failed += 1;
                self.shared.report(*key, Stage::Release, object.as_ref(), error);
            }
            report.released += 1;
        }

        // Release entries hold the last strong reference; drop them before relocking
        // since CPU-side state may own handles whose drop enqueues more releases.
        drop(batch);

        if !failed_inits.is_empty() {
            let mut queues = self.shared.queues.lock();
            for key in failed_inits {
                queues.mark_failed(key);
            }
        }

        if !report.is_empty() {
            log::trace!("[{}] drain #{}: {report:?}", self.shared.label, self.drains);
        }

        report
    }

    /// Teardown: releases every live object and drains until nothing is left.
    ///
    /// New objects are refused afterwards and requests through surviving
    /// handles are ignored.
    pub fn shutdown(&mut self, ctx: &mut C) -> DrainReport {
        let queued = {
            let mut queues = self.shared.queues.lock();
            queues.close();
            queues.release_all()
        };
        log::debug!("[{}] shutdown: releasing {queued} live objects", self.shared.label);

        let mut total = DrainReport::default();
        while self.pending() > 0 {
            total += self.process_queues(ctx);
        }

        log::info!(
            "[{}] shut down after {} drains ({} objects released)",
            self.shared.label,
            self.drains,
            total.released
        );
        total
    }

    fn bind_owner(&mut self) {
        let current = thread::current().id();
        match self.owner {
            None => self.owner = Some(current),
            Some(owner) => debug_assert_eq!(
                owner, current,
                "process_queues called off the context-owning thread"
            ),
        }
    }
}

impl<C: 'static> Drop for Renderer<C> {
    fn drop(&mut self) {
        let orphaned = self.shared.queues.lock().close_and_take();
        if !orphaned.is_empty() {
            log::warn!(
                "[{}] dropped with {} live objects; native values dropped without device_release",
                self.shared.label,
                orphaned.len()
            );
        }
        drop(orphaned);
    }
}

/// Cloneable, thread-safe facade used by producer threads.
///
/// A producer can create objects and request transitions but never drain.
pub struct Producer<C: 'static> {
    shared: Arc<Shared<C>>,
}

impl<C: 'static> Producer<C> {
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Allocates an object from `format` and queues it for init.
    pub fn create<R: GpuResource<C>>(&self, format: R::Format) -> Handle<R, C> {
        self.shared.create(format)
    }

    pub fn enqueue_init(&self, key: ObjectKey) {
        self.shared.enqueue_init(key);
    }

    pub fn enqueue_update(&self, key: ObjectKey) {
        self.shared.enqueue_update(key);
    }

    pub fn enqueue_release(&self, key: ObjectKey) {
        self.shared.enqueue_release(key);
    }

    pub fn state(&self, key: ObjectKey) -> ObjectState {
        self.shared.state(key)
    }

    pub fn live_objects(&self) -> usize {
        self.shared.queues.lock().live()
    }

    pub fn pending(&self) -> usize {
        self.shared.queues.lock().pending()
    }

    /// Returns `true` once the renderer has shut down or been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.queues.lock().is_closed()
    }
}

impl<C: 'static> Clone for Producer<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
