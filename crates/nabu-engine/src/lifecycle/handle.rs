use std::fmt;
use std::sync::{Arc, Weak};

use super::cell::ObjectCell;
use super::renderer::Shared;
use super::resource::GpuResource;
use super::state::ObjectState;

slotmap::new_key_type! {
    /// Generation-checked arena key of a managed object.
    ///
    /// A key outlives its object only as a stale value: once the slot is
    /// released, lookups with the old key fail even if the slot is reused.
    pub struct ObjectKey;
}

/// Owning reference to a managed object, returned only by the factory.
///
/// A handle is not `Clone`: exactly one owner decides when the object goes
/// away. Dropping the handle, or calling [`request_release`](Self::request_release),
/// queues the object for release; there is no other path to destruction.
///
/// The handle itself never keeps the object alive. The renderer's arena owns
/// it, so the CPU-side state and native value are dropped on the render thread.
pub struct Handle<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    key: ObjectKey,
    cell: Weak<ObjectCell<R, C>>,
}

impl<R, C> Handle<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    pub(crate) fn new(key: ObjectKey, cell: Weak<ObjectCell<R, C>>) -> Self {
        Self { key, cell }
    }

    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Reads the CPU-side state. Returns `None` once the object is gone.
    pub fn read<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        let cell = self.cell.upgrade()?;
        let cpu = cell.cpu();
        Some(f(&*cpu))
    }

    /// Mutates the CPU-side state without queuing anything.
    ///
    /// The render thread reads this state during `device_init`/`device_update`,
    /// so keep the closure short.
    pub fn write<T>(&self, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        let cell = self.cell.upgrade()?;
        let mut cpu = cell.cpu();
        Some(f(&mut *cpu))
    }

    /// Mutates the CPU-side state, then requests a device update.
    pub fn update<T>(&self, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        let out = self.write(f)?;
        self.request_update();
        Some(out)
    }

    /// Queues a device update. Callable from any thread; never blocks on device work.
    pub fn request_update(&self) {
        if let Some(shared) = self.shared() {
            shared.enqueue_update(self.key);
        }
    }

    /// Queues the object for release and gives up ownership.
    pub fn request_release(self) {
        drop(self);
    }

    /// Current lifecycle state. `Released` once the object is gone.
    pub fn state(&self) -> ObjectState {
        self.shared()
            .map_or(ObjectState::Released, |shared| shared.state(self.key))
    }

    /// Returns a non-owning observer for draw code.
    pub fn view(&self) -> View<R, C> {
        View {
            key: self.key,
            cell: self.cell.clone(),
        }
    }

    fn shared(&self) -> Option<Arc<Shared<C>>> {
        self.cell.upgrade()?.renderer().upgrade()
    }
}

impl<R, C> Drop for Handle<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    fn drop(&mut self) {
        if let Some(shared) = self.shared() {
            shared.enqueue_release(self.key);
        }
    }
}

impl<R, C> fmt::Debug for Handle<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &R::KIND)
            .field("key", &self.key)
            .finish()
    }
}

/// Non-owning observer of a managed object.
///
/// Views are handed to draw callbacks. They can read the native value but can
/// neither request updates nor release the object, and they stop resolving
/// once the object has been released.
///
/// Device operations lock the CPU-side state before the native value. Do not
/// call [`read`](Self::read), or a handle's `read`/`write`, from inside
/// [`with_native`](Self::with_native): that takes the locks in the opposite
/// order and can deadlock against a concurrent drain. Use
/// [`with_state_and_native`](Self::with_state_and_native) to see both.
pub struct View<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    key: ObjectKey,
    cell: Weak<ObjectCell<R, C>>,
}

impl<R, C> View<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Runs `f` against the native value.
    ///
    /// Returns `None` if the object is not initialized yet, failed, or has been
    /// released. Draw code treats `None` as "skip this object".
    pub fn with_native<T>(&self, f: impl FnOnce(&R::Native) -> T) -> Option<T> {
        let cell = self.cell.upgrade()?;
        let native = cell.native();
        native.as_ref().map(f)
    }

    /// Reads the CPU-side state.
    pub fn read<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        let cell = self.cell.upgrade()?;
        let cpu = cell.cpu();
        Some(f(&*cpu))
    }

    /// Runs `f` against the CPU-side state and the native value together,
    /// locking them in the same order as the render thread.
    pub fn with_state_and_native<T>(&self, f: impl FnOnce(&R, &R::Native) -> T) -> Option<T> {
        let cell = self.cell.upgrade()?;
        let cpu = cell.cpu();
        let native = cell.native();
        native.as_ref().map(|native| f(&*cpu, native))
    }

    /// Returns `true` if a native value currently exists.
    pub fn is_ready(&self) -> bool {
        self.with_native(|_| ()).is_some()
    }

    /// Returns `true` once the object has been deallocated.
    pub fn is_released(&self) -> bool {
        self.cell.strong_count() == 0
    }
}

impl<R, C> Clone for View<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            cell: self.cell.clone(),
        }
    }
}

impl<R, C> fmt::Debug for View<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("kind", &R::KIND)
            .field("key", &self.key)
            .field("released", &self.is_released())
            .finish()
    }
}
