use std::sync::Weak;

use parking_lot::{Mutex, MutexGuard};

use super::renderer::Shared;
use super::resource::{DeviceError, GpuResource};

/// Heap cell backing one managed object.
///
/// The renderer's arena holds the only strong reference, so the cell (and the
/// native value inside it) is dropped on the render thread when its release
/// entry is drained. Handles and views only hold `Weak` references.
///
/// Lock order is `cpu` then `native` wherever both are held.
pub(crate) struct ObjectCell<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    cpu: Mutex<R>,
    native: Mutex<Option<R::Native>>,
    renderer: Weak<Shared<C>>,
}

impl<R, C> ObjectCell<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    pub(crate) fn new(cpu: R, renderer: Weak<Shared<C>>) -> Self {
        Self {
            cpu: Mutex::new(cpu),
            native: Mutex::new(None),
            renderer,
        }
    }

    pub(crate) fn cpu(&self) -> MutexGuard<'_, R> {
        self.cpu.lock()
    }

    pub(crate) fn native(&self) -> MutexGuard<'_, Option<R::Native>> {
        self.native.lock()
    }

    pub(crate) fn renderer(&self) -> &Weak<Shared<C>> {
        &self.renderer
    }
}

/// Type-erased device-call surface of an [`ObjectCell`].
///
/// Only `Renderer::process_queues` calls these.
pub(crate) trait Managed<C>: Send + Sync {
    fn kind(&self) -> &'static str;

    fn label(&self) -> Option<String>;

    fn init(&self, ctx: &mut C) -> Result<(), DeviceError>;

    fn update(&self, ctx: &mut C) -> Result<(), DeviceError>;

    /// Returns `Ok(true)` if a native value existed and was released.
    fn release(&self, ctx: &mut C) -> Result<bool, DeviceError>;
}

impl<R, C> Managed<C> for ObjectCell<R, C>
where
    R: GpuResource<C>,
    C: 'static,
{
    fn kind(&self) -> &'static str {
        R::KIND
    }

    fn label(&self) -> Option<String> {
        self.cpu.lock().label().map(str::to_owned)
    }

    fn init(&self, ctx: &mut C) -> Result<(), DeviceError> {
        let mut cpu = self.cpu.lock();
        let mut slot = self.native.lock();
        debug_assert!(slot.is_none(), "device_init on an object that already has a native value");

        let native = cpu.device_init(ctx)?;
        *slot = Some(native);
        Ok(())
    }

    fn update(&self, ctx: &mut C) -> Result<(), DeviceError> {
        let mut cpu = self.cpu.lock();
        let mut slot = self.native.lock();
        match slot.as_mut() {
            Some(native) => cpu.device_update(native, ctx),
            None => Ok(()),
        }
    }

    fn release(&self, ctx: &mut C) -> Result<bool, DeviceError> {
        let Some(native) = self.native.lock().take() else {
            return Ok(false);
        };
        self.cpu.lock().device_release(native, ctx).map(|()| true)
    }
}
