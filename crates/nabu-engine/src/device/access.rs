use crate::lifecycle::DeviceError;

use super::scope;

/// Render-thread context that exposes a wgpu device and queue.
///
/// Resource kinds implement their device operations against any `C:
/// DeviceAccess`, so the same texture or buffer type works with a windowed
/// [`Gpu`](super::Gpu) and a headless [`GpuContext`](super::GpuContext).
pub trait DeviceAccess: 'static {
    fn device(&self) -> &wgpu::Device;

    fn queue(&self) -> &wgpu::Queue;

    /// Limits reported by the device.
    fn limits(&self) -> wgpu::Limits {
        self.device().limits()
    }

    /// Runs native calls in `f` inside out-of-memory, internal and validation
    /// error scopes, so a rejected call comes back as a [`DeviceError`] instead
    /// of reaching the uncaptured-error handler.
    fn scoped<T>(&self, f: impl FnOnce() -> Result<T, DeviceError>) -> Result<T, DeviceError>
    where
        Self: Sized,
    {
        scope::capture(self.device(), f)
    }
}
