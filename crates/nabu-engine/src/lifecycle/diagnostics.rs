use std::fmt;

use super::handle::ObjectKey;
use super::resource::DeviceError;
use super::state::Stage;

/// A device operation that failed during a drain.
#[derive(Debug, Clone)]
pub struct DeviceFailure {
    /// Label of the renderer that drained the entry.
    pub renderer: String,
    pub key: ObjectKey,
    /// `GpuResource::KIND` of the object.
    pub kind: &'static str,
    pub label: Option<String>,
    pub stage: Stage,
    pub error: DeviceError,
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.renderer, self.kind, self.label.as_deref().unwrap_or("<unlabeled>"))?;
        write!(f, " ({:?}) failed in device {}: {}", self.key, self.stage, self.error)
    }
}

/// Receives device failures reported by `Renderer::process_queues`.
///
/// Hooks run on the render thread, outside the queue lock.
pub trait DiagnosticsHook: Send + Sync {
    fn report(&self, failure: &DeviceFailure);
}

/// Default hook: forwards failures to the `log` facade at error level.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogDiagnostics;

impl DiagnosticsHook for LogDiagnostics {
    fn report(&self, failure: &DeviceFailure) {
        log::error!("{failure}");
    }
}

impl<F> DiagnosticsHook for F
where
    F: Fn(&DeviceFailure) + Send + Sync,
{
    fn report(&self, failure: &DeviceFailure) {
        self(failure)
    }
}
