//! Cross-thread lifecycle management for GPU-bound objects.
//!
//! Producer threads create objects and request updates/releases; the thread
//! that owns the rendering context drains the resulting init, update and
//! release queues once per frame and is the only place device calls happen.
//!
//! - [`GpuResource`]: contract for a resource kind (format, CPU-side state,
//!   three device operations).
//! - [`Renderer`]: queue owner, drained by `process_queues` on the render thread.
//! - [`Producer`]: cloneable facade for other threads.
//! - [`Handle`] / [`View`]: owning and observing references to one object.

mod cell;
mod diagnostics;
mod handle;
mod queues;
mod renderer;
mod resource;
mod state;

pub use diagnostics::{DeviceFailure, DiagnosticsHook, LogDiagnostics};
pub use handle::{Handle, ObjectKey, View};
pub use renderer::{DrainReport, Producer, Renderer, RendererConfig};
pub use resource::{DeviceError, GpuResource};
pub use state::{ObjectState, Stage};
