//! Render-thread loop.
//!
//! A [`RenderLoop`] owns the lifecycle [`Renderer`](crate::lifecycle::Renderer)
//! and the registered draw callbacks. Each tick drains the queues exactly once,
//! then draws. The loop is driven either by the window runtime or by a
//! dedicated [`RenderThread`].

mod clock;
mod ctx;
mod frame_loop;
mod thread;

pub use clock::{FrameClock, FrameTime};
pub use ctx::{RenderCtx, RenderTarget};
pub use frame_loop::{FrameCtx, FrameReport, LoopStats, RenderLoop, Renderable};
pub use thread::{RenderThread, RenderThreadConfig};
