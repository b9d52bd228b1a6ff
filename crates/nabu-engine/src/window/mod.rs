//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and drives a
//! [`RenderLoop`](crate::render::RenderLoop) against the window's [`Gpu`](crate::device::Gpu).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
