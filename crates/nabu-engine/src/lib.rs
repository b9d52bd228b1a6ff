//! Nabu engine crate.
//!
//! Cross-thread lifecycle management for GPU resources: any thread creates,
//! updates and releases objects through a [`Producer`](lifecycle::Producer);
//! the thread that owns the device drains the queued work once per frame.
//!
//! - [`lifecycle`]: state machine, queues, handles (device-agnostic)
//! - [`device`]: wgpu device/queue, with or without a window surface
//! - [`resources`]: textures, buffers, shaders, meshes, framebuffers
//! - [`render`]: render loop and dedicated render thread
//! - [`window`]: winit runtime driving a render loop on the window thread

pub mod device;
pub mod lifecycle;
pub mod logging;
pub mod render;
pub mod resources;
pub mod window;
