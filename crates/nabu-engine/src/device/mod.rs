//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue, with or without a window
//! - creating & configuring the window surface (swapchain)
//! - acquiring frames and providing encoders/views for draw callbacks
//! - turning native API errors into `DeviceError`s via error scopes
//!
//! Both context kinds implement [`DeviceAccess`], which is all resource device
//! operations need.

mod access;
mod context;
mod frame;
mod gpu;
mod init;
mod scope;

pub use access::DeviceAccess;
pub use context::GpuContext;
pub use frame::{GpuFrame, SurfaceErrorAction};
pub use gpu::Gpu;
pub use init::GpuInit;
