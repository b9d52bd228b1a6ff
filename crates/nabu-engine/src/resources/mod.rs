//! wgpu-backed resource kinds.
//!
//! Each kind implements [`GpuResource`](crate::lifecycle::GpuResource) for any
//! context that implements [`DeviceAccess`](crate::device::DeviceAccess), so the
//! same types work on the window thread and on a headless render thread.
//!
//! Formats are validated in `device_init`/`device_update` against the limits the
//! device reports; invalid formats surface as `DeviceError`s through the
//! renderer's diagnostics hook.

mod buffer;
mod framebuffer;
mod mesh;
mod shader;
mod texture;
mod validate;

pub use buffer::{Buffer, BufferFormat};
pub use framebuffer::{Attachment, Framebuffer, FramebufferFormat, FramebufferNative};
pub use mesh::{Mesh, MeshFormat, MeshNative};
pub use shader::{Shader, ShaderFormat, ShaderNative, capabilities, compile};
pub use texture::{Texture, TextureFormat, TextureNative};
