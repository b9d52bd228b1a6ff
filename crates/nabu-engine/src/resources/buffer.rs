use std::sync::Arc;

use crate::device::DeviceAccess;
use crate::lifecycle::{DeviceError, GpuResource};

use super::validate;

/// Creation snapshot of a GPU buffer.
#[derive(Debug, Clone)]
pub struct BufferFormat {
    pub label: Option<String>,
    /// Usages beyond `COPY_DST`, which is always added.
    pub usage: wgpu::BufferUsages,
    pub contents: Arc<[u8]>,
}

impl BufferFormat {
    pub fn new(usage: wgpu::BufferUsages, contents: impl Into<Arc<[u8]>>) -> Self {
        Self {
            label: None,
            usage,
            contents: contents.into(),
        }
    }

    /// Uniform buffer holding one `T`.
    pub fn uniform<T: bytemuck::Pod>(value: &T) -> Self {
        Self::new(wgpu::BufferUsages::UNIFORM, bytemuck::bytes_of(value))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// CPU-side state of a managed buffer.
#[derive(Debug)]
pub struct Buffer {
    label: Option<String>,
    usage: wgpu::BufferUsages,
    contents: Arc<[u8]>,
}

impl Buffer {
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Replaces the contents. A size change recreates the native buffer.
    pub fn set_contents(&mut self, contents: impl Into<Arc<[u8]>>) {
        self.contents = contents.into();
    }

    pub fn write_pod<T: bytemuck::Pod>(&mut self, value: &T) {
        self.set_contents(bytemuck::bytes_of(value));
    }

    fn create(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Buffer {
        filled_buffer(
            device,
            queue,
            self.label.as_deref(),
            self.usage | wgpu::BufferUsages::COPY_DST,
            &self.contents,
        )
    }
}

/// Creates an unmapped buffer and fills it through the queue.
///
/// `DeviceExt::create_buffer_init` maps at creation, and mapping a buffer the
/// device rejected is fatal in wgpu even inside an error scope. The queue
/// write reports through the scope like any other call.
pub(crate) fn filled_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: Option<&str>,
    usage: wgpu::BufferUsages,
    contents: &[u8],
) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size: validate::padded_len(contents.len()),
        usage,
        mapped_at_creation: false,
    });
    if !contents.is_empty() {
        queue.write_buffer(&buffer, 0, &validate::padded(contents));
    }
    buffer
}

impl<C: DeviceAccess> GpuResource<C> for Buffer {
    type Format = BufferFormat;
    type Native = wgpu::Buffer;
    const KIND: &'static str = "buffer";

    fn consume(format: BufferFormat) -> Self {
        Self {
            label: format.label,
            usage: format.usage,
            contents: format.contents,
        }
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn device_init(&mut self, ctx: &mut C) -> Result<wgpu::Buffer, DeviceError> {
        validate::buffer_contents("buffer", self.contents.len(), &ctx.limits())?;
        ctx.scoped(|| Ok(self.create(ctx.device(), ctx.queue())))
    }

    fn device_update(&mut self, native: &mut wgpu::Buffer, ctx: &mut C) -> Result<(), DeviceError> {
        validate::buffer_contents("buffer", self.contents.len(), &ctx.limits())?;

        if native.size() != validate::padded_len(self.contents.len()) {
            let fresh = ctx.scoped(|| Ok(self.create(ctx.device(), ctx.queue())))?;
            std::mem::replace(native, fresh).destroy();
            return Ok(());
        }
        ctx.scoped(|| {
            ctx.queue()
                .write_buffer(native, 0, &validate::padded(&self.contents));
            Ok(())
        })
    }

    fn device_release(&mut self, native: wgpu::Buffer, ctx: &mut C) -> Result<(), DeviceError> {
        ctx.scoped(|| {
            native.destroy();
            Ok(())
        })
    }
}
