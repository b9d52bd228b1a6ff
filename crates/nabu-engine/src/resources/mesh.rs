use std::ops::Range;
use std::sync::Arc;

use crate::device::DeviceAccess;
use crate::lifecycle::{DeviceError, GpuResource};

use super::buffer::filled_buffer;
use super::validate;

/// Creation snapshot of an indexed or non-indexed mesh.
#[derive(Debug, Clone)]
pub struct MeshFormat {
    pub label: Option<String>,
    pub vertices: Arc<[u8]>,
    pub vertex_stride: u64,
    pub indices: Option<Arc<[u32]>>,
}

impl MeshFormat {
    pub fn from_vertices<V: bytemuck::Pod>(vertices: &[V]) -> Self {
        Self {
            label: None,
            vertices: bytemuck::cast_slice::<V, u8>(vertices).into(),
            vertex_stride: size_of::<V>() as u64,
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: impl Into<Arc<[u32]>>) -> Self {
        self.indices = Some(indices.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// CPU-side state of a managed mesh (vertex array + optional index buffer).
#[derive(Debug)]
pub struct Mesh {
    label: Option<String>,
    vertices: Arc<[u8]>,
    vertex_stride: u64,
    indices: Option<Arc<[u32]>>,
}

impl Mesh {
    pub fn vertex_stride(&self) -> u64 {
        self.vertex_stride
    }

    /// Replaces the vertex data, keeping the stride.
    pub fn set_vertices<V: bytemuck::Pod>(&mut self, vertices: &[V]) {
        debug_assert_eq!(size_of::<V>() as u64, self.vertex_stride);
        self.vertices = bytemuck::cast_slice::<V, u8>(vertices).into();
    }

    pub fn set_indices(&mut self, indices: Option<Arc<[u32]>>) {
        self.indices = indices;
    }

    /// Validates the payloads and returns `(vertex_count, index_count)`.
    fn counts(&self, limits: &wgpu::Limits) -> Result<(u32, u32), DeviceError> {
        let vertex_count = validate::vertex_payload(self.vertices.len(), self.vertex_stride, limits)?;
        let index_count = match &self.indices {
            Some(indices) => {
                validate::indices(indices, vertex_count)?;
                u32::try_from(indices.len())
                    .map_err(|_| DeviceError::invalid("index count overflows u32"))?
            }
            None => 0,
        };
        Ok((vertex_count, index_count))
    }

    fn create<C: DeviceAccess>(&self, ctx: &C, vertex_count: u32, index_count: u32) -> MeshNative {
        let label = self.label.as_deref().unwrap_or("mesh");

        let vertex = filled_buffer(
            ctx.device(),
            ctx.queue(),
            Some(&format!("{label} vertices")),
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            &self.vertices,
        );

        let index = self.indices.as_ref().map(|indices| {
            filled_buffer(
                ctx.device(),
                ctx.queue(),
                Some(&format!("{label} indices")),
                wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                bytemuck::cast_slice(indices),
            )
        });

        MeshNative {
            vertex,
            index,
            vertex_count,
            index_count,
        }
    }
}

/// Native side of a [`Mesh`].
#[derive(Debug)]
pub struct MeshNative {
    pub vertex: wgpu::Buffer,
    pub index: Option<wgpu::Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl MeshNative {
    /// Binds the buffers to slot 0 and issues the draw.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        match &self.index {
            Some(index) => {
                pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.index_count, 0, instances);
            }
            None => pass.draw(0..self.vertex_count, instances),
        }
    }

    fn destroy(self) {
        self.vertex.destroy();
        if let Some(index) = self.index {
            index.destroy();
        }
    }
}

impl<C: DeviceAccess> GpuResource<C> for Mesh {
    type Format = MeshFormat;
    type Native = MeshNative;
    const KIND: &'static str = "mesh";

    fn consume(format: MeshFormat) -> Self {
        Self {
            label: format.label,
            vertices: format.vertices,
            vertex_stride: format.vertex_stride,
            indices: format.indices,
        }
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn device_init(&mut self, ctx: &mut C) -> Result<MeshNative, DeviceError> {
        let (vertex_count, index_count) = self.counts(&ctx.limits())?;
        ctx.scoped(|| Ok(self.create(&*ctx, vertex_count, index_count)))
    }

    fn device_update(&mut self, native: &mut MeshNative, ctx: &mut C) -> Result<(), DeviceError> {
        let (vertex_count, index_count) = self.counts(&ctx.limits())?;

        let same_shape = native.vertex.size() == validate::padded_len(self.vertices.len())
            && native.index.is_some() == self.indices.is_some()
            && native.index_count == index_count;

        if same_shape {
            ctx.scoped(|| {
                ctx.queue()
                    .write_buffer(&native.vertex, 0, &validate::padded(&self.vertices));
                if let (Some(buffer), Some(indices)) = (&native.index, &self.indices) {
                    ctx.queue().write_buffer(buffer, 0, bytemuck::cast_slice(indices));
                }
                Ok(())
            })?;
            native.vertex_count = vertex_count;
            return Ok(());
        }

        let fresh = ctx.scoped(|| Ok(self.create(&*ctx, vertex_count, index_count)))?;
        std::mem::replace(native, fresh).destroy();
        Ok(())
    }

    fn device_release(&mut self, native: MeshNative, ctx: &mut C) -> Result<(), DeviceError> {
        ctx.scoped(|| {
            native.destroy();
            Ok(())
        })
    }
}
