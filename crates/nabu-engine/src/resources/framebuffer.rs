use crate::device::DeviceAccess;
use crate::lifecycle::{DeviceError, GpuResource};

use super::validate;

/// Creation snapshot of an offscreen render target.
#[derive(Debug, Clone)]
pub struct FramebufferFormat {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub color: wgpu::TextureFormat,
    pub depth: Option<wgpu::TextureFormat>,
    /// 1 or 4. Multisampled targets get a single-sampled resolve texture.
    pub sample_count: u32,
}

impl FramebufferFormat {
    pub fn new(width: u32, height: u32, color: wgpu::TextureFormat) -> Self {
        Self {
            label: None,
            width,
            height,
            color,
            depth: None,
            sample_count: 1,
        }
    }

    pub fn with_depth(mut self, depth: wgpu::TextureFormat) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// CPU-side state of a managed framebuffer.
#[derive(Debug)]
pub struct Framebuffer {
    format: FramebufferFormat,
}

impl Framebuffer {
    pub fn size(&self) -> (u32, u32) {
        (self.format.width, self.format.height)
    }

    /// Changes the extent; the next device update recreates the attachments.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.format.width = width;
        self.format.height = height;
    }

    fn validate(&self) -> Result<(), DeviceError> {
        let f = &self.format;
        validate::sample_count(f.sample_count)?;
        if f.color.is_depth_stencil_format() {
            return Err(DeviceError::invalid(format!(
                "color attachment has depth format {:?}",
                f.color
            )));
        }
        match f.depth {
            Some(depth) if !depth.is_depth_stencil_format() => Err(DeviceError::invalid(format!(
                "depth attachment has color format {depth:?}"
            ))),
            _ => Ok(()),
        }
    }

    fn attachment(
        &self,
        device: &wgpu::Device,
        suffix: &str,
        format: wgpu::TextureFormat,
        sample_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Attachment {
        let label = format!("{} {suffix}", self.format.label.as_deref().unwrap_or("framebuffer"));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: self.format.width,
                height: self.format.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Attachment { texture, view }
    }

    fn create(&self, device: &wgpu::Device) -> FramebufferNative {
        let f = &self.format;
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

        let (color, resolve) = if f.sample_count > 1 {
            (
                self.attachment(device, "msaa color", f.color, f.sample_count, wgpu::TextureUsages::RENDER_ATTACHMENT),
                Some(self.attachment(device, "resolve", f.color, 1, sampled)),
            )
        } else {
            (self.attachment(device, "color", f.color, 1, sampled), None)
        };

        let depth = f.depth.map(|format| {
            self.attachment(device, "depth", format, f.sample_count, wgpu::TextureUsages::RENDER_ATTACHMENT)
        });

        FramebufferNative {
            color,
            resolve,
            depth,
            width: f.width,
            height: f.height,
        }
    }
}

/// One texture plus its default view.
#[derive(Debug)]
pub struct Attachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Native side of a [`Framebuffer`].
#[derive(Debug)]
pub struct FramebufferNative {
    pub color: Attachment,
    pub resolve: Option<Attachment>,
    pub depth: Option<Attachment>,
    width: u32,
    height: u32,
}

impl FramebufferNative {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// View to sample once rendering is done (the resolve target when multisampled).
    pub fn sampled_view(&self) -> &wgpu::TextureView {
        self.resolve.as_ref().map_or(&self.color.view, |r| &r.view)
    }

    /// Begins a pass that clears every attachment.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color.view,
                resolve_target: self.resolve.as_ref().map(|r| &r.view),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: self.depth.as_ref().map(|d| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: &d.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }

    fn destroy(self) {
        self.color.texture.destroy();
        if let Some(resolve) = self.resolve {
            resolve.texture.destroy();
        }
        if let Some(depth) = self.depth {
            depth.texture.destroy();
        }
    }
}

impl<C: DeviceAccess> GpuResource<C> for Framebuffer {
    type Format = FramebufferFormat;
    type Native = FramebufferNative;
    const KIND: &'static str = "framebuffer";

    fn consume(format: FramebufferFormat) -> Self {
        Self { format }
    }

    fn label(&self) -> Option<&str> {
        self.format.label.as_deref()
    }

    fn device_init(&mut self, ctx: &mut C) -> Result<FramebufferNative, DeviceError> {
        validate::extent_2d("framebuffer", self.format.width, self.format.height, &ctx.limits())?;
        self.validate()?;
        ctx.scoped(|| Ok(self.create(ctx.device())))
    }

    fn device_update(&mut self, native: &mut FramebufferNative, ctx: &mut C) -> Result<(), DeviceError> {
        validate::extent_2d("framebuffer", self.format.width, self.format.height, &ctx.limits())?;
        self.validate()?;
        if native.size() == self.size() {
            return Ok(());
        }
        let fresh = ctx.scoped(|| Ok(self.create(ctx.device())))?;
        std::mem::replace(native, fresh).destroy();
        Ok(())
    }

    fn device_release(&mut self, native: FramebufferNative, ctx: &mut C) -> Result<(), DeviceError> {
        ctx.scoped(|| {
            native.destroy();
            Ok(())
        })
    }
}
