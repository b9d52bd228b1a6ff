use std::sync::Arc;

use crate::device::DeviceAccess;
use crate::lifecycle::{DeviceError, GpuResource};

use super::validate;

/// Creation snapshot of a 2D texture.
#[derive(Debug, Clone)]
pub struct TextureFormat {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub texel: wgpu::TextureFormat,
    /// Usages beyond `COPY_DST`, which is always added.
    pub usage: wgpu::TextureUsages,
    /// Tightly packed rows, `width * height * texel size` bytes.
    pub pixels: Option<Arc<[u8]>>,
}

impl TextureFormat {
    /// A sampled `Rgba8UnormSrgb` texture without initial contents.
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            label: None,
            width,
            height,
            texel: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            pixels: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_pixels(mut self, pixels: impl Into<Arc<[u8]>>) -> Self {
        self.pixels = Some(pixels.into());
        self
    }
}

/// CPU-side state of a managed 2D texture.
#[derive(Debug)]
pub struct Texture {
    label: Option<String>,
    width: u32,
    height: u32,
    texel: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
    pixels: Option<Arc<[u8]>>,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel(&self) -> wgpu::TextureFormat {
        self.texel
    }

    pub fn pixels(&self) -> Option<&Arc<[u8]>> {
        self.pixels.as_ref()
    }

    /// Replaces the pixel payload. Takes effect at the next device update.
    pub fn set_pixels(&mut self, pixels: impl Into<Arc<[u8]>>) {
        self.pixels = Some(pixels.into());
    }

    /// Changes the extent and payload together; the next device update
    /// recreates the native texture.
    pub fn resize(&mut self, width: u32, height: u32, pixels: Option<Arc<[u8]>>) {
        self.width = width;
        self.height = height;
        self.pixels = pixels;
    }

    fn validate(&self, limits: &wgpu::Limits) -> Result<(), DeviceError> {
        validate::extent_2d("texture", self.width, self.height, limits)?;
        validate::texel_size(self.texel)?;
        if let Some(pixels) = &self.pixels {
            validate::pixel_payload(pixels.len(), self.width, self.height, self.texel)?;
        }
        Ok(())
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    fn create(&self, device: &wgpu::Device) -> TextureNative {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: self.label.as_deref(),
            size: self.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.texel,
            usage: self.usage | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        TextureNative {
            texture,
            view,
            width: self.width,
            height: self.height,
            texel: self.texel,
        }
    }

    fn upload(&self, queue: &wgpu::Queue, native: &TextureNative) -> Result<(), DeviceError> {
        let Some(pixels) = &self.pixels else {
            return Ok(());
        };
        let bytes_per_row = self.width * validate::texel_size(self.texel)?;

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &native.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.height),
            },
            self.extent(),
        );
        Ok(())
    }
}

/// Native side of a [`Texture`].
#[derive(Debug)]
pub struct TextureNative {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
    texel: wgpu::TextureFormat,
}

impl TextureNative {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl<C: DeviceAccess> GpuResource<C> for Texture {
    type Format = TextureFormat;
    type Native = TextureNative;
    const KIND: &'static str = "texture";

    fn consume(format: TextureFormat) -> Self {
        Self {
            label: format.label,
            width: format.width,
            height: format.height,
            texel: format.texel,
            usage: format.usage,
            pixels: format.pixels,
        }
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn device_init(&mut self, ctx: &mut C) -> Result<TextureNative, DeviceError> {
        self.validate(&ctx.limits())?;
        ctx.scoped(|| {
            let native = self.create(ctx.device());
            self.upload(ctx.queue(), &native)?;
            Ok(native)
        })
    }

    fn device_update(&mut self, native: &mut TextureNative, ctx: &mut C) -> Result<(), DeviceError> {
        self.validate(&ctx.limits())?;

        if (native.width, native.height, native.texel) != (self.width, self.height, self.texel) {
            let fresh = ctx.scoped(|| {
                let fresh = self.create(ctx.device());
                self.upload(ctx.queue(), &fresh)?;
                Ok(fresh)
            })?;
            std::mem::replace(native, fresh).texture.destroy();
            return Ok(());
        }
        ctx.scoped(|| self.upload(ctx.queue(), native))
    }

    fn device_release(&mut self, native: TextureNative, ctx: &mut C) -> Result<(), DeviceError> {
        ctx.scoped(|| {
            native.texture.destroy();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(format: TextureFormat) -> Texture {
        <Texture as GpuResource<crate::device::GpuContext>>::consume(format)
    }

    #[test]
    fn consume_copies_the_format() {
        let pixels: Arc<[u8]> = vec![0u8; 4 * 4 * 4].into();
        let t = texture(TextureFormat::rgba8(4, 4).with_label("checker").with_pixels(pixels.clone()));

        assert_eq!((t.width(), t.height()), (4, 4));
        assert_eq!(t.label.as_deref(), Some("checker"));
        assert!(Arc::ptr_eq(t.pixels().unwrap(), &pixels));
    }

    #[test]
    fn validation_catches_short_payload() {
        let t = texture(TextureFormat::rgba8(64, 64).with_pixels(vec![0u8; 10]));
        assert!(matches!(
            t.validate(&wgpu::Limits::default()),
            Err(DeviceError::InvalidFormat(_))
        ));
    }

    #[test]
    fn resize_replaces_extent_and_payload() {
        let mut t = texture(TextureFormat::rgba8(2, 2).with_pixels(vec![0u8; 16]));
        t.resize(8, 8, None);
        assert_eq!((t.width(), t.height()), (8, 8));
        assert!(t.pixels().is_none());
        assert!(t.validate(&wgpu::Limits::default()).is_ok());
    }
}
