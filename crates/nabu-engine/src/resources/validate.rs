//! Format validation shared by the resource kinds.
//!
//! Everything here is a pure function of the format and the device limits, so
//! it runs (and is tested) without a device.

use std::borrow::Cow;

use crate::lifecycle::DeviceError;

/// Checks a 2D extent against `max_texture_dimension_2d`.
pub(crate) fn extent_2d(
    what: &'static str,
    width: u32,
    height: u32,
    limits: &wgpu::Limits,
) -> Result<(), DeviceError> {
    if width == 0 || height == 0 {
        return Err(DeviceError::invalid(format!("{what} has zero extent ({width}x{height})")));
    }

    let limit = limits.max_texture_dimension_2d;
    let largest = width.max(height);
    if largest > limit {
        return Err(DeviceError::ExceedsLimits {
            what,
            requested: u64::from(largest),
            limit: u64::from(limit),
        });
    }
    Ok(())
}

/// Bytes per texel of an uncompressed, single-aspect format.
pub(crate) fn texel_size(format: wgpu::TextureFormat) -> Result<u32, DeviceError> {
    if format.is_compressed() {
        return Err(DeviceError::Unsupported(format!(
            "compressed texel format {format:?}"
        )));
    }
    format
        .block_copy_size(None)
        .ok_or_else(|| DeviceError::Unsupported(format!("texel format {format:?} has no copy size")))
}

/// Checks that a pixel payload covers exactly `width * height` texels.
pub(crate) fn pixel_payload(
    len: usize,
    width: u32,
    height: u32,
    texel: wgpu::TextureFormat,
) -> Result<(), DeviceError> {
    let expected = u64::from(width) * u64::from(height) * u64::from(texel_size(texel)?);
    if len as u64 != expected {
        return Err(DeviceError::invalid(format!(
            "pixel payload is {len} bytes, {width}x{height} {texel:?} needs {expected}"
        )));
    }
    Ok(())
}

/// Checks buffer contents against `max_buffer_size`.
pub(crate) fn buffer_contents(
    what: &'static str,
    len: usize,
    limits: &wgpu::Limits,
) -> Result<(), DeviceError> {
    if len == 0 {
        return Err(DeviceError::invalid(format!("{what} contents are empty")));
    }
    let requested = padded_len(len);
    if requested > limits.max_buffer_size {
        return Err(DeviceError::ExceedsLimits {
            what,
            requested,
            limit: limits.max_buffer_size,
        });
    }
    Ok(())
}

/// Size of `len` rounded up to `wgpu::COPY_BUFFER_ALIGNMENT`.
pub(crate) fn padded_len(len: usize) -> u64 {
    (len as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

/// Returns `bytes` zero-padded to `wgpu::COPY_BUFFER_ALIGNMENT`.
pub(crate) fn padded(bytes: &[u8]) -> Cow<'_, [u8]> {
    let len = padded_len(bytes.len()) as usize;
    if len == bytes.len() {
        Cow::Borrowed(bytes)
    } else {
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(bytes);
        out.resize(len, 0);
        Cow::Owned(out)
    }
}

/// Validates a vertex payload and returns the vertex count.
pub(crate) fn vertex_payload(len: usize, stride: u64, limits: &wgpu::Limits) -> Result<u32, DeviceError> {
    if stride == 0 {
        return Err(DeviceError::invalid("vertex stride is zero"));
    }
    if stride > u64::from(limits.max_vertex_buffer_array_stride) {
        return Err(DeviceError::ExceedsLimits {
            what: "vertex stride",
            requested: stride,
            limit: u64::from(limits.max_vertex_buffer_array_stride),
        });
    }
    buffer_contents("vertex buffer", len, limits)?;

    let len = len as u64;
    if len % stride != 0 {
        return Err(DeviceError::invalid(format!(
            "vertex payload of {len} bytes is not a multiple of the {stride}-byte stride"
        )));
    }
    u32::try_from(len / stride).map_err(|_| DeviceError::invalid("vertex count overflows u32"))
}

/// Checks that every index addresses an existing vertex.
pub(crate) fn indices(indices: &[u32], vertex_count: u32) -> Result<(), DeviceError> {
    if indices.is_empty() {
        return Err(DeviceError::invalid("index list is empty"));
    }
    match indices.iter().find(|&&i| i >= vertex_count) {
        Some(i) => Err(DeviceError::invalid(format!(
            "index {i} out of range for {vertex_count} vertices"
        ))),
        None => Ok(()),
    }
}

pub(crate) fn sample_count(count: u32) -> Result<(), DeviceError> {
    match count {
        1 | 4 => Ok(()),
        other => Err(DeviceError::Unsupported(format!("sample count {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> wgpu::Limits {
        wgpu::Limits::downlevel_defaults()
    }

    #[test]
    fn zero_extent_is_invalid() {
        let err = extent_2d("texture", 0, 64, &limits()).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidFormat(_)));
    }

    #[test]
    fn extent_beyond_limit_reports_limit() {
        let l = limits();
        let too_big = l.max_texture_dimension_2d + 1;
        let err = extent_2d("texture", too_big, 1, &l).unwrap_err();
        assert_eq!(
            err,
            DeviceError::ExceedsLimits {
                what: "texture",
                requested: u64::from(too_big),
                limit: u64::from(l.max_texture_dimension_2d),
            }
        );
    }

    #[test]
    fn texel_sizes_of_common_formats() {
        assert_eq!(texel_size(wgpu::TextureFormat::Rgba8UnormSrgb).unwrap(), 4);
        assert_eq!(texel_size(wgpu::TextureFormat::R8Unorm).unwrap(), 1);
        assert_eq!(texel_size(wgpu::TextureFormat::Rgba32Float).unwrap(), 16);
        assert!(matches!(
            texel_size(wgpu::TextureFormat::Bc1RgbaUnorm),
            Err(DeviceError::Unsupported(_))
        ));
    }

    #[test]
    fn pixel_payload_must_match_extent() {
        let fmt = wgpu::TextureFormat::Rgba8Unorm;
        assert!(pixel_payload(64 * 64 * 4, 64, 64, fmt).is_ok());
        assert!(pixel_payload(64 * 64 * 4 - 1, 64, 64, fmt).is_err());
    }

    #[test]
    fn buffers_pad_to_copy_alignment() {
        assert_eq!(padded_len(1), 4);
        assert_eq!(padded_len(8), 8);
        assert_eq!(&padded(&[1, 2, 3, 4, 5])[..], &[1u8, 2, 3, 4, 5, 0, 0, 0][..]);
        assert!(matches!(padded(&[0; 16]), Cow::Borrowed(_)));
    }

    #[test]
    fn empty_buffer_is_invalid() {
        assert!(buffer_contents("uniform buffer", 0, &limits()).is_err());
    }

    #[test]
    fn vertex_payload_counts_vertices() {
        assert_eq!(vertex_payload(96, 24, &limits()).unwrap(), 4);
        assert!(vertex_payload(100, 24, &limits()).is_err());
        assert!(vertex_payload(96, 0, &limits()).is_err());
    }

    #[test]
    fn indices_must_address_vertices() {
        assert!(indices(&[0, 1, 2, 2, 3, 0], 4).is_ok());
        assert!(indices(&[0, 1, 4], 4).is_err());
        assert!(indices(&[], 4).is_err());
    }

    #[test]
    fn only_single_and_4x_sampling() {
        assert!(sample_count(1).is_ok());
        assert!(sample_count(4).is_ok());
        assert!(sample_count(2).is_err());
    }
}
