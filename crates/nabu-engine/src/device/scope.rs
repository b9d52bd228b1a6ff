use wgpu::ErrorFilter;

use crate::lifecycle::DeviceError;

/// Runs `f` with out-of-memory, internal and validation error scopes pushed.
///
/// Errors the native API raises while `f` runs come back as a [`DeviceError`]
/// instead of reaching the device's uncaptured-error handler, which panics by
/// default. An error returned by `f` itself takes precedence; a value returned
/// alongside a captured error is dropped.
///
/// Error scopes are per thread, so this only captures calls made on the
/// calling thread.
pub fn capture<T>(
    device: &wgpu::Device,
    f: impl FnOnce() -> Result<T, DeviceError>,
) -> Result<T, DeviceError> {
    let oom = device.push_error_scope(ErrorFilter::OutOfMemory);
    let internal = device.push_error_scope(ErrorFilter::Internal);
    let validation = device.push_error_scope(ErrorFilter::Validation);

    let result = f();

    // Scopes pop in reverse push order.
    let validation = pollster::block_on(validation.pop());
    let internal = pollster::block_on(internal.pop());
    let oom = pollster::block_on(oom.pop());

    match (result, validation.or(internal).or(oom)) {
        (Err(error), _) => Err(error),
        (Ok(_), Some(captured)) => Err(device_error(captured)),
        (Ok(value), None) => Ok(value),
    }
}

fn device_error(error: wgpu::Error) -> DeviceError {
    match error {
        wgpu::Error::OutOfMemory { .. } => DeviceError::OutOfMemory,
        wgpu::Error::Validation { description, .. } => DeviceError::Validation(description),
        wgpu::Error::Internal { description, .. } => DeviceError::Internal(description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_native_errors() {
        let source: wgpu::ErrorSource = "boom".into();
        let err = device_error(wgpu::Error::Validation {
            source,
            description: "MAP usage".to_string(),
        });
        assert_eq!(err, DeviceError::Validation("MAP usage".to_string()));

        let source: wgpu::ErrorSource = "oom".into();
        assert_eq!(device_error(wgpu::Error::OutOfMemory { source }), DeviceError::OutOfMemory);
    }
}
