use thiserror::Error;

/// Failure reported by a device operation.
///
/// Device errors never cross the queue-processing boundary: they are handed to
/// the renderer's diagnostics hook and the drain continues with the next entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The format consumed at creation is self-inconsistent or out of range.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A dimension or size exceeds what the device supports.
    #[error("{what} of {requested} exceeds the device limit of {limit}")]
    ExceedsLimits {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// Shader source failed to parse or validate.
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// Shader source compiled but does not declare a requested entry point.
    #[error("shader has no {stage} entry point named `{name}`")]
    MissingEntryPoint { stage: &'static str, name: String },

    /// The backend cannot represent the requested resource.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The native API rejected a call.
    #[error("native validation error: {0}")]
    Validation(String),

    /// The device ran out of memory while creating or writing a resource.
    #[error("out of device memory")]
    OutOfMemory,

    /// The native API failed internally.
    #[error("native internal error: {0}")]
    Internal(String),

    /// The rendering context was lost.
    #[error("context lost: {0}")]
    Lost(String),
}

impl DeviceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}

/// A lifecycle-managed GPU resource kind.
///
/// The implementing type is the *CPU-side state* of the object. It is built
/// from a [`Format`](GpuResource::Format) by [`consume`](GpuResource::consume)
/// on the producer thread and later read by the three device operations on
/// the render thread.
///
/// `C` is the render-thread context. Device operations receive it mutably and
/// are the only code that ever sees it, which is what keeps native calls on
/// the context-owning thread.
pub trait GpuResource<C>: Send + Sized + 'static {
    /// Creation snapshot. Consumed once, never retained.
    type Format: Clone + Send;

    /// Native handle(s) issued by the graphics API.
    type Native: Send + 'static;

    /// Short kind name used in diagnostics ("texture", "buffer", ...).
    const KIND: &'static str;

    /// Materializes CPU-side state from a format.
    ///
    /// Inconsistent formats are accepted here; `device_init` is expected to
    /// detect and report them.
    fn consume(format: Self::Format) -> Self;

    /// Optional debug label.
    fn label(&self) -> Option<&str> {
        None
    }

    /// Creates the native value from the current CPU-side state.
    fn device_init(&mut self, ctx: &mut C) -> Result<Self::Native, DeviceError>;

    /// Brings the native value in line with the current CPU-side state.
    ///
    /// On error the previous native contents stay in place.
    fn device_update(&mut self, native: &mut Self::Native, ctx: &mut C)
        -> Result<(), DeviceError>;

    /// Destroys the native value. The CPU-side state is dropped right after.
    fn device_release(&mut self, native: Self::Native, ctx: &mut C) -> Result<(), DeviceError> {
        let _ = ctx;
        drop(native);
        Ok(())
    }
}
