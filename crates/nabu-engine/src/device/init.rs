/// Initialization parameters for the GPU layer.
///
/// Shared by the windowed [`Gpu`](super::Gpu) and the headless
/// [`GpuContext`](super::GpuContext).
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Device label, visible in backend debuggers.
    pub label: String,

    /// Adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    /// Accept a software adapter. Useful for CI without a GPU.
    pub force_fallback_adapter: bool,

    /// Prefer an sRGB surface format when available. Ignored when headless.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). Ignored when headless.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device. Resource validation checks
    /// formats against the limits the device actually reports.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            label: "nabu device".to_string(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
