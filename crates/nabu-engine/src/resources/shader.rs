use std::borrow::Cow;

use crate::device::DeviceAccess;
use crate::lifecycle::{DeviceError, GpuResource};

/// Creation snapshot of a WGSL shader program.
#[derive(Debug, Clone)]
pub struct ShaderFormat {
    pub label: Option<String>,
    pub source: String,
    /// Vertex entry point that must exist, if any.
    pub vertex_entry: Option<String>,
    /// Fragment entry point that must exist, if any.
    pub fragment_entry: Option<String>,
}

impl ShaderFormat {
    /// WGSL program with `vs_main`/`fs_main` entry points.
    pub fn wgsl(source: impl Into<String>) -> Self {
        Self {
            label: None,
            source: source.into(),
            vertex_entry: Some("vs_main".to_string()),
            fragment_entry: Some("fs_main".to_string()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// CPU-side state of a managed shader program.
#[derive(Debug)]
pub struct Shader {
    label: Option<String>,
    source: String,
    vertex_entry: Option<String>,
    fragment_entry: Option<String>,
    revision: u64,
}

impl Shader {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replaces the source. The next device update recompiles it and bumps
    /// the native revision, so pipelines built from the old module can be
    /// rebuilt.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn build(&self, device: &wgpu::Device) -> Result<ShaderNative, DeviceError> {
        let module = compile(
            &self.source,
            self.vertex_entry.as_deref(),
            self.fragment_entry.as_deref(),
            capabilities(device.features()),
        )?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: self.label.as_deref(),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        });

        Ok(ShaderNative {
            module,
            vertex_entry: self.vertex_entry.clone(),
            fragment_entry: self.fragment_entry.clone(),
            revision: self.revision,
        })
    }
}

/// Native side of a [`Shader`].
#[derive(Debug)]
pub struct ShaderNative {
    pub module: wgpu::ShaderModule,
    pub vertex_entry: Option<String>,
    pub fragment_entry: Option<String>,
    /// Source revision this module was compiled from.
    pub revision: u64,
}

/// Device features that unlock a shader capability.
const FEATURE_CAPABILITIES: &[(wgpu::Features, naga::valid::Capabilities)] = &[
    (wgpu::Features::IMMEDIATES, naga::valid::Capabilities::IMMEDIATES),
    (wgpu::Features::SHADER_F64, naga::valid::Capabilities::FLOAT64),
    (wgpu::Features::SHADER_F16, naga::valid::Capabilities::SHADER_FLOAT16),
    (wgpu::Features::SHADER_INT64, naga::valid::Capabilities::SHADER_INT64),
    (wgpu::Features::SHADER_PRIMITIVE_INDEX, naga::valid::Capabilities::PRIMITIVE_INDEX),
    (wgpu::Features::SHADER_EARLY_DEPTH_TEST, naga::valid::Capabilities::EARLY_DEPTH_TEST),
    (wgpu::Features::TEXTURE_BINDING_ARRAY, naga::valid::Capabilities::TEXTURE_AND_SAMPLER_BINDING_ARRAY),
    (wgpu::Features::BUFFER_BINDING_ARRAY, naga::valid::Capabilities::BUFFER_BINDING_ARRAY),
    (wgpu::Features::DUAL_SOURCE_BLENDING, naga::valid::Capabilities::DUAL_SOURCE_BLENDING),
    (wgpu::Features::CLIP_DISTANCES, naga::valid::Capabilities::CLIP_DISTANCE),
    (wgpu::Features::MULTIVIEW, naga::valid::Capabilities::MULTIVIEW),
];

/// Shader capabilities a device with `features` can run.
///
/// Starts from naga's baseline and adds what each enabled feature unlocks.
pub fn capabilities(features: wgpu::Features) -> naga::valid::Capabilities {
    FEATURE_CAPABILITIES
        .iter()
        .filter(|(feature, _)| features.contains(*feature))
        .fold(naga::valid::Capabilities::default(), |caps, (_, cap)| caps | *cap)
}

/// Parses and validates WGSL against `capabilities`, checking the requested
/// entry points.
pub fn compile(
    source: &str,
    vertex_entry: Option<&str>,
    fragment_entry: Option<&str>,
    capabilities: naga::valid::Capabilities,
) -> Result<naga::Module, DeviceError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| DeviceError::ShaderCompile(e.emit_to_string(source)))?;

    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), capabilities)
    .validate(&module)
    .map_err(|e| DeviceError::ShaderCompile(e.emit_to_string(source)))?;

    let wanted = [
        ("vertex", naga::ShaderStage::Vertex, vertex_entry),
        ("fragment", naga::ShaderStage::Fragment, fragment_entry),
    ];
    for (stage_name, stage, name) in wanted {
        let Some(name) = name else { continue };
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.stage == stage && ep.name == name);
        if !found {
            return Err(DeviceError::MissingEntryPoint {
                stage: stage_name,
                name: name.to_string(),
            });
        }
    }

    Ok(module)
}

impl<C: DeviceAccess> GpuResource<C> for Shader {
    type Format = ShaderFormat;
    type Native = ShaderNative;
    const KIND: &'static str = "shader";

    fn consume(format: ShaderFormat) -> Self {
        Self {
            label: format.label,
            source: format.source,
            vertex_entry: format.vertex_entry,
            fragment_entry: format.fragment_entry,
            revision: 0,
        }
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn device_init(&mut self, ctx: &mut C) -> Result<ShaderNative, DeviceError> {
        ctx.scoped(|| self.build(ctx.device()))
    }

    fn device_update(&mut self, native: &mut ShaderNative, ctx: &mut C) -> Result<(), DeviceError> {
        if native.revision == self.revision {
            return Ok(());
        }
        *native = ctx.scoped(|| self.build(ctx.device()))?;
        Ok(())
    }
}
