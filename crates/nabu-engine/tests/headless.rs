//! Exercises the wgpu resource kinds against a real device when one is
//! available. Machines without an adapter skip these tests.

use std::sync::Arc;

use nabu_engine::device::{GpuContext, GpuInit};
use nabu_engine::device::DeviceAccess;
use nabu_engine::lifecycle::{DeviceError, DeviceFailure, ObjectState, Renderer, RendererConfig, Stage};
use nabu_engine::resources::{
    Buffer, BufferFormat, Framebuffer, FramebufferFormat, Mesh, MeshFormat, Shader, ShaderFormat, Texture,
    TextureFormat,
};
use parking_lot::Mutex;

const SHADER: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) pos: vec2<f32>, @location(1) uv: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.pos = vec4<f32>(pos, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.uv, 0.0, 1.0);
}
"#;

fn context() -> Option<GpuContext> {
    match GpuContext::headless_blocking(GpuInit {
        required_limits: wgpu::Limits::downlevel_defaults(),
        ..GpuInit::default()
    }) {
        Ok(ctx) => {
            let info = ctx.adapter_info();
            eprintln!("running on {} ({:?})", info.name, info.backend);
            Some(ctx)
        }
        Err(e) => {
            eprintln!("skipping: no GPU adapter ({e:#})");
            None
        }
    }
}

fn quad() -> Vec<[f32; 4]> {
    vec![
        [-1.0, -1.0, 0.0, 1.0],
        [1.0, -1.0, 1.0, 1.0],
        [1.0, 1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0, 0.0],
    ]
}

#[test]
fn every_resource_kind_initializes_and_releases() {
    let Some(mut ctx) = context() else { return };
    let mut r = Renderer::<GpuContext>::new(RendererConfig::default());

    let texture = r.create::<Texture>(TextureFormat::rgba8(64, 64).with_pixels(vec![255u8; 64 * 64 * 4]));
    let buffer = r.create::<Buffer>(BufferFormat::uniform(&[1.0f32, 0.5, 0.25]).with_label("tint"));
    let shader = r.create::<Shader>(ShaderFormat::wgsl(SHADER).with_label("quad"));
    let mesh = r.create::<Mesh>(MeshFormat::from_vertices(&quad()).with_indices(vec![0, 1, 2, 2, 3, 0]));
    let framebuffer = r.create::<Framebuffer>(
        FramebufferFormat::new(128, 128, wgpu::TextureFormat::Rgba8Unorm).with_depth(wgpu::TextureFormat::Depth32Float),
    );

    let report = r.process_queues(&mut ctx);
    assert_eq!(report.initialized, 5);
    assert_eq!(report.failed, 0);

    assert_eq!(texture.view().with_native(|n| n.size()), Some((64, 64)));
    assert_eq!(buffer.view().with_native(|b| b.size()), Some(12));
    assert_eq!(mesh.view().with_native(|m| (m.vertex_count, m.index_count)), Some((4, 6)));
    assert_eq!(shader.view().with_native(|s| s.revision), Some(0));
    assert!(framebuffer.view().with_native(|f| f.depth.is_some()).unwrap());

    framebuffer.update(|f| f.resize(256, 64));
    buffer.update(|b| b.set_contents(vec![0u8; 32]));
    texture.update(|t| t.set_pixels(vec![0u8; 64 * 64 * 4]));
    mesh.update(|m| m.set_indices(Some(vec![0, 1, 2].into())));
    let report = r.process_queues(&mut ctx);
    assert_eq!(report.updated, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(framebuffer.view().with_native(|f| f.size()), Some((256, 64)));
    assert_eq!(buffer.view().with_native(|b| b.size()), Some(32));
    assert_eq!(mesh.view().with_native(|m| m.index_count), Some(3));

    drop((texture, buffer, shader, mesh, framebuffer));
    let report = r.process_queues(&mut ctx);
    assert_eq!(report.released, 5);
    assert_eq!(r.live_objects(), 0);
}

#[test]
fn invalid_formats_fail_without_stopping_the_drain() {
    let Some(mut ctx) = context() else { return };
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = failures.clone();
    let mut r = Renderer::<GpuContext>::with_diagnostics(RendererConfig::default(), move |f: &DeviceFailure| {
        sink.lock().push((f.kind, f.stage));
    });

    let bad_texture = r.create::<Texture>(TextureFormat::rgba8(0, 64));
    let bad_shader = r.create::<Shader>(ShaderFormat::wgsl("fn nope( {"));
    let good = r.create::<Buffer>(BufferFormat::new(wgpu::BufferUsages::STORAGE, vec![0u8; 16]));

    let report = r.process_queues(&mut ctx);
    assert_eq!(report.failed, 2);
    assert_eq!(report.initialized, 1);
    assert_eq!(bad_texture.state(), ObjectState::Failed);
    assert_eq!(bad_shader.state(), ObjectState::Failed);
    assert_eq!(good.state(), ObjectState::Initialized);
    assert_eq!(
        *failures.lock(),
        vec![("texture", Stage::Init), ("shader", Stage::Init)]
    );

    // A corrected source retries init.
    bad_shader.update(|s| s.set_source(SHADER));
    let report = r.process_queues(&mut ctx);
    assert_eq!(report.initialized, 1);
    assert_eq!(bad_shader.state(), ObjectState::Initialized);

    r.shutdown(&mut ctx);
    assert_eq!(r.live_objects(), 0);
}

#[test]
fn native_rejections_fail_the_object_instead_of_panicking() {
    let Some(mut ctx) = context() else { return };
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = failures.clone();
    let mut r = Renderer::<GpuContext>::with_diagnostics(RendererConfig::default(), move |f: &DeviceFailure| {
        sink.lock().push((f.kind, f.stage, f.error.clone()));
    });

    // MAP_READ may only be combined with COPY_DST.
    let mapped = r.create::<Buffer>(BufferFormat::new(
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::UNIFORM,
        vec![0u8; 16],
    ));
    // sRGB formats are never storage-capable.
    let storage = r.create::<Texture>(TextureFormat {
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING,
        ..TextureFormat::rgba8(16, 16)
    });
    let fine = r.create::<Buffer>(BufferFormat::new(wgpu::BufferUsages::UNIFORM, vec![0u8; 16]));

    let report = r.process_queues(&mut ctx);
    assert_eq!((report.initialized, report.failed), (1, 2));
    assert_eq!(mapped.state(), ObjectState::Failed);
    assert_eq!(storage.state(), ObjectState::Failed);
    assert_eq!(fine.state(), ObjectState::Initialized);
    assert!(!mapped.view().is_ready());

    let failures = failures.lock();
    assert_eq!(failures.len(), 2);
    assert_eq!((failures[0].0, failures[0].1), ("buffer", Stage::Init));
    assert!(matches!(failures[0].2, DeviceError::Validation(_)));
    assert_eq!((failures[1].0, failures[1].1), ("texture", Stage::Init));
    assert!(matches!(failures[1].2, DeviceError::Validation(_)));
    drop(failures);

    r.shutdown(&mut ctx);
}

#[test]
fn framebuffer_clears_and_exposes_its_sampled_view() {
    let Some(mut ctx) = context() else { return };
    let mut r = Renderer::<GpuContext>::new(RendererConfig::default());

    let single = r.create::<Framebuffer>(FramebufferFormat::new(32, 32, wgpu::TextureFormat::Rgba8Unorm));
    let msaa = r.create::<Framebuffer>(
        FramebufferFormat::new(32, 32, wgpu::TextureFormat::Rgba8Unorm)
            .with_depth(wgpu::TextureFormat::Depth32Float)
            .with_samples(4)
            .with_label("msaa"),
    );
    let report = r.process_queues(&mut ctx);
    assert_eq!(report.initialized, 2);

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("clear targets") });
    for fb in [single.view(), msaa.view()] {
        let drawn = fb.with_native(|native| {
            drop(native.begin_pass(&mut encoder, "clear", wgpu::Color::GREEN));
        });
        assert!(drawn.is_some());
    }
    ctx.queue().submit([encoder.finish()]);

    single
        .view()
        .with_native(|f| assert!(std::ptr::eq(f.sampled_view(), &f.color.view)))
        .unwrap();
    msaa.view()
        .with_native(|f| {
            let resolve = f.resolve.as_ref().unwrap();
            assert!(std::ptr::eq(f.sampled_view(), &resolve.view));
        })
        .unwrap();

    r.shutdown(&mut ctx);
}
