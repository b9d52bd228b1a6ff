use std::sync::mpsc::Receiver;

use bytemuck::{Pod, Zeroable};
use nabu_engine::device::Gpu;
use nabu_engine::lifecycle::{Handle, View};
use nabu_engine::render::{FrameCtx, RenderCtx, Renderable};
use nabu_engine::resources::{Buffer, Mesh, Shader, Texture};

// ── gpu types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SpriteVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Unit quad centered on the origin.
pub const QUAD_VERTICES: [SpriteVertex; 4] = [
    SpriteVertex { pos: [-0.5, -0.5], uv: [0.0, 1.0] },
    SpriteVertex { pos: [0.5, -0.5], uv: [1.0, 1.0] },
    SpriteVertex { pos: [0.5, 0.5], uv: [1.0, 0.0] },
    SpriteVertex { pos: [-0.5, 0.5], uv: [0.0, 0.0] },
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Per-sprite uniform, in NDC.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SpriteTransform {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
}

// ── scene events ──────────────────────────────────────────────────────────

/// Messages from producer threads to the sprite batch.
pub enum SceneEvent {
    /// Shader + quad; ownership moves to the batch.
    Program {
        shader: Handle<Shader, Gpu>,
        quad: Handle<Mesh, Gpu>,
    },
    /// A sprite whose resources the batch owns from now on.
    Owned {
        texture: Handle<Texture, Gpu>,
        transform: Handle<Buffer, Gpu>,
    },
    /// A sprite whose resources stay with the sending thread.
    Observed {
        texture: View<Texture, Gpu>,
        transform: View<Buffer, Gpu>,
    },
}

struct Sprite {
    texture: View<Texture, Gpu>,
    transform: View<Buffer, Gpu>,
    _owned: Option<(Handle<Texture, Gpu>, Handle<Buffer, Gpu>)>,
}

struct Program {
    shader: Handle<Shader, Gpu>,
    quad: Handle<Mesh, Gpu>,
}

/// Draws textured quads. The pipeline is built lazily once the shader's native
/// module exists, and rebuilt when its revision or the surface format changes.
pub struct SpriteBatch {
    events: Receiver<SceneEvent>,
    program: Option<Program>,
    sprites: Vec<Sprite>,

    pipeline_key: Option<(u64, wgpu::TextureFormat)>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
}

impl SpriteBatch {
    pub fn new(events: Receiver<SceneEvent>) -> Self {
        Self {
            events,
            program: None,
            sprites: Vec::new(),
            pipeline_key: None,
            pipeline: None,
            bind_group_layout: None,
            sampler: None,
        }
    }

    fn drain_events(&mut self) {
        for event in self.events.try_iter() {
            match event {
                SceneEvent::Program { shader, quad } => {
                    self.program = Some(Program { shader, quad });
                    self.pipeline_key = None;
                }
                SceneEvent::Owned { texture, transform } => self.sprites.push(Sprite {
                    texture: texture.view(),
                    transform: transform.view(),
                    _owned: Some((texture, transform)),
                }),
                SceneEvent::Observed { texture, transform } => self.sprites.push(Sprite {
                    texture,
                    transform,
                    _owned: None,
                }),
            }
        }
        // Observed sprites whose owner released them.
        self.sprites
            .retain(|s| !s.texture.is_released() && !s.transform.is_released());
    }

    /// Returns `false` while the shader is not ready.
    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) -> bool {
        let Some(program) = &self.program else { return false };

        if self.sampler.is_none() {
            self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("sprite sampler"),
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }));
        }
        let layout = self
            .bind_group_layout
            .get_or_insert_with(|| create_bind_group_layout(ctx.device));

        let current = self.pipeline_key;
        let rebuilt = program.shader.view().with_native(|shader| {
            let key = (shader.revision, ctx.surface_format);
            if current == Some(key) {
                return None;
            }
            log::debug!("building sprite pipeline for shader revision {}", shader.revision);
            Some((key, create_pipeline(ctx, layout, &shader.module)))
        });

        match rebuilt {
            None => false,
            Some(None) => true,
            Some(Some((key, pipeline))) => {
                self.pipeline_key = Some(key);
                self.pipeline = Some(pipeline);
                true
            }
        }
    }
}

impl Renderable<Gpu> for SpriteBatch {
    fn draw(&mut self, frame: &mut FrameCtx<'_, Gpu>) {
        self.drain_events();

        let (ctx, target) = frame.ctx.frame_target();
        let Some(mut target) = target else { return };
        if !self.ensure_pipeline(&ctx) {
            return;
        }

        let (Some(pipeline), Some(layout), Some(sampler), Some(program)) = (
            self.pipeline.as_ref(),
            self.bind_group_layout.as_ref(),
            self.sampler.as_ref(),
            self.program.as_ref(),
        ) else {
            return;
        };

        // Sprites whose texture or transform is not initialized yet are skipped.
        let bind_groups: Vec<wgpu::BindGroup> = self
            .sprites
            .iter()
            .filter_map(|sprite| {
                sprite
                    .texture
                    .with_native(|tex| {
                        sprite.transform.with_native(|ubo| {
                            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                                label: Some("sprite bind group"),
                                layout,
                                entries: &[
                                    wgpu::BindGroupEntry {
                                        binding: 0,
                                        resource: ubo.as_entire_binding(),
                                    },
                                    wgpu::BindGroupEntry {
                                        binding: 1,
                                        resource: wgpu::BindingResource::TextureView(&tex.view),
                                    },
                                    wgpu::BindGroupEntry {
                                        binding: 2,
                                        resource: wgpu::BindingResource::Sampler(sampler),
                                    },
                                ],
                            })
                        })
                    })
                    .flatten()
            })
            .collect();

        if bind_groups.is_empty() {
            return;
        }

        program.quad.view().with_native(|quad| {
            let mut pass = target.load_pass("sprite pass");
            pass.set_pipeline(pipeline);
            for bind_group in &bind_groups {
                pass.set_bind_group(0, bind_group, &[]);
                quad.draw(&mut pass, 0..1);
            }
        });
    }
}

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("sprite bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(size_of::<SpriteTransform>() as u64),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_pipeline(
    ctx: &RenderCtx<'_>,
    layout: &wgpu::BindGroupLayout,
    module: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let pipeline_layout = ctx
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite pipeline layout"),
            bind_group_layouts: &[layout],
            immediate_size: 0,
        });

    ctx.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
}
