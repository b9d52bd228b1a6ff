//! Producer threads feeding the sprite batch.
//!
//! Neither thread touches the device: they create resources and request
//! updates through a `Producer`, and the window thread does the rest.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use nabu_engine::device::Gpu;
use nabu_engine::lifecycle::{Handle, Producer};
use nabu_engine::resources::{Buffer, BufferFormat, Mesh, MeshFormat, Shader, ShaderFormat, Texture, TextureFormat};

use crate::sprites::{QUAD_INDICES, QUAD_VERTICES, SceneEvent, SpriteTransform};

const TILE: u32 = 64;
const PLASMA: u32 = 128;

/// Creates the program and a row of procedural textures, pausing between
/// them the way a disk-bound loader would.
pub fn load_assets(producer: Producer<Gpu>, events: Sender<SceneEvent>) {
    let shader = producer.create::<Shader>(
        ShaderFormat::wgsl(include_str!("shaders/sprite.wgsl")).with_label("sprite"),
    );
    let quad = producer.create::<Mesh>(
        MeshFormat::from_vertices(&QUAD_VERTICES)
            .with_indices(QUAD_INDICES.to_vec())
            .with_label("quad"),
    );
    if events.send(SceneEvent::Program { shader, quad }).is_err() {
        return;
    }

    let palette: [([u8; 4], [u8; 4]); 5] = [
        ([230, 57, 70, 255], [241, 250, 238, 255]),
        ([69, 123, 157, 255], [168, 218, 220, 255]),
        ([42, 157, 143, 255], [233, 196, 106, 255]),
        ([38, 70, 83, 255], [244, 162, 97, 255]),
        ([131, 56, 236, 255], [255, 190, 11, 255]),
    ];

    for (i, (a, b)) in palette.into_iter().enumerate() {
        thread::sleep(Duration::from_millis(250));

        let texture = producer.create::<Texture>(
            TextureFormat::rgba8(TILE, TILE)
                .with_label(format!("checker {i}"))
                .with_pixels(checkerboard(TILE, 8 << (i % 2), a, b)),
        );
        let transform = producer.create::<Buffer>(
            BufferFormat::uniform(&SpriteTransform {
                offset: [-0.72 + 0.36 * i as f32, -0.55],
                scale: [0.3, 0.3],
            })
            .with_label(format!("checker {i} transform")),
        );

        log::info!("loaded texture {i}");
        if events.send(SceneEvent::Owned { texture, transform }).is_err() {
            return;
        }
    }
}

/// Owns an animated texture and transform and updates both until `stop`.
pub fn animate(producer: Producer<Gpu>, events: Sender<SceneEvent>, stop: Arc<AtomicBool>) {
    let texture: Handle<Texture, Gpu> = producer.create(
        TextureFormat::rgba8(PLASMA, PLASMA)
            .with_label("plasma")
            .with_pixels(plasma(PLASMA, 0.0)),
    );
    let transform: Handle<Buffer, Gpu> = producer.create(
        BufferFormat::uniform(&SpriteTransform {
            offset: [0.0, 0.3],
            scale: [0.6, 0.6],
        })
        .with_label("plasma transform"),
    );

    let sent = events.send(SceneEvent::Observed {
        texture: texture.view(),
        transform: transform.view(),
    });
    if sent.is_err() {
        return;
    }

    let started = Instant::now();
    while !stop.load(Ordering::Acquire) && !producer.is_closed() {
        thread::sleep(Duration::from_millis(33));
        let t = started.elapsed().as_secs_f32();

        texture.update(|tex| tex.set_pixels(plasma(PLASMA, t)));
        transform.update(|buf| {
            buf.write_pod(&SpriteTransform {
                offset: [0.35 * t.sin(), 0.3],
                scale: [0.6, 0.6],
            })
        });
    }

    log::debug!("animator stopped");
    // Dropping the handles queues both objects for release.
}

fn checkerboard(size: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let c = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
            out.extend_from_slice(&c);
        }
    }
    out
}

fn plasma(size: u32, t: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity((size * size * 4) as usize);
    let s = size as f32;
    for y in 0..size {
        for x in 0..size {
            let (u, v) = (x as f32 / s, y as f32 / s);
            let w = (u * 10.0 + t).sin() + (v * 8.0 - t * 1.3).sin() + ((u + v) * 6.0 + t * 0.7).sin();
            let channel = |phase: f32| ((w * 1.2 + phase).sin() * 127.5 + 127.5) as u8;
            out.extend_from_slice(&[channel(0.0), channel(2.1), channel(4.2), 255]);
        }
    }
    out
}
