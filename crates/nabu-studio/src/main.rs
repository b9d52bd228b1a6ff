//! Nabu studio: loader and animation threads produce GPU resources while the
//! window thread drains and draws them.

mod scene;
mod sprites;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use nabu_engine::device::{Gpu, GpuInit};
use nabu_engine::lifecycle::{Renderer, RendererConfig};
use nabu_engine::logging::{LoggingConfig, init_logging};
use nabu_engine::render::RenderLoop;
use nabu_engine::window::{Runtime, RuntimeConfig};

use sprites::SpriteBatch;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let renderer = Renderer::<Gpu>::new(RendererConfig {
        label: "studio".to_string(),
        ..RendererConfig::default()
    });
    let mut render_loop = RenderLoop::new(renderer);
    let producer = render_loop.producer();

    let (events, inbox) = mpsc::channel();
    render_loop.add_renderable(SpriteBatch::new(inbox));

    let stop = Arc::new(AtomicBool::new(false));

    let loader = {
        let (producer, events) = (producer.clone(), events.clone());
        thread::Builder::new()
            .name("loader".to_string())
            .spawn(move || scene::load_assets(producer, events))
            .context("failed to spawn loader thread")?
    };
    let animator = {
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("animator".to_string())
            .spawn(move || scene::animate(producer, events, stop))
            .context("failed to spawn animator thread")?
    };

    let result = Runtime::run(
        RuntimeConfig {
            title: "nabu studio".to_string(),
            clear_color: wgpu::Color {
                r: 0.02,
                g: 0.02,
                b: 0.03,
                a: 1.0,
            },
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        render_loop,
    );

    stop.store(true, Ordering::Release);
    loader.join().map_err(|_| anyhow!("loader thread panicked"))?;
    animator.join().map_err(|_| anyhow!("animator thread panicked"))?;

    let stats = result?;
    log::info!(
        "studio closed after {} frames ({} inits, {} updates, {} releases, {} failures)",
        stats.frames,
        stats.drained.initialized,
        stats.drained.updated,
        stats.drained.released,
        stats.drained.failed
    );
    Ok(())
}
