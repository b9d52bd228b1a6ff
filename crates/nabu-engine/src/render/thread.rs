use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

use crate::lifecycle::Producer;

use super::frame_loop::{LoopStats, RenderLoop};

/// Dedicated render thread configuration.
#[derive(Debug, Clone)]
pub struct RenderThreadConfig {
    /// OS thread name.
    pub name: String,

    /// Target time between ticks. Zero ticks back to back.
    pub frame_interval: Duration,
}

impl Default for RenderThreadConfig {
    fn default() -> Self {
        Self {
            name: "nabu-render".to_string(),
            frame_interval: Duration::from_millis(16),
        }
    }
}

/// A render loop running on its own OS thread.
///
/// The context is built *inside* the thread by `make_context` and never
/// leaves it, so every device call happens there. Other threads interact only
/// through the [`Producer`].
pub struct RenderThread<C: 'static> {
    producer: Producer<C>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<Result<LoopStats>>>,
}

impl<C: 'static> RenderThread<C> {
    pub fn spawn<F>(config: RenderThreadConfig, mut render_loop: RenderLoop<C>, make_context: F) -> Result<Self>
    where
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        let producer = render_loop.producer();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let RenderThreadConfig { name, frame_interval } = config;

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut ctx = make_context().context("failed to create render context")?;
                log::debug!("render thread `{name}` started");

                while !flag.load(Ordering::Acquire) {
                    let started = Instant::now();
                    render_loop.tick(&mut ctx);

                    if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                        thread::park_timeout(rest);
                    }
                }

                render_loop.shutdown(&mut ctx);
                let stats = render_loop.stats();
                log::debug!("render thread `{name}` stopped after {} frames", stats.frames);
                Ok(stats)
            })
            .context("failed to spawn render thread")?;

        Ok(Self {
            producer,
            stop,
            join: Some(join),
        })
    }

    pub fn producer(&self) -> Producer<C> {
        self.producer.clone()
    }

    /// Stops the loop, shuts the renderer down on the render thread and
    /// returns the loop statistics.
    pub fn stop(mut self) -> Result<LoopStats> {
        self.signal_and_join()
            .unwrap_or_else(|| Err(anyhow!("render thread already joined")))
    }

    fn signal_and_join(&mut self) -> Option<Result<LoopStats>> {
        let join = self.join.take()?;
        self.stop.store(true, Ordering::Release);
        join.thread().unpark();

        Some(match join.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("render thread panicked")),
        })
    }
}

impl<C: 'static> Drop for RenderThread<C> {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.signal_and_join() {
            log::error!("render thread: {e:#}");
        }
    }
}
