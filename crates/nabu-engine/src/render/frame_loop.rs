use std::ops::AddAssign;

use crate::lifecycle::{DrainReport, Producer, Renderer};

use super::clock::{FrameClock, FrameTime};

/// Per-frame context passed to [`Renderable::draw`].
pub struct FrameCtx<'a, C> {
    /// The render-thread context (device, surface, ...).
    pub ctx: &'a mut C,
    pub time: FrameTime,
    /// What this frame's queue drain did.
    pub drained: DrainReport,
}

/// A draw callback registered with a [`RenderLoop`].
///
/// Renderables hold [`View`](crate::lifecycle::View)s (or handles) of the
/// objects they draw and skip any whose native value is not ready yet.
pub trait Renderable<C>: Send {
    fn draw(&mut self, frame: &mut FrameCtx<'_, C>);
}

impl<C, F> Renderable<C> for F
where
    F: FnMut(&mut FrameCtx<'_, C>) + Send,
{
    fn draw(&mut self, frame: &mut FrameCtx<'_, C>) {
        self(frame)
    }
}

/// Result of one [`RenderLoop::tick`].
#[derive(Debug, Copy, Clone)]
pub struct FrameReport {
    pub time: FrameTime,
    pub drained: DrainReport,
    /// Number of draw callbacks invoked.
    pub drawn: usize,
}

/// Totals accumulated over the life of a loop.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct LoopStats {
    pub frames: u64,
    pub drained: DrainReport,
}

impl AddAssign<&FrameReport> for LoopStats {
    fn add_assign(&mut self, frame: &FrameReport) {
        self.frames += 1;
        self.drained += frame.drained;
    }
}

/// Render-thread frame loop: one queue drain, then every draw callback.
///
/// Owns the [`Renderer`], so whichever thread owns the loop is the thread that
/// drains. Producer threads get a [`Producer`] from [`producer`](Self::producer).
pub struct RenderLoop<C: 'static> {
    renderer: Renderer<C>,
    renderables: Vec<Box<dyn Renderable<C>>>,
    clock: FrameClock,
    stats: LoopStats,
}

impl<C: 'static> RenderLoop<C> {
    pub fn new(renderer: Renderer<C>) -> Self {
        Self {
            renderer,
            renderables: Vec::new(),
            clock: FrameClock::new(),
            stats: LoopStats::default(),
        }
    }

    pub fn renderer(&self) -> &Renderer<C> {
        &self.renderer
    }

    pub fn producer(&self) -> Producer<C> {
        self.renderer.producer()
    }

    /// Registers a draw callback. Callbacks run in registration order.
    pub fn add_renderable(&mut self, renderable: impl Renderable<C> + 'static) {
        self.renderables.push(Box::new(renderable));
    }

    pub fn renderables(&self) -> usize {
        self.renderables.len()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Resets the frame clock baseline, e.g. after a suspended window resumes.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Runs one iteration: `process_queues` exactly once, then every draw
    /// callback against the same context.
    pub fn tick(&mut self, ctx: &mut C) -> FrameReport {
        let time = self.clock.tick();
        let drained = self.renderer.process_queues(ctx);

        let mut frame = FrameCtx { ctx, time, drained };
        for renderable in &mut self.renderables {
            renderable.draw(&mut frame);
        }

        let report = FrameReport {
            time,
            drained,
            drawn: self.renderables.len(),
        };
        self.stats += &report;
        report
    }

    /// Drops every renderable (releasing the handles they own), then shuts
    /// the renderer down.
    pub fn shutdown(&mut self, ctx: &mut C) -> DrainReport {
        self.renderables.clear();
        let drained = self.renderer.shutdown(ctx);
        self.stats.drained += drained;
        drained
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::lifecycle::{DeviceError, GpuResource, Handle, ObjectState, RendererConfig};

    #[derive(Default)]
    struct Ctx {
        log: Vec<&'static str>,
    }

    struct Counter(u32);

    impl GpuResource<Ctx> for Counter {
        type Format = u32;
        type Native = u32;
        const KIND: &'static str = "counter";

        fn consume(format: u32) -> Self {
            Self(format)
        }

        fn device_init(&mut self, ctx: &mut Ctx) -> Result<u32, DeviceError> {
            ctx.log.push("init");
            Ok(self.0)
        }

        fn device_update(&mut self, native: &mut u32, ctx: &mut Ctx) -> Result<(), DeviceError> {
            ctx.log.push("update");
            *native = self.0;
            Ok(())
        }

        fn device_release(&mut self, _native: u32, ctx: &mut Ctx) -> Result<(), DeviceError> {
            ctx.log.push("release");
            Ok(())
        }
    }

    fn render_loop() -> RenderLoop<Ctx> {
        RenderLoop::new(Renderer::new(RendererConfig::default()))
    }

    #[test]
    fn tick_drains_before_drawing() {
        let mut lp = render_loop();
        let handle: Handle<Counter, Ctx> = lp.producer().create(7);
        let view = handle.view();

        let seen = Arc::new(AtomicUsize::new(0));
        let sink = seen.clone();
        lp.add_renderable(move |frame: &mut FrameCtx<'_, Ctx>| {
            frame.ctx.log.push("draw");
            if let Some(v) = view.with_native(|n| *n) {
                sink.store(v as usize, Ordering::SeqCst);
            }
        });

        let mut ctx = Ctx::default();
        let report = lp.tick(&mut ctx);

        assert_eq!(ctx.log, vec!["init", "draw"]);
        assert_eq!(report.drained.initialized, 1);
        assert_eq!(report.drawn, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        drop(handle);
    }

    #[test]
    fn renderables_run_in_registration_order() {
        let mut lp = render_loop();
        lp.add_renderable(|f: &mut FrameCtx<'_, Ctx>| f.ctx.log.push("a"));
        lp.add_renderable(|f: &mut FrameCtx<'_, Ctx>| f.ctx.log.push("b"));

        let mut ctx = Ctx::default();
        lp.tick(&mut ctx);
        lp.tick(&mut ctx);

        assert_eq!(ctx.log, vec!["a", "b", "a", "b"]);
        assert_eq!(lp.stats().frames, 2);
    }

    #[test]
    fn shutdown_releases_handles_owned_by_renderables() {
        let mut lp = render_loop();
        let handle: Handle<Counter, Ctx> = lp.producer().create(1);
        let key = handle.key();
        lp.add_renderable(move |_: &mut FrameCtx<'_, Ctx>| {
            let _ = handle.state();
        });

        let mut ctx = Ctx::default();
        lp.tick(&mut ctx);
        let drained = lp.shutdown(&mut ctx);

        assert_eq!(drained.released, 1);
        assert_eq!(lp.renderables(), 0);
        assert_eq!(lp.renderer().state(key), ObjectState::Released);
        assert_eq!(ctx.log, vec!["init", "release"]);
    }
}
