use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::render::{LoopStats, RenderLoop};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Color the surface is cleared to before draw callbacks run.
    pub clear_color: wgpu::Color,
    /// Redraw every time the event loop goes idle instead of on demand.
    pub continuous_redraw: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "nabu".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            clear_color: wgpu::Color::BLACK,
            continuous_redraw: true,
        }
    }
}

/// Entry point for the window runtime.
///
/// The thread calling [`run`](Self::run) owns the window, the [`Gpu`] and the
/// render loop, and therefore is the render thread. Producers obtained from the
/// loop before calling `run` keep working from other threads.
pub struct Runtime;

impl Runtime {
    /// Runs the event loop until the window closes, then shuts the renderer
    /// down and returns the loop statistics.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, render_loop: RenderLoop<Gpu>) -> Result<LoopStats> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState {
            config,
            gpu_init,
            render_loop,
            gpu: None,
            error: None,
            shut_down: false,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(e) => Err(e),
            None => Ok(state.render_loop.stats()),
        }
    }
}

struct RuntimeState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    render_loop: RenderLoop<Gpu>,
    gpu: Option<Gpu>,
    error: Option<anyhow::Error>,
    shut_down: bool,
}

impl RuntimeState {
    fn create_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu = pollster::block_on(Gpu::new(Arc::new(window), self.gpu_init.clone()))
            .context("GPU initialization failed for window")?;

        gpu.window().request_redraw();
        self.gpu = Some(gpu);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error.get_or_insert(error);
        self.shutdown();
        event_loop.exit();
    }

    /// Drives one frame: acquire, tick (drain + draw), present.
    ///
    /// The loop still ticks when no surface frame is available (minimized
    /// window, transient surface errors) so queued work keeps draining.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let size = gpu.size();
        if size.width > 0 && size.height > 0 {
            if let Err(err) = gpu.begin_frame(self.config.clear_color) {
                if gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                    self.fail(event_loop, anyhow!("fatal surface error"));
                    return;
                }
            }
        }

        self.render_loop.tick(gpu);
        gpu.present();
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(gpu) = self.gpu.as_mut() {
            self.render_loop.shutdown(gpu);
        }
        self.gpu = None;
    }
}

impl ApplicationHandler for RuntimeState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() || self.shut_down {
            return;
        }

        if let Err(e) = self.create_gpu(event_loop) {
            self.fail(event_loop, e);
            return;
        }
        self.render_loop.reset_clock();
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if self.config.continuous_redraw {
            if let Some(gpu) = &self.gpu {
                gpu.window().request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size);
                    gpu.window().request_redraw();
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(gpu) = self.gpu.as_mut() {
                    let new_size = gpu.window().inner_size();
                    gpu.resize(new_size);
                    gpu.window().request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
