use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info};

use crate::gpu::GpuState;
use crate::runtime::{time_source_for_policy, BoxedTimeSource, FrameState, RenderPolicy};
use crate::types::RendererConfig;

/// Owns the window and its GPU state. The GPU state is declared first so it
/// is dropped before the window its surface points at.
pub(crate) struct WindowState {
    gpu: GpuState,
    window: Arc<Window>,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let gpu = GpuState::new(
            window.as_ref(),
            window.inner_size(),
            &config.images,
            config.antialiasing,
            config.color_space,
        )?;
        Ok(Self { gpu, window })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }
}

/// Couples the render policy with its time source and tracks whether another
/// redraw should be requested.
pub(crate) struct RenderPolicyDriver {
    policy: RenderPolicy,
    time_source: BoxedTimeSource,
    rendered: bool,
    settled_logged: bool,
}

impl RenderPolicyDriver {
    pub(crate) fn new(policy: RenderPolicy) -> Self {
        Self {
            time_source: time_source_for_policy(&policy),
            policy,
            rendered: false,
            settled_logged: false,
        }
    }

    pub(crate) fn wants_redraw(&self) -> bool {
        match self.policy {
            RenderPolicy::Animate => true,
            RenderPolicy::Still { .. } => !self.rendered,
        }
    }

    pub(crate) fn mark_rendered(&mut self, state: &FrameState) {
        self.rendered = true;
        if state.is_settled() && !self.settled_logged {
            self.settled_logged = true;
            info!(elapsed_ms = state.elapsed_ms, "tear animation reached full progress");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum WindowCommand {
    Shutdown,
}

/// Cloneable handle that asks the window thread to close.
#[derive(Clone)]
pub struct StopHandle {
    proxy: EventLoopProxy<WindowCommand>,
}

impl StopHandle {
    /// Requests a clean shutdown; a no-op once the loop has exited.
    pub fn stop(&self) {
        let _ = self.proxy.send_event(WindowCommand::Shutdown);
    }
}

/// Runs the window, GPU context and frame loop on a dedicated thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    exited: Receiver<()>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Spawns the window thread and waits until the scene is ready to draw.
    ///
    /// Any failure while creating the window, GPU device, resources or
    /// pipelines is returned here and no frame is ever drawn.
    pub fn spawn(config: RendererConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (exit_tx, exit_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("tearframe-window".into())
            .spawn(move || {
                let result = run_window_thread(config, ready_tx);
                let _ = exit_tx.send(());
                result
            })
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = match ready_rx.recv() {
            Ok(Ok(proxy)) => proxy,
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(_) => {
                return match handle.join() {
                    Ok(Err(err)) => Err(err),
                    Ok(Ok(())) => Err(anyhow!("window thread exited before initialising")),
                    Err(err) => Err(anyhow!("window thread panicked: {err:?}")),
                };
            }
        };

        Ok(Self {
            proxy,
            exited: exit_rx,
            join_handle: Some(handle),
        })
    }

    /// Handle that can close the window from another thread while this
    /// runtime is blocked in [`WindowRuntime::wait`].
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            proxy: self.proxy.clone(),
        }
    }

    /// Blocks until the window closes, or until `limit` elapses, after which
    /// the loop is asked to stop through a [`StopHandle`].
    pub fn wait(mut self, limit: Option<Duration>) -> Result<()> {
        match limit {
            Some(limit) => match self.exited.recv_timeout(limit) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) => {
                    info!(?limit, "run time limit reached; stopping");
                    self.stop_handle().stop();
                }
            },
            None => {
                let _ = self.exited.recv();
            }
        }
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            self.stop_handle().stop();
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, anyhow::Error>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }

    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = match WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .with_resizable(false)
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let mut state = match WindowState::new(window, &config) {
        Ok(state) => state,
        Err(err) => {
            let wrapped = anyhow!("failed to initialise renderer: {err:#}");
            let _ = ready_tx.send(Err(anyhow!(wrapped.to_string())));
            return Err(wrapped);
        }
    };

    let size = state.gpu.size();
    info!(
        width = size.width,
        height = size.height,
        policy = ?config.policy,
        "scene ready"
    );

    let mut policy_driver = RenderPolicyDriver::new(config.policy.clone());
    state.window().request_redraw();
    let _ = ready_tx.send(Ok(proxy));

    let mut result = Ok(());
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(WindowCommand::Shutdown) => {
            elwt.exit();
        }
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::RedrawRequested => {
                    let sample = policy_driver.time_source.sample();
                    match state.gpu.render(sample) {
                        Ok(frame_state) => policy_driver.mark_rendered(&frame_state),
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            state.gpu.recover_surface();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            tracing::warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            tracing::warn!(error = ?other, "surface error; retrying next frame");
                        }
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            if policy_driver.wants_redraw() {
                state.window().request_redraw();
            }
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }

    result
}
