//! Native host: one winit window with the effects layer behind a demo page.
//!
//! The host owns the [`EffectsLayer`], forwards pointer events to it in
//! logical pixels, polls the decay timer on every wakeup and renders once
//! per redraw. Between wakeups the loop sleeps until the next decay
//! deadline. GPU failures never stop the host; it keeps updating the layer
//! and simply draws nothing.
//!
//! Keys: `Esc` quits, `I` toggles interactable mode, `R` remounts, `Space`
//! pauses, `[` and `]` halve and double the animation speed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::EffectsConfig;
use crate::cursor::{ElementRole, HitTest, RegionMap};
#[cfg(feature = "egui")]
use crate::debug::{DebugHud, HudStats};
use crate::error::EffectsError;
use crate::gpu::Renderer;
use crate::scene::EffectsLayer;

/// Mount `config` and run the host until the window closes.
pub fn run(config: EffectsConfig) -> Result<(), EffectsError> {
    let mut app = App::new(config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    event_loop.run_app(&mut app)?;

    match app.exit_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Frame period used to keep animating when there is no renderer to pace
/// redraws.
const HEADLESS_FRAME: Duration = Duration::from_millis(16);

const MIN_TIME_SCALE: f32 = 0.125;
const MAX_TIME_SCALE: f32 = 8.0;

/// When the event loop should wake next: at the decay deadline, or sooner
/// if the layer must be ticked without a renderer.
fn wakeup(now: Instant, deadline: Option<Instant>, headless_animating: bool) -> ControlFlow {
    let frame = headless_animating.then(|| now + HEADLESS_FRAME);
    match (deadline, frame) {
        (Some(d), Some(f)) => ControlFlow::WaitUntil(d.min(f)),
        (Some(at), None) | (None, Some(at)) => ControlFlow::WaitUntil(at),
        (None, None) => ControlFlow::Wait,
    }
}

/// Hit regions standing in for page content: a header with two links and
/// a call-to-action button in the middle of the page.
pub fn demo_page(width: f32, height: f32) -> RegionMap {
    let header = 64.0;
    let cta = Vec2::new(220.0, 56.0);
    let center = Vec2::new(width * 0.5, height * 0.5);

    RegionMap::new()
        .with_region(Vec2::ZERO, Vec2::new(width, header), ElementRole::Other, &[])
        .with_region(
            Vec2::new(width - 260.0, 16.0),
            Vec2::new(width - 150.0, 48.0),
            ElementRole::Link,
            &[ElementRole::Other],
        )
        .with_region(
            Vec2::new(width - 130.0, 16.0),
            Vec2::new(width - 20.0, 48.0),
            ElementRole::Link,
            &[ElementRole::Other],
        )
        .with_region(center - cta * 0.5, center + cta * 0.5, ElementRole::Button, &[])
}

struct App {
    layer: EffectsLayer,
    page: RegionMap,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    #[cfg(feature = "egui")]
    hud: Option<DebugHud>,
    exit_error: Option<EffectsError>,
}

impl App {
    fn new(config: EffectsConfig) -> Result<Self, EffectsError> {
        let layer = EffectsLayer::mount(config)?;
        Ok(Self {
            layer,
            page: demo_page(1280.0, 720.0),
            window: None,
            renderer: None,
            #[cfg(feature = "egui")]
            hud: None,
            exit_error: None,
        })
    }

    fn scale_factor(&self) -> f64 {
        self.window.as_ref().map_or(1.0, |w| w.scale_factor())
    }

    /// Navigate away and back: dispose the current layer, mount a fresh one
    /// with the same configuration and reload the GPU buffers.
    fn remount(&mut self) {
        let mut config = self.layer.config().clone();
        config.scene.interactable = self.layer.is_interactable();
        self.layer.dispose();

        match EffectsLayer::mount(config) {
            Ok(layer) => {
                self.layer = layer;
                if let Some(renderer) = &mut self.renderer {
                    renderer.load_scene(&self.layer);
                }
                log::debug!("Remounted effects layer");
            }
            Err(e) => log::warn!("Remount failed, layer stays disposed: {}", e),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyI => {
                let interactable = !self.layer.is_interactable();
                self.layer.set_interactable(interactable);
            }
            KeyCode::KeyR => self.remount(),
            KeyCode::Space => {
                if self.layer.is_paused() {
                    self.layer.resume();
                } else {
                    self.layer.pause();
                }
            }
            KeyCode::BracketLeft | KeyCode::BracketRight => {
                let factor = if code == KeyCode::BracketRight { 2.0 } else { 0.5 };
                let scale = (self.layer.clock().time_scale() * factor).clamp(MIN_TIME_SCALE, MAX_TIME_SCALE);
                self.layer.set_time_scale(scale);
            }
            #[cfg(feature = "egui")]
            KeyCode::F3 => {
                if let Some(hud) = &mut self.hud {
                    hud.toggle();
                }
            }
            _ => {}
        }
    }

    fn is_animating(&self) -> bool {
        self.layer.is_mounted() && !self.layer.is_paused()
    }

    fn redraw(&mut self) {
        self.layer.tick();

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        #[cfg(feature = "egui")]
        let result = match (self.hud.as_mut(), self.window.as_ref()) {
            (Some(hud), Some(window)) if hud.is_visible() => {
                let stats = HudStats::from_layer(&self.layer);
                let content: crate::gpu::ContentLayer<'_> = &mut |device, queue, encoder, view| {
                    hud.paint(window, &stats, device, queue, encoder, view)
                };
                renderer.render(&self.layer, Some(content))
            }
            _ => renderer.render(&self.layer, None),
        };
        #[cfg(not(feature = "egui"))]
        let result = renderer.render(&self.layer, None);

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
            Err(wgpu::SurfaceError::Timeout) => log::debug!("Surface timed out, skipping frame"),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::warn!("GPU out of memory, continuing without rendering");
                self.renderer = None;
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("backdrop")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.exit_error = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        let logical = window.inner_size().to_logical::<f32>(window.scale_factor());
        self.page = demo_page(logical.width, logical.height);

        match pollster::block_on(Renderer::new(window.clone(), &self.layer)) {
            Ok(renderer) => {
                #[cfg(feature = "egui")]
                {
                    self.hud = Some(DebugHud::new(renderer.device(), renderer.surface_format(), &window));
                }
                self.renderer = Some(renderer);
            }
            Err(e) => log::warn!("Rendering disabled: {}", e),
        }

        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let (Some(hud), Some(window)) = (self.hud.as_mut(), self.window.as_ref()) {
            if hud.on_window_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.layer.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
                let logical = size.to_logical::<f32>(self.scale_factor());
                self.page = demo_page(logical.width, logical.height);
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(self.scale_factor());
                let pos = Vec2::new(logical.x, logical.y);
                self.layer.handle_pointer_move(pos.x, pos.y);
                self.layer.handle_pointer_over(self.page.target_at(pos));
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.layer.handle_pointer_button(state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.layer.handle_scroll(scroll);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let ticks = self.layer.poll_timers(now);
        let animating = self.is_animating();

        match (&self.window, &self.renderer) {
            // Presenting with vsync paces these redraws.
            (Some(window), Some(_)) if animating || ticks > 0 => window.request_redraw(),
            (_, None) if animating => self.layer.tick(),
            _ => {}
        }

        let headless = self.renderer.is_none() && animating;
        event_loop.set_control_flow(wakeup(now, self.layer.next_timer_deadline(), headless));
    }
}
