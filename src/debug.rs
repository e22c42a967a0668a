//! Debug HUD drawn with egui.
//!
//! Only compiled with the `egui` feature. The HUD is painted as host content:
//! after post-processing and before the cursor overlay.

use winit::window::Window;

use crate::scene::EffectsLayer;

/// Numbers shown by the HUD, sampled once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudStats {
    pub fps: f32,
    pub elapsed: f32,
    pub trail_len: usize,
    pub particles: usize,
    pub stars: usize,
    pub hovering: bool,
    pub interactable: bool,
}

impl HudStats {
    pub fn from_layer(layer: &EffectsLayer) -> Self {
        Self {
            fps: layer.clock().fps(),
            elapsed: layer.elapsed(),
            trail_len: layer.cursor().trail_len(),
            particles: layer.particles().len(),
            stars: layer.starfield().len(),
            hovering: layer.cursor().state().is_hovering,
            interactable: layer.is_interactable(),
        }
    }

    pub fn mode(&self) -> &'static str {
        if self.interactable {
            "interactable"
        } else {
            "decorative"
        }
    }
}

/// egui context, winit glue and wgpu renderer for the HUD.
pub struct DebugHud {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    visible: bool,
}

impl DebugHud {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Window) -> Self {
        let ctx = egui::Context::default();

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, output_format, None, 1, false);

        Self {
            ctx,
            state,
            renderer,
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("Debug HUD {}", if self.visible { "shown" } else { "hidden" });
    }

    /// Feed a window event to egui. Returns `true` if the HUD consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        if !self.visible {
            return false;
        }
        self.state.on_window_event(window, event).consumed
    }

    /// Build and paint one HUD frame on top of `view`.
    pub fn paint(
        &mut self,
        window: &Window,
        stats: &HudStats,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let raw_input = self.state.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| {
            egui::Window::new("backdrop")
                .resizable(false)
                .default_pos([12.0, 12.0])
                .show(ctx, |ui| {
                    ui.label(format!("FPS: {:.0}", stats.fps));
                    ui.label(format!("Time: {:.1}s", stats.elapsed));
                    ui.separator();
                    ui.label(format!("Trail points: {}", stats.trail_len));
                    ui.label(format!("Particles: {}", stats.particles));
                    ui.label(format!("Stars: {}", stats.stars));
                    ui.label(format!("Hovering: {}", stats.hovering));
                    ui.label(format!("Mode: {}", stats.mode()));
                });
        });

        self.state.handle_platform_output(window, output.platform_output);
        let paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);

        let size = window.inner_size();
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: output.pixels_per_point,
        };

        for (id, delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer.update_buffers(device, queue, encoder, &paint_jobs, &screen);

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Debug HUD Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &paint_jobs, &screen);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
