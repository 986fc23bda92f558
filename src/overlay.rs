use egui::{Color32, DragValue, Slider, ViewportId};
use winit::event::WindowEvent;
use winit::window::Window;

use crate::app::AppState;

const FIELD_SCALE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsBand {
    Good,
    Fair,
    Poor,
}

impl FpsBand {
    pub fn classify(fps: f32) -> Self {
        if fps >= 55.0 {
            FpsBand::Good
        } else if fps >= 40.0 {
            FpsBand::Fair
        } else {
            FpsBand::Poor
        }
    }

    pub fn color(self) -> Color32 {
        match self {
            FpsBand::Good => Color32::GREEN,
            FpsBand::Fair => Color32::YELLOW,
            FpsBand::Poor => Color32::RED,
        }
    }
}

/// Averages frame times over half-second windows.
#[derive(Debug, Default, Clone)]
pub struct FpsCounter {
    frames: u32,
    elapsed: f32,
    fps: f32,
}

impl FpsCounter {
    const WINDOW: f32 = 0.5;

    pub fn tick(&mut self, dt: f32) {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed >= Self::WINDOW {
            self.fps = self.frames as f32 / self.elapsed;
            self.frames = 0;
            self.elapsed = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    fps: FpsCounter,
}

impl Overlay {
    pub fn new(window: &Window) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );
        Self {
            ctx,
            state,
            fps: FpsCounter::default(),
        }
    }

    /// Returns `true` when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    pub fn tick(&mut self, dt: f32) {
        self.fps.tick(dt);
    }

    /// Builds this frame's widgets, writing edits straight into `app`.
    pub fn run(&mut self, window: &Window, app: &mut AppState) -> OverlayFrame {
        let raw_input = self.state.take_egui_input(window);
        let fps = self.fps.fps();
        let output = self.ctx.run(raw_input, |ctx| {
            scene_settings(ctx, app);
            camera_info(ctx, app, fps);
        });
        self.state
            .handle_platform_output(window, output.platform_output);
        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        OverlayFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }
}

fn scene_settings(ctx: &egui::Context, app: &mut AppState) {
    egui::Window::new("Scene settings").show(ctx, |ui| {
        let mut clear = app.clear_color.to_array();
        ui.horizontal(|ui| {
            ui.label("Background");
            ui.color_edit_button_rgb(&mut clear);
        });
        app.clear_color = clear.into();

        if let Some(field) = app.scene.instance_mut("field") {
            ui.horizontal(|ui| {
                ui.label("Field position");
                ui.add(DragValue::new(&mut field.translation.x).speed(0.05));
                ui.add(DragValue::new(&mut field.translation.y).speed(0.05));
                ui.add(DragValue::new(&mut field.translation.z).speed(0.05));
            });
            ui.add(Slider::new(&mut field.scale, FIELD_SCALE_RANGE).text("Field scale"));
        }

        ui.separator();
        let attenuation = &mut app.scene.lights.orbit.attenuation;
        ui.label("Point light attenuation");
        ui.add(Slider::new(&mut attenuation.constant, 0.0..=2.0).text("constant"));
        ui.add(Slider::new(&mut attenuation.linear, 0.0..=1.0).text("linear"));
        ui.add(Slider::new(&mut attenuation.quadratic, 0.0..=1.0).text("quadratic"));

        ui.separator();
        ui.checkbox(&mut app.bloom.enabled, "Bloom");
        ui.add(Slider::new(&mut app.bloom.exposure, 0.05..=5.0).text("Exposure"));
    });
}

fn camera_info(ctx: &egui::Context, app: &mut AppState, fps: f32) {
    egui::Window::new("Camera info").show(ctx, |ui| {
        let camera = &app.camera;
        let position = camera.position;
        let front = camera.front();
        ui.label(format!(
            "Position: ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        ));
        ui.label(format!("(yaw, pitch): ({:.1}, {:.1})", camera.yaw(), camera.pitch()));
        ui.label(format!(
            "Front: ({:.2}, {:.2}, {:.2})",
            front.x, front.y, front.z
        ));
        ui.checkbox(&mut app.camera_mouse_look, "Camera mouse update");
        ui.colored_label(FpsBand::classify(fps).color(), format!("FPS: {fps:.0}"));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_bands_follow_thresholds() {
        assert_eq!(FpsBand::classify(60.0), FpsBand::Good);
        assert_eq!(FpsBand::classify(55.0), FpsBand::Good);
        assert_eq!(FpsBand::classify(54.9), FpsBand::Fair);
        assert_eq!(FpsBand::classify(40.0), FpsBand::Fair);
        assert_eq!(FpsBand::classify(39.9), FpsBand::Poor);
        assert_eq!(FpsBand::Poor.color(), Color32::RED);
    }

    #[test]
    fn field_scale_slider_covers_the_layout_scale() {
        let app = AppState::new(&crate::RenderConfig::default());
        let field = app.scene.instance("field").unwrap();
        assert!(FIELD_SCALE_RANGE.contains(&field.scale));
        assert_eq!(FIELD_SCALE_RANGE, 0.1..=4.0);
    }

    #[test]
    fn fps_counter_averages_over_window() {
        let mut counter = FpsCounter::default();
        assert_eq!(counter.fps(), 0.0);
        for _ in 0..60 {
            counter.tick(0.01);
        }
        assert!((counter.fps() - 100.0).abs() < 1.0);
    }
}
