use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec2, Vec3};
use log::{error, info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{CursorGrabMode, WindowBuilder};

use farmstead::input::action_for;
use farmstead::{
    Action, AppState, KeyCode, Light, ModelId, NamedKey, Overlay, RenderConfig, Renderer,
};

const USAGE: &str = "Usage: farmstead [--resources <dir>] [--settings <file>] \
[--exposure <f32>] [--blur-passes <n>] [--summary-only]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = options.render_config();
    let settings_path = options
        .settings
        .clone()
        .unwrap_or_else(|| config.settings_path());

    let mut app = AppState::new(&config);
    if !app.load_settings(&settings_path) {
        info!("using default settings");
    }
    print_summary(&app);

    if options.summary_only {
        return app
            .save_settings(&settings_path)
            .with_context(|| format!("failed to save settings to {}", settings_path.display()));
    }
    run_interactive(config, app, settings_path)
}

fn print_summary(app: &AppState) {
    let lights = app.lights();
    println!(
        "Loaded scene with {} instances ({} lights)",
        app.scene.instances.len(),
        lights.len()
    );
    for model in ModelId::ALL {
        let count = app.scene.count(model);
        if count > 0 {
            println!(" - {model} x{count}");
        }
    }
    for light in &lights {
        match light {
            Light::Directional(sun) => println!(" - directional light towards {}", fmt_vec(sun.direction)),
            Light::Point(point) => println!(" - point light at {}", fmt_vec(point.position)),
            Light::Spot(spot) => println!(
                " - spot light at {} aimed {}",
                fmt_vec(spot.position),
                fmt_vec(spot.direction)
            ),
        }
    }
    println!(
        "Bloom {} (exposure {:.2}, {} blur passes)",
        if app.bloom.enabled { "on" } else { "off" },
        app.bloom.exposure,
        app.bloom.iterations
    );
}

fn fmt_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

fn run_interactive(config: RenderConfig, app: AppState, settings_path: PathBuf) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| WindowInitError::from_error("event loop", err))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Farmstead")
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );
    let renderer = block_on(Renderer::new(Arc::clone(&window), &config, &app.scene))
        .context("failed to initialize renderer")?;
    let overlay = Overlay::new(&window);

    let now = Instant::now();
    let mut frame_loop = FrameLoop {
        app,
        renderer,
        overlay,
        settings_path,
        started: now,
        last_frame: now,
        last_error: None,
    };
    frame_loop.apply_cursor_mode();

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop
        .run(|event, target| {
            if let Err(err) = frame_loop.process_event(event, target) {
                frame_loop.last_error = Some(err);
                target.exit();
            }
        })
        .context("event loop failed")?;

    frame_loop.shutdown();

    if let Some(err) = frame_loop.last_error {
        return Err(err);
    }
    Ok(())
}

struct FrameLoop {
    app: AppState,
    renderer: Renderer,
    overlay: Overlay,
    settings_path: PathBuf,
    started: Instant,
    last_frame: Instant,
    last_error: Option<anyhow::Error>,
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err} (use --summary-only without a display)"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

impl FrameLoop {
    fn process_event(&mut self, event: Event<()>, target: &EventLoopWindowTarget<()>) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if window_id == self.renderer.window_id() => {
                let consumed = self.app.overlay_enabled
                    && self.overlay.on_window_event(self.renderer.window(), &event);
                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(size) => self.renderer.resize(size)?,
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = self.renderer.window().inner_size();
                        self.renderer.resize(size)?;
                    }
                    WindowEvent::Focused(false) => self.app.input.release_all(),
                    WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event, consumed),
                    WindowEvent::MouseWheel { delta, .. } if !consumed => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                        };
                        self.app.handle_scroll(lines);
                    }
                    WindowEvent::RedrawRequested => self.redraw()?,
                    _ => {}
                }
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                self.app
                    .handle_mouse_motion(Vec2::new(delta.0 as f32, delta.1 as f32));
            }
            Event::AboutToWait => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        if self.app.exit_requested() {
            target.exit();
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, event: &KeyEvent, consumed: bool) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;
        // Presses egui consumed only reach the toggles; releases always pass.
        if consumed && pressed && action_for(key).is_none() {
            return;
        }
        if self.app.handle_key(key, pressed) == Some(Action::ToggleOverlay) {
            self.apply_cursor_mode();
        }
    }

    /// Captures the cursor for mouse look, or releases it to the overlay.
    fn apply_cursor_mode(&self) {
        let window = self.renderer.window();
        if self.app.overlay_enabled {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                warn!("unable to release cursor: {err}");
            }
            window.set_cursor_visible(true);
        } else {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(err) = grabbed {
                warn!("unable to capture cursor: {err}");
            }
            window.set_cursor_visible(false);
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        let time = now.duration_since(self.started).as_secs_f32();

        self.app.update(dt, time);
        self.overlay.tick(dt);
        let overlay = if self.app.overlay_enabled {
            Some(self.overlay.run(self.renderer.window(), &mut self.app))
        } else {
            None
        };

        if let Err(err) = self.renderer.render(&self.app, overlay) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size)?;
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Err(err) = self.app.save_settings(&self.settings_path) {
            error!("failed to save settings: {err:?}");
        }
    }
}

struct CliOptions {
    resources: PathBuf,
    settings: Option<PathBuf>,
    exposure: Option<f32>,
    blur_passes: Option<u32>,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            resources: PathBuf::from("resources"),
            settings: None,
            exposure: None,
            blur_passes: None,
            summary_only: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{name} expects a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--resources" => options.resources = PathBuf::from(value("--resources")?),
                "--settings" => options.settings = Some(PathBuf::from(value("--settings")?)),
                "--exposure" => {
                    let raw = value("--exposure")?;
                    let exposure: f32 = raw
                        .parse()
                        .with_context(|| format!("invalid exposure {raw:?}"))?;
                    if !(exposure > 0.0) {
                        bail!("exposure must be positive, got {exposure}");
                    }
                    options.exposure = Some(exposure);
                }
                "--blur-passes" => {
                    let raw = value("--blur-passes")?;
                    options.blur_passes = Some(
                        raw.parse()
                            .with_context(|| format!("invalid blur pass count {raw:?}"))?,
                    );
                }
                "--summary-only" => options.summary_only = true,
                other => bail!("Unknown argument: {other}\n{USAGE}"),
            }
        }
        Ok(options)
    }

    fn render_config(&self) -> RenderConfig {
        let mut config = RenderConfig {
            resources: self.resources.clone(),
            ..RenderConfig::default()
        };
        if let Some(exposure) = self.exposure {
            config.bloom.exposure = exposure;
        }
        if let Some(passes) = self.blur_passes {
            config.bloom.iterations = passes;
        }
        config
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    use WinitKey as Key;
    Some(match code {
        Key::KeyW => KeyCode::Character('W'),
        Key::KeyA => KeyCode::Character('A'),
        Key::KeyS => KeyCode::Character('S'),
        Key::KeyD => KeyCode::Character('D'),
        Key::KeyB => KeyCode::Character('B'),
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::F1 => KeyCode::Function(1),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse_from(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn flags_override_render_config() {
        let options = parse(&["--exposure", "0.5", "--blur-passes", "4", "--resources", "assets"]).unwrap();
        let config = options.render_config();
        assert_eq!(config.bloom.exposure, 0.5);
        assert_eq!(config.bloom.iterations, 4);
        assert_eq!(config.settings_path(), PathBuf::from("assets/program_state.txt"));
        assert!(!options.summary_only);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(parse(&["--exposure"]).is_err());
        assert!(parse(&["--exposure", "-1"]).is_err());
        assert!(parse(&["--blur-passes", "many"]).is_err());
    }

    #[test]
    fn maps_bound_keys() {
        assert_eq!(map_keycode(WinitKey::KeyW), Some(KeyCode::Character('W')));
        assert_eq!(map_keycode(WinitKey::F1), Some(KeyCode::Function(1)));
        assert_eq!(
            map_keycode(WinitKey::ControlLeft),
            Some(KeyCode::Named(NamedKey::LeftCtrl))
        );
        assert_eq!(map_keycode(WinitKey::NumpadAdd), None);
        assert_eq!(map_keycode(WinitKey::KeyQ), None);
        assert_eq!(map_keycode(WinitKey::F2), None);
    }
}
