//! Ties a window, an input handler, a scene and the frame orchestrator
//! together into a runnable `winit` application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

use crate::action::{Action, LOOK_SPEED, ORBIT_SPEED};
use crate::graphics::{Screen, Window};
use crate::inputs::InputHandler;
use crate::orchestrator::Orchestrator;
use crate::scene::Scene;

/// Mouse-motion sensitivity, radians per pixel of raw delta.
const MOUSE_SENSITIVITY: f32 = 0.0015;

/// Owns the window, the presentable screen, input state, the scene being
/// rendered and the orchestrator that rasterizes it every frame.
pub struct App {
    window: Window,
    screen: Screen,
    input_state: InputHandler,
    scene: Scene,
    orchestrator: Orchestrator,
    name: String,
    /// Flipped to `false` by [`WindowEvent::CloseRequested`]; polled from
    /// inside the orchestrator's busy-wait so a close request mid-frame
    /// doesn't have to wait for the frame to finish before being noticed.
    running: Arc<AtomicBool>,
}

impl App {
    /// Builds an app around an already-constructed scene and orchestrator,
    /// sized to `width x height`. The window itself isn't created until
    /// [`ApplicationHandler::resumed`] runs.
    pub fn new(name: impl Into<String>, width: u32, height: u32, scene: Scene, orchestrator: Orchestrator) -> Self {
        App {
            window: Window::new(width, height),
            screen: Screen::new(width, height),
            input_state: InputHandler::new(),
            scene,
            orchestrator,
            name: name.into(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Applies every action collected this frame to the camera, light and
    /// orchestrator debug-overlay toggles. Returns `false` if
    /// [`Action::Quit`] was among them.
    fn handle_actions(&mut self) -> bool {
        let actions = self.input_state.collect_actions();
        let mut keep_running = true;
        for action in actions {
            match action {
                Action::YawLeft => self.scene.camera.add_yaw(-LOOK_SPEED),
                Action::YawRight => self.scene.camera.add_yaw(LOOK_SPEED),
                Action::PitchUp => self.scene.camera.add_pitch(LOOK_SPEED),
                Action::PitchDown => self.scene.camera.add_pitch(-LOOK_SPEED),
                Action::OrbitLightLeft => self.scene.light.add_orbit_y(-ORBIT_SPEED),
                Action::OrbitLightRight => self.scene.light.add_orbit_y(ORBIT_SPEED),
                Action::OrbitLightUp => self.scene.light.add_orbit_x(-ORBIT_SPEED),
                Action::OrbitLightDown => self.scene.light.add_orbit_x(ORBIT_SPEED),
                Action::FovIncrease => self.scene.camera.step_fov(1.0),
                Action::FovDecrease => self.scene.camera.step_fov(-1.0),
                Action::ToggleWireframe => self.orchestrator.wireframe = !self.orchestrator.wireframe,
                Action::ToggleTileBorders => self.orchestrator.show_tile_borders = !self.orchestrator.show_tile_borders,
                Action::ToggleLightMarker => self.orchestrator.show_light_marker = !self.orchestrator.show_light_marker,
                Action::Quit => keep_running = false,
                Action::Look { yaw_delta, pitch_delta } => {
                    self.scene.camera.add_yaw(yaw_delta);
                    self.scene.camera.add_pitch(pitch_delta);
                }
            }
        }
        keep_running
    }

    /// Renders one frame into the screen's presentable buffer and submits it.
    fn render(&mut self) {
        let Some(frame) = self.screen.frame_mut() else { return };
        let running = &self.running;
        let result = self.orchestrator.render_frame(&self.scene, frame, || running.load(Ordering::Relaxed));
        if let Err(e) = result {
            warn!("frame dropped: {e}");
            return;
        }
        if let Some(pixels) = self.screen.pixels_mut() {
            if let Err(e) = pixels.render() {
                error!("presenting frame failed: {e}");
            }
        }
        if let Some(title) = self.orchestrator.record_frame_for_pacing(&self.name) {
            self.window.set_title(&title);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.window.initialize_window(event_loop, &self.name) {
            error!("failed to create window: {e}");
            event_loop.exit();
            return;
        }
        let winit_window = self.window.winit_window().expect("just initialized").clone();
        if let Err(e) = self.screen.initialize_pixels(winit_window) {
            error!("failed to initialize presentation surface: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.running.store(false, Ordering::Relaxed);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(pixels) = self.screen.pixels_mut() {
                    if let Err(e) = pixels.resize_surface(size.width, size.height) {
                        error!("failed to resize presentation surface: {e}");
                    }
                }
                self.scene.camera.set_aspect_ratio(size.width as f32 / size.height as f32);
                self.orchestrator.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = self.window.winit_window() {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let winit::keyboard::PhysicalKey::Code(key_code) = event.physical_key else { return };
                match event.state {
                    ElementState::Pressed => self.input_state.press_key(key_code),
                    ElementState::Released => self.input_state.release_key(key_code),
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            let look = self.input_state.look_action(delta.0, delta.1, MOUSE_SENSITIVITY);
            if let Action::Look { yaw_delta, pitch_delta } = look {
                self.scene.camera.add_yaw(yaw_delta);
                self.scene.camera.add_pitch(pitch_delta);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.handle_actions() {
            self.running.store(false, Ordering::Relaxed);
            event_loop.exit();
            return;
        }
        if let Some(window) = self.window.winit_window() {
            window.request_redraw();
        }
    }
}
