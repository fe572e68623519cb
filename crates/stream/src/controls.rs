use std::time::Duration;

use glam::{DVec2, DVec3};
use tilestream_bus::{BusError, EventBus};

use crate::camera::OrthoCamera;
use crate::config::ControlsConfig;

/// What the panning side of the controls is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanState {
    /// Waiting; auto-pan starts once the idle timeout elapses.
    Idle,
    /// A drag is in progress.
    Dragging,
    /// Drifting on its own until the next drag or reset.
    Animating,
}

/// Top-down drag, wheel and idle auto-pan driver for an [`OrthoCamera`].
///
/// Drag deltas are in viewport pixels and are converted to world units
/// through the visible extent, so a drag moves the ground under the
/// pointer by the same amount at every zoom level. After
/// [`ControlsConfig::idle_secs`] without a drag the camera starts drifting
/// along its right axis, which keeps new tiles streaming in. The drift is
/// paused while the view is hidden.
#[derive(Debug)]
pub struct TopDownControls {
    camera: OrthoCamera,
    config: ControlsConfig,
    state: PanState,
    idle: Duration,
    visible: bool,
    drag_from: Option<DVec2>,
}

impl TopDownControls {
    pub fn new(camera: OrthoCamera, config: ControlsConfig) -> Self {
        Self {
            camera,
            config,
            state: PanState::Idle,
            idle: Duration::ZERO,
            visible: true,
            drag_from: None,
        }
    }

    /// Connect the underlying camera to the bus.
    pub fn connect(&mut self, bus: &mut EventBus) -> Result<(), BusError> {
        self.camera.connect(bus)
    }

    pub fn camera(&self) -> &OrthoCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrthoCamera {
        &mut self.camera
    }

    pub fn state(&self) -> PanState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Pointer pressed at `at` (viewport pixels).
    pub fn drag_start(&mut self, at: DVec2) {
        self.drag_from = Some(at);
    }

    /// Pointer moved to `at` while pressed. Leaves idle or animating.
    pub fn drag_to(&mut self, at: DVec2) -> Result<bool, BusError> {
        self.state = PanState::Dragging;
        let from = self.drag_from.replace(at).unwrap_or(at);
        let delta = (at - from) * self.config.pan_speed;
        self.pan_pixels(delta)
    }

    /// Pointer released. Restarts the idle timer.
    pub fn drag_end(&mut self) {
        self.drag_from = None;
        if self.state == PanState::Dragging {
            self.enter_idle();
        }
    }

    /// Wheel step: negative `delta_y` zooms in, positive zooms out.
    pub fn wheel(&mut self, delta_y: f64) -> Result<bool, BusError> {
        if delta_y < 0.0 {
            self.camera.dolly_in()
        } else if delta_y > 0.0 {
            self.camera.dolly_out()
        } else {
            Ok(false)
        }
    }

    /// Camera back to its start and panning back to idle.
    pub fn reset(&mut self) -> Result<bool, BusError> {
        self.drag_from = None;
        self.enter_idle();
        self.camera.reset()
    }

    pub fn set_visible(&mut self, visible: bool) {
        if visible != self.visible {
            tracing::debug!(visible, "view visibility changed");
        }
        self.visible = visible;
    }

    /// Advance time by `dt`. Returns whether the camera moved.
    pub fn tick(&mut self, dt: Duration) -> Result<bool, BusError> {
        match self.state {
            PanState::Dragging => Ok(false),
            PanState::Idle => {
                self.idle += dt;
                if self.idle.as_secs_f64() >= self.config.idle_secs {
                    self.state = PanState::Animating;
                    tracing::debug!(idle_ms = self.idle.as_millis() as u64, "auto-pan started");
                }
                Ok(false)
            }
            PanState::Animating if !self.visible => Ok(false),
            PanState::Animating => {
                let ms = dt.as_secs_f64() * 1000.0;
                self.pan_pixels(DVec2::new(-ms * self.config.auto_pan_rate, 0.0))
            }
        }
    }

    fn enter_idle(&mut self) {
        self.state = PanState::Idle;
        self.idle = Duration::ZERO;
    }

    /// Dragging right moves the camera left so the ground follows the
    /// pointer; dragging down moves it up.
    fn pan_pixels(&mut self, delta: DVec2) -> Result<bool, BusError> {
        let (width, height) = self.camera.visible_extent();
        let world_x = delta.x * width / self.config.viewport_width;
        let world_y = delta.y * height / self.config.viewport_height;
        let (right, up) = self.camera.axes();
        let offset: DVec3 = -right * world_x + up * world_y;
        self.camera.translate(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::events::{CAMERA_CHANGED, CameraChanged};

    fn controls() -> TopDownControls {
        TopDownControls::new(OrthoCamera::new(CameraConfig::default()), ControlsConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// World units per viewport pixel horizontally at zoom 1.
    fn world_per_px() -> f64 {
        20.0 * 16.0 / 9.0 / 1280.0
    }

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn idle_timeout_starts_auto_pan() {
        let mut c = controls();
        assert!(!c.tick(ms(1500)).unwrap());
        assert_eq!(c.state(), PanState::Idle);
        assert!(!c.tick(ms(500)).unwrap());
        assert_eq!(c.state(), PanState::Animating);
        assert_eq!(c.camera().target(), DVec3::ZERO);

        assert!(c.tick(ms(100)).unwrap());
        let (right, _) = c.camera().axes();
        let expected = right * (100.0 * 0.1 * world_per_px());
        assert!(close(c.camera().target(), expected), "{}", c.camera().target());
    }

    #[test]
    fn auto_pan_drifts_east_and_north() {
        let mut c = controls();
        c.tick(ms(2000)).unwrap();
        c.tick(ms(1000)).unwrap();
        let target = c.camera().target();
        assert!(target.x > 0.0);
        assert!(target.z < 0.0);
        assert!(target.y.abs() < 1e-12);
    }

    #[test]
    fn drag_moves_ground_with_the_pointer() {
        let config = ControlsConfig {
            pan_speed: 2.0,
            ..ControlsConfig::default()
        };
        let mut c = TopDownControls::new(OrthoCamera::new(CameraConfig::default()), config);
        c.drag_start(DVec2::new(100.0, 100.0));
        assert!(c.drag_to(DVec2::new(164.0, 100.0)).unwrap());
        assert_eq!(c.state(), PanState::Dragging);

        let (right, _) = c.camera().axes();
        let expected = -right * (128.0 * world_per_px());
        assert!(close(c.camera().target(), expected));
    }

    #[test]
    fn drag_distance_scales_with_zoom() {
        let mut c = controls();
        c.wheel(-1.0).unwrap();
        c.drag_start(DVec2::ZERO);
        c.drag_to(DVec2::new(0.0, 72.0)).unwrap();
        let (_, up) = c.camera().axes();
        let expected = up * (72.0 * 20.0 * 0.95 / 720.0);
        assert!(close(c.camera().target(), expected));
    }

    #[test]
    fn dragging_holds_off_auto_pan_until_idle_again() {
        let mut c = controls();
        c.tick(ms(2000)).unwrap();
        assert_eq!(c.state(), PanState::Animating);

        c.drag_start(DVec2::ZERO);
        c.drag_to(DVec2::new(10.0, 0.0)).unwrap();
        let held = c.camera().target();
        assert!(!c.tick(ms(5000)).unwrap());
        assert_eq!(c.camera().target(), held);

        c.drag_end();
        assert_eq!(c.state(), PanState::Idle);
        assert!(!c.tick(ms(1900)).unwrap());
        assert_eq!(c.state(), PanState::Idle);
        c.tick(ms(100)).unwrap();
        assert_eq!(c.state(), PanState::Animating);
    }

    #[test]
    fn hidden_view_pauses_auto_pan() {
        let mut c = controls();
        c.tick(ms(2000)).unwrap();
        c.set_visible(false);
        assert!(!c.tick(ms(500)).unwrap());
        assert_eq!(c.camera().target(), DVec3::ZERO);
        assert_eq!(c.state(), PanState::Animating);

        c.set_visible(true);
        assert!(c.tick(ms(16)).unwrap());
    }

    #[test]
    fn reset_returns_to_idle_at_origin() {
        let mut c = controls();
        c.tick(ms(2000)).unwrap();
        c.tick(ms(250)).unwrap();
        c.wheel(1.0).unwrap();
        assert!(c.reset().unwrap());
        assert_eq!(c.state(), PanState::Idle);
        assert_eq!(c.camera().target(), DVec3::ZERO);
        assert_eq!(c.camera().zoom(), 1.0);
        assert!(!c.tick(ms(1000)).unwrap());
    }

    #[test]
    fn wheel_direction_picks_dolly() {
        let mut c = controls();
        assert!(c.wheel(-3.0).unwrap());
        assert!(c.camera().zoom() > 1.0);
        assert!(!c.wheel(0.0).unwrap());
        c.wheel(1.0).unwrap();
        c.wheel(1.0).unwrap();
        assert!(c.camera().zoom() < 1.0);
    }

    #[test]
    fn each_animated_frame_publishes_one_change() {
        let mut bus = EventBus::new();
        let mut c = controls();
        c.connect(&mut bus).unwrap();
        let changes = bus.subscribe::<CameraChanged>(CAMERA_CHANGED).unwrap();
        c.tick(ms(2000)).unwrap();
        for _ in 0..3 {
            c.tick(ms(16)).unwrap();
        }
        bus.pump();
        assert_eq!(changes.pending(), 3);
    }
}
