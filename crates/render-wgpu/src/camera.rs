use glam::{Mat4, Vec3};
use heightfield_common::CameraConfig;
use heightfield_input::MoveIntent;
use heightfield_mesh::Bounds;
use heightfield_render::RenderView;

const MIN_FOV_DEGREES: f32 = 1.0;
const MAX_FOV_DEGREES: f32 = 90.0;

/// Fly camera with position, yaw, pitch, and projection parameters.
/// Angles are in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl FlyCamera {
    /// Camera from config. Without a configured position it sits at
    /// `(0, 100, 100)`; call [`FlyCamera::frame_bounds`] to fit the terrain.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: config.position.unwrap_or(Vec3::new(0.0, 100.0, 100.0)),
            yaw: config.yaw_degrees.to_radians(),
            pitch: config.pitch_degrees.to_radians(),
            fov: config.fov_degrees.to_radians(),
            aspect: 16.0 / 9.0,
            near: config.near,
            far: config.far,
            speed: config.speed,
            sensitivity: config.sensitivity,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn move_forward(&mut self, dt: f32) {
        let fwd = self.forward();
        self.position += fwd * self.speed * dt;
    }

    pub fn move_backward(&mut self, dt: f32) {
        let fwd = self.forward();
        self.position -= fwd * self.speed * dt;
    }

    pub fn move_left(&mut self, dt: f32) {
        let right = self.right();
        self.position -= right * self.speed * dt;
    }

    pub fn move_right(&mut self, dt: f32) {
        let right = self.right();
        self.position += right * self.speed * dt;
    }

    pub fn move_up(&mut self, dt: f32) {
        self.position.y += self.speed * dt;
    }

    pub fn move_down(&mut self, dt: f32) {
        self.position.y -= self.speed * dt;
    }

    /// Apply one frame of held movement.
    pub fn apply_movement(&mut self, intent: &MoveIntent, dt: f32) {
        if intent.is_idle() {
            return;
        }
        let dt = dt * intent.speed_multiplier;
        let offset = self.right() * intent.axes.x
            + Vec3::Y * intent.axes.y
            + self.forward() * intent.axes.z;
        self.position += offset * self.speed * dt;
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Narrow (positive `delta`) or widen the field of view, in degrees.
    pub fn zoom(&mut self, delta: f32) {
        let fov = self.fov.to_degrees() - delta;
        self.fov = fov.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES).to_radians();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Turn to face `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = target - self.position;
        if dir.length_squared() <= f32::EPSILON {
            return;
        }
        let dir = dir.normalize();
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir
            .y
            .asin()
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Place the camera above and behind `bounds`, looking at its centre.
    pub fn frame_bounds(&mut self, bounds: &Bounds) {
        let view = RenderView::framing_bounds(bounds);
        self.position = view.eye;
        self.look_at(view.target);
        let size = bounds.size();
        self.far = self.far.max(size.x.max(size.z).max(1.0) * 4.0);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Backend-neutral description of this camera.
    pub fn render_view(&self) -> RenderView {
        RenderView {
            eye: self.position,
            target: self.position + self.forward(),
            fov_degrees: self.fov.to_degrees(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = FlyCamera::default();
        assert!(cam.position.y > 0.0);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn camera_movement() {
        let mut cam = FlyCamera::default();
        let start = cam.position;
        cam.move_forward(1.0);
        assert_ne!(cam.position, start);
    }

    fn level_camera() -> FlyCamera {
        FlyCamera {
            position: Vec3::ZERO,
            yaw: -90.0_f32.to_radians(),
            pitch: 0.0,
            speed: 10.0,
            ..FlyCamera::default()
        }
    }

    #[test]
    fn each_move_goes_its_own_way() {
        let dt = 0.5;
        let step = 10.0 * dt;
        let cases: [(fn(&mut FlyCamera, f32), Vec3); 6] = [
            (FlyCamera::move_forward, Vec3::new(0.0, 0.0, -step)),
            (FlyCamera::move_backward, Vec3::new(0.0, 0.0, step)),
            (FlyCamera::move_left, Vec3::new(-step, 0.0, 0.0)),
            (FlyCamera::move_right, Vec3::new(step, 0.0, 0.0)),
            (FlyCamera::move_up, Vec3::new(0.0, step, 0.0)),
            (FlyCamera::move_down, Vec3::new(0.0, -step, 0.0)),
        ];
        for (i, (movement, expected)) in cases.iter().enumerate() {
            let mut cam = level_camera();
            movement(&mut cam, dt);
            assert!(
                cam.position.abs_diff_eq(*expected, 1e-4),
                "case {i}: got {:?}, expected {:?}",
                cam.position,
                expected
            );
        }
    }

    #[test]
    fn diagonal_intent_combines_strafe_and_forward() {
        let mut cam = level_camera();
        cam.apply_movement(
            &MoveIntent {
                axes: Vec3::new(1.0, 0.0, 1.0),
                speed_multiplier: 1.0,
            },
            0.5,
        );
        assert!(cam.position.abs_diff_eq(Vec3::new(5.0, 0.0, -5.0), 1e-4));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = FlyCamera::default();
        cam.rotate(0.0, -1.0e6);
        assert!(cam.pitch <= 89.0_f32.to_radians());
        cam.rotate(0.0, 1.0e6);
        assert!(cam.pitch >= -89.0_f32.to_radians());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = FlyCamera::default();
        cam.zoom(1000.0);
        assert!((cam.fov.to_degrees() - MIN_FOV_DEGREES).abs() < 1e-3);
        cam.zoom(-1000.0);
        assert!((cam.fov.to_degrees() - MAX_FOV_DEGREES).abs() < 1e-3);
    }

    #[test]
    fn idle_intent_does_not_move() {
        let mut cam = FlyCamera::default();
        let start = cam.position;
        cam.apply_movement(
            &MoveIntent {
                axes: Vec3::ZERO,
                speed_multiplier: 3.0,
            },
            1.0,
        );
        assert_eq!(cam.position, start);
    }

    #[test]
    fn upward_intent_rises_by_speed() {
        let mut cam = FlyCamera::default();
        let start = cam.position;
        cam.apply_movement(
            &MoveIntent {
                axes: Vec3::Y,
                speed_multiplier: 2.0,
            },
            0.5,
        );
        assert!((cam.position.y - (start.y + cam.speed)).abs() < 1e-3);
    }

    #[test]
    fn look_at_faces_target() {
        let mut cam = FlyCamera::default();
        cam.position = Vec3::new(10.0, 20.0, 30.0);
        let target = Vec3::new(-5.0, 0.0, 2.0);
        cam.look_at(target);
        let expected = (target - cam.position).normalize();
        assert!(cam.forward().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn frame_bounds_sees_center() {
        let mut cam = FlyCamera::default();
        let bounds = Bounds {
            min: Vec3::new(-64.0, -16.0, -64.0),
            max: Vec3::new(64.0, 48.0, 64.0),
        };
        cam.frame_bounds(&bounds);
        assert!(cam.position.y > bounds.max.y);
        let to_center = (bounds.center() - cam.position).normalize();
        assert!(cam.forward().abs_diff_eq(to_center, 1e-4));
        assert!(cam.far >= 512.0);
    }

    #[test]
    fn frame_bounds_agrees_with_render_view() {
        let bounds = Bounds {
            min: Vec3::new(-10.0, 0.0, -30.0),
            max: Vec3::new(10.0, 5.0, 30.0),
        };
        let view = RenderView::framing_bounds(&bounds);
        let mut cam = FlyCamera::default();
        cam.frame_bounds(&bounds);
        assert_eq!(cam.position, view.eye);
        let to_target = (view.target - view.eye).normalize();
        assert!(cam.forward().abs_diff_eq(to_target, 1e-4));
    }

    #[test]
    fn aspect_from_size() {
        let mut cam = FlyCamera::default();
        cam.set_aspect(800, 400);
        assert_eq!(cam.aspect, 2.0);
        cam.set_aspect(800, 0);
        assert_eq!(cam.aspect, 800.0);
    }

    #[test]
    fn render_view_matches_camera() {
        let cam = FlyCamera::default();
        let view = cam.render_view();
        assert_eq!(view.eye, cam.position);
        assert!((view.target - view.eye).abs_diff_eq(cam.forward(), 1e-4));
        assert!((view.fov_degrees - 45.0).abs() < 1e-3);
    }
}
