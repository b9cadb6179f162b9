//! Camera with previous-frame state

use glam::{Mat4, Vec2, Vec3};

/// Perspective projection writing reversed depth: 1 at the near plane, 0 at
/// the far plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 5000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        // Swapped planes give the reversed depth range
        Mat4::perspective_rh(self.fov_y, self.aspect, self.far, self.near)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}

/// View and projection matrices of the current and previous frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    pub view: Mat4,
    pub previous_view: Mat4,
    pub projection_jittered: Mat4,
    pub previous_projection_jittered: Mat4,
}

impl Default for FrameCamera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            previous_view: Mat4::IDENTITY,
            projection_jittered: Mat4::IDENTITY,
            previous_projection_jittered: Mat4::IDENTITY,
        }
    }
}

impl FrameCamera {
    pub fn view_projection(&self) -> Mat4 {
        self.projection_jittered * self.view
    }

    pub fn previous_view_projection(&self) -> Mat4 {
        self.previous_projection_jittered * self.previous_view
    }

    /// World-space position, the translation of the inverse view
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous_view.inverse().w_axis.truncate()
    }
}

/// Camera that remembers last frame's matrices and applies sub-pixel jitter.
///
/// Call [`advance`](Self::advance) once per frame before moving the camera
/// or changing the jitter.
#[derive(Debug, Clone)]
pub struct TemporalCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    /// Jitter in pixels, usually in [-0.5, 0.5]
    jitter: Vec2,
    viewport: (u32, u32),
    previous_view: Mat4,
    previous_projection_jittered: Mat4,
}

impl TemporalCamera {
    pub fn new(position: Vec3, target: Vec3, viewport: (u32, u32)) -> Self {
        let mut projection = Projection::default();
        projection.set_aspect(viewport.0.max(1) as f32 / viewport.1.max(1) as f32);

        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            projection,
            jitter: Vec2::ZERO,
            viewport,
            previous_view: Mat4::IDENTITY,
            previous_projection_jittered: Mat4::IDENTITY,
        };
        camera.advance();
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn jitter(&self) -> Vec2 {
        self.jitter
    }

    pub fn set_jitter(&mut self, jitter_pixels: Vec2) {
        self.jitter = jitter_pixels;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.projection
            .set_aspect(width.max(1) as f32 / height.max(1) as f32);
    }

    /// Projection with the pixel jitter applied as a clip-space offset
    pub fn projection_jittered(&self) -> Mat4 {
        let (width, height) = self.viewport;
        let offset = Vec3::new(
            2.0 * self.jitter.x / width.max(1) as f32,
            -2.0 * self.jitter.y / height.max(1) as f32,
            0.0,
        );
        Mat4::from_translation(offset) * self.projection.matrix()
    }

    /// Store this frame's matrices as the previous frame's
    pub fn advance(&mut self) {
        self.previous_view = self.view_matrix();
        self.previous_projection_jittered = self.projection_jittered();
    }

    pub fn frame_camera(&self) -> FrameCamera {
        FrameCamera {
            view: self.view_matrix(),
            previous_view: self.previous_view,
            projection_jittered: self.projection_jittered(),
            previous_projection_jittered: self.previous_projection_jittered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_reversed_depth() {
        let proj = Projection::perspective(60.0, 1.0, 0.5, 100.0).matrix();
        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w - 1.0).abs() < 1e-5);
        assert!((far.z / far.w).abs() < 1e-5);
    }

    #[test]
    fn test_position_from_view() {
        let camera = TemporalCamera::new(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO, (1280, 720));
        let frame = camera.frame_camera();
        assert!(frame.position().abs_diff_eq(Vec3::new(3.0, 4.0, 5.0), 1e-4));
    }

    #[test]
    fn test_advance_keeps_previous_frame() {
        let mut camera = TemporalCamera::new(Vec3::new(0.0, 1.0, 10.0), Vec3::ZERO, (800, 600));

        camera.advance();
        camera.position = Vec3::new(0.0, 1.0, 20.0);
        camera.set_jitter(Vec2::new(0.25, -0.25));

        let frame = camera.frame_camera();
        assert!(frame.previous_position().abs_diff_eq(Vec3::new(0.0, 1.0, 10.0), 1e-4));
        assert!(frame.position().abs_diff_eq(Vec3::new(0.0, 1.0, 20.0), 1e-4));
        assert_ne!(frame.projection_jittered, frame.previous_projection_jittered);
    }

    #[test]
    fn test_jitter_is_sub_pixel_offset() {
        let mut camera = TemporalCamera::new(Vec3::Z, Vec3::ZERO, (100, 100));
        let unjittered = camera.projection_jittered();
        camera.set_jitter(Vec2::new(0.5, 0.0));
        let jittered = camera.projection_jittered();

        let point = Vec4::new(0.0, 0.0, -1.0, 1.0);
        let a = unjittered * point;
        let b = jittered * point;
        let pixel_shift = (b.x / b.w - a.x / a.w) * 100.0 / 2.0;
        assert!((pixel_shift - 0.5).abs() < 1e-3);
    }
}
