//! Per-frame constants bound to the work graph.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::pipeline::ProceduralSettings;
use crate::scene::FrameCamera;

/// Millisecond clock fed to the node shaders.
///
/// Wraps silently at 2^32; shaders only look at the difference between
/// the current and previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderClock {
    time: u32,
    previous_time: u32,
}

impl ShaderClock {
    pub fn new(time: u32) -> Self {
        Self {
            time,
            previous_time: time,
        }
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn previous_time(&self) -> u32 {
        self.previous_time
    }

    /// Advance by `delta_seconds`, truncated to whole milliseconds.
    /// Negative or NaN deltas advance by zero.
    pub fn advance(&mut self, delta_seconds: f64) {
        let elapsed_ms = (delta_seconds * 1000.0).floor() as u64 as u32;
        self.previous_time = self.time;
        self.time = self.time.wrapping_add(elapsed_ms);
    }
}

/// Work graph constant buffer (b0)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameConstants {
    pub view_projection: Mat4,
    pub previous_view_projection: Mat4,
    pub inverse_view_projection: Mat4,
    pub camera_position: Vec4,
    pub previous_camera_position: Vec4,
    pub shader_time: u32,
    pub previous_shader_time: u32,
    pub wind_strength: f32,
    /// Radians
    pub wind_direction: f32,
}

impl FrameConstants {
    pub fn new(camera: &FrameCamera, clock: &ShaderClock, settings: &ProceduralSettings) -> Self {
        let view_projection = camera.view_projection();

        Self {
            view_projection,
            previous_view_projection: camera.previous_view_projection(),
            inverse_view_projection: view_projection.inverse(),
            camera_position: camera.position().extend(1.0),
            previous_camera_position: camera.previous_view.inverse().w_axis,
            shader_time: clock.time(),
            previous_shader_time: clock.previous_time(),
            wind_strength: settings.wind_strength(),
            wind_direction: settings.wind_direction_radians(),
        }
    }
}
