//! Render resolution selection

use glam::Vec4;

/// Where upscaling happens relative to this module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpscalerState {
    /// No upscaler active
    #[default]
    None,
    /// This module renders before the upscaler, at render resolution
    PreUpscale,
    /// This module renders after the upscaler, at display resolution
    PostUpscale,
}

/// Internal render resolution and output display resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionInfo {
    pub render_width: u32,
    pub render_height: u32,
    pub display_width: u32,
    pub display_height: u32,
}

impl ResolutionInfo {
    /// Render and display at the same size
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            render_width: width,
            render_height: height,
            display_width: width,
            display_height: height,
        }
    }

    /// Resolution this module renders at
    pub fn render_resolution(&self, state: UpscalerState) -> (u32, u32) {
        match state {
            UpscalerState::None | UpscalerState::PostUpscale => {
                (self.display_width, self.display_height)
            }
            UpscalerState::PreUpscale => (self.render_width, self.render_height),
        }
    }

    /// Render to display ratio in xy, its inverse in zw
    pub fn full_screen_scale_ratio(&self) -> Vec4 {
        let ratio = |a: u32, b: u32| if b == 0 { 1.0 } else { a as f32 / b as f32 };
        Vec4::new(
            ratio(self.render_width, self.display_width),
            ratio(self.render_height, self.display_height),
            ratio(self.display_width, self.render_width),
            ratio(self.display_height, self.render_height),
        )
    }
}
