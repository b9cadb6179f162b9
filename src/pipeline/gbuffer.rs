//! G-buffer targets written by the work graph
//!
//! The host allocates the targets; this module only references them.
//! Between render modules every target sits in the shader-readable state.

use crate::backend::*;
use crate::work_graph::TargetFormats;

/// A host-owned texture and its format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    pub handle: TextureHandle,
    pub format: TextureFormat,
}

impl RenderTarget {
    pub fn new(handle: TextureHandle, format: TextureFormat) -> Self {
        Self { handle, format }
    }
}

/// Color, normal and motion targets plus depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBufferTargets {
    /// Base color (RGBA8)
    pub color: RenderTarget,
    /// World-space normal (RGB10A2)
    pub normal: RenderTarget,
    /// Screen-space motion vectors (RG16F)
    pub motion: RenderTarget,
    /// Reversed depth (D32)
    pub depth: RenderTarget,
}

impl GBufferTargets {
    /// Targets with the default formats
    pub fn new(
        color: TextureHandle,
        normal: TextureHandle,
        motion: TextureHandle,
        depth: TextureHandle,
    ) -> Self {
        Self {
            color: RenderTarget::new(color, TextureFormat::Rgba8Unorm),
            normal: RenderTarget::new(normal, TextureFormat::Rgb10a2Unorm),
            motion: RenderTarget::new(motion, TextureFormat::Rg16Float),
            depth: RenderTarget::new(depth, TextureFormat::Depth32Float),
        }
    }

    /// Check the target formats are usable for rasterization
    pub fn validate(&self) -> Result<(), String> {
        for (name, target) in [
            ("color", self.color),
            ("normal", self.normal),
            ("motion", self.motion),
        ] {
            if target.format.is_depth() {
                return Err(format!(
                    "G-buffer {name} target has depth format {:?}",
                    target.format
                ));
            }
        }
        if !self.depth.format.is_depth() {
            return Err(format!(
                "G-buffer depth target has color format {:?}",
                self.depth.format
            ));
        }
        Ok(())
    }

    /// Color targets in render target slot order
    pub fn color_targets(&self) -> [TextureHandle; 3] {
        [self.color.handle, self.normal.handle, self.motion.handle]
    }

    pub fn target_formats(&self) -> TargetFormats {
        TargetFormats {
            color: vec![self.color.format, self.normal.format, self.motion.format],
            depth: self.depth.format,
        }
    }

    /// Transitions from shader-readable into the writable raster states
    pub fn write_barriers(&self) -> [Barrier; 4] {
        let to_target = |t: RenderTarget| {
            Barrier::transition(t.handle, ResourceState::SHADER_RESOURCE, ResourceState::RENDER_TARGET)
        };

        [
            to_target(self.color),
            to_target(self.normal),
            to_target(self.motion),
            Barrier::transition(
                self.depth.handle,
                ResourceState::SHADER_RESOURCE,
                ResourceState::DEPTH_WRITE,
            ),
        ]
    }

    /// Transitions undoing [`write_barriers`](Self::write_barriers)
    pub fn read_barriers(&self) -> [Barrier; 4] {
        self.write_barriers().map(|b| b.reversed())
    }
}
