//! Work graph rendering pipeline
//!
//! This module implements the per-frame side of the renderer:
//! 1. Work graph pass - GPU-driven procedural geometry into the G-buffer
//! 2. Shading pass - Fullscreen compute lighting from the G-buffer

pub mod frame_constants;
pub mod gbuffer;
pub mod render_module;
pub mod resolution;
pub mod settings;
pub mod shading_pass;

pub use frame_constants::{FrameConstants, ShaderClock};
pub use gbuffer::{GBufferTargets, RenderTarget};
pub use render_module::{FrameContext, RenderModuleError, WorkGraphRenderModule};
pub use resolution::{ResolutionInfo, UpscalerState};
pub use settings::{ProceduralSettings, WIND_DIRECTION_RANGE, WIND_STRENGTH_RANGE};
pub use shading_pass::{
    dispatch_size, ShadingConstants, ShadingInputs, ShadingPass, UpscalerInformation,
    DEFERRED_SHADING_SHADER, SHADING_SOURCE_ID,
};
