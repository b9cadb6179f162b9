//! Mesh Node Engine - GPU work graph procedural renderer
//!
//! The procedural world (terrain, splines, vegetation, insects) is generated
//! and rasterized entirely on the GPU by a work graph whose mesh nodes emit
//! geometry straight into a G-buffer. A deferred compute pass then lights it.
//!
//! # Layout
//! - [`backend`]: device capability surface and a recording dummy device
//! - [`shader`]: shader module compilation (WGSL through naga)
//! - [`work_graph`]: graph description, executable program, backing memory
//! - [`pipeline`]: per-frame orchestration and deferred shading
//! - [`scene`]: camera with previous-frame state

pub mod backend;
pub mod pipeline;
pub mod scene;
pub mod shader;
pub mod work_graph;

pub use backend::{CommandList, DummyDevice, RecordingCommandList, WorkGraphDevice, WorkGraphsTier};
pub use pipeline::{
    FrameContext, GBufferTargets, ProceduralSettings, RenderModuleError, WorkGraphRenderModule,
};
pub use scene::{FrameCamera, TemporalCamera};
pub use shader::{CompiledModule, ShaderCompiler, ShaderError, ShaderSources};
pub use work_graph::{ExecutableProgram, GraphMemory, NodeCatalog, ProgramError};

#[cfg(feature = "naga-compiler")]
pub use shader::NagaCompiler;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the work graph render module
#[derive(Debug, Clone)]
pub struct WorkGraphConfig {
    /// Name of the work graph program inside the state object
    pub program_name: String,
    /// Node receiving the single seed record
    pub entry_node: String,
    /// In-flight input record limit; mesh node graphs need 1
    pub max_input_records: u32,
    pub required_tier: WorkGraphsTier,
    /// Shading thread group edge, must match the kernel's workgroup size
    pub shading_tile_size: u32,
    pub shading_source: String,
    pub shading_entry_point: String,
    /// Initial wind parameters
    pub procedural: ProceduralSettings,
}

impl Default for WorkGraphConfig {
    fn default() -> Self {
        Self {
            program_name: "WorkGraph".to_string(),
            entry_node: "World".to_string(),
            max_input_records: 1,
            required_tier: WorkGraphsTier::Tier1_1,
            shading_tile_size: 8,
            shading_source: pipeline::SHADING_SOURCE_ID.to_string(),
            shading_entry_point: "MainCS".to_string(),
            procedural: ProceduralSettings::default(),
        }
    }
}

/// Shader sources shipped with the crate, ready to be extended with the
/// host's procedural libraries
pub fn builtin_shader_sources() -> ShaderSources {
    ShaderSources::new("wgsl")
        .with_source(pipeline::SHADING_SOURCE_ID, pipeline::DEFERRED_SHADING_SHADER)
}
