//! Core backend abstraction traits
//!
//! These traits define the device capability surface the work graph renderer
//! consumes. Object creation goes through [`WorkGraphDevice`]; command
//! recording goes through [`CommandList`].

use crate::backend::types::*;
use crate::shader::CompiledModule;
use crate::work_graph::GraphProgramDescription;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create {resource}: {reason}")]
    ObjectCreationFailed { resource: String, reason: String },
    #[error("Feature not supported: {0}")]
    FeatureNotSupported(String),
}

impl BackendError {
    pub fn creation_failed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ObjectCreationFailed {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a root signature, used when binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootSignatureId(pub u64);

/// Handle to a pipeline, used when binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub u64);

/// Root signature parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootParameter {
    /// Root constant buffer view at register `b{register}`
    ConstantBuffer {
        register: u32,
        visibility: ShaderStageFlags,
    },
    /// Table of `count` SRVs starting at `t{register}`
    TextureSrvSet {
        register: u32,
        count: u32,
        visibility: ShaderStageFlags,
    },
    /// Table of `count` UAVs starting at `u{register}`
    TextureUavSet {
        register: u32,
        count: u32,
        visibility: ShaderStageFlags,
    },
}

/// Root signature descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSignatureDescriptor {
    pub label: String,
    pub parameters: Vec<RootParameter>,
    pub kind: PipelineKind,
}

impl RootSignatureDescriptor {
    pub fn new(label: impl Into<String>, kind: PipelineKind) -> Self {
        Self {
            label: label.into(),
            parameters: Vec::new(),
            kind,
        }
    }

    pub fn with_parameter(mut self, parameter: RootParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn constant_buffer_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| matches!(p, RootParameter::ConstantBuffer { .. }))
            .count()
    }
}

/// Everything a device needs to build an executable work graph state object
#[derive(Debug, Clone, Copy)]
pub struct StateObjectDescriptor<'a> {
    pub label: &'a str,
    pub root_signature: RootSignatureId,
    pub description: &'a GraphProgramDescription,
    pub modules: &'a [CompiledModule],
}

/// Compute pipeline descriptor
#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineDescriptor<'a> {
    pub label: &'a str,
    pub root_signature: RootSignatureId,
    pub shader: &'a CompiledModule,
    pub entry_point: &'a str,
}

/// A created root signature. Released on drop.
pub trait RootSignature {
    fn id(&self) -> RootSignatureId;
}

/// A created compute pipeline. Released on drop.
pub trait ComputePipeline {
    fn id(&self) -> PipelineId;
}

/// A created GPU buffer. Released on drop.
pub trait GpuBuffer {
    fn label(&self) -> &str;

    /// GPU address and size of the whole buffer
    fn gpu_range(&self) -> GpuVirtualRange;
}

/// An executable state object containing one or more work graphs.
/// Released on drop.
pub trait WorkGraphStateObject {
    /// Index of a named work graph program inside the state object
    fn work_graph_index(&self, program_name: &str) -> Option<u32>;

    /// Limit the number of input records a dispatch may carry.
    ///
    /// Graphs containing mesh nodes must call this before memory
    /// requirements are queried.
    fn set_maximum_input_records(
        &mut self,
        work_graph_index: u32,
        records: u32,
        node_inputs: u32,
    ) -> BackendResult<()>;

    fn memory_requirements(&self, work_graph_index: u32) -> MemoryRequirements;

    fn entry_point_index(&self, work_graph_index: u32, node: &NodeId) -> Option<u32>;

    fn program_identifier(&self, program_name: &str) -> Option<ProgramIdentifier>;
}

/// Device trait: object creation and capability queries
pub trait WorkGraphDevice {
    type RootSignature: RootSignature;
    type StateObject: WorkGraphStateObject;
    type Buffer: GpuBuffer;
    type ComputePipeline: ComputePipeline;

    /// Get the backend name
    fn name(&self) -> &str;

    /// Highest work graph tier the device supports
    fn work_graphs_tier(&self) -> WorkGraphsTier;

    /// Required alignment of work graph backing memory, in bytes
    fn backing_memory_alignment(&self) -> u64;

    /// Create a root signature
    fn create_root_signature(
        &mut self,
        desc: &RootSignatureDescriptor,
    ) -> BackendResult<Self::RootSignature>;

    /// Compile a work graph program description into an executable state object
    fn create_state_object(
        &mut self,
        desc: &StateObjectDescriptor<'_>,
    ) -> BackendResult<Self::StateObject>;

    /// Create a buffer
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<Self::Buffer>;

    /// Create a compute pipeline
    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor<'_>,
    ) -> BackendResult<Self::ComputePipeline>;
}

/// Command recording. Nothing here executes work; the device timeline runs
/// the recorded stream later.
pub trait CommandList {
    /// Open a named debug/profiling region
    fn begin_marker(&mut self, label: &str);

    /// Close the most recent debug region
    fn end_marker(&mut self);

    fn resource_barriers(&mut self, barriers: &[Barrier]);

    fn clear_render_target(&mut self, target: TextureHandle, color: [f32; 4]);

    fn clear_depth_stencil(&mut self, target: TextureHandle, depth: f32);

    /// Bind color and depth targets for rasterization
    fn begin_raster(&mut self, color_targets: &[TextureHandle], depth_target: Option<TextureHandle>);

    fn end_raster(&mut self);

    fn set_viewport_scissor(&mut self, viewport: Viewport);

    /// Copy constant data into the per-frame upload region
    fn alloc_constant_buffer(&mut self, data: &[u8]) -> GpuVirtualRange;

    fn set_root_signature(&mut self, kind: PipelineKind, root_signature: RootSignatureId);

    fn set_root_constant_buffer(&mut self, kind: PipelineKind, slot: u32, range: GpuVirtualRange);

    fn set_texture_srv(&mut self, slot: u32, texture: TextureHandle);

    fn set_texture_uav(&mut self, slot: u32, texture: TextureHandle);

    fn set_program(&mut self, desc: &SetProgramDesc);

    fn dispatch_graph(&mut self, desc: &DispatchGraphDesc);

    fn set_compute_pipeline(&mut self, pipeline: PipelineId);

    fn dispatch(&mut self, x: u32, y: u32, z: u32);
}
