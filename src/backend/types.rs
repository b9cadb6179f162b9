//! Common types shared between backends

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgb10a2Unorm,
    Rg16Float,
    R32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }
}

/// Handle to a texture owned by the host.
///
/// The renderer only references these; creation and destruction stay with
/// whoever allocated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Resource state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceState(u32);

impl ResourceState {
    pub const COMMON: Self = Self(0);
    pub const NON_PIXEL_SHADER_RESOURCE: Self = Self(1 << 0);
    pub const PIXEL_SHADER_RESOURCE: Self = Self(1 << 1);
    pub const RENDER_TARGET: Self = Self(1 << 2);
    pub const DEPTH_WRITE: Self = Self(1 << 3);
    pub const UNORDERED_ACCESS: Self = Self(1 << 4);

    /// Readable from every shader stage. Render modules hand resources to
    /// each other in this state.
    pub const SHADER_RESOURCE: Self =
        Self(Self::NON_PIXEL_SHADER_RESOURCE.0 | Self::PIXEL_SHADER_RESOURCE.0);

    pub fn is_writable(&self) -> bool {
        (self.0 & (Self::RENDER_TARGET.0 | Self::DEPTH_WRITE.0 | Self::UNORDERED_ACCESS.0)) != 0
    }
}

/// A resource state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub resource: TextureHandle,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Barrier {
    pub fn transition(resource: TextureHandle, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource,
            before,
            after,
        }
    }

    /// The transition that undoes this one.
    pub fn reversed(&self) -> Self {
        Self {
            resource: self.resource,
            before: self.after,
            after: self.before,
        }
    }
}

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage(u32);

impl BufferUsage {
    pub const NONE: Self = Self(0);
    pub const UNORDERED_ACCESS: Self = Self(1 << 0);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Buffer descriptor
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: String,
    pub size: u64,
    pub alignment: u64,
    pub usage: BufferUsage,
    pub initial_state: ResourceState,
}

/// A span of GPU virtual address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuVirtualRange {
    pub start_address: u64,
    pub size_in_bytes: u64,
}

impl GpuVirtualRange {
    /// No memory at all. Dispatches accept this as "no backing memory".
    pub const EMPTY: Self = Self {
        start_address: 0,
        size_in_bytes: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.size_in_bytes == 0
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
}

/// Cull mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

/// Front face winding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

/// Which root-signature binding model a program uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

/// Shader stages a root parameter is visible to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStageFlags(u32);

impl ShaderStageFlags {
    pub const MESH: Self = Self(1 << 0);
    pub const PIXEL: Self = Self(1 << 1);
    pub const COMPUTE: Self = Self(1 << 2);
    pub const ALL: Self = Self(Self::MESH.0 | Self::PIXEL.0 | Self::COMPUTE.0);
}

/// Viewport with a matching scissor rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Work graph support level reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkGraphsTier {
    NotSupported,
    /// Compute-only work graphs
    Tier1_0,
    /// Work graphs with mesh nodes
    Tier1_1,
}

impl std::fmt::Display for WorkGraphsTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSupported => write!(f, "not supported"),
            Self::Tier1_0 => write!(f, "tier 1.0"),
            Self::Tier1_1 => write!(f, "tier 1.1 (mesh nodes)"),
        }
    }
}

/// Node name plus array index, as used to look up entry points
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub name: String,
    pub array_index: u32,
}

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array_index: 0,
        }
    }
}

/// Backing memory a work graph needs, as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryRequirements {
    pub min_size_in_bytes: u64,
    pub max_size_in_bytes: u64,
    pub size_granularity_in_bytes: u64,
}

/// Opaque token identifying a program inside a state object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramIdentifier(pub [u64; 4]);

/// Work graph flags passed with `SetProgram`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkGraphFlags(u32);

impl WorkGraphFlags {
    pub const NONE: Self = Self(0);
    /// Zero-initialize backing memory before running the graph.
    pub const INITIALIZE: Self = Self(1 << 0);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// Program binding for a work graph dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetProgramDesc {
    pub program: ProgramIdentifier,
    pub flags: WorkGraphFlags,
    pub backing_memory: GpuVirtualRange,
}

/// Records supplied by the CPU for a single entry node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCpuInput {
    pub entry_point_index: u32,
    pub num_records: u32,
    pub record_stride_in_bytes: u64,
    pub records: Vec<u8>,
}

/// How a graph dispatch receives its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchGraphDesc {
    NodeCpuInput(NodeCpuInput),
}
