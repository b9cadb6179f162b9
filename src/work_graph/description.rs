//! Declarative work graph program description.
//!
//! Nodes are not wired together here: every node exported by a registered
//! library becomes part of the graph, and node-to-node edges are declared by
//! the node shaders themselves. What the description does carry is which
//! exports are mesh nodes, which pixel shader each one pairs with, and the
//! fixed-function state they rasterize with.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::backend::traits::{RootSignatureDescriptor, RootParameter};
use crate::backend::types::*;
use crate::shader::{CompiledModule, ShaderTarget};

use super::{ProgramError, ProgramResult};

/// Kind of graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Compute node from a shader library
    ComputeLibrary,
    /// Mesh node that emits primitives rasterized with a paired pixel shader
    MeshEmitting,
}

/// Depth and color target formats shared by every mesh node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFormats {
    pub color: Vec<TextureFormat>,
    pub depth: TextureFormat,
}

/// Fixed-function state block referenced by mesh nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphicsStateBlock {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub fill_mode: FillMode,
    pub topology: PrimitiveTopology,
    pub targets: Arc<TargetFormats>,
}

impl GraphicsStateBlock {
    pub fn new(cull_mode: CullMode, targets: Arc<TargetFormats>) -> Self {
        Self {
            cull_mode,
            front_face: FrontFace::Ccw,
            fill_mode: FillMode::Solid,
            topology: PrimitiveTopology::TriangleList,
            targets,
        }
    }
}

/// A single node of the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNodeSpec {
    pub kind: NodeKind,
    pub export_name: String,
    /// Set for mesh nodes only
    pub pixel_shader_export: Option<String>,
    /// Set for mesh nodes only
    pub graphics_state: Option<Arc<GraphicsStateBlock>>,
}

impl GraphNodeSpec {
    pub fn compute(export_name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::ComputeLibrary,
            export_name: export_name.into(),
            pixel_shader_export: None,
            graphics_state: None,
        }
    }

    pub fn mesh(
        export_name: impl Into<String>,
        pixel_shader_export: impl Into<String>,
        graphics_state: Arc<GraphicsStateBlock>,
    ) -> Self {
        Self {
            kind: NodeKind::MeshEmitting,
            export_name: export_name.into(),
            pixel_shader_export: Some(pixel_shader_export.into()),
            graphics_state: Some(graphics_state),
        }
    }

    pub fn is_mesh(&self) -> bool {
        self.kind == NodeKind::MeshEmitting
    }
}

/// Complete, immutable description of a work graph program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphProgramDescription {
    pub program_name: String,
    pub entry_point: NodeId,
    pub root_signature: RootSignatureDescriptor,
    /// Mesh nodes require the graphics root-signature binding model
    pub use_graphics_root_signature: bool,
    pub nodes: Vec<GraphNodeSpec>,
    /// Source ids of every library contributing nodes
    pub libraries: Vec<String>,
    /// Exports of the pixel shader modules
    pub pixel_shaders: Vec<String>,
}

impl GraphProgramDescription {
    pub fn node(&self, export_name: &str) -> Option<&GraphNodeSpec> {
        self.nodes.iter().find(|n| n.export_name == export_name)
    }

    pub fn mesh_nodes(&self) -> impl Iterator<Item = &GraphNodeSpec> {
        self.nodes.iter().filter(|n| n.is_mesh())
    }

    pub fn compute_nodes(&self) -> impl Iterator<Item = &GraphNodeSpec> {
        self.nodes.iter().filter(|n| !n.is_mesh())
    }
}

/// Mesh node declared before its library is known to export it
#[derive(Debug, Clone)]
struct MeshNodeDecl {
    mesh_export: String,
    pixel_export: String,
    cull_mode: CullMode,
}

/// Assembles a [`GraphProgramDescription`] from compiled modules.
///
/// The builder owns the compiled modules until [`finish`](Self::finish)
/// hands them out together with the description. Dropping the builder on an
/// error path releases every module compiled so far.
pub struct GraphDescriptionBuilder {
    program_name: String,
    entry_point: NodeId,
    root_signature: RootSignatureDescriptor,
    modules: Vec<CompiledModule>,
    mesh_nodes: Vec<MeshNodeDecl>,
    no_culling: Arc<GraphicsStateBlock>,
    backface_culling: Arc<GraphicsStateBlock>,
}

impl GraphDescriptionBuilder {
    pub fn new(program_name: &str, entry_point: &str, targets: TargetFormats) -> Self {
        let targets = Arc::new(targets);

        // One constant buffer at b0 holds every per-frame parameter
        let root_signature =
            RootSignatureDescriptor::new(format!("{program_name}_RootSignature"), PipelineKind::Graphics)
                .with_parameter(RootParameter::ConstantBuffer {
                    register: 0,
                    visibility: ShaderStageFlags::ALL,
                });

        Self {
            program_name: program_name.to_string(),
            entry_point: NodeId::new(entry_point),
            root_signature,
            modules: Vec::new(),
            mesh_nodes: Vec::new(),
            no_culling: Arc::new(GraphicsStateBlock::new(CullMode::None, Arc::clone(&targets))),
            backface_culling: Arc::new(GraphicsStateBlock::new(CullMode::Back, targets)),
        }
    }

    /// The shared state block for a cull mode.
    ///
    /// Only the two canonical variants exist; front-face culling is folded
    /// into back-face culling since no node asks for it.
    pub fn graphics_state(&self, cull_mode: CullMode) -> Arc<GraphicsStateBlock> {
        match cull_mode {
            CullMode::None => Arc::clone(&self.no_culling),
            CullMode::Back | CullMode::Front => Arc::clone(&self.backface_culling),
        }
    }

    /// Register a compiled library or pixel shader module
    pub fn add_module(&mut self, module: CompiledModule) {
        log::debug!(
            "Adding {:?} module '{}' exporting {:?}",
            module.target,
            module.source_id,
            module.exports
        );
        self.modules.push(module);
    }

    /// Declare a mesh node pairing a mesh shader export with a pixel shader export
    pub fn add_mesh_node(&mut self, mesh_export: &str, pixel_export: &str, cull_mode: CullMode) {
        self.mesh_nodes.push(MeshNodeDecl {
            mesh_export: mesh_export.to_string(),
            pixel_export: pixel_export.to_string(),
            cull_mode,
        });
    }

    pub fn modules(&self) -> &[CompiledModule] {
        &self.modules
    }

    fn exports_of(&self, target: ShaderTarget) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|m| m.target == target)
            .flat_map(|m| m.exports.iter().map(String::as_str))
            .collect()
    }

    /// Validate and produce the description plus the modules it refers to
    pub fn finish(self) -> ProgramResult<(GraphProgramDescription, Vec<CompiledModule>)> {
        let library_exports = self.exports_of(ShaderTarget::Library);
        let pixel_exports: HashSet<&str> = self.exports_of(ShaderTarget::Pixel).into_iter().collect();

        let mut mesh_by_export: HashMap<&str, &MeshNodeDecl> = HashMap::new();
        for decl in &self.mesh_nodes {
            if mesh_by_export.insert(decl.mesh_export.as_str(), decl).is_some() {
                return Err(ProgramError::InvalidDescription(format!(
                    "mesh node '{}' declared more than once",
                    decl.mesh_export
                )));
            }
            if !library_exports.contains(&decl.mesh_export.as_str()) {
                return Err(ProgramError::InvalidDescription(format!(
                    "mesh node '{}' is not exported by any library",
                    decl.mesh_export
                )));
            }
            if !pixel_exports.contains(decl.pixel_export.as_str()) {
                return Err(ProgramError::InvalidDescription(format!(
                    "mesh node '{}' pairs with unknown pixel shader '{}'",
                    decl.mesh_export, decl.pixel_export
                )));
            }
        }

        // Every library export joins the graph
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(library_exports.len());
        for export in &library_exports {
            if !seen.insert(*export) {
                return Err(ProgramError::InvalidDescription(format!(
                    "node '{export}' is exported by more than one library"
                )));
            }
            let node = match mesh_by_export.get(export) {
                Some(decl) => GraphNodeSpec::mesh(
                    *export,
                    decl.pixel_export.as_str(),
                    self.graphics_state(decl.cull_mode),
                ),
                None => GraphNodeSpec::compute(*export),
            };
            nodes.push(node);
        }

        if !seen.contains(self.entry_point.name.as_str()) {
            return Err(ProgramError::InvalidDescription(format!(
                "entry node '{}' is not exported by any library",
                self.entry_point.name
            )));
        }

        let libraries = self
            .modules
            .iter()
            .filter(|m| m.target == ShaderTarget::Library)
            .map(|m| m.source_id.clone())
            .collect();
        let mut pixel_shaders: Vec<String> = pixel_exports.iter().map(|s| s.to_string()).collect();
        pixel_shaders.sort();

        let description = GraphProgramDescription {
            program_name: self.program_name,
            entry_point: self.entry_point,
            root_signature: self.root_signature,
            use_graphics_root_signature: true,
            nodes,
            libraries,
            pixel_shaders,
        };

        Ok((description, self.modules))
    }
}
