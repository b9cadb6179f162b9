//! Executable work graph program.

use crate::backend::*;
use crate::shader::ShaderCompiler;
use crate::WorkGraphConfig;

use super::{
    GraphDescriptionBuilder, GraphProgramDescription, NodeCatalog, ProgramError, ProgramResult,
    TargetFormats,
};

/// A compiled work graph and everything resolved from it for dispatch.
///
/// The root signature and state object are released when this is dropped.
pub struct ExecutableProgram<D: WorkGraphDevice> {
    description: GraphProgramDescription,
    root_signature: D::RootSignature,
    state_object: D::StateObject,
    graph_index: u32,
    entry_point_index: u32,
    memory_requirements: MemoryRequirements,
    program_identifier: ProgramIdentifier,
}

impl<D: WorkGraphDevice> ExecutableProgram<D> {
    /// Compile every shader in `catalog` and build the work graph on `device`.
    ///
    /// Compiled modules only live for the duration of this call. They are
    /// released whether construction succeeds or fails.
    pub fn build<C>(
        device: &mut D,
        compiler: &mut C,
        catalog: &NodeCatalog,
        targets: TargetFormats,
        config: &WorkGraphConfig,
    ) -> ProgramResult<Self>
    where
        C: ShaderCompiler + ?Sized,
    {
        let available = device.work_graphs_tier();
        if available < config.required_tier {
            log::error!(
                "{} does not support work graphs {} (has {})",
                device.name(),
                config.required_tier,
                available
            );
            return Err(ProgramError::UnsupportedTier {
                required: config.required_tier,
                available,
            });
        }

        let mut builder =
            GraphDescriptionBuilder::new(&config.program_name, &config.entry_node, targets);

        for library in &catalog.libraries {
            builder.add_module(compiler.compile_library(library)?);
        }
        for pixel in &catalog.pixel_shaders {
            builder.add_module(compiler.compile_pixel_shader(&pixel.source_id, &pixel.entry_point)?);
        }
        for node in &catalog.mesh_nodes {
            log::debug!(
                "Generic program {} -> {} ({:?} culling)",
                node.mesh_export,
                node.pixel_export,
                node.cull_mode
            );
            builder.add_mesh_node(&node.mesh_export, &node.pixel_export, node.cull_mode);
        }

        let (description, modules) = builder.finish()?;
        let root_signature = device.create_root_signature(&description.root_signature)?;

        let state_object = device.create_state_object(&StateObjectDescriptor {
            label: &description.program_name,
            root_signature: root_signature.id(),
            description: &description,
            modules: &modules,
        });
        drop(modules);
        let mut state_object = state_object?;

        let graph_index = state_object
            .work_graph_index(&description.program_name)
            .ok_or_else(|| ProgramError::UnknownProgram(description.program_name.clone()))?;

        // Mesh nodes require a bounded number of in-flight input records
        state_object.set_maximum_input_records(
            graph_index,
            config.max_input_records,
            config.max_input_records,
        )?;

        let memory_requirements = state_object.memory_requirements(graph_index);

        let entry_point_index = state_object
            .entry_point_index(graph_index, &description.entry_point)
            .ok_or_else(|| ProgramError::UnknownEntryPoint {
                program: description.program_name.clone(),
                node: description.entry_point.name.clone(),
            })?;

        let program_identifier = state_object
            .program_identifier(&description.program_name)
            .ok_or_else(|| ProgramError::UnknownProgram(description.program_name.clone()))?;

        log::info!(
            "Built work graph '{}' on {}: {} nodes ({} mesh nodes), backing memory {} bytes",
            description.program_name,
            device.name(),
            description.nodes.len(),
            description.mesh_nodes().count(),
            memory_requirements.max_size_in_bytes
        );

        Ok(Self {
            description,
            root_signature,
            state_object,
            graph_index,
            entry_point_index,
            memory_requirements,
            program_identifier,
        })
    }

    /// Validated description the state object was built from
    pub fn description(&self) -> &GraphProgramDescription {
        &self.description
    }

    /// Every node of the graph, in description order
    pub fn nodes(&self) -> &[super::GraphNodeSpec] {
        &self.description.nodes
    }

    /// Index of the program inside its state object
    pub fn graph_index(&self) -> u32 {
        self.graph_index
    }

    /// Index of the entry node used for the seed record
    pub fn entry_point_index(&self) -> u32 {
        self.entry_point_index
    }

    /// Backing memory the device asked for
    pub fn memory_requirements(&self) -> MemoryRequirements {
        self.memory_requirements
    }

    /// Token passed to `SetProgram`
    pub fn program_identifier(&self) -> ProgramIdentifier {
        self.program_identifier
    }

    /// Graphics root signature bound before dispatch
    pub fn root_signature_id(&self) -> RootSignatureId {
        self.root_signature.id()
    }

    /// Get the underlying state object.
    pub fn state_object(&self) -> &D::StateObject {
        &self.state_object
    }
}
