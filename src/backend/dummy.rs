//! Dummy backend for testing and development.
//!
//! This backend doesn't touch a GPU but implements the whole device surface:
//! objects are tracked so tests can observe that everything created is also
//! released, and the command list records every call so ordering can be
//! asserted on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::traits::*;
use super::types::*;
use crate::shader::ShaderTarget;

/// Base address of the dummy per-frame upload region
const UPLOAD_BASE_ADDRESS: u64 = 0x1000_0000;
/// Base address of dummy buffer allocations
const BUFFER_BASE_ADDRESS: u64 = 0x4000_0000;
/// Constant buffer placement alignment
const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Object counters shared between a [`DummyDevice`] and the objects it created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub live_root_signatures: usize,
    pub live_state_objects: usize,
    pub live_buffers: usize,
    pub live_pipelines: usize,
    pub created_state_objects: usize,
    pub created_buffers: usize,
}

impl DummyStats {
    /// Objects created and not yet dropped
    pub fn live_objects(&self) -> usize {
        self.live_root_signatures + self.live_state_objects + self.live_buffers + self.live_pipelines
    }
}

#[derive(Debug, Clone, Copy)]
enum ObjectKind {
    RootSignature,
    StateObject,
    Buffer,
    Pipeline,
}

/// Decrements the live count of its kind when dropped
#[derive(Debug)]
struct Tracked {
    stats: Arc<Mutex<DummyStats>>,
    kind: ObjectKind,
}

impl Tracked {
    fn new(stats: &Arc<Mutex<DummyStats>>, kind: ObjectKind) -> Self {
        {
            let mut s = stats.lock();
            match kind {
                ObjectKind::RootSignature => s.live_root_signatures += 1,
                ObjectKind::StateObject => {
                    s.live_state_objects += 1;
                    s.created_state_objects += 1;
                }
                ObjectKind::Buffer => {
                    s.live_buffers += 1;
                    s.created_buffers += 1;
                }
                ObjectKind::Pipeline => s.live_pipelines += 1,
            }
        }
        Self {
            stats: Arc::clone(stats),
            kind,
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let mut s = self.stats.lock();
        match self.kind {
            ObjectKind::RootSignature => s.live_root_signatures -= 1,
            ObjectKind::StateObject => s.live_state_objects -= 1,
            ObjectKind::Buffer => s.live_buffers -= 1,
            ObjectKind::Pipeline => s.live_pipelines -= 1,
        }
    }
}

/// Ids of the root signatures that are still alive
type RootSignatureRegistry = Arc<Mutex<HashSet<u64>>>;

#[derive(Debug)]
pub struct DummyRootSignature {
    id: RootSignatureId,
    registry: RootSignatureRegistry,
    _tracked: Tracked,
}

impl RootSignature for DummyRootSignature {
    fn id(&self) -> RootSignatureId {
        self.id
    }
}

impl Drop for DummyRootSignature {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id.0);
    }
}

#[derive(Debug)]
pub struct DummyComputePipeline {
    id: PipelineId,
    _tracked: Tracked,
}

impl ComputePipeline for DummyComputePipeline {
    fn id(&self) -> PipelineId {
        self.id
    }
}

#[derive(Debug)]
pub struct DummyBuffer {
    label: String,
    range: GpuVirtualRange,
    _tracked: Tracked,
}

impl GpuBuffer for DummyBuffer {
    fn label(&self) -> &str {
        &self.label
    }

    fn gpu_range(&self) -> GpuVirtualRange {
        self.range
    }
}

/// State object holding a single work graph.
///
/// Nodes are kept sorted by name so that indices only depend on the set of
/// exports, not on registration order.
#[derive(Debug)]
pub struct DummyStateObject {
    id: u64,
    program_name: String,
    nodes: Vec<String>,
    mesh_nodes: usize,
    max_input_records: Option<(u32, u32)>,
    bytes_per_node_record: u64,
    granularity: u64,
    _tracked: Tracked,
}

impl DummyStateObject {
    /// Node names in index order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Limit set through `set_maximum_input_records`
    pub fn max_input_records(&self) -> Option<(u32, u32)> {
        self.max_input_records
    }
}

/// Input records assumed when none have been set
const DEFAULT_MAX_INPUT_RECORDS: u32 = 256;

impl WorkGraphStateObject for DummyStateObject {
    fn work_graph_index(&self, program_name: &str) -> Option<u32> {
        (program_name == self.program_name).then_some(0)
    }

    fn set_maximum_input_records(
        &mut self,
        work_graph_index: u32,
        records: u32,
        node_inputs: u32,
    ) -> BackendResult<()> {
        if work_graph_index != 0 {
            return Err(BackendError::creation_failed(
                format!("{} work graph {}", self.program_name, work_graph_index),
                "no such work graph",
            ));
        }
        if records == 0 || node_inputs == 0 {
            return Err(BackendError::creation_failed(
                self.program_name.clone(),
                "maximum input records must be positive",
            ));
        }
        log::trace!(
            "DummyStateObject: '{}' limited to {} records / {} node inputs",
            self.program_name,
            records,
            node_inputs
        );
        self.max_input_records = Some((records, node_inputs));
        Ok(())
    }

    fn memory_requirements(&self, work_graph_index: u32) -> MemoryRequirements {
        if work_graph_index != 0 {
            return MemoryRequirements::default();
        }

        let records = self
            .max_input_records
            .map(|(records, _)| records)
            .unwrap_or(DEFAULT_MAX_INPUT_RECORDS) as u64;
        let per_node = self.bytes_per_node_record * records;
        // Mesh nodes carry an extra output queue each
        let queues = (self.nodes.len() + self.mesh_nodes) as u64;
        let max = per_node * queues;

        MemoryRequirements {
            min_size_in_bytes: max / 4,
            max_size_in_bytes: max,
            size_granularity_in_bytes: self.granularity,
        }
    }

    fn entry_point_index(&self, work_graph_index: u32, node: &NodeId) -> Option<u32> {
        if work_graph_index != 0 || node.array_index != 0 {
            return None;
        }
        self.nodes
            .iter()
            .position(|n| *n == node.name)
            .map(|i| i as u32)
    }

    fn program_identifier(&self, program_name: &str) -> Option<ProgramIdentifier> {
        (program_name == self.program_name).then_some(ProgramIdentifier([self.id, 0, 0, 0]))
    }
}

/// Device that creates tracked, GPU-less objects
#[derive(Debug)]
pub struct DummyDevice {
    tier: WorkGraphsTier,
    alignment: u64,
    bytes_per_node_record: u64,
    next_id: u64,
    next_address: u64,
    root_signatures: RootSignatureRegistry,
    failing_labels: HashSet<String>,
    stats: Arc<Mutex<DummyStats>>,
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyDevice {
    /// Create a device supporting mesh nodes
    pub fn new() -> Self {
        Self {
            tier: WorkGraphsTier::Tier1_1,
            alignment: 8,
            bytes_per_node_record: 64,
            next_id: 1,
            next_address: BUFFER_BASE_ADDRESS,
            root_signatures: Arc::new(Mutex::new(HashSet::new())),
            failing_labels: HashSet::new(),
            stats: Arc::new(Mutex::new(DummyStats::default())),
        }
    }

    /// Report `tier` as the supported work graph tier
    pub fn with_tier(mut self, tier: WorkGraphsTier) -> Self {
        self.tier = tier;
        self
    }

    /// Required backing memory alignment, at least 1
    pub fn with_backing_memory_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment.max(1);
        self
    }

    /// Backing memory each node needs per input record. Zero makes every
    /// graph report no memory requirement.
    pub fn with_bytes_per_node_record(mut self, bytes: u64) -> Self {
        self.bytes_per_node_record = bytes;
        self
    }

    /// Make creation of any object with this label fail
    pub fn fail_on(mut self, label: impl Into<String>) -> Self {
        self.failing_labels.insert(label.into());
        self
    }

    /// Snapshot of the object counters
    pub fn stats(&self) -> DummyStats {
        *self.stats.lock()
    }

    fn check_label(&self, label: &str) -> BackendResult<()> {
        if self.failing_labels.contains(label) {
            log::trace!("DummyDevice: injected failure for '{}'", label);
            return Err(BackendError::creation_failed(label, "injected failure"));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl WorkGraphDevice for DummyDevice {
    type RootSignature = DummyRootSignature;
    type StateObject = DummyStateObject;
    type Buffer = DummyBuffer;
    type ComputePipeline = DummyComputePipeline;

    fn name(&self) -> &str {
        "Dummy Device"
    }

    fn work_graphs_tier(&self) -> WorkGraphsTier {
        self.tier
    }

    fn backing_memory_alignment(&self) -> u64 {
        self.alignment
    }

    fn create_root_signature(
        &mut self,
        desc: &RootSignatureDescriptor,
    ) -> BackendResult<Self::RootSignature> {
        self.check_label(&desc.label)?;
        log::trace!(
            "DummyDevice: creating root signature '{}' ({} parameters, {:?})",
            desc.label,
            desc.parameters.len(),
            desc.kind
        );

        let id = self.allocate_id();
        self.root_signatures.lock().insert(id);
        Ok(DummyRootSignature {
            id: RootSignatureId(id),
            registry: Arc::clone(&self.root_signatures),
            _tracked: Tracked::new(&self.stats, ObjectKind::RootSignature),
        })
    }

    fn create_state_object(
        &mut self,
        desc: &StateObjectDescriptor<'_>,
    ) -> BackendResult<Self::StateObject> {
        self.check_label(desc.label)?;

        let program = desc.description;
        let has_mesh_nodes = program.mesh_nodes().next().is_some();
        if has_mesh_nodes && self.tier < WorkGraphsTier::Tier1_1 {
            return Err(BackendError::FeatureNotSupported(format!(
                "mesh nodes require work graphs tier 1.1, device has {}",
                self.tier
            )));
        }
        if !self.root_signatures.lock().contains(&desc.root_signature.0) {
            return Err(BackendError::creation_failed(
                desc.label,
                format!("unknown root signature {:?}", desc.root_signature),
            ));
        }

        let exported_by = |target: ShaderTarget, symbol: &str| {
            desc.modules
                .iter()
                .any(|m| m.target == target && m.exports(symbol))
        };

        let mut nodes = Vec::with_capacity(program.nodes.len());
        for node in &program.nodes {
            if !exported_by(ShaderTarget::Library, &node.export_name) {
                return Err(BackendError::creation_failed(
                    desc.label,
                    format!("export '{}' not found in any library", node.export_name),
                ));
            }
            if let Some(pixel) = &node.pixel_shader_export {
                if !exported_by(ShaderTarget::Pixel, pixel) {
                    return Err(BackendError::creation_failed(
                        desc.label,
                        format!("pixel shader export '{}' not found", pixel),
                    ));
                }
            }
            nodes.push(node.export_name.clone());
        }
        nodes.sort();

        let mesh_nodes = program.mesh_nodes().count();
        log::trace!(
            "DummyDevice: creating state object '{}' ({} nodes, {} mesh nodes)",
            desc.label,
            nodes.len(),
            mesh_nodes
        );

        Ok(DummyStateObject {
            id: self.allocate_id(),
            program_name: program.program_name.clone(),
            nodes,
            mesh_nodes,
            max_input_records: None,
            bytes_per_node_record: self.bytes_per_node_record,
            granularity: self.alignment,
            _tracked: Tracked::new(&self.stats, ObjectKind::StateObject),
        })
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<Self::Buffer> {
        self.check_label(&desc.label)?;
        if desc.size == 0 {
            return Err(BackendError::creation_failed(&desc.label, "zero-sized buffer"));
        }
        if desc.initial_state == ResourceState::UNORDERED_ACCESS
            && !desc.usage.contains(BufferUsage::UNORDERED_ACCESS)
        {
            return Err(BackendError::creation_failed(
                &desc.label,
                "unordered access state without unordered access usage",
            ));
        }

        let alignment = desc.alignment.max(1);
        let start_address = self.next_address.div_ceil(alignment) * alignment;
        self.next_address = start_address + desc.size;

        log::trace!(
            "DummyDevice: creating buffer '{}' (size: {}, address: {:#x})",
            desc.label,
            desc.size,
            start_address
        );

        Ok(DummyBuffer {
            label: desc.label.clone(),
            range: GpuVirtualRange {
                start_address,
                size_in_bytes: desc.size,
            },
            _tracked: Tracked::new(&self.stats, ObjectKind::Buffer),
        })
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor<'_>,
    ) -> BackendResult<Self::ComputePipeline> {
        self.check_label(desc.label)?;
        if desc.shader.target != ShaderTarget::Compute || !desc.shader.exports(desc.entry_point) {
            return Err(BackendError::creation_failed(
                desc.label,
                format!("'{}' is not a compute entry point", desc.entry_point),
            ));
        }

        log::trace!(
            "DummyDevice: creating compute pipeline '{}' ({})",
            desc.label,
            desc.entry_point
        );

        Ok(DummyComputePipeline {
            id: PipelineId(self.allocate_id()),
            _tracked: Tracked::new(&self.stats, ObjectKind::Pipeline),
        })
    }
}

/// A recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginMarker(String),
    EndMarker,
    Barriers(Vec<Barrier>),
    ClearRenderTarget {
        target: TextureHandle,
        color: [f32; 4],
    },
    ClearDepthStencil {
        target: TextureHandle,
        depth: f32,
    },
    BeginRaster {
        color_targets: Vec<TextureHandle>,
        depth_target: Option<TextureHandle>,
    },
    EndRaster,
    SetViewportScissor(Viewport),
    SetRootSignature {
        kind: PipelineKind,
        root_signature: RootSignatureId,
    },
    SetRootConstantBuffer {
        kind: PipelineKind,
        slot: u32,
        range: GpuVirtualRange,
    },
    SetTextureSrv {
        slot: u32,
        texture: TextureHandle,
    },
    SetTextureUav {
        slot: u32,
        texture: TextureHandle,
    },
    SetProgram(SetProgramDesc),
    DispatchGraph(DispatchGraphDesc),
    SetComputePipeline(PipelineId),
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
}

/// Command list that records instead of executing
#[derive(Debug, Default)]
pub struct RecordingCommandList {
    commands: Vec<Command>,
    uploads: HashMap<u64, Vec<u8>>,
    upload_offset: u64,
}

impl RecordingCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drop recorded commands and uploads, as if the list was reset for a new frame
    pub fn reset(&mut self) {
        self.commands.clear();
        self.uploads.clear();
        self.upload_offset = 0;
    }

    /// Bytes uploaded at the start of `range`
    pub fn constant_data(&self, range: GpuVirtualRange) -> Option<&[u8]> {
        self.uploads.get(&range.start_address).map(Vec::as_slice)
    }

    /// Every barrier recorded, in submission order
    pub fn barriers(&self) -> Vec<Barrier> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Barriers(b) => Some(b.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Labels of every marker opened, in order
    pub fn markers(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginMarker(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Position of the first command matching `pred`
    pub fn position(&self, pred: impl Fn(&Command) -> bool) -> Option<usize> {
        self.commands.iter().position(pred)
    }
}

impl CommandList for RecordingCommandList {
    fn begin_marker(&mut self, label: &str) {
        self.commands.push(Command::BeginMarker(label.to_string()));
    }

    fn end_marker(&mut self) {
        self.commands.push(Command::EndMarker);
    }

    fn resource_barriers(&mut self, barriers: &[Barrier]) {
        if !barriers.is_empty() {
            self.commands.push(Command::Barriers(barriers.to_vec()));
        }
    }

    fn clear_render_target(&mut self, target: TextureHandle, color: [f32; 4]) {
        self.commands.push(Command::ClearRenderTarget { target, color });
    }

    fn clear_depth_stencil(&mut self, target: TextureHandle, depth: f32) {
        self.commands.push(Command::ClearDepthStencil { target, depth });
    }

    fn begin_raster(&mut self, color_targets: &[TextureHandle], depth_target: Option<TextureHandle>) {
        self.commands.push(Command::BeginRaster {
            color_targets: color_targets.to_vec(),
            depth_target,
        });
    }

    fn end_raster(&mut self) {
        self.commands.push(Command::EndRaster);
    }

    fn set_viewport_scissor(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewportScissor(viewport));
    }

    fn alloc_constant_buffer(&mut self, data: &[u8]) -> GpuVirtualRange {
        let range = GpuVirtualRange {
            start_address: UPLOAD_BASE_ADDRESS + self.upload_offset,
            size_in_bytes: data.len() as u64,
        };
        self.upload_offset += (data.len() as u64).div_ceil(CONSTANT_BUFFER_ALIGNMENT).max(1)
            * CONSTANT_BUFFER_ALIGNMENT;
        self.uploads.insert(range.start_address, data.to_vec());
        log::trace!(
            "RecordingCommandList: uploaded {} bytes at {:#x}",
            data.len(),
            range.start_address
        );
        range
    }

    fn set_root_signature(&mut self, kind: PipelineKind, root_signature: RootSignatureId) {
        self.commands.push(Command::SetRootSignature {
            kind,
            root_signature,
        });
    }

    fn set_root_constant_buffer(&mut self, kind: PipelineKind, slot: u32, range: GpuVirtualRange) {
        self.commands
            .push(Command::SetRootConstantBuffer { kind, slot, range });
    }

    fn set_texture_srv(&mut self, slot: u32, texture: TextureHandle) {
        self.commands.push(Command::SetTextureSrv { slot, texture });
    }

    fn set_texture_uav(&mut self, slot: u32, texture: TextureHandle) {
        self.commands.push(Command::SetTextureUav { slot, texture });
    }

    fn set_program(&mut self, desc: &SetProgramDesc) {
        self.commands.push(Command::SetProgram(*desc));
    }

    fn dispatch_graph(&mut self, desc: &DispatchGraphDesc) {
        self.commands.push(Command::DispatchGraph(desc.clone()));
    }

    fn set_compute_pipeline(&mut self, pipeline: PipelineId) {
        self.commands.push(Command::SetComputePipeline(pipeline));
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch { x, y, z });
    }
}
