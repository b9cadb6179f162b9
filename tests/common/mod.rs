//! Shared fixtures for the integration tests.
//!
//! Everything runs against the dummy device; the shader compiler hands out
//! placeholder modules with the exports of the procedural world libraries
//! and keeps weak references to them so tests can check they were released.

#![allow(dead_code)]

use std::sync::{Arc, Weak};

use glam::{Mat4, Vec3};
use mesh_node_engine::backend::{Command, PipelineKind, TextureHandle};
use mesh_node_engine::pipeline::{FrameConstants, GBufferTargets};
use mesh_node_engine::scene::FrameCamera;
use mesh_node_engine::shader::{CompiledModule, ShaderCompiler, ShaderError, ShaderTarget};
use mesh_node_engine::{
    DummyDevice, NodeCatalog, RecordingCommandList, WorkGraphConfig, WorkGraphRenderModule,
};

pub const SHADING_OUTPUT: TextureHandle = TextureHandle(100);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Exports of each library in the standard catalog
pub fn library_exports(source_id: &str) -> Option<&'static [&'static str]> {
    let exports: &'static [&'static str] = match source_id {
        "world" => &["World", "ChunkGrid"],
        "biomes" => &["Biomes"],
        "tree" => &["Tree"],
        "rock" => &["Rock"],
        "terrainrenderer" => &["TerrainMeshShader"],
        "splinerenderer" => &["SplineMeshShader"],
        "densegrassmeshshader" => &["DenseGrassMeshShader"],
        "sparsegrassmeshshader" => &["SparseGrassMeshShader"],
        "beemeshshader" => &["BeeMeshShader"],
        "butterflymeshshader" => &["ButterflyMeshShader"],
        "flowermeshshader" => &["FlowerMeshShader", "SparseFlowerMeshShader"],
        "mushroommeshshader" => &["MushroomMeshShader"],
        _ => return None,
    };
    Some(exports)
}

/// Total node count of the standard catalog
pub const STANDARD_NODE_COUNT: usize = 14;

/// Compiler producing placeholder modules for the standard catalog
#[derive(Default)]
pub struct ProceduralCompiler {
    issued: Vec<Weak<[u8]>>,
    failing: Option<String>,
}

impl ProceduralCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail compilation of `source_id`
    pub fn failing_on(source_id: &str) -> Self {
        Self {
            issued: Vec::new(),
            failing: Some(source_id.to_string()),
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Modules handed out that are still alive somewhere
    pub fn live_modules(&self) -> usize {
        self.issued.iter().filter(|m| m.upgrade().is_some()).count()
    }

    fn issue(
        &mut self,
        source_id: &str,
        target: ShaderTarget,
        exports: Vec<String>,
    ) -> Result<CompiledModule, ShaderError> {
        if self.failing.as_deref() == Some(source_id) {
            return Err(ShaderError::CompilationFailed {
                source_id: source_id.to_string(),
                diagnostic: "error: injected".to_string(),
            });
        }
        let module = CompiledModule::new(source_id, target, vec![0xAB; 32], exports);
        self.issued.push(Arc::downgrade(&module.bytecode));
        Ok(module)
    }
}

impl ShaderCompiler for ProceduralCompiler {
    fn compile_library(&mut self, source_id: &str) -> Result<CompiledModule, ShaderError> {
        let exports = library_exports(source_id)
            .ok_or_else(|| ShaderError::SourceNotFound(source_id.to_string()))?
            .iter()
            .map(|e| e.to_string())
            .collect();
        self.issue(source_id, ShaderTarget::Library, exports)
    }

    fn compile_pixel_shader(
        &mut self,
        source_id: &str,
        entry_point: &str,
    ) -> Result<CompiledModule, ShaderError> {
        self.issue(source_id, ShaderTarget::Pixel, vec![entry_point.to_string()])
    }

    fn compile_compute_shader(
        &mut self,
        source_id: &str,
        entry_point: &str,
    ) -> Result<CompiledModule, ShaderError> {
        self.issue(source_id, ShaderTarget::Compute, vec![entry_point.to_string()])
    }
}

pub fn gbuffer() -> GBufferTargets {
    GBufferTargets::new(
        TextureHandle(10),
        TextureHandle(11),
        TextureHandle(12),
        TextureHandle(13),
    )
}

pub fn camera() -> FrameCamera {
    let projection = Mat4::perspective_rh(1.0, 16.0 / 9.0, 5000.0, 0.1);
    FrameCamera {
        view: Mat4::look_at_rh(Vec3::new(10.0, 20.0, 30.0), Vec3::ZERO, Vec3::Y),
        previous_view: Mat4::look_at_rh(Vec3::new(9.0, 20.0, 30.0), Vec3::ZERO, Vec3::Y),
        projection_jittered: projection,
        previous_projection_jittered: projection,
    }
}

/// Module initialized with the standard catalog on `device`
pub fn ready_module(
    device: &mut DummyDevice,
    config: WorkGraphConfig,
) -> WorkGraphRenderModule<DummyDevice> {
    init_logging();
    let mut module = WorkGraphRenderModule::new(config);
    module
        .init(
            device,
            &mut ProceduralCompiler::new(),
            &NodeCatalog::standard(),
            gbuffer(),
            SHADING_OUTPUT,
        )
        .expect("render module init");
    module
}

/// Constant data bound to `slot` of the `kind` root signature, in recording order
pub fn uploaded_constants<T: bytemuck::Pod>(
    cmd: &RecordingCommandList,
    kind: PipelineKind,
    slot: u32,
) -> Vec<T> {
    cmd.commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetRootConstantBuffer {
                kind: bound_kind,
                slot: bound_slot,
                range,
            } if *bound_kind == kind && *bound_slot == slot => cmd.constant_data(*range),
            _ => None,
        })
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect()
}

/// Frame constants uploaded for the work graph in the recorded frame
pub fn uploaded_frame_constants(cmd: &RecordingCommandList) -> Vec<FrameConstants> {
    uploaded_constants(cmd, PipelineKind::Graphics, 0)
}
