//! Work graph render module
//!
//! Per frame, the module records two phases into the host's command list:
//! 1. "Work Graph": the G-buffer is made writable and cleared, the per-frame
//!    constants are bound and the graph is launched from a single empty seed
//!    record. The GPU expands it into however many mesh node invocations the
//!    procedural world needs. The G-buffer is then handed back readable.
//! 2. "Shading": the deferred shading pass lights the G-buffer into the
//!    shading output.

use glam::Vec4;
use thiserror::Error;

use crate::backend::*;
use crate::pipeline::{
    FrameConstants, GBufferTargets, ProceduralSettings, ResolutionInfo, ShaderClock,
    ShadingInputs, ShadingPass, UpscalerState,
};
use crate::scene::FrameCamera;
use crate::shader::ShaderCompiler;
use crate::work_graph::{ExecutableProgram, GraphMemory, NodeCatalog, ProgramError};
use crate::WorkGraphConfig;

/// Errors raised while initializing the render module.
///
/// None of these are recoverable; the host is expected to shut down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderModuleError {
    #[error("invalid render targets: {0}")]
    InvalidTargets(String),
    #[error("render module already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Per-frame input supplied by the host
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Seconds since the previous frame
    pub delta_time: f64,
    pub camera: FrameCamera,
    pub resolution: ResolutionInfo,
    pub upscaler_state: UpscalerState,
    pub full_screen_scale_ratio: Vec4,
}

impl FrameContext {
    /// Context for rendering at a single resolution without upscaling
    pub fn native(delta_time: f64, camera: FrameCamera, width: u32, height: u32) -> Self {
        let resolution = ResolutionInfo::native(width, height);
        Self {
            delta_time,
            camera,
            resolution,
            upscaler_state: UpscalerState::None,
            full_screen_scale_ratio: resolution.full_screen_scale_ratio(),
        }
    }
}

struct ModuleResources<D: WorkGraphDevice> {
    gbuffer: GBufferTargets,
    shading_output: TextureHandle,
    // Drop order: memory and shading before the program they belong to
    memory: GraphMemory<D>,
    shading: ShadingPass<D>,
    program: ExecutableProgram<D>,
}

/// Renders the procedural world with a mesh node work graph
pub struct WorkGraphRenderModule<D: WorkGraphDevice> {
    config: WorkGraphConfig,
    settings: ProceduralSettings,
    clock: ShaderClock,
    resources: Option<ModuleResources<D>>,
}

impl<D: WorkGraphDevice> WorkGraphRenderModule<D> {
    /// Create a module that is not ready until [`init`](Self::init) succeeds
    pub fn new(config: WorkGraphConfig) -> Self {
        let settings = config.procedural;
        Self {
            config,
            settings,
            clock: ShaderClock::default(),
            resources: None,
        }
    }

    /// Build the work graph, its backing memory and the shading pipeline.
    ///
    /// On failure everything created so far is released and the module stays
    /// not ready.
    pub fn init<C>(
        &mut self,
        device: &mut D,
        compiler: &mut C,
        catalog: &NodeCatalog,
        gbuffer: GBufferTargets,
        shading_output: TextureHandle,
    ) -> Result<(), RenderModuleError>
    where
        C: ShaderCompiler + ?Sized,
    {
        if self.resources.is_some() {
            return Err(RenderModuleError::AlreadyInitialized);
        }

        gbuffer.validate().map_err(RenderModuleError::InvalidTargets)?;

        let program = ExecutableProgram::build(
            device,
            compiler,
            catalog,
            gbuffer.target_formats(),
            &self.config,
        )?;

        let memory = GraphMemory::ensure(
            device,
            program.program_identifier(),
            program.memory_requirements().max_size_in_bytes,
        )?;

        let shading = ShadingPass::new(device, compiler, &self.config)?;

        self.resources = Some(ModuleResources {
            gbuffer,
            shading_output,
            memory,
            shading,
            program,
        });

        log::info!("Work graph render module ready");
        Ok(())
    }

    /// Whether `init` completed and frames get recorded
    pub fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    /// Get the configuration.
    pub fn config(&self) -> &WorkGraphConfig {
        &self.config
    }

    /// Current wind settings
    pub fn settings(&self) -> &ProceduralSettings {
        &self.settings
    }

    /// Wind settings, applied from the next recorded frame
    pub fn settings_mut(&mut self) -> &mut ProceduralSettings {
        &mut self.settings
    }

    /// Draw the procedural settings. Returns true if a value changed.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> bool {
        self.settings.ui(ui)
    }

    /// Shader clock as of the last recorded frame
    pub fn clock(&self) -> &ShaderClock {
        &self.clock
    }

    /// Built program, once ready
    pub fn program(&self) -> Option<&ExecutableProgram<D>> {
        self.resources.as_ref().map(|r| &r.program)
    }

    /// Backing memory, once ready
    pub fn memory(&self) -> Option<&GraphMemory<D>> {
        self.resources.as_ref().map(|r| &r.memory)
    }

    /// Record one frame
    pub fn execute<L: CommandList + ?Sized>(&mut self, frame: &FrameContext, cmd: &mut L) {
        let Some(resources) = self.resources.as_mut() else {
            log::warn!("Work graph render module executed before init");
            return;
        };

        self.clock.advance(frame.delta_time);
        let (width, height) = frame.resolution.render_resolution(frame.upscaler_state);
        let gbuffer = resources.gbuffer;

        log::trace!(
            "Work graph frame at {}x{}, shader time {}",
            width,
            height,
            self.clock.time()
        );

        cmd.begin_marker("Work Graph");
        {
            cmd.resource_barriers(&gbuffer.write_barriers());

            let color_targets = gbuffer.color_targets();
            for target in color_targets {
                cmd.clear_render_target(target, [0.0; 4]);
            }
            cmd.clear_depth_stencil(gbuffer.depth.handle, 0.0);

            cmd.begin_raster(&color_targets, Some(gbuffer.depth.handle));
            cmd.set_viewport_scissor(Viewport::full(width, height));

            let constants = FrameConstants::new(&frame.camera, &self.clock, &self.settings);
            let constants_range = cmd.alloc_constant_buffer(bytemuck::bytes_of(&constants));
            cmd.set_root_signature(PipelineKind::Graphics, resources.program.root_signature_id());
            cmd.set_root_constant_buffer(PipelineKind::Graphics, 0, constants_range);

            cmd.set_program(&resources.memory.program_desc());
            // The seed record carries no payload
            cmd.dispatch_graph(&DispatchGraphDesc::NodeCpuInput(NodeCpuInput {
                entry_point_index: resources.program.entry_point_index(),
                num_records: 1,
                record_stride_in_bytes: 0,
                records: Vec::new(),
            }));
            resources.memory.mark_dispatched();

            cmd.end_raster();
            cmd.resource_barriers(&gbuffer.read_barriers());
        }
        cmd.end_marker();

        cmd.begin_marker("Shading");
        resources.shading.record(
            cmd,
            &ShadingInputs {
                gbuffer: &gbuffer,
                output: resources.shading_output,
                camera: &frame.camera,
                full_screen_scale_ratio: frame.full_screen_scale_ratio,
                width,
                height,
            },
        );
        cmd.end_marker();
    }

    /// Targets keep their size relative to the render resolution, so nothing
    /// is reallocated here.
    pub fn on_resize(&mut self, resolution: &ResolutionInfo) {
        log::debug!(
            "Work graph render module resized to {}x{} (display {}x{})",
            resolution.render_width,
            resolution.render_height,
            resolution.display_width,
            resolution.display_height
        );
    }
}
