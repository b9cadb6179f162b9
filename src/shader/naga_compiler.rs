//! WGSL front-end producing SPIR-V modules through naga.

use super::{CompiledModule, ShaderCompiler, ShaderError, ShaderSources, ShaderTarget};

/// [`ShaderCompiler`] for WGSL sources.
pub struct NagaCompiler {
    sources: ShaderSources,
}

impl NagaCompiler {
    pub fn new(sources: ShaderSources) -> Self {
        Self { sources }
    }

    pub fn sources_mut(&mut self) -> &mut ShaderSources {
        &mut self.sources
    }

    fn compile(
        &self,
        source_id: &str,
        target: ShaderTarget,
        entry_point: Option<&str>,
    ) -> Result<CompiledModule, ShaderError> {
        let source = self.sources.load(source_id)?;
        let failed = |diagnostic: String| ShaderError::CompilationFailed {
            source_id: source_id.to_string(),
            diagnostic,
        };

        let module = naga::front::wgsl::parse_str(&source)
            .map_err(|e| failed(e.emit_to_string(&source)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        let info = validator
            .validate(&module)
            .map_err(|e| failed(format!("Validation error: {e}")))?;

        let (pipeline_options, exports) = match (target, entry_point) {
            (ShaderTarget::Library, _) => (
                None,
                module.entry_points.iter().map(|ep| ep.name.clone()).collect(),
            ),
            (ShaderTarget::Pixel | ShaderTarget::Compute, entry_point) => {
                let entry_point = entry_point.unwrap_or_default();
                let stage = if target == ShaderTarget::Pixel {
                    naga::ShaderStage::Fragment
                } else {
                    naga::ShaderStage::Compute
                };

                if !module
                    .entry_points
                    .iter()
                    .any(|ep| ep.name == entry_point && ep.stage == stage)
                {
                    return Err(ShaderError::EntryPointNotFound {
                        source_id: source_id.to_string(),
                        entry_point: entry_point.to_string(),
                        target,
                    });
                }

                (
                    Some(naga::back::spv::PipelineOptions {
                        shader_stage: stage,
                        entry_point: entry_point.to_string(),
                    }),
                    vec![entry_point.to_string()],
                )
            }
        };

        let options = naga::back::spv::Options::default();
        let spv = naga::back::spv::write_vec(&module, &info, &options, pipeline_options.as_ref())
            .map_err(|e| failed(format!("SPIR-V generation error: {e}")))?;

        log::debug!(
            "Compiled shader '{}' as {:?} ({} words, exports: {:?})",
            source_id,
            target,
            spv.len(),
            exports
        );

        Ok(CompiledModule::new(
            source_id,
            target,
            bytemuck::cast_slice::<u32, u8>(&spv).to_vec(),
            exports,
        ))
    }
}

impl ShaderCompiler for NagaCompiler {
    fn compile_library(&mut self, source_id: &str) -> Result<CompiledModule, ShaderError> {
        self.compile(source_id, ShaderTarget::Library, None)
    }

    fn compile_pixel_shader(
        &mut self,
        source_id: &str,
        entry_point: &str,
    ) -> Result<CompiledModule, ShaderError> {
        self.compile(source_id, ShaderTarget::Pixel, Some(entry_point))
    }

    fn compile_compute_shader(
        &mut self,
        source_id: &str,
        entry_point: &str,
    ) -> Result<CompiledModule, ShaderError> {
        self.compile(source_id, ShaderTarget::Compute, Some(entry_point))
    }
}
