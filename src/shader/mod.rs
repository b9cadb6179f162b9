//! Shader module compilation.
//!
//! The work graph program is assembled from compiled shader modules: compute
//! libraries that export any number of graph nodes, and pixel shaders that
//! export a single entry point referenced by mesh nodes.
//!
//! Compilation itself is behind the [`ShaderCompiler`] trait so the host can
//! plug in whatever front-end matches its shader language. A WGSL front-end
//! based on naga ships with the crate as [`NagaCompiler`].

#[cfg(feature = "naga-compiler")]
mod naga_compiler;
mod sources;

#[cfg(feature = "naga-compiler")]
pub use naga_compiler::NagaCompiler;
pub use sources::ShaderSources;

use std::sync::Arc;
use thiserror::Error;

/// What a module is compiled as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderTarget {
    /// Library exporting every node and mesh shader it defines
    Library,
    /// Pixel shader with one entry point
    Pixel,
    /// Compute shader with one entry point
    Compute,
}

/// Shader compilation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader source '{0}' not found")]
    SourceNotFound(String),
    #[error("failed to compile shader '{source_id}':\n{diagnostic}")]
    CompilationFailed {
        source_id: String,
        diagnostic: String,
    },
    #[error("entry point '{entry_point}' not found in shader '{source_id}' for {target:?} target")]
    EntryPointNotFound {
        source_id: String,
        entry_point: String,
        target: ShaderTarget,
    },
}

/// A compiled binary module and the symbols it exports.
///
/// The bytecode is reference counted; the module is released once the last
/// owner drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    pub source_id: String,
    pub target: ShaderTarget,
    pub bytecode: Arc<[u8]>,
    pub exports: Vec<String>,
}

impl CompiledModule {
    pub fn new(
        source_id: impl Into<String>,
        target: ShaderTarget,
        bytecode: impl Into<Arc<[u8]>>,
        exports: Vec<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target,
            bytecode: bytecode.into(),
            exports,
        }
    }

    pub fn exports(&self, symbol: &str) -> bool {
        self.exports.iter().any(|e| e == symbol)
    }
}

/// Turns named shader sources into compiled modules
pub trait ShaderCompiler {
    /// Compile a source unit as a library exporting all of its entry points
    fn compile_library(&mut self, source_id: &str) -> Result<CompiledModule, ShaderError>;

    /// Compile a single pixel shader entry point
    fn compile_pixel_shader(
        &mut self,
        source_id: &str,
        entry_point: &str,
    ) -> Result<CompiledModule, ShaderError>;

    /// Compile a single compute shader entry point
    fn compile_compute_shader(
        &mut self,
        source_id: &str,
        entry_point: &str,
    ) -> Result<CompiledModule, ShaderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let module = CompiledModule::new(
            "tree",
            ShaderTarget::Library,
            vec![0u8; 4],
            vec!["Tree".into(), "TreeBranches".into()],
        );
        assert!(module.exports("Tree"));
        assert!(!module.exports("Rock"));
    }

    #[test]
    fn test_error_display_carries_diagnostic() {
        let err = ShaderError::CompilationFailed {
            source_id: "world".into(),
            diagnostic: "error: unknown identifier".into(),
        };
        let text = err.to_string();
        assert!(text.contains("world"));
        assert!(text.contains("unknown identifier"));
    }
}
