//! Work graph program construction
//!
//! A work graph program is assembled in three stages:
//! - [`NodeCatalog`] names the shader libraries, pixel shaders and mesh nodes
//! - [`GraphDescriptionBuilder`] turns compiled modules into a validated
//!   [`GraphProgramDescription`]
//! - [`ExecutableProgram`] hands the description to the device and resolves
//!   everything needed at dispatch time
//!
//! [`GraphMemory`] then owns the scratch memory the compiled graph asks for.

mod catalog;
mod description;
mod memory;
mod program;

pub use catalog::{MeshNodeEntry, NodeCatalog, PixelShaderEntry};
pub use description::{
    GraphDescriptionBuilder, GraphNodeSpec, GraphProgramDescription, GraphicsStateBlock, NodeKind,
    TargetFormats,
};
pub use memory::GraphMemory;
pub use program::ExecutableProgram;

use crate::backend::{BackendError, WorkGraphsTier};
use crate::shader::ShaderError;
use thiserror::Error;

/// Program construction errors. All of them are fatal for the render module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("work graphs {required} required, device supports {available}")]
    UnsupportedTier {
        required: WorkGraphsTier,
        available: WorkGraphsTier,
    },
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("invalid work graph description: {0}")]
    InvalidDescription(String),
    #[error("work graph program '{0}' not found in state object")]
    UnknownProgram(String),
    #[error("entry point '{node}' not found in work graph '{program}'")]
    UnknownEntryPoint { program: String, node: String },
}

pub type ProgramResult<T> = Result<T, ProgramError>;
