//! Shader source lookup by id.

use std::collections::HashMap;
use std::path::PathBuf;

use super::ShaderError;

/// Resolves shader source ids to source text.
///
/// In-memory sources take precedence; otherwise `<directory>/<id>.<extension>`
/// is read from disk.
#[derive(Debug, Clone, Default)]
pub struct ShaderSources {
    sources: HashMap<String, String>,
    directory: Option<PathBuf>,
    extension: String,
}

impl ShaderSources {
    /// Create an empty source set for files with the given extension
    pub fn new(extension: &str) -> Self {
        Self {
            sources: HashMap::new(),
            directory: None,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Look up missing sources in `directory`
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Register an in-memory source
    pub fn with_source(mut self, source_id: &str, source: impl Into<String>) -> Self {
        self.insert(source_id, source);
        self
    }

    pub fn insert(&mut self, source_id: &str, source: impl Into<String>) {
        self.sources.insert(source_id.to_string(), source.into());
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.sources.contains_key(source_id) || self.file_path(source_id).is_some_and(|p| p.is_file())
    }

    fn file_path(&self, source_id: &str) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", source_id, self.extension)))
    }

    /// Load the source text for `source_id`
    pub fn load(&self, source_id: &str) -> Result<String, ShaderError> {
        if let Some(source) = self.sources.get(source_id) {
            return Ok(source.clone());
        }

        let path = self
            .file_path(source_id)
            .ok_or_else(|| ShaderError::SourceNotFound(source_id.to_string()))?;

        log::trace!("Loading shader source {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| {
            log::warn!("Failed to read shader {}: {}", path.display(), e);
            ShaderError::SourceNotFound(source_id.to_string())
        })
    }
}
