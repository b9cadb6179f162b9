//! The set of shaders making up the procedural world graph.

use crate::backend::CullMode;

/// A pixel shader compiled from `source_id` with a single entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelShaderEntry {
    pub source_id: String,
    pub entry_point: String,
}

/// A mesh shader export and the pixel shader it rasterizes with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshNodeEntry {
    pub mesh_export: String,
    pub pixel_export: String,
    pub cull_mode: CullMode,
}

/// Names every shader library, pixel shader and mesh node of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCatalog {
    pub libraries: Vec<String>,
    pub pixel_shaders: Vec<PixelShaderEntry>,
    pub mesh_nodes: Vec<MeshNodeEntry>,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(mut self, source_id: &str) -> Self {
        self.libraries.push(source_id.to_string());
        self
    }

    pub fn with_pixel_shader(mut self, source_id: &str, entry_point: &str) -> Self {
        self.pixel_shaders.push(PixelShaderEntry {
            source_id: source_id.to_string(),
            entry_point: entry_point.to_string(),
        });
        self
    }

    pub fn with_mesh_node(mut self, mesh_export: &str, pixel_export: &str, cull_mode: CullMode) -> Self {
        self.mesh_nodes.push(MeshNodeEntry {
            mesh_export: mesh_export.to_string(),
            pixel_export: pixel_export.to_string(),
            cull_mode,
        });
        self
    }

    /// The procedural world: terrain, splines, vegetation and insects.
    ///
    /// Terrain and spline geometry is closed and culls back faces. Grass,
    /// flowers, mushrooms and insects are double-sided and don't cull.
    pub fn standard() -> Self {
        let mut catalog = Self::new();

        for library in [
            "world",
            "biomes",
            "tree",
            "rock",
            "terrainrenderer",
            "splinerenderer",
            "densegrassmeshshader",
            "sparsegrassmeshshader",
            "beemeshshader",
            "butterflymeshshader",
            "flowermeshshader",
            "mushroommeshshader",
        ] {
            catalog = catalog.with_library(library);
        }

        catalog = catalog
            .with_pixel_shader("terrainrenderer", "TerrainPixelShader")
            .with_pixel_shader("splinerenderer", "SplinePixelShader")
            .with_pixel_shader("grasspixelshader", "GrassPixelShader")
            .with_pixel_shader("insectpixelshader", "InsectPixelShader");

        catalog = catalog
            .with_mesh_node("TerrainMeshShader", "TerrainPixelShader", CullMode::Back)
            .with_mesh_node("SplineMeshShader", "SplinePixelShader", CullMode::Back);

        for grass in ["DenseGrassMeshShader", "SparseGrassMeshShader"] {
            catalog = catalog.with_mesh_node(grass, "GrassPixelShader", CullMode::None);
        }

        for insect in [
            "BeeMeshShader",
            "ButterflyMeshShader",
            "FlowerMeshShader",
            "SparseFlowerMeshShader",
            "MushroomMeshShader",
        ] {
            catalog = catalog.with_mesh_node(insect, "InsectPixelShader", CullMode::None);
        }

        catalog
    }
}
