//! Deferred shading pass
//!
//! A compute pass reading the G-buffer color and normal targets and writing
//! the lit result to the shading output. Sky pixels (color alpha 0) get a
//! gradient reconstructed from the inverse view-projection.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::backend::*;
use crate::pipeline::GBufferTargets;
use crate::scene::FrameCamera;
use crate::shader::ShaderCompiler;
use crate::work_graph::ProgramResult;
use crate::WorkGraphConfig;

/// Source id the shading kernel is registered under by default
pub const SHADING_SOURCE_ID: &str = "shading";

/// WGSL deferred shading kernel
pub const DEFERRED_SHADING_SHADER: &str = r#"
struct UpscalerInformation {
    full_screen_scale_ratio: vec4<f32>,
}

struct ShadingConstants {
    inverse_view_projection: mat4x4<f32>,
    camera_position: vec4<f32>,
    // Width and height of the rendered region, then their reciprocals
    render_size: vec4<f32>,
}

@group(0) @binding(0) var<uniform> upscaler: UpscalerInformation;
@group(0) @binding(1) var<uniform> shading: ShadingConstants;
@group(0) @binding(2) var gbuffer_color: texture_2d<f32>;
@group(0) @binding(3) var gbuffer_normal: texture_2d<f32>;
@group(0) @binding(4) var shading_output: texture_storage_2d<rgba8unorm, write>;

const SUN_DIRECTION: vec3<f32> = vec3<f32>(0.4, 0.8, 0.45);
const SKY_COLOR: vec3<f32> = vec3<f32>(0.55, 0.7, 0.9);
const HORIZON_COLOR: vec3<f32> = vec3<f32>(0.9, 0.9, 0.85);

fn sky(coord: vec2<u32>) -> vec3<f32> {
    let uv = (vec2<f32>(coord) + vec2<f32>(0.5, 0.5)) * shading.render_size.zw;
    // Reversed depth: z = 0 is the far plane
    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    let far_point = shading.inverse_view_projection * ndc;
    let ray = normalize(far_point.xyz / far_point.w - shading.camera_position.xyz);
    let t = pow(1.0 - max(ray.y, 0.0), 4.0);
    return mix(SKY_COLOR, HORIZON_COLOR, vec3<f32>(t, t, t));
}

@compute @workgroup_size(8, 8, 1)
fn MainCS(@builtin(global_invocation_id) id: vec3<u32>) {
    // The G-buffer was rasterized into a viewport at the origin, so output
    // pixels and G-buffer texels share coordinates inside the rendered region
    let region = min(vec2<u32>(shading.render_size.xy), textureDimensions(shading_output));
    if (id.x >= region.x || id.y >= region.y) {
        return;
    }

    let coord = vec2<i32>(id.xy);
    let albedo = textureLoad(gbuffer_color, coord, 0);

    if (albedo.a == 0.0) {
        textureStore(shading_output, coord, vec4<f32>(sky(id.xy), 1.0));
        return;
    }

    let normal = normalize(textureLoad(gbuffer_normal, coord, 0).xyz * 2.0 - vec3<f32>(1.0, 1.0, 1.0));
    let diffuse = max(dot(normal, normalize(SUN_DIRECTION)), 0.0);
    let ambient = SKY_COLOR * (0.3 + 0.2 * normal.y);
    let lit = albedo.rgb * (vec3<f32>(diffuse, diffuse, diffuse) + ambient);

    textureStore(shading_output, coord, vec4<f32>(lit, 1.0));
}
"#;

/// Render to display ratio (b0), as supplied by the host's upscaler.
///
/// The built-in kernel shades in render-resolution texel space and does not
/// read it; replacement kernels sampling display-sized resources do.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UpscalerInformation {
    pub full_screen_scale_ratio: Vec4,
}

/// Shading constant buffer (b1)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadingConstants {
    pub inverse_view_projection: Mat4,
    pub camera_position: Vec4,
    /// Rendered region: width, height, 1/width, 1/height
    pub render_size: Vec4,
}

impl ShadingConstants {
    pub fn new(camera: &FrameCamera, width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            inverse_view_projection: camera.view_projection().inverse(),
            camera_position: camera.position().extend(1.0),
            render_size: Vec4::new(w, h, 1.0 / w, 1.0 / h),
        }
    }
}

/// Thread groups covering `width` x `height` with square tiles
pub fn dispatch_size(width: u32, height: u32, tile_size: u32) -> (u32, u32, u32) {
    let tile = tile_size.max(1);
    (width.div_ceil(tile), height.div_ceil(tile), 1)
}

/// Inputs of one shading dispatch
#[derive(Debug, Clone, Copy)]
pub struct ShadingInputs<'a> {
    pub gbuffer: &'a GBufferTargets,
    pub output: TextureHandle,
    pub camera: &'a FrameCamera,
    pub full_screen_scale_ratio: Vec4,
    pub width: u32,
    pub height: u32,
}

/// Compute pipeline and root signature of the shading pass
pub struct ShadingPass<D: WorkGraphDevice> {
    root_signature: D::RootSignature,
    pipeline: D::ComputePipeline,
    tile_size: u32,
}

impl<D: WorkGraphDevice> ShadingPass<D> {
    pub fn new<C>(device: &mut D, compiler: &mut C, config: &WorkGraphConfig) -> ProgramResult<Self>
    where
        C: ShaderCompiler + ?Sized,
    {
        let root_signature = device.create_root_signature(
            &RootSignatureDescriptor::new("Shading_RootSignature", PipelineKind::Compute)
                .with_parameter(RootParameter::ConstantBuffer {
                    register: 0,
                    visibility: ShaderStageFlags::COMPUTE,
                })
                .with_parameter(RootParameter::ConstantBuffer {
                    register: 1,
                    visibility: ShaderStageFlags::COMPUTE,
                })
                .with_parameter(RootParameter::TextureSrvSet {
                    register: 0,
                    count: 2,
                    visibility: ShaderStageFlags::COMPUTE,
                })
                .with_parameter(RootParameter::TextureUavSet {
                    register: 0,
                    count: 1,
                    visibility: ShaderStageFlags::COMPUTE,
                }),
        )?;

        let shader =
            compiler.compile_compute_shader(&config.shading_source, &config.shading_entry_point)?;
        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: "ShadingPipeline",
            root_signature: root_signature.id(),
            shader: &shader,
            entry_point: &config.shading_entry_point,
        })?;

        log::debug!(
            "Created shading pipeline from '{}' ({})",
            config.shading_source,
            config.shading_entry_point
        );

        Ok(Self {
            root_signature,
            pipeline,
            tile_size: config.shading_tile_size,
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Record the shading dispatch, bracketed by output transitions
    pub fn record<L: CommandList + ?Sized>(&self, cmd: &mut L, inputs: &ShadingInputs<'_>) {
        let to_uav = Barrier::transition(
            inputs.output,
            ResourceState::SHADER_RESOURCE,
            ResourceState::UNORDERED_ACCESS,
        );
        cmd.resource_barriers(&[to_uav]);

        let upscaler = UpscalerInformation {
            full_screen_scale_ratio: inputs.full_screen_scale_ratio,
        };
        let upscaler_range = cmd.alloc_constant_buffer(bytemuck::bytes_of(&upscaler));
        let constants = ShadingConstants::new(inputs.camera, inputs.width, inputs.height);
        let constants_range = cmd.alloc_constant_buffer(bytemuck::bytes_of(&constants));

        cmd.set_root_signature(PipelineKind::Compute, self.root_signature.id());
        cmd.set_root_constant_buffer(PipelineKind::Compute, 0, upscaler_range);
        cmd.set_root_constant_buffer(PipelineKind::Compute, 1, constants_range);
        cmd.set_texture_srv(0, inputs.gbuffer.color.handle);
        cmd.set_texture_srv(1, inputs.gbuffer.normal.handle);
        cmd.set_texture_uav(0, inputs.output);
        cmd.set_compute_pipeline(self.pipeline.id());

        let (x, y, z) = dispatch_size(inputs.width, inputs.height, self.tile_size);
        log::trace!(
            "Shading {}x{} in {}x{} groups",
            inputs.width,
            inputs.height,
            x,
            y
        );
        cmd.dispatch(x, y, z);

        cmd.resource_barriers(&[to_uav.reversed()]);
    }
}
