//! Per-frame recording of the work graph render module.
//!
//! Frames are recorded into a [`RecordingCommandList`] and the command stream
//! is inspected for ordering, bindings and uploaded constants.

mod common;

use rstest::rstest;

use common::{
    camera, gbuffer, ready_module, uploaded_constants, uploaded_frame_constants, SHADING_OUTPUT,
};
use mesh_node_engine::backend::{
    Command, DispatchGraphDesc, PipelineKind, ResourceState, Viewport, WorkGraphFlags,
};
use mesh_node_engine::pipeline::{
    FrameContext, ProceduralSettings, ResolutionInfo, ShadingConstants, UpscalerInformation,
    UpscalerState,
};
use mesh_node_engine::{DummyDevice, RecordingCommandList, WorkGraphConfig};

fn frame(delta_time: f64) -> FrameContext {
    FrameContext::native(delta_time, camera(), 1920, 1080)
}

fn set_program_flags(cmd: &RecordingCommandList) -> Vec<WorkGraphFlags> {
    cmd.commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetProgram(desc) => Some(desc.flags),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Shader Time
// ============================================================================

#[rstest]
#[case::steady_60hz(&[0.0166, 0.0166, 0.0166], &[16, 32, 48])]
#[case::sub_millisecond(&[0.0004, 0.0009, 0.0011], &[0, 0, 1])]
#[case::hitch(&[0.016, 2.5, 0.016], &[16, 2516, 2532])]
#[case::paused(&[0.0, 0.0], &[0, 0])]
fn test_shader_time_accumulates(#[case] deltas: &[f64], #[case] expected: &[u32]) {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();

    let mut previous = module.clock().time();
    for (delta, expected) in deltas.iter().zip(expected) {
        cmd.reset();
        module.execute(&frame(*delta), &mut cmd);

        assert_eq!(module.clock().time(), *expected);
        assert_eq!(module.clock().previous_time(), previous);

        let constants = uploaded_frame_constants(&cmd);
        assert_eq!(constants.len(), 1);
        assert_eq!(constants[0].shader_time, *expected);
        assert_eq!(constants[0].previous_shader_time, previous);
        previous = *expected;
    }
}

#[test]
fn test_shader_time_wraps() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();

    // Just under 50 days of milliseconds
    module.execute(&frame(4_294_967.0), &mut cmd);
    assert_eq!(module.clock().time(), 4_294_967_000);

    module.execute(&frame(1.0), &mut cmd);
    assert_eq!(module.clock().previous_time(), 4_294_967_000);
    assert_eq!(
        module.clock().time(),
        4_294_967_000u32.wrapping_add(1000)
    );
    assert_eq!(module.clock().time(), 704);
}

// ============================================================================
// Backing Memory Initialization
// ============================================================================

#[test]
fn test_initialize_flag_cleared_after_first_dispatch() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();

    assert!(module.memory().unwrap().needs_initialize());

    for _ in 0..4 {
        module.execute(&frame(0.016), &mut cmd);
    }

    let flags = set_program_flags(&cmd);
    assert_eq!(flags.len(), 4);
    assert!(flags[0].contains(WorkGraphFlags::INITIALIZE));
    for later in &flags[1..] {
        assert!(!later.contains(WorkGraphFlags::INITIALIZE));
    }
    assert!(!module.memory().unwrap().needs_initialize());
}

#[test]
fn test_dispatch_without_backing_memory() {
    let mut device = DummyDevice::new().with_bytes_per_node_record(0);
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let desc = cmd
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::SetProgram(desc) => Some(*desc),
            _ => None,
        })
        .unwrap();
    assert!(desc.backing_memory.is_empty());
    assert_eq!(device.stats().created_buffers, 0);
}

#[test]
fn test_single_empty_seed_record() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let entry_index = module.program().unwrap().entry_point_index();
    let dispatches: Vec<_> = cmd
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::DispatchGraph(DispatchGraphDesc::NodeCpuInput(input)) => Some(input.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].entry_point_index, entry_index);
    assert_eq!(dispatches[0].num_records, 1);
    assert_eq!(dispatches[0].record_stride_in_bytes, 0);
    assert!(dispatches[0].records.is_empty());
}

// ============================================================================
// Resolution
// ============================================================================

#[rstest]
#[case::no_upscaler(UpscalerState::None, (1920, 1080))]
#[case::post_upscale(UpscalerState::PostUpscale, (1920, 1080))]
#[case::pre_upscale(UpscalerState::PreUpscale, (1280, 720))]
fn test_render_resolution(#[case] state: UpscalerState, #[case] expected: (u32, u32)) {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();

    let resolution = ResolutionInfo {
        render_width: 1280,
        render_height: 720,
        display_width: 1920,
        display_height: 1080,
    };
    let context = FrameContext {
        delta_time: 0.016,
        camera: camera(),
        resolution,
        upscaler_state: state,
        full_screen_scale_ratio: resolution.full_screen_scale_ratio(),
    };
    module.execute(&context, &mut cmd);

    assert!(cmd
        .commands()
        .contains(&Command::SetViewportScissor(Viewport::full(expected.0, expected.1))));
    assert!(cmd.commands().contains(&Command::Dispatch {
        x: expected.0.div_ceil(8),
        y: expected.1.div_ceil(8),
        z: 1,
    }));
}

#[rstest]
#[case::no_upscaler(UpscalerState::None, (1920.0, 1080.0))]
#[case::pre_upscale(UpscalerState::PreUpscale, (1280.0, 720.0))]
fn test_shading_constants_follow_render_resolution(
    #[case] state: UpscalerState,
    #[case] render_size: (f32, f32),
) {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();

    let resolution = ResolutionInfo {
        render_width: 1280,
        render_height: 720,
        display_width: 1920,
        display_height: 1080,
    };
    let context = FrameContext {
        delta_time: 0.016,
        camera: camera(),
        resolution,
        upscaler_state: state,
        full_screen_scale_ratio: resolution.full_screen_scale_ratio(),
    };
    module.execute(&context, &mut cmd);

    let upscaler: Vec<UpscalerInformation> = uploaded_constants(&cmd, PipelineKind::Compute, 0);
    assert_eq!(upscaler.len(), 1);
    assert_eq!(
        upscaler[0].full_screen_scale_ratio,
        resolution.full_screen_scale_ratio()
    );

    // The kernel shades texel for texel over the rendered region
    let shading: Vec<ShadingConstants> = uploaded_constants(&cmd, PipelineKind::Compute, 1);
    assert_eq!(shading.len(), 1);
    let size = shading[0].render_size;
    assert_eq!((size.x, size.y), render_size);
    assert!((size.z * size.x - 1.0).abs() < 1e-6);
    assert!((size.w * size.y - 1.0).abs() < 1e-6);
}

// ============================================================================
// Ordering and Barriers
// ============================================================================

#[test]
fn test_gbuffer_barriers_are_paired() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let barriers = cmd.barriers();
    // 4 into raster states, 4 back, then the shading output in and out
    assert_eq!(barriers.len(), 10);

    let (write, rest) = barriers.split_at(4);
    let (read, shading) = rest.split_at(4);
    for (w, r) in write.iter().zip(read) {
        assert_eq!(r, &w.reversed());
        assert_eq!(w.before, ResourceState::SHADER_RESOURCE);
    }
    let gbuffer = gbuffer();
    assert_eq!(write[3].resource, gbuffer.depth.handle);
    assert_eq!(write[3].after, ResourceState::DEPTH_WRITE);

    assert_eq!(shading[0].resource, SHADING_OUTPUT);
    assert_eq!(shading[0].after, ResourceState::UNORDERED_ACCESS);
    assert_eq!(shading[1], shading[0].reversed());
}

#[test]
fn test_frame_command_order() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let first_barrier = cmd.position(|c| matches!(c, Command::Barriers(_))).unwrap();
    let first_clear = cmd
        .position(|c| matches!(c, Command::ClearRenderTarget { .. }))
        .unwrap();
    let begin_raster = cmd
        .position(|c| matches!(c, Command::BeginRaster { .. }))
        .unwrap();
    let set_program = cmd.position(|c| matches!(c, Command::SetProgram(_))).unwrap();
    let dispatch_graph = cmd
        .position(|c| matches!(c, Command::DispatchGraph(_)))
        .unwrap();
    let end_raster = cmd.position(|c| matches!(c, Command::EndRaster)).unwrap();
    let shading_dispatch = cmd
        .position(|c| matches!(c, Command::Dispatch { .. }))
        .unwrap();

    assert!(first_barrier < first_clear);
    assert!(first_clear < begin_raster);
    assert!(begin_raster < set_program);
    assert!(set_program < dispatch_graph);
    assert!(dispatch_graph < end_raster);
    assert!(end_raster < shading_dispatch);

    // G-buffer handed back before the shading output is made writable
    let barrier_batches: Vec<usize> = cmd
        .commands()
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Command::Barriers(_)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(barrier_batches.len(), 4);
    assert!(barrier_batches[1] > end_raster);
    assert!(barrier_batches[2] > barrier_batches[1]);
    assert!(barrier_batches[2] < shading_dispatch);
    assert!(barrier_batches[3] > shading_dispatch);

    assert_eq!(cmd.markers(), vec!["Work Graph", "Shading"]);
    let ends = cmd
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::EndMarker))
        .count();
    assert_eq!(ends, 2);
}

#[test]
fn test_targets_cleared_and_bound() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let gbuffer = gbuffer();
    for target in gbuffer.color_targets() {
        assert!(cmd.commands().contains(&Command::ClearRenderTarget {
            target,
            color: [0.0; 4],
        }));
    }
    assert!(cmd.commands().contains(&Command::ClearDepthStencil {
        target: gbuffer.depth.handle,
        depth: 0.0,
    }));
    assert!(cmd.commands().contains(&Command::BeginRaster {
        color_targets: gbuffer.color_targets().to_vec(),
        depth_target: Some(gbuffer.depth.handle),
    }));
}

#[test]
fn test_shading_bindings() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let gbuffer = gbuffer();
    let commands = cmd.commands();
    assert!(commands.contains(&Command::SetTextureSrv {
        slot: 0,
        texture: gbuffer.color.handle,
    }));
    assert!(commands.contains(&Command::SetTextureSrv {
        slot: 1,
        texture: gbuffer.normal.handle,
    }));
    assert!(commands.contains(&Command::SetTextureUav {
        slot: 0,
        texture: SHADING_OUTPUT,
    }));

    let compute_slots: Vec<u32> = commands
        .iter()
        .filter_map(|c| match c {
            Command::SetRootConstantBuffer {
                kind: PipelineKind::Compute,
                slot,
                ..
            } => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(compute_slots, vec![0, 1]);
}

// ============================================================================
// Frame Constants
// ============================================================================

#[rstest]
#[case::zero(0.0, 0.0)]
#[case::quarter(90.0, std::f32::consts::FRAC_PI_2)]
#[case::half(180.0, std::f32::consts::PI)]
#[case::full(360.0, std::f32::consts::TAU)]
fn test_wind_direction_in_radians(#[case] degrees: f32, #[case] radians: f32) {
    let mut device = DummyDevice::new();
    let config = WorkGraphConfig {
        procedural: ProceduralSettings::new(1.5, degrees),
        ..Default::default()
    };
    let mut module = ready_module(&mut device, config);
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let constants = uploaded_frame_constants(&cmd);
    assert!((constants[0].wind_direction - radians).abs() < 1e-5);
    assert_eq!(constants[0].wind_strength, 1.5);
}

#[test]
fn test_settings_changes_reach_next_frame() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();

    module.settings_mut().set_wind_strength(2.25);
    module.execute(&frame(0.016), &mut cmd);

    assert_eq!(uploaded_frame_constants(&cmd)[0].wind_strength, 2.25);
}

#[test]
fn test_camera_constants() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    let mut cmd = RecordingCommandList::new();
    module.execute(&frame(0.016), &mut cmd);

    let camera = camera();
    let constants = uploaded_frame_constants(&cmd)[0];
    assert_eq!(
        constants.view_projection,
        camera.projection_jittered * camera.view
    );
    assert!(constants
        .camera_position
        .truncate()
        .abs_diff_eq(glam::Vec3::new(10.0, 20.0, 30.0), 1e-3));
    assert!(constants
        .previous_camera_position
        .truncate()
        .abs_diff_eq(glam::Vec3::new(9.0, 20.0, 30.0), 1e-3));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_module_releases_device_objects() {
    let mut device = DummyDevice::new();
    let module = ready_module(&mut device, WorkGraphConfig::default());
    // Root signatures (graph and shading), state object, backing memory, pipeline
    assert_eq!(device.stats().live_objects(), 5);

    drop(module);
    assert_eq!(device.stats().live_objects(), 0);
}

#[test]
fn test_resize_keeps_module_ready() {
    let mut device = DummyDevice::new();
    let mut module = ready_module(&mut device, WorkGraphConfig::default());
    module.on_resize(&ResolutionInfo::native(800, 600));
    assert!(module.is_ready());
}
