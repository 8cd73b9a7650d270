//! 一帧的 pass 声明
//!
//! ```text
//!  Compute                     Graphics
//! ┌────────────────────┐
//! │ Mesh Culling Pass  │───────┐
//! └────────────────────┘       ▼
//! ┌────────────────────┐    ┌────────────────────┐
//! │ Light Binning      │    │ Prepass            │  depth
//! └────────────────────┘    └─────────┬──────────┘
//! ┌────────────────────┐              ▼
//! │ Weather Pass       │──────▶┌────────────────────┐
//! └────────────────────┘       │ Clouds Pass        │  clouds (scaled)
//! ┌────────────────────┐◀──────└─────────┬──────────┘
//! │ Sky Visibility     │(cvar)           ▼
//! └────────────────────┘──────▶┌────────────────────┐
//!                              │ Forward Pass       │  HDR
//!                              └─────────┬──────────┘
//!                               Bloom (cvar) → Post Process → Editor → [Present]
//! ```

use crate::config::RenderCvars;
use crate::scene::{BACK_BUFFER_COUNT, DemoScene};
use ash::vk;
use vanguard_render_graph::render_graph::{
    RenderGraph, RgBufferDesc, RgImageDesc, RgImageState, RgImportedBuffer, RgImportedImage, RgOutputBind,
    RgResourceBind, RgResourceHandle, RgViewRequest,
};
use vanguard_render_interface::bindless::BindlessIndex;
use vanguard_render_interface::command_list::{GfxLoadOp, bind_constants};
use vanguard_render_interface::queue::GfxQueueType;

/// bloom 降采样链的 mip 数量
const BLOOM_MIP_COUNT: u32 = 4;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshCullData {
    input_buffer: BindlessIndex,
    output_buffer: BindlessIndex,
    object_buffer: BindlessIndex,
    camera_buffer: BindlessIndex,
    draw_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CloudsData {
    weather_texture: BindlessIndex,
    camera_buffer: BindlessIndex,
    geometry_depth: BindlessIndex,
    depth_texture: BindlessIndex,
    time_slice: u32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ForwardData {
    object_buffer: BindlessIndex,
    camera_buffer: BindlessIndex,
    light_buffer: BindlessIndex,
    light_list: BindlessIndex,
    clouds_texture: BindlessIndex,
    /// 体积光关闭时为 null
    clouds_visibility: BindlessIndex,
}

/// 导入到 graph 中的持久资源
#[derive(Clone, Copy)]
struct ImportedTags {
    back_buffer: RgResourceHandle,
    camera: RgResourceHandle,
    instances: RgResourceHandle,
    lights: RgResourceHandle,
    mesh_args: RgResourceHandle,
    weather: RgResourceHandle,
}

fn import_scene(graph: &mut RenderGraph<'_>, scene: &DemoScene, frame: u64) -> ImportedTags {
    // 每个 back buffer 第一次使用时处于 UNDEFINED，之后都停留在呈现状态
    let frames_alive = scene.frames_alive(frame);
    let back_buffer_state =
        if frames_alive < BACK_BUFFER_COUNT as u64 { RgImageState::UNDEFINED } else { RgImageState::PRESENT };
    let back_buffer = graph.import_image(
        "back_buffer",
        RgImportedImage::new(scene.back_buffer(frame), scene.back_buffer_format).with_initial_state(back_buffer_state),
    );
    graph.tag_back_buffer(back_buffer);

    let weather_state = if frames_alive == 0 { RgImageState::UNDEFINED } else { RgImageState::GENERAL };
    ImportedTags {
        back_buffer,
        camera: graph.import_buffer("camera_buffer", RgImportedBuffer::new(scene.camera_buffer)),
        instances: graph.import_buffer("instance_buffer", RgImportedBuffer::new(scene.instance_buffer)),
        lights: graph.import_buffer("light_buffer", RgImportedBuffer::new(scene.light_buffer)),
        mesh_args: graph.import_buffer("mesh_indirect_args", RgImportedBuffer::new(scene.mesh_args_buffer)),
        weather: graph.import_image(
            "weather",
            RgImportedImage::new(scene.weather_texture, vk::Format::R8G8B8A8_UNORM).with_initial_state(weather_state),
        ),
    }
}

/// 声明一帧中所有的 pass
pub fn build_frame_graph(graph: &mut RenderGraph<'_>, scene: &DemoScene, cvars: &RenderCvars, frame: u64) {
    let tags = import_scene(graph, scene, frame);
    let color_format = graph.frame_settings().color_format;
    let depth_format = graph.frame_settings().depth_format;
    let instance_count = scene.instance_count;
    let light_count = scene.light_count;

    // === Mesh Culling ===
    let mut mesh_cull = graph.add_pass("Mesh Culling Pass", GfxQueueType::Compute);
    let culled_args = mesh_cull.create_buffer(RgBufferDesc::structured(instance_count as u64, 20), "culled_mesh_args");
    mesh_cull
        .read(tags.mesh_args, RgResourceBind::Srv)
        .read(tags.instances, RgResourceBind::Srv)
        .read(tags.camera, RgResourceBind::Srv)
        .write(culled_args, RgResourceBind::Uav)
        .bind(move |cmd, res| {
            let data = MeshCullData {
                input_buffer: res.get(tags.mesh_args),
                output_buffer: res.get(culled_args),
                object_buffer: res.get(tags.instances),
                camera_buffer: res.get(tags.camera),
                draw_count: instance_count,
            };
            bind_constants(cmd, "bindData", &data);
            cmd.dispatch(instance_count.div_ceil(64), 1, 1);
        });

    // === Prepass ===
    let mut prepass = graph.add_pass("Prepass", GfxQueueType::Graphics);
    let depth = prepass.create_image(RgImageDesc::scaled_2d(1.0, depth_format), "depth_stencil");
    prepass
        .read(tags.instances, RgResourceBind::Srv)
        .read(tags.camera, RgResourceBind::Srv)
        .read(culled_args, RgResourceBind::Indirect)
        .output(depth, RgOutputBind::Dsv, GfxLoadOp::Clear)
        .bind(move |cmd, _| cmd.draw(3, instance_count));

    // === Clustered light binning（异步计算）===
    let mut binning = graph.add_pass("Light Binning", GfxQueueType::Compute);
    let light_list = binning.create_buffer(RgBufferDesc::structured(light_count as u64 * 32, 4), "cluster_light_list");
    binning
        .read(tags.lights, RgResourceBind::Srv)
        .read(tags.camera, RgResourceBind::Srv)
        .write(light_list, RgResourceBind::Uav)
        .bind(move |cmd, res| {
            bind_constants(cmd, "bindData", &[res.get(tags.lights), res.get(light_list)]);
            cmd.dispatch(light_count.div_ceil(32), 1, 1);
        });

    // === Clouds ===
    graph
        .add_pass("Weather Pass", GfxQueueType::Compute)
        .write(tags.weather, RgViewRequest::custom().uav_mip("", 0))
        .bind(move |cmd, res| {
            bind_constants(cmd, "bindData", &res.get(tags.weather));
            cmd.dispatch(64, 64, 1);
        });

    let mut clouds = graph.add_pass("Clouds Pass", GfxQueueType::Graphics);
    let clouds_output = clouds.create_image(
        RgImageDesc::scaled_2d(cvars.cloud_render_scale, color_format),
        "clouds_scattering_transmittance",
    );
    let clouds_depth =
        clouds.create_image(RgImageDesc::scaled_2d(cvars.cloud_render_scale, vk::Format::R32_SFLOAT), "clouds_depth");
    clouds
        .read(tags.camera, RgResourceBind::Srv)
        .read(tags.weather, RgResourceBind::Srv)
        .read(depth, RgResourceBind::Srv)
        .output(clouds_output, RgOutputBind::Rtv, GfxLoadOp::Preserve)
        .write(clouds_depth, RgViewRequest::custom().uav_mip("", 0))
        .bind(move |cmd, res| {
            let data = CloudsData {
                weather_texture: res.get(tags.weather),
                camera_buffer: res.get(tags.camera),
                geometry_depth: res.get(depth),
                depth_texture: res.get(clouds_depth),
                time_slice: (frame % 16) as u32,
            };
            bind_constants(cmd, "bindData", &data);
            cmd.draw(3, 1);
        });

    let mut visibility = graph.add_pass_enabled(
        "Clouds Sky Visibility Pass",
        GfxQueueType::Compute,
        cvars.render_light_shafts,
    );
    let clouds_visibility = visibility.create_image(
        RgImageDesc::scaled_2d(cvars.cloud_render_scale, vk::Format::R16_SFLOAT),
        "clouds_visibility",
    );
    visibility
        .read(clouds_depth, RgResourceBind::Srv)
        .write(clouds_visibility, RgResourceBind::Uav)
        .bind(move |cmd, res| {
            bind_constants(cmd, "bindData", &[res.get(clouds_depth), res.get(clouds_visibility)]);
            cmd.dispatch(30, 17, 1);
        });

    // === Forward ===
    let mut forward = graph.add_pass("Forward Pass", GfxQueueType::Graphics);
    let output_hdr = forward.create_image(RgImageDesc::scaled_2d(1.0, color_format), "output_hdr");
    forward
        .read(depth, RgResourceBind::Dsv)
        .read(tags.instances, RgResourceBind::Srv)
        .read(tags.camera, RgResourceBind::Srv)
        .read(tags.lights, RgResourceBind::Srv)
        .read(light_list, RgResourceBind::Srv)
        .read(clouds_output, RgResourceBind::Srv)
        .read(clouds_visibility, RgResourceBind::Srv)
        .read(culled_args, RgResourceBind::Indirect)
        .output(output_hdr, RgOutputBind::Rtv, GfxLoadOp::Clear)
        .bind(move |cmd, res| {
            let data = ForwardData {
                object_buffer: res.get(tags.instances),
                camera_buffer: res.get(tags.camera),
                light_buffer: res.get(tags.lights),
                light_list: res.get(light_list),
                clouds_texture: res.get(clouds_output),
                clouds_visibility: res.get(clouds_visibility),
            };
            bind_constants(cmd, "bindData", &data);
            cmd.draw(36, instance_count);
        });

    // === Bloom ===
    let mut bloom = graph.add_pass_enabled("Bloom Pass", GfxQueueType::Graphics, cvars.bloom_enabled);
    let bloom_chain = bloom.create_image(
        RgImageDesc::scaled_2d(0.5, color_format).with_mip_levels(BLOOM_MIP_COUNT),
        "bloom_chain",
    );
    let bloom_views = (0..BLOOM_MIP_COUNT)
        .fold(RgViewRequest::custom().uav_mip("", 0), |request, mip| request.uav_mip(format!("mip{mip}"), mip));
    bloom.read(output_hdr, RgResourceBind::Srv).write(bloom_chain, bloom_views).bind(move |cmd, res| {
        for mip in 0..BLOOM_MIP_COUNT {
            bind_constants(cmd, "bindData", &[res.get(output_hdr), res.get_named(bloom_chain, &format!("mip{mip}"))]);
            cmd.dispatch((60 >> mip).max(1), (34 >> mip).max(1), 1);
        }
    });

    // === Post Process ===
    let mut post = graph.add_pass("Post Process Pass", GfxQueueType::Graphics);
    let output_ldr = post.create_image(RgImageDesc::scaled_2d(1.0, vk::Format::R8G8B8A8_SRGB), "output_ldr");
    post.read(output_hdr, RgResourceBind::Srv)
        .read(bloom_chain, RgResourceBind::Srv)
        .output(output_ldr, RgOutputBind::Rtv, GfxLoadOp::Clear)
        .bind(move |cmd, res| {
            bind_constants(cmd, "bindData", &[res.get(output_hdr), res.get(bloom_chain)]);
            cmd.draw(3, 1);
        });

    // === Editor ===
    graph
        .add_pass("Editor Pass", GfxQueueType::Graphics)
        .read(output_ldr, RgResourceBind::Srv)
        .output(tags.back_buffer, RgOutputBind::Rtv, GfxLoadOp::Discard)
        .bind(move |cmd, res| {
            bind_constants(cmd, "bindData", &res.get(output_ldr));
            cmd.draw(3, 1);
        });

    graph
        .add_pass_enabled("Cluster Debug Overlay", GfxQueueType::Graphics, cvars.cluster_overlay)
        .read(light_list, RgResourceBind::Srv)
        .output(tags.back_buffer, RgOutputBind::Rtv, GfxLoadOp::Preserve)
        .bind(move |cmd, res| {
            bind_constants(cmd, "bindData", &res.get(light_list));
            cmd.draw(3, 1);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanguard_render_graph::render_graph::{RgFrameContext, RgQueueTimelines, RgTransientPool};
    use vanguard_render_interface::null_device::{GfxRecordedCommand, NullGfxDevice};
    use vanguard_render_interface::pipeline_settings::{FrameSettings, RenderGraphSettings};

    struct Demo {
        device: NullGfxDevice,
        pool: RgTransientPool,
        timelines: RgQueueTimelines,
        scene: DemoScene,
    }

    impl Demo {
        fn new() -> Self {
            tracy_client::Client::start();
            let mut device = NullGfxDevice::new();
            let scene = DemoScene::new(&mut device, FrameSettings::default().output_extent, 0);
            Self {
                device,
                pool: RgTransientPool::new(),
                timelines: RgQueueTimelines::new(),
                scene,
            }
        }

        fn run_frame(&mut self, cvars: &RenderCvars, frame: u64) -> vanguard_render_graph::render_graph::RgFrameStats {
            let settings = RenderGraphSettings {
                validate_passes: true,
                ..Default::default()
            };
            let mut graph = RenderGraph::new(FrameSettings::default(), settings);
            build_frame_graph(&mut graph, &self.scene, cvars, frame);
            let mut ctx = RgFrameContext {
                device: &mut self.device,
                transient_pool: &mut self.pool,
                timelines: &mut self.timelines,
            };
            graph.execute(&mut ctx).unwrap()
        }
    }

    #[test]
    fn test_full_frame_runs_on_null_device() {
        let mut demo = Demo::new();
        let cvars = RenderCvars::default();
        let stats = demo.run_frame(&cvars, 0);

        // 只有 cluster overlay 默认关闭
        assert_eq!(stats.passes_skipped, 1);
        assert!(stats.submissions >= 2);
        assert!(stats.waits > 0);
        assert!(demo.device.submissions().iter().any(|s| s.queue == GfxQueueType::Compute));
    }

    #[test]
    fn test_disabled_bloom_is_not_recorded() {
        let mut demo = Demo::new();
        let cvars = RenderCvars {
            bloom_enabled: false,
            ..Default::default()
        };
        demo.run_frame(&cvars, 0);

        let labels = demo
            .device
            .submissions()
            .iter()
            .flat_map(|s| s.commands())
            .filter_map(|cmd| match cmd {
                GfxRecordedCommand::BeginLabel(label) => Some(label.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert!(!labels.contains(&"Bloom Pass"));
        assert!(labels.contains(&"Post Process Pass"));
    }

    #[test]
    fn test_pool_stops_growing_after_first_frame() {
        let mut demo = Demo::new();
        let cvars = RenderCvars::default();
        demo.run_frame(&cvars, 0);
        let blocks = demo.device.total_block_allocations();
        for frame in 1..4 {
            demo.run_frame(&cvars, frame);
        }
        assert_eq!(demo.device.total_block_allocations(), blocks);
    }
}
