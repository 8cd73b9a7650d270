//! 在 NullGfxDevice 上驱动完整的一帧 pass 集合
//!
//! 读取 `config/vanguard.toml`，逐帧构建 RenderGraph、编译并执行，
//! 在配置的帧上模拟一次分辨率变化（重建 back buffer 并清空 transient 内存池）。

mod config;
mod frame_passes;
mod scene;

use crate::config::VanguardConfig;
use crate::frame_passes::build_frame_graph;
use crate::scene::DemoScene;
use vanguard_crate_tools::init_log::init_log;
use vanguard_crate_tools::workspace_path::VanguardPath;
use vanguard_render_graph::render_graph::{RenderGraph, RgFrameContext, RgQueueTimelines, RgTransientPool};
use vanguard_render_interface::null_device::NullGfxDevice;
use vanguard_render_interface::pipeline_settings::RenderGraphSettings;

fn main() -> anyhow::Result<()> {
    init_log();
    tracy_client::Client::start();
    tracy_client::set_thread_name!("RenderThread");

    let config = VanguardConfig::load_or_default(&VanguardPath::config_path("vanguard.toml"))?;
    log::info!("frame-demo: {:?}", config);

    let mut frame_settings = config.resolution.to_frame_settings();
    let mut device = NullGfxDevice::new();
    let mut scene = DemoScene::new(&mut device, frame_settings.output_extent, 0);
    let mut transient_pool = RgTransientPool::new();
    let mut timelines = RgQueueTimelines::new();

    for frame in 0..config.frames as u64 {
        let _span = tracy_client::span!("frame");

        if config.resize_at_frame != 0 && frame == config.resize_at_frame as u64 {
            let extent = frame_settings.output_extent;
            frame_settings = frame_settings.with_extent(extent.width * 2 / 3, extent.height * 2 / 3);
            log::info!(
                "frame-demo: resized to {}x{}",
                frame_settings.output_extent.width,
                frame_settings.output_extent.height
            );
            // 分辨率变化后旧的内存块大小不再合适
            transient_pool.reset(&mut device);
            scene = DemoScene::new(&mut device, frame_settings.output_extent, frame);
        }

        // 执行计划只打印第一帧
        let graph_settings = RenderGraphSettings {
            print_execution_plan: config.graph.print_execution_plan && frame == 0,
            ..config.graph
        };
        let mut graph = RenderGraph::new(frame_settings, graph_settings);
        build_frame_graph(&mut graph, &scene, &config.cvars, frame);

        let mut ctx = RgFrameContext {
            device: &mut device,
            transient_pool: &mut transient_pool,
            timelines: &mut timelines,
        };
        let stats = graph.execute(&mut ctx)?;

        log::info!(
            "frame {}: {} passes ({} skipped), {} barriers ({} hazards), {} waits, {} submissions, \
             transient {} blocks / {} bytes, pool {} bytes",
            frame,
            stats.passes_executed,
            stats.passes_skipped,
            stats.barriers,
            stats.hazards,
            stats.waits,
            stats.submissions,
            stats.transient_blocks,
            stats.transient_bytes,
            stats.pool_bytes
        );
        device.take_submissions();
        tracy_client::frame_mark();
    }

    transient_pool.reset(&mut device);
    Ok(())
}
