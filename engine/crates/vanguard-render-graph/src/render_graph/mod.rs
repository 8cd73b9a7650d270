//! RenderGraph - 逐帧构建的声明式渲染图
//!
//! 每一帧由各个子系统声明自己的 pass 以及它们读写的资源，
//! graph 负责推导同步（barrier、跨队列等待）、为临时资源分配并复用内存，
//! 然后按声明顺序录制并提交。graph 不跨帧保留，跨帧状态只有内存池和 timeline 基数。
//!
//! # 核心概念
//!
//! - **RgResourceHandle**: 虚拟资源句柄，带有所属 graph 的 id，只在该 graph 内有效
//! - **RgImageState / RgBufferState**: 资源状态描述，包含 stage、access、layout
//! - **RgPassBuilder**: 声明 pass 的读、写、渲染目标和临时资源，并绑定执行闭包
//! - **RgPassResources**: 执行时的资源解析器，只能解析本 pass 声明过的资源
//! - **RgTransientPool**: 跨帧的临时资源内存池，只增不减
//! - **CompiledGraph**: 编译结果，包含执行顺序、barrier、跨队列同步和内存分配
//!
//! # 使用示例
//!
//! ```ignore
//! use vanguard_render_graph::render_graph::*;
//!
//! let mut graph = RenderGraph::new(frame_settings, graph_settings);
//! let back_buffer = graph.import_image("back_buffer", RgImportedImage::new(swapchain_image, format));
//! graph.tag_back_buffer(back_buffer);
//!
//! // 异步计算队列上生成云
//! let mut clouds = graph.add_pass("clouds", GfxQueueType::Compute);
//! let clouds_tex = clouds.create_image(RgImageDesc::scaled_2d(0.5, vk::Format::R16G16B16A16_SFLOAT), "clouds");
//! clouds.write(clouds_tex, RgResourceBind::Uav).bind(move |cmd, res| {
//!     bind_constants(cmd, "clouds", &res.get(clouds_tex));
//!     cmd.dispatch(60, 34, 1);
//! });
//!
//! // 图形队列上合成，自动等待 compute 队列
//! graph
//!     .add_pass("composite", GfxQueueType::Graphics)
//!     .read(clouds_tex, RgResourceBind::Srv)
//!     .output(back_buffer, RgOutputBind::Rtv, GfxLoadOp::Discard)
//!     .bind(move |cmd, res| {
//!         bind_constants(cmd, "composite", &res.get(clouds_tex));
//!         cmd.draw(3, 1);
//!     });
//!
//! let mut ctx = RgFrameContext { device, transient_pool: &mut pool, timelines: &mut timelines };
//! let stats = graph.execute(&mut ctx)?;
//! ```
//!
//! # 模块结构
//!
//! - `resource_handle`: 虚拟资源句柄与 pass 序号
//! - `resource_state`: 资源状态（stage/access/layout）封装
//! - `view`: 绑定方式与视图请求
//! - `image_resource` / `buffer_resource`: 资源描述
//! - `resource_registry`: 资源注册表与访问历史
//! - `pass`: pass 节点、校验和 builder
//! - `pass_resources`: 执行阶段的资源解析
//! - `barrier`: barrier 描述
//! - `queue_sync`: 跨队列 timeline 同步
//! - `planner`: 依赖分析与同步规划
//! - `transient_pool`: 临时资源内存池
//! - `executor`: 构建器和执行器

mod barrier;
mod buffer_resource;
mod executor;
mod image_resource;
mod pass;
mod pass_resources;
mod planner;
mod queue_sync;
mod resource_handle;
mod resource_registry;
mod resource_state;
mod transient_pool;
mod view;

// Re-exports
pub use barrier::{PassBarriers, RgAliasingBarrierDesc, RgBarrierReason, RgBufferBarrierDesc, RgImageBarrierDesc};
pub use buffer_resource::{RgBufferDesc, RgBufferResource, RgImportedBuffer};
pub use executor::{CompiledGraph, RenderGraph, RgFrameContext, RgFrameStats, RgTransientDesc};
pub use image_resource::{RgImageDesc, RgImageResource, RgImageSource, RgImportedImage};
pub use pass::{MAX_RENDER_TARGETS, RgPassAccess, RgPassBuilder, RgPassClosure, RgPassNode};
pub use pass_resources::RgPassResources;
pub use planner::RgSchedule;
pub use queue_sync::{RgPassSync, RgQueueTimelines};
pub use resource_handle::{RgGraphId, RgPassIndex, RgResourceHandle};
pub use resource_registry::{RgAccessKind, RgAccessRecord, RgResource, RgResourceKind, RgResourceRegistry};
pub use resource_state::{RgAccessState, RgBufferState, RgImageState};
pub use transient_pool::{
    RgTransientAllocation, RgTransientAssignment, RgTransientPool, RgTransientPoolStats, RgTransientRequest,
};
pub use view::{RgNamedView, RgOutputBind, RgResourceBind, RgViewRequest};
