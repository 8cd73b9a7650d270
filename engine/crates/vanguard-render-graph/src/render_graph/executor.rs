//! RenderGraph 构建器和执行器
//!
//! `RenderGraph` 用于在一帧内声明资源和 pass，
//! `compile` 之后得到 `CompiledGraph`（执行顺序、barrier、跨队列同步、临时资源分配），
//! `execute` 按队列录制命令并提交。graph 每帧重新构建，执行完毕后丢弃。

use crate::render_graph::barrier::{PassBarriers, RgAliasingBarrierDesc};
use crate::render_graph::buffer_resource::{RgBufferResource, RgImportedBuffer};
use crate::render_graph::image_resource::{RgImageSource, RgImportedImage};
use crate::render_graph::pass::{RgPassBuilder, RgPassNode};
use crate::render_graph::pass_resources::RgPassResources;
use crate::render_graph::planner::{self, RgSchedule, is_culled};
use crate::render_graph::queue_sync::{RgPassSync, RgQueueTimelines};
use crate::render_graph::resource_handle::{RgPassIndex, RgResourceHandle};
use crate::render_graph::resource_registry::{RgResourceKind, RgResourceRegistry};
use crate::render_graph::transient_pool::{RgTransientAllocation, RgTransientPool, RgTransientRequest};
use crate::render_graph::view::RgOutputBind;
use anyhow::Context;
use ash::vk;
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::HashMap;
use vanguard_render_interface::barrier::{GfxAliasingBarrier, GfxBufferBarrier, GfxImageBarrier};
use vanguard_render_interface::bindless::{BindlessIndex, GfxViewDesc};
use vanguard_render_interface::command_list::{GfxCommandList, GfxRenderTarget};
use vanguard_render_interface::device::{GfxDevice, GfxSubmission};
use vanguard_render_interface::handles::{GfxMemoryBlockHandle, GfxResourceHandle};
use vanguard_render_interface::memory::{GfxBufferCreateDesc, GfxImageCreateDesc, GfxMemoryRequirements};
use vanguard_render_interface::pipeline_settings::{FrameSettings, RenderGraphSettings};
use vanguard_render_interface::queue::{GfxQueueType, GfxTimelineWait};

/// 编译和执行时需要的外部状态
///
/// 设备、临时资源内存池和 timeline 基数都由调用者持有，跨帧存在。
pub struct RgFrameContext<'c> {
    pub device: &'c mut dyn GfxDevice,
    pub transient_pool: &'c mut RgTransientPool,
    pub timelines: &'c mut RgQueueTimelines,
}

/// 一帧执行的统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RgFrameStats {
    pub passes_executed: usize,
    pub passes_skipped: usize,
    /// 全部 barrier（包括 aliasing 和呈现转换）
    pub barriers: usize,
    /// 数据冒险产生的 barrier
    pub hazards: usize,
    pub waits: usize,
    pub submissions: usize,
    /// 本帧用到的临时内存块
    pub transient_blocks: usize,
    pub transient_bytes: u64,
    /// 内存池的总大小
    pub pool_bytes: u64,
}

/// 解析完成的临时资源
#[derive(Clone, Debug)]
pub enum RgTransientDesc {
    Image(GfxImageCreateDesc),
    Buffer(GfxBufferCreateDesc),
}

#[derive(Clone, Debug)]
struct RgTransientInfo {
    desc: RgTransientDesc,
    requirements: GfxMemoryRequirements,
    first: usize,
    last: usize,
}

/// RenderGraph 构建器
///
/// # 使用流程
///
/// 1. 创建: `RenderGraph::new(frame_settings, graph_settings)`
/// 2. 导入外部资源: `graph.import_image(...)`
/// 3. 添加 Pass: `graph.add_pass("name", queue).read(..).write(..).bind(..)`
/// 4. 编译: `graph.compile(&mut ctx)`
/// 5. 执行: `compiled.execute(&mut ctx)`
///
/// # 生命周期
///
/// `'a` 是 pass 闭包可以借用的外部数据的生命周期。
pub struct RenderGraph<'a> {
    resources: RgResourceRegistry,
    passes: Vec<RgPassNode<'a>>,

    frame_settings: FrameSettings,
    graph_settings: RenderGraphSettings,
}

// new & init
impl<'a> RenderGraph<'a> {
    pub fn new(frame_settings: FrameSettings, graph_settings: RenderGraphSettings) -> Self {
        Self {
            resources: RgResourceRegistry::new(),
            passes: Vec::new(),
            frame_settings,
            graph_settings,
        }
    }
}

// getters
impl<'a> RenderGraph<'a> {
    #[inline]
    pub fn frame_settings(&self) -> &FrameSettings {
        &self.frame_settings
    }

    #[inline]
    pub fn graph_settings(&self) -> &RenderGraphSettings {
        &self.graph_settings
    }

    #[inline]
    pub fn resources(&self) -> &RgResourceRegistry {
        &self.resources
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }
}

// 声明
impl<'a> RenderGraph<'a> {
    /// 导入外部图像资源
    pub fn import_image(&mut self, name: impl Into<String>, image: RgImportedImage) -> RgResourceHandle {
        self.resources.register_imported_image(name, image)
    }

    /// 导入外部缓冲区资源
    pub fn import_buffer(&mut self, name: impl Into<String>, buffer: RgImportedBuffer) -> RgResourceHandle {
        self.resources.register_imported_buffer(name, buffer)
    }

    /// 标记 back buffer，最后一次访问之后会转换到呈现状态
    pub fn tag_back_buffer(&mut self, handle: RgResourceHandle) {
        self.resources.tag_back_buffer(handle);
    }

    /// 添加一个启用的 pass
    pub fn add_pass(&mut self, name: impl Into<String>, queue: GfxQueueType) -> RgPassBuilder<'_, 'a> {
        self.add_pass_enabled(name, queue, true)
    }

    /// 添加 pass，`enabled` 在这里求值一次
    ///
    /// 禁用的 pass 仍然出现在执行计划中用于诊断，但不产生访问记录，闭包也不会被调用。
    pub fn add_pass_enabled(
        &mut self,
        name: impl Into<String>,
        queue: GfxQueueType,
        enabled: bool,
    ) -> RgPassBuilder<'_, 'a> {
        let index = RgPassIndex::new(self.passes.len());
        self.passes.push(RgPassNode::new(name.into(), queue, enabled));
        RgPassBuilder {
            index,
            node: &mut self.passes[index.index()],
            resources: &mut self.resources,
        }
    }
}

// compile
impl<'a> RenderGraph<'a> {
    /// 编译渲染图
    ///
    /// 校验 pass 声明、规划同步、为临时资源分配内存。
    ///
    /// # Panics
    /// pass 声明不合法（`validate_passes` 开启时），或者分配结果出现区间重叠
    pub fn compile(self, ctx: &mut RgFrameContext<'_>) -> anyhow::Result<CompiledGraph<'a>> {
        let _span = tracy_client::span!("RenderGraph::compile");

        if self.graph_settings.validate_passes {
            for pass in self.passes.iter().filter(|pass| pass.enabled) {
                pass.validate(&self.resources);
            }
        }

        let mut schedule = planner::plan(&self.passes, &self.resources);

        let mut transients: IndexMap<RgResourceHandle, RgTransientInfo> = IndexMap::new();
        let mut requests = Vec::new();
        for (order, (handle, resource)) in self.resources.iter().enumerate() {
            if !resource.is_transient() {
                continue;
            }
            if is_culled(resource, &self.passes) {
                log::debug!("RenderGraph: transient '{}' is created by a disabled pass, skipped", resource.name);
                continue;
            }

            let positions = resource.accesses.iter().filter_map(|record| schedule.position(record.pass)).collect_vec();
            let (Some(&first), Some(&last)) = (positions.iter().min(), positions.iter().max()) else {
                continue;
            };
            let queues = resource.accesses.iter().map(|record| self.passes[record.pass.index()].queue).unique();
            let queue = queues.exactly_one().ok();

            // 所有启用的 pass 对该资源的声明，决定最终的 usage
            let declared = resource
                .accesses
                .iter()
                .filter_map(|record| self.passes[record.pass.index()].access(handle))
                .collect_vec();

            let (desc, requirements) = match &resource.kind {
                RgResourceKind::Image(image) => {
                    let RgImageSource::Transient(desc) = &image.source else {
                        continue;
                    };
                    let mut desc = desc.resolve(&resource.name, self.frame_settings.output_extent);
                    desc.usage = declared.iter().fold(desc.usage, |usage, access| usage | access.image_usage());
                    let requirements = ctx
                        .device
                        .image_memory_requirements(&desc)
                        .with_context(|| format!("获取临时图像 '{}' 的内存需求失败", resource.name))?;
                    (RgTransientDesc::Image(desc), requirements)
                }
                RgResourceKind::Buffer(buffer) => {
                    let RgBufferResource::Transient(desc) = buffer else {
                        continue;
                    };
                    let mut desc = desc.resolve();
                    desc.usage = declared.iter().fold(desc.usage, |usage, access| usage | access.buffer_usage());
                    let requirements = ctx
                        .device
                        .buffer_memory_requirements(&desc)
                        .with_context(|| format!("获取临时缓冲区 '{}' 的内存需求失败", resource.name))?;
                    (RgTransientDesc::Buffer(desc), requirements)
                }
            };

            requests.push(RgTransientRequest {
                resource: handle,
                name: resource.name.clone(),
                requirements,
                first,
                last,
                queue,
                order,
            });
            transients.insert(
                handle,
                RgTransientInfo {
                    desc,
                    requirements,
                    first,
                    last,
                },
            );
        }

        let allocation =
            ctx.transient_pool.allocate(&mut *ctx.device, &requests, self.graph_settings.transient_reuse)?;

        // 同一块内存更换占用者时，在新占用者第一次使用之前插入 aliasing barrier
        for request in &requests {
            let Some(assignment) = allocation.assignments.get(&request.resource) else {
                continue;
            };
            if let Some(before) = assignment.previous_owner {
                let first_pass = schedule.order[request.first];
                schedule.barriers[first_pass.index()].aliasing_barriers.push(RgAliasingBarrierDesc {
                    block: assignment.block,
                    before,
                    after: request.resource,
                });
            }
        }

        let compiled = CompiledGraph {
            resources: self.resources,
            passes: self.passes,
            schedule,
            transients,
            allocation,
        };

        if self.graph_settings.print_execution_plan {
            compiled.print_execution_plan();
        }

        Ok(compiled)
    }

    /// 编译并执行
    pub fn execute(self, ctx: &mut RgFrameContext<'_>) -> anyhow::Result<RgFrameStats> {
        self.compile(ctx)?.execute(ctx)
    }
}

/// 正在录制、尚未提交的 command list
struct RgRecording {
    cmd: Box<dyn GfxCommandList>,
    waits: Vec<GfxTimelineWait>,
    signal: u64,
}

/// 编译后的渲染图
///
/// 包含执行顺序、预计算的 barrier 和跨队列同步信息，以及临时资源的内存分配结果。
pub struct CompiledGraph<'a> {
    resources: RgResourceRegistry,
    passes: Vec<RgPassNode<'a>>,
    schedule: RgSchedule,
    transients: IndexMap<RgResourceHandle, RgTransientInfo>,
    allocation: RgTransientAllocation,
}

// getters
impl CompiledGraph<'_> {
    #[inline]
    pub fn schedule(&self) -> &RgSchedule {
        &self.schedule
    }

    #[inline]
    pub fn resources(&self) -> &RgResourceRegistry {
        &self.resources
    }

    /// 执行顺序（pass 名称）
    pub fn execution_order(&self) -> Vec<&str> {
        self.schedule.order.iter().map(|pass| self.passes[pass.index()].name.as_str()).collect()
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn pass_name(&self, pass: RgPassIndex) -> &str {
        &self.passes[pass.index()].name
    }

    /// 按名称查找第一个同名 pass
    pub fn find_pass(&self, name: &str) -> Option<RgPassIndex> {
        self.passes.iter().position(|pass| pass.name == name).map(RgPassIndex::new)
    }

    #[inline]
    pub fn pass_barriers(&self, pass: RgPassIndex) -> &PassBarriers {
        self.schedule.barriers(pass)
    }

    #[inline]
    pub fn pass_sync(&self, pass: RgPassIndex) -> &RgPassSync {
        self.schedule.sync(pass)
    }

    #[inline]
    pub fn hazard_count(&self) -> usize {
        self.schedule.hazard_count()
    }

    #[inline]
    pub fn barrier_count(&self) -> usize {
        self.schedule.barrier_count()
    }

    /// 临时资源的使用区间
    pub fn transient_window(&self, handle: RgResourceHandle) -> Option<(usize, usize)> {
        self.transients.get(&handle).map(|info| (info.first, info.last))
    }

    /// 临时资源被分配到的内存块
    pub fn transient_block(&self, handle: RgResourceHandle) -> Option<GfxMemoryBlockHandle> {
        self.allocation.assignments.get(&handle).map(|assignment| assignment.block)
    }

    pub fn transient_size(&self, handle: RgResourceHandle) -> Option<u64> {
        self.transients.get(&handle).map(|info| info.requirements.size)
    }

    pub fn transient_desc(&self, handle: RgResourceHandle) -> Option<&RgTransientDesc> {
        self.transients.get(&handle).map(|info| &info.desc)
    }

    #[inline]
    pub fn allocation(&self) -> &RgTransientAllocation {
        &self.allocation
    }
}

// execute
impl<'a> CompiledGraph<'a> {
    /// 执行渲染图
    ///
    /// 创建临时资源，按队列录制所有启用的 pass 并提交，最后把临时资源交还给设备延迟销毁。
    /// 设备错误原样返回，graph 不做任何恢复。
    pub fn execute(mut self, ctx: &mut RgFrameContext<'_>) -> anyhow::Result<RgFrameStats> {
        let _span = tracy_client::span!("CompiledGraph::execute");

        let (physical, placed) = self.create_physical_resources(&mut *ctx.device)?;

        let mut stats = RgFrameStats {
            passes_executed: self.schedule.order.len(),
            passes_skipped: self.passes.len() - self.schedule.order.len(),
            barriers: self.schedule.barrier_count(),
            hazards: self.schedule.hazard_count(),
            waits: self.schedule.wait_count(),
            transient_blocks: self.allocation.used_blocks,
            transient_bytes: self.allocation.used_bytes,
            pool_bytes: ctx.transient_pool.stats().total_bytes,
            ..Default::default()
        };

        let mut descriptors: HashMap<(RgResourceHandle, GfxViewDesc), BindlessIndex> = HashMap::new();

        for queue in GfxQueueType::ALL {
            let queue_passes = self.schedule.queue_passes(queue).to_vec();
            let mut recording: Option<RgRecording> = None;

            for (position, pass_index) in queue_passes.iter().enumerate() {
                let sync = self.schedule.sync(*pass_index).clone();

                // 需要等待的 pass 开始一次新的提交
                let mut current = match recording.take() {
                    Some(current) if !sync.has_waits() => current,
                    previous => {
                        if let Some(previous) = previous {
                            Self::submit(&mut *ctx.device, queue, previous)?;
                            stats.submissions += 1;
                        }
                        let cmd = ctx
                            .device
                            .create_command_list(queue, &format!("render-graph-{}-{}", queue, position))
                            .with_context(|| format!("创建 {} 队列的 command list 失败", queue))?;
                        RgRecording {
                            cmd,
                            waits: sync.waits.iter().map(|wait| ctx.timelines.absolute_wait(wait)).collect(),
                            signal: 0,
                        }
                    }
                };

                self.record_pass(*pass_index, current.cmd.as_mut(), &mut *ctx.device, &physical, &mut descriptors)?;
                current.signal = ctx.timelines.absolute(queue, sync.timeline_value);

                // 被其他队列依赖的 pass 结束一次提交
                if sync.signal {
                    Self::submit(&mut *ctx.device, queue, current)?;
                    stats.submissions += 1;
                } else {
                    recording = Some(current);
                }
            }

            if let Some(current) = recording.take() {
                Self::submit(&mut *ctx.device, queue, current)?;
                stats.submissions += 1;
            }
            ctx.timelines.advance(queue, queue_passes.len() as u64);
        }

        for resource in placed {
            match resource {
                GfxResourceHandle::Image(image) => ctx.device.destroy_image(image),
                GfxResourceHandle::Buffer(buffer) => ctx.device.destroy_buffer(buffer),
            }
        }

        log::trace!("RenderGraph: frame stats {:?}", stats);
        Ok(stats)
    }

    /// 导入资源直接使用外部句柄，临时资源放置在分配好的内存块上
    fn create_physical_resources(
        &self,
        device: &mut dyn GfxDevice,
    ) -> anyhow::Result<(HashMap<RgResourceHandle, GfxResourceHandle>, Vec<GfxResourceHandle>)> {
        let _span = tracy_client::span!("CompiledGraph::create_physical_resources");

        let mut physical = HashMap::new();
        let mut placed = Vec::new();

        for (handle, resource) in self.resources.iter() {
            let imported = match &resource.kind {
                RgResourceKind::Image(image) => image.physical_handle().map(GfxResourceHandle::from),
                RgResourceKind::Buffer(buffer) => buffer.physical_handle().map(GfxResourceHandle::from),
            };
            if let Some(imported) = imported {
                physical.insert(handle, imported);
                continue;
            }

            let (Some(assignment), Some(info)) = (self.allocation.assignments.get(&handle), self.transients.get(&handle))
            else {
                continue;
            };
            let created = match &info.desc {
                RgTransientDesc::Image(desc) => device
                    .create_placed_image(assignment.block, desc, &resource.name)
                    .map(GfxResourceHandle::from),
                RgTransientDesc::Buffer(desc) => device
                    .create_placed_buffer(assignment.block, desc, &resource.name)
                    .map(GfxResourceHandle::from),
            }
            .with_context(|| format!("创建临时资源 '{}' 失败", resource.name))?;

            physical.insert(handle, created);
            placed.push(created);
        }

        Ok((physical, placed))
    }

    /// 录制单个 pass：barrier、debug label、渲染目标、闭包
    fn record_pass(
        &mut self,
        pass_index: RgPassIndex,
        cmd: &mut dyn GfxCommandList,
        device: &mut dyn GfxDevice,
        physical: &HashMap<RgResourceHandle, GfxResourceHandle>,
        descriptors: &mut HashMap<(RgResourceHandle, GfxViewDesc), BindlessIndex>,
    ) -> anyhow::Result<()> {
        let closure = self.passes[pass_index.index()].closure.take();
        let pass = &self.passes[pass_index.index()];
        let barriers = self.schedule.barriers(pass_index);

        let _span = tracy_client::span!("CompiledGraph::record_pass");

        let aliasing = barriers
            .aliasing_barriers
            .iter()
            .filter_map(|barrier| {
                Some(GfxAliasingBarrier {
                    block: barrier.block,
                    before: physical.get(&barrier.before).copied(),
                    after: physical.get(&barrier.after).copied()?,
                })
            })
            .collect_vec();
        if !aliasing.is_empty() {
            cmd.aliasing_barrier(&aliasing);
        }

        let image_barriers = barriers
            .image_barriers
            .iter()
            .filter_map(|desc| match physical.get(&desc.handle)? {
                GfxResourceHandle::Image(image) => Some(desc.to_gfx_barrier(*image)),
                GfxResourceHandle::Buffer(_) => None,
            })
            .collect::<Vec<GfxImageBarrier>>();
        if !image_barriers.is_empty() {
            cmd.image_memory_barrier(&image_barriers);
        }

        let buffer_barriers = barriers
            .buffer_barriers
            .iter()
            .filter_map(|desc| match physical.get(&desc.handle)? {
                GfxResourceHandle::Buffer(buffer) => Some(desc.to_gfx_barrier(*buffer)),
                GfxResourceHandle::Image(_) => None,
            })
            .collect::<Vec<GfxBufferBarrier>>();
        if !buffer_barriers.is_empty() {
            cmd.buffer_memory_barrier(&buffer_barriers);
        }

        cmd.begin_label(&pass.name);

        // 每个 (资源, 视图) 只创建一次描述符
        let mut views = HashMap::new();
        for (handle, access) in pass.accesses() {
            let Some(resource) = physical.get(&handle).copied() else {
                log::warn!(
                    "RenderGraph: pass '{}' uses '{}' whose creating pass is disabled, it resolves to null",
                    pass.name,
                    self.resources.name(handle)
                );
                continue;
            };
            let Some(request) = access.view_request() else {
                continue;
            };
            for named in request.resolved_views() {
                let index = match descriptors.get(&(handle, named.view)) {
                    Some(index) => *index,
                    None => {
                        let index = device.create_descriptor(resource, &named.view).with_context(|| {
                            format!("为 '{}' 创建描述符失败", self.resources.name(handle))
                        })?;
                        descriptors.insert((handle, named.view), index);
                        index
                    }
                };
                views.insert((handle, named.name), index);
            }
        }

        let has_outputs = pass.has_outputs();
        if has_outputs {
            let mut color_targets = Vec::new();
            let mut depth_target = None;
            for (handle, access) in pass.accesses() {
                let (Some((bind, load_op)), Some(GfxResourceHandle::Image(image))) =
                    (access.output, physical.get(&handle).copied())
                else {
                    continue;
                };
                let format = match &self.resources.resource(handle).kind {
                    RgResourceKind::Image(image) => image.format,
                    RgResourceKind::Buffer(_) => vk::Format::UNDEFINED,
                };
                let target = GfxRenderTarget { image, format, load_op };
                match bind {
                    RgOutputBind::Rtv => color_targets.push(target),
                    RgOutputBind::Dsv => depth_target = Some(target),
                }
            }
            cmd.begin_rendering(&color_targets, depth_target.as_ref());
        }

        let pass_resources = RgPassResources {
            pass_name: &pass.name,
            resources: &self.resources,
            declared: &pass.accesses,
            physical,
            views,
        };
        if let Some(closure) = closure {
            closure(&mut *cmd, &pass_resources);
        }

        if has_outputs {
            cmd.end_rendering();
        }
        cmd.end_label();

        let final_barriers = barriers
            .final_image_barriers
            .iter()
            .filter_map(|desc| match physical.get(&desc.handle)? {
                GfxResourceHandle::Image(image) => Some(desc.to_gfx_barrier(*image)),
                GfxResourceHandle::Buffer(_) => None,
            })
            .collect_vec();
        if !final_barriers.is_empty() {
            cmd.image_memory_barrier(&final_barriers);
        }

        Ok(())
    }

    fn submit(device: &mut dyn GfxDevice, queue: GfxQueueType, recording: RgRecording) -> anyhow::Result<()> {
        device
            .submit(GfxSubmission {
                queue,
                command_lists: vec![recording.cmd],
                waits: recording.waits,
                signal: Some(recording.signal),
            })
            .with_context(|| format!("提交 {} 队列失败", queue))
    }
}

// 调试方法
impl CompiledGraph<'_> {
    /// 打印执行计划（用于调试）
    ///
    /// 输出每个 pass 的队列、timeline 计数、跨队列等待、资源访问和 barrier，
    /// 以及临时资源的内存分配情况。
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Passes: {} ({} disabled)  |  Order: [{}]",
            self.passes.len(),
            self.passes.len() - self.schedule.order.len(),
            self.execution_order().join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (index, pass) in self.passes.iter().enumerate() {
            let pass_index = RgPassIndex::new(index);
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            let Some(position) = self.schedule.position(pass_index) else {
                log::info!("│ [-] Pass: \"{}\" ({}) disabled", pass.name, pass.queue);
                log::info!("└─────────────────────────────────────────────────────────────────┘");
                continue;
            };

            let sync = self.schedule.sync(pass_index);
            log::info!(
                "│ [{}/{}] Pass: \"{}\" ({} #{}){}",
                position + 1,
                self.schedule.order.len(),
                pass.name,
                pass.queue,
                sync.timeline_value,
                if sync.signal { " → signal" } else { "" }
            );
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            for wait in &sync.waits {
                log::info!("│   ⏳ wait {} #{}", wait.queue, wait.value);
            }

            for (handle, access) in pass.accesses() {
                let resource = self.resources.resource(handle);
                let state = access.required_state(resource.is_image(), pass.queue);
                let kind = match (access.created, &access.output, access.is_write()) {
                    (_, Some((bind, load_op)), _) => format!("output {:?} {:?}", bind, load_op),
                    (true, None, _) => "create+write".to_string(),
                    (false, None, true) => "write".to_string(),
                    (false, None, false) => "read".to_string(),
                };
                log::info!(
                    "│   {} \"{}\" {} (stage: {}, access: {})",
                    if access.is_write() { "✏️ " } else { "📖" },
                    resource.name,
                    kind,
                    Self::format_pipeline_stage(state.stage()),
                    Self::format_access_flags(state.access())
                );
            }

            let barriers = self.schedule.barriers(pass_index);
            if barriers.has_barriers() || !barriers.final_image_barriers.is_empty() {
                log::info!("├─────────────────────────────────────────────────────────────────┤");
                for barrier in &barriers.aliasing_barriers {
                    log::info!(
                        "│   🔁 Aliasing: \"{}\" → \"{}\"",
                        self.resources.name(barrier.before),
                        self.resources.name(barrier.after)
                    );
                }
                for barrier in barriers.image_barriers.iter().chain(&barriers.final_image_barriers) {
                    log::info!(
                        "│   🔒 Image \"{}\" [{:?}]: {:?} → {:?}",
                        self.resources.name(barrier.handle),
                        barrier.reason,
                        barrier.src.layout,
                        barrier.dst.layout
                    );
                    log::info!(
                        "│       Stage:  {} → {}",
                        Self::format_pipeline_stage(barrier.src.stage),
                        Self::format_pipeline_stage(barrier.dst.stage)
                    );
                }
                for barrier in &barriers.buffer_barriers {
                    log::info!(
                        "│   🔒 Buffer \"{}\" [{:?}]: {} → {}",
                        self.resources.name(barrier.handle),
                        barrier.reason,
                        Self::format_access_flags(barrier.src.src_access()),
                        Self::format_access_flags(barrier.dst.access)
                    );
                }
            } else {
                log::info!("│ No barriers required");
            }

            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        log::info!(
            "Transient memory: {} resources in {} blocks ({} bytes, {} new blocks)",
            self.transients.len(),
            self.allocation.used_blocks,
            self.allocation.used_bytes,
            self.allocation.new_blocks
        );
        for (handle, info) in self.transients.iter().sorted_by_key(|(_, info)| (info.first, info.last)) {
            if let Some(assignment) = self.allocation.assignments.get(handle) {
                log::info!(
                    "  block #{:<3} [{:>2}, {:>2}] {:>10} bytes  \"{}\"",
                    assignment.block_index,
                    info.first,
                    info.last,
                    info.requirements.size,
                    self.resources.name(*handle)
                );
            }
        }
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }

    /// 格式化 PipelineStageFlags2 为可读字符串
    fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
        const NAMES: [(vk::PipelineStageFlags2, &str); 11] = [
            (vk::PipelineStageFlags2::TOP_OF_PIPE, "TOP_OF_PIPE"),
            (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, "BOTTOM_OF_PIPE"),
            (vk::PipelineStageFlags2::DRAW_INDIRECT, "DRAW_INDIRECT"),
            (vk::PipelineStageFlags2::VERTEX_SHADER, "VERTEX_SHADER"),
            (vk::PipelineStageFlags2::FRAGMENT_SHADER, "FRAGMENT_SHADER"),
            (vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, "EARLY_FRAGMENT_TESTS"),
            (vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS, "LATE_FRAGMENT_TESTS"),
            (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, "COLOR_ATTACHMENT_OUTPUT"),
            (vk::PipelineStageFlags2::COMPUTE_SHADER, "COMPUTE_SHADER"),
            (vk::PipelineStageFlags2::TRANSFER, "TRANSFER"),
            (vk::PipelineStageFlags2::ALL_COMMANDS, "ALL_COMMANDS"),
        ];

        let stages = NAMES.iter().filter(|(flag, _)| stage.contains(*flag)).map(|(_, name)| *name).collect_vec();
        if stages.is_empty() { format!("{:?}", stage) } else { stages.join(" | ") }
    }

    /// 格式化 AccessFlags2 为可读字符串
    fn format_access_flags(access: vk::AccessFlags2) -> String {
        if access == vk::AccessFlags2::NONE {
            return "NONE".to_string();
        }

        const NAMES: [(vk::AccessFlags2, &str); 12] = [
            (vk::AccessFlags2::INDIRECT_COMMAND_READ, "INDIRECT_READ"),
            (vk::AccessFlags2::SHADER_SAMPLED_READ, "SAMPLED_READ"),
            (vk::AccessFlags2::SHADER_STORAGE_READ, "STORAGE_READ"),
            (vk::AccessFlags2::SHADER_STORAGE_WRITE, "STORAGE_WRITE"),
            (vk::AccessFlags2::COLOR_ATTACHMENT_READ, "COLOR_READ"),
            (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, "COLOR_WRITE"),
            (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, "DEPTH_READ"),
            (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE, "DEPTH_WRITE"),
            (vk::AccessFlags2::TRANSFER_READ, "TRANSFER_READ"),
            (vk::AccessFlags2::TRANSFER_WRITE, "TRANSFER_WRITE"),
            (vk::AccessFlags2::MEMORY_READ, "MEMORY_READ"),
            (vk::AccessFlags2::MEMORY_WRITE, "MEMORY_WRITE"),
        ];

        let flags = NAMES.iter().filter(|(flag, _)| access.contains(*flag)).map(|(_, name)| *name).collect_vec();
        if flags.is_empty() { format!("{:?}", access) } else { flags.join(" | ") }
    }
}
