//! 依赖分析与同步规划
//!
//! Pass 不会被重新排序：执行顺序就是启用的 pass 的声明顺序。
//! 规划器逐个资源扫描其访问历史，推导出每个 pass 之前需要的 barrier，
//! 以及跨队列的 timeline 等待。
//!
//! 规则：
//! - 读（RAW）：依赖最后一次写入
//! - 写（WAR）：依赖上次写入之后的所有读取；没有读取时依赖上次写入（WAW）
//! - 读后读不产生依赖，但 layout 不同的读取需要等之前的读取完成后再转换
//!
//! 同一队列上的依赖合并成一个 barrier；不同队列上的依赖转换为 timeline 等待。

use crate::render_graph::barrier::{PassBarriers, RgBarrierReason, RgBufferBarrierDesc, RgImageBarrierDesc};
use crate::render_graph::pass::RgPassNode;
use crate::render_graph::queue_sync::{RgPassSync, reduce_waits};
use crate::render_graph::resource_handle::{RgPassIndex, RgResourceHandle};
use crate::render_graph::resource_registry::{RgResource, RgResourceKind, RgResourceRegistry};
use crate::render_graph::resource_state::{RgAccessState, RgBufferState, RgImageState};
use ash::vk;
use itertools::Itertools;
use vanguard_render_interface::queue::{GfxQueueType, GfxTimelineWait};

/// 规划结果
#[derive(Clone, Debug, Default)]
pub struct RgSchedule {
    /// 启用的 pass，按声明顺序
    pub order: Vec<RgPassIndex>,
    /// 每个声明的 pass 在 `order` 中的位置；禁用的 pass 为 None
    pub positions: Vec<Option<usize>>,
    /// 每个队列上的 pass，按声明顺序
    pub queue_passes: [Vec<RgPassIndex>; 3],
    /// 按声明序号索引
    pub barriers: Vec<PassBarriers>,
    /// 按声明序号索引
    pub sync: Vec<RgPassSync>,
}

// getters
impl RgSchedule {
    #[inline]
    pub fn position(&self, pass: RgPassIndex) -> Option<usize> {
        self.positions.get(pass.index()).copied().flatten()
    }

    #[inline]
    pub fn queue_passes(&self, queue: GfxQueueType) -> &[RgPassIndex] {
        &self.queue_passes[queue.index()]
    }

    #[inline]
    pub fn barriers(&self, pass: RgPassIndex) -> &PassBarriers {
        &self.barriers[pass.index()]
    }

    #[inline]
    pub fn sync(&self, pass: RgPassIndex) -> &RgPassSync {
        &self.sync[pass.index()]
    }

    pub fn barrier_count(&self) -> usize {
        self.barriers.iter().map(PassBarriers::total_count).sum()
    }

    pub fn hazard_count(&self) -> usize {
        self.barriers.iter().map(PassBarriers::hazard_count).sum()
    }

    pub fn wait_count(&self) -> usize {
        self.sync.iter().map(|s| s.waits.len()).sum()
    }
}

/// 被禁用的 pass 创建的临时资源不会被分配
#[inline]
pub(crate) fn is_culled(resource: &RgResource, passes: &[RgPassNode<'_>]) -> bool {
    resource.created_by.is_some_and(|creator| !passes[creator.index()].enabled)
}

/// 资源的一次（按 pass 折叠后的）访问
#[derive(Clone, Copy, Debug)]
struct RgTrackedAccess {
    pass: RgPassIndex,
    queue: GfxQueueType,
    state: RgAccessState,
}

/// 生成同步计划
pub(crate) fn plan(passes: &[RgPassNode<'_>], resources: &RgResourceRegistry) -> RgSchedule {
    let _span = tracy_client::span!("RenderGraph::plan");

    let pass_count = passes.len();
    let mut schedule = RgSchedule {
        positions: vec![None; pass_count],
        barriers: vec![PassBarriers::new(); pass_count],
        sync: vec![RgPassSync::default(); pass_count],
        ..Default::default()
    };

    for (index, pass) in passes.iter().enumerate().filter(|(_, pass)| pass.enabled) {
        let pass_index = RgPassIndex::new(index);
        schedule.positions[index] = Some(schedule.order.len());
        schedule.order.push(pass_index);

        let queue_passes = &mut schedule.queue_passes[pass.queue.index()];
        queue_passes.push(pass_index);
        schedule.sync[index].timeline_value = queue_passes.len() as u64;
    }

    let mut raw_waits: Vec<Vec<GfxTimelineWait>> = vec![Vec::new(); pass_count];
    for (handle, resource) in resources.iter() {
        if is_culled(resource, passes) {
            continue;
        }
        plan_resource(handle, resource, passes, &mut schedule, &mut raw_waits);
    }

    // 等待去重，并标记需要 signal 的生产者
    let ordered_waits = schedule
        .order
        .iter()
        .map(|pass| (passes[pass.index()].queue, std::mem::take(&mut raw_waits[pass.index()])))
        .collect_vec();
    let reduced = reduce_waits(&ordered_waits);
    for (pass, waits) in schedule.order.clone().into_iter().zip(reduced) {
        for wait in &waits {
            let producer = schedule.queue_passes[wait.queue.index()][wait.value as usize - 1];
            schedule.sync[producer.index()].signal = true;
        }
        schedule.sync[pass.index()].waits = waits;
    }

    schedule
}

/// 扫描单个资源的访问历史
fn plan_resource(
    handle: RgResourceHandle,
    resource: &RgResource,
    passes: &[RgPassNode<'_>],
    schedule: &mut RgSchedule,
    raw_waits: &mut [Vec<GfxTimelineWait>],
) {
    let initial = resource.initial_state();
    let aspect = match &resource.kind {
        RgResourceKind::Image(image) => image.infer_aspect(),
        RgResourceKind::Buffer(_) => vk::ImageAspectFlags::empty(),
    };

    let mut current_layout = initial.layout();
    let mut last_writer: Option<RgTrackedAccess> = None;
    let mut readers: Vec<RgTrackedAccess> = Vec::new();
    let mut last_access: Option<RgTrackedAccess> = None;

    // 同一个 pass 的多条记录是连续的，折叠成一次访问
    for pass_index in resource.accesses.iter().map(|record| record.pass).dedup() {
        let pass = &passes[pass_index.index()];
        let Some(access) = pass.access(handle) else {
            continue;
        };

        let required = access.required_state(resource.is_image(), pass.queue);
        let is_write = access.is_write();
        let layout_changes = required.layout() != current_layout;
        let tracked = RgTrackedAccess {
            pass: pass_index,
            queue: pass.queue,
            state: required,
        };

        if last_access.is_none() {
            if layout_changes || is_write || initial.is_write() {
                let src = (initial.stage(), initial.access());
                emit_barrier(schedule, handle, pass_index, src, current_layout, required, aspect, RgBarrierReason::Initial);
            }
        } else {
            let (producers, hazard) = if is_write {
                if readers.is_empty() {
                    (last_writer.into_iter().collect_vec(), RgBarrierReason::WriteAfterWrite)
                } else {
                    (readers.clone(), RgBarrierReason::WriteAfterRead)
                }
            } else {
                let mut producers = last_writer.into_iter().collect_vec();
                if layout_changes {
                    producers.extend(readers.iter().copied());
                }
                let reason = if last_writer.is_some() {
                    RgBarrierReason::ReadAfterWrite
                } else {
                    RgBarrierReason::LayoutTransition
                };
                (producers, reason)
            };

            let (same_queue, other_queues): (Vec<_>, Vec<_>) =
                producers.into_iter().partition(|producer| producer.queue == pass.queue);

            for producer in &other_queues {
                raw_waits[pass_index.index()].push(GfxTimelineWait {
                    queue: producer.queue,
                    value: schedule.sync[producer.pass.index()].timeline_value,
                });
            }

            if !same_queue.is_empty() || layout_changes {
                let (mut src_stage, src_access) = merge_states(&same_queue);
                if !other_queues.is_empty() {
                    // 跨队列的部分由 timeline 等待保证，这里只和等待操作衔接
                    src_stage |= vk::PipelineStageFlags2::ALL_COMMANDS;
                }
                let reason = if same_queue.is_empty() { RgBarrierReason::LayoutTransition } else { hazard };
                let src = (src_stage, src_access);
                emit_barrier(schedule, handle, pass_index, src, current_layout, required, aspect, reason);
            }
        }

        if is_write {
            last_writer = Some(tracked);
            readers.clear();
        } else {
            readers.push(tracked);
        }
        current_layout = required.layout();
        last_access = Some(tracked);
    }

    if resource.is_back_buffer() {
        let Some(last) = last_access else {
            log::warn!("RenderGraph: back buffer '{}' is never accessed this frame", resource.name);
            return;
        };

        let producers = if readers.is_empty() { last_writer.into_iter().collect_vec() } else { readers };
        let same_queue = producers.into_iter().filter(|producer| producer.queue == last.queue).collect_vec();
        let (stage, access) = merge_states(&same_queue);
        let barrier = RgImageBarrierDesc {
            handle,
            src: RgImageState::new(stage, access, current_layout.unwrap_or(vk::ImageLayout::UNDEFINED)),
            dst: RgImageState::PRESENT,
            aspect,
            reason: RgBarrierReason::Present,
        };
        schedule.barriers[last.pass.index()].final_image_barriers.push(barrier);
    }
}

fn merge_states(accesses: &[RgTrackedAccess]) -> (vk::PipelineStageFlags2, vk::AccessFlags2) {
    accesses.iter().fold((vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE), |(stage, access), tracked| {
        (stage | tracked.state.stage(), access | tracked.state.access())
    })
}

#[allow(clippy::too_many_arguments)]
fn emit_barrier(
    schedule: &mut RgSchedule,
    handle: RgResourceHandle,
    pass: RgPassIndex,
    (src_stage, src_access): (vk::PipelineStageFlags2, vk::AccessFlags2),
    current_layout: Option<vk::ImageLayout>,
    required: RgAccessState,
    aspect: vk::ImageAspectFlags,
    reason: RgBarrierReason,
) {
    let barriers = &mut schedule.barriers[pass.index()];
    match required {
        RgAccessState::Image(dst) => barriers.add_image_barrier(RgImageBarrierDesc {
            handle,
            src: RgImageState::new(src_stage, src_access, current_layout.unwrap_or(vk::ImageLayout::UNDEFINED)),
            dst,
            aspect,
            reason,
        }),
        RgAccessState::Buffer(dst) => barriers.add_buffer_barrier(RgBufferBarrierDesc {
            handle,
            src: RgBufferState::new(src_stage, src_access),
            dst,
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::buffer_resource::RgBufferDesc;
    use crate::render_graph::image_resource::{RgImageDesc, RgImportedImage};
    use crate::render_graph::pass::RgPassBuilder;
    use crate::render_graph::view::{RgOutputBind, RgResourceBind};
    use vanguard_render_interface::command_list::GfxLoadOp;
    use vanguard_render_interface::handles::GfxImageHandle;

    #[derive(Default)]
    struct TestGraph {
        resources: RgResourceRegistry,
        passes: Vec<RgPassNode<'static>>,
    }

    impl TestGraph {
        fn pass(&mut self, name: &str, queue: GfxQueueType, enabled: bool) -> RgPassBuilder<'_, 'static> {
            self.passes.push(RgPassNode::new(name.to_string(), queue, enabled));
            RgPassBuilder {
                index: RgPassIndex::new(self.passes.len() - 1),
                node: self.passes.last_mut().unwrap(),
                resources: &mut self.resources,
            }
        }

        fn plan(&self) -> RgSchedule {
            tracy_client::Client::start();
            plan(&self.passes, &self.resources)
        }

        fn index(&self, name: &str) -> RgPassIndex {
            RgPassIndex::new(self.passes.iter().position(|p| p.name == name).unwrap())
        }
    }

    fn rgba16f() -> RgImageDesc {
        RgImageDesc::new_2d(256, 256, vk::Format::R16G16B16A16_SFLOAT)
    }

    #[test]
    fn test_write_then_read_same_queue() {
        let mut graph = TestGraph::default();
        let mut a = graph.pass("A", GfxQueueType::Graphics, true);
        let t = a.create_image(rgba16f(), "T");
        a.write(t, RgResourceBind::Uav);
        graph.pass("B", GfxQueueType::Graphics, true).read(t, RgResourceBind::Srv);

        let schedule = graph.plan();
        let a = graph.index("A");
        let b = graph.index("B");

        assert_eq!(schedule.barriers(a).reasons_for(t), vec![RgBarrierReason::Initial]);
        assert_eq!(schedule.barriers(b).reasons_for(t), vec![RgBarrierReason::ReadAfterWrite]);

        let barrier = &schedule.barriers(b).image_barriers[0];
        assert_eq!(barrier.src.layout, vk::ImageLayout::GENERAL);
        assert_eq!(barrier.dst.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(
            barrier.src.stage,
            vk::PipelineStageFlags2::VERTEX_SHADER
                | vk::PipelineStageFlags2::FRAGMENT_SHADER
                | vk::PipelineStageFlags2::COMPUTE_SHADER
        );
        assert_eq!(schedule.wait_count(), 0);
    }

    #[test]
    fn test_read_read_has_no_hazard() {
        let mut graph = TestGraph::default();
        let lut = graph.resources.register_imported_image(
            "transmittance_lut",
            RgImportedImage::new(GfxImageHandle::default(), vk::Format::R16G16B16A16_SFLOAT)
                .with_initial_state(RgImageState::for_read(RgResourceBind::Srv, GfxQueueType::Graphics)),
        );
        graph.pass("sky", GfxQueueType::Graphics, true).read(lut, RgResourceBind::Srv);
        graph.pass("fog", GfxQueueType::Graphics, true).read(lut, RgResourceBind::Srv);

        let schedule = graph.plan();
        assert_eq!(schedule.barrier_count(), 0);
    }

    #[test]
    fn test_write_after_read_waits_for_all_readers() {
        let mut graph = TestGraph::default();
        let history = graph.resources.register_imported_image(
            "history",
            RgImportedImage::new(GfxImageHandle::default(), vk::Format::R16G16B16A16_SFLOAT)
                .with_initial_state(RgImageState::GENERAL),
        );
        graph.pass("reproject", GfxQueueType::Graphics, true).read(history, RgResourceBind::Srv);
        graph.pass("async_denoise", GfxQueueType::Compute, true).read(history, RgResourceBind::Srv);
        graph.pass("resolve", GfxQueueType::Graphics, true).write(history, RgResourceBind::Uav);

        let schedule = graph.plan();
        let resolve = graph.index("resolve");

        assert_eq!(schedule.barriers(resolve).reasons_for(history), vec![RgBarrierReason::WriteAfterRead]);
        assert_eq!(schedule.sync(resolve).waits, vec![GfxTimelineWait {
            queue: GfxQueueType::Compute,
            value: 1
        }]);
        assert!(schedule.sync(graph.index("async_denoise")).signal);
    }

    #[test]
    fn test_cross_queue_read_waits_for_producer() {
        let mut graph = TestGraph::default();
        let mut culling = graph.pass("cluster_culling", GfxQueueType::Compute, true);
        let clusters = culling.create_buffer(RgBufferDesc::structured(1024, 16), "clusters");
        culling.write(clusters, RgResourceBind::Uav);
        graph.pass("forward", GfxQueueType::Graphics, true).read(clusters, RgResourceBind::Srv);

        let schedule = graph.plan();
        let forward = graph.index("forward");

        assert_eq!(schedule.sync(forward).waits, vec![GfxTimelineWait {
            queue: GfxQueueType::Compute,
            value: 1
        }]);
        assert!(schedule.sync(graph.index("cluster_culling")).signal);
        // buffer 没有 layout，跨队列时不需要额外 barrier
        assert!(schedule.barriers(forward).buffer_barriers.is_empty());
        assert_eq!(schedule.hazard_count(), 0);
    }

    #[test]
    fn test_cross_queue_layout_transition() {
        let mut graph = TestGraph::default();
        let mut clouds = graph.pass("clouds", GfxQueueType::Compute, true);
        let target = clouds.create_image(rgba16f(), "clouds");
        clouds.write(target, RgResourceBind::Uav);
        graph.pass("composite", GfxQueueType::Graphics, true).read(target, RgResourceBind::Srv);

        let schedule = graph.plan();
        let composite = graph.index("composite");
        assert_eq!(schedule.barriers(composite).reasons_for(target), vec![RgBarrierReason::LayoutTransition]);
        assert_eq!(schedule.sync(composite).waits.len(), 1);
    }

    #[test]
    fn test_disabled_pass_is_skipped() {
        let mut graph = TestGraph::default();
        let mut a = graph.pass("A", GfxQueueType::Graphics, true);
        let t = a.create_image(rgba16f(), "T");
        a.write(t, RgResourceBind::Uav);
        graph.pass("X", GfxQueueType::Graphics, false).write(t, RgResourceBind::Uav);
        graph.pass("B", GfxQueueType::Graphics, true).read(t, RgResourceBind::Srv);

        let schedule = graph.plan();
        assert_eq!(schedule.order, vec![graph.index("A"), graph.index("B")]);
        assert_eq!(schedule.position(graph.index("X")), None);
        assert_eq!(schedule.sync(graph.index("B")).timeline_value, 2);
        assert_eq!(schedule.barriers(graph.index("B")).reasons_for(t), vec![RgBarrierReason::ReadAfterWrite]);
    }

    #[test]
    fn test_back_buffer_present_after_last_access() {
        let mut graph = TestGraph::default();
        let back_buffer = graph.resources.register_imported_image(
            "back_buffer",
            RgImportedImage::new(GfxImageHandle::default(), vk::Format::B8G8R8A8_UNORM),
        );
        graph.resources.tag_back_buffer(back_buffer);
        graph.pass("post", GfxQueueType::Graphics, true).output(back_buffer, RgOutputBind::Rtv, GfxLoadOp::Discard);
        graph.pass("editor", GfxQueueType::Graphics, true).output(back_buffer, RgOutputBind::Rtv, GfxLoadOp::Preserve);

        let schedule = graph.plan();
        let editor = graph.index("editor");
        let present = &schedule.barriers(editor).final_image_barriers;
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].src.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(present[0].dst, RgImageState::PRESENT);
        assert_eq!(schedule.barriers(editor).reasons_for(back_buffer), vec![RgBarrierReason::WriteAfterWrite]);
    }
}
