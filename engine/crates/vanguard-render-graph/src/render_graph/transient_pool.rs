//! 临时资源的内存池
//!
//! 内存池跨帧存在，只增不减：每一帧的临时资源从池中的内存块里挑选可以复用的，
//! 找不到时才向设备申请新的内存块。只有显式调用 `reset` 才会把内存还给设备
//! （例如分辨率变化之后）。
//!
//! 帧内的复用规则：
//! - 资源按首次使用位置排序，依次分配
//! - 内存块上一个占用者的使用区间必须在新资源首次使用之前结束，并且两者都只在同一个队列上使用
//! - 类别、大小、对齐都必须满足要求
//! - 在所有满足条件的内存块中选最小的（best-fit）

use crate::render_graph::resource_handle::RgResourceHandle;
use anyhow::Context;
use itertools::Itertools;
use std::collections::HashMap;
use vanguard_render_interface::device::GfxDevice;
use vanguard_render_interface::handles::GfxMemoryBlockHandle;
use vanguard_render_interface::memory::{GfxMemoryClass, GfxMemoryRequirements};
use vanguard_render_interface::queue::GfxQueueType;

/// 一个临时资源的分配请求
#[derive(Clone, Debug)]
pub struct RgTransientRequest {
    pub resource: RgResourceHandle,
    pub name: String,
    pub requirements: GfxMemoryRequirements,
    /// 使用区间 [first, last]，以执行顺序中的位置表示
    pub first: usize,
    pub last: usize,
    /// 资源只在一个队列上使用时为 Some
    pub queue: Option<GfxQueueType>,
    /// 资源的创建顺序，用于首次使用位置相同时排序
    pub order: usize,
}

/// 一个临时资源的分配结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgTransientAssignment {
    pub block: GfxMemoryBlockHandle,
    /// 内存块在池中的序号
    pub block_index: usize,
    /// 帧内之前占用该内存块的资源
    pub previous_owner: Option<RgResourceHandle>,
}

/// 一帧的分配结果
#[derive(Default)]
pub struct RgTransientAllocation {
    pub assignments: HashMap<RgResourceHandle, RgTransientAssignment>,
    /// 本帧新申请的内存块数量
    pub new_blocks: usize,
    /// 本帧用到的内存块数量
    pub used_blocks: usize,
    /// 本帧用到的内存块总大小
    pub used_bytes: u64,
}

/// 内存池的统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RgTransientPoolStats {
    pub block_count: usize,
    pub total_bytes: u64,
}

struct RgMemoryBlock {
    handle: GfxMemoryBlockHandle,
    size: u64,
    alignment: u64,
    class: GfxMemoryClass,
}

/// 内存块在本帧的占用情况
#[derive(Clone, Copy)]
struct RgBlockUsage {
    owner: RgResourceHandle,
    last: usize,
    queue: Option<GfxQueueType>,
}

/// 跨帧的临时资源内存池
#[derive(Default)]
pub struct RgTransientPool {
    blocks: Vec<RgMemoryBlock>,
}

// new & init
impl RgTransientPool {
    pub fn new() -> Self {
        Self::default()
    }
}

// getters
impl RgTransientPool {
    pub fn stats(&self) -> RgTransientPoolStats {
        RgTransientPoolStats {
            block_count: self.blocks.len(),
            total_bytes: self.blocks.iter().map(|block| block.size).sum(),
        }
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

// 分配
impl RgTransientPool {
    /// 为本帧的临时资源分配内存
    ///
    /// `reuse` 为 false 时，每个资源都独占一个内存块（仍然可以复用之前帧留下的内存块）。
    ///
    /// # Panics
    /// 分配结果中有两个使用区间重叠的资源共享同一个内存块
    pub fn allocate(
        &mut self,
        device: &mut dyn GfxDevice,
        requests: &[RgTransientRequest],
        reuse: bool,
    ) -> anyhow::Result<RgTransientAllocation> {
        let _span = tracy_client::span!("RgTransientPool::allocate");

        let mut allocation = RgTransientAllocation::default();
        let mut usage: Vec<Option<RgBlockUsage>> = vec![None; self.blocks.len()];
        let mut windows: Vec<RgBlockWindows<'_>> = vec![Vec::new(); self.blocks.len()];

        for request in requests.iter().sorted_by_key(|request| (request.first, request.order)) {
            let eligible = self
                .blocks
                .iter()
                .enumerate()
                .filter(|(index, _)| match usage[*index] {
                    None => true,
                    Some(used) => {
                        reuse && used.last < request.first && used.queue.is_some() && used.queue == request.queue
                    }
                })
                .collect_vec();

            let best = eligible
                .iter()
                .filter(|(_, block)| request.requirements.fits(block.size, block.alignment, block.class))
                .min_by_key(|(index, block)| (block.size, *index))
                .map(|(index, _)| *index);

            let block_index = match best {
                Some(index) => index,
                None => {
                    if reuse && eligible.iter().any(|(index, _)| usage[*index].is_some()) {
                        log::debug!(
                            "RenderGraph: no compatible block for '{}' ({} bytes, {:?}), allocating a new one",
                            request.name,
                            request.requirements.size,
                            request.requirements.class
                        );
                    }

                    let index = self.blocks.len();
                    let handle = device
                        .allocate_memory(&request.requirements, &format!("rg-transient-{}", index))
                        .with_context(|| format!("分配临时资源 '{}' 的内存失败", request.name))?;
                    log::trace!(
                        "RenderGraph: new transient block #{} ({} bytes) for '{}'",
                        index,
                        request.requirements.size,
                        request.name
                    );

                    self.blocks.push(RgMemoryBlock {
                        handle,
                        size: request.requirements.size,
                        alignment: request.requirements.alignment.max(1),
                        class: request.requirements.class,
                    });
                    usage.push(None);
                    windows.push(Vec::new());
                    allocation.new_blocks += 1;
                    index
                }
            };

            let previous_owner = usage[block_index].map(|used| used.owner);
            usage[block_index] = Some(RgBlockUsage {
                owner: request.resource,
                last: request.last,
                queue: request.queue,
            });
            windows[block_index].push((request.first, request.last, request.name.as_str()));

            allocation.assignments.insert(
                request.resource,
                RgTransientAssignment {
                    block: self.blocks[block_index].handle,
                    block_index,
                    previous_owner,
                },
            );
        }

        check_block_windows(&windows);

        let used = usage.iter().zip(&self.blocks).filter(|(used, _)| used.is_some()).collect_vec();
        allocation.used_blocks = used.len();
        allocation.used_bytes = used.iter().map(|(_, block)| block.size).sum();

        Ok(allocation)
    }

    /// 把所有内存块还给设备
    ///
    /// 调用前需要保证 GPU 不再使用这些内存。
    pub fn reset(&mut self, device: &mut dyn GfxDevice) {
        let stats = self.stats();
        for block in self.blocks.drain(..) {
            device.free_memory(block.handle);
        }
        log::info!("RenderGraph: transient pool reset ({} blocks, {} bytes)", stats.block_count, stats.total_bytes);
    }
}

/// 一个内存块上的所有占用区间 `(first, last, name)`
type RgBlockWindows<'n> = Vec<(usize, usize, &'n str)>;

/// 同一个内存块上的任意两个占用区间不能重叠
///
/// # Panics
/// 有两个区间重叠
fn check_block_windows(windows: &[RgBlockWindows<'_>]) {
    for (block_index, block_windows) in windows.iter().enumerate() {
        for ((_, a_last, a_name), (b_first, _, b_name)) in
            block_windows.iter().sorted_by_key(|window| window.0).tuple_windows()
        {
            assert!(
                a_last < b_first,
                "RenderGraph: '{}' and '{}' overlap but share transient block #{}",
                a_name,
                b_name,
                block_index
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::buffer_resource::RgBufferDesc;
    use crate::render_graph::resource_handle::RgPassIndex;
    use crate::render_graph::resource_registry::RgResourceRegistry;
    use ash::vk;
    use vanguard_render_interface::null_device::NullGfxDevice;

    const MIB: u64 = 1024 * 1024;

    fn requirements(size: u64, class: GfxMemoryClass) -> GfxMemoryRequirements {
        GfxMemoryRequirements {
            size,
            alignment: 65536,
            class,
        }
    }

    struct Requests {
        resources: RgResourceRegistry,
        list: Vec<RgTransientRequest>,
    }

    impl Requests {
        fn new() -> Self {
            // span! 需要一个正在运行的 profiler client
            tracy_client::Client::start();
            Self {
                resources: RgResourceRegistry::new(),
                list: Vec::new(),
            }
        }

        fn add(&mut self, size: u64, first: usize, last: usize, queue: GfxQueueType) -> RgResourceHandle {
            let name = format!("t{}", self.list.len());
            let resource = self.resources.register_transient_buffer(
                name.clone(),
                RgBufferDesc::new(size, vk::BufferUsageFlags::STORAGE_BUFFER),
                RgPassIndex::new(first),
            );
            self.list.push(RgTransientRequest {
                resource,
                name,
                requirements: requirements(size, GfxMemoryClass::Texture),
                first,
                last,
                queue: Some(queue),
                order: self.list.len(),
            });
            resource
        }
    }

    #[test]
    fn test_disjoint_windows_alias() {
        let mut device = NullGfxDevice::new();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        let v = requests.add(4 * MIB, 0, 0, GfxQueueType::Graphics);
        let w = requests.add(4 * MIB, 3, 3, GfxQueueType::Graphics);

        let allocation = pool.allocate(&mut device, &requests.list, true).unwrap();
        assert_eq!(allocation.assignments[&v].block, allocation.assignments[&w].block);
        assert_eq!(allocation.assignments[&w].previous_owner, Some(v));
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn test_no_reuse_gives_dedicated_blocks() {
        let mut device = NullGfxDevice::new();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        let v = requests.add(4 * MIB, 0, 0, GfxQueueType::Graphics);
        let w = requests.add(4 * MIB, 3, 3, GfxQueueType::Graphics);

        let allocation = pool.allocate(&mut device, &requests.list, false).unwrap();
        assert_ne!(allocation.assignments[&v].block, allocation.assignments[&w].block);
        assert_eq!(allocation.new_blocks, 2);
    }

    #[test]
    fn test_overlapping_windows_never_alias() {
        let mut device = NullGfxDevice::new();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        let t = requests.add(MIB, 0, 1, GfxQueueType::Graphics);
        let u = requests.add(MIB, 1, 2, GfxQueueType::Graphics);

        let allocation = pool.allocate(&mut device, &requests.list, true).unwrap();
        assert_ne!(allocation.assignments[&t].block, allocation.assignments[&u].block);
    }

    #[test]
    fn test_best_fit_picks_smallest_block() {
        let mut device = NullGfxDevice::new();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        let big = requests.add(8 * MIB, 0, 0, GfxQueueType::Graphics);
        let small = requests.add(2 * MIB, 0, 1, GfxQueueType::Graphics);
        let next = requests.add(2 * MIB, 2, 2, GfxQueueType::Graphics);

        let allocation = pool.allocate(&mut device, &requests.list, true).unwrap();
        assert_eq!(allocation.assignments[&next].block, allocation.assignments[&small].block);
        assert_ne!(allocation.assignments[&next].block, allocation.assignments[&big].block);
    }

    #[test]
    fn test_queue_mismatch_does_not_alias() {
        let mut device = NullGfxDevice::new();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        let a = requests.add(MIB, 0, 0, GfxQueueType::Compute);
        let b = requests.add(MIB, 1, 1, GfxQueueType::Graphics);

        let allocation = pool.allocate(&mut device, &requests.list, true).unwrap();
        assert_ne!(allocation.assignments[&a].block, allocation.assignments[&b].block);
    }

    #[test]
    fn test_pool_grows_then_recycles_and_resets() {
        let mut device = NullGfxDevice::new();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        requests.add(MIB, 0, 1, GfxQueueType::Graphics);
        requests.add(MIB, 1, 2, GfxQueueType::Graphics);

        pool.allocate(&mut device, &requests.list, true).unwrap();
        let second = pool.allocate(&mut device, &requests.list, true).unwrap();
        assert_eq!(second.new_blocks, 0);
        assert_eq!(device.total_block_allocations(), 2);
        assert_eq!(pool.stats(), RgTransientPoolStats {
            block_count: 2,
            total_bytes: 2 * MIB
        });

        pool.reset(&mut device);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(device.live_block_count(), 0);
    }

    #[test]
    fn test_sequential_windows_pass_overlap_check() {
        check_block_windows(&[vec![(4, 6, "bloom_down"), (0, 1, "depth"), (2, 3, "ssao")], vec![(0, 9, "hdr")]]);
    }

    #[test]
    #[should_panic(expected = "'depth' and 'ssao' overlap but share transient block #1")]
    fn test_overlapping_windows_on_one_block_panic() {
        check_block_windows(&[vec![(0, 9, "hdr")], vec![(0, 2, "depth"), (2, 3, "ssao")]]);
    }

    #[test]
    fn test_device_oom_propagates() {
        let mut device = NullGfxDevice::new();
        device.fail_next_allocation();
        let mut pool = RgTransientPool::new();
        let mut requests = Requests::new();
        requests.add(MIB, 0, 0, GfxQueueType::Graphics);

        let err = pool.allocate(&mut device, &requests.list, true).err().unwrap();
        assert!(format!("{:#}", err).contains("t0"));
        assert_eq!(pool.block_count(), 0);
    }
}
