use crate::barrier::{GfxAliasingBarrier, GfxBufferBarrier, GfxImageBarrier};
use crate::bindless::{BindlessIndex, GfxViewDesc};
use crate::command_list::{GfxCommandList, GfxRenderTarget};
use crate::device::{GfxDevice, GfxSubmission};
use crate::handles::{GfxBufferHandle, GfxImageHandle, GfxMemoryBlockHandle, GfxResourceHandle};
use crate::memory::{
    GfxBufferCreateDesc, GfxImageCreateDesc, GfxMemoryClass, GfxMemoryRequirements, format_texel_size,
};
use crate::queue::{GfxQueueType, GfxTimelineWait};
use anyhow::{Context, bail};
use ash::vk;
use itertools::Itertools;
use slotmap::SlotMap;
use std::any::Any;

/// 被录制下来的一条命令
#[derive(Clone, Debug, PartialEq)]
pub enum GfxRecordedCommand {
    BeginLabel(String),
    EndLabel,
    ImageBarriers(Vec<GfxImageBarrier>),
    BufferBarriers(Vec<GfxBufferBarrier>),
    AliasingBarriers(Vec<GfxAliasingBarrier>),
    BeginRendering {
        color_targets: Vec<GfxRenderTarget>,
        depth_target: Option<GfxRenderTarget>,
    },
    EndRendering,
    BindConstants {
        name: String,
        data: Vec<u8>,
    },
    Dispatch(u32, u32, u32),
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    CopyBuffer {
        src: GfxBufferHandle,
        dst: GfxBufferHandle,
        size: vk::DeviceSize,
    },
}

/// 只记录命令的 command list
pub struct NullCommandList {
    queue: GfxQueueType,
    name: String,
    commands: Vec<GfxRecordedCommand>,
}

impl NullCommandList {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn commands(&self) -> &[GfxRecordedCommand] {
        &self.commands
    }
}

impl GfxCommandList for NullCommandList {
    #[inline]
    fn queue(&self) -> GfxQueueType {
        self.queue
    }

    fn begin_label(&mut self, label: &str) {
        self.commands.push(GfxRecordedCommand::BeginLabel(label.to_string()));
    }

    fn end_label(&mut self) {
        self.commands.push(GfxRecordedCommand::EndLabel);
    }

    fn image_memory_barrier(&mut self, barriers: &[GfxImageBarrier]) {
        self.commands.push(GfxRecordedCommand::ImageBarriers(barriers.to_vec()));
    }

    fn buffer_memory_barrier(&mut self, barriers: &[GfxBufferBarrier]) {
        self.commands.push(GfxRecordedCommand::BufferBarriers(barriers.to_vec()));
    }

    fn aliasing_barrier(&mut self, barriers: &[GfxAliasingBarrier]) {
        self.commands.push(GfxRecordedCommand::AliasingBarriers(barriers.to_vec()));
    }

    fn begin_rendering(&mut self, color_targets: &[GfxRenderTarget], depth_target: Option<&GfxRenderTarget>) {
        self.commands.push(GfxRecordedCommand::BeginRendering {
            color_targets: color_targets.to_vec(),
            depth_target: depth_target.copied(),
        });
    }

    fn end_rendering(&mut self) {
        self.commands.push(GfxRecordedCommand::EndRendering);
    }

    fn bind_constants(&mut self, name: &str, data: &[u8]) {
        self.commands.push(GfxRecordedCommand::BindConstants {
            name: name.to_string(),
            data: data.to_vec(),
        });
    }

    fn dispatch(&mut self, group_x: u32, group_y: u32, group_z: u32) {
        self.commands.push(GfxRecordedCommand::Dispatch(group_x, group_y, group_z));
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.commands.push(GfxRecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn copy_buffer(&mut self, src: GfxBufferHandle, dst: GfxBufferHandle, size: vk::DeviceSize) {
        self.commands.push(GfxRecordedCommand::CopyBuffer { src, dst, size });
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// 提交到队列上的一批命令
#[derive(Clone, Debug)]
pub struct NullSubmission {
    pub queue: GfxQueueType,
    pub waits: Vec<GfxTimelineWait>,
    pub signal: Option<u64>,
    /// (command list 名称, 命令)
    pub command_lists: Vec<(String, Vec<GfxRecordedCommand>)>,
}

impl NullSubmission {
    /// 所有 command list 的命令展开
    pub fn commands(&self) -> impl Iterator<Item = &GfxRecordedCommand> {
        self.command_lists.iter().flat_map(|(_, commands)| commands.iter())
    }
}

struct NullMemoryBlock {
    requirements: GfxMemoryRequirements,
    name: String,
}

struct NullPlacedImage {
    block: GfxMemoryBlockHandle,
    desc: GfxImageCreateDesc,
}

struct NullPlacedBuffer {
    block: GfxMemoryBlockHandle,
    desc: GfxBufferCreateDesc,
}

/// 不依赖 GPU 的设备实现
///
/// 所有资源只是 SlotMap 中的记录，所有命令都被录制下来。
/// 提交时只检查 timeline 单调递增以及队列不会等待自身。
pub struct NullGfxDevice {
    blocks: SlotMap<GfxMemoryBlockHandle, NullMemoryBlock>,
    images: SlotMap<GfxImageHandle, NullPlacedImage>,
    buffers: SlotMap<GfxBufferHandle, NullPlacedBuffer>,

    next_descriptor: u32,
    submissions: Vec<NullSubmission>,
    /// 每个队列已提交的最大 signal 值
    timeline_values: [u64; 3],

    /// 总共分配过的内存块数量（包括已释放的）
    total_block_allocations: usize,
    /// 设置后，下一次 `allocate_memory` 返回错误（模拟 OOM）
    fail_next_allocation: bool,
}

impl Default for NullGfxDevice {
    fn default() -> Self {
        Self::new()
    }
}

// new & init
impl NullGfxDevice {
    /// placed resource 的默认对齐
    pub const PLACEMENT_ALIGNMENT: vk::DeviceSize = 64 * 1024;

    pub fn new() -> Self {
        Self {
            blocks: SlotMap::with_key(),
            images: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            next_descriptor: 0,
            submissions: Vec::new(),
            timeline_values: [0; 3],
            total_block_allocations: 0,
            fail_next_allocation: false,
        }
    }

    /// 导入一个外部持久资源（模拟 subsystem 自己创建的纹理）
    pub fn create_persistent_image(&mut self, desc: GfxImageCreateDesc) -> GfxImageHandle {
        self.images.insert(NullPlacedImage {
            block: GfxMemoryBlockHandle::default(),
            desc,
        })
    }

    /// 导入一个外部持久缓冲区
    pub fn create_persistent_buffer(&mut self, desc: GfxBufferCreateDesc) -> GfxBufferHandle {
        self.buffers.insert(NullPlacedBuffer {
            block: GfxMemoryBlockHandle::default(),
            desc,
        })
    }

    #[inline]
    pub fn fail_next_allocation(&mut self) {
        self.fail_next_allocation = true;
    }
}

// getters
impl NullGfxDevice {
    #[inline]
    pub fn submissions(&self) -> &[NullSubmission] {
        &self.submissions
    }

    #[inline]
    pub fn take_submissions(&mut self) -> Vec<NullSubmission> {
        std::mem::take(&mut self.submissions)
    }

    #[inline]
    pub fn live_block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn total_block_allocations(&self) -> usize {
        self.total_block_allocations
    }

    /// 当前存活的内存块总大小
    pub fn live_block_bytes(&self) -> vk::DeviceSize {
        self.blocks.values().map(|b| b.requirements.size).sum()
    }

    #[inline]
    pub fn live_image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn timeline_value(&self, queue: GfxQueueType) -> u64 {
        self.timeline_values[queue.index()]
    }

    /// placed image 所在的内存块
    pub fn image_block(&self, image: GfxImageHandle) -> Option<GfxMemoryBlockHandle> {
        self.images.get(image).map(|i| i.block)
    }

    pub fn image_desc(&self, image: GfxImageHandle) -> Option<&GfxImageCreateDesc> {
        self.images.get(image).map(|i| &i.desc)
    }

    pub fn buffer_block(&self, buffer: GfxBufferHandle) -> Option<GfxMemoryBlockHandle> {
        self.buffers.get(buffer).map(|b| b.block)
    }

    pub fn buffer_desc(&self, buffer: GfxBufferHandle) -> Option<&GfxBufferCreateDesc> {
        self.buffers.get(buffer).map(|b| &b.desc)
    }

    pub fn block_name(&self, block: GfxMemoryBlockHandle) -> Option<&str> {
        self.blocks.get(block).map(|b| b.name.as_str())
    }
}

impl GfxDevice for NullGfxDevice {
    fn image_memory_requirements(&self, desc: &GfxImageCreateDesc) -> anyhow::Result<GfxMemoryRequirements> {
        let texel_size = format_texel_size(desc.format)
            .with_context(|| format!("NullGfxDevice: unsupported image format {:?}", desc.format))?;

        let mut size = 0;
        let (mut width, mut height, mut depth) = (desc.width as u64, desc.height as u64, desc.depth as u64);
        for _ in 0..desc.mip_levels.max(1) {
            size += width * height * depth * texel_size;
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            depth = (depth / 2).max(1);
        }
        size *= desc.array_layers.max(1) as u64;

        Ok(GfxMemoryRequirements {
            size: size.next_multiple_of(Self::PLACEMENT_ALIGNMENT),
            alignment: Self::PLACEMENT_ALIGNMENT,
            class: GfxMemoryClass::from_image_usage(desc.usage),
        })
    }

    fn buffer_memory_requirements(&self, desc: &GfxBufferCreateDesc) -> anyhow::Result<GfxMemoryRequirements> {
        if desc.size == 0 {
            bail!("NullGfxDevice: zero sized buffer");
        }
        Ok(GfxMemoryRequirements {
            size: desc.size.next_multiple_of(Self::PLACEMENT_ALIGNMENT),
            alignment: Self::PLACEMENT_ALIGNMENT,
            class: GfxMemoryClass::Buffer,
        })
    }

    fn allocate_memory(
        &mut self,
        requirements: &GfxMemoryRequirements,
        name: &str,
    ) -> anyhow::Result<GfxMemoryBlockHandle> {
        if std::mem::take(&mut self.fail_next_allocation) {
            bail!("NullGfxDevice: out of device memory while allocating {} bytes", requirements.size);
        }
        self.total_block_allocations += 1;
        Ok(self.blocks.insert(NullMemoryBlock {
            requirements: *requirements,
            name: name.to_string(),
        }))
    }

    fn free_memory(&mut self, block: GfxMemoryBlockHandle) {
        if self.blocks.remove(block).is_none() {
            log::error!("NullGfxDevice: freeing unknown memory block {:?}", block);
        }
    }

    fn create_placed_image(
        &mut self,
        block: GfxMemoryBlockHandle,
        desc: &GfxImageCreateDesc,
        name: &str,
    ) -> anyhow::Result<GfxImageHandle> {
        let block_info = self.blocks.get(block).with_context(|| format!("placing image '{name}' on a freed block"))?;
        let requirements = self.image_memory_requirements(desc)?;
        if requirements.size > block_info.requirements.size {
            bail!(
                "image '{}' needs {} bytes but block '{}' only has {}",
                name,
                requirements.size,
                block_info.name,
                block_info.requirements.size
            );
        }
        Ok(self.images.insert(NullPlacedImage {
            block,
            desc: desc.clone(),
        }))
    }

    fn create_placed_buffer(
        &mut self,
        block: GfxMemoryBlockHandle,
        desc: &GfxBufferCreateDesc,
        name: &str,
    ) -> anyhow::Result<GfxBufferHandle> {
        if !self.blocks.contains_key(block) {
            bail!("placing buffer '{name}' on a freed block");
        }
        Ok(self.buffers.insert(NullPlacedBuffer {
            block,
            desc: desc.clone(),
        }))
    }

    fn destroy_image(&mut self, image: GfxImageHandle) {
        self.images.remove(image);
    }

    fn destroy_buffer(&mut self, buffer: GfxBufferHandle) {
        self.buffers.remove(buffer);
    }

    fn create_descriptor(&mut self, resource: GfxResourceHandle, view: &GfxViewDesc) -> anyhow::Result<BindlessIndex> {
        let exists = match resource {
            GfxResourceHandle::Image(image) => self.images.contains_key(image),
            GfxResourceHandle::Buffer(buffer) => self.buffers.contains_key(buffer),
        };
        if !exists {
            bail!("NullGfxDevice: descriptor {:?} requested for unknown resource {:?}", view.kind, resource);
        }

        let index = BindlessIndex::new(self.next_descriptor);
        self.next_descriptor += 1;
        Ok(index)
    }

    fn create_command_list(&mut self, queue: GfxQueueType, name: &str) -> anyhow::Result<Box<dyn GfxCommandList>> {
        Ok(Box::new(NullCommandList {
            queue,
            name: name.to_string(),
            commands: Vec::new(),
        }))
    }

    fn submit(&mut self, submission: GfxSubmission) -> anyhow::Result<()> {
        for wait in &submission.waits {
            if wait.queue == submission.queue {
                bail!("{} queue waits on itself", submission.queue);
            }
        }

        if let Some(signal) = submission.signal {
            let current = &mut self.timeline_values[submission.queue.index()];
            if signal <= *current {
                bail!("{} queue timeline must increase: {} -> {}", submission.queue, *current, signal);
            }
            *current = signal;
        }

        let command_lists = submission
            .command_lists
            .into_iter()
            .map(|list| {
                let list = list
                    .into_any()
                    .downcast::<NullCommandList>()
                    .map_err(|_| anyhow::anyhow!("NullGfxDevice can only submit NullCommandList"))?;
                let NullCommandList { name, commands, .. } = *list;
                Ok((name, commands))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        log::trace!(
            "submit {}: waits [{}], signal {:?}, {} command lists",
            submission.queue,
            submission.waits.iter().map(|w| format!("{}>={}", w.queue, w.value)).join(", "),
            submission.signal,
            command_lists.len()
        );

        self.submissions.push(NullSubmission {
            queue: submission.queue,
            waits: submission.waits,
            signal: submission.signal,
            command_lists,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba16f(width: u32, height: u32) -> GfxImageCreateDesc {
        GfxImageCreateDesc {
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            format: vk::Format::R16G16B16A16_SFLOAT,
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::STORAGE,
        }
    }

    #[test]
    fn test_image_requirements_are_aligned() {
        let device = NullGfxDevice::new();
        let req = device.image_memory_requirements(&rgba16f(256, 256)).unwrap();
        assert_eq!(req.size, 256 * 256 * 8);
        assert_eq!(req.size % NullGfxDevice::PLACEMENT_ALIGNMENT, 0);
        assert_eq!(req.class, GfxMemoryClass::Texture);

        let small = device.image_memory_requirements(&rgba16f(4, 4)).unwrap();
        assert_eq!(small.size, NullGfxDevice::PLACEMENT_ALIGNMENT);
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        let device = NullGfxDevice::new();
        let mut desc = rgba16f(8, 8);
        desc.format = vk::Format::ASTC_4X4_UNORM_BLOCK;
        assert!(device.image_memory_requirements(&desc).is_err());
    }

    #[test]
    fn test_placed_image_must_fit_block() {
        let mut device = NullGfxDevice::new();
        let small = device.image_memory_requirements(&rgba16f(64, 64)).unwrap();
        let block = device.allocate_memory(&small, "small").unwrap();
        assert!(device.create_placed_image(block, &rgba16f(64, 64), "fits").is_ok());
        assert!(device.create_placed_image(block, &rgba16f(1024, 1024), "too big").is_err());
    }

    #[test]
    fn test_fail_next_allocation() {
        let mut device = NullGfxDevice::new();
        let req = device.image_memory_requirements(&rgba16f(64, 64)).unwrap();
        device.fail_next_allocation();
        assert!(device.allocate_memory(&req, "oom").is_err());
        assert!(device.allocate_memory(&req, "ok").is_ok());
        assert_eq!(device.total_block_allocations(), 1);
    }

    #[test]
    fn test_submit_records_commands_and_timeline() {
        let mut device = NullGfxDevice::new();
        let mut cmd = device.create_command_list(GfxQueueType::Compute, "compute").unwrap();
        cmd.dispatch(8, 8, 1);
        device
            .submit(GfxSubmission {
                queue: GfxQueueType::Compute,
                command_lists: vec![cmd],
                waits: vec![],
                signal: Some(1),
            })
            .unwrap();

        assert_eq!(device.timeline_value(GfxQueueType::Compute), 1);
        let submission = &device.submissions()[0];
        assert_eq!(submission.commands().collect_vec(), vec![&GfxRecordedCommand::Dispatch(8, 8, 1)]);

        // timeline 必须单调递增
        let cmd = device.create_command_list(GfxQueueType::Compute, "again").unwrap();
        let result = device.submit(GfxSubmission {
            queue: GfxQueueType::Compute,
            command_lists: vec![cmd],
            waits: vec![],
            signal: Some(1),
        });
        assert!(result.is_err());
    }
}
