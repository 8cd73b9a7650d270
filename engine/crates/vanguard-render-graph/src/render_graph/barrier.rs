//! Barrier 描述
//!
//! 规划阶段只记录 graph 内部句柄和前后状态，执行阶段再转换为设备侧的 barrier。

use crate::render_graph::resource_handle::RgResourceHandle;
use crate::render_graph::resource_state::{RgBufferState, RgImageState};
use ash::vk;
use vanguard_render_interface::barrier::{GfxBufferBarrier, GfxImageBarrier};
use vanguard_render_interface::handles::{GfxBufferHandle, GfxImageHandle, GfxMemoryBlockHandle};

/// 插入 barrier 的原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgBarrierReason {
    /// 读取之前的写入结果
    ReadAfterWrite,
    /// 两次写入之间的顺序
    WriteAfterWrite,
    /// 写入前等待之前的读取完成
    WriteAfterRead,
    /// 帧内第一次访问，从初始状态转换
    Initial,
    /// 只读访问之间的 layout 转换
    LayoutTransition,
    /// back buffer 转换到呈现状态
    Present,
}

impl RgBarrierReason {
    /// 是否对应一个数据冒险
    #[inline]
    pub fn is_hazard(self) -> bool {
        matches!(self, Self::ReadAfterWrite | Self::WriteAfterWrite | Self::WriteAfterRead)
    }
}

/// 图像 Barrier 描述
///
/// `src.layout` 是资源当前的 layout，`src.stage/access` 是所有前序访问合并后的 mask。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgImageBarrierDesc {
    pub handle: RgResourceHandle,
    pub src: RgImageState,
    pub dst: RgImageState,
    pub aspect: vk::ImageAspectFlags,
    pub reason: RgBarrierReason,
}

impl RgImageBarrierDesc {
    /// 转换为 GfxImageBarrier
    pub fn to_gfx_barrier(&self, image: GfxImageHandle) -> GfxImageBarrier {
        GfxImageBarrier::new()
            .image(image)
            .layout_transfer(self.src.layout, self.dst.layout)
            .src_mask(self.src.stage, self.src.src_access())
            .dst_mask(self.dst.stage, self.dst.access)
            .image_aspect_flag(self.aspect)
    }
}

/// 缓冲区 Barrier 描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBufferBarrierDesc {
    pub handle: RgResourceHandle,
    pub src: RgBufferState,
    pub dst: RgBufferState,
    pub reason: RgBarrierReason,
}

impl RgBufferBarrierDesc {
    pub fn to_gfx_barrier(&self, buffer: GfxBufferHandle) -> GfxBufferBarrier {
        GfxBufferBarrier::new()
            .buffer(buffer)
            .src_mask(self.src.stage, self.src.src_access())
            .dst_mask(self.dst.stage, self.dst.access)
    }
}

/// 同一块内存在帧内更换占用者
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgAliasingBarrierDesc {
    pub block: GfxMemoryBlockHandle,
    pub before: RgResourceHandle,
    pub after: RgResourceHandle,
}

/// Pass 执行前需要的 Barrier 集合
#[derive(Clone, Debug, Default)]
pub struct PassBarriers {
    pub aliasing_barriers: Vec<RgAliasingBarrierDesc>,
    pub image_barriers: Vec<RgImageBarrierDesc>,
    pub buffer_barriers: Vec<RgBufferBarrierDesc>,
    /// pass 执行完之后录制（back buffer 的呈现转换）
    pub final_image_barriers: Vec<RgImageBarrierDesc>,
}

impl PassBarriers {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_image_barrier(&mut self, barrier: RgImageBarrierDesc) {
        self.image_barriers.push(barrier);
    }

    #[inline]
    pub fn add_buffer_barrier(&mut self, barrier: RgBufferBarrierDesc) {
        self.buffer_barriers.push(barrier);
    }

    /// 检查 pass 之前是否有 barrier
    #[inline]
    pub fn has_barriers(&self) -> bool {
        !self.aliasing_barriers.is_empty() || !self.image_barriers.is_empty() || !self.buffer_barriers.is_empty()
    }

    #[inline]
    pub fn image_barrier_count(&self) -> usize {
        self.image_barriers.len()
    }

    #[inline]
    pub fn buffer_barrier_count(&self) -> usize {
        self.buffer_barriers.len()
    }

    /// 全部 barrier 数量（包括 aliasing 和呈现转换）
    #[inline]
    pub fn total_count(&self) -> usize {
        self.aliasing_barriers.len()
            + self.image_barriers.len()
            + self.buffer_barriers.len()
            + self.final_image_barriers.len()
    }

    /// 由数据冒险产生的 barrier 数量
    pub fn hazard_count(&self) -> usize {
        self.image_barriers.iter().filter(|b| b.reason.is_hazard()).count()
            + self.buffer_barriers.iter().filter(|b| b.reason.is_hazard()).count()
    }

    /// 查找某个资源的 barrier 原因
    pub fn reasons_for(&self, handle: RgResourceHandle) -> Vec<RgBarrierReason> {
        self.image_barriers
            .iter()
            .filter(|b| b.handle == handle)
            .map(|b| b.reason)
            .chain(self.buffer_barriers.iter().filter(|b| b.handle == handle).map(|b| b.reason))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hazard_count_ignores_transitions() {
        let mut barriers = PassBarriers::new();
        let handle = RgResourceHandle::default();
        for reason in [RgBarrierReason::Initial, RgBarrierReason::ReadAfterWrite, RgBarrierReason::LayoutTransition] {
            barriers.add_image_barrier(RgImageBarrierDesc {
                handle,
                src: RgImageState::GENERAL,
                dst: RgImageState::TRANSFER_SRC,
                aspect: vk::ImageAspectFlags::COLOR,
                reason,
            });
        }
        assert_eq!(barriers.hazard_count(), 1);
        assert_eq!(barriers.total_count(), 3);
    }

    #[test]
    fn test_to_gfx_barrier_drops_read_access_from_src() {
        let desc = RgImageBarrierDesc {
            handle: RgResourceHandle::default(),
            src: RgImageState::COLOR_ATTACHMENT_WRITE,
            dst: RgImageState::TRANSFER_SRC,
            aspect: vk::ImageAspectFlags::COLOR,
            reason: RgBarrierReason::ReadAfterWrite,
        };
        let barrier = desc.to_gfx_barrier(GfxImageHandle::default());
        assert_eq!(barrier.mask.src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    }
}
