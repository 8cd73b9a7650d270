use crate::handles::{GfxBufferHandle, GfxImageHandle, GfxMemoryBlockHandle, GfxResourceHandle};
use ash::vk;

/// barrier 使用的 src 和 dst 访问 mask
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GfxBarrierMask {
    pub src_stage: vk::PipelineStageFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
}

impl Default for GfxBarrierMask {
    fn default() -> Self {
        Self {
            src_stage: vk::PipelineStageFlags2::NONE,
            dst_stage: vk::PipelineStageFlags2::NONE,
            src_access: vk::AccessFlags2::NONE,
            dst_access: vk::AccessFlags2::NONE,
        }
    }
}

/// 便捷创建 image memory barrier 的结构体
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxImageBarrier {
    pub image: GfxImageHandle,
    pub mask: GfxBarrierMask,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub aspect: vk::ImageAspectFlags,
}

impl Default for GfxImageBarrier {
    fn default() -> Self {
        Self {
            image: GfxImageHandle::default(),
            mask: GfxBarrierMask::default(),
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout: vk::ImageLayout::UNDEFINED,
            aspect: vk::ImageAspectFlags::COLOR,
        }
    }
}

impl GfxImageBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// builder
    #[inline]
    pub fn image(mut self, image: GfxImageHandle) -> Self {
        self.image = image;
        self
    }

    /// builder
    #[inline]
    pub fn layout_transfer(mut self, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Self {
        self.old_layout = old_layout;
        self.new_layout = new_layout;
        self
    }

    /// builder
    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.mask.src_stage = src_stage_mask;
        self.mask.src_access = src_access_mask;
        self
    }

    /// builder
    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.mask.dst_stage = dst_stage_mask;
        self.mask.dst_access = dst_access_mask;
        self
    }

    /// builder
    /// layer 和 miplevel 都覆盖整个资源
    #[inline]
    pub fn image_aspect_flag(mut self, aspect_mask: vk::ImageAspectFlags) -> Self {
        self.aspect = aspect_mask;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GfxBufferBarrier {
    pub buffer: GfxBufferHandle,
    pub mask: GfxBarrierMask,
}

impl GfxBufferBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn buffer(mut self, buffer: GfxBufferHandle) -> Self {
        self.buffer = buffer;
        self
    }

    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.mask.src_stage = src_stage_mask;
        self.mask.src_access = src_access_mask;
        self
    }

    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.mask.dst_stage = dst_stage_mask;
        self.mask.dst_access = dst_access_mask;
        self
    }
}

/// 同一块内存更换占用者时的 aliasing barrier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxAliasingBarrier {
    pub block: GfxMemoryBlockHandle,
    /// 之前占用该内存的资源
    pub before: Option<GfxResourceHandle>,
    /// 即将使用该内存的资源
    pub after: GfxResourceHandle,
}
