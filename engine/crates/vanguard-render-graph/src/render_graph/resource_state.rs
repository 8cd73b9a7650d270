//! 资源状态定义
//!
//! 封装 Vulkan 的 pipeline stage、access mask 和 image layout，
//! 并根据 pass 的绑定方式和所在队列推导出资源需要处于的状态。

use crate::render_graph::view::{RgOutputBind, RgResourceBind};
use ash::vk;
use vanguard_render_interface::queue::GfxQueueType;

const fn or_stage(a: vk::PipelineStageFlags2, b: vk::PipelineStageFlags2) -> vk::PipelineStageFlags2 {
    vk::PipelineStageFlags2::from_raw(a.as_raw() | b.as_raw())
}

const fn or_access(a: vk::AccessFlags2, b: vk::AccessFlags2) -> vk::AccessFlags2 {
    vk::AccessFlags2::from_raw(a.as_raw() | b.as_raw())
}

/// 写操作的 access flags
const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
        | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
        | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
        | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
        | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
);

/// 队列上着色器可能运行的 stage
fn shader_stages(queue: GfxQueueType) -> vk::PipelineStageFlags2 {
    match queue {
        GfxQueueType::Graphics => or_stage(
            or_stage(vk::PipelineStageFlags2::VERTEX_SHADER, vk::PipelineStageFlags2::FRAGMENT_SHADER),
            vk::PipelineStageFlags2::COMPUTE_SHADER,
        ),
        GfxQueueType::Compute => vk::PipelineStageFlags2::COMPUTE_SHADER,
        GfxQueueType::Copy => vk::PipelineStageFlags2::TRANSFER,
    }
}

/// 图像资源状态
///
/// 描述图像在某个 Pass 中的使用方式，用于自动计算 barrier。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgImageState {
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Access mask
    pub access: vk::AccessFlags2,
    /// Image layout
    pub layout: vk::ImageLayout,
}

impl Default for RgImageState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl RgImageState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    /// 未定义状态（初始状态或不关心内容）
    pub const UNDEFINED: Self =
        Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    /// 通用布局
    pub const GENERAL: Self = Self::new(
        vk::PipelineStageFlags2::ALL_COMMANDS,
        or_access(vk::AccessFlags2::MEMORY_READ, vk::AccessFlags2::MEMORY_WRITE),
        vk::ImageLayout::GENERAL,
    );

    /// 颜色附件输出
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        or_access(vk::AccessFlags2::COLOR_ATTACHMENT_READ, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 深度附件读写
    pub const DEPTH_ATTACHMENT_WRITE: Self = Self::new(
        or_stage(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS),
        or_access(
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    );

    /// 只读深度（深度测试 + 着色器采样）
    pub const DEPTH_READ_ONLY: Self = Self::new(
        or_stage(
            or_stage(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS),
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
        ),
        or_access(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, vk::AccessFlags2::SHADER_SAMPLED_READ),
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
    );

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 呈现（swapchain image）
    pub const PRESENT: Self =
        Self::new(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR);
}

// 从绑定方式推导
impl RgImageState {
    pub fn for_read(bind: RgResourceBind, queue: GfxQueueType) -> Self {
        match (bind, queue) {
            (RgResourceBind::Common, GfxQueueType::Copy) => Self::TRANSFER_SRC,
            (RgResourceBind::Common, _) | (RgResourceBind::Indirect, _) => Self::new(
                vk::PipelineStageFlags2::ALL_COMMANDS,
                vk::AccessFlags2::MEMORY_READ,
                vk::ImageLayout::GENERAL,
            ),
            (RgResourceBind::Srv, _) => Self::new(
                shader_stages(queue),
                vk::AccessFlags2::SHADER_SAMPLED_READ,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            ),
            (RgResourceBind::Uav, _) => {
                Self::new(shader_stages(queue), vk::AccessFlags2::SHADER_STORAGE_READ, vk::ImageLayout::GENERAL)
            }
            (RgResourceBind::Dsv, _) => Self::DEPTH_READ_ONLY,
        }
    }

    pub fn for_write(bind: RgResourceBind, queue: GfxQueueType) -> Self {
        match (bind, queue) {
            (RgResourceBind::Common, GfxQueueType::Copy) => Self::TRANSFER_DST,
            (RgResourceBind::Uav, _) => Self::new(
                shader_stages(queue),
                or_access(vk::AccessFlags2::SHADER_STORAGE_READ, vk::AccessFlags2::SHADER_STORAGE_WRITE),
                vk::ImageLayout::GENERAL,
            ),
            _ => Self::GENERAL,
        }
    }

    pub fn for_output(bind: RgOutputBind) -> Self {
        match bind {
            RgOutputBind::Rtv => Self::COLOR_ATTACHMENT_WRITE,
            RgOutputBind::Dsv => Self::DEPTH_ATTACHMENT_WRITE,
        }
    }
}

// 辅助方法
impl RgImageState {
    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(WRITE_ACCESS)
    }

    /// 获取用于 barrier src 的 access（去掉读操作）
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & WRITE_ACCESS
    }
}

/// 缓冲区资源状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgBufferState {
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Access mask
    pub access: vk::AccessFlags2,
}

impl Default for RgBufferState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl RgBufferState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self { stage, access }
    }

    /// 未定义状态
    pub const UNDEFINED: Self = Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE);

    /// 间接命令缓冲区
    pub const INDIRECT_BUFFER: Self =
        Self::new(vk::PipelineStageFlags2::DRAW_INDIRECT, vk::AccessFlags2::INDIRECT_COMMAND_READ);

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_READ);

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE);
}

// 从绑定方式推导
impl RgBufferState {
    pub fn for_read(bind: RgResourceBind, queue: GfxQueueType) -> Self {
        match (bind, queue) {
            (RgResourceBind::Common, GfxQueueType::Copy) => Self::TRANSFER_SRC,
            (RgResourceBind::Indirect, _) => Self::INDIRECT_BUFFER,
            (RgResourceBind::Srv, _) | (RgResourceBind::Uav, _) => {
                Self::new(shader_stages(queue), vk::AccessFlags2::SHADER_STORAGE_READ)
            }
            _ => Self::new(vk::PipelineStageFlags2::ALL_COMMANDS, vk::AccessFlags2::MEMORY_READ),
        }
    }

    pub fn for_write(bind: RgResourceBind, queue: GfxQueueType) -> Self {
        match (bind, queue) {
            (RgResourceBind::Common, GfxQueueType::Copy) => Self::TRANSFER_DST,
            (RgResourceBind::Uav, _) => Self::new(
                shader_stages(queue),
                or_access(vk::AccessFlags2::SHADER_STORAGE_READ, vk::AccessFlags2::SHADER_STORAGE_WRITE),
            ),
            _ => Self::new(
                vk::PipelineStageFlags2::ALL_COMMANDS,
                or_access(vk::AccessFlags2::MEMORY_READ, vk::AccessFlags2::MEMORY_WRITE),
            ),
        }
    }

    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(WRITE_ACCESS)
    }

    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & WRITE_ACCESS
    }
}

/// 某次访问要求资源处于的状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAccessState {
    Image(RgImageState),
    Buffer(RgBufferState),
}

impl RgAccessState {
    #[inline]
    pub fn stage(&self) -> vk::PipelineStageFlags2 {
        match self {
            Self::Image(s) => s.stage,
            Self::Buffer(s) => s.stage,
        }
    }

    #[inline]
    pub fn access(&self) -> vk::AccessFlags2 {
        match self {
            Self::Image(s) => s.access,
            Self::Buffer(s) => s.access,
        }
    }

    /// buffer 没有 layout
    #[inline]
    pub fn layout(&self) -> Option<vk::ImageLayout> {
        match self {
            Self::Image(s) => Some(s.layout),
            Self::Buffer(_) => None,
        }
    }

    #[inline]
    pub fn is_write(&self) -> bool {
        match self {
            Self::Image(s) => s.is_write(),
            Self::Buffer(s) => s.is_write(),
        }
    }

    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        match self {
            Self::Image(s) => s.src_access(),
            Self::Buffer(s) => s.src_access(),
        }
    }
}
