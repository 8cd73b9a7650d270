use crate::barrier::{GfxAliasingBarrier, GfxBufferBarrier, GfxImageBarrier};
use crate::handles::{GfxBufferHandle, GfxImageHandle};
use crate::queue::GfxQueueType;
use ash::vk;
use std::any::Any;

/// 渲染目标开始时对旧内容的处理方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxLoadOp {
    /// 保留之前的内容
    Preserve,
    /// 清空
    Clear,
    /// 不关心之前的内容
    Discard,
}

impl GfxLoadOp {
    #[inline]
    pub fn vk_load_op(self) -> vk::AttachmentLoadOp {
        match self {
            Self::Preserve => vk::AttachmentLoadOp::LOAD,
            Self::Clear => vk::AttachmentLoadOp::CLEAR,
            Self::Discard => vk::AttachmentLoadOp::DONT_CARE,
        }
    }
}

/// 一个渲染目标附件
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxRenderTarget {
    pub image: GfxImageHandle,
    pub format: vk::Format,
    pub load_op: GfxLoadOp,
}

/// 命令录制的能力接口
///
/// RenderGraph 通过它插入 barrier、标记 pass 边界以及设置渲染目标；
/// Pass 的闭包通过它录制实际的 GPU 命令。
/// 设备特有的命令可以通过 `as_any_mut` 向下转型获得。
pub trait GfxCommandList: Any {
    fn queue(&self) -> GfxQueueType;

    fn begin_label(&mut self, label: &str);
    fn end_label(&mut self);

    fn image_memory_barrier(&mut self, barriers: &[GfxImageBarrier]);
    fn buffer_memory_barrier(&mut self, barriers: &[GfxBufferBarrier]);
    fn aliasing_barrier(&mut self, barriers: &[GfxAliasingBarrier]);

    fn begin_rendering(&mut self, color_targets: &[GfxRenderTarget], depth_target: Option<&GfxRenderTarget>);
    fn end_rendering(&mut self);

    fn bind_constants(&mut self, name: &str, data: &[u8]);
    fn dispatch(&mut self, group_x: u32, group_y: u32, group_z: u32);
    fn draw(&mut self, vertex_count: u32, instance_count: u32);
    fn copy_buffer(&mut self, src: GfxBufferHandle, dst: GfxBufferHandle, size: vk::DeviceSize);

    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// 以 POD 结构体的形式绑定 root constants
#[inline]
pub fn bind_constants<T: bytemuck::Pod>(cmd: &mut dyn GfxCommandList, name: &str, value: &T) {
    cmd.bind_constants(name, bytemuck::bytes_of(value));
}
