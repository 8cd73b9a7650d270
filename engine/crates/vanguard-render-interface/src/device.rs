use crate::bindless::{BindlessIndex, GfxViewDesc};
use crate::command_list::GfxCommandList;
use crate::handles::{GfxBufferHandle, GfxImageHandle, GfxMemoryBlockHandle, GfxResourceHandle};
use crate::memory::{GfxBufferCreateDesc, GfxImageCreateDesc, GfxMemoryRequirements};
use crate::queue::{GfxQueueType, GfxTimelineWait};

/// 一次队列提交
///
/// 每个队列维护一个单调递增的 timeline 计数；
/// `waits` 中的条件全部满足后才开始执行，执行完毕后将本队列的计数设置为 `signal`。
pub struct GfxSubmission {
    pub queue: GfxQueueType,
    pub command_lists: Vec<Box<dyn GfxCommandList>>,
    pub waits: Vec<GfxTimelineWait>,
    pub signal: Option<u64>,
}

/// 图形设备的能力接口
///
/// RenderGraph 只通过该 trait 与设备交互。设备层面的失败（OOM、device lost）
/// 通过 `anyhow::Result` 原样向上传递，RenderGraph 不做重试。
pub trait GfxDevice {
    fn image_memory_requirements(&self, desc: &GfxImageCreateDesc) -> anyhow::Result<GfxMemoryRequirements>;
    fn buffer_memory_requirements(&self, desc: &GfxBufferCreateDesc) -> anyhow::Result<GfxMemoryRequirements>;

    /// 分配一块物理内存，大小与对齐由 `requirements` 决定
    fn allocate_memory(
        &mut self,
        requirements: &GfxMemoryRequirements,
        name: &str,
    ) -> anyhow::Result<GfxMemoryBlockHandle>;
    fn free_memory(&mut self, block: GfxMemoryBlockHandle);

    fn create_placed_image(
        &mut self,
        block: GfxMemoryBlockHandle,
        desc: &GfxImageCreateDesc,
        name: &str,
    ) -> anyhow::Result<GfxImageHandle>;
    fn create_placed_buffer(
        &mut self,
        block: GfxMemoryBlockHandle,
        desc: &GfxBufferCreateDesc,
        name: &str,
    ) -> anyhow::Result<GfxBufferHandle>;

    /// 销毁由 `create_placed_*` 创建的资源
    ///
    /// 设备负责延迟到 GPU 不再使用之后再真正释放。
    fn destroy_image(&mut self, image: GfxImageHandle);
    fn destroy_buffer(&mut self, buffer: GfxBufferHandle);

    /// 为资源创建一个 bindless 描述符，描述符的生命周期由设备按帧管理
    fn create_descriptor(&mut self, resource: GfxResourceHandle, view: &GfxViewDesc) -> anyhow::Result<BindlessIndex>;

    fn create_command_list(&mut self, queue: GfxQueueType, name: &str) -> anyhow::Result<Box<dyn GfxCommandList>>;
    fn submit(&mut self, submission: GfxSubmission) -> anyhow::Result<()>;
}
